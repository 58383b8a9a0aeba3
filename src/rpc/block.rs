//! Porcelain types for blocks, mirroring verbose `getblock`.

use hex::{FromHex, ToHex};
use serde::{Deserialize, Serialize};

use crate::chain::block::{Block, BlockHeader};
use crate::chain::error::ParseError;
use crate::chain::transaction::Transaction;
use crate::chain::types::Hash256;
use crate::rpc::transaction::TransactionObject;

/// How a block's transaction list is rendered in porcelain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlockPorcelainMode {
    /// Fully expanded transaction objects.
    #[default]
    Full,
    /// Transactions as txid hex strings only.
    TxIds,
    /// Header fields only: no transaction list, no size.
    HeaderOnly,
}

/// The transaction list position of a verbose block: txids or full objects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TxList {
    /// Transaction ids, byte-reversed hex.
    Ids(Vec<String>),
    /// Fully expanded transactions.
    Objects(Vec<TransactionObject>),
}

/// Verbose porcelain form of a block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockObject {
    /// The block hash, byte-reversed hex. Derived; ignored on
    /// reconstruction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    /// Total encoded byte length, absent in header-only porcelain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Block format version.
    pub version: i32,

    /// Merkle root over the txids, byte-reversed hex.
    #[serde(rename = "merkleroot")]
    pub merkle_root: String,

    /// Root of the Sapling note commitment tree, byte-reversed hex.
    #[serde(rename = "finalsaplingroot")]
    pub final_sapling_root: String,

    /// The transaction list, absent in header-only porcelain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx: Option<TxList>,

    /// Block time in seconds since the epoch.
    pub time: u32,

    /// Equihash nonce, byte-reversed hex.
    pub nonce: String,

    /// Equihash solution as hex.
    pub solution: String,

    /// Compact difficulty target as bare hex.
    pub bits: String,

    /// Difficulty relative to the genesis target. Derived; ignored on
    /// reconstruction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<f64>,

    /// Hash of the preceding block, byte-reversed hex; omitted for genesis.
    #[serde(
        rename = "previousblockhash",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub previous_block_hash: Option<String>,
}

impl Block {
    /// Renders the block in its porcelain form.
    pub fn to_porcelain(&self, mode: BlockPorcelainMode) -> BlockObject {
        let header = self.header();
        let tx = match mode {
            BlockPorcelainMode::HeaderOnly => None,
            BlockPorcelainMode::TxIds => Some(TxList::Ids(
                self.tx().iter().map(|tx| tx.txid().to_string()).collect(),
            )),
            BlockPorcelainMode::Full => Some(TxList::Objects(
                self.tx().iter().map(TransactionObject::from).collect(),
            )),
        };

        BlockObject {
            hash: Some(self.hash().to_string()),
            size: match mode {
                BlockPorcelainMode::HeaderOnly => None,
                _ => self.size().map(|size| size as u64),
            },
            version: header.version,
            merkle_root: header.merkle_root.to_string(),
            final_sapling_root: header.final_sapling_root.to_string(),
            tx,
            time: header.time,
            nonce: header.nonce.to_string(),
            solution: header.solution.encode_hex(),
            bits: format!("{:x}", header.bits),
            difficulty: Some(header.difficulty()),
            previous_block_hash: (!header.prev_block_hash.is_zero())
                .then(|| header.prev_block_hash.to_string()),
        }
    }

    /// Validates a porcelain value and reconstructs the block, re-encoding
    /// the header to recompute its hash.
    ///
    /// Txid-list porcelain (`TxIds` mode) does not carry enough data to
    /// rebuild the transactions and is rejected; header-only porcelain
    /// yields a header-only block.
    pub fn from_porcelain(object: &BlockObject) -> Result<Block, ParseError> {
        let header = BlockHeader {
            version: object.version,
            prev_block_hash: match object.previous_block_hash.as_deref() {
                Some(hex) => Hash256::from_hex(hex)
                    .map_err(|e| ParseError::porcelain("previousblockhash", e.to_string()))?,
                None => Hash256::ZERO,
            },
            merkle_root: Hash256::from_hex(&object.merkle_root)
                .map_err(|e| ParseError::porcelain("merkleroot", e.to_string()))?,
            final_sapling_root: Hash256::from_hex(&object.final_sapling_root)
                .map_err(|e| ParseError::porcelain("finalsaplingroot", e.to_string()))?,
            time: object.time,
            bits: u32::from_str_radix(&object.bits, 16)
                .map_err(|e| ParseError::porcelain("bits", e.to_string()))?,
            nonce: Hash256::from_hex(&object.nonce)
                .map_err(|e| ParseError::porcelain("nonce", e.to_string()))?,
            solution: hex::decode(&object.solution)
                .map_err(|e| ParseError::porcelain("solution", e.to_string()))?,
        };

        let tx = match &object.tx {
            None => Vec::new(),
            Some(TxList::Ids(_)) => {
                return Err(ParseError::porcelain(
                    "tx",
                    "txid-list porcelain cannot be reconstructed into a block",
                ))
            }
            Some(TxList::Objects(objects)) => objects
                .iter()
                .map(Transaction::try_from)
                .collect::<Result<Vec<_>, _>>()?,
        };

        Block::from_parts(header, tx)
    }
}
