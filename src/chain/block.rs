//! Block header and block deserialization and serialization.

use std::io::Cursor;

use crate::chain::error::ParseError;
use crate::chain::transaction::Transaction;
use crate::chain::types::Hash256;
use crate::chain::utils::{
    merkle_root, parse_vec, read_array, read_bytes, read_i32, read_u32, sha256d, CompactSize,
    ParseFromSlice,
};

/// Exact byte length of an encoded block header, Equihash solution included.
///
/// 4 (version) + 3 × 32 (hashes) + 4 (time) + 4 (bits) + 32 (nonce)
/// + 3 (solution length prefix) + 1344 (solution) = 1487.
pub const HEADER_BYTES: usize = 1487;

/// The compact difficulty target of the genesis block; difficulty 1 by
/// definition.
pub const POW_LIMIT_BITS: u32 = 0x1f07ffff;

/// A Zcash block header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block format version.
    pub version: i32,
    /// Hash of the preceding block, all-zero for genesis.
    pub prev_block_hash: Hash256,
    /// Merkle root over the block's txids.
    pub merkle_root: Hash256,
    /// Root of the Sapling note commitment tree after this block.
    pub final_sapling_root: Hash256,
    /// Block time in seconds since the epoch.
    pub time: u32,
    /// Compact difficulty target.
    pub bits: u32,
    /// Equihash nonce.
    pub nonce: Hash256,
    /// Equihash solution, CompactSize-prefixed on the wire (1344 bytes at
    /// current parameters).
    pub solution: Vec<u8>,
}

impl BlockHeader {
    /// Serializes the header.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_BYTES);
        self.encode_into(&mut buf);
        buf
    }

    pub(crate) fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.prev_block_hash.0);
        buf.extend_from_slice(&self.merkle_root.0);
        buf.extend_from_slice(&self.final_sapling_root.0);
        buf.extend_from_slice(&self.time.to_le_bytes());
        buf.extend_from_slice(&self.bits.to_le_bytes());
        buf.extend_from_slice(&self.nonce.0);
        CompactSize::write(buf, self.solution.len());
        buf.extend_from_slice(&self.solution);
    }

    /// Proof-of-work difficulty relative to the genesis target, derived
    /// from `bits`. Display-only; takes no part in the byte round-trip.
    pub fn difficulty(&self) -> f64 {
        target_difficulty(POW_LIMIT_BITS) / target_difficulty(self.bits)
    }
}

impl ParseFromSlice for BlockHeader {
    fn parse_from_slice(data: &[u8]) -> Result<(&[u8], Self), ParseError> {
        let mut cursor = Cursor::new(data);

        let version = read_i32(&mut cursor, "BlockHeader::nVersion")?;
        let prev_block_hash =
            Hash256::from(read_array::<32>(&mut cursor, "BlockHeader::hashPrevBlock")?);
        let merkle_root =
            Hash256::from(read_array::<32>(&mut cursor, "BlockHeader::hashMerkleRoot")?);
        let final_sapling_root = Hash256::from(read_array::<32>(
            &mut cursor,
            "BlockHeader::hashFinalSaplingRoot",
        )?);
        let time = read_u32(&mut cursor, "BlockHeader::nTime")?;
        let bits = read_u32(&mut cursor, "BlockHeader::nBits")?;
        let nonce = Hash256::from(read_array::<32>(&mut cursor, "BlockHeader::nNonce")?);
        let solution = {
            let compact_length = CompactSize::read(&mut cursor)?;
            read_bytes(
                &mut cursor,
                compact_length as usize,
                "BlockHeader::nSolution",
            )?
        };

        let consumed = cursor.position() as usize;
        if consumed != HEADER_BYTES {
            return Err(ParseError::UnexpectedFieldSize {
                field: "BlockHeader",
                expected: HEADER_BYTES,
                actual: consumed,
            });
        }

        Ok((
            &data[consumed..],
            BlockHeader {
                version,
                prev_block_hash,
                merkle_root,
                final_sapling_root,
                time,
                bits,
                nonce,
                solution,
            },
        ))
    }
}

/// The `targetDifficulty` expansion of a compact `bits` value:
/// mantissa × 2^(8 × (exponent − 3)).
fn target_difficulty(bits: u32) -> f64 {
    let mantissa = (bits & 0x00FF_FFFF) as f64;
    let exponent = ((bits >> 24) & 0xFF) as i32;
    mantissa * 2f64.powi(8 * (exponent - 3))
}

/// A full Zcash block: header, transactions and the identifiers captured
/// over their exact byte spans.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    header: BlockHeader,
    /// SHA256d over the header's 1487-byte span.
    hash: Hash256,
    tx: Vec<Transaction>,
    /// Total encoded length; absent for header-only decodes.
    size: Option<usize>,
}

impl Block {
    /// Parses a full block: the 1487-byte header followed by a
    /// CompactSize-prefixed transaction vector.
    ///
    /// With `strict` set, trailing bytes fail the decode.
    pub fn decode(data: &[u8], strict: bool) -> Result<Block, ParseError> {
        let (rest, header) = BlockHeader::parse_from_slice(data)?;
        let hash = Hash256::from(sha256d(&data[..HEADER_BYTES]));

        let (rest, tx) = parse_vec::<Transaction>(rest)?;
        let size = data.len() - rest.len();
        if strict && !rest.is_empty() {
            return Err(ParseError::TrailingData {
                context: "block",
                remaining: rest.len(),
            });
        }
        tracing::debug!(hash = %hash, txs = tx.len(), size, "decoded block");

        Ok(Block {
            header,
            hash,
            tx,
            size: Some(size),
        })
    }

    /// Parses only the block header; `tx` is empty and `size` absent.
    pub fn decode_header_only(data: &[u8], strict: bool) -> Result<Block, ParseError> {
        let (rest, header) = BlockHeader::parse_from_slice(data)?;
        let hash = Hash256::from(sha256d(&data[..HEADER_BYTES]));
        if strict && !rest.is_empty() {
            return Err(ParseError::TrailingData {
                context: "block header",
                remaining: rest.len(),
            });
        }

        Ok(Block {
            header,
            hash,
            tx: Vec::new(),
            size: None,
        })
    }

    /// Builds a block from a header and transactions, recomputing the hash
    /// and size from a fresh encoding.
    pub fn from_parts(header: BlockHeader, tx: Vec<Transaction>) -> Result<Block, ParseError> {
        let header_bytes = header.encode();
        if header_bytes.len() != HEADER_BYTES {
            return Err(ParseError::UnexpectedFieldSize {
                field: "BlockHeader",
                expected: HEADER_BYTES,
                actual: header_bytes.len(),
            });
        }
        let hash = Hash256::from(sha256d(&header_bytes));
        let size = if tx.is_empty() {
            None
        } else {
            let mut total = header_bytes.len() + CompactSize::serialized_size(tx.len());
            for transaction in &tx {
                total += transaction.raw_bytes().len();
            }
            Some(total)
        };

        Ok(Block {
            header,
            hash,
            tx,
            size,
        })
    }

    /// Serializes the block, the exact inverse of [`Block::decode`]. The
    /// transaction vector is written only when transactions are present, so
    /// header-only blocks re-encode to the bare 1487-byte header.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.size.unwrap_or(HEADER_BYTES));
        self.header.encode_into(&mut buf);
        if !self.tx.is_empty() {
            CompactSize::write(&mut buf, self.tx.len());
            for transaction in &self.tx {
                buf.extend_from_slice(&transaction.encode());
            }
        }
        buf
    }

    /// The block header fields.
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    /// SHA256d over the header's exact 1487-byte span.
    pub fn hash(&self) -> Hash256 {
        self.hash
    }

    /// The block's transactions in wire order.
    pub fn tx(&self) -> &[Transaction] {
        &self.tx
    }

    /// Total encoded byte length, absent for header-only decodes.
    pub fn size(&self) -> Option<usize> {
        self.size
    }

    /// Recomputes the Merkle root from the transaction ids in block order,
    /// duplicating the last node of odd layers.
    ///
    /// Fails on a block with no transactions (header-only decode).
    pub fn calculate_merkle_root(&self) -> Result<Hash256, ParseError> {
        let txids: Vec<[u8; 32]> = self.tx.iter().map(|tx| tx.txid().0).collect();
        Ok(Hash256::from(merkle_root(&txids)?))
    }
}
