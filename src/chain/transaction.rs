//! Transaction deserialization and serialization.
//!
//! Zcash transactions come in four wire layouts keyed by the packed
//! version word and, when overwintered, the version group id:
//!
//! | layout       | overwintered | version | extra sections                                |
//! |--------------|--------------|---------|-----------------------------------------------|
//! | legacy v1    | no           | 1       | none beyond vin/vout/locktime                 |
//! | legacy v2    | no           | 2       | joinsplits (+ pubkey/sig when non-empty)      |
//! | Overwinter   | yes          | 3       | expiry height; joinsplits                     |
//! | Sapling      | yes          | 4       | expiry; value balance; shielded; bindingSig   |

use std::io::Cursor;

use crate::chain::error::ParseError;
use crate::chain::script::Script;
use crate::chain::types::{Amount, Hash256};
use crate::chain::utils::{
    parse_vec, read_array, read_i64, read_u32, read_bytes, sha256d, CompactSize, ParseFromSlice,
};

/// Version group id identifying the Overwinter (v3) transaction format.
pub const OVERWINTER_VERSION_GROUP_ID: u32 = 0x03C4_8270;
/// Version group id identifying the Sapling (v4) transaction format.
pub const SAPLING_VERSION_GROUP_ID: u32 = 0x892F_2085;
/// First overwintered transaction version.
pub const OVERWINTER_TX_VERSION: u32 = 3;
/// First Sapling transaction version.
pub const SAPLING_TX_VERSION: u32 = 4;

/// Byte length of a Groth16 Sprout or Sapling proof.
pub const GROTH_PROOF_SIZE: usize = 192;
/// Byte length of a PHGR13 Sprout proof (eight compressed curve points with
/// tagged y-sign bits).
pub const PHGR_PROOF_SIZE: usize = 296;

const ENC_CIPHERTEXT_SIZE: usize = 580;
const OUT_CIPHERTEXT_SIZE: usize = 80;
const SPROUT_CIPHERTEXT_SIZE: usize = 601;

/// The transaction format tag decoded from the packed header word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxVersion {
    /// Pre-Overwinter transaction; version 2 and above carry a joinsplit
    /// section.
    Legacy(u32),
    /// Overwinter v3 (version group `0x03C48270`).
    Overwinter,
    /// Sapling v4 (version group `0x892F2085`).
    Sapling,
}

impl TxVersion {
    /// Resolve an overwintered (version, versiongroupid) pair, rejecting
    /// the combinations that never appeared on the network.
    pub fn from_overwintered(version: u32, version_group_id: u32) -> Result<Self, ParseError> {
        match (version, version_group_id) {
            (OVERWINTER_TX_VERSION, OVERWINTER_VERSION_GROUP_ID) => Ok(TxVersion::Overwinter),
            (SAPLING_TX_VERSION, SAPLING_VERSION_GROUP_ID) => Ok(TxVersion::Sapling),
            _ => Err(ParseError::UnknownTxShape {
                overwintered: true,
                version,
                version_group_id,
            }),
        }
    }

    /// The overwintered flag bit.
    pub fn is_overwintered(self) -> bool {
        !matches!(self, TxVersion::Legacy(_))
    }

    /// The low 31 bits of the header word.
    pub fn number(self) -> u32 {
        match self {
            TxVersion::Legacy(version) => version,
            TxVersion::Overwinter => OVERWINTER_TX_VERSION,
            TxVersion::Sapling => SAPLING_TX_VERSION,
        }
    }

    /// The version group id, 0 for non-overwintered transactions.
    pub fn group_id(self) -> u32 {
        match self {
            TxVersion::Legacy(_) => 0,
            TxVersion::Overwinter => OVERWINTER_VERSION_GROUP_ID,
            TxVersion::Sapling => SAPLING_VERSION_GROUP_ID,
        }
    }

    /// Whether the wire form carries an expiry height.
    pub fn has_expiry_height(self) -> bool {
        self.is_overwintered()
    }

    /// Whether the wire form carries the Sapling value balance and shielded
    /// spend/output vectors.
    pub fn has_sapling_parts(self) -> bool {
        self == TxVersion::Sapling
    }

    /// Whether the wire form carries a joinsplit section.
    pub fn has_joinsplits(self) -> bool {
        self.number() >= 2
    }

    /// The Sprout proof encoding used by joinsplits under this version.
    pub fn sprout_proof_kind(self) -> SproutProofKind {
        if self == TxVersion::Sapling {
            SproutProofKind::Groth
        } else {
            SproutProofKind::Phgr
        }
    }
}

/// A reference to a previous transaction output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutPoint {
    /// Txid of the transaction holding the output, all-zero for coinbase.
    pub hash: Hash256,
    /// Index of the output, `0xFFFFFFFF` for coinbase.
    pub n: u32,
}

impl OutPoint {
    /// The null outpoint used by coinbase inputs.
    pub const NULL: OutPoint = OutPoint {
        hash: Hash256::ZERO,
        n: u32::MAX,
    };
}

/// Txin format as described in <https://en.bitcoin.it/wiki/Transaction>
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    /// Previous output being spent.
    pub prevout: OutPoint,
    /// CompactSize-prefixed unlocking script, or arbitrary data for coinbase.
    pub script_sig: Script,
    /// Sequence number.
    pub sequence: u32,
}

impl TxIn {
    /// True for the miner-created input whose prevout hash is all zeros.
    pub fn is_coinbase(&self) -> bool {
        self.prevout.hash.is_zero()
    }

    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.prevout.hash.0);
        buf.extend_from_slice(&self.prevout.n.to_le_bytes());
        CompactSize::write(buf, self.script_sig.0.len());
        buf.extend_from_slice(&self.script_sig.0);
        buf.extend_from_slice(&self.sequence.to_le_bytes());
    }
}

impl ParseFromSlice for TxIn {
    fn parse_from_slice(data: &[u8]) -> Result<(&[u8], Self), ParseError> {
        let mut cursor = Cursor::new(data);

        let hash = Hash256::from(read_array::<32>(&mut cursor, "TxIn::PrevTxHash")?);
        let n = read_u32(&mut cursor, "TxIn::PrevTxOutIndex")?;
        let script_sig = {
            let compact_length = CompactSize::read(&mut cursor)?;
            Script(read_bytes(
                &mut cursor,
                compact_length as usize,
                "TxIn::ScriptSig",
            )?)
        };
        let sequence = read_u32(&mut cursor, "TxIn::SequenceNumber")?;

        Ok((
            &data[cursor.position() as usize..],
            TxIn {
                prevout: OutPoint { hash, n },
                script_sig,
                sequence,
            },
        ))
    }
}

/// Txout format as described in <https://en.bitcoin.it/wiki/Transaction>
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    /// Number of zatoshis transferred to this output.
    pub value: Amount,
    /// CompactSize-prefixed locking script.
    pub script_pubkey: Script,
}

impl TxOut {
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.value.0.to_le_bytes());
        CompactSize::write(buf, self.script_pubkey.0.len());
        buf.extend_from_slice(&self.script_pubkey.0);
    }
}

impl ParseFromSlice for TxOut {
    fn parse_from_slice(data: &[u8]) -> Result<(&[u8], Self), ParseError> {
        let mut cursor = Cursor::new(data);

        let value = Amount(read_i64(&mut cursor, "TxOut::Value")?);
        let script_pubkey = {
            let compact_length = CompactSize::read(&mut cursor)?;
            Script(read_bytes(
                &mut cursor,
                compact_length as usize,
                "TxOut::ScriptPubKey",
            )?)
        };

        Ok((
            &data[cursor.position() as usize..],
            TxOut {
                value,
                script_pubkey,
            },
        ))
    }
}

/// A Groth16 zero-knowledge proof, stored opaquely.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct GrothProof(pub [u8; GROTH_PROOF_SIZE]);

impl std::fmt::Debug for GrothProof {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "GrothProof({})", hex::encode(self.0))
    }
}

/// A PHGR13 zero-knowledge proof, captured verbatim for round-tripping.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PhgrProof(pub [u8; PHGR_PROOF_SIZE]);

impl std::fmt::Debug for PhgrProof {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "PhgrProof({})", hex::encode(self.0))
    }
}

/// Which Sprout proof encoding a joinsplit carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SproutProofKind {
    /// Pre-Sapling PHGR13, 296 bytes.
    Phgr,
    /// Sapling-onward Groth16, 192 bytes.
    Groth,
}

/// A Sprout proof: PHGR13 before Sapling, Groth16 from Sapling onward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SproutProof {
    /// Groth16 encoding.
    Groth(GrothProof),
    /// PHGR13 encoding.
    Phgr(PhgrProof),
}

impl SproutProof {
    /// The raw proof bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            SproutProof::Groth(proof) => &proof.0,
            SproutProof::Phgr(proof) => &proof.0,
        }
    }

    /// The encoding this proof uses.
    pub fn kind(&self) -> SproutProofKind {
        match self {
            SproutProof::Groth(_) => SproutProofKind::Groth,
            SproutProof::Phgr(_) => SproutProofKind::Phgr,
        }
    }
}

/// A Sapling Spend Description as described in section 7.3 of the Zcash
/// protocol specification. Always 384 bytes on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpendDescription {
    /// Value commitment to the input note.
    pub cv: Hash256,
    /// Root of the Sapling note commitment tree at some past block.
    pub anchor: Hash256,
    /// Nullifier of the input note.
    pub nullifier: Hash256,
    /// Randomized validating key for `spend_auth_sig`.
    pub rk: Hash256,
    /// Groth16 proof of spend validity.
    pub proof: GrothProof,
    /// Signature authorizing this spend.
    pub spend_auth_sig: [u8; 64],
}

impl SpendDescription {
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.cv.0);
        buf.extend_from_slice(&self.anchor.0);
        buf.extend_from_slice(&self.nullifier.0);
        buf.extend_from_slice(&self.rk.0);
        buf.extend_from_slice(&self.proof.0);
        buf.extend_from_slice(&self.spend_auth_sig);
    }
}

impl ParseFromSlice for SpendDescription {
    fn parse_from_slice(data: &[u8]) -> Result<(&[u8], Self), ParseError> {
        let mut cursor = Cursor::new(data);

        let cv = Hash256::from(read_array::<32>(&mut cursor, "SpendDescription::cv")?);
        let anchor = Hash256::from(read_array::<32>(&mut cursor, "SpendDescription::anchor")?);
        let nullifier =
            Hash256::from(read_array::<32>(&mut cursor, "SpendDescription::nullifier")?);
        let rk = Hash256::from(read_array::<32>(&mut cursor, "SpendDescription::rk")?);
        let proof = GrothProof(read_array::<GROTH_PROOF_SIZE>(
            &mut cursor,
            "SpendDescription::zkproof",
        )?);
        let spend_auth_sig = read_array::<64>(&mut cursor, "SpendDescription::spendAuthSig")?;

        Ok((
            &data[cursor.position() as usize..],
            SpendDescription {
                cv,
                anchor,
                nullifier,
                rk,
                proof,
                spend_auth_sig,
            },
        ))
    }
}

/// A Sapling Output Description as described in section 7.4 of the Zcash
/// protocol specification. Always 948 bytes on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputDescription {
    /// Value commitment to the output note.
    pub cv: Hash256,
    /// U-coordinate of the note commitment.
    pub cmu: Hash256,
    /// Ephemeral public key for Diffie-Hellman key exchange.
    pub ephemeral_key: Hash256,
    /// Encrypted note details for the recipient.
    pub enc_ciphertext: [u8; ENC_CIPHERTEXT_SIZE],
    /// Encrypted note details for the sender.
    pub out_ciphertext: [u8; OUT_CIPHERTEXT_SIZE],
    /// Groth16 proof of output validity.
    pub proof: GrothProof,
}

impl OutputDescription {
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.cv.0);
        buf.extend_from_slice(&self.cmu.0);
        buf.extend_from_slice(&self.ephemeral_key.0);
        buf.extend_from_slice(&self.enc_ciphertext);
        buf.extend_from_slice(&self.out_ciphertext);
        buf.extend_from_slice(&self.proof.0);
    }
}

impl ParseFromSlice for OutputDescription {
    fn parse_from_slice(data: &[u8]) -> Result<(&[u8], Self), ParseError> {
        let mut cursor = Cursor::new(data);

        let cv = Hash256::from(read_array::<32>(&mut cursor, "OutputDescription::cv")?);
        let cmu = Hash256::from(read_array::<32>(&mut cursor, "OutputDescription::cmu")?);
        let ephemeral_key = Hash256::from(read_array::<32>(
            &mut cursor,
            "OutputDescription::ephemeralKey",
        )?);
        let enc_ciphertext = read_array::<ENC_CIPHERTEXT_SIZE>(
            &mut cursor,
            "OutputDescription::encCiphertext",
        )?;
        let out_ciphertext = read_array::<OUT_CIPHERTEXT_SIZE>(
            &mut cursor,
            "OutputDescription::outCiphertext",
        )?;
        let proof = GrothProof(read_array::<GROTH_PROOF_SIZE>(
            &mut cursor,
            "OutputDescription::zkproof",
        )?);

        Ok((
            &data[cursor.position() as usize..],
            OutputDescription {
                cv,
                cmu,
                ephemeral_key,
                enc_ciphertext,
                out_ciphertext,
                proof,
            },
        ))
    }
}

/// A JoinSplit description as described in section 7.2 of the Zcash protocol
/// specification. The inner pairs are fixed-length arrays with no count
/// prefix; only the outer joinsplit vector is CompactSize-prefixed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinSplitDescription {
    /// Value removed from the transparent pool.
    pub vpub_old: Amount,
    /// Value returned to the transparent pool.
    pub vpub_new: Amount,
    /// Root of the Sprout note commitment tree.
    pub anchor: Hash256,
    /// Nullifiers of the two input notes.
    pub nullifiers: [Hash256; 2],
    /// Commitments to the two output notes.
    pub commitments: [Hash256; 2],
    /// Ephemeral key for note encryption.
    pub onetime_pubkey: Hash256,
    /// Seed randomizing the output notes.
    pub random_seed: Hash256,
    /// Message authentication tags binding the signature to the inputs.
    pub macs: [Hash256; 2],
    /// Zero-knowledge proof, PHGR13 or Groth16 by transaction version.
    pub proof: SproutProof,
    /// Note ciphertexts for the two output notes.
    pub ciphertexts: [[u8; SPROUT_CIPHERTEXT_SIZE]; 2],
}

impl JoinSplitDescription {
    fn parse_from_slice(
        data: &[u8],
        proof_kind: SproutProofKind,
    ) -> Result<(&[u8], Self), ParseError> {
        let mut cursor = Cursor::new(data);

        let vpub_old = Amount(read_i64(&mut cursor, "JoinSplit::vpubOld")?);
        let vpub_new = Amount(read_i64(&mut cursor, "JoinSplit::vpubNew")?);
        let anchor = Hash256::from(read_array::<32>(&mut cursor, "JoinSplit::anchor")?);
        let nullifiers = [
            Hash256::from(read_array::<32>(&mut cursor, "JoinSplit::nullifiers")?),
            Hash256::from(read_array::<32>(&mut cursor, "JoinSplit::nullifiers")?),
        ];
        let commitments = [
            Hash256::from(read_array::<32>(&mut cursor, "JoinSplit::commitments")?),
            Hash256::from(read_array::<32>(&mut cursor, "JoinSplit::commitments")?),
        ];
        let onetime_pubkey =
            Hash256::from(read_array::<32>(&mut cursor, "JoinSplit::ephemeralKey")?);
        let random_seed = Hash256::from(read_array::<32>(&mut cursor, "JoinSplit::randomSeed")?);
        let macs = [
            Hash256::from(read_array::<32>(&mut cursor, "JoinSplit::vmacs")?),
            Hash256::from(read_array::<32>(&mut cursor, "JoinSplit::vmacs")?),
        ];
        let proof = match proof_kind {
            SproutProofKind::Groth => SproutProof::Groth(GrothProof(read_array::<GROTH_PROOF_SIZE>(
                &mut cursor,
                "JoinSplit::proofGroth16",
            )?)),
            SproutProofKind::Phgr => SproutProof::Phgr(PhgrProof(read_array::<PHGR_PROOF_SIZE>(
                &mut cursor,
                "JoinSplit::proofPHGR13",
            )?)),
        };
        let ciphertexts = [
            read_array::<SPROUT_CIPHERTEXT_SIZE>(&mut cursor, "JoinSplit::encCiphertexts")?,
            read_array::<SPROUT_CIPHERTEXT_SIZE>(&mut cursor, "JoinSplit::encCiphertexts")?,
        ];

        Ok((
            &data[cursor.position() as usize..],
            JoinSplitDescription {
                vpub_old,
                vpub_new,
                anchor,
                nullifiers,
                commitments,
                onetime_pubkey,
                random_seed,
                macs,
                proof,
                ciphertexts,
            },
        ))
    }

    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.vpub_old.0.to_le_bytes());
        buf.extend_from_slice(&self.vpub_new.0.to_le_bytes());
        buf.extend_from_slice(&self.anchor.0);
        for nullifier in &self.nullifiers {
            buf.extend_from_slice(&nullifier.0);
        }
        for commitment in &self.commitments {
            buf.extend_from_slice(&commitment.0);
        }
        buf.extend_from_slice(&self.onetime_pubkey.0);
        buf.extend_from_slice(&self.random_seed.0);
        for mac in &self.macs {
            buf.extend_from_slice(&mac.0);
        }
        buf.extend_from_slice(self.proof.as_bytes());
        for ciphertext in &self.ciphertexts {
            buf.extend_from_slice(ciphertext);
        }
    }
}

/// Full Zcash transaction data, prior to identifier computation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionData {
    /// The transaction format tag.
    pub version: TxVersion,
    /// Transparent inputs.
    pub vin: Vec<TxIn>,
    /// Transparent outputs.
    pub vout: Vec<TxOut>,
    /// Earliest time or block height at which the transaction may be mined.
    pub lock_time: u32,
    /// Block height after which the transaction expires unmined; 0 when the
    /// format carries no expiry (pre-Overwinter).
    pub expiry_height: u32,
    /// Net value flowing out of the Sapling pool; present only for v4.
    pub value_balance: Option<Amount>,
    /// Sapling shielded spends (v4 only).
    pub shielded_spends: Vec<SpendDescription>,
    /// Sapling shielded outputs (v4 only).
    pub shielded_outputs: Vec<OutputDescription>,
    /// Sprout joinsplit descriptions (version 2 and above).
    pub joinsplits: Vec<JoinSplitDescription>,
    /// Ed25519 verification key for `joinsplit_sig`; present iff any
    /// joinsplits are.
    pub joinsplit_pubkey: Option<Hash256>,
    /// Signature over the transaction by `joinsplit_pubkey`.
    pub joinsplit_sig: Option<[u8; 64]>,
    /// Sapling binding signature; present iff v4 with shielded activity.
    pub binding_sig: Option<[u8; 64]>,
}

impl TransactionData {
    /// Whether the wire form carries a bindingSig for this data.
    fn has_binding_sig(&self) -> bool {
        self.version.has_sapling_parts()
            && (!self.shielded_spends.is_empty() || !self.shielded_outputs.is_empty())
    }

    /// Checks the presence rules the four layouts impose.
    fn validate(&self) -> Result<(), ParseError> {
        let version = self.version;
        if version.has_sapling_parts() != self.value_balance.is_some() {
            return Err(ParseError::InvalidData(
                "valueBalance must be present exactly for Sapling v4 transactions".to_string(),
            ));
        }
        if !version.has_sapling_parts()
            && !(self.shielded_spends.is_empty() && self.shielded_outputs.is_empty())
        {
            return Err(ParseError::InvalidData(
                "shielded spends/outputs require a Sapling v4 transaction".to_string(),
            ));
        }
        if !version.has_joinsplits() && !self.joinsplits.is_empty() {
            return Err(ParseError::InvalidData(
                "joinsplits require transaction version 2 or above".to_string(),
            ));
        }
        let needs_js_sig = !self.joinsplits.is_empty();
        if needs_js_sig != self.joinsplit_pubkey.is_some()
            || needs_js_sig != self.joinsplit_sig.is_some()
        {
            return Err(ParseError::InvalidData(
                "joinSplitPubKey/joinSplitSig must accompany a non-empty joinsplit vector"
                    .to_string(),
            ));
        }
        if self.has_binding_sig() != self.binding_sig.is_some() {
            return Err(ParseError::InvalidData(
                "bindingSig must be present exactly when a v4 transaction has shielded activity"
                    .to_string(),
            ));
        }
        let expected_proof = version.sprout_proof_kind();
        if self
            .joinsplits
            .iter()
            .any(|joinsplit| joinsplit.proof.kind() != expected_proof)
        {
            return Err(ParseError::InvalidData(format!(
                "joinsplit proof encoding must be {expected_proof:?} for version {}",
                version.number()
            )));
        }
        Ok(())
    }

    fn encode_into(&self, buf: &mut Vec<u8>) {
        let version = self.version;
        let mut header = version.number();
        if version.is_overwintered() {
            header |= 1 << 31;
        }
        buf.extend_from_slice(&header.to_le_bytes());
        if version.is_overwintered() {
            buf.extend_from_slice(&version.group_id().to_le_bytes());
        }

        CompactSize::write(buf, self.vin.len());
        for tx_in in &self.vin {
            tx_in.encode_into(buf);
        }
        CompactSize::write(buf, self.vout.len());
        for tx_out in &self.vout {
            tx_out.encode_into(buf);
        }
        buf.extend_from_slice(&self.lock_time.to_le_bytes());

        if version.has_expiry_height() {
            buf.extend_from_slice(&self.expiry_height.to_le_bytes());
        }
        if version.has_sapling_parts() {
            buf.extend_from_slice(
                &self.value_balance.unwrap_or(Amount::ZERO).0.to_le_bytes(),
            );
            CompactSize::write(buf, self.shielded_spends.len());
            for spend in &self.shielded_spends {
                spend.encode_into(buf);
            }
            CompactSize::write(buf, self.shielded_outputs.len());
            for output in &self.shielded_outputs {
                output.encode_into(buf);
            }
        }
        if version.has_joinsplits() {
            CompactSize::write(buf, self.joinsplits.len());
            for joinsplit in &self.joinsplits {
                joinsplit.encode_into(buf);
            }
            if !self.joinsplits.is_empty() {
                if let (Some(pubkey), Some(sig)) = (&self.joinsplit_pubkey, &self.joinsplit_sig) {
                    buf.extend_from_slice(&pubkey.0);
                    buf.extend_from_slice(sig);
                }
            }
        }
        if let Some(sig) = &self.binding_sig {
            if self.has_binding_sig() {
                buf.extend_from_slice(sig);
            }
        }
    }
}

/// A fully parsed Zcash transaction with its identifier and raw byte span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    data: TransactionData,
    /// The exact bytes this transaction occupies on the wire.
    raw_bytes: Vec<u8>,
    /// SHA256d over `raw_bytes`.
    txid: Hash256,
}

impl Transaction {
    /// Validates `data` against the layout presence rules, encodes it and
    /// computes the txid over the fresh encoding.
    pub fn from_data(data: TransactionData) -> Result<Transaction, ParseError> {
        data.validate()?;
        let mut raw_bytes = Vec::new();
        data.encode_into(&mut raw_bytes);
        let txid = Hash256::from(sha256d(&raw_bytes));
        Ok(Transaction {
            data,
            raw_bytes,
            txid,
        })
    }

    /// Parses one transaction from `data`.
    ///
    /// With `strict` set, trailing bytes after the transaction fail the
    /// decode.
    pub fn decode(data: &[u8], strict: bool) -> Result<Transaction, ParseError> {
        let (remaining, transaction) = Self::parse_from_slice(data)?;
        if strict && !remaining.is_empty() {
            return Err(ParseError::TrailingData {
                context: "transaction",
                remaining: remaining.len(),
            });
        }
        Ok(transaction)
    }

    /// Serializes to a freshly materialized byte vector, the exact inverse
    /// of [`Transaction::decode`].
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.raw_bytes.len());
        self.data.encode_into(&mut buf);
        buf
    }

    /// The decoded fields.
    pub fn data(&self) -> &TransactionData {
        &self.data
    }

    /// The transaction format tag.
    pub fn version(&self) -> TxVersion {
        self.data.version
    }

    /// The transaction id: SHA256d over the transaction's exact byte span.
    pub fn txid(&self) -> Hash256 {
        self.txid
    }

    /// The exact bytes this transaction occupies on the wire.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    /// True when this is the miner-created transaction: exactly one input
    /// spending the null prevout.
    pub fn is_coinbase(&self) -> bool {
        self.data.vin.len() == 1 && self.data.vin[0].is_coinbase()
    }
}

impl ParseFromSlice for Transaction {
    fn parse_from_slice(data: &[u8]) -> Result<(&[u8], Self), ParseError> {
        let mut cursor = Cursor::new(data);

        let header = read_u32(&mut cursor, "Transaction::header")?;
        let overwintered = (header >> 31) == 1;
        let version_number = header & 0x7FFF_FFFF;

        let version = if overwintered {
            let version_group_id = read_u32(&mut cursor, "Transaction::nVersionGroupId")?;
            TxVersion::from_overwintered(version_number, version_group_id)?
        } else {
            TxVersion::Legacy(version_number)
        };

        let (rest, vin) = parse_vec::<TxIn>(&data[cursor.position() as usize..])?;
        let (rest, vout) = parse_vec::<TxOut>(rest)?;

        let mut cursor = Cursor::new(rest);
        let lock_time = read_u32(&mut cursor, "Transaction::nLockTime")?;
        let expiry_height = if version.has_expiry_height() {
            read_u32(&mut cursor, "Transaction::nExpiryHeight")?
        } else {
            0
        };
        let value_balance = if version.has_sapling_parts() {
            Some(Amount(read_i64(&mut cursor, "Transaction::valueBalance")?))
        } else {
            None
        };
        let mut rest = &rest[cursor.position() as usize..];

        let mut shielded_spends = Vec::new();
        let mut shielded_outputs = Vec::new();
        if version.has_sapling_parts() {
            let (remaining, spends) = parse_vec::<SpendDescription>(rest)?;
            let (remaining, outputs) = parse_vec::<OutputDescription>(remaining)?;
            rest = remaining;
            shielded_spends = spends;
            shielded_outputs = outputs;
        }

        let mut joinsplits = Vec::new();
        let mut joinsplit_pubkey = None;
        let mut joinsplit_sig = None;
        if version.has_joinsplits() {
            let mut cursor = Cursor::new(rest);
            let count = CompactSize::read(&mut cursor)?;
            rest = &rest[cursor.position() as usize..];
            joinsplits.reserve((count as usize).min(1 << 16));
            for _ in 0..count {
                let (remaining, joinsplit) =
                    JoinSplitDescription::parse_from_slice(rest, version.sprout_proof_kind())?;
                rest = remaining;
                joinsplits.push(joinsplit);
            }

            if !joinsplits.is_empty() {
                let mut cursor = Cursor::new(rest);
                joinsplit_pubkey = Some(Hash256::from(read_array::<32>(
                    &mut cursor,
                    "Transaction::joinSplitPubKey",
                )?));
                joinsplit_sig = Some(read_array::<64>(&mut cursor, "Transaction::joinSplitSig")?);
                rest = &rest[cursor.position() as usize..];
            }
        }

        let binding_sig = if version.has_sapling_parts()
            && (!shielded_spends.is_empty() || !shielded_outputs.is_empty())
        {
            let mut cursor = Cursor::new(rest);
            let sig = read_array::<64>(&mut cursor, "Transaction::bindingSig")?;
            rest = &rest[cursor.position() as usize..];
            Some(sig)
        } else {
            None
        };

        let raw_bytes = data[..data.len() - rest.len()].to_vec();
        let txid = Hash256::from(sha256d(&raw_bytes));
        tracing::trace!(
            txid = %txid,
            version = version.number(),
            vin = vin.len(),
            vout = vout.len(),
            "decoded transaction"
        );

        Ok((
            rest,
            Transaction {
                data: TransactionData {
                    version,
                    vin,
                    vout,
                    lock_time,
                    expiry_height,
                    value_balance,
                    shielded_spends,
                    shielded_outputs,
                    joinsplits,
                    joinsplit_pubkey,
                    joinsplit_sig,
                    binding_sig,
                },
                raw_bytes,
                txid,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn null_input() -> TxIn {
        TxIn {
            prevout: OutPoint::NULL,
            script_sig: Script(vec![0x51]),
            sequence: u32::MAX,
        }
    }

    fn small_output() -> TxOut {
        TxOut {
            value: Amount(625_000_000),
            script_pubkey: Script(vec![0x76, 0xa9, 0x14].into_iter().chain([0u8; 20]).chain([0x88, 0xac]).collect()),
        }
    }

    fn legacy_v1_data() -> TransactionData {
        TransactionData {
            version: TxVersion::Legacy(1),
            vin: vec![null_input()],
            vout: vec![small_output()],
            lock_time: 0,
            expiry_height: 0,
            value_balance: None,
            shielded_spends: Vec::new(),
            shielded_outputs: Vec::new(),
            joinsplits: Vec::new(),
            joinsplit_pubkey: None,
            joinsplit_sig: None,
            binding_sig: None,
        }
    }

    #[test]
    fn overwintered_shape_validation() {
        assert_eq!(
            TxVersion::from_overwintered(3, OVERWINTER_VERSION_GROUP_ID).unwrap(),
            TxVersion::Overwinter
        );
        assert_eq!(
            TxVersion::from_overwintered(4, SAPLING_VERSION_GROUP_ID).unwrap(),
            TxVersion::Sapling
        );
        assert!(matches!(
            TxVersion::from_overwintered(4, OVERWINTER_VERSION_GROUP_ID),
            Err(ParseError::UnknownTxShape { .. })
        ));
        assert!(matches!(
            TxVersion::from_overwintered(5, 0x26A7_270A),
            Err(ParseError::UnknownTxShape { .. })
        ));
    }

    #[test]
    fn version_tag_presence_rules() {
        assert!(!TxVersion::Legacy(1).has_joinsplits());
        assert!(TxVersion::Legacy(2).has_joinsplits());
        assert!(TxVersion::Overwinter.has_expiry_height());
        assert!(!TxVersion::Overwinter.has_sapling_parts());
        assert!(TxVersion::Sapling.has_sapling_parts());
        assert_eq!(TxVersion::Legacy(2).sprout_proof_kind(), SproutProofKind::Phgr);
        assert_eq!(TxVersion::Overwinter.sprout_proof_kind(), SproutProofKind::Phgr);
        assert_eq!(TxVersion::Sapling.sprout_proof_kind(), SproutProofKind::Groth);
        assert_eq!(TxVersion::Legacy(2).group_id(), 0);
    }

    #[test]
    fn legacy_v1_round_trip() {
        let tx = Transaction::from_data(legacy_v1_data()).unwrap();
        let bytes = tx.encode();
        let decoded = Transaction::decode(&bytes, true).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.raw_bytes(), bytes.as_slice());
        assert_eq!(decoded.txid(), Hash256::from(sha256d(&bytes)));
        assert!(decoded.is_coinbase());
    }

    #[test]
    fn legacy_v1_header_word_is_plain_version() {
        let tx = Transaction::from_data(legacy_v1_data()).unwrap();
        assert_eq!(&tx.encode()[..4], &1u32.to_le_bytes());
    }

    #[test]
    fn sapling_header_word_sets_high_bit() {
        let mut data = legacy_v1_data();
        data.version = TxVersion::Sapling;
        data.value_balance = Some(Amount::ZERO);
        let tx = Transaction::from_data(data).unwrap();
        let bytes = tx.encode();
        assert_eq!(&bytes[..4], &(4u32 | 1 << 31).to_le_bytes());
        assert_eq!(&bytes[4..8], &SAPLING_VERSION_GROUP_ID.to_le_bytes());
        // Empty shielded vectors: no bindingSig on the wire.
        let decoded = Transaction::decode(&bytes, true).unwrap();
        assert_eq!(decoded.data().binding_sig, None);
        assert_eq!(decoded.data().value_balance, Some(Amount::ZERO));
    }

    #[test]
    fn from_data_rejects_inconsistent_sections() {
        // bindingSig without shielded activity.
        let mut data = legacy_v1_data();
        data.version = TxVersion::Sapling;
        data.value_balance = Some(Amount::ZERO);
        data.binding_sig = Some([0u8; 64]);
        assert!(Transaction::from_data(data).is_err());

        // Joinsplits on a v1 transaction.
        let mut data = legacy_v1_data();
        data.joinsplits = vec![sample_joinsplit(SproutProofKind::Phgr)];
        data.joinsplit_pubkey = Some(Hash256::ZERO);
        data.joinsplit_sig = Some([0u8; 64]);
        assert!(Transaction::from_data(data).is_err());

        // Missing joinSplitSig.
        let mut data = legacy_v1_data();
        data.version = TxVersion::Legacy(2);
        data.joinsplits = vec![sample_joinsplit(SproutProofKind::Phgr)];
        assert!(Transaction::from_data(data).is_err());

        // valueBalance on a legacy transaction.
        let mut data = legacy_v1_data();
        data.value_balance = Some(Amount::ZERO);
        assert!(Transaction::from_data(data).is_err());
    }

    fn sample_joinsplit(kind: SproutProofKind) -> JoinSplitDescription {
        JoinSplitDescription {
            vpub_old: Amount(0),
            vpub_new: Amount(100_000_000),
            anchor: Hash256([3u8; 32]),
            nullifiers: [Hash256([4u8; 32]), Hash256([5u8; 32])],
            commitments: [Hash256([6u8; 32]), Hash256([7u8; 32])],
            onetime_pubkey: Hash256([8u8; 32]),
            random_seed: Hash256([9u8; 32]),
            macs: [Hash256([10u8; 32]), Hash256([11u8; 32])],
            proof: match kind {
                SproutProofKind::Phgr => SproutProof::Phgr(PhgrProof([12u8; PHGR_PROOF_SIZE])),
                SproutProofKind::Groth => SproutProof::Groth(GrothProof([12u8; GROTH_PROOF_SIZE])),
            },
            ciphertexts: [[13u8; SPROUT_CIPHERTEXT_SIZE], [14u8; SPROUT_CIPHERTEXT_SIZE]],
        }
    }

    #[test]
    fn legacy_v2_joinsplit_round_trip_uses_phgr() {
        let mut data = legacy_v1_data();
        data.version = TxVersion::Legacy(2);
        data.joinsplits = vec![sample_joinsplit(SproutProofKind::Phgr)];
        data.joinsplit_pubkey = Some(Hash256([20u8; 32]));
        data.joinsplit_sig = Some([21u8; 64]);
        let tx = Transaction::from_data(data).unwrap();

        let decoded = Transaction::decode(&tx.encode(), true).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(
            decoded.data().joinsplits[0].proof.kind(),
            SproutProofKind::Phgr
        );
    }

    #[test]
    fn sapling_joinsplit_uses_groth() {
        let mut data = legacy_v1_data();
        data.version = TxVersion::Sapling;
        data.value_balance = Some(Amount(-50_000));
        data.joinsplits = vec![sample_joinsplit(SproutProofKind::Groth)];
        data.joinsplit_pubkey = Some(Hash256([20u8; 32]));
        data.joinsplit_sig = Some([21u8; 64]);
        let tx = Transaction::from_data(data).unwrap();

        let decoded = Transaction::decode(&tx.encode(), true).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(
            decoded.data().joinsplits[0].proof.kind(),
            SproutProofKind::Groth
        );
    }

    #[test]
    fn proof_kind_must_match_version() {
        let mut data = legacy_v1_data();
        data.version = TxVersion::Legacy(2);
        data.joinsplits = vec![sample_joinsplit(SproutProofKind::Groth)];
        data.joinsplit_pubkey = Some(Hash256([20u8; 32]));
        data.joinsplit_sig = Some([21u8; 64]);
        assert!(Transaction::from_data(data).is_err());
    }

    #[test]
    fn decode_rejects_unknown_overwintered_shape() {
        // Overwintered v5 header word with an arbitrary group id.
        let mut bytes = (5u32 | 1 << 31).to_le_bytes().to_vec();
        bytes.extend_from_slice(&0x26A7_270Au32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 16]);
        assert!(matches!(
            Transaction::decode(&bytes, false),
            Err(ParseError::UnknownTxShape { version: 5, .. })
        ));
    }

    #[test]
    fn decode_rejects_truncated_input() {
        let tx = Transaction::from_data(legacy_v1_data()).unwrap();
        let bytes = tx.encode();
        assert!(Transaction::decode(&bytes[..bytes.len() - 3], false).is_err());
    }

    #[test]
    fn strict_decode_rejects_trailing_bytes() {
        let tx = Transaction::from_data(legacy_v1_data()).unwrap();
        let mut bytes = tx.encode();
        bytes.push(0);
        assert!(matches!(
            Transaction::decode(&bytes, true),
            Err(ParseError::TrailingData { .. })
        ));
        assert!(Transaction::decode(&bytes, false).is_ok());
    }

    #[test]
    fn non_coinbase_input() {
        let mut data = legacy_v1_data();
        data.vin[0].prevout = OutPoint {
            hash: Hash256([9u8; 32]),
            n: 1,
        };
        let tx = Transaction::from_data(data).unwrap();
        assert!(!tx.is_coinbase());
    }
}
