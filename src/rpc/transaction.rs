//! Porcelain types for transactions, mirroring verbose `getrawtransaction`.

use hex::{FromHex, ToHex};
use serde::{Deserialize, Serialize};

use crate::chain::error::ParseError;
use crate::chain::script::Script;
use crate::chain::transaction::{
    GrothProof, JoinSplitDescription, OutPoint, OutputDescription, PhgrProof, SpendDescription,
    SproutProof, SproutProofKind, Transaction, TransactionData, TxIn, TxOut, TxVersion,
    GROTH_PROOF_SIZE, PHGR_PROOF_SIZE,
};
use crate::chain::types::{Amount, Hash256};

/// Verbose porcelain form of a transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionObject {
    /// The transaction id, byte-reversed hex. Derived; ignored on
    /// reconstruction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,

    /// Whether the packed version word has the overwintered bit set.
    pub overwintered: bool,

    /// The transaction format version.
    pub version: u32,

    /// Version group id as 8 zero-padded hex characters, present only when
    /// overwintered.
    #[serde(
        rename = "versiongroupid",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub version_group_id: Option<String>,

    /// Transaction lock time.
    pub locktime: u32,

    /// Expiry height, present for Overwinter v3 and Sapling v4.
    #[serde(
        rename = "expiryheight",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry_height: Option<u32>,

    /// Transparent inputs.
    pub vin: Vec<Vin>,

    /// Transparent outputs.
    pub vout: Vec<Vout>,

    /// Joinsplit descriptions, present for version 2 and above.
    #[serde(
        rename = "vjoinsplit",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub vjoinsplit: Option<Vec<JoinSplitObject>>,

    /// Joinsplit verification key, present when `vjoinsplit` is non-empty.
    #[serde(
        rename = "joinSplitPubKey",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub join_split_pub_key: Option<String>,

    /// Joinsplit signature, present when `vjoinsplit` is non-empty.
    #[serde(
        rename = "joinSplitSig",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub join_split_sig: Option<String>,

    /// Sapling value balance in ZEC, present for v4.
    #[serde(
        rename = "valueBalance",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub value_balance: Option<f64>,

    /// Sapling value balance in zatoshis, present for v4.
    #[serde(
        rename = "valueBalanceZat",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub value_balance_zat: Option<i64>,

    /// Sapling shielded spends, present for v4.
    #[serde(
        rename = "vShieldedSpend",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub v_shielded_spend: Option<Vec<SpendObject>>,

    /// Sapling shielded outputs, present for v4.
    #[serde(
        rename = "vShieldedOutput",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub v_shielded_output: Option<Vec<OutputObject>>,

    /// Sapling binding signature, present when a v4 transaction has
    /// shielded activity.
    #[serde(
        rename = "bindingSig",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub binding_sig: Option<String>,
}

/// A transparent input: the coinbase input collapses to its script bytes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Vin {
    /// The miner-created input.
    Coinbase(CoinbaseVin),
    /// An input spending a previous output.
    Standard(StandardVin),
}

/// Porcelain form of the coinbase input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoinbaseVin {
    /// The coinbase script bytes as hex.
    pub coinbase: String,
    /// Sequence number.
    pub sequence: u32,
}

/// Porcelain form of a non-coinbase input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardVin {
    /// Txid of the transaction holding the spent output, byte-reversed hex.
    pub txid: String,
    /// Index of the spent output.
    pub vout: u32,
    /// The unlocking script.
    #[serde(rename = "scriptSig")]
    pub script_sig: ScriptSig,
    /// Sequence number.
    pub sequence: u32,
}

/// An unlocking script in disassembled and raw hex form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScriptSig {
    /// Disassembly of the script.
    pub asm: String,
    /// Raw script bytes as hex.
    pub hex: String,
}

/// Porcelain form of a transparent output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vout {
    /// Output value in ZEC.
    pub value: f64,
    /// Output value in zatoshis.
    #[serde(rename = "valueZat", default, skip_serializing_if = "Option::is_none")]
    pub value_zat: Option<i64>,
    /// Output value in zatoshis (zcashd compatibility alias).
    #[serde(rename = "valueSat", default, skip_serializing_if = "Option::is_none")]
    pub value_sat: Option<i64>,
    /// Position of the output within the transaction.
    pub n: u32,
    /// The locking script.
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
}

/// A locking script, with destination data when the template is recognised.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScriptPubKey {
    /// Disassembly of the script.
    pub asm: String,
    /// Raw script bytes as hex.
    pub hex: String,
    /// Signatures the template requires.
    #[serde(rename = "reqSigs", default, skip_serializing_if = "Option::is_none")]
    pub req_sigs: Option<u32>,
    /// Template name (`pubkeyhash`, `scripthash`, `pubkey`, `nulldata`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub script_type: Option<String>,
    /// Base58Check destination addresses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Vec<String>>,
}

/// Porcelain form of a Sapling spend description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpendObject {
    /// Value commitment, byte-reversed hex.
    pub cv: String,
    /// Sapling anchor, byte-reversed hex.
    pub anchor: String,
    /// Nullifier, byte-reversed hex.
    pub nullifier: String,
    /// Randomized validating key, byte-reversed hex.
    pub rk: String,
    /// Groth16 proof as hex.
    pub proof: String,
    /// Spend authorization signature as hex.
    #[serde(rename = "spendAuthSig")]
    pub spend_auth_sig: String,
}

/// Porcelain form of a Sapling output description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputObject {
    /// Value commitment, byte-reversed hex.
    pub cv: String,
    /// Note commitment, byte-reversed hex.
    pub cmu: String,
    /// Ephemeral public key, byte-reversed hex.
    #[serde(rename = "ephemeralKey")]
    pub ephemeral_key: String,
    /// Recipient note ciphertext as hex.
    #[serde(rename = "encCiphertext")]
    pub enc_ciphertext: String,
    /// Sender note ciphertext as hex.
    #[serde(rename = "outCiphertext")]
    pub out_ciphertext: String,
    /// Groth16 proof as hex.
    pub proof: String,
}

/// Porcelain form of a joinsplit description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JoinSplitObject {
    /// Value removed from the transparent pool, in ZEC.
    pub vpub_old: f64,
    /// Value removed from the transparent pool, in zatoshis.
    #[serde(rename = "vpub_oldZat")]
    pub vpub_old_zat: i64,
    /// Value returned to the transparent pool, in ZEC.
    pub vpub_new: f64,
    /// Value returned to the transparent pool, in zatoshis.
    #[serde(rename = "vpub_newZat")]
    pub vpub_new_zat: i64,
    /// Sprout anchor, byte-reversed hex.
    pub anchor: String,
    /// The two input note nullifiers, byte-reversed hex.
    pub nullifiers: Vec<String>,
    /// The two output note commitments, byte-reversed hex.
    pub commitments: Vec<String>,
    /// Note-encryption ephemeral key, byte-reversed hex.
    #[serde(rename = "onetimePubKey")]
    pub onetime_pub_key: String,
    /// Output note randomness seed, byte-reversed hex.
    #[serde(rename = "randomSeed")]
    pub random_seed: String,
    /// The two message authentication tags, byte-reversed hex.
    pub macs: Vec<String>,
    /// Zero-knowledge proof as hex: 296 bytes PHGR13 or 192 bytes Groth16.
    pub proof: String,
    /// The two output note ciphertexts as hex.
    pub ciphertexts: Vec<String>,
}

impl From<&Transaction> for TransactionObject {
    fn from(tx: &Transaction) -> Self {
        let data = tx.data();
        let version = data.version;

        TransactionObject {
            txid: Some(tx.txid().to_string()),
            overwintered: version.is_overwintered(),
            version: version.number(),
            version_group_id: version
                .is_overwintered()
                .then(|| format!("{:08x}", version.group_id())),
            locktime: data.lock_time,
            expiry_height: version.has_expiry_height().then_some(data.expiry_height),
            vin: data.vin.iter().map(Vin::from).collect(),
            vout: data
                .vout
                .iter()
                .enumerate()
                .map(|(n, out)| Vout::from_tx_out(out, n as u32))
                .collect(),
            vjoinsplit: version
                .has_joinsplits()
                .then(|| data.joinsplits.iter().map(JoinSplitObject::from).collect()),
            join_split_pub_key: data.joinsplit_pubkey.map(|key| key.to_string()),
            join_split_sig: data.joinsplit_sig.map(hex::encode),
            value_balance: data.value_balance.map(Amount::to_zec),
            value_balance_zat: data.value_balance.map(Amount::zatoshis),
            v_shielded_spend: version.has_sapling_parts().then(|| {
                data.shielded_spends
                    .iter()
                    .map(SpendObject::from)
                    .collect()
            }),
            v_shielded_output: version.has_sapling_parts().then(|| {
                data.shielded_outputs
                    .iter()
                    .map(OutputObject::from)
                    .collect()
            }),
            binding_sig: data.binding_sig.map(hex::encode),
        }
    }
}

impl From<&TxIn> for Vin {
    fn from(input: &TxIn) -> Self {
        if input.is_coinbase() {
            Vin::Coinbase(CoinbaseVin {
                coinbase: input.script_sig.to_string(),
                sequence: input.sequence,
            })
        } else {
            Vin::Standard(StandardVin {
                txid: input.prevout.hash.to_string(),
                vout: input.prevout.n,
                script_sig: ScriptSig {
                    asm: input.script_sig.to_asm(),
                    hex: input.script_sig.to_string(),
                },
                sequence: input.sequence,
            })
        }
    }
}

impl Vout {
    fn from_tx_out(output: &TxOut, n: u32) -> Self {
        let kind = output.script_pubkey.classify();
        Vout {
            value: output.value.to_zec(),
            value_zat: Some(output.value.zatoshis()),
            value_sat: Some(output.value.zatoshis()),
            n,
            script_pub_key: ScriptPubKey {
                asm: output.script_pubkey.to_asm(),
                hex: output.script_pubkey.to_string(),
                req_sigs: kind.req_sigs(),
                script_type: kind.as_str().map(str::to_string),
                addresses: kind.addresses(),
            },
        }
    }
}

impl From<&SpendDescription> for SpendObject {
    fn from(spend: &SpendDescription) -> Self {
        SpendObject {
            cv: spend.cv.to_string(),
            anchor: spend.anchor.to_string(),
            nullifier: spend.nullifier.to_string(),
            rk: spend.rk.to_string(),
            proof: hex::encode(spend.proof.0),
            spend_auth_sig: hex::encode(spend.spend_auth_sig),
        }
    }
}

impl From<&OutputDescription> for OutputObject {
    fn from(output: &OutputDescription) -> Self {
        OutputObject {
            cv: output.cv.to_string(),
            cmu: output.cmu.to_string(),
            ephemeral_key: output.ephemeral_key.to_string(),
            enc_ciphertext: output.enc_ciphertext.encode_hex(),
            out_ciphertext: output.out_ciphertext.encode_hex(),
            proof: hex::encode(output.proof.0),
        }
    }
}

impl From<&JoinSplitDescription> for JoinSplitObject {
    fn from(joinsplit: &JoinSplitDescription) -> Self {
        JoinSplitObject {
            vpub_old: joinsplit.vpub_old.to_zec(),
            vpub_old_zat: joinsplit.vpub_old.zatoshis(),
            vpub_new: joinsplit.vpub_new.to_zec(),
            vpub_new_zat: joinsplit.vpub_new.zatoshis(),
            anchor: joinsplit.anchor.to_string(),
            nullifiers: joinsplit
                .nullifiers
                .iter()
                .map(Hash256::to_string)
                .collect(),
            commitments: joinsplit
                .commitments
                .iter()
                .map(Hash256::to_string)
                .collect(),
            onetime_pub_key: joinsplit.onetime_pubkey.to_string(),
            random_seed: joinsplit.random_seed.to_string(),
            macs: joinsplit.macs.iter().map(Hash256::to_string).collect(),
            proof: hex::encode(joinsplit.proof.as_bytes()),
            ciphertexts: joinsplit.ciphertexts.iter().map(hex::encode).collect(),
        }
    }
}

impl Transaction {
    /// Renders the transaction in its porcelain form.
    pub fn to_porcelain(&self) -> TransactionObject {
        TransactionObject::from(self)
    }

    /// Validates a porcelain value and reconstructs the transaction,
    /// re-encoding to recompute `txid` and the raw byte span.
    pub fn from_porcelain(object: &TransactionObject) -> Result<Transaction, ParseError> {
        Transaction::try_from(object)
    }
}

impl TryFrom<&TransactionObject> for Transaction {
    type Error = ParseError;

    fn try_from(object: &TransactionObject) -> Result<Self, Self::Error> {
        let version = if object.overwintered {
            let group_hex = object.version_group_id.as_deref().ok_or_else(|| {
                ParseError::porcelain("versiongroupid", "required when overwintered")
            })?;
            let group = u32::from_str_radix(group_hex, 16)
                .map_err(|e| ParseError::porcelain("versiongroupid", e.to_string()))?;
            TxVersion::from_overwintered(object.version, group)?
        } else {
            TxVersion::Legacy(object.version)
        };

        let vin = object
            .vin
            .iter()
            .map(TxIn::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let vout = object
            .vout
            .iter()
            .map(TxOut::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let proof_kind = version.sprout_proof_kind();
        let joinsplits = object
            .vjoinsplit
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|joinsplit| parse_joinsplit(joinsplit, proof_kind))
            .collect::<Result<Vec<_>, _>>()?;

        let data = TransactionData {
            version,
            vin,
            vout,
            lock_time: object.locktime,
            expiry_height: object.expiry_height.unwrap_or(0),
            value_balance: object
                .value_balance_zat
                .map(Amount)
                .or_else(|| object.value_balance.and_then(|zec| Amount::from_zec(zec).ok())),
            shielded_spends: object
                .v_shielded_spend
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(SpendDescription::try_from)
                .collect::<Result<Vec<_>, _>>()?,
            shielded_outputs: object
                .v_shielded_output
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(OutputDescription::try_from)
                .collect::<Result<Vec<_>, _>>()?,
            joinsplits,
            joinsplit_pubkey: object
                .join_split_pub_key
                .as_deref()
                .map(|key| parse_hash("joinSplitPubKey", key))
                .transpose()?,
            joinsplit_sig: object
                .join_split_sig
                .as_deref()
                .map(|sig| parse_fixed::<64>("joinSplitSig", sig))
                .transpose()?,
            binding_sig: object
                .binding_sig
                .as_deref()
                .map(|sig| parse_fixed::<64>("bindingSig", sig))
                .transpose()?,
        };

        Transaction::from_data(data)
    }
}

impl TryFrom<&Vin> for TxIn {
    type Error = ParseError;

    fn try_from(vin: &Vin) -> Result<Self, Self::Error> {
        match vin {
            Vin::Coinbase(coinbase) => Ok(TxIn {
                prevout: OutPoint::NULL,
                script_sig: Script(parse_bytes("coinbase", &coinbase.coinbase)?),
                sequence: coinbase.sequence,
            }),
            Vin::Standard(standard) => Ok(TxIn {
                prevout: OutPoint {
                    hash: parse_hash("vin.txid", &standard.txid)?,
                    n: standard.vout,
                },
                script_sig: Script(parse_bytes("scriptSig.hex", &standard.script_sig.hex)?),
                sequence: standard.sequence,
            }),
        }
    }
}

impl TryFrom<&Vout> for TxOut {
    type Error = ParseError;

    fn try_from(vout: &Vout) -> Result<Self, Self::Error> {
        let value = match vout.value_zat.or(vout.value_sat) {
            Some(zats) => Amount(zats),
            None => Amount::from_zec(vout.value)
                .map_err(|e| ParseError::porcelain("vout.value", e))?,
        };
        Ok(TxOut {
            value,
            script_pubkey: Script(parse_bytes(
                "scriptPubKey.hex",
                &vout.script_pub_key.hex,
            )?),
        })
    }
}

impl TryFrom<&SpendObject> for SpendDescription {
    type Error = ParseError;

    fn try_from(spend: &SpendObject) -> Result<Self, Self::Error> {
        Ok(SpendDescription {
            cv: parse_hash("vShieldedSpend.cv", &spend.cv)?,
            anchor: parse_hash("vShieldedSpend.anchor", &spend.anchor)?,
            nullifier: parse_hash("vShieldedSpend.nullifier", &spend.nullifier)?,
            rk: parse_hash("vShieldedSpend.rk", &spend.rk)?,
            proof: GrothProof(parse_fixed::<GROTH_PROOF_SIZE>(
                "vShieldedSpend.proof",
                &spend.proof,
            )?),
            spend_auth_sig: parse_fixed::<64>("vShieldedSpend.spendAuthSig", &spend.spend_auth_sig)?,
        })
    }
}

impl TryFrom<&OutputObject> for OutputDescription {
    type Error = ParseError;

    fn try_from(output: &OutputObject) -> Result<Self, Self::Error> {
        Ok(OutputDescription {
            cv: parse_hash("vShieldedOutput.cv", &output.cv)?,
            cmu: parse_hash("vShieldedOutput.cmu", &output.cmu)?,
            ephemeral_key: parse_hash("vShieldedOutput.ephemeralKey", &output.ephemeral_key)?,
            enc_ciphertext: parse_fixed_via_vec(
                "vShieldedOutput.encCiphertext",
                &output.enc_ciphertext,
            )?,
            out_ciphertext: parse_fixed("vShieldedOutput.outCiphertext", &output.out_ciphertext)?,
            proof: GrothProof(parse_fixed::<GROTH_PROOF_SIZE>(
                "vShieldedOutput.proof",
                &output.proof,
            )?),
        })
    }
}

fn parse_joinsplit(
    object: &JoinSplitObject,
    proof_kind: SproutProofKind,
) -> Result<JoinSplitDescription, ParseError> {
    let proof_bytes = parse_bytes("vjoinsplit.proof", &object.proof)?;
    // The hex alone cannot distinguish the two encodings; the enclosing
    // transaction's version picks the branch and the length must agree.
    let proof = match (proof_kind, proof_bytes.len()) {
        (SproutProofKind::Groth, GROTH_PROOF_SIZE) => {
            let mut raw = [0u8; GROTH_PROOF_SIZE];
            raw.copy_from_slice(&proof_bytes);
            SproutProof::Groth(GrothProof(raw))
        }
        (SproutProofKind::Phgr, PHGR_PROOF_SIZE) => {
            let mut raw = [0u8; PHGR_PROOF_SIZE];
            raw.copy_from_slice(&proof_bytes);
            SproutProof::Phgr(PhgrProof(raw))
        }
        (kind, len) => {
            return Err(ParseError::porcelain(
                "vjoinsplit.proof",
                format!("{len} bytes cannot encode a {kind:?} proof"),
            ))
        }
    };

    Ok(JoinSplitDescription {
        vpub_old: Amount(object.vpub_old_zat),
        vpub_new: Amount(object.vpub_new_zat),
        anchor: parse_hash("vjoinsplit.anchor", &object.anchor)?,
        nullifiers: parse_hash_pair("vjoinsplit.nullifiers", &object.nullifiers)?,
        commitments: parse_hash_pair("vjoinsplit.commitments", &object.commitments)?,
        onetime_pubkey: parse_hash("vjoinsplit.onetimePubKey", &object.onetime_pub_key)?,
        random_seed: parse_hash("vjoinsplit.randomSeed", &object.random_seed)?,
        macs: parse_hash_pair("vjoinsplit.macs", &object.macs)?,
        proof,
        ciphertexts: {
            if object.ciphertexts.len() != 2 {
                return Err(ParseError::porcelain(
                    "vjoinsplit.ciphertexts",
                    format!("expected 2 entries, got {}", object.ciphertexts.len()),
                ));
            }
            [
                parse_fixed_via_vec("vjoinsplit.ciphertexts", &object.ciphertexts[0])?,
                parse_fixed_via_vec("vjoinsplit.ciphertexts", &object.ciphertexts[1])?,
            ]
        },
    })
}

fn parse_hash(field: &'static str, value: &str) -> Result<Hash256, ParseError> {
    Hash256::from_hex(value).map_err(|e| ParseError::porcelain(field, e.to_string()))
}

fn parse_hash_pair(field: &'static str, values: &[String]) -> Result<[Hash256; 2], ParseError> {
    if values.len() != 2 {
        return Err(ParseError::porcelain(
            field,
            format!("expected 2 entries, got {}", values.len()),
        ));
    }
    Ok([parse_hash(field, &values[0])?, parse_hash(field, &values[1])?])
}

fn parse_bytes(field: &'static str, value: &str) -> Result<Vec<u8>, ParseError> {
    hex::decode(value).map_err(|e| ParseError::porcelain(field, e.to_string()))
}

fn parse_fixed<const N: usize>(field: &'static str, value: &str) -> Result<[u8; N], ParseError> {
    let bytes = parse_bytes(field, value)?;
    if bytes.len() != N {
        return Err(ParseError::porcelain(
            field,
            format!("expected {N} bytes, got {}", bytes.len()),
        ));
    }
    let mut raw = [0u8; N];
    raw.copy_from_slice(&bytes);
    Ok(raw)
}

/// Like [`parse_fixed`], for widths outside `hex`'s `FromHex` array impls
/// (note ciphertexts): decode to a vector, then length-check into the array.
fn parse_fixed_via_vec<const N: usize>(
    field: &'static str,
    value: &str,
) -> Result<[u8; N], ParseError> {
    let bytes = parse_bytes(field, value)?;
    if bytes.len() != N {
        return Err(ParseError::porcelain(
            field,
            format!("expected {N} bytes, got {}", bytes.len()),
        ));
    }
    let mut raw = [0u8; N];
    raw.copy_from_slice(&bytes);
    Ok(raw)
}
