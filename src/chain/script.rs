//! Transparent script handling: template recognition, ASM rendering and
//! Base58Check address encoding.
//!
//! Only the script bytes themselves take part in the wire round-trip; the
//! helpers here feed the porcelain `scriptPubKey` rendering.

use std::fmt;

use hex::ToHex;

use crate::chain::utils::{hash160, sha256d};

/// Version bytes for a mainnet transparent P2PKH address (`t1...`).
pub const P2PKH_ADDRESS_PREFIX: [u8; 2] = [0x1C, 0xB8];
/// Version bytes for a mainnet transparent P2SH address (`t3...`).
pub const P2SH_ADDRESS_PREFIX: [u8; 2] = [0x1C, 0xBD];

/// A raw transparent script (scriptSig or scriptPubKey).
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Script(pub Vec<u8>);

impl Script {
    /// Borrow the raw script bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Try to recognise a standard locking-script template.
    pub fn classify(&self) -> ScriptKind {
        let script = self.0.as_slice();

        // P2PKH 76 a9 14 <20-B hash> 88 ac
        const P2PKH_PREFIX: &[u8] = &[0x76, 0xa9, 0x14];
        const P2PKH_SUFFIX: &[u8] = &[0x88, 0xac];

        // P2SH  a9 14 <20-B hash> 87
        const P2SH_PREFIX: &[u8] = &[0xa9, 0x14];
        const P2SH_SUFFIX: &[u8] = &[0x87];

        if script.starts_with(P2PKH_PREFIX) && script.ends_with(P2PKH_SUFFIX) && script.len() == 25
        {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(&script[3..23]);
            return ScriptKind::PubKeyHash(hash);
        }
        if script.starts_with(P2SH_PREFIX) && script.ends_with(P2SH_SUFFIX) && script.len() == 23 {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(&script[2..22]);
            return ScriptKind::ScriptHash(hash);
        }
        // P2PK <33|65-B pubkey push> ac
        let pubkey = match script.first().copied() {
            Some(33) if script.len() == 35 && matches!(script[1], 0x02 | 0x03) => {
                Some(&script[1..34])
            }
            Some(65) if script.len() == 67 && script[1] == 0x04 => Some(&script[1..66]),
            _ => None,
        };
        if let Some(pubkey) = pubkey {
            if script[script.len() - 1] == opcode::OP_CHECKSIG {
                return ScriptKind::PubKey(pubkey.to_vec());
            }
        }
        if script.first() == Some(&opcode::OP_RETURN) {
            return ScriptKind::NullData;
        }
        ScriptKind::NonStandard
    }

    /// Render the script in the RPC's ASM form: opcode names with pushdata
    /// shown as bare hex. A script that runs out of bytes mid-push renders
    /// the recognised prefix followed by `[error]`.
    pub fn to_asm(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        let script = self.0.as_slice();
        let mut at = 0usize;
        while at < script.len() {
            let op = script[at];
            at += 1;
            let push_len = match op {
                1..=75 => Some(op as usize),
                opcode::OP_PUSHDATA1 => match script.get(at) {
                    Some(&n) => {
                        at += 1;
                        Some(n as usize)
                    }
                    None => {
                        parts.push("[error]".to_string());
                        return parts.join(" ");
                    }
                },
                opcode::OP_PUSHDATA2 => match script.get(at..at + 2) {
                    Some(raw) => {
                        at += 2;
                        Some(u16::from_le_bytes([raw[0], raw[1]]) as usize)
                    }
                    None => {
                        parts.push("[error]".to_string());
                        return parts.join(" ");
                    }
                },
                opcode::OP_PUSHDATA4 => match script.get(at..at + 4) {
                    Some(raw) => {
                        at += 4;
                        Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize)
                    }
                    None => {
                        parts.push("[error]".to_string());
                        return parts.join(" ");
                    }
                },
                _ => None,
            };

            match push_len {
                Some(len) => match script.get(at..at + len) {
                    Some(data) => {
                        at += len;
                        parts.push(data.encode_hex::<String>());
                    }
                    None => {
                        parts.push("[error]".to_string());
                        return parts.join(" ");
                    }
                },
                None => parts.push(opcode::name(op).to_string()),
            }
        }
        parts.join(" ")
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0.encode_hex::<String>())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Script")
            .field(&self.0.encode_hex::<String>())
            .finish()
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }
}

impl AsRef<[u8]> for Script {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A recognised locking-script template (or the absence of one).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptKind {
    /// Standard pay-to-public-key-hash output (`t1...`).
    PubKeyHash([u8; 20]),
    /// Standard pay-to-script-hash output (`t3...`).
    ScriptHash([u8; 20]),
    /// Bare pay-to-public-key output; paid to the key's HASH160 address.
    PubKey(Vec<u8>),
    /// Provably unspendable OP_RETURN data carrier.
    NullData,
    /// Anything else.
    NonStandard,
}

impl ScriptKind {
    /// The RPC `type` string, absent for non-standard scripts.
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            ScriptKind::PubKeyHash(_) => Some("pubkeyhash"),
            ScriptKind::ScriptHash(_) => Some("scripthash"),
            ScriptKind::PubKey(_) => Some("pubkey"),
            ScriptKind::NullData => Some("nulldata"),
            ScriptKind::NonStandard => None,
        }
    }

    /// Number of signatures the template requires, where that is meaningful.
    pub fn req_sigs(&self) -> Option<u32> {
        match self {
            ScriptKind::PubKeyHash(_) | ScriptKind::ScriptHash(_) | ScriptKind::PubKey(_) => {
                Some(1)
            }
            ScriptKind::NullData | ScriptKind::NonStandard => None,
        }
    }

    /// The destination addresses this template pays, Base58Check encoded.
    pub fn addresses(&self) -> Option<Vec<String>> {
        match self {
            ScriptKind::PubKeyHash(hash) => {
                Some(vec![encode_base58check(P2PKH_ADDRESS_PREFIX, hash)])
            }
            ScriptKind::ScriptHash(hash) => {
                Some(vec![encode_base58check(P2SH_ADDRESS_PREFIX, hash)])
            }
            ScriptKind::PubKey(pubkey) => Some(vec![encode_base58check(
                P2PKH_ADDRESS_PREFIX,
                &hash160(pubkey),
            )]),
            ScriptKind::NullData | ScriptKind::NonStandard => None,
        }
    }
}

/// Base58Check: version bytes, payload, then the first four bytes of the
/// payload's SHA256d as a checksum.
pub fn encode_base58check(prefix: [u8; 2], payload: &[u8; 20]) -> String {
    let mut raw = Vec::with_capacity(2 + 20 + 4);
    raw.extend_from_slice(&prefix);
    raw.extend_from_slice(payload);
    let checksum = sha256d(&raw);
    raw.extend_from_slice(&checksum[..4]);
    bs58::encode(raw).into_string()
}

/// Script opcode constants and RPC display names for the standard subset.
pub(crate) mod opcode {
    pub const OP_PUSHDATA1: u8 = 0x4c;
    pub const OP_PUSHDATA2: u8 = 0x4d;
    pub const OP_PUSHDATA4: u8 = 0x4e;
    pub const OP_RETURN: u8 = 0x6a;
    pub const OP_CHECKSIG: u8 = 0xac;

    /// RPC display name of an opcode. Small-integer pushes render as their
    /// numeric value, matching the reference node.
    pub fn name(op: u8) -> &'static str {
        match op {
            0x00 => "0",
            0x4f => "-1",
            0x50 => "OP_RESERVED",
            0x51 => "1",
            0x52 => "2",
            0x53 => "3",
            0x54 => "4",
            0x55 => "5",
            0x56 => "6",
            0x57 => "7",
            0x58 => "8",
            0x59 => "9",
            0x5a => "10",
            0x5b => "11",
            0x5c => "12",
            0x5d => "13",
            0x5e => "14",
            0x5f => "15",
            0x60 => "16",
            0x61 => "OP_NOP",
            0x63 => "OP_IF",
            0x64 => "OP_NOTIF",
            0x67 => "OP_ELSE",
            0x68 => "OP_ENDIF",
            0x69 => "OP_VERIFY",
            0x6a => "OP_RETURN",
            0x6b => "OP_TOALTSTACK",
            0x6c => "OP_FROMALTSTACK",
            0x6d => "OP_2DROP",
            0x6e => "OP_2DUP",
            0x6f => "OP_3DUP",
            0x70 => "OP_2OVER",
            0x71 => "OP_2ROT",
            0x72 => "OP_2SWAP",
            0x73 => "OP_IFDUP",
            0x74 => "OP_DEPTH",
            0x75 => "OP_DROP",
            0x76 => "OP_DUP",
            0x77 => "OP_NIP",
            0x78 => "OP_OVER",
            0x79 => "OP_PICK",
            0x7a => "OP_ROLL",
            0x7b => "OP_ROT",
            0x7c => "OP_SWAP",
            0x7d => "OP_TUCK",
            0x7e => "OP_CAT",
            0x82 => "OP_SIZE",
            0x87 => "OP_EQUAL",
            0x88 => "OP_EQUALVERIFY",
            0x8b => "OP_1ADD",
            0x8c => "OP_1SUB",
            0x8f => "OP_NEGATE",
            0x90 => "OP_ABS",
            0x91 => "OP_NOT",
            0x92 => "OP_0NOTEQUAL",
            0x93 => "OP_ADD",
            0x94 => "OP_SUB",
            0x9a => "OP_BOOLAND",
            0x9b => "OP_BOOLOR",
            0x9c => "OP_NUMEQUAL",
            0x9d => "OP_NUMEQUALVERIFY",
            0x9e => "OP_NUMNOTEQUAL",
            0x9f => "OP_LESSTHAN",
            0xa0 => "OP_GREATERTHAN",
            0xa1 => "OP_LESSTHANOREQUAL",
            0xa2 => "OP_GREATERTHANOREQUAL",
            0xa3 => "OP_MIN",
            0xa4 => "OP_MAX",
            0xa5 => "OP_WITHIN",
            0xa6 => "OP_RIPEMD160",
            0xa7 => "OP_SHA1",
            0xa8 => "OP_SHA256",
            0xa9 => "OP_HASH160",
            0xaa => "OP_HASH256",
            0xab => "OP_CODESEPARATOR",
            0xac => "OP_CHECKSIG",
            0xad => "OP_CHECKSIGVERIFY",
            0xae => "OP_CHECKMULTISIG",
            0xaf => "OP_CHECKMULTISIGVERIFY",
            0xb0 => "OP_NOP1",
            0xb1 => "OP_CHECKLOCKTIMEVERIFY",
            0xb2 => "OP_NOP3",
            0xb3 => "OP_NOP4",
            0xb4 => "OP_NOP5",
            0xb5 => "OP_NOP6",
            0xb6 => "OP_NOP7",
            0xb7 => "OP_NOP8",
            0xb8 => "OP_NOP9",
            0xb9 => "OP_NOP10",
            _ => "OP_UNKNOWN",
        }
    }
}
