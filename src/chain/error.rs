//! Error types for wire decoding, encoding and porcelain conversion.

/// Parser Error Type.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Io Error.
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid Data Error
    #[error("Invalid Data Error: {0}")]
    InvalidData(String),

    /// Cursor read past the end of the input.
    #[error("Error reading {field}: wanted {wanted} bytes, {available} available")]
    Truncated {
        /// Field being read when the input ran out.
        field: &'static str,
        /// Bytes the field required.
        wanted: usize,
        /// Bytes left in the input.
        available: usize,
    },

    /// Overwintered transaction with an unrecognized (version, versiongroupid) pair.
    #[error(
        "unknown transaction shape: overwintered={overwintered}, version={version}, versiongroupid={version_group_id:#010x}"
    )]
    UnknownTxShape {
        /// Overwintered flag from the packed header word.
        overwintered: bool,
        /// Low 31 bits of the packed header word.
        version: u32,
        /// Version group id, 0 when not overwintered.
        version_group_id: u32,
    },

    /// Trailing bytes remained after a strict decode.
    #[error("{context}: {remaining} trailing bytes after strict decode")]
    TrailingData {
        /// What was being decoded.
        context: &'static str,
        /// Number of unconsumed bytes.
        remaining: usize,
    },

    /// Unexpected field size during parsing.
    #[error("Field {field} expected size {expected} bytes, but advanced {actual} bytes")]
    UnexpectedFieldSize {
        /// Field with the wrong size.
        field: &'static str,
        /// Size required by the wire format.
        expected: usize,
        /// Size actually consumed or supplied.
        actual: usize,
    },

    /// Hexadecimal parsing error.
    #[error("Hex Parse Error: {0}")]
    FromHex(#[from] hex::FromHexError),

    /// A porcelain value failed validation.
    #[error("porcelain field {field}: {reason}")]
    Porcelain {
        /// Porcelain field that failed.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Merkle root requested for an empty transaction list.
    #[error("merkle root of an empty leaf set")]
    EmptyMerkleLeaves,

    /// Integer conversion error.
    #[error("Integer conversion error: {0}")]
    TryFromIntError(#[from] std::num::TryFromIntError),
}

impl ParseError {
    /// Shorthand for a porcelain validation failure.
    pub(crate) fn porcelain(field: &'static str, reason: impl Into<String>) -> Self {
        ParseError::Porcelain {
            field,
            reason: reason.into(),
        }
    }
}
