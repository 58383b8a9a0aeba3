//! The porcelain layer: serde types mirroring the JSON returned by zcashd's
//! `getblock` and `getrawtransaction` RPCs, plus conversions to and from the
//! wire object model.
//!
//! Chain-context RPC fields (`confirmations`, `height`, `chainwork`,
//! `anchor`, `valuePools`, ...) require a full chain view and have no place
//! in a codec; they are neither produced nor accepted here.

pub mod block;
pub mod transaction;
