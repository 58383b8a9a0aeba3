//! A codec for Zcash consensus-serialized block and transaction data.
//!
//! Raw block bytes decode into a typed object graph, the graph re-encodes to
//! byte-identical wire form, and content-addressed identifiers (block hash,
//! txid, merkle root) are computed over the exact byte spans consumed during
//! decoding. A serde-based "porcelain" layer mirrors the JSON shape returned
//! by zcashd's `getblock` / `getrawtransaction` RPCs.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod rpc;

pub use chain::block::{Block, BlockHeader, HEADER_BYTES};
pub use chain::error::ParseError;
pub use chain::transaction::{Transaction, TransactionData, TxVersion};
pub use chain::types::{Amount, Hash256, COIN};
pub use chain::utils::{hash160, merkle_path, merkle_root, sha256d};
pub use rpc::block::{BlockObject, BlockPorcelainMode};
pub use rpc::transaction::TransactionObject;
