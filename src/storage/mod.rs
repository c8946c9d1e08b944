// Storage layer: persisted blocks and the cached UTXO projection

mod blockchain_db;
mod utxo_set;

pub use blockchain_db::BlockchainDB;
pub use utxo_set::{OutPoint, UtxoSet};
