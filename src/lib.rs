// Single-node proof-of-work ledger
//
// Blocks are mined over signed UTXO transactions, persisted in sled and read
// back newest first. Balances are derived by replaying the chain.

pub mod cli;
pub mod config;
pub mod consensus;
pub mod core;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod storage;
pub mod wallet;

// Re-exports for convenience
pub use crate::cli::{Cli, CliHandler};
pub use crate::config::{Config, LogConfig};
pub use crate::consensus::{BlockValidator, CancelFlag, ProofOfWork, Target, ValidationError};
pub use crate::core::{Block, Hash256, PubKeyHash, Transaction, TxInput, TxOutput};
pub use crate::error::{LedgerError, Result};
pub use crate::ledger::{Ledger, LedgerIter};
pub use crate::storage::{BlockchainDB, OutPoint, UtxoSet};
pub use crate::wallet::{Address, KeyPair, Keystore, TransactionBuilder};
