// Error taxonomy for the ledger

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Proof of work exhausted after {attempts} attempts")]
    ProofExhausted { attempts: u64 },

    #[error("Value overflow: {0}")]
    ValueOverflow(String),

    #[error("Mining cancelled")]
    MiningCancelled,

    #[error("Missing prior transaction: {0}")]
    MissingPriorTransaction(String),

    #[error("Corrupt encoding: {0}")]
    CorruptEncoding(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Keystore error: {0}")]
    Keystore(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] crate::consensus::ValidationError),

    #[error("Database error: {0}")]
    Storage(#[from] sled::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<p256::ecdsa::Error> for LedgerError {
    fn from(err: p256::ecdsa::Error) -> Self {
        LedgerError::Crypto(err.to_string())
    }
}
