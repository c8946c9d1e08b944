// Consensus and validation logic

pub mod pow;
pub mod validation;

pub use pow::{CancelFlag, MiningResult, ProofOfWork, Target, DIFFICULTY_BITS};
pub use validation::{BlockValidator, ChainReport, ValidationError};
