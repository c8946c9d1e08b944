// Block and chain validation
//
// Advisory only: appending never runs these checks. They answer "is the
// stored chain still what was mined and signed?"

use crate::consensus::pow::ProofOfWork;
use crate::core::{Block, ChainView, Hash256, Transaction};
use crate::error::LedgerError;
use crate::ledger::Ledger;

/// Validation error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Block hash doesn't meet the target or doesn't match its contents
    InvalidProofOfWork(Hash256),
    /// Genesis must hold exactly one coinbase transaction
    InvalidGenesis(Hash256),
    /// Stored transaction id differs from the recomputed one
    InvalidTransactionId(Hash256),
    /// An input signature does not verify
    InvalidSignature(Hash256),
    /// An input references a transaction that is not on the chain
    MissingPriorTransaction(Hash256),
    /// Block stored under one hash claims another
    BrokenLink { expected: Hash256, found: Hash256 },
    /// Storage failed while looking something up
    Lookup(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ValidationError::InvalidProofOfWork(hash) => {
                write!(f, "Invalid proof of work in block {}", hash)
            }
            ValidationError::InvalidGenesis(hash) => {
                write!(f, "Genesis block {} must hold exactly one coinbase", hash)
            }
            ValidationError::InvalidTransactionId(id) => {
                write!(f, "Transaction {} does not match its contents", id)
            }
            ValidationError::InvalidSignature(id) => {
                write!(f, "Invalid signature in transaction {}", id)
            }
            ValidationError::MissingPriorTransaction(id) => {
                write!(f, "Transaction {} spends an unknown output", id)
            }
            ValidationError::BrokenLink { expected, found } => {
                write!(f, "Broken link: expected block {}, found {}", expected, found)
            }
            ValidationError::Lookup(msg) => write!(f, "Lookup failed: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Summary of a successful chain walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChainReport {
    pub blocks: usize,
    pub transactions: usize,
}

/// Block validator
#[derive(Default)]
pub struct BlockValidator {
    pow: ProofOfWork,
}

impl BlockValidator {
    /// Validator checking proof of work at `bits` difficulty
    pub fn new(bits: u32) -> Self {
        Self {
            pow: ProofOfWork::new(bits),
        }
    }

    /// Validate a block: proof of work, genesis shape, then every transaction
    pub fn validate_block<C: ChainView + ?Sized>(
        &self,
        block: &Block,
        chain: &C,
    ) -> Result<(), ValidationError> {
        if !self.pow.validate(block) {
            return Err(ValidationError::InvalidProofOfWork(block.hash));
        }

        if block.is_genesis()
            && !(block.transactions.len() == 1 && block.transactions[0].is_coinbase())
        {
            return Err(ValidationError::InvalidGenesis(block.hash));
        }

        for tx in &block.transactions {
            self.validate_transaction(tx, chain)?;
        }
        Ok(())
    }

    /// Validate a transaction's id and, unless coinbase, its signatures
    pub fn validate_transaction<C: ChainView + ?Sized>(
        &self,
        tx: &Transaction,
        chain: &C,
    ) -> Result<(), ValidationError> {
        if !tx.id_is_consistent() {
            return Err(ValidationError::InvalidTransactionId(tx.id));
        }
        if tx.is_coinbase() {
            return Ok(());
        }

        let lookup_error = |e: LedgerError| match e {
            LedgerError::MissingPriorTransaction(_) => ValidationError::MissingPriorTransaction(tx.id),
            other => ValidationError::Lookup(other.to_string()),
        };
        let prior = chain.prior_transactions(tx).map_err(&lookup_error)?;
        match tx.verify(&prior) {
            Ok(true) => Ok(()),
            Ok(false) => Err(ValidationError::InvalidSignature(tx.id)),
            Err(e) => Err(lookup_error(e)),
        }
    }

    /// Walk the whole chain from head to genesis, validating every block
    pub fn validate_chain(&self, ledger: &Ledger) -> Result<ChainReport, ValidationError> {
        let mut report = ChainReport::default();
        let mut expected = ledger.head();

        for item in ledger.iter() {
            let block = item.map_err(|e| ValidationError::Lookup(e.to_string()))?;
            if block.hash != expected {
                return Err(ValidationError::BrokenLink {
                    expected,
                    found: block.hash,
                });
            }

            self.validate_block(&block, ledger)?;
            report.blocks += 1;
            report.transactions += block.transactions.len();

            if let Some(prev) = block.prev_hash {
                expected = prev;
            }
        }

        log::info!(
            "Chain valid: {} blocks, {} transactions",
            report.blocks,
            report.transactions
        );
        Ok(report)
    }
}
