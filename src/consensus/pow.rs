// Proof of Work implementation

use crate::core::{tagged_hash, Block, Hash256, TAG_POW};
use crate::error::{LedgerError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Leading zero bits every block hash must have. Not persisted.
pub const DIFFICULTY_BITS: u32 = 12;

/// How many nonces are tried between two looks at the cancel flag
const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// Difficulty target: a digest is valid when it is below 2^(256 - bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    bits: u32,
}

impl Target {
    pub fn new(bits: u32) -> Self {
        Self { bits: bits.min(256) }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// The full 256-bit target, None for zero difficulty (2^256 does not fit)
    pub fn to_hash256(&self) -> Option<Hash256> {
        if self.bits == 0 {
            return None;
        }
        let exponent = (256 - self.bits) as usize;
        let mut target = [0u8; 32];
        target[31 - exponent / 8] = 1 << (exponent % 8);
        Some(Hash256::new(target))
    }

    /// Check if a hash meets this target (hash < target)
    pub fn is_valid_hash(&self, hash: &Hash256) -> bool {
        // Below 2^(256 - bits) exactly when the top `bits` bits are zero
        hash.leading_zero_bits() >= self.bits
    }
}

/// Shared flag that aborts an in-flight search
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Mining result
#[derive(Debug, Clone)]
pub struct MiningResult {
    /// The nonce that was found
    pub nonce: u64,
    /// The resulting digest, which becomes the block hash
    pub hash: Hash256,
    /// Number of attempts
    pub attempts: u64,
    /// Time taken
    pub duration: Duration,
}

impl MiningResult {
    /// Calculate hash rate (hashes per second)
    pub fn hash_rate(&self) -> f64 {
        self.attempts as f64 / self.duration.as_secs_f64().max(f64::EPSILON)
    }
}

/// Proof of Work over (transactions digest, previous hash, nonce)
#[derive(Debug, Clone)]
pub struct ProofOfWork {
    target: Target,
    max_nonce: u64,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self::new(DIFFICULTY_BITS)
    }
}

impl ProofOfWork {
    /// Create a miner with fixed difficulty, searching the full u64 nonce range
    pub fn new(bits: u32) -> Self {
        Self {
            target: Target::new(bits),
            max_nonce: u64::MAX,
        }
    }

    /// Bound the search to nonces 0..=max_nonce
    pub fn with_max_nonce(mut self, max_nonce: u64) -> Self {
        self.max_nonce = max_nonce;
        self
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// txs_digest || prev_hash || nonce (big-endian)
    pub fn preimage(txs_digest: &Hash256, prev_hash: Option<&Hash256>, nonce: u64) -> Vec<u8> {
        let mut data = Self::prefix(txs_digest, prev_hash);
        data.extend_from_slice(&nonce.to_be_bytes());
        data
    }

    pub fn digest(txs_digest: &Hash256, prev_hash: Option<&Hash256>, nonce: u64) -> Hash256 {
        tagged_hash(TAG_POW, &Self::preimage(txs_digest, prev_hash, nonce))
    }

    fn prefix(txs_digest: &Hash256, prev_hash: Option<&Hash256>) -> Vec<u8> {
        let mut data = Vec::with_capacity(32 + 32 + 8);
        data.extend_from_slice(txs_digest.as_bytes());
        if let Some(prev) = prev_hash {
            data.extend_from_slice(prev.as_bytes());
        }
        data
    }

    /// Find the smallest nonce whose digest meets the target.
    ///
    /// Fails with ProofExhausted when the range holds no valid nonce, and with
    /// MiningCancelled as soon as `cancel` is raised.
    pub fn run(
        &self,
        txs_digest: &Hash256,
        prev_hash: Option<&Hash256>,
        cancel: &CancelFlag,
    ) -> Result<MiningResult> {
        let start_time = Instant::now();
        let mut attempts = 0u64;
        let mut data = Self::prefix(txs_digest, prev_hash);
        let prefix_len = data.len();

        for nonce in 0..=self.max_nonce {
            if attempts % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                log::warn!("Mining cancelled after {} attempts", attempts);
                return Err(LedgerError::MiningCancelled);
            }

            data.truncate(prefix_len);
            data.extend_from_slice(&nonce.to_be_bytes());
            let hash = tagged_hash(TAG_POW, &data);
            attempts = attempts.saturating_add(1);

            if self.target.is_valid_hash(&hash) {
                let result = MiningResult {
                    nonce,
                    hash,
                    attempts,
                    duration: start_time.elapsed(),
                };
                log::debug!(
                    "Found nonce {} after {} attempts ({:.1} KH/s)",
                    nonce,
                    attempts,
                    result.hash_rate() / 1000.0
                );
                return Ok(result);
            }

            // Progress indicator every 100k attempts
            if attempts % 100_000 == 0 {
                let elapsed = start_time.elapsed();
                log::debug!("Mining attempts: {} ({:.1} KH/s)",
                    attempts,
                    attempts as f64 / elapsed.as_secs_f64() / 1000.0
                );
            }
        }

        Err(LedgerError::ProofExhausted { attempts })
    }

    /// Recompute the block's digest from its stored nonce.
    ///
    /// True only if it reproduces the stored hash and still meets the target.
    pub fn validate(&self, block: &Block) -> bool {
        let hash = Self::digest(&block.hash_transactions(), block.prev_hash.as_ref(), block.nonce);
        hash == block.hash && self.target.is_valid_hash(&hash)
    }
}
