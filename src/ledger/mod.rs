// Append-only ledger over the block store
//
// The ledger owns the store handle and the head pointer. All mutation goes
// through `add_block`, which holds the writer lock from reading the head until
// the new block is persisted. The head itself sits behind its own lock and is
// only written after the store has the block, so readers never wait on mining.

mod iter;
mod utxo;

pub use iter::LedgerIter;
pub use utxo::UnspentOutputs;

use crate::consensus::{CancelFlag, ProofOfWork};
use crate::core::{Block, ChainView, Hash256, PubKeyHash, SpendableOutputs, Transaction};
use crate::error::{LedgerError, Result};
use crate::storage::BlockchainDB;
use crate::wallet::Address;
use p256::ecdsa::SigningKey;
use std::path::Path;
use std::sync::{Mutex, PoisonError, RwLock};

/// Memo carried by the genesis coinbase
pub const GENESIS_DATA: &str = "First Transaction from Genesis";

/// Ledger - persisted chain of blocks ending at `head`
pub struct Ledger {
    store: BlockchainDB,
    head: RwLock<Hash256>,
    writer: Mutex<()>,
    pow: ProofOfWork,
    cancel: CancelFlag,
}

impl Ledger {
    /// Create a new ledger at `path`, minting the genesis reward to `address`.
    ///
    /// Fails with AlreadyExists if a ledger is already stored there. Raising
    /// `cancel` aborts the genesis search; the flag stays attached to the
    /// returned ledger.
    pub fn create<P: AsRef<Path>>(path: P, address: &Address, cancel: CancelFlag) -> Result<Self> {
        let path = path.as_ref();
        let store = BlockchainDB::open(path)?;
        if store.get_head()?.is_some() {
            return Err(LedgerError::AlreadyExists(format!(
                "ledger at {}",
                path.display()
            )));
        }
        Self::init(store, address, cancel)
    }

    /// Create a ledger that lives only in memory
    pub fn create_temporary(address: &Address) -> Result<Self> {
        Self::init(BlockchainDB::memory()?, address, CancelFlag::new())
    }

    fn init(store: BlockchainDB, address: &Address, cancel: CancelFlag) -> Result<Self> {
        let pow = ProofOfWork::default();

        let coinbase = Transaction::coinbase(address, GENESIS_DATA)?;
        let genesis = Block::mine(vec![coinbase], None, &pow, &cancel)?;
        store.append_block(&genesis)?;
        log::info!("Created ledger with genesis {} for {}", genesis.hash, address);

        Ok(Self {
            store,
            head: RwLock::new(genesis.hash),
            writer: Mutex::new(()),
            pow,
            cancel,
        })
    }

    /// Open an existing ledger. Fails with NotFound if nothing is stored at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !BlockchainDB::exists(path) {
            return Err(LedgerError::NotFound(format!("ledger at {}", path.display())));
        }

        let store = BlockchainDB::open(path)?;
        let head = store
            .get_head()?
            .ok_or_else(|| LedgerError::NotFound(format!("ledger at {}", path.display())))?;
        log::debug!("Opened ledger at {} with head {}", path.display(), head);

        Ok(Self {
            store,
            head: RwLock::new(head),
            writer: Mutex::new(()),
            pow: ProofOfWork::default(),
            cancel: CancelFlag::new(),
        })
    }

    /// Share an externally owned cancel flag (e.g. one raised on Ctrl-C)
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replace the proof-of-work settings used for new blocks
    pub fn with_pow(mut self, pow: ProofOfWork) -> Self {
        self.pow = pow;
        self
    }

    /// Flag that aborts an in-flight `add_block`
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Hash of the most recently appended block
    pub fn head(&self) -> Hash256 {
        // A poisoned lock still holds a valid hash
        *self.head.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mine `transactions` into a new block on top of the head and persist it.
    ///
    /// Transactions are taken as given; use `mine_block` to verify them first.
    /// On cancellation or exhaustion nothing is written.
    pub fn add_block(&self, transactions: Vec<Transaction>) -> Result<Block> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let block = Block::mine(transactions, Some(self.head()), &self.pow, &self.cancel)?;
        self.store.append_block(&block)?;
        *self.head.write().unwrap_or_else(PoisonError::into_inner) = block.hash;

        log::info!(
            "Added block {} ({} transactions, nonce {})",
            block.hash,
            block.transactions.len(),
            block.nonce
        );
        Ok(block)
    }

    /// Verify every transaction, then `add_block`
    pub fn mine_block(&self, transactions: Vec<Transaction>) -> Result<Block> {
        for tx in &transactions {
            if !self.verify_transaction(tx)? {
                log::warn!("Rejecting transaction {}: invalid signature", tx.id);
                return Err(LedgerError::InvalidSignature);
            }
        }
        self.add_block(transactions)
    }

    /// Iterate from the head back to genesis
    pub fn iter(&self) -> LedgerIter<'_> {
        LedgerIter::new(&self.store, self.head())
    }

    /// Fetch one block by hash
    pub fn get_block(&self, hash: &Hash256) -> Result<Block> {
        self.store
            .get_block(hash)?
            .ok_or_else(|| LedgerError::NotFound(format!("block {}", hash)))
    }

    /// Number of blocks, genesis included
    pub fn height(&self) -> Result<usize> {
        let mut height = 0;
        for block in self.iter() {
            block?;
            height += 1;
        }
        Ok(height)
    }

    /// Linear backward scan for a transaction
    pub fn find_transaction(&self, id: &Hash256) -> Result<Transaction> {
        for block in self.iter() {
            if let Some(tx) = block?.transactions.into_iter().find(|tx| tx.id == *id) {
                return Ok(tx);
            }
        }
        Err(LedgerError::NotFound(format!("transaction {}", id)))
    }

    /// Resolve prior transactions and sign every input of `tx`
    pub fn sign_transaction(&self, tx: &mut Transaction, secret_key: &SigningKey) -> Result<()> {
        let prior = self.prior_transactions(tx)?;
        tx.sign(secret_key, &prior)
    }

    /// Resolve prior transactions and verify every input of `tx`
    pub fn verify_transaction(&self, tx: &Transaction) -> Result<bool> {
        if tx.is_coinbase() {
            return Ok(true);
        }
        let prior = self.prior_transactions(tx)?;
        tx.verify(&prior)
    }

    pub(crate) fn store(&self) -> &BlockchainDB {
        &self.store
    }
}

impl ChainView for Ledger {
    fn find_spendable_outputs(
        &self,
        pub_key_hash: &PubKeyHash,
        amount: u64,
    ) -> Result<(u64, SpendableOutputs)> {
        Ledger::find_spendable_outputs(self, pub_key_hash, amount)
    }

    fn find_transaction(&self, id: &Hash256) -> Result<Transaction> {
        Ledger::find_transaction(self, id)
    }
}
