// Blockchain database using sled

use crate::core::{Block, Hash256, Serializable};
use crate::error::{LedgerError, Result};
use sled::{Batch, Db, Tree};
use std::path::Path;

/// Reserved key holding the current head block hash
const HEAD_KEY: &[u8] = b"last_hash";

/// Files sled writes into every database directory
const SLED_FILES: [&str; 2] = ["conf", "db"];

/// Blockchain database: block hash -> serialized block, plus the head pointer
pub struct BlockchainDB {
    db: Db,
}

impl BlockchainDB {
    /// Open (or create) the database directory at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Whether a database was ever opened at `path`. Creates nothing.
    pub fn exists<P: AsRef<Path>>(path: P) -> bool {
        let path = path.as_ref();
        SLED_FILES.iter().all(|file| path.join(file).is_file())
    }

    /// Create an in-memory database (for testing)
    pub fn memory() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Persist `block` and make it the head in one atomic batch.
    ///
    /// The batch is flushed before returning, so the head never points at a
    /// block that is not durable.
    pub fn append_block(&self, block: &Block) -> Result<()> {
        let mut batch = Batch::default();
        batch.insert(Self::block_key(&block.hash), block.serialize());
        batch.insert(HEAD_KEY, block.hash.as_bytes().as_slice());

        self.db.apply_batch(batch)?;
        self.db.flush()?;

        log::debug!("Stored block {} as head", block.hash);
        Ok(())
    }

    /// Get a block by hash
    pub fn get_block(&self, hash: &Hash256) -> Result<Option<Block>> {
        match self.db.get(Self::block_key(hash))? {
            Some(data) => Ok(Some(Block::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    /// Get the head (most recently appended block hash)
    pub fn get_head(&self) -> Result<Option<Hash256>> {
        match self.db.get(HEAD_KEY)? {
            Some(data) => Hash256::from_slice(&data).map(Some).map_err(|_| {
                LedgerError::CorruptEncoding(format!("invalid head hash length: {}", data.len()))
            }),
            None => Ok(None),
        }
    }

    /// Open a named tree in the same database (used by the UTXO cache)
    pub fn open_tree(&self, name: &str) -> Result<Tree> {
        Ok(self.db.open_tree(name)?)
    }

    // Helper: create key for block storage
    fn block_key(hash: &Hash256) -> Vec<u8> {
        let mut key = Vec::with_capacity(33);
        key.push(b'b'); // 'b' for block
        key.extend_from_slice(hash.as_bytes());
        key
    }
}
