// Backward iteration from head to genesis

use crate::core::{Block, Hash256};
use crate::error::{LedgerError, Result};
use crate::storage::BlockchainDB;

/// Cursor over the chain, newest block first.
///
/// The starting hash is captured on creation; blocks appended afterwards are
/// not visited. After yielding genesis, or after the first error, the
/// iterator is exhausted.
pub struct LedgerIter<'a> {
    store: &'a BlockchainDB,
    current: Option<Hash256>,
}

impl<'a> LedgerIter<'a> {
    pub(crate) fn new(store: &'a BlockchainDB, head: Hash256) -> Self {
        Self {
            store,
            current: Some(head),
        }
    }
}

impl Iterator for LedgerIter<'_> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.current.take()?;
        match self.store.get_block(&hash) {
            Ok(Some(block)) => {
                self.current = block.prev_hash;
                Some(Ok(block))
            }
            Ok(None) => Some(Err(LedgerError::NotFound(format!("block {}", hash)))),
            Err(e) => Some(Err(e)),
        }
    }
}
