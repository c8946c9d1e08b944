// Block data structures

use crate::consensus::{CancelFlag, ProofOfWork};
use crate::core::serialize::{read_hash, read_len, read_opt_hash, read_u64, write_opt_hash, write_varint};
use crate::core::{tagged_hash, Hash256, Serializable, Transaction, TAG_TXS};
use crate::error::Result;
use std::io::Cursor;

/// Block - ordered transactions linked to their predecessor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Proof-of-work digest of (transactions digest, prev_hash, nonce)
    pub hash: Hash256,
    /// Transactions in this block, order is significant
    pub transactions: Vec<Transaction>,
    /// Hash of the previous block, None only for genesis
    pub prev_hash: Option<Hash256>,
    /// Nonce found by proof of work
    pub nonce: u64,
}

impl Block {
    /// Mine a new block at the default difficulty
    pub fn create(transactions: Vec<Transaction>, prev_hash: Option<Hash256>) -> Result<Self> {
        Self::mine(transactions, prev_hash, &ProofOfWork::default(), &CancelFlag::new())
    }

    /// Mine a new block. Hash and nonce are set together from the search result.
    pub fn mine(
        transactions: Vec<Transaction>,
        prev_hash: Option<Hash256>,
        pow: &ProofOfWork,
        cancel: &CancelFlag,
    ) -> Result<Self> {
        let txs_digest = Self::digest_transactions(&transactions);
        let result = pow.run(&txs_digest, prev_hash.as_ref(), cancel)?;

        Ok(Self {
            hash: result.hash,
            transactions,
            prev_hash,
            nonce: result.nonce,
        })
    }

    /// Create the genesis block from a coinbase transaction
    pub fn genesis(coinbase: Transaction) -> Result<Self> {
        Self::create(vec![coinbase], None)
    }

    /// Digest over the concatenated transaction ids.
    ///
    /// A flat hash, not a Merkle root: it gives no per-transaction inclusion proof.
    pub fn hash_transactions(&self) -> Hash256 {
        Self::digest_transactions(&self.transactions)
    }

    fn digest_transactions(transactions: &[Transaction]) -> Hash256 {
        let mut ids = Vec::with_capacity(transactions.len() * 32);
        for tx in transactions {
            ids.extend_from_slice(tx.id.as_bytes());
        }
        tagged_hash(TAG_TXS, &ids)
    }

    /// Check if this is the genesis block
    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_none()
    }
}

impl Serializable for Block {
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.hash.as_bytes());
        write_opt_hash(buf, self.prev_hash.as_ref());
        buf.extend_from_slice(&self.nonce.to_le_bytes());

        write_varint(buf, self.transactions.len() as u64);
        for tx in &self.transactions {
            tx.encode_into(buf);
        }
    }

    fn decode_from(reader: &mut Cursor<&[u8]>) -> Result<Self> {
        let hash = read_hash(reader)?;
        let prev_hash = read_opt_hash(reader)?;
        let nonce = read_u64(reader)?;

        let tx_count = read_len(reader)?;
        let mut transactions = Vec::with_capacity(tx_count.min(1024));
        for _ in 0..tx_count {
            transactions.push(Transaction::decode_from(reader)?);
        }

        Ok(Self {
            hash,
            transactions,
            prev_hash,
            nonce,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{TxInput, TxOutput, PubKeyHash};
    use crate::error::LedgerError;

    fn coinbase(memo: &str) -> Transaction {
        Transaction::new(
            vec![TxInput::coinbase(memo.as_bytes().to_vec())],
            vec![TxOutput::new(100, PubKeyHash::new([4; 20]))],
        )
    }

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis(coinbase("genesis")).unwrap();
        assert!(genesis.is_genesis());
        assert_eq!(genesis.transactions.len(), 1);
        assert!(genesis.transactions[0].is_coinbase());
        assert!(ProofOfWork::default().validate(&genesis));
    }

    #[test]
    fn test_created_block_is_valid() {
        let genesis = Block::genesis(coinbase("genesis")).unwrap();
        let block = Block::create(vec![coinbase("next")], Some(genesis.hash)).unwrap();

        assert!(!block.is_genesis());
        assert_eq!(block.prev_hash, Some(genesis.hash));
        assert!(ProofOfWork::default().validate(&block));
    }

    #[test]
    fn test_block_serialization() {
        let genesis = Block::genesis(coinbase("genesis")).unwrap();
        let block = Block::create(vec![coinbase("a"), coinbase("b")], Some(genesis.hash)).unwrap();

        for expected in [genesis, block] {
            let decoded = Block::deserialize(&expected.serialize()).unwrap();
            assert_eq!(decoded, expected);
        }
    }

    #[test]
    fn test_trailing_bytes_are_corrupt() {
        let genesis = Block::genesis(coinbase("genesis")).unwrap();
        let mut bytes = genesis.serialize();
        bytes.push(0);
        assert!(matches!(Block::deserialize(&bytes), Err(LedgerError::CorruptEncoding(_))));

        bytes.truncate(40);
        assert!(Block::deserialize(&bytes).is_err());
    }

    #[test]
    fn test_transaction_order_changes_digest() {
        let a = coinbase("a");
        let b = coinbase("b");
        assert_ne!(
            Block::digest_transactions(&[a.clone(), b.clone()]),
            Block::digest_transactions(&[b, a])
        );
    }

    #[test]
    fn test_mutations_break_validation() {
        let pow = ProofOfWork::default();
        let genesis = Block::genesis(coinbase("genesis")).unwrap();
        let block = Block::create(vec![coinbase("next")], Some(genesis.hash)).unwrap();

        let mut bad_nonce = block.clone();
        bad_nonce.nonce += 1;
        assert!(!pow.validate(&bad_nonce));

        let mut bad_prev = block.clone();
        bad_prev.prev_hash = Some(Hash256::new([0xab; 32]));
        assert!(!pow.validate(&bad_prev));

        let mut bad_tx = block.clone();
        bad_tx.transactions[0].id.0[0] ^= 0x01;
        assert!(!pow.validate(&bad_tx));
    }

    #[test]
    fn test_cancelled_mining_produces_no_block() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let result = Block::mine(vec![coinbase("x")], None, &ProofOfWork::default(), &cancel);
        assert!(matches!(result, Err(LedgerError::MiningCancelled)));
    }
}
