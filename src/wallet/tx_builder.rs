// Transaction builder

use crate::core::{Block, Transaction};
use crate::error::Result;
use crate::ledger::Ledger;
use crate::wallet::{Address, Keystore};

/// Transaction builder: keystore keys + ledger outputs
pub struct TransactionBuilder<'a> {
    keystore: &'a Keystore,
    ledger: &'a Ledger,
}

impl<'a> TransactionBuilder<'a> {
    /// Create a new transaction builder
    pub fn new(keystore: &'a Keystore, ledger: &'a Ledger) -> Self {
        Self { keystore, ledger }
    }

    /// Build a signed payment of `amount` from `from` to `to`.
    ///
    /// `from` must be held in the keystore.
    pub fn build(&self, from: &Address, to: &Address, amount: u64) -> Result<Transaction> {
        let keypair = self.keystore.get(from)?;
        Transaction::create(from, to, amount, self.ledger, &keypair.secret_key)
    }

    /// Build, verify and mine a payment into a new block
    pub fn send(&self, from: &Address, to: &Address, amount: u64) -> Result<Block> {
        let tx = self.build(from, to, amount)?;
        log::info!("Sending {} from {} to {} in {}", amount, from, to, tx.id);
        self.ledger.mine_block(vec![tx])
    }

    /// Get balance for address
    pub fn balance(&self, address: &Address) -> Result<u64> {
        self.ledger.balance(&address.pub_key_hash()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;

    #[test]
    fn test_send_between_wallets() {
        let mut ks = Keystore::new();
        let alice = ks.create_wallet();
        let bob = ks.create_wallet();
        let ledger = Ledger::create_temporary(&alice).unwrap();
        let builder = TransactionBuilder::new(&ks, &ledger);

        let block = builder.send(&alice, &bob, 30).unwrap();

        assert_eq!(block.transactions.len(), 1);
        assert_eq!(builder.balance(&alice).unwrap(), 70);
        assert_eq!(builder.balance(&bob).unwrap(), 30);
    }

    #[test]
    fn test_unknown_sender() {
        let mut ks = Keystore::new();
        let alice = ks.create_wallet();
        let ledger = Ledger::create_temporary(&alice).unwrap();
        let builder = TransactionBuilder::new(&ks, &ledger);

        let stranger = Keystore::new().create_wallet();
        assert!(matches!(
            builder.build(&stranger, &alice, 1),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn test_overspend_rejected() {
        let mut ks = Keystore::new();
        let alice = ks.create_wallet();
        let bob = ks.create_wallet();
        let ledger = Ledger::create_temporary(&alice).unwrap();
        let builder = TransactionBuilder::new(&ks, &ledger);

        assert!(matches!(
            builder.send(&alice, &bob, 101),
            Err(LedgerError::InsufficientFunds { required: 101, available: 100 })
        ));
        assert_eq!(ledger.height().unwrap(), 1);
    }
}
