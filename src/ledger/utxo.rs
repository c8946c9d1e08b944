// UTXO accounting by full chain scan
//
// Nothing here is stored. Every query replays the chain from head to genesis,
// so the result cannot drift from history.

use crate::core::{add_value, sum_values, PubKeyHash, SpendableOutputs, Transaction, TxOutput};
use crate::error::Result;
use crate::ledger::Ledger;
use std::collections::{BTreeMap, HashMap};

/// Every unspent output on the chain: hex transaction id -> (index, output)
pub type UnspentOutputs = BTreeMap<String, Vec<(usize, TxOutput)>>;

/// A transaction with the indices of its outputs that are still unspent
struct Unspent {
    tx: Transaction,
    outputs: Vec<usize>,
}

impl Ledger {
    /// Walk the chain newest to oldest, collecting unspent outputs.
    ///
    /// With an owner, only outputs locked to it are kept and only its inputs
    /// mark outputs spent. Transactions within a block are visited last to
    /// first, so a spend in the same block as its source is still seen first.
    fn scan_unspent(&self, owner: Option<&PubKeyHash>) -> Result<Vec<Unspent>> {
        let owned_by = |pkh: &PubKeyHash| owner.is_none_or(|o| o == pkh);

        let mut spent: HashMap<String, Vec<usize>> = HashMap::new();
        let mut unspent = Vec::new();

        for block in self.iter() {
            for tx in block?.transactions.into_iter().rev() {
                let tx_hex = tx.id.to_hex();
                let spent_here = spent.get(&tx_hex);
                let outputs: Vec<usize> = tx
                    .outputs
                    .iter()
                    .enumerate()
                    .filter(|(index, out)| {
                        owned_by(&out.pub_key_hash)
                            && !spent_here.is_some_and(|s| s.contains(index))
                    })
                    .map(|(index, _)| index)
                    .collect();

                if !tx.is_coinbase() {
                    for input in &tx.inputs {
                        let owns_input = match owner {
                            Some(pkh) => input.uses_key(pkh),
                            None => true,
                        };
                        if !owns_input {
                            continue;
                        }
                        if let (Some(ref_id), Ok(index)) =
                            (input.ref_tx_id, usize::try_from(input.out_index))
                        {
                            spent.entry(ref_id.to_hex()).or_default().push(index);
                        }
                    }
                }

                if !outputs.is_empty() {
                    unspent.push(Unspent { tx, outputs });
                }
            }
        }
        Ok(unspent)
    }

    /// Transactions holding at least one unspent output locked to `pub_key_hash`.
    ///
    /// Each transaction appears once, newest first.
    pub fn find_unspent_transactions(&self, pub_key_hash: &PubKeyHash) -> Result<Vec<Transaction>> {
        Ok(self
            .scan_unspent(Some(pub_key_hash))?
            .into_iter()
            .map(|u| u.tx)
            .collect())
    }

    /// Unspent outputs locked to `pub_key_hash`
    pub fn find_utxo(&self, pub_key_hash: &PubKeyHash) -> Result<Vec<TxOutput>> {
        let mut utxos = Vec::new();
        for Unspent { tx, outputs } in self.scan_unspent(Some(pub_key_hash))? {
            for index in outputs {
                utxos.push(tx.outputs[index].clone());
            }
        }
        Ok(utxos)
    }

    /// Greedily pick outputs of `pub_key_hash` until `amount` is covered.
    ///
    /// Returns the accumulated total, which is below `amount` when funds are
    /// short. Selection stops as soon as the threshold is met. Fails with
    /// ValueOverflow if the running total leaves the u64 range first.
    pub fn find_spendable_outputs(
        &self,
        pub_key_hash: &PubKeyHash,
        amount: u64,
    ) -> Result<(u64, SpendableOutputs)> {
        let mut accumulated = 0u64;
        let mut selected = SpendableOutputs::new();

        'scan: for Unspent { tx, outputs } in self.scan_unspent(Some(pub_key_hash))? {
            for index in outputs {
                if accumulated >= amount {
                    break 'scan;
                }
                accumulated = add_value(accumulated, tx.outputs[index].value)?;
                selected.entry(tx.id.to_hex()).or_default().push(index);
            }
        }
        Ok((accumulated, selected))
    }

    /// Every unspent output in the chain, whoever owns it
    pub fn find_all_unspent_outputs(&self) -> Result<UnspentOutputs> {
        let mut all = UnspentOutputs::new();
        for Unspent { tx, outputs } in self.scan_unspent(None)? {
            let entry = all.entry(tx.id.to_hex()).or_default();
            for index in outputs {
                entry.push((index, tx.outputs[index].clone()));
            }
        }
        Ok(all)
    }

    /// Sum of unspent outputs locked to `pub_key_hash`
    pub fn balance(&self, pub_key_hash: &PubKeyHash) -> Result<u64> {
        sum_values(self.find_utxo(pub_key_hash)?.iter().map(|out| out.value))
    }
}
