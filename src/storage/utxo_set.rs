// Cached UTXO projection
//
// A sled tree keyed by outpoint. The chain scan in `ledger::utxo` stays the
// source of truth; this cache is rebuilt from it and kept current per block.

use crate::core::{add_value, sum_values, Block, Hash256, PubKeyHash, SpendableOutputs, TxOutput};
use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;
use sled::{Batch, Tree};
use std::io::Cursor;

/// Name of the sled tree holding the cache
const UTXO_TREE: &str = "utxo";

/// UTXO identifier - transaction id + output index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutPoint {
    pub txid: Hash256,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Hash256, vout: u32) -> Self {
        Self { txid, vout }
    }

    /// Serialize to bytes for database key
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(36);
        bytes.extend_from_slice(self.txid.as_bytes());
        bytes.extend_from_slice(&self.vout.to_be_bytes());
        bytes
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 36 {
            return Err(LedgerError::CorruptEncoding(format!(
                "invalid outpoint bytes length: {}",
                bytes.len()
            )));
        }
        let txid = Hash256::from_slice(&bytes[0..32])?;
        let mut vout_bytes = [0u8; 4];
        vout_bytes.copy_from_slice(&bytes[32..36]);
        Ok(Self {
            txid,
            vout: u32::from_be_bytes(vout_bytes),
        })
    }
}

fn encode_output(output: &TxOutput) -> Vec<u8> {
    let mut buf = Vec::new();
    output.encode_into(&mut buf);
    buf
}

fn decode_output(bytes: &[u8]) -> Result<TxOutput> {
    let mut cursor = Cursor::new(bytes);
    TxOutput::decode_from(&mut cursor)
}

fn vout(index: usize) -> Result<u32> {
    u32::try_from(index)
        .map_err(|_| LedgerError::CorruptEncoding(format!("output index {} out of range", index)))
}

/// UTXO set database
pub struct UtxoSet {
    tree: Tree,
}

impl UtxoSet {
    /// Open the cache stored next to the ledger's blocks
    pub fn open(ledger: &Ledger) -> Result<Self> {
        Ok(Self {
            tree: ledger.store().open_tree(UTXO_TREE)?,
        })
    }

    /// Clear the cache and rebuild it from a full chain scan. Returns the UTXO count.
    pub fn reindex(&self, ledger: &Ledger) -> Result<usize> {
        self.tree.clear()?;

        let mut batch = Batch::default();
        let mut count = 0;
        for (tx_hex, outputs) in ledger.find_all_unspent_outputs()? {
            let txid = Hash256::from_hex(&tx_hex)?;
            for (index, output) in outputs {
                batch.insert(OutPoint::new(txid, vout(index)?).to_bytes(), encode_output(&output));
                count += 1;
            }
        }
        self.tree.apply_batch(batch)?;
        self.tree.flush()?;

        log::info!("Reindexed UTXO set: {} outputs", count);
        Ok(count)
    }

    /// Apply one newly appended block: drop spent outpoints, add new outputs
    pub fn update(&self, block: &Block) -> Result<()> {
        let mut batch = Batch::default();
        for tx in &block.transactions {
            if !tx.is_coinbase() {
                for input in &tx.inputs {
                    if let (Some(ref_id), Ok(index)) = (input.ref_tx_id, u32::try_from(input.out_index)) {
                        batch.remove(OutPoint::new(ref_id, index).to_bytes());
                    }
                }
            }
            for (index, output) in tx.outputs.iter().enumerate() {
                batch.insert(OutPoint::new(tx.id, vout(index)?).to_bytes(), encode_output(output));
            }
        }
        self.tree.apply_batch(batch)?;
        self.tree.flush()?;
        Ok(())
    }

    /// All cached outputs locked to `pub_key_hash`
    pub fn find_utxo(&self, pub_key_hash: &PubKeyHash) -> Result<Vec<(OutPoint, TxOutput)>> {
        let mut utxos = Vec::new();
        for item in self.tree.iter() {
            let (key, value) = item?;
            let output = decode_output(&value)?;
            if output.is_locked_with_key(pub_key_hash) {
                utxos.push((OutPoint::from_bytes(&key)?, output));
            }
        }
        Ok(utxos)
    }

    /// Greedy selection over the cache, same contract as the chain scan
    pub fn find_spendable_outputs(
        &self,
        pub_key_hash: &PubKeyHash,
        amount: u64,
    ) -> Result<(u64, SpendableOutputs)> {
        let mut accumulated = 0u64;
        let mut selected = SpendableOutputs::new();
        for (outpoint, output) in self.find_utxo(pub_key_hash)? {
            if accumulated >= amount {
                break;
            }
            accumulated = add_value(accumulated, output.value)?;
            selected
                .entry(outpoint.txid.to_hex())
                .or_default()
                .push(outpoint.vout as usize);
        }
        Ok((accumulated, selected))
    }

    /// Get balance for a public key hash
    pub fn balance(&self, pub_key_hash: &PubKeyHash) -> Result<u64> {
        sum_values(
            self.find_utxo(pub_key_hash)?
                .iter()
                .map(|(_, output)| output.value),
        )
    }

    /// Count total UTXOs
    pub fn count(&self) -> usize {
        self.tree.len()
    }
}
