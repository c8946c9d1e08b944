// Transaction data structures, signing and verification

use crate::core::serialize::{
    read_hash, read_i32, read_len, read_opt_hash, read_u64, read_var_bytes, write_opt_hash,
    write_var_bytes, write_varint,
};
use crate::core::{hash160, tagged_hash, Hash256, PubKeyHash, Serializable, TAG_SIGHASH, TAG_TXID};
use crate::error::{LedgerError, Result};
use crate::wallet::Address;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Cursor;

/// Amount minted by every coinbase transaction
pub const COINBASE_REWARD: u64 = 100;

/// Out-index sentinel of a coinbase input ("no previous output")
pub const COINBASE_OUT_INDEX: i32 = -1;

/// Width of each signature scalar and each public key coordinate
const SCALAR_LEN: usize = 32;

/// Prior transactions keyed by hex-encoded transaction id
pub type PriorTransactions = HashMap<String, Transaction>;

/// Spendable outputs selected for a payment: hex transaction id -> output indices
pub type SpendableOutputs = BTreeMap<String, Vec<usize>>;

/// What transaction construction needs from the chain
pub trait ChainView {
    /// Greedily accumulate outputs locked to `pub_key_hash` until `amount` is reached
    fn find_spendable_outputs(
        &self,
        pub_key_hash: &PubKeyHash,
        amount: u64,
    ) -> Result<(u64, SpendableOutputs)>;

    fn find_transaction(&self, id: &Hash256) -> Result<Transaction>;

    /// Resolve every transaction referenced by the inputs of `tx`
    fn prior_transactions(&self, tx: &Transaction) -> Result<PriorTransactions> {
        let mut prior = HashMap::new();
        if tx.is_coinbase() {
            return Ok(prior);
        }
        for input in &tx.inputs {
            let Some(ref_id) = input.ref_tx_id else {
                return Err(LedgerError::MissingPriorTransaction(
                    "input without a referenced transaction".to_string(),
                ));
            };
            let prior_tx = self.find_transaction(&ref_id).map_err(|e| match e {
                LedgerError::NotFound(_) => LedgerError::MissingPriorTransaction(ref_id.to_hex()),
                other => other,
            })?;
            prior.insert(ref_id.to_hex(), prior_tx);
        }
        Ok(prior)
    }
}

/// Public key bytes as carried by inputs: X || Y on P-256, 32 bytes each
pub fn encode_public_key(public_key: &VerifyingKey) -> Vec<u8> {
    public_key.to_encoded_point(false).as_bytes()[1..].to_vec()
}

/// Inverse of `encode_public_key`; None if the halves are not a curve point
pub fn decode_public_key(bytes: &[u8]) -> Option<VerifyingKey> {
    if bytes.len() != 2 * SCALAR_LEN {
        return None;
    }
    let (x, y) = bytes.split_at(bytes.len() / 2);
    let mut sec1 = [0u8; 65];
    sec1[0] = 0x04;
    sec1[1..33].copy_from_slice(x);
    sec1[33..].copy_from_slice(y);
    VerifyingKey::from_sec1_bytes(&sec1).ok()
}

/// Transaction input - references a previous transaction output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    /// Id of the transaction whose output is spent (None for coinbase)
    pub ref_tx_id: Option<Hash256>,
    /// Index of the spent output, COINBASE_OUT_INDEX for coinbase
    pub out_index: i32,
    /// r || s, filled in by signing
    pub signature: Vec<u8>,
    /// Spender's public key; the memo for a coinbase input
    pub pub_key: Vec<u8>,
}

impl TxInput {
    /// Create a new unsigned input
    pub fn new(ref_tx_id: Hash256, out_index: i32, pub_key: Vec<u8>) -> Self {
        Self {
            ref_tx_id: Some(ref_tx_id),
            out_index,
            signature: Vec::new(),
            pub_key,
        }
    }

    /// Create a coinbase input carrying free-form data
    pub fn coinbase(memo: Vec<u8>) -> Self {
        Self {
            ref_tx_id: None,
            out_index: COINBASE_OUT_INDEX,
            signature: Vec::new(),
            pub_key: memo,
        }
    }

    /// Check if this is a coinbase input
    pub fn is_coinbase(&self) -> bool {
        self.ref_tx_id.is_none() && self.out_index == COINBASE_OUT_INDEX
    }

    /// Whether this input was created by the owner of `pub_key_hash`
    pub fn uses_key(&self, pub_key_hash: &PubKeyHash) -> bool {
        hash160(&self.pub_key) == *pub_key_hash
    }

    fn encode_with(&self, buf: &mut Vec<u8>, signature: &[u8], pub_key: &[u8]) {
        write_opt_hash(buf, self.ref_tx_id.as_ref());
        buf.extend_from_slice(&self.out_index.to_le_bytes());
        write_var_bytes(buf, signature);
        write_var_bytes(buf, pub_key);
    }

    fn decode_from(reader: &mut Cursor<&[u8]>) -> Result<Self> {
        Ok(Self {
            ref_tx_id: read_opt_hash(reader)?,
            out_index: read_i32(reader)?,
            signature: read_var_bytes(reader)?,
            pub_key: read_var_bytes(reader)?,
        })
    }
}

/// Transaction output - amount locked to a public key hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub value: u64,
    pub pub_key_hash: PubKeyHash,
}

impl TxOutput {
    pub fn new(value: u64, pub_key_hash: PubKeyHash) -> Self {
        Self {
            value,
            pub_key_hash,
        }
    }

    /// Lock `value` to the owner of `address`
    pub fn to_address(value: u64, address: &Address) -> Result<Self> {
        Ok(Self::new(value, address.pub_key_hash()?))
    }

    pub fn is_locked_with_key(&self, pub_key_hash: &PubKeyHash) -> bool {
        self.pub_key_hash == *pub_key_hash
    }

    pub(crate) fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.value.to_le_bytes());
        write_var_bytes(buf, self.pub_key_hash.as_bytes());
    }

    pub(crate) fn decode_from(reader: &mut Cursor<&[u8]>) -> Result<Self> {
        let value = read_u64(reader)?;
        let pub_key_hash = PubKeyHash::from_slice(&read_var_bytes(reader)?)?;
        Ok(Self {
            value,
            pub_key_hash,
        })
    }
}

/// The exact bytes signed for one input.
///
/// Every signature is empty and every public key is empty except the signed
/// input's, which carries the referenced output's public key hash. This binds
/// a signature to the prior output it claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningPayload {
    input_index: usize,
    bytes: Vec<u8>,
}

impl SigningPayload {
    pub fn input_index(&self) -> usize {
        self.input_index
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn digest(&self) -> Hash256 {
        tagged_hash(TAG_SIGHASH, &self.bytes)
    }
}

/// Transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Digest of inputs and outputs, assigned once at construction
    pub id: Hash256,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    /// Create a transaction and assign its id
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        let mut tx = Self {
            id: Hash256::zero(),
            inputs,
            outputs,
        };
        tx.id = tx.compute_id();
        tx
    }

    /// Create a coinbase transaction minting COINBASE_REWARD to `to`
    pub fn coinbase(to: &Address, memo: &str) -> Result<Self> {
        let memo = if memo.is_empty() {
            format!("Coins to {}", to)
        } else {
            memo.to_string()
        };
        let input = TxInput::coinbase(memo.into_bytes());
        let output = TxOutput::to_address(COINBASE_REWARD, to)?;
        Ok(Self::new(vec![input], vec![output]))
    }

    /// Build and sign a payment of `amount` from `from` to `to`.
    ///
    /// Outputs are selected in the order the chain reports them, so the
    /// selection is not guaranteed to minimise the number of inputs. Any
    /// surplus is returned to `from` as a change output.
    pub fn create<C: ChainView + ?Sized>(
        from: &Address,
        to: &Address,
        amount: u64,
        chain: &C,
        secret_key: &SigningKey,
    ) -> Result<Self> {
        let pub_key = encode_public_key(&VerifyingKey::from(secret_key));
        let from_hash = from.pub_key_hash()?;
        let to_hash = to.pub_key_hash()?;

        let (accumulated, spendable) = chain.find_spendable_outputs(&from_hash, amount)?;
        if accumulated < amount {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: accumulated,
            });
        }

        let mut inputs = Vec::new();
        for (tx_hex, out_indices) in &spendable {
            let ref_tx_id = Hash256::from_hex(tx_hex)?;
            for out_index in out_indices {
                let out_index = i32::try_from(*out_index).map_err(|_| {
                    LedgerError::CorruptEncoding(format!("output index {} out of range", out_index))
                })?;
                inputs.push(TxInput::new(ref_tx_id, out_index, pub_key.clone()));
            }
        }

        let mut outputs = vec![TxOutput::new(amount, to_hash)];
        if accumulated > amount {
            outputs.push(TxOutput::new(accumulated - amount, from_hash));
        }

        let mut tx = Self::new(inputs, outputs);
        let prior = chain.prior_transactions(&tx)?;
        tx.sign(secret_key, &prior)?;

        log::debug!(
            "Created transaction {} ({} inputs, {} outputs)",
            tx.id,
            tx.inputs.len(),
            tx.outputs.len()
        );
        Ok(tx)
    }

    /// Check if this is a coinbase transaction
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_coinbase()
    }

    /// Recompute the id from inputs and outputs (signatures excluded)
    pub fn compute_id(&self) -> Hash256 {
        let mut buf = Vec::new();
        write_varint(&mut buf, self.inputs.len() as u64);
        for input in &self.inputs {
            input.encode_with(&mut buf, &[], &input.pub_key);
        }
        self.encode_outputs(&mut buf);
        tagged_hash(TAG_TXID, &buf)
    }

    /// False once inputs or outputs changed after the id was assigned
    pub fn id_is_consistent(&self) -> bool {
        self.compute_id() == self.id
    }

    /// Build the signing payload for input `index`
    pub fn signing_payload(&self, index: usize, prior: &PriorTransactions) -> Result<SigningPayload> {
        let signed = self.inputs.get(index).ok_or_else(|| {
            LedgerError::MissingPriorTransaction(format!("no input at index {}", index))
        })?;
        let locked_to = referenced_output(signed, prior)?.pub_key_hash;

        let mut bytes = Vec::new();
        write_varint(&mut bytes, self.inputs.len() as u64);
        for (i, input) in self.inputs.iter().enumerate() {
            let pub_key: &[u8] = if i == index { locked_to.as_bytes() } else { &[] };
            input.encode_with(&mut bytes, &[], pub_key);
        }
        self.encode_outputs(&mut bytes);

        Ok(SigningPayload {
            input_index: index,
            bytes,
        })
    }

    /// Sign every input. No-op for coinbase.
    ///
    /// Fails with MissingPriorTransaction before any signature is written if
    /// an input's referenced transaction is absent from `prior`.
    pub fn sign(&mut self, secret_key: &SigningKey, prior: &PriorTransactions) -> Result<()> {
        if self.is_coinbase() {
            return Ok(());
        }

        let payloads = (0..self.inputs.len())
            .map(|i| self.signing_payload(i, prior))
            .collect::<Result<Vec<_>>>()?;

        for payload in payloads {
            let signature: Signature = secret_key.sign_prehash(payload.digest().as_bytes())?;
            self.inputs[payload.input_index].signature = signature.to_bytes().to_vec();
        }
        Ok(())
    }

    /// Verify every input signature.
    ///
    /// Ok(false) on any cryptographic mismatch, Err only when a referenced
    /// prior transaction cannot be resolved.
    pub fn verify(&self, prior: &PriorTransactions) -> Result<bool> {
        if self.is_coinbase() {
            return Ok(true);
        }

        let payloads = (0..self.inputs.len())
            .map(|i| self.signing_payload(i, prior))
            .collect::<Result<Vec<_>>>()?;

        for payload in payloads {
            let input = &self.inputs[payload.input_index];

            if !referenced_output(input, prior)?.is_locked_with_key(&hash160(&input.pub_key)) {
                return Ok(false);
            }
            let Some(signature) = split_signature(&input.signature) else {
                return Ok(false);
            };
            let Some(public_key) = decode_public_key(&input.pub_key) else {
                return Ok(false);
            };
            if public_key
                .verify_prehash(payload.digest().as_bytes(), &signature)
                .is_err()
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Sum of all output values; ValueOverflow if it does not fit a u64
    pub fn total_output_value(&self) -> Result<u64> {
        sum_values(self.outputs.iter().map(|out| out.value))
    }

    fn encode_outputs(&self, buf: &mut Vec<u8>) {
        write_varint(buf, self.outputs.len() as u64);
        for output in &self.outputs {
            output.encode_into(buf);
        }
    }
}

/// `total + value`, or ValueOverflow instead of wrapping
pub(crate) fn add_value(total: u64, value: u64) -> Result<u64> {
    total
        .checked_add(value)
        .ok_or_else(|| LedgerError::ValueOverflow(format!("{} + {}", total, value)))
}

pub(crate) fn sum_values<I: IntoIterator<Item = u64>>(values: I) -> Result<u64> {
    values.into_iter().try_fold(0, add_value)
}

/// Recover (r, s) from the two equal halves of a signature
fn split_signature(bytes: &[u8]) -> Option<Signature> {
    if bytes.len() != 2 * SCALAR_LEN {
        return None;
    }
    let (r, s) = bytes.split_at(bytes.len() / 2);
    Signature::from_scalars(
        p256::FieldBytes::clone_from_slice(r),
        p256::FieldBytes::clone_from_slice(s),
    )
    .ok()
}

fn referenced_output<'a>(input: &TxInput, prior: &'a PriorTransactions) -> Result<&'a TxOutput> {
    let ref_id = input.ref_tx_id.ok_or_else(|| {
        LedgerError::MissingPriorTransaction("input without a referenced transaction".to_string())
    })?;
    let prior_tx = prior
        .get(&ref_id.to_hex())
        .ok_or_else(|| LedgerError::MissingPriorTransaction(ref_id.to_hex()))?;
    usize::try_from(input.out_index)
        .ok()
        .and_then(|index| prior_tx.outputs.get(index))
        .ok_or_else(|| {
            LedgerError::MissingPriorTransaction(format!("{}:{}", ref_id, input.out_index))
        })
}

impl Serializable for Transaction {
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.id.as_bytes());
        write_varint(buf, self.inputs.len() as u64);
        for input in &self.inputs {
            input.encode_with(buf, &input.signature, &input.pub_key);
        }
        self.encode_outputs(buf);
    }

    fn decode_from(reader: &mut Cursor<&[u8]>) -> Result<Self> {
        let id = read_hash(reader)?;

        let input_count = read_len(reader)?;
        let mut inputs = Vec::with_capacity(input_count.min(1024));
        for _ in 0..input_count {
            inputs.push(TxInput::decode_from(reader)?);
        }

        let output_count = read_len(reader)?;
        let mut outputs = Vec::with_capacity(output_count.min(1024));
        for _ in 0..output_count {
            outputs.push(TxOutput::decode_from(reader)?);
        }

        Ok(Self {
            id,
            inputs,
            outputs,
        })
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "--- Transaction {}:", self.id)?;
        for (i, input) in self.inputs.iter().enumerate() {
            writeln!(f, "     Input {}:", i)?;
            match input.ref_tx_id {
                Some(id) => writeln!(f, "       TXID:      {}", id)?,
                None => writeln!(f, "       TXID:      (coinbase)")?,
            }
            writeln!(f, "       Out:       {}", input.out_index)?;
            writeln!(f, "       Signature: {}", hex::encode(&input.signature))?;
            writeln!(f, "       PubKey:    {}", hex::encode(&input.pub_key))?;
        }
        for (i, output) in self.outputs.iter().enumerate() {
            writeln!(f, "     Output {}:", i)?;
            writeln!(f, "       Value:  {}", output.value)?;
            write!(f, "       PubKeyHash: {}", output.pub_key_hash)?;
            if i + 1 < self.outputs.len() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::KeyPair;

    /// Chain stand-in: every output of every known transaction is unspent
    struct FakeChain {
        txs: Vec<Transaction>,
    }

    impl ChainView for FakeChain {
        fn find_spendable_outputs(
            &self,
            pub_key_hash: &PubKeyHash,
            amount: u64,
        ) -> Result<(u64, SpendableOutputs)> {
            let mut accumulated = 0;
            let mut selected = SpendableOutputs::new();
            for tx in &self.txs {
                for (index, out) in tx.outputs.iter().enumerate() {
                    if out.is_locked_with_key(pub_key_hash) && accumulated < amount {
                        accumulated += out.value;
                        selected.entry(tx.id.to_hex()).or_default().push(index);
                    }
                }
            }
            Ok((accumulated, selected))
        }

        fn find_transaction(&self, id: &Hash256) -> Result<Transaction> {
            self.txs
                .iter()
                .find(|tx| tx.id == *id)
                .cloned()
                .ok_or_else(|| LedgerError::NotFound(id.to_hex()))
        }
    }

    fn funded(owner: &KeyPair) -> (FakeChain, Transaction) {
        let coinbase = Transaction::coinbase(&owner.address(), "genesis").unwrap();
        (FakeChain { txs: vec![coinbase.clone()] }, coinbase)
    }

    #[test]
    fn test_coinbase_transaction() {
        let kp = KeyPair::generate();
        let tx = Transaction::coinbase(&kp.address(), "").unwrap();

        assert!(tx.is_coinbase());
        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.inputs[0].ref_tx_id, None);
        assert_eq!(tx.inputs[0].out_index, COINBASE_OUT_INDEX);
        assert_eq!(tx.outputs[0].value, COINBASE_REWARD);
        assert_eq!(tx.outputs[0].pub_key_hash, kp.pub_key_hash());
        assert_eq!(
            tx.inputs[0].pub_key,
            format!("Coins to {}", kp.address()).into_bytes()
        );
    }

    #[test]
    fn test_coinbase_with_two_inputs_is_not_coinbase() {
        let mut tx = Transaction::coinbase(&KeyPair::generate().address(), "x").unwrap();
        tx.inputs.push(TxInput::coinbase(vec![]));
        assert!(!tx.is_coinbase());
    }

    #[test]
    fn test_identical_transactions_share_id() {
        let pkh = PubKeyHash::new([3; 20]);
        let a = Transaction::new(
            vec![TxInput::new(Hash256::new([1; 32]), 0, vec![1, 2])],
            vec![TxOutput::new(10, pkh)],
        );
        let b = Transaction::new(
            vec![TxInput::new(Hash256::new([1; 32]), 0, vec![1, 2])],
            vec![TxOutput::new(10, pkh)],
        );
        assert_eq!(a.id, b.id);
        assert!(a.id_is_consistent());
    }

    #[test]
    fn test_stale_id_after_mutation_is_detected() {
        let kp = KeyPair::generate();
        let mut tx = Transaction::coinbase(&kp.address(), "memo").unwrap();
        assert!(tx.id_is_consistent());

        tx.outputs[0].value += 1;
        assert!(!tx.id_is_consistent());
    }

    #[test]
    fn test_transaction_serialization() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let (chain, _) = funded(&alice);

        let tx = Transaction::create(&alice.address(), &bob.address(), 30, &chain, &alice.secret_key)
            .unwrap();

        let serialized = tx.serialize();
        let deserialized = Transaction::deserialize(&serialized).unwrap();
        assert_eq!(tx, deserialized);
    }

    #[test]
    fn test_create_with_change() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let (chain, coinbase) = funded(&alice);

        let tx = Transaction::create(&alice.address(), &bob.address(), 30, &chain, &alice.secret_key)
            .unwrap();

        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.inputs[0].ref_tx_id, Some(coinbase.id));
        assert_eq!(tx.inputs[0].out_index, 0);
        assert_eq!(tx.outputs, vec![
            TxOutput::new(30, bob.pub_key_hash()),
            TxOutput::new(70, alice.pub_key_hash()),
        ]);
        assert!(tx.id_is_consistent());
    }

    #[test]
    fn test_create_exact_amount_has_no_change() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let (chain, _) = funded(&alice);

        let tx = Transaction::create(&alice.address(), &bob.address(), COINBASE_REWARD, &chain, &alice.secret_key)
            .unwrap();
        assert_eq!(tx.outputs.len(), 1);
    }

    #[test]
    fn test_create_insufficient_funds() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let (chain, _) = funded(&alice);

        let result = Transaction::create(&alice.address(), &bob.address(), 101, &chain, &alice.secret_key);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunds { required: 101, available: 100 })
        ));
    }

    #[test]
    fn test_signature_and_key_widths() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let (chain, _) = funded(&alice);

        let tx = Transaction::create(&alice.address(), &bob.address(), 30, &chain, &alice.secret_key)
            .unwrap();
        assert_eq!(tx.inputs[0].signature.len(), 64);
        assert_eq!(tx.inputs[0].pub_key.len(), 64);
        assert_eq!(decode_public_key(&tx.inputs[0].pub_key), Some(alice.public_key));
    }

    // P-256 base point G, uncompressed X || Y
    const P256_GENERATOR: &str = concat!(
        "6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296",
        "4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5"
    );

    #[test]
    fn test_p256_generator_round_trips() {
        let bytes = hex::decode(P256_GENERATOR).unwrap();
        let point = decode_public_key(&bytes).expect("G is on P-256");
        assert_eq!(encode_public_key(&point), bytes);

        // Secret scalar 1 has G as its public key
        let mut one = [0u8; 32];
        one[31] = 1;
        let key = SigningKey::from_slice(&one).unwrap();
        assert_eq!(VerifyingKey::from(&key), point);
    }

    #[test]
    fn test_off_curve_point_is_rejected() {
        let mut bytes = hex::decode(P256_GENERATOR).unwrap();
        bytes[63] ^= 1;
        assert!(decode_public_key(&bytes).is_none());
        assert!(decode_public_key(&bytes[..63]).is_none());
    }

    #[test]
    fn test_total_output_value_overflow() {
        let pkh = PubKeyHash::new([5; 20]);
        let tx = Transaction::new(
            vec![TxInput::coinbase(b"big".to_vec())],
            vec![TxOutput::new(40, pkh), TxOutput::new(2, pkh)],
        );
        assert_eq!(tx.total_output_value().unwrap(), 42);

        let tx = Transaction::new(
            vec![TxInput::coinbase(b"too big".to_vec())],
            vec![TxOutput::new(u64::MAX, pkh), TxOutput::new(1, pkh)],
        );
        assert!(matches!(tx.total_output_value(), Err(LedgerError::ValueOverflow(_))));
    }

    #[test]
    fn test_sign_and_verify() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let (chain, _) = funded(&alice);

        let tx = Transaction::create(&alice.address(), &bob.address(), 30, &chain, &alice.secret_key)
            .unwrap();
        let prior = chain.prior_transactions(&tx).unwrap();
        assert!(tx.verify(&prior).unwrap());
    }

    #[test]
    fn test_altered_outputs_fail_verification() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let (chain, _) = funded(&alice);

        let mut tx = Transaction::create(&alice.address(), &bob.address(), 30, &chain, &alice.secret_key)
            .unwrap();
        let prior = chain.prior_transactions(&tx).unwrap();

        tx.outputs[0].value = 90;
        assert!(!tx.verify(&prior).unwrap());
    }

    #[test]
    fn test_foreign_key_cannot_spend() {
        let alice = KeyPair::generate();
        let mallory = KeyPair::generate();
        let (chain, coinbase) = funded(&alice);

        // A valid signature from a key that does not own the output
        let mut tx = Transaction::new(
            vec![TxInput::new(coinbase.id, 0, mallory.pub_key_bytes())],
            vec![TxOutput::new(100, mallory.pub_key_hash())],
        );
        let prior = chain.prior_transactions(&tx).unwrap();
        tx.sign(&mallory.secret_key, &prior).unwrap();

        assert!(!tx.verify(&prior).unwrap());
    }

    #[test]
    fn test_malformed_signature_is_rejected_not_error() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let (chain, _) = funded(&alice);

        let mut tx = Transaction::create(&alice.address(), &bob.address(), 30, &chain, &alice.secret_key)
            .unwrap();
        let prior = chain.prior_transactions(&tx).unwrap();

        tx.inputs[0].signature.truncate(63);
        assert!(!tx.verify(&prior).unwrap());
    }

    #[test]
    fn test_missing_prior_transaction() {
        let alice = KeyPair::generate();
        let mut tx = Transaction::new(
            vec![TxInput::new(Hash256::new([7; 32]), 0, alice.pub_key_bytes())],
            vec![TxOutput::new(1, alice.pub_key_hash())],
        );
        let empty = PriorTransactions::new();

        assert!(matches!(
            tx.sign(&alice.secret_key, &empty),
            Err(LedgerError::MissingPriorTransaction(_))
        ));
        assert!(tx.inputs[0].signature.is_empty());
        assert!(matches!(
            tx.verify(&empty),
            Err(LedgerError::MissingPriorTransaction(_))
        ));
    }

    #[test]
    fn test_coinbase_verifies_without_context() {
        let tx = Transaction::coinbase(&KeyPair::generate().address(), "").unwrap();
        assert!(tx.verify(&PriorTransactions::new()).unwrap());
    }

    #[test]
    fn test_signing_payload_binds_input_and_leaves_tx_untouched() {
        let alice = KeyPair::generate();
        let first = Transaction::coinbase(&alice.address(), "one").unwrap();
        let second = Transaction::coinbase(&alice.address(), "two").unwrap();
        let chain = FakeChain { txs: vec![first.clone(), second.clone()] };

        let tx = Transaction::new(
            vec![
                TxInput::new(first.id, 0, alice.pub_key_bytes()),
                TxInput::new(second.id, 0, alice.pub_key_bytes()),
            ],
            vec![TxOutput::new(200, alice.pub_key_hash())],
        );
        let before = tx.clone();
        let prior = chain.prior_transactions(&tx).unwrap();

        let p0 = tx.signing_payload(0, &prior).unwrap();
        let p1 = tx.signing_payload(1, &prior).unwrap();
        assert_ne!(p0.digest(), p1.digest());
        assert_ne!(p0.digest(), tx.id);
        assert_eq!(tx, before);
    }
}
