// Key management

use crate::core::{encode_public_key, hash160, PubKeyHash};
use crate::error::{LedgerError, Result};
use crate::wallet::Address;
use rand::rngs::OsRng;
use p256::ecdsa::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// On-disk keystore layout: address -> hex secret key
#[derive(Serialize, Deserialize, Default)]
struct KeystoreFile {
    wallets: BTreeMap<Address, String>,
}

/// P-256 key pair
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SigningKey,
    pub public_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new key pair
    pub fn generate() -> Self {
        let secret_key = SigningKey::random(&mut OsRng);
        let public_key = VerifyingKey::from(&secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create from secret key bytes
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let secret_key = SigningKey::from_slice(bytes)?;
        let public_key = VerifyingKey::from(&secret_key);
        Ok(Self {
            secret_key,
            public_key,
        })
    }

    /// Public key as carried in inputs (X || Y)
    pub fn pub_key_bytes(&self) -> Vec<u8> {
        encode_public_key(&self.public_key)
    }

    pub fn pub_key_hash(&self) -> PubKeyHash {
        hash160(&self.pub_key_bytes())
    }

    pub fn address(&self) -> Address {
        Address::from_pub_key_hash(&self.pub_key_hash())
    }
}

/// Keystore - manages multiple key pairs
#[derive(Default)]
pub struct Keystore {
    keys: HashMap<Address, KeyPair>,
}

impl Keystore {
    /// Create a new keystore
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate and remember a new key pair, returning its address
    pub fn create_wallet(&mut self) -> Address {
        let keypair = KeyPair::generate();
        let address = keypair.address();
        log::info!("Created wallet {}", address);
        self.keys.insert(address.clone(), keypair);
        address
    }

    /// Get key pair for address
    pub fn get(&self, address: &Address) -> Result<&KeyPair> {
        self.keys
            .get(address)
            .ok_or_else(|| LedgerError::NotFound(format!("wallet {}", address)))
    }

    /// All addresses, sorted
    pub fn addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self.keys.keys().cloned().collect();
        addresses.sort();
        addresses
    }

    /// Count addresses
    pub fn count(&self) -> usize {
        self.keys.len()
    }

    /// Save keystore to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = KeystoreFile {
            wallets: self
                .keys
                .iter()
                .map(|(addr, kp)| (addr.clone(), hex::encode(kp.secret_key.to_bytes())))
                .collect(),
        };

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    /// Load keystore from file. A missing file is an empty keystore.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }

        let file: KeystoreFile = serde_json::from_str(&fs::read_to_string(path)?)?;

        let mut keys = HashMap::new();
        for (addr, secret_hex) in file.wallets {
            let secret = hex::decode(&secret_hex)
                .map_err(|e| LedgerError::Keystore(format!("{}: {}", addr, e)))?;
            let kp = KeyPair::from_secret_bytes(&secret)?;
            if kp.address() != addr {
                return Err(LedgerError::Keystore(format!(
                    "{}: secret key belongs to {}",
                    addr,
                    kp.address()
                )));
            }
            keys.insert(addr, kp);
        }

        Ok(Self { keys })
    }
}
