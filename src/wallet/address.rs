// Base58Check addresses

use crate::core::{sha256_hash, PubKeyHash};
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version byte prefixed to the public key hash
pub const ADDRESS_VERSION: u8 = 0x00;

/// Checksum length (first bytes of double SHA-256)
const CHECKSUM_LEN: usize = 4;

/// Address - Base58Check(version || pub_key_hash || checksum)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Encode a public key hash as an address
    pub fn from_pub_key_hash(pub_key_hash: &PubKeyHash) -> Self {
        let mut payload = Vec::with_capacity(1 + 20 + CHECKSUM_LEN);
        payload.push(ADDRESS_VERSION);
        payload.extend_from_slice(pub_key_hash.as_bytes());
        let check = checksum(&payload);
        payload.extend_from_slice(&check);
        Self(bs58::encode(payload).into_string())
    }

    /// Parse and validate an address string
    pub fn parse(s: &str) -> Result<Self> {
        let address = Self(s.to_string());
        address.pub_key_hash()?;
        Ok(address)
    }

    /// Quick validity check
    pub fn validate(s: &str) -> bool {
        Self::parse(s).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode back to the locked public key hash, checking version and checksum
    pub fn pub_key_hash(&self) -> Result<PubKeyHash> {
        let bytes = bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| LedgerError::InvalidAddress(format!("{}: {}", self.0, e)))?;

        if bytes.len() != 1 + 20 + CHECKSUM_LEN {
            return Err(LedgerError::InvalidAddress(format!(
                "{}: decoded length {}",
                self.0,
                bytes.len()
            )));
        }

        let (payload, check) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
        if checksum(payload).as_slice() != check {
            return Err(LedgerError::InvalidAddress(format!("{}: bad checksum", self.0)));
        }
        if payload[0] != ADDRESS_VERSION {
            return Err(LedgerError::InvalidAddress(format!(
                "{}: unknown version {:#04x}",
                self.0, payload[0]
            )));
        }

        PubKeyHash::from_slice(&payload[1..])
    }
}

fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let second = sha256_hash(&sha256_hash(payload));
    let mut check = [0u8; CHECKSUM_LEN];
    check.copy_from_slice(&second[..CHECKSUM_LEN]);
    check
}

impl FromStr for Address {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
