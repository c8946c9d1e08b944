// Hashing utilities
//
// Every digest the ledger commits to is domain separated, so a transaction id
// can never be replayed as a signing payload or a proof-of-work preimage.

use crate::core::{Hash256, PubKeyHash};
use sha2::{Digest, Sha256};

/// Transaction id over inputs and outputs
pub const TAG_TXID: &str = "ledger/txid";
/// Per-input signing payload
pub const TAG_SIGHASH: &str = "ledger/sighash";
/// Digest of a block's ordered transaction ids
pub const TAG_TXS: &str = "ledger/txs";
/// Proof-of-work digest, which is also the block hash
pub const TAG_POW: &str = "ledger/pow";

/// SHA256(SHA256(tag) || SHA256(tag) || data)
pub fn tagged_hash(tag: &str, data: &[u8]) -> Hash256 {
    let tag_hash = Sha256::digest(tag.as_bytes());
    let digest = Sha256::new()
        .chain_update(&tag_hash)
        .chain_update(&tag_hash)
        .chain_update(data)
        .finalize();
    Hash256::new(digest.into())
}

/// Single SHA256 hash
pub fn sha256_hash(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// RIPEMD160(SHA256(data)) - the lock placed on outputs
pub fn hash160(data: &[u8]) -> PubKeyHash {
    use ripemd::{Ripemd160, Digest as RipemdDigest};
    let sha = Sha256::digest(data);
    let ripemd = Ripemd160::digest(sha);
    PubKeyHash::new(ripemd.into())
}
