// Wallet: addresses, keys and transaction building

mod address;
mod keystore;
mod tx_builder;

pub use address::{Address, ADDRESS_VERSION};
pub use keystore::{KeyPair, Keystore};
pub use tx_builder::TransactionBuilder;
