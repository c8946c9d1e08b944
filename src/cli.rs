// CLI commands

use crate::config::Config;
use crate::consensus::{BlockValidator, CancelFlag, ProofOfWork};
use crate::core::Block;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::storage::UtxoSet;
use crate::wallet::{Address, Keystore, TransactionBuilder};
use clap::{Parser, Subcommand};
use std::fs;

#[derive(Parser)]
#[command(name = "pow-ledger")]
#[command(about = "Single-node proof-of-work UTXO ledger", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new blockchain and send the genesis reward to ADDRESS
    CreateBlockchain {
        #[arg(long)]
        address: String,
    },

    /// Get balance for an address
    Balance {
        #[arg(long)]
        address: String,
    },

    /// Send coins from a wallet in the keystore
    Send {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: u64,
    },

    /// Print every block, newest first
    PrintChain,

    /// Create a new wallet and print its address
    CreateWallet,

    /// List all addresses in the keystore
    ListAddresses,

    /// Rebuild the cached UTXO set from the chain
    ReindexUtxo,

    /// Check proof of work, ids and signatures of every block
    Validate,
}

/// CLI handler
pub struct CliHandler {
    config: Config,
    cancel: CancelFlag,
}

impl CliHandler {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cancel: CancelFlag::new(),
        }
    }

    /// Flag raised to abort mining, shared with every ledger this handler opens
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Handle CLI command
    pub fn handle(&self, cli: Cli) -> Result<()> {
        match cli.command {
            Commands::CreateBlockchain { address } => self.create_blockchain(&address),
            Commands::Balance { address } => self.balance(&address),
            Commands::Send { from, to, amount } => self.send(&from, &to, amount),
            Commands::PrintChain => self.print_chain(),
            Commands::CreateWallet => self.create_wallet(),
            Commands::ListAddresses => self.list_addresses(),
            Commands::ReindexUtxo => self.reindex_utxo(),
            Commands::Validate => self.validate(),
        }
    }

    fn open_ledger(&self) -> Result<Ledger> {
        Ok(Ledger::open(self.config.blocks_path())?.with_cancel_flag(self.cancel_flag()))
    }

    fn create_blockchain(&self, address: &str) -> Result<()> {
        let address = Address::parse(address)?;
        fs::create_dir_all(&self.config.data_dir)?;

        let ledger = Ledger::create(self.config.blocks_path(), &address, self.cancel_flag())?;
        UtxoSet::open(&ledger)?.reindex(&ledger)?;

        println!("Blockchain created");
        println!("  Genesis: {}", ledger.head());
        println!("  Reward sent to {}", address);
        Ok(())
    }

    fn balance(&self, address: &str) -> Result<()> {
        let address = Address::parse(address)?;
        let ledger = self.open_ledger()?;
        let balance = ledger.balance(&address.pub_key_hash()?)?;

        println!("Balance of {}: {}", address, balance);
        Ok(())
    }

    fn send(&self, from: &str, to: &str, amount: u64) -> Result<()> {
        let from = Address::parse(from)?;
        let to = Address::parse(to)?;
        let keystore = Keystore::load(self.config.wallets_path())?;
        let ledger = self.open_ledger()?;

        let block = TransactionBuilder::new(&keystore, &ledger).send(&from, &to, amount)?;
        UtxoSet::open(&ledger)?.update(&block)?;

        println!("Success!");
        println!("  Block: {}", block.hash);
        println!("  Sent {} from {} to {}", amount, from, to);
        Ok(())
    }

    fn print_chain(&self) -> Result<()> {
        let ledger = self.open_ledger()?;
        let pow = ProofOfWork::default();
        for block in ledger.iter() {
            Self::print_block(&block?, &pow);
        }
        Ok(())
    }

    fn create_wallet(&self) -> Result<()> {
        let path = self.config.wallets_path();
        let mut keystore = Keystore::load(&path)?;
        let address = keystore.create_wallet();
        keystore.save(&path)?;

        println!("New address: {}", address);
        Ok(())
    }

    fn list_addresses(&self) -> Result<()> {
        let keystore = Keystore::load(self.config.wallets_path())?;
        let addresses = keystore.addresses();

        println!("Addresses ({}):", addresses.len());
        for addr in addresses {
            println!("  {}", addr);
        }
        Ok(())
    }

    fn reindex_utxo(&self) -> Result<()> {
        let ledger = self.open_ledger()?;
        let count = UtxoSet::open(&ledger)?.reindex(&ledger)?;

        println!("Done! There are {} transaction outputs in the UTXO set.", count);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let ledger = self.open_ledger()?;
        let report = BlockValidator::default().validate_chain(&ledger)?;

        println!("Chain is valid");
        println!("  Blocks: {}", report.blocks);
        println!("  Transactions: {}", report.transactions);
        Ok(())
    }

    /// Print block information
    fn print_block(block: &Block, pow: &ProofOfWork) {
        println!("Block {}", block.hash);
        match &block.prev_hash {
            Some(prev) => println!("  Previous: {}", prev),
            None => println!("  Previous: (genesis)"),
        }
        println!("  Nonce: {}", block.nonce);
        println!("  PoW: {}", pow.validate(block));
        for tx in &block.transactions {
            println!("{}", tx);
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogConfig;
    use tempfile::TempDir;

    fn handler(dir: &TempDir) -> CliHandler {
        CliHandler::new(Config {
            data_dir: dir.path().to_path_buf(),
            log: LogConfig {
                level: None,
                development: false,
            },
        })
    }

    fn run(handler: &CliHandler, args: &[&str]) -> Result<()> {
        let cli = Cli::parse_from(std::iter::once("pow-ledger").chain(args.iter().copied()));
        handler.handle(cli)
    }

    #[test]
    fn test_wallet_and_send_flow() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir);

        run(&handler, &["create-wallet"]).unwrap();
        run(&handler, &["create-wallet"]).unwrap();
        let addresses = Keystore::load(dir.path().join("wallets.json")).unwrap().addresses();
        let (alice, bob) = (addresses[0].to_string(), addresses[1].to_string());

        run(&handler, &["create-blockchain", "--address", &alice]).unwrap();
        run(&handler, &["send", "--from", &alice, "--to", &bob, "--amount", "30"]).unwrap();
        run(&handler, &["validate"]).unwrap();
        run(&handler, &["reindex-utxo"]).unwrap();

        let ledger = Ledger::open(dir.path().join("blocks")).unwrap();
        let bob = Address::parse(&bob).unwrap();
        assert_eq!(ledger.balance(&bob.pub_key_hash().unwrap()).unwrap(), 30);
    }

    #[test]
    fn test_commands_need_a_ledger() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir);

        assert!(run(&handler, &["print-chain"]).is_err());
        assert!(run(&handler, &["balance", "--address", "not-an-address"]).is_err());
    }

    #[test]
    fn test_create_blockchain_honours_cancel() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir);
        let address = crate::wallet::KeyPair::generate().address().to_string();

        handler.cancel_flag().cancel();
        assert!(matches!(
            run(&handler, &["create-blockchain", "--address", &address]),
            Err(crate::error::LedgerError::MiningCancelled)
        ));
        assert!(Ledger::open(dir.path().join("blocks")).is_err());
    }
}
