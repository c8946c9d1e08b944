// Proof-of-work ledger - CLI

use clap::Parser;
use pow_ledger::{logging, Cli, CliHandler, Config};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init(&config.log) {
        eprintln!("Error initializing logger: {}", e);
        std::process::exit(1);
    }

    let cli = Cli::parse();
    let handler = CliHandler::new(config);

    // Ctrl-C aborts an in-flight proof-of-work search
    let cancel = handler.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, cancelling mining");
            cancel.cancel();
        }
    });

    // Ledger work is CPU-bound and blocking
    match tokio::task::spawn_blocking(move || handler.handle(cli)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
