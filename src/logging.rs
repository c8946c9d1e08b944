// Logger setup for the binary

use crate::config::LogConfig;
use crate::error::{LedgerError, Result};
use env_logger::{Builder, Env};
use std::io::Write;

/// Install the global logger. Call once, before any ledger work.
pub fn init(config: &LogConfig) -> Result<()> {
    let mut builder = match config.level {
        Some(level) => {
            let mut builder = Builder::new();
            builder.filter_level(level);
            builder
        }
        None => Builder::from_env(Env::default().default_filter_or("info")),
    };

    if config.development {
        builder.format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} [{}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.module_path().unwrap_or("?"),
                record.line().unwrap_or(0),
                record.args()
            )
        });
    } else {
        builder
            .format_timestamp_secs()
            .format_module_path(false)
            .format_target(false);
    }

    builder
        .try_init()
        .map_err(|e| LedgerError::Config(format!("logger: {}", e)))
}
