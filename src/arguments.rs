/// Command-line arguments.
use clap::Parser;

use crate::logger::LogLevel;

#[derive(Debug, Parser)]
#[command(
    name = "tokenscope",
    about = "Aggregates Solana token market data from multiple providers",
    version
)]
pub struct Arguments {
    /// Run a single refresh cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Clear cached token data and exit
    #[arg(long)]
    pub flush_cache: bool,

    /// Show debug logs
    #[arg(long)]
    pub debug: bool,

    /// Only show warnings and errors
    #[arg(long, conflicts_with = "debug")]
    pub quiet: bool,
}

impl Arguments {
    pub fn log_level(&self) -> LogLevel {
        if self.debug {
            LogLevel::Debug
        } else if self.quiet {
            LogLevel::Warning
        } else {
            LogLevel::Info
        }
    }
}
