use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "decoyd",
    version,
    about = "Decoy print-spooler and control-port responder"
)]
pub struct Cli {
    /// Path to configuration file (also settable via DECOYD_CONFIG env var)
    #[arg(short, long, default_value = "decoyd.toml", env = "DECOYD_CONFIG")]
    pub config: PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override the print-decoy listen address (host:port)
    #[arg(long)]
    pub print_listen: Option<String>,

    /// Override the control-decoy listen address (host:port)
    #[arg(long)]
    pub control_listen: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate configuration file
    CheckConfig,
    /// Show the effective configuration (control password redacted)
    ShowConfig {
        /// Output format: toml or json
        #[arg(long, default_value = "toml")]
        format: String,
    },
}
