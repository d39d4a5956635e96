use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use decoyd::cli::{Cli, Command};
use decoyd::config;
use decoyd::config::types::AppConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut app_config = config::load_config(&cli.config)?;
    apply_cli_overrides(&cli, &mut app_config)?;

    match &cli.command {
        Some(Command::CheckConfig) => {
            println!("Configuration is valid.");
            println!("  Server name: {}", app_config.identity.server_name);
            match app_config.print {
                Some(ref p) => println!("  Print decoy:   {}", p.listen),
                None => println!("  Print decoy:   disabled"),
            }
            match app_config.control {
                Some(ref c) => println!("  Control decoy: {} (Tor {})", c.listen, c.version),
                None => println!("  Control decoy: disabled"),
            }
            return Ok(());
        }
        Some(Command::ShowConfig { format }) => {
            let redacted = config::redact::redact_config(&app_config);
            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&redacted)?),
                "toml" => println!("{}", toml::to_string_pretty(&redacted)?),
                _ => anyhow::bail!("unsupported format '{}' (available: toml, json)", format),
            }
            return Ok(());
        }
        None => {}
    }

    let log_level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| app_config.logging.level.to_string());
    decoyd::logging::setup_logging(&log_level, app_config.logging.format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        print = ?app_config.print.as_ref().map(|p| p.listen.as_str()),
        control = ?app_config.control.as_ref().map(|c| c.listen.as_str()),
        "Starting decoy server"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        if let Err(e) = decoyd::server::run(app_config).await {
            error!(error = %format!("{:#}", e), "Server error");
            std::process::exit(1);
        }
    });

    Ok(())
}

fn apply_cli_overrides(cli: &Cli, cfg: &mut AppConfig) -> Result<()> {
    if let Some(ref listen) = cli.print_listen {
        cfg.print.get_or_insert_with(Default::default).listen = listen.clone();
    }
    if let Some(ref listen) = cli.control_listen {
        match cfg.control {
            Some(ref mut control) => control.listen = listen.clone(),
            None => anyhow::bail!("--control-listen requires a [control] section with a password"),
        }
    }
    config::parse_config_validate(cfg)
}
