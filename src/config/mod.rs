pub mod redact;
pub mod types;

use anyhow::{Context, Result};
use std::path::Path;
use types::AppConfig;

/// Maximum config file size (1 MB)
const MAX_CONFIG_SIZE: u64 = 1_048_576;

/// Load and validate configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("reading config metadata: {}", path.display()))?;
    if metadata.len() > MAX_CONFIG_SIZE {
        anyhow::bail!(
            "config file too large: {} bytes (max {} bytes)",
            metadata.len(),
            MAX_CONFIG_SIZE
        );
    }

    check_config_file_permissions(path);

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config: {}", path.display()))?;
    parse_config(&content)
}

/// On Unix, warn if the config file is readable by group or others,
/// since it holds the control-port password.
#[cfg(unix)]
fn check_config_file_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::metadata(path) {
        Ok(meta) => {
            let mode = meta.permissions().mode();
            if mode & 0o077 != 0 {
                tracing::warn!(
                    path = %path.display(),
                    mode = format!("{:04o}", mode & 0o7777),
                    "Config file is readable by group/others. \
                     Consider restricting permissions to 0600."
                );
            }
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Could not check config file permissions"
            );
        }
    }
}

#[cfg(not(unix))]
fn check_config_file_permissions(_path: &Path) {}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(content).context("parsing TOML configuration")?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate an already-constructed AppConfig (e.g. after CLI overrides).
pub fn parse_config_validate(config: &AppConfig) -> Result<()> {
    validate_config(config)
}

fn validate_config(config: &AppConfig) -> Result<()> {
    validate_identity(config)?;
    validate_listeners(config)?;
    validate_control(config)?;
    Ok(())
}

fn validate_identity(config: &AppConfig) -> Result<()> {
    if config.identity.server_name.trim().is_empty() {
        anyhow::bail!("identity.server_name must not be empty");
    }
    if config.identity.version.contains('\n') || config.identity.server_name.contains('\n') {
        anyhow::bail!("identity fields must be single-line");
    }
    Ok(())
}

fn validate_listeners(config: &AppConfig) -> Result<()> {
    if config.print.is_none() && config.control.is_none() {
        anyhow::bail!("at least one of [print] or [control] must be configured");
    }
    if let Some(ref print) = config.print {
        if print.listen.is_empty() {
            anyhow::bail!("print.listen must not be empty");
        }
    }
    if let Some(ref control) = config.control {
        if control.listen.is_empty() {
            anyhow::bail!("control.listen must not be empty");
        }
    }
    if let (Some(print), Some(control)) = (&config.print, &config.control) {
        // Port 0 asks the OS for a fresh port on each bind.
        if print.listen == control.listen && !print.listen.ends_with(":0") {
            anyhow::bail!(
                "print.listen and control.listen must differ (both '{}')",
                print.listen
            );
        }
    }
    Ok(())
}

fn validate_control(config: &AppConfig) -> Result<()> {
    let Some(ref control) = config.control else {
        return Ok(());
    };
    if control.password.is_empty() {
        anyhow::bail!("control.password must not be empty");
    }
    if control.password.contains('"') || control.password.contains(char::is_whitespace) {
        anyhow::bail!("control.password must not contain quotes or whitespace");
    }
    if control.auth_methods.is_empty() {
        anyhow::bail!("control.auth_methods must list at least one method");
    }
    for method in &control.auth_methods {
        if method.is_empty() || method.contains([',', ' ']) {
            anyhow::bail!("control.auth_methods entry '{}' is not a bare token", method);
        }
    }
    if control.version.is_empty() {
        anyhow::bail!("control.version must not be empty");
    }
    Ok(())
}
