use crate::config::types::AppConfig;

/// Redact sensitive fields in a config for safe display.
/// Replaces the control-port password with "***".
pub fn redact_config(cfg: &AppConfig) -> AppConfig {
    let mut redacted = cfg.clone();

    if let Some(ref mut control) = redacted.control {
        if !control.password.is_empty() {
            control.password = "***".to_string();
        }
    }

    redacted
}
