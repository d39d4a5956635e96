use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Log level enum (replaces stringly-typed field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Log format enum (replaces stringly-typed field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Top-level configuration. Presence of `[print]` / `[control]` enables
/// the corresponding decoy listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub identity: ServerIdentity,
    #[serde(default)]
    pub print: Option<PrintConfig>,
    #[serde(default)]
    pub control: Option<ControlConfig>,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Identity advertised by the print decoy. Loaded once, shared read-only.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerIdentity {
    pub server_name: String,
    #[serde(default = "default_identity_version")]
    pub version: String,
    #[serde(default = "default_banner")]
    pub banner: String,
}

fn default_identity_version() -> String {
    "LPRng-3.8.28".to_string()
}

fn default_banner() -> String {
    "Line printer daemon ready".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PrintConfig {
    #[serde(default = "default_print_listen")]
    pub listen: String,
    /// Overrides `logging.audit_log_path` for this listener.
    pub audit_log_path: Option<PathBuf>,
    /// Write the identity banner as soon as a client connects.
    #[serde(default)]
    pub send_banner: bool,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            listen: default_print_listen(),
            audit_log_path: None,
            send_banner: false,
        }
    }
}

fn default_print_listen() -> String {
    "0.0.0.0:515".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlConfig {
    #[serde(default = "default_control_listen")]
    pub listen: String,
    pub password: String,
    #[serde(default = "default_auth_methods")]
    pub auth_methods: Vec<String>,
    #[serde(default = "default_control_version")]
    pub version: String,
    /// Advertised as `COOKIEFILE="..."` in PROTOCOLINFO replies.
    pub cookie_file: Option<String>,
    /// Overrides `logging.audit_log_path` for this listener.
    pub audit_log_path: Option<PathBuf>,
}

fn default_control_listen() -> String {
    "0.0.0.0:9051".to_string()
}

fn default_auth_methods() -> Vec<String> {
    vec!["HASHEDPASSWORD".to_string()]
}

fn default_control_version() -> String {
    "0.4.8.9".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Max concurrent sessions per listener (0 = unlimited).
    #[serde(default)]
    pub max_connections: u32,
    /// Seconds a session may wait on a read before being dropped (0 = never).
    #[serde(default)]
    pub idle_timeout: u64,
    /// Seconds to wait for open sessions to end after a shutdown signal.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_connections: 0,
            idle_timeout: 0,
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

fn default_shutdown_timeout() -> u64 {
    5
}

impl LimitsConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout))
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    pub audit_log_path: Option<PathBuf>,
    #[serde(default = "default_audit_max_size_mb")]
    pub audit_max_size_mb: u64,
    #[serde(default = "default_audit_max_files")]
    pub audit_max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            audit_log_path: None,
            audit_max_size_mb: default_audit_max_size_mb(),
            audit_max_files: default_audit_max_files(),
        }
    }
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_audit_max_size_mb() -> u64 {
    100
}

fn default_audit_max_files() -> u32 {
    5
}
