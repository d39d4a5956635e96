use crate::audit::AuditLogger;
use crate::config::types::AppConfig;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Which decoy a listener or session speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Byte-framed line-printer daemon imitation.
    Print,
    /// Line-framed onion-router control-port imitation.
    Control,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Print => write!(f, "print"),
            Protocol::Control => write!(f, "control"),
        }
    }
}

/// Shared state handed to every session of one listener.
///
/// The configuration is never mutated after startup; the audit logger is the
/// only shared sink and accepts concurrent appends.
pub struct DecoyContext {
    pub config: Arc<AppConfig>,
    pub audit: Arc<AuditLogger>,
    /// Cancelled after the listener stops; open sessions then end with
    /// reason `shutdown`.
    pub shutdown: CancellationToken,
    active_sessions: AtomicU32,
}

impl DecoyContext {
    pub fn new(config: Arc<AppConfig>, audit: Arc<AuditLogger>) -> Self {
        Self {
            config,
            audit,
            shutdown: CancellationToken::new(),
            active_sessions: AtomicU32::new(0),
        }
    }

    pub fn active_sessions(&self) -> u32 {
        self.active_sessions.load(Ordering::Relaxed)
    }

    /// Count a session as open until the returned guard is dropped.
    pub fn track_session(self: &Arc<Self>) -> SessionGuard {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
        SessionGuard { ctx: self.clone() }
    }
}

pub struct SessionGuard {
    ctx: Arc<DecoyContext>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.ctx.active_sessions.fetch_sub(1, Ordering::Relaxed);
    }
}
