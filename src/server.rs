use crate::audit::AuditLogger;
use crate::config::types::AppConfig;
use crate::context::DecoyContext;
use crate::{control, lpd};

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};

/// Main server orchestrator: bind, serve until SIGTERM / Ctrl-C.
pub async fn run(config: AppConfig) -> Result<()> {
    let bound = BoundServer::bind(config).await?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        signal_token.cancel();
    });

    bound.serve(shutdown).await
}

/// A listener bound at startup together with the context its sessions share.
struct BoundListener {
    listener: TcpListener,
    ctx: Arc<DecoyContext>,
}

/// Every configured listener bound and every audit destination opened.
///
/// Binding happens before any accept loop starts, so a port that cannot be
/// bound aborts startup without serving a single connection.
pub struct BoundServer {
    config: Arc<AppConfig>,
    print: Option<BoundListener>,
    control: Option<BoundListener>,
}

impl BoundServer {
    pub async fn bind(config: AppConfig) -> Result<Self> {
        let config = Arc::new(config);
        let mut sinks = AuditSinks::default();

        let print = match &config.print {
            Some(print_cfg) => {
                let audit = sinks
                    .get(&config, print_cfg.audit_log_path.as_ref())
                    .await?;
                let listener = TcpListener::bind(&print_cfg.listen)
                    .await
                    .with_context(|| format!("binding print listener on {}", print_cfg.listen))?;
                Some(BoundListener {
                    listener,
                    ctx: Arc::new(DecoyContext::new(config.clone(), audit)),
                })
            }
            None => None,
        };

        let control = match &config.control {
            Some(control_cfg) => {
                let audit = sinks
                    .get(&config, control_cfg.audit_log_path.as_ref())
                    .await?;
                let listener = TcpListener::bind(&control_cfg.listen)
                    .await
                    .with_context(|| {
                        format!("binding control listener on {}", control_cfg.listen)
                    })?;
                Some(BoundListener {
                    listener,
                    ctx: Arc::new(DecoyContext::new(config.clone(), audit)),
                })
            }
            None => None,
        };

        Ok(Self {
            config,
            print,
            control,
        })
    }

    pub fn print_addr(&self) -> Option<SocketAddr> {
        self.print.as_ref().and_then(|b| b.listener.local_addr().ok())
    }

    pub fn control_addr(&self) -> Option<SocketAddr> {
        self.control
            .as_ref()
            .and_then(|b| b.listener.local_addr().ok())
    }

    pub fn print_audit(&self) -> Option<Arc<AuditLogger>> {
        self.print.as_ref().map(|b| b.ctx.audit.clone())
    }

    pub fn control_audit(&self) -> Option<Arc<AuditLogger>> {
        self.control.as_ref().map(|b| b.ctx.audit.clone())
    }

    /// Run all accept loops until `shutdown` is cancelled.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        let mut tasks = Vec::new();
        let contexts: Vec<Arc<DecoyContext>> = self
            .print
            .iter()
            .chain(self.control.iter())
            .map(|b| b.ctx.clone())
            .collect();

        if let Some(bound) = self.print {
            let span = tracing::info_span!("print_server");
            tasks.push(tokio::spawn(
                lpd::start_print_server(bound.listener, bound.ctx, shutdown.clone())
                    .instrument(span),
            ));
        }

        if let (Some(bound), Some(control_cfg)) = (self.control, self.config.control.clone()) {
            let span = tracing::info_span!("control_server");
            tasks.push(tokio::spawn(
                control::start_control_server(
                    bound.listener,
                    bound.ctx,
                    Arc::new(control_cfg),
                    shutdown.clone(),
                )
                .instrument(span),
            ));
        }

        info!(
            server_name = %self.config.identity.server_name,
            listeners = tasks.len(),
            "Decoy server started"
        );

        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Listener task failed");
            }
        }

        drain_sessions(&contexts, self.config.limits.shutdown_timeout()).await;

        let mut audits: Vec<Arc<AuditLogger>> =
            contexts.iter().map(|c| c.audit.clone()).collect();
        audits.dedup_by(|a, b| Arc::ptr_eq(a, b));
        for audit in &audits {
            audit.close().await;
        }

        let audit_dropped: u64 = audits.iter().map(|a| a.dropped_count()).sum();
        info!(audit_dropped = audit_dropped, "Shutdown complete");
        Ok(())
    }
}

/// End every open session and wait, up to `timeout`, for them to finish so
/// their final audit records are queued before the sinks close.
async fn drain_sessions(contexts: &[Arc<DecoyContext>], timeout: Duration) {
    for ctx in contexts {
        ctx.shutdown.cancel();
    }

    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let active: u32 = contexts.iter().map(|c| c.active_sessions()).sum();
        if active == 0 {
            info!("All sessions drained");
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            warn!(active_sessions = active, "Shutdown timeout reached, forcing exit");
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// Audit loggers keyed by destination, so listeners sharing a file share
/// one writer task and records never interleave.
#[derive(Default)]
struct AuditSinks {
    by_path: HashMap<Option<PathBuf>, Arc<AuditLogger>>,
}

impl AuditSinks {
    async fn get(
        &mut self,
        config: &AppConfig,
        override_path: Option<&PathBuf>,
    ) -> Result<Arc<AuditLogger>> {
        let path = override_path
            .or(config.logging.audit_log_path.as_ref())
            .cloned();
        if let Some(existing) = self.by_path.get(&path) {
            return Ok(existing.clone());
        }

        let logger = Arc::new(
            AuditLogger::open(
                path.clone(),
                config.logging.audit_max_size_mb * 1024 * 1024,
                config.logging.audit_max_files,
            )
            .await?,
        );
        if let Some(ref p) = path {
            info!(path = %p.display(), "Audit log opened");
        }
        self.by_path.insert(path, logger.clone());
        Ok(logger)
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            info!("Ctrl-C received, shutting down");
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
        _ = tokio::signal::ctrl_c() => info!("Ctrl-C received, shutting down"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Ctrl-C received, shutting down");
}
