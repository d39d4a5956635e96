use crate::audit::events::AuditEvent;
use crate::config::types::ControlConfig;
use crate::context::{DecoyContext, Protocol};
use crate::control::protocol::{self, ControlCommand};
use crate::framing::{self, FrameError};
use crate::utils::{generate_correlation_id, printable};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, info_span, warn, Instrument};

/// Mutable state of one control session.
///
/// `authenticated` only ever goes from false to true. It is recorded but does
/// not gate any command: the decoy answers everyone the same way.
#[derive(Debug, Default)]
pub struct ControlState {
    authenticated: bool,
}

impl ControlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn mark_authenticated(&mut self) {
        self.authenticated = true;
    }
}

/// Result of dispatching one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    /// Recognized keyword, `None` for unrecognized input.
    pub command: Option<ControlCommand>,
    /// Exact reply bytes to send.
    pub reply: String,
    /// Close the transport after sending `reply`.
    pub close: bool,
    /// Outcome of an AUTHENTICATE attempt.
    pub auth: Option<bool>,
}

impl Dispatch {
    fn reply(command: Option<ControlCommand>, reply: String) -> Self {
        Self {
            command,
            reply,
            close: false,
            auth: None,
        }
    }
}

/// Resolve a trimmed command line to its reply, updating `state`.
pub fn dispatch(state: &mut ControlState, cfg: &ControlConfig, line: &str) -> Dispatch {
    let Some(command) = ControlCommand::recognize(line) else {
        return Dispatch::reply(None, protocol::unrecognized());
    };

    match command {
        ControlCommand::Authenticate => {
            let success = password_matches(cfg, line);
            if success {
                state.mark_authenticated();
            }
            Dispatch {
                auth: Some(success),
                ..Dispatch::reply(
                    Some(command),
                    if success {
                        protocol::ok()
                    } else {
                        protocol::auth_failed()
                    },
                )
            }
        }
        ControlCommand::ProtocolInfo => {
            Dispatch::reply(Some(command), protocol::protocol_info(cfg))
        }
        ControlCommand::GetInfo => {
            let reply = if line.to_ascii_lowercase().ends_with("version") {
                protocol::version_info(cfg)
            } else {
                protocol::unrecognized()
            };
            Dispatch::reply(Some(command), reply)
        }
        ControlCommand::Signal => {
            let reload = line
                .split_whitespace()
                .nth(1)
                .is_some_and(|arg| arg.eq_ignore_ascii_case("RELOAD"));
            let reply = if reload {
                protocol::ok()
            } else {
                protocol::unrecognized()
            };
            Dispatch::reply(Some(command), reply)
        }
        // Arguments are deliberately not parsed.
        ControlCommand::MapAddress | ControlCommand::GetConf | ControlCommand::SetConf => {
            Dispatch::reply(Some(command), protocol::ok())
        }
        ControlCommand::Quit => Dispatch {
            close: true,
            ..Dispatch::reply(Some(command), protocol::ok())
        },
    }
}

/// `AUTHENTICATE "<password>"`: exactly two space-separated tokens.
fn password_matches(cfg: &ControlConfig, line: &str) -> bool {
    let tokens: Vec<&str> = line.split(' ').collect();
    if tokens.len() != 2 {
        return false;
    }
    tokens[1]
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .is_some_and(|secret| secret == cfg.password)
}

/// Serve one control-decoy connection until QUIT, EOF or a read failure.
pub async fn handle_connection<S>(
    stream: S,
    peer: SocketAddr,
    ctx: Arc<DecoyContext>,
    cfg: Arc<ControlConfig>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let conn_id = generate_correlation_id();
    let span = info_span!("control", conn_id = %conn_id, peer = %peer);
    let session = ControlSession {
        io: BufReader::new(stream),
        peer,
        conn_id,
        ctx,
        cfg,
        state: ControlState::new(),
    };
    session.run().instrument(span).await
}

struct ControlSession<S> {
    io: BufReader<S>,
    peer: SocketAddr,
    conn_id: String,
    ctx: Arc<DecoyContext>,
    cfg: Arc<ControlConfig>,
    state: ControlState,
}

impl<S> ControlSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn run(mut self) {
        let started = Instant::now();
        info!("Control connection accepted");
        self.audit(AuditEvent::connection_new(
            &self.peer,
            Protocol::Control,
            &self.conn_id,
        ));

        let idle = self.ctx.config.limits.idle_timeout();
        let shutdown = self.ctx.shutdown.clone();
        let reason = loop {
            let read = tokio::select! {
                result = framing::read_line(&mut self.io, idle) => result,
                _ = shutdown.cancelled() => {
                    debug!("Control session ended by shutdown");
                    break "shutdown".to_string();
                }
            };
            let line = match read {
                Ok(line) => line,
                Err(FrameError::Closed) => {
                    debug!("Control client closed connection");
                    break "eof".to_string();
                }
                Err(e) => {
                    warn!(error = %e, "Control session read failed");
                    self.audit(AuditEvent::session_error(
                        &self.peer,
                        Protocol::Control,
                        &self.conn_id,
                        &e.to_string(),
                    ));
                    break e.to_string();
                }
            };

            if self.on_line(line.trim()).await {
                if let Err(e) = self.io.shutdown().await {
                    debug!(error = %e, "Control shutdown after QUIT failed");
                }
                break "quit".to_string();
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            reason = %reason,
            authenticated = self.state.is_authenticated(),
            duration_ms = duration_ms,
            "Control connection closed"
        );
        self.audit(AuditEvent::connection_closed(
            &self.peer,
            Protocol::Control,
            &self.conn_id,
            &reason,
            duration_ms,
        ));
    }

    /// Handle one line; returns true when the session must end.
    async fn on_line(&mut self, line: &str) -> bool {
        let outcome = dispatch(&mut self.state, &self.cfg, line);
        let label = outcome.command.map_or("unrecognized", ControlCommand::keyword);

        info!(command = %label, line = %printable(line.as_bytes()), "Control command received");
        self.audit(AuditEvent::command_received(
            &self.peer,
            Protocol::Control,
            &self.conn_id,
            label,
            Some(line),
        ));

        match outcome.auth {
            Some(true) => {
                info!("Control auth success");
                self.audit(AuditEvent::auth_success(
                    &self.peer,
                    Protocol::Control,
                    &self.conn_id,
                ));
            }
            Some(false) => {
                info!("Control auth failed");
                self.audit(AuditEvent::auth_failure(
                    &self.peer,
                    Protocol::Control,
                    &self.conn_id,
                    line,
                ));
            }
            None => {}
        }

        self.reply(&outcome.reply).await;
        outcome.close
    }

    /// Best-effort write; a failure is recorded but does not end the session.
    async fn reply(&mut self, text: &str) {
        match framing::write_reply(&mut self.io, text.as_bytes()).await {
            Ok(()) => {
                debug!(reply = %printable(text.as_bytes()), "Control reply sent");
                self.audit(AuditEvent::response_sent(
                    &self.peer,
                    Protocol::Control,
                    &self.conn_id,
                    text,
                ));
            }
            Err(e) => {
                warn!(error = %e, "Control reply write failed");
                self.audit(AuditEvent::session_error(
                    &self.peer,
                    Protocol::Control,
                    &self.conn_id,
                    &format!("write failed: {}", e),
                ));
            }
        }
    }

    fn audit(&self, event: AuditEvent) {
        self.ctx.audit.log_event(event);
    }
}
