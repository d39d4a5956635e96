use crate::audit::events::AuditEvent;
use crate::context::{DecoyContext, Protocol};
use crate::framing::{self, FrameError};
use crate::lpd::protocol::{self, PrintCommand};
use crate::utils::{generate_correlation_id, printable};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tracing::{debug, info, info_span, warn, Instrument};

/// Position inside a 0x02 exchange.
///
/// A job submission spans two reads after the command byte; the queue name
/// captured by the first one lives only until the second completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    Idle,
    AwaitingQueueName,
    AwaitingFileContent { queue: String },
}

/// Serve one print-decoy connection until EOF or a read failure.
///
/// Never returns an error: failures are logged, audited and end the session.
/// The transport is dropped exactly once, when this future completes.
pub async fn handle_connection<S>(stream: S, peer: SocketAddr, ctx: Arc<DecoyContext>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let conn_id = generate_correlation_id();
    let span = info_span!("print", conn_id = %conn_id, peer = %peer);
    let session = PrintSession {
        io: BufReader::new(stream),
        peer,
        conn_id,
        ctx,
        exchange: Exchange::Idle,
    };
    session.run().instrument(span).await
}

struct PrintSession<S> {
    io: BufReader<S>,
    peer: SocketAddr,
    conn_id: String,
    ctx: Arc<DecoyContext>,
    exchange: Exchange,
}

impl<S> PrintSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn run(mut self) {
        let started = Instant::now();
        info!("Print connection accepted");
        self.audit(AuditEvent::connection_new(
            &self.peer,
            Protocol::Print,
            &self.conn_id,
        ));

        let send_banner = self
            .ctx
            .config
            .print
            .as_ref()
            .is_some_and(|p| p.send_banner);
        if send_banner {
            let banner = protocol::banner(&self.ctx.config.identity);
            self.reply(&banner).await;
        }

        let shutdown = self.ctx.shutdown.clone();
        let reason = loop {
            let step = tokio::select! {
                result = self.step() => result,
                _ = shutdown.cancelled() => {
                    debug!("Print session ended by shutdown");
                    break "shutdown".to_string();
                }
            };
            match step {
                Ok(()) => {}
                Err(FrameError::Closed) => {
                    debug!("Print client closed connection");
                    break "eof".to_string();
                }
                Err(e) => {
                    warn!(error = %e, "Print session read failed");
                    self.audit(AuditEvent::session_error(
                        &self.peer,
                        Protocol::Print,
                        &self.conn_id,
                        &e.to_string(),
                    ));
                    break e.to_string();
                }
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(reason = %reason, duration_ms = duration_ms, "Print connection closed");
        self.audit(AuditEvent::connection_closed(
            &self.peer,
            Protocol::Print,
            &self.conn_id,
            &reason,
            duration_ms,
        ));
    }

    /// Perform one read and act on it.
    async fn step(&mut self) -> Result<(), FrameError> {
        let idle = self.ctx.config.limits.idle_timeout();
        match std::mem::replace(&mut self.exchange, Exchange::Idle) {
            Exchange::Idle => {
                let byte = framing::read_byte(&mut self.io, idle).await?;
                self.on_command_byte(byte).await;
            }
            Exchange::AwaitingQueueName => {
                let line = framing::read_line(&mut self.io, idle).await?;
                self.on_queue_line(line.trim()).await;
            }
            Exchange::AwaitingFileContent { queue } => {
                let content = framing::read_line(&mut self.io, idle).await?;
                self.on_file_content(&queue, &content).await;
            }
        }
        Ok(())
    }

    async fn on_command_byte(&mut self, byte: u8) {
        match PrintCommand::from_byte(byte) {
            Some(PrintCommand::ReceiveJob) => {
                self.exchange = Exchange::AwaitingQueueName;
            }
            Some(PrintCommand::QueueState) => {
                info!(command = "queue_state", "Queue list requested");
                self.audit_command(PrintCommand::QueueState.label(), None);
                let reply = protocol::queue_list(&self.ctx.config.identity);
                self.reply(&reply).await;
            }
            None => {
                let hex = format!("0x{:02x}", byte);
                info!(command = %hex, "Unknown print command ignored");
                self.audit_command("unknown", Some(&hex));
            }
        }
    }

    async fn on_queue_line(&mut self, line: &str) {
        info!(command = "receive_job", argument = %line, "Print command received");
        self.audit_command(PrintCommand::ReceiveJob.label(), Some(line));

        if line == protocol::STATUS_QUERY {
            let reply = protocol::status_denied(&self.ctx.config.identity);
            self.reply(&reply).await;
        } else {
            self.exchange = Exchange::AwaitingFileContent {
                queue: line.to_string(),
            };
        }
    }

    async fn on_file_content(&mut self, queue: &str, content: &str) {
        info!(queue = %queue, bytes = content.len(), "Print job received");
        self.audit(AuditEvent::job_received(
            &self.peer,
            Protocol::Print,
            &self.conn_id,
            queue,
            content,
        ));
        let reply = protocol::job_received(&self.ctx.config.identity, queue);
        self.reply(&reply).await;
    }

    /// Best-effort write; a failure is recorded but does not end the session.
    async fn reply(&mut self, text: &str) {
        match framing::write_reply(&mut self.io, text.as_bytes()).await {
            Ok(()) => {
                debug!(reply = %printable(text.as_bytes()), "Print reply sent");
                self.audit(AuditEvent::response_sent(
                    &self.peer,
                    Protocol::Print,
                    &self.conn_id,
                    text,
                ));
            }
            Err(e) => {
                warn!(error = %e, "Print reply write failed");
                self.audit(AuditEvent::session_error(
                    &self.peer,
                    Protocol::Print,
                    &self.conn_id,
                    &format!("write failed: {}", e),
                ));
            }
        }
    }

    fn audit_command(&self, command: &str, argument: Option<&str>) {
        self.audit(AuditEvent::command_received(
            &self.peer,
            Protocol::Print,
            &self.conn_id,
            command,
            argument,
        ));
    }

    fn audit(&self, event: AuditEvent) {
        self.ctx.audit.log_event(event);
    }
}
