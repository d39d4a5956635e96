use crate::audit::events::AuditEvent;
use crate::context::{DecoyContext, Protocol};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Accept connections until `shutdown` fires, spawning one task per session.
///
/// A failed accept is logged and the loop carries on. When
/// `limits.max_connections` is non-zero, connections beyond it are closed
/// immediately and audited as rejected.
pub async fn accept_loop<H, Fut>(
    listener: TcpListener,
    protocol: Protocol,
    ctx: Arc<DecoyContext>,
    shutdown: CancellationToken,
    handler: H,
) where
    H: Fn(TcpStream, SocketAddr) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let limit = ctx.config.limits.max_connections;
    let semaphore = (limit > 0).then(|| Arc::new(Semaphore::new(limit as usize)));

    loop {
        let (stream, peer) = tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(protocol = %protocol, error = %e, "Accept error");
                        continue;
                    }
                }
            }
            _ = shutdown.cancelled() => {
                info!(protocol = %protocol, "Listener shutting down (no new connections)");
                break;
            }
        };

        let permit = match &semaphore {
            None => None,
            Some(sem) => match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    warn!(protocol = %protocol, peer = %peer, "Connection limit reached, rejected");
                    ctx.audit.log_event(AuditEvent::connection_rejected(
                        &peer,
                        protocol,
                        "connection limit reached",
                    ));
                    drop(stream);
                    continue;
                }
            },
        };

        let guard = ctx.track_session();
        let session = handler(stream, peer);
        tokio::spawn(async move {
            let _permit = permit;
            let _guard = guard;
            session.await;
        });
    }
}
