pub mod handler;
pub mod protocol;

use crate::acceptor::accept_loop;
use crate::config::types::ControlConfig;
use crate::context::{DecoyContext, Protocol};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Run the control-decoy accept loop on an already-bound listener.
pub async fn start_control_server(
    listener: TcpListener,
    ctx: Arc<DecoyContext>,
    cfg: Arc<ControlConfig>,
    shutdown: CancellationToken,
) {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, methods = %cfg.auth_methods.join(","), "Control decoy listening");
    }

    let session_ctx = ctx.clone();
    accept_loop(listener, Protocol::Control, ctx, shutdown, move |stream, peer| {
        handler::handle_connection(stream, peer, session_ctx.clone(), cfg.clone())
    })
    .await;
}
