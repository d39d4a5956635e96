pub mod handler;
pub mod protocol;

use crate::acceptor::accept_loop;
use crate::context::{DecoyContext, Protocol};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Run the print-decoy accept loop on an already-bound listener.
pub async fn start_print_server(
    listener: TcpListener,
    ctx: Arc<DecoyContext>,
    shutdown: CancellationToken,
) {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Print decoy listening");
    }

    let session_ctx = ctx.clone();
    accept_loop(listener, Protocol::Print, ctx, shutdown, move |stream, peer| {
        handler::handle_connection(stream, peer, session_ctx.clone())
    })
    .await;
}
