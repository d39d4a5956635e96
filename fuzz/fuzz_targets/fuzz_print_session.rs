#![no_main]
use decoyd::audit::AuditLogger;
use decoyd::context::DecoyContext;
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fuzz_target!(|data: &[u8]| {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(async {
        let cfg = decoyd::config::parse_config(
            "[identity]\nserver_name = \"fuzz\"\n\n[print]\n",
        )
        .unwrap();
        let ctx = Arc::new(DecoyContext::new(
            Arc::new(cfg),
            Arc::new(AuditLogger::new_noop()),
        ));
        let (client, server) = tokio::io::duplex(1 << 16);
        let session = tokio::spawn(decoyd::lpd::handler::handle_connection(
            server,
            "127.0.0.1:1".parse().unwrap(),
            ctx,
        ));
        let (mut rd, mut wr) = tokio::io::split(client);
        let drain = tokio::spawn(async move {
            let mut sink = Vec::new();
            let _ = rd.read_to_end(&mut sink).await;
        });
        // Any byte sequence must end the session cleanly at EOF.
        let _ = wr.write_all(data).await;
        let _ = wr.shutdown().await;
        session.await.unwrap();
        drain.await.unwrap();
    });
});
