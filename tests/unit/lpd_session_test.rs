use decoyd::audit::events::AuditEvent;
use decoyd::audit::AuditLogger;
use decoyd::config;
use decoyd::context::DecoyContext;
use decoyd::lpd::handler::handle_connection;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::{timeout, Duration};

fn context(extra: &str) -> Arc<DecoyContext> {
    let cfg = config::parse_config(&format!(
        r##"
[identity]
server_name = "printsrv01"
version = "LPRng-3.8.28"
banner = "printsrv01 ready"

[print]
listen = "127.0.0.1:0"
{extra}
"##
    ))
    .unwrap();
    Arc::new(DecoyContext::new(
        Arc::new(cfg),
        Arc::new(AuditLogger::new_noop()),
    ))
}

fn peer() -> SocketAddr {
    "198.51.100.20:50515".parse().unwrap()
}

async fn next_line<R: tokio::io::AsyncBufRead + Unpin>(reader: &mut R) -> String {
    let mut line = String::new();
    timeout(Duration::from_secs(2), reader.read_line(&mut line))
        .await
        .expect("reply timeout")
        .expect("read error");
    line
}

#[tokio::test]
async fn status_query_is_denied() {
    let ctx = context("");
    let (client, server) = tokio::io::duplex(4096);
    let task = tokio::spawn(handle_connection(server, peer(), ctx.clone()));

    let (rd, mut wr) = tokio::io::split(client);
    let mut rd = BufReader::new(rd);
    wr.write_all(b"\x02print_queue\n").await.unwrap();
    let reply = next_line(&mut rd).await;
    assert!(reply.contains("printsrv01"));
    assert!(!reply.contains("received"));
    assert!(reply.ends_with('\n'));

    drop(wr);
    drop(rd);
    task.await.unwrap();
}

#[tokio::test]
async fn job_submission_is_confirmed() {
    let ctx = context("");
    let (client, server) = tokio::io::duplex(4096);
    let task = tokio::spawn(handle_connection(server, peer(), ctx.clone()));

    let (rd, mut wr) = tokio::io::split(client);
    let mut rd = BufReader::new(rd);
    wr.write_all(b"\x02lp1\n").await.unwrap();
    wr.write_all(b"%!PS-Adobe-3.0 hello\n").await.unwrap();
    let reply = next_line(&mut rd).await;
    assert_eq!(reply, "printsrv01 [LPRng-3.8.28]: Print job for queue lp1 received\n");

    drop(wr);
    drop(rd);
    task.await.unwrap();

    let events = ctx.audit.recent_events(100);
    let job = events
        .iter()
        .find_map(|e| match e {
            AuditEvent::JobReceived { queue, content, .. } => Some((queue.clone(), content.clone())),
            _ => None,
        })
        .expect("job.received recorded");
    assert_eq!(job.0, "lp1");
    assert_eq!(job.1, "%!PS-Adobe-3.0 hello");
}

#[tokio::test]
async fn queue_list_is_stable_across_exchanges() {
    let ctx = context("");
    let (client, server) = tokio::io::duplex(4096);
    let task = tokio::spawn(handle_connection(server, peer(), ctx));

    let (rd, mut wr) = tokio::io::split(client);
    let mut rd = BufReader::new(rd);

    wr.write_all(b"\x03").await.unwrap();
    let first = next_line(&mut rd).await;
    assert_eq!(
        first,
        "printsrv01 [LPRng-3.8.28]: Available queues: queue1, queue2, queue3\n"
    );

    wr.write_all(b"\x02lp9\ncontent\n").await.unwrap();
    let _confirm = next_line(&mut rd).await;
    wr.write_all(b"\x02print_queue\n").await.unwrap();
    let _denied = next_line(&mut rd).await;

    wr.write_all(b"\x03").await.unwrap();
    assert_eq!(next_line(&mut rd).await, first);

    drop(wr);
    drop(rd);
    task.await.unwrap();
}

#[tokio::test]
async fn unknown_byte_gets_no_reply() {
    let ctx = context("");
    let (client, server) = tokio::io::duplex(4096);
    let task = tokio::spawn(handle_connection(server, peer(), ctx.clone()));

    let (rd, mut wr) = tokio::io::split(client);
    let mut rd = BufReader::new(rd);
    // 0x01 and 0x7f are ignored; the following 0x03 is the first thing answered.
    wr.write_all(b"\x01\x7f\x03").await.unwrap();
    let reply = next_line(&mut rd).await;
    assert!(reply.contains("Available queues"));

    drop(wr);
    drop(rd);
    task.await.unwrap();

    let unknown = ctx
        .audit
        .recent_events(100)
        .into_iter()
        .filter(|e| matches!(e, AuditEvent::CommandReceived { command, .. } if command == "unknown"))
        .count();
    assert_eq!(unknown, 2);
}

#[tokio::test]
async fn eof_is_normal_termination() {
    let ctx = context("");
    let (client, server) = tokio::io::duplex(64);
    let task = tokio::spawn(handle_connection(server, peer(), ctx.clone()));
    drop(client);
    timeout(Duration::from_secs(2), task).await.unwrap().unwrap();

    let events = ctx.audit.recent_events(100);
    assert!(!events
        .iter()
        .any(|e| matches!(e, AuditEvent::SessionError { .. })));
    match events.last() {
        Some(AuditEvent::ConnectionClosed { reason, .. }) => assert_eq!(reason, "eof"),
        other => panic!("expected connection.closed, got {:?}", other),
    }
}

#[tokio::test]
async fn eof_mid_exchange_ends_session() {
    let ctx = context("");
    let (client, server) = tokio::io::duplex(64);
    let task = tokio::spawn(handle_connection(server, peer(), ctx.clone()));

    let (_rd, mut wr) = tokio::io::split(client);
    wr.write_all(b"\x02lp1\n").await.unwrap();
    drop(wr);
    drop(_rd);
    timeout(Duration::from_secs(2), task).await.unwrap().unwrap();

    assert!(!ctx
        .audit
        .recent_events(100)
        .iter()
        .any(|e| matches!(e, AuditEvent::JobReceived { .. })));
}

#[tokio::test]
async fn banner_sent_when_enabled() {
    let ctx = context("send_banner = true");
    let (client, server) = tokio::io::duplex(4096);
    let task = tokio::spawn(handle_connection(server, peer(), ctx));

    let (rd, wr) = tokio::io::split(client);
    let mut rd = BufReader::new(rd);
    assert_eq!(next_line(&mut rd).await, "printsrv01 ready\n");

    drop(wr);
    drop(rd);
    task.await.unwrap();
}

#[tokio::test]
async fn unterminated_job_content_is_confirmed_and_audited() {
    let ctx = context("");
    let (client, server) = tokio::io::duplex(4096);
    let task = tokio::spawn(handle_connection(server, peer(), ctx.clone()));

    let (rd, mut wr) = tokio::io::split(client);
    let mut rd = BufReader::new(rd);
    wr.write_all(b"\x02lp1\n%!PS payload without newline").await.unwrap();
    wr.shutdown().await.unwrap();

    assert_eq!(
        next_line(&mut rd).await,
        "printsrv01 [LPRng-3.8.28]: Print job for queue lp1 received\n"
    );
    timeout(Duration::from_secs(2), task).await.unwrap().unwrap();

    let events = ctx.audit.recent_events(100);
    let content = events
        .iter()
        .find_map(|e| match e {
            AuditEvent::JobReceived { content, .. } => Some(content.clone()),
            _ => None,
        })
        .expect("job.received recorded");
    assert_eq!(content, "%!PS payload without newline");
    match events.last() {
        Some(AuditEvent::ConnectionClosed { reason, .. }) => assert_eq!(reason, "eof"),
        other => panic!("expected connection.closed, got {:?}", other),
    }
}

#[tokio::test]
async fn unterminated_status_query_is_denied() {
    let ctx = context("");
    let (client, server) = tokio::io::duplex(4096);
    let task = tokio::spawn(handle_connection(server, peer(), ctx));

    let (rd, mut wr) = tokio::io::split(client);
    let mut rd = BufReader::new(rd);
    wr.write_all(b"\x02print_queue").await.unwrap();
    wr.shutdown().await.unwrap();

    assert!(next_line(&mut rd)
        .await
        .contains("Print-services are not available to your host"));
    timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_ends_idle_session() {
    let ctx = context("");
    let (client, server) = tokio::io::duplex(64);
    let task = tokio::spawn(handle_connection(server, peer(), ctx.clone()));

    tokio::time::sleep(Duration::from_millis(50)).await;
    ctx.shutdown.cancel();
    timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
    drop(client);

    match ctx.audit.recent_events(100).last() {
        Some(AuditEvent::ConnectionClosed { reason, .. }) => assert_eq!(reason, "shutdown"),
        other => panic!("expected connection.closed, got {:?}", other),
    }
}
