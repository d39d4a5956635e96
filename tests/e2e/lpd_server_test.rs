#[allow(dead_code, unused_imports)]
mod helpers;

use helpers::*;

#[tokio::test]
async fn test_status_query_denied_over_tcp() {
    let server = start_server(test_config("")).await;
    let mut client = Client::connect(server.print_addr).await;

    client.send(b"\x02print_queue\n").await;
    assert_eq!(
        client.line().await,
        "printsrv01 [@Boyk]: Print-services are not available to your host (aF2qXkQ2m).\n"
    );
}

#[tokio::test]
async fn test_job_and_queue_list_share_connection() {
    let server = start_server(test_config("")).await;
    let mut client = Client::connect(server.print_addr).await;

    client.send(b"\x02lp1\n").await;
    client.send(b"%!PS job body\n").await;
    assert_eq!(
        client.line().await,
        "printsrv01 [LPRng-3.8.28]: Print job for queue lp1 received\n"
    );

    client.send(b"\x03").await;
    assert_eq!(
        client.line().await,
        "printsrv01 [LPRng-3.8.28]: Available queues: queue1, queue2, queue3\n"
    );
}

#[tokio::test]
async fn test_queue_name_is_trimmed() {
    let server = start_server(test_config("")).await;
    let mut client = Client::connect(server.print_addr).await;

    client.send(b"\x02  raw  \r\n").await;
    client.send(b"data\r\n").await;
    assert_eq!(
        client.line().await,
        "printsrv01 [LPRng-3.8.28]: Print job for queue raw received\n"
    );
}

#[tokio::test]
async fn test_unknown_bytes_are_silent() {
    let server = start_server(test_config("")).await;
    let mut client = Client::connect(server.print_addr).await;

    client.send(b"\x04\x05\x00").await;
    client.send(b"\x03").await;
    assert!(client.line().await.contains("Available queues"));
}

#[tokio::test]
async fn test_banner_precedes_replies() {
    let mut cfg = test_config("");
    if let Some(print) = cfg.print.as_mut() {
        print.send_banner = true;
    }
    let server = start_server(cfg).await;
    let mut client = Client::connect(server.print_addr).await;
    assert_eq!(client.line().await, "Line printer daemon ready\n");
}
