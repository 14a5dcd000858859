//! End-to-end relaying through the balancer.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use tcp_balancer::StrategyKind;

mod common;

#[tokio::test]
async fn test_binary_round_trip() {
    let backend = common::start_echo_backend().await;
    let lb = common::start_balancer(common::config_for(&[backend], StrategyKind::Hash)).await;

    let payload: Vec<u8> = (0..16 * 1024).map(|i| (i % 256) as u8).collect();

    let mut client = TcpStream::connect(lb.addr).await.unwrap();
    client.write_all(&payload[..1000]).await.unwrap();
    client.write_all(&[]).await.unwrap();
    client.write_all(&payload[1000..]).await.unwrap();
    client.shutdown().await.unwrap();

    let echoed = common::read_to_end(&mut client).await;
    assert_eq!(echoed.len(), payload.len());
    assert_eq!(echoed, payload);
    assert_eq!(lb.balancer.backends()[0].request_count(), 1);
}

#[tokio::test]
async fn test_empty_session() {
    let backend = common::start_echo_backend().await;
    let lb = common::start_balancer(common::config_for(&[backend], StrategyKind::Static)).await;

    let mut client = TcpStream::connect(lb.addr).await.unwrap();
    client.shutdown().await.unwrap();
    assert!(common::read_to_end(&mut client).await.is_empty());
}

#[tokio::test]
async fn test_backend_speaks_first() {
    let backend = common::start_tagged_backend("hello from backend").await;
    let lb = common::start_balancer(common::config_for(&[backend], StrategyKind::Hash)).await;

    assert_eq!(common::fetch(lb.addr).await, b"hello from backend");
}

#[tokio::test]
async fn test_interleaved_exchange() {
    let backend = common::start_echo_backend().await;
    let lb = common::start_balancer(common::config_for(&[backend], StrategyKind::RoundRobin)).await;

    let mut client = TcpStream::connect(lb.addr).await.unwrap();
    for round in 0..5u8 {
        let msg = [round, 0, 255, round];
        client.write_all(&msg).await.unwrap();
        let mut buf = [0u8; 4];
        tokio::time::timeout(Duration::from_secs(5), client.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(buf, msg);
    }
}

#[tokio::test]
async fn test_round_robin_over_live_connections() {
    let b0 = common::start_tagged_backend("b0").await;
    let b1 = common::start_tagged_backend("b1").await;
    let b2 = common::start_tagged_backend("b2").await;
    let lb = common::start_balancer(common::config_for(&[b0, b1, b2], StrategyKind::RoundRobin)).await;

    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(String::from_utf8(common::fetch(lb.addr).await).unwrap());
    }

    // First dispatch goes to index 1.
    assert_eq!(seen, ["b1", "b2", "b0", "b1"]);
    let counts: Vec<u64> = lb.balancer.backends().iter().map(|b| b.request_count()).collect();
    assert_eq!(counts, [1, 2, 1]);
}

#[tokio::test]
async fn test_concurrent_sessions() {
    let backend = common::start_echo_backend().await;
    let lb = common::start_balancer(common::config_for(&[backend], StrategyKind::Hash)).await;

    let mut tasks = Vec::new();
    for i in 0..20u32 {
        let addr = lb.addr;
        tasks.push(tokio::spawn(async move {
            let mut client = TcpStream::connect(addr).await.unwrap();
            let msg = format!("session-{i}");
            client.write_all(msg.as_bytes()).await.unwrap();
            client.shutdown().await.unwrap();
            let echoed = common::read_to_end(&mut client).await;
            assert_eq!(echoed, msg.as_bytes());
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(lb.balancer.backends()[0].request_count(), 20);
}
