//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use tcp_balancer::config::{BackendConfig, BalancerConfig, ListenerConfig};
use tcp_balancer::net::listener::Listener;
use tcp_balancer::{Balancer, ControlHandle, ProxyServer, StrategyKind};

/// A running balancer under test.
pub struct TestBalancer {
    pub addr: SocketAddr,
    pub balancer: Balancer,
    pub control: ControlHandle,
}

/// Start a backend that echoes every byte back until the client half-closes.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = socket.into_split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
                let _ = writer.shutdown().await;
            });
        }
    });
    addr
}

/// Start a backend that writes `tag` to every connection and closes it.
pub async fn start_tagged_backend(tag: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = socket.write_all(tag.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Config routing to the given backends, listening on an ephemeral port.
pub fn config_for(backends: &[SocketAddr], strategy: StrategyKind) -> BalancerConfig {
    let mut config = BalancerConfig::default();
    config.listener = ListenerConfig {
        bind_address: "127.0.0.1:0".into(),
        max_connections: 128,
    };
    config.strategy.name = strategy;
    config.backends = backends
        .iter()
        .map(|a| BackendConfig::new(a.ip().to_string(), a.port()))
        .collect();
    config.logging.file = None;
    config
}

/// Bind and run a balancer in the background.
pub async fn start_balancer(config: BalancerConfig) -> TestBalancer {
    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = ProxyServer::new(&config);
    let balancer = server.balancer();
    let control = server.control();

    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    TestBalancer {
        addr,
        balancer,
        control,
    }
}

/// Connect, read until the balancer or backend closes, with a deadline.
pub async fn fetch(addr: SocketAddr) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    read_to_end(&mut stream).await
}

pub async fn read_to_end(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut buf))
        .await
        .expect("timed out waiting for EOF")
        .unwrap();
    buf
}
