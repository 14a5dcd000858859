//! Runtime reconfiguration through the control channel.

use tcp_balancer::control::ControlError;
use tcp_balancer::load_balancer::StrategyError;
use tcp_balancer::StrategyKind;

mod common;

async fn tagged(tags: &[&'static str]) -> Vec<std::net::SocketAddr> {
    let mut addrs = Vec::new();
    for tag in tags {
        addrs.push(common::start_tagged_backend(tag).await);
    }
    addrs
}

#[tokio::test]
async fn test_strategy_swap_under_traffic() {
    let backends = tagged(&["b0", "b1", "b2"]).await;
    let lb = common::start_balancer(common::config_for(&backends, StrategyKind::RoundRobin)).await;

    assert_eq!(common::fetch(lb.addr).await, b"b1");

    lb.control.change_strategy(StrategyKind::Static).await.unwrap();
    lb.control.edit_strategy(2).await.unwrap();
    for _ in 0..3 {
        assert_eq!(common::fetch(lb.addr).await, b"b2");
    }

    lb.control.edit_strategy(0).await.unwrap();
    assert_eq!(common::fetch(lb.addr).await, b"b0");
}

#[tokio::test]
async fn test_added_backend_joins_rotation() {
    let backends = tagged(&["b0", "b1"]).await;
    let lb = common::start_balancer(common::config_for(&backends, StrategyKind::RoundRobin)).await;

    assert_eq!(common::fetch(lb.addr).await, b"b1");

    let extra = common::start_tagged_backend("b2").await;
    lb.control.add_backend(extra.ip().to_string(), extra.port()).await.unwrap();
    // Wait for the add to be applied.
    assert!(lb.control.edit_strategy(0).await.is_err());

    // Cursor kept at 1, so the new tail comes next.
    assert_eq!(common::fetch(lb.addr).await, b"b2");
    assert_eq!(common::fetch(lb.addr).await, b"b0");
}

#[tokio::test]
async fn test_hash_routing_is_stable_per_request_id() {
    let backends = tagged(&["b0", "b1", "b2", "b3"]).await;
    let lb = common::start_balancer(common::config_for(&backends, StrategyKind::Hash)).await;

    let first = lb.balancer.route_for("abc123").unwrap().key();
    for _ in 0..10 {
        assert_eq!(lb.balancer.route_for("abc123").unwrap().key(), first);
    }
    // Live connections get fresh ids but still land on a registered backend.
    let reply = common::fetch(lb.addr).await;
    assert!([&b"b0"[..], b"b1", b"b2", b"b3"].contains(&reply.as_slice()));
}

#[tokio::test]
async fn test_unsupported_edit_is_reported() {
    let backends = tagged(&["b0"]).await;
    let lb = common::start_balancer(common::config_for(&backends, StrategyKind::Hash)).await;

    let err = lb.control.edit_strategy(0).await.unwrap_err();
    assert!(matches!(
        err,
        ControlError::Strategy(StrategyError::EditUnsupported(StrategyKind::Hash))
    ));

    lb.control.change_strategy(StrategyKind::Static).await.unwrap();
    let err = lb.control.edit_strategy(5).await.unwrap_err();
    assert!(matches!(
        err,
        ControlError::Strategy(StrategyError::IndexOutOfRange { index: 5, len: 1 })
    ));
}

#[tokio::test]
async fn test_exit_stops_control_but_not_traffic() {
    let backends = tagged(&["b0"]).await;
    let lb = common::start_balancer(common::config_for(&backends, StrategyKind::Static)).await;

    lb.control.exit().await.unwrap();
    while !lb.control.is_closed() {
        tokio::task::yield_now().await;
    }
    assert!(matches!(
        lb.control.change_strategy(StrategyKind::Hash).await,
        Err(ControlError::Closed)
    ));

    // The listener keeps accepting after exit.
    assert_eq!(common::fetch(lb.addr).await, b"b0");
}
