//! Tests for the UDP listener

use std::sync::Arc;
use std::time::Duration;

use sluice_config::{EventLoopConfig, SelectorKind};
use sluice_pipeline::{Inbound, NullConsumer, Position, Stage, StageOverrides};

use super::*;
use crate::EventLoopPool;

fn pool_config() -> EventLoopConfig {
    EventLoopConfig {
        worker_threads: 2,
        selector: SelectorKind::Portable,
        ..Default::default()
    }
}

fn loopback(recv_buffer_size: usize) -> ListenerConfig {
    ListenerConfig {
        address: "127.0.0.1".into(),
        port: 0,
        recv_buffer_size,
        ..Default::default()
    }
}

fn consumer() -> Arc<dyn MessageConsumer> {
    Arc::new(NullConsumer::new())
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_defaults() {
    let config = ListenerConfig::default();

    assert_eq!(config.address, "");
    assert_eq!(config.port, 0);
    assert_eq!(config.recv_buffer_size, 262_144);
    assert!(!config.log_datagrams);
}

#[test]
fn test_config_from_file_config() {
    let file = UdpListenerConfig {
        address: "127.0.0.1".into(),
        port: 12201,
        recv_buffer_size: 4096,
        log_datagrams: true,
        datagram_log_level: LogLevel::Debug,
        ..Default::default()
    };
    let config = ListenerConfig::from(&file);
    assert_eq!(config.datagram_log_level, Level::DEBUG);

    assert_eq!(config.address, "127.0.0.1");
    assert_eq!(config.port, 12201);
    assert_eq!(config.recv_buffer_size, 4096);
    assert!(config.log_datagrams);
}

#[test]
fn test_bind_address() {
    let config = ListenerConfig {
        address: "127.0.0.1".into(),
        port: 1514,
        ..Default::default()
    };
    assert_eq!(config.bind_address().unwrap(), "127.0.0.1:1514".parse::<SocketAddr>().unwrap());

    let config = ListenerConfig {
        address: "  ".into(),
        port: 1514,
        ..Default::default()
    };
    assert_eq!(config.bind_address().unwrap(), "0.0.0.0:1514".parse::<SocketAddr>().unwrap());

    let config = ListenerConfig {
        address: "[::1]".into(),
        port: 1514,
        ..Default::default()
    };
    assert_eq!(config.bind_address().unwrap(), "[::1]:1514".parse::<SocketAddr>().unwrap());
}

#[test]
fn test_bind_address_invalid() {
    let config = ListenerConfig {
        address: "not-an-ip".into(),
        ..Default::default()
    };
    assert!(matches!(config.bind_address(), Err(ListenerError::Config(_))));
}

// =============================================================================
// Construction
// =============================================================================

#[tokio::test]
async fn test_bootstrap_options_before_launch() {
    let pool = EventLoopPool::current(&pool_config()).unwrap();
    let listener = UdpListener::new(loopback(1024), pool.handle(), consumer()).unwrap();

    let options = listener.bootstrap_options();
    assert_eq!(options.recv_buffer_size, 1024);
    assert_eq!(options.allocator.handle().guess(), 1024);
    assert_eq!(options.oversize, OversizeBehavior::platform());
    assert_eq!(options.bind_address, "127.0.0.1:0".parse::<SocketAddr>().unwrap());
    assert_eq!(options.socket_count, 1);
    assert!(!options.reuse_port);

    assert_eq!(listener.state(), ListenerState::Created);
    assert!(listener.local_address().is_none());
    assert!(listener.identity().is_none());
}

#[tokio::test]
async fn test_default_pool_binds_one_exclusive_socket() {
    let pool = EventLoopPool::current(&EventLoopConfig::default()).unwrap();
    let listener = UdpListener::new(loopback(1024), pool.handle(), consumer()).unwrap();

    assert_eq!(listener.bootstrap_options().socket_count, 1);
    assert!(!listener.bootstrap_options().reuse_port);
}

#[tokio::test]
async fn test_zero_recv_buffer_rejected() {
    let pool = EventLoopPool::current(&pool_config()).unwrap();
    let result = UdpListener::new(loopback(0), pool.handle(), consumer());
    assert!(matches!(result, Err(ListenerError::Config(_))));
}

#[tokio::test]
async fn test_invalid_address_rejected_at_construction() {
    let pool = EventLoopPool::current(&pool_config()).unwrap();
    let config = ListenerConfig {
        address: "999.1.1.1".into(),
        ..Default::default()
    };
    let result = UdpListener::new(config, pool.handle(), consumer());
    assert!(matches!(result, Err(ListenerError::Config(_))));
}

#[tokio::test]
async fn test_oversize_override() {
    let pool = EventLoopPool::current(&pool_config()).unwrap();
    let listener = UdpListener::builder(loopback(1024), pool.handle(), consumer())
        .oversize(OversizeBehavior::Discard)
        .build()
        .unwrap();
    assert_eq!(listener.bootstrap_options().oversize, OversizeBehavior::Discard);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_launch_binds_ephemeral_port() {
    let pool = EventLoopPool::current(&pool_config()).unwrap();
    let listener = UdpListener::new(loopback(1024), pool.handle(), consumer()).unwrap();

    listener.launch(ListenerIdentity::new("udp-test", "UDP Test")).unwrap();

    let local = listener.local_address().unwrap();
    assert_ne!(local.port(), 0);
    assert!(local.ip().is_loopback());
    assert_eq!(listener.state(), ListenerState::Launched);
    assert_eq!(listener.identity().unwrap().id(), "udp-test");

    listener.stop();
}

#[tokio::test]
async fn test_double_launch_rejected() {
    let pool = EventLoopPool::current(&pool_config()).unwrap();
    let listener = UdpListener::new(loopback(1024), pool.handle(), consumer()).unwrap();

    listener.launch(ListenerIdentity::new("a", "A")).unwrap();
    let err = listener.launch(ListenerIdentity::new("a", "A")).unwrap_err();
    assert!(matches!(
        err,
        ListenerError::Lifecycle {
            operation: "launch",
            state: ListenerState::Launched
        }
    ));

    listener.stop();
}

#[tokio::test]
async fn test_stop_idempotent_and_final() {
    let pool = EventLoopPool::current(&pool_config()).unwrap();
    let listener = UdpListener::new(loopback(1024), pool.handle(), consumer()).unwrap();

    // Before launch: no-op
    listener.stop();
    assert_eq!(listener.state(), ListenerState::Created);

    listener.launch(ListenerIdentity::new("a", "A")).unwrap();
    listener.stop();
    listener.stop();
    assert_eq!(listener.state(), ListenerState::Stopped);
    assert!(listener.local_address().is_none());

    let err = listener.launch(ListenerIdentity::new("a", "A")).unwrap_err();
    assert!(matches!(
        err,
        ListenerError::Lifecycle {
            state: ListenerState::Stopped,
            ..
        }
    ));
}

#[tokio::test]
async fn test_port_in_use() {
    let pool = EventLoopPool::current(&pool_config()).unwrap();

    let holder = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = holder.local_addr().unwrap().port();

    let config = ListenerConfig {
        port,
        ..loopback(1024)
    };
    let listener = UdpListener::new(config, pool.handle(), consumer()).unwrap();

    let err = listener.launch(ListenerIdentity::new("a", "A")).unwrap_err();
    assert!(matches!(err, ListenerError::Bind { .. }));
    assert_eq!(listener.state(), ListenerState::Created);
}

#[tokio::test]
async fn test_bad_overrides_fail_launch_without_binding() {
    let pool = EventLoopPool::current(&pool_config()).unwrap();
    let noop = |_: &ListenerIdentity| Box::new(|item: Inbound| Some(item)) as Box<dyn Stage>;
    let overrides = StageOverrides::new().put("x", noop, Some(Position::After("missing".into())));

    let listener = UdpListener::builder(loopback(1024), pool.handle(), consumer())
        .overrides(overrides)
        .build()
        .unwrap();

    let err = listener.launch(ListenerIdentity::new("a", "A")).unwrap_err();
    assert!(matches!(err, ListenerError::Pipeline(_)));
    assert!(listener.local_address().is_none());
}

// =============================================================================
// Metrics
// =============================================================================

#[tokio::test]
async fn test_metric_set_stable() {
    let pool = EventLoopPool::current(&pool_config()).unwrap();
    let one = UdpListener::new(loopback(1024), pool.handle(), consumer()).unwrap();
    let two = UdpListener::new(loopback(1024), pool.handle(), consumer()).unwrap();

    assert!(Arc::ptr_eq(one.metric_set(), one.metric_set()));
    assert!(!Arc::ptr_eq(one.metric_set(), two.metric_set()));

    let before = Arc::clone(one.metric_set());
    one.launch(ListenerIdentity::new("one", "One")).unwrap();
    assert!(Arc::ptr_eq(&before, one.metric_set()));
    one.stop();
    assert!(Arc::ptr_eq(&before, one.metric_set()));
}

#[tokio::test]
async fn test_metrics_handle_reports_identity() {
    let pool = EventLoopPool::current(&pool_config()).unwrap();
    let listener = UdpListener::new(loopback(1024), pool.handle(), consumer()).unwrap();
    let handle = listener.metrics_handle();

    assert_eq!(handle.listener_id(), "");

    listener.launch(ListenerIdentity::new("gelf", "GELF UDP")).unwrap();
    assert_eq!(handle.listener_id(), "gelf");
    assert_eq!(handle.listener_name(), "GELF UDP");
    assert_eq!(handle.snapshot().get(sluice_metrics::READ_PACKETS), 0);

    listener.stop();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_datagram_counted() {
    let pool = EventLoopPool::current(&pool_config()).unwrap();
    let listener = UdpListener::new(loopback(1024), pool.handle(), consumer()).unwrap();
    listener.launch(ListenerIdentity::new("count", "Count")).unwrap();
    let target = listener.local_address().unwrap();

    let client = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(b"hello", target).await.unwrap();

    let counted = tokio::time::timeout(Duration::from_secs(2), async {
        while listener.throughput().read_packets() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    assert!(counted.is_ok(), "datagram should be counted");
    assert_eq!(listener.throughput().read_bytes(), 5);

    listener.stop();
}
