//! Tests for the UDP listener

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::metrics::ListenerMetrics;
use crate::udp::{Admission, ListenerError, UdpListener, UdpListenerConfig, admit};

fn test_config() -> UdpListenerConfig {
    UdpListenerConfig {
        read_timeout: Duration::from_millis(50),
        ..UdpListenerConfig::loopback()
    }
}

/// Poll until `cond` holds or a second passes
async fn wait_for(metrics: &Arc<ListenerMetrics>, cond: impl Fn(&ListenerMetrics) -> bool) {
    for _ in 0..100 {
        if cond(metrics.as_ref()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached: {:?}", metrics.snapshot());
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_defaults() {
    let config = UdpListenerConfig::default();

    assert_eq!(config.address, "0.0.0.0");
    assert_eq!(config.port, 8089);
    assert_eq!(config.read_timeout, Duration::from_secs(1));
    assert_eq!(config.max_datagram_size, 1024);
    assert_eq!(config.recv_buffer_size, 256 * 1024);
}

#[test]
fn test_config_bind_address() {
    let config = UdpListenerConfig {
        address: "127.0.0.1".into(),
        port: 9089,
        ..Default::default()
    };
    assert_eq!(config.bind_address(), "127.0.0.1:9089");
}

// =============================================================================
// Bind
// =============================================================================

#[tokio::test]
async fn test_bind_assigns_port() {
    let listener = UdpListener::bind(test_config()).unwrap();
    let addr = listener.local_addr();

    assert!(addr.ip().is_loopback());
    assert_ne!(addr.port(), 0);
}

#[tokio::test]
async fn test_bind_busy_port_fails() {
    let first = UdpListener::bind(test_config()).unwrap();
    let port = first.local_addr().port();

    let err = UdpListener::bind(UdpListenerConfig {
        port,
        ..test_config()
    })
    .unwrap_err();

    assert!(matches!(err, ListenerError::Bind { .. }));
    assert!(err.to_string().contains(&port.to_string()));
}

#[tokio::test]
async fn test_bind_invalid_address() {
    let config = UdpListenerConfig {
        address: "not-an-ip".into(),
        ..test_config()
    };

    let err = UdpListener::bind(config).unwrap_err();
    assert!(matches!(err, ListenerError::InvalidAddress { .. }));
    assert!(err.to_string().contains("not-an-ip"));
}

#[tokio::test]
async fn test_bind_rejects_small_buffer() {
    let config = UdpListenerConfig {
        max_datagram_size: 16,
        ..test_config()
    };

    let err = UdpListener::bind(config).unwrap_err();
    assert!(matches!(
        err,
        ListenerError::BufferTooSmall {
            size: 16,
            required: 32
        }
    ));
}

// =============================================================================
// Admission
// =============================================================================

#[tokio::test]
async fn test_admit_drops_when_full() {
    let (tx, rx) = crossfire::mpmc::bounded_async::<Bytes>(1);

    assert_eq!(admit(&tx, Bytes::from_static(b"first")), Admission::Admitted);
    assert_eq!(admit(&tx, Bytes::from_static(b"second")), Admission::Dropped);
    assert_eq!(admit(&tx, Bytes::from_static(b"third")), Admission::Dropped);

    // Only the admitted datagram is queued
    assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"first"));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_admit_reports_closed() {
    let (tx, rx) = crossfire::mpmc::bounded_async::<Bytes>(4);
    drop(rx);

    assert_eq!(admit(&tx, Bytes::from_static(b"late")), Admission::Closed);
}

// =============================================================================
// Receive loop
// =============================================================================

#[tokio::test]
async fn test_listener_forwards_datagrams() {
    let listener = UdpListener::bind(test_config()).unwrap();
    let addr = listener.local_addr();
    let metrics = listener.metrics();

    let (tx, rx) = crossfire::mpmc::bounded_async::<Bytes>(16);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(listener.run(tx, cancel.clone()));

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    for i in 0..3u8 {
        client.send_to(&[i; 32], addr).await.unwrap();
    }

    for i in 0..3u8 {
        let datagram = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timeout")
            .unwrap();
        assert_eq!(datagram.as_ref(), &[i; 32]);
    }

    cancel.cancel();
    let snapshot = timeout(Duration::from_secs(1), handle)
        .await
        .expect("listener did not stop")
        .unwrap();

    assert_eq!(snapshot.packets_received, 3);
    assert_eq!(snapshot.packets_admitted, 3);
    assert_eq!(snapshot.packets_dropped, 0);
    assert_eq!(snapshot.bytes_received, 96);
    assert_eq!(metrics.snapshot(), snapshot);
}

#[tokio::test]
async fn test_listener_copies_each_datagram() {
    let listener = UdpListener::bind(test_config()).unwrap();
    let addr = listener.local_addr();

    let (tx, rx) = crossfire::mpmc::bounded_async::<Bytes>(16);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(listener.run(tx, cancel.clone()));

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(&[0xAA; 32], addr).await.unwrap();
    client.send_to(&[0xBB; 32], addr).await.unwrap();

    let first = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    let second = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();

    // First buffer is not overwritten by the second receive
    assert_eq!(first.as_ref(), &[0xAA; 32]);
    assert_eq!(second.as_ref(), &[0xBB; 32]);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_listener_drops_when_decode_pool_saturated() {
    let listener = UdpListener::bind(test_config()).unwrap();
    let addr = listener.local_addr();
    let metrics = listener.metrics();

    // No consumer: after one datagram the queue is full for good
    let (tx, rx) = crossfire::mpmc::bounded_async::<Bytes>(1);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(listener.run(tx, cancel.clone()));

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    for i in 0..5u8 {
        client.send_to(&[i; 32], addr).await.unwrap();
        // Keep datagrams in order through the single receive loop
        wait_for(&metrics, |m| m.snapshot().packets_received == u64::from(i) + 1).await;
    }

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.packets_received, 5);
    assert_eq!(snapshot.packets_admitted, 1);
    assert_eq!(snapshot.packets_dropped, 4);

    // Dropped datagrams never reach the queue
    assert_eq!(rx.recv().await.unwrap().as_ref(), &[0u8; 32]);
    assert!(rx.try_recv().is_err());

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_listener_truncates_oversized_datagrams() {
    let config = UdpListenerConfig {
        max_datagram_size: 32,
        ..test_config()
    };
    let listener = UdpListener::bind(config).unwrap();
    let addr = listener.local_addr();

    let (tx, rx) = crossfire::mpmc::bounded_async::<Bytes>(4);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(listener.run(tx, cancel.clone()));

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(&[7u8; 48], addr).await.unwrap();

    let datagram = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert_eq!(datagram.len(), 32);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_listener_stops_on_cancel_when_idle() {
    let listener = UdpListener::bind(test_config()).unwrap();
    let (tx, rx) = crossfire::mpmc::bounded_async::<Bytes>(4);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(listener.run(tx, cancel.clone()));

    // Let a few read deadlines expire
    tokio::time::sleep(Duration::from_millis(120)).await;
    cancel.cancel();

    let snapshot = timeout(Duration::from_millis(500), handle)
        .await
        .expect("listener did not observe cancellation")
        .unwrap();
    assert_eq!(snapshot.packets_received, 0);

    // The sender was dropped with the listener
    assert!(rx.recv().await.is_err());
}

#[tokio::test]
async fn test_listener_stops_when_ingress_closed() {
    let listener = UdpListener::bind(test_config()).unwrap();
    let addr = listener.local_addr();

    let (tx, rx) = crossfire::mpmc::bounded_async::<Bytes>(4);
    drop(rx);

    let handle = tokio::spawn(listener.run(tx, CancellationToken::new()));

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(&[1u8; 32], addr).await.unwrap();

    let snapshot = timeout(Duration::from_secs(1), handle)
        .await
        .expect("listener kept running with no decode pool")
        .unwrap();
    assert_eq!(snapshot.packets_received, 1);
    assert_eq!(snapshot.packets_admitted, 0);
}
