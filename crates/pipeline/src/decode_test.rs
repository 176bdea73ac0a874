//! Tests for the decode pool

use std::time::Duration;

use downlink_protocol::{DecodeError, encode};

use super::*;
use crate::test_util::record;

async fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("decode worker did not stop")
            .unwrap();
    }
}

#[test]
fn test_pool_defaults() {
    assert_eq!(DecodePool::default().workers(), 10);
    assert_eq!(DecodePool::new(0).workers(), 1);
}

#[tokio::test]
async fn test_decodes_and_reports_errors() {
    let (ingress_tx, ingress_rx) = crossfire::mpmc::bounded_async::<Bytes>(16);
    let (validate_tx, validate_rx) = crossfire::mpmc::bounded_async::<TelemetryRecord>(16);
    let (error_tx, error_rx) = crossfire::mpsc::bounded_async::<PipelineError>(16);
    let metrics = Arc::new(PipelineMetrics::new());
    let cancel = CancellationToken::new();

    let handles = DecodePool::new(3).spawn(
        ingress_rx,
        validate_tx,
        error_tx,
        Arc::clone(&metrics),
        cancel.clone(),
    );

    for i in 0..4 {
        let packet = encode(&record(i));
        ingress_tx.send(Bytes::copy_from_slice(&packet)).await.unwrap();
    }
    ingress_tx.send(Bytes::from_static(&[0u8; 7])).await.unwrap();

    // Close ingress; workers drain and exit
    drop(ingress_tx);
    join_all(handles).await;

    let mut sequences = Vec::new();
    while let Ok(record) = validate_rx.try_recv() {
        assert!(record.anomaly_flags.is_empty());
        sequences.push(record.primary.sequence_count());
    }
    sequences.sort_unstable();
    assert_eq!(sequences, vec![0, 1, 2, 3]);

    let err = error_rx.try_recv().expect("decode error not reported");
    assert!(matches!(
        err,
        PipelineError::Decode(DecodeError::HeaderParse {
            expected: 32,
            actual: 7
        })
    ));
    assert!(error_rx.try_recv().is_err());

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.records_decoded, 4);
    assert_eq!(snapshot.decode_errors, 1);
}

#[tokio::test]
async fn test_length_mismatch_is_discarded() {
    let (ingress_tx, ingress_rx) = crossfire::mpmc::bounded_async::<Bytes>(4);
    let (validate_tx, validate_rx) = crossfire::mpmc::bounded_async::<TelemetryRecord>(4);
    let (error_tx, error_rx) = crossfire::mpsc::bounded_async::<PipelineError>(4);
    let metrics = Arc::new(PipelineMetrics::new());

    let handles = DecodePool::new(1).spawn(
        ingress_rx,
        validate_tx,
        error_tx,
        Arc::clone(&metrics),
        CancellationToken::new(),
    );

    let mut packet = encode(&record(1));
    packet[5] = 26;
    ingress_tx.send(Bytes::copy_from_slice(&packet)).await.unwrap();
    drop(ingress_tx);
    join_all(handles).await;

    assert!(validate_rx.try_recv().is_err());
    assert!(matches!(
        error_rx.try_recv(),
        Ok(PipelineError::Decode(DecodeError::LengthMismatch {
            expected: 25,
            actual: 26
        }))
    ));
}

#[tokio::test]
async fn test_workers_stop_on_cancellation() {
    let (ingress_tx, ingress_rx) = crossfire::mpmc::bounded_async::<Bytes>(4);
    let (validate_tx, _validate_rx) = crossfire::mpmc::bounded_async::<TelemetryRecord>(4);
    let (error_tx, _error_rx) = crossfire::mpsc::bounded_async::<PipelineError>(4);
    let cancel = CancellationToken::new();

    let handles = DecodePool::new(4).spawn(
        ingress_rx,
        validate_tx,
        error_tx,
        Arc::new(PipelineMetrics::new()),
        cancel.clone(),
    );

    cancel.cancel();
    join_all(handles).await;

    // Ingress is still open; only cancellation stopped the workers
    drop(ingress_tx);
}

#[tokio::test]
async fn test_workers_stop_when_validate_queue_closes() {
    let (ingress_tx, ingress_rx) = crossfire::mpmc::bounded_async::<Bytes>(4);
    let (validate_tx, validate_rx) = crossfire::mpmc::bounded_async::<TelemetryRecord>(1);
    let (error_tx, _error_rx) = crossfire::mpsc::bounded_async::<PipelineError>(4);

    let handles = DecodePool::new(1).spawn(
        ingress_rx,
        validate_tx,
        error_tx,
        Arc::new(PipelineMetrics::new()),
        CancellationToken::new(),
    );

    drop(validate_rx);
    let packet = encode(&record(1));
    ingress_tx.send(Bytes::copy_from_slice(&packet)).await.unwrap();

    join_all(handles).await;
}

#[tokio::test]
async fn test_listener_sheds_while_decode_worker_blocked() {
    use downlink_sources::{UdpListener, UdpListenerConfig};
    use tokio::net::UdpSocket;

    use crate::orchestrator::DEFAULT_INGRESS_QUEUE_SIZE;
    use crate::test_util::wait_for;

    let listener = UdpListener::bind(UdpListenerConfig {
        read_timeout: Duration::from_millis(50),
        ..UdpListenerConfig::loopback()
    })
    .unwrap();
    let addr = listener.local_addr();
    let listener_metrics = listener.metrics();

    let (ingress_tx, ingress_rx) =
        crossfire::mpmc::bounded_async::<Bytes>(DEFAULT_INGRESS_QUEUE_SIZE);
    // Validate queue is never drained
    let (validate_tx, validate_rx) = crossfire::mpmc::bounded_async::<TelemetryRecord>(1);
    let (error_tx, _error_rx) = crossfire::mpsc::bounded_async::<PipelineError>(4);
    let metrics = Arc::new(PipelineMetrics::new());
    let cancel = CancellationToken::new();

    let handles = DecodePool::new(1).spawn(
        ingress_rx,
        validate_tx,
        error_tx,
        Arc::clone(&metrics),
        cancel.clone(),
    );
    let listener_task = tokio::spawn(listener.run(ingress_tx, cancel.clone()));

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let send = |seq: u16| {
        let client = &client;
        async move {
            client.send_to(&encode(&record(seq)), addr).await.unwrap();
        }
    };

    // First record fills the validate queue, the second is held by the worker
    for seq in 1..=2u16 {
        send(seq).await;
        assert!(
            wait_for(Duration::from_secs(1), || {
                metrics.snapshot().records_decoded == u64::from(seq)
            })
            .await
        );
    }

    // Worker is blocked: one datagram takes the ingress slot, the rest are shed
    for seq in 3..=10u16 {
        send(seq).await;
        assert!(
            wait_for(Duration::from_secs(1), || {
                listener_metrics.snapshot().packets_received == u64::from(seq)
            })
            .await
        );
    }

    let snapshot = listener_metrics.snapshot();
    assert_eq!(snapshot.packets_admitted, 3);
    assert_eq!(snapshot.packets_dropped, 7);
    assert_eq!(metrics.snapshot().records_decoded, 2);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), listener_task)
        .await
        .expect("listener did not stop")
        .unwrap();

    // Releases the worker blocked on the validate hand-off
    drop(validate_rx);
    join_all(handles).await;
}
