//! Integration tests for the reconstruction worker lifecycle
//!
//! These tests validate the threaded worker end to end:
//! - FIFO emission and header propagation
//! - End-of-stream and all-invalid records
//! - Shutdown while idle, with a backlog, and by dropping producers

mod common;

use common::builders::ScanlineBuilder;
use common::{recv_clouds, test_timeout};
use laser_recon::worker::LineFilterSink;
use laser_recon::{
    FrameId, LineFilter, OverflowPolicy, PointCloudBuffer, QueueConfig, ReconConfig,
    ReconstructionWorker, RunFilter, WorkerState,
};
use std::thread;
use std::time::Duration;

fn channel_worker() -> (
    ReconstructionWorker<crossbeam_channel::Sender<PointCloudBuffer>>,
    laser_recon::ScanlineProducer,
    crossbeam_channel::Receiver<PointCloudBuffer>,
) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let (worker, producer) = ReconstructionWorker::identity(tx).unwrap();
    (worker, producer, rx)
}

#[test]
fn test_fifo_emission_order() {
    let (worker, producer, rx) = channel_worker();
    let handle = worker.start().unwrap();

    for n in 1..=3 {
        producer
            .push(ScanlineBuilder::frame(n).run(n as f32, 5).build())
            .unwrap();
    }

    let ids: Vec<FrameId> = recv_clouds(&rx, 3).iter().map(|c| c.header.frame_id).collect();
    assert_eq!(ids, [FrameId::Frame(1), FrameId::Frame(2), FrameId::Frame(3)]);

    handle.stop();
    let stats = handle.join().unwrap();
    assert_eq!(stats.clouds_emitted, 3);
    assert_eq!(stats.records_received, 3);
}

#[test]
fn test_end_marker_and_silent_record() {
    let (worker, producer, rx) = channel_worker();
    let handle = worker.start().unwrap();

    let marker = ScanlineBuilder::end_of_stream().build();
    let stamp = marker.stamp;

    producer.push(ScanlineBuilder::frame(1).gap(8).build()).unwrap();
    producer.push(marker).unwrap();
    producer.push(ScanlineBuilder::frame(2).run(4.0, 2).build()).unwrap();

    // The all-invalid frame produces nothing, so the boundary comes first
    let clouds = recv_clouds(&rx, 2);
    assert!(clouds[0].is_empty());
    assert_eq!(clouds[0].header.frame_id, FrameId::EndOfStream);
    assert_eq!(clouds[0].header.stamp, stamp);
    assert_eq!(clouds[1].header.frame_id, FrameId::Frame(2));
    assert_eq!(clouds[1].len(), 2);

    handle.stop();
    let stats = handle.join().unwrap();
    assert_eq!(stats.silent_records, 1);
    assert_eq!(stats.boundaries_emitted, 1);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_stop_wakes_idle_worker() {
    let (worker, _producer, _rx) = channel_worker();
    let handle = worker.start().unwrap();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(handle.state(), WorkerState::Idle);

    handle.stop();
    let start = std::time::Instant::now();
    handle.join().unwrap();
    assert!(start.elapsed() < test_timeout());
}

#[test]
fn test_dropping_producer_drains_and_exits() {
    let (worker, producer, rx) = channel_worker();

    // Queue everything before the worker starts so nothing races the drop
    for n in 0..10 {
        producer
            .push(ScanlineBuilder::frame(n).run(1.0, 3).build())
            .unwrap();
    }
    drop(producer);

    let handle = worker.start().unwrap();
    let stats = handle.join().unwrap();

    assert_eq!(stats.records_processed, 10);
    assert_eq!(stats.records_discarded, 0);
    assert_eq!(rx.try_iter().count(), 10);
}

#[test]
fn test_push_after_stop_fails() {
    let (worker, producer, _rx) = channel_worker();
    let handle = worker.start().unwrap();
    handle.stop();
    handle.join().unwrap();

    assert!(producer
        .push(ScanlineBuilder::frame(1).run(1.0, 1).build())
        .is_err());
}

#[test]
fn test_drop_oldest_counts_overflow() {
    let (tx, _rx) = crossbeam_channel::unbounded();
    let mut config = ReconConfig::default();
    config.queue = QueueConfig {
        capacity: 2,
        overflow: OverflowPolicy::DropOldest,
    };
    let (mut worker, producer) = ReconstructionWorker::from_config(&config, tx).unwrap();

    for n in 0..5 {
        producer
            .push(ScanlineBuilder::frame(n).run(1.0, 1).build())
            .unwrap();
    }
    while worker.drive_once() {}

    let stats = worker.stats();
    assert_eq!(stats.records_overflowed, 3);
    assert_eq!(stats.records_processed, 2);
}

#[test]
fn test_worker_with_line_filter_sink() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let sink = LineFilterSink::new(LineFilter::new(RunFilter::with_length(1), Default::default()), tx);
    let (worker, producer) = ReconstructionWorker::identity(sink).unwrap();
    let handle = worker.start().unwrap();

    // With identity calibration z is the column index, never the sentinel
    producer
        .push(ScanlineBuilder::frame(1).run(3.0, 6).build())
        .unwrap();
    producer.push(ScanlineBuilder::end_of_stream().build()).unwrap();

    let clouds = recv_clouds(&rx, 2);
    assert_eq!(clouds[0].len(), 6);
    assert!(clouds[1].is_empty());

    handle.stop();
    handle.join().unwrap();
}
