//! Integration tests for the configuration, recording and replay path
//!
//! These tests validate:
//! - Config files on disk (save, load, rejection)
//! - Recordings written and read back as JSON lines
//! - A full replay through a configured worker

mod common;

use common::assert_float_eq;
use common::builders::ScanlineBuilder;
use laser_recon::session::{read_recording, CloudSummary, SessionPlayer, SessionRecorder};
use laser_recon::{
    filter_runs, FrameId, ReconConfig, ReconError, ReconstructionWorker, RunFilter, ScanlineRecord,
    INVALID,
};
use tempfile::TempDir;

#[test]
fn test_run_filter_reference_cases() {
    let x = INVALID;
    let input = [10.0, 10.0, 10.0, 10.0, x, 10.0, 10.0, 10.0, 10.0, 10.0];

    let mut s = input;
    filter_runs(&mut s, 2, 1, 0);
    assert_eq!(s, input);

    let mut s = input;
    filter_runs(&mut s, 3, 1, 0);
    assert_eq!(s, [x, x, x, x, x, 10.0, 10.0, 10.0, 10.0, 10.0]);

    let mut s = input;
    filter_runs(&mut s, 4, 1, 0);
    assert_eq!(s, [x; 10]);
}

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("recon.toml");

    let mut config = ReconConfig::default();
    config.prefilter = Some(RunFilter::with_length(2));
    config.calibration.homography_matrix = vec![2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0];
    config.save(&path).unwrap();

    let loaded = ReconConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_config_load_rejects_bad_homography() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[calibration]\nhomography_matrix = [1.0, 0.0, 0.0]\n").unwrap();

    let err = ReconConfig::load(&path).unwrap_err();
    assert!(err.is_fatal());

    let (tx, _rx) = crossbeam_channel::unbounded();
    let mut config = ReconConfig::default();
    config.calibration.camera_matrix.pop();
    let err = ReconstructionWorker::from_config(&config, tx).err().unwrap();
    assert!(matches!(err, ReconError::WithContext { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_missing_config_file() {
    assert!(ReconConfig::load("/nonexistent/recon.toml").is_err());
}

#[test]
fn test_recording_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scan.jsonl");

    let records = vec![
        ScanlineBuilder::frame(1).run(12.25, 3).gap(2).build(),
        ScanlineBuilder::end_of_stream().build(),
    ];
    let mut recorder = SessionRecorder::create(&path).unwrap();
    for r in &records {
        recorder.record(r).unwrap();
    }
    recorder.finish().unwrap();

    assert_eq!(read_recording(&path).unwrap(), records);
}

#[test]
fn test_replay_through_configured_worker() {
    let dir = TempDir::new().unwrap();
    let mut config = ReconConfig::default();
    // y' = 0.5 * row, z' = 0.1 * column + 3
    config.calibration.homography_matrix = vec![0.5, 0.0, 0.0, 0.0, 0.1, 3.0, 0.0, 0.0, 1.0];
    config.prefilter = Some(RunFilter::with_length(0));

    let input = dir.path().join("scan.jsonl");
    let mut recorder = SessionRecorder::create(&input).unwrap();
    recorder
        .record(&ScanlineBuilder::frame(7).samples(&[20.0, INVALID, 40.0, 42.0]).build())
        .unwrap();
    recorder.record(&ScanlineBuilder::end_of_stream().build()).unwrap();
    recorder.finish().unwrap();

    let (tx, rx) = crossbeam_channel::unbounded();
    let (worker, producer) = ReconstructionWorker::from_config(&config, tx).unwrap();
    let handle = worker.start().unwrap();
    for record in read_recording(&input).unwrap() {
        producer.push(record).unwrap();
    }
    drop(producer);
    handle.join().unwrap();

    let output = dir.path().join("clouds.jsonl");
    let mut dump = SessionRecorder::create(&output).unwrap();
    for cloud in rx.try_iter() {
        dump.record(&CloudSummary::from_cloud(&cloud).unwrap()).unwrap();
    }
    dump.finish().unwrap();

    let summaries: Vec<CloudSummary> = SessionPlayer::open(&output)
        .unwrap()
        .collect::<laser_recon::Result<_>>()
        .unwrap();
    assert_eq!(summaries.len(), 2);

    // The lone sample at column 0 is a run of one and is filtered out
    let frame = &summaries[0];
    assert_eq!(frame.frame_id, FrameId::Frame(7));
    assert_eq!(frame.points.len(), 2);
    assert_float_eq(frame.points[0].y as f64, 20.0, 1e-5);
    assert_float_eq(frame.points[0].z as f64, 3.2, 1e-5);
    assert_float_eq(frame.points[1].y as f64, 21.0, 1e-5);
    assert_float_eq(frame.points[1].z as f64, 3.3, 1e-5);

    assert!(summaries[1].is_boundary());
}

#[test]
fn test_recording_json_shape() {
    let line = r#"{"frame_id":"-1","stamp":"2024-05-01T08:30:00Z","center":[]}"#;
    let record: ScanlineRecord = serde_json::from_str(line).unwrap();
    assert!(record.is_end_of_stream());
}
