//! laser-recon - Recording Replay Tool
//!
//! Replays a JSON-lines scanline recording through the reconstruction
//! worker and writes the emitted clouds as a JSON-lines dump.

use anyhow::Context;
use clap::Parser;
use laser_recon::{
    session::{read_recording, CloudSummary, SessionRecorder},
    worker::LineFilterSink,
    OverflowPolicy, PointCloudBuffer, ReconConfig, ReconstructionWorker,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "laser-recon", version, about = "Replay laser scanline recordings into point clouds")]
struct Args {
    /// TOML configuration (identity calibration when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scanline recording, one JSON record per line
    #[arg(short, long)]
    input: PathBuf,

    /// Cloud dump to write, one JSON cloud per line
    #[arg(short, long)]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,laser_recon=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("Loading config from {:?}", path);
            ReconConfig::load(path)?
        }
        None => ReconConfig::default(),
    };

    let records = read_recording(&args.input)
        .with_context(|| format!("Failed to read recording {:?}", args.input))?;
    tracing::info!("Replaying {} records", records.len());

    // A replay must not lose records to a full queue
    config.queue.overflow = OverflowPolicy::Block;

    let (cloud_tx, cloud_rx) = crossbeam_channel::unbounded::<PointCloudBuffer>();
    let sink = LineFilterSink::optional(config.line_filter, cloud_tx);
    let (worker, producer) = ReconstructionWorker::from_config(&config, sink)?;
    let handle = worker.start()?;

    for record in records {
        producer.push(record)?;
    }
    // Closing the queue lets the worker drain and exit
    drop(producer);

    let mut dump = SessionRecorder::create(&args.output)?;
    for cloud in cloud_rx.iter() {
        dump.record(&CloudSummary::from_cloud(&cloud)?)?;
    }
    dump.flush()?;

    let stats = handle.join()?;
    tracing::info!(
        records = stats.records_processed,
        clouds = stats.clouds_emitted,
        boundaries = stats.boundaries_emitted,
        silent = stats.silent_records,
        dropped_samples = stats.samples_dropped,
        overflowed = stats.records_overflowed,
        "Replay finished, wrote {} clouds to {:?}",
        dump.len(),
        args.output
    );

    Ok(())
}
