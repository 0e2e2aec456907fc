//! Per-record reconstruction, independent of threads and queues.

use super::stats::StatsCounters;
use crate::calibration::CalibrationTransform;
use crate::cloud::{self, CloudHeader, PointCloudBuffer};
use crate::error::ResultExt;
use crate::filter::RunFilter;
use crate::types::{Point3D, ScanlineRecord};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Turns one scanline record into at most one cloud
pub struct Reconstructor {
    transform: CalibrationTransform,
    prefilter: Option<RunFilter>,
    stats: Arc<StatsCounters>,
}

impl Reconstructor {
    pub fn new(transform: CalibrationTransform, prefilter: Option<RunFilter>) -> Self {
        Self::with_counters(transform, prefilter, Arc::new(StatsCounters::default()))
    }

    pub(crate) fn with_counters(
        transform: CalibrationTransform,
        prefilter: Option<RunFilter>,
        stats: Arc<StatsCounters>,
    ) -> Self {
        Self {
            transform,
            prefilter,
            stats,
        }
    }

    /// Process a record.
    ///
    /// - end-of-stream marker: a zero-point boundary cloud;
    /// - no sample survives: `None`;
    /// - otherwise the encoded cloud of every transformed sample, in column order.
    pub fn process(&self, mut record: ScanlineRecord) -> Option<PointCloudBuffer> {
        StatsCounters::bump(&self.stats.records_processed, 1);
        let header = CloudHeader::new(record.frame_id, record.stamp);

        if record.is_end_of_stream() {
            debug!(stamp = %record.stamp, "End of scan segment");
            StatsCounters::bump(&self.stats.boundaries_emitted, 1);
            return Some(PointCloudBuffer::boundary(header));
        }

        if let Some(filter) = &self.prefilter {
            let removed = filter.apply(record.raw_samples_mut());
            StatsCounters::bump(&self.stats.samples_prefiltered, removed as u64);
        }

        let mut points: Vec<Point3D> = Vec::with_capacity(record.valid_count());
        for (column, sample) in record.iter() {
            let Some(row) = sample else { continue };
            match self.transform.apply(column, row) {
                Ok(p) => points.push(p),
                Err(e) => {
                    warn!(frame = %record.frame_id, "Dropping sample: {}", e);
                    StatsCounters::bump(&self.stats.samples_dropped, 1);
                }
            }
        }

        if points.is_empty() {
            StatsCounters::bump(&self.stats.silent_records, 1);
            return None;
        }

        match cloud::encode(header, &points).with_context(|| format!("Encoding frame {}", record.frame_id)) {
            Ok(cloud) => {
                StatsCounters::bump(&self.stats.clouds_emitted, 1);
                Some(cloud)
            }
            Err(e) => {
                error!("{}", e);
                StatsCounters::bump(&self.stats.silent_records, 1);
                None
            }
        }
    }

    pub fn transform(&self) -> &CalibrationTransform {
        &self.transform
    }

    pub fn prefilter(&self) -> Option<&RunFilter> {
        self.prefilter.as_ref()
    }
}
