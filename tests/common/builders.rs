//! Test data builders for creating scanline records

use chrono::{DateTime, TimeZone, Utc};
use laser_recon::{FrameId, ScanlineRecord, INVALID};

/// Builder for creating test scanline records
pub struct ScanlineBuilder {
    frame_id: FrameId,
    stamp: DateTime<Utc>,
    samples: Vec<f32>,
}

impl ScanlineBuilder {
    pub fn frame(n: u64) -> Self {
        Self {
            frame_id: FrameId::Frame(n),
            stamp: Utc.timestamp_opt(1_700_000_000 + n as i64, 0).unwrap(),
            samples: Vec::new(),
        }
    }

    pub fn end_of_stream() -> Self {
        Self {
            frame_id: FrameId::EndOfStream,
            ..Self::frame(0)
        }
    }

    pub fn stamp(mut self, stamp: DateTime<Utc>) -> Self {
        self.stamp = stamp;
        self
    }

    /// Append `n` columns of the same row value
    pub fn run(mut self, row: f32, n: usize) -> Self {
        self.samples.extend(std::iter::repeat(row).take(n));
        self
    }

    /// Append `n` columns without detection
    pub fn gap(mut self, n: usize) -> Self {
        self.samples.extend(std::iter::repeat(INVALID).take(n));
        self
    }

    pub fn samples(mut self, samples: &[f32]) -> Self {
        self.samples.extend_from_slice(samples);
        self
    }

    pub fn build(self) -> ScanlineRecord {
        ScanlineRecord::from_raw(self.frame_id, self.stamp, self.samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scanline_builder() {
        let rec = ScanlineBuilder::frame(3).run(10.0, 2).gap(1).run(11.0, 1).build();
        assert_eq!(rec.frame_id, FrameId::Frame(3));
        assert_eq!(rec.raw_samples(), &[10.0, 10.0, INVALID, 11.0]);
    }
}
