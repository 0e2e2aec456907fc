//! Run-length noise filter.
//!
//! A *run* is a maximal span of non-[`INVALID`] samples. Short runs are
//! almost always reflections or speckle rather than the laser line, so the
//! filter overwrites every run that is too short with [`INVALID`].
//!
//! # Threshold
//!
//! A run is removed when its length is **`<= length + 1`**. The `+1` is the
//! threshold of the deployed filter and is kept as is: `length = 2` removes
//! runs of up to three samples.
//!
//! # Hot path
//!
//! [`filter_runs`] runs once per scanline. It is a single left-to-right pass
//! with constant state and no allocation; the same scanner backs the
//! read-only [`runs`] iterator so both always agree on run boundaries.
//!
//! The [`line`] submodule applies the same primitive to an already encoded
//! point cloud (the downstream post-pass).

pub mod line;

pub use line::{CloudField, LineFilter};

use crate::types::{is_invalid, INVALID};
use serde::{Deserialize, Serialize};

/// Default run length parameter (removes runs of four samples or fewer)
pub const DEFAULT_RUN_LENGTH: usize = 3;

/// A maximal span of valid samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// Index of the first valid sample
    pub start: usize,
    /// Index of the last valid sample (inclusive)
    pub end: usize,
    /// Number of valid samples in the run
    pub len: usize,
}

/// Incremental run scanner.
///
/// Holds only the scan position, so the caller may mutate the buffer between
/// calls to [`RunScanner::next_run`].
#[derive(Debug, Clone, Copy)]
struct RunScanner {
    pos: usize,
    stride: usize,
    gap_tolerance: usize,
}

impl RunScanner {
    fn new(stride: usize, gap_tolerance: usize) -> Self {
        Self {
            pos: 0,
            stride: stride.max(1),
            gap_tolerance,
        }
    }

    fn next_run(&mut self, samples: &[f32]) -> Option<Run> {
        let mut start = None;
        let mut end = 0;
        let mut len = 0;
        let mut gap = 0;

        while self.pos < samples.len() {
            let i = self.pos;
            self.pos = i.saturating_add(self.stride);

            if is_invalid(samples[i]) {
                if start.is_some() {
                    gap += 1;
                    if gap > self.gap_tolerance {
                        break;
                    }
                }
            } else {
                if start.is_none() {
                    start = Some(i);
                }
                end = i;
                len += 1;
                gap = 0;
            }
        }

        start.map(|start| Run { start, end, len })
    }
}

/// Iterator over the runs of a sample buffer
pub struct Runs<'a> {
    samples: &'a [f32],
    scanner: RunScanner,
}

impl Iterator for Runs<'_> {
    type Item = Run;

    fn next(&mut self) -> Option<Run> {
        self.scanner.next_run(self.samples)
    }
}

/// Enumerate runs over positions `0, stride, 2*stride, ...`
///
/// Up to `gap_tolerance` consecutive invalid samples are bridged inside one
/// run; `gap_tolerance = 0` splits on every invalid sample.
pub fn runs(samples: &[f32], stride: usize, gap_tolerance: usize) -> Runs<'_> {
    Runs {
        samples,
        scanner: RunScanner::new(stride, gap_tolerance),
    }
}

/// Overwrite every run of length `<= length + 1` with [`INVALID`], in place.
///
/// Only positions `0, stride, 2*stride, ...` are examined; to filter one
/// column of a row-major image pass `&mut buf[col..]` with `stride = width`.
/// A `stride` of zero is treated as one. Runs touching either end of the
/// buffer are treated like interior runs.
///
/// `gap_tolerance` counts the invalid samples bridged inside a run. The
/// deployed `filter_length(p, n, 1, 1, len)` call splits on every single
/// invalid sample, which is `gap_tolerance = 0` here; passing `1` would
/// bridge one-sample gaps.
///
/// Returns the number of valid samples that were invalidated.
pub fn filter_runs(samples: &mut [f32], length: usize, stride: usize, gap_tolerance: usize) -> usize {
    let threshold = length.saturating_add(1);
    let mut scanner = RunScanner::new(stride, gap_tolerance);
    let mut removed = 0;

    while let Some(run) = scanner.next_run(samples) {
        if run.len <= threshold {
            for i in (run.start..=run.end).step_by(scanner.stride) {
                samples[i] = INVALID;
            }
            removed += run.len;
        }
    }

    removed
}

/// Run filter parameters, shared by the reconstruction pre-pass and the
/// cloud post-pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunFilter {
    /// Runs of `length + 1` samples or fewer are removed
    pub length: usize,
    /// Distance between examined samples
    pub stride: usize,
    /// Consecutive invalid samples bridged inside one run
    pub gap_tolerance: usize,
}

impl Default for RunFilter {
    fn default() -> Self {
        Self {
            length: DEFAULT_RUN_LENGTH,
            stride: 1,
            gap_tolerance: 0,
        }
    }
}

impl RunFilter {
    /// Create a filter with the given length and default stride/gap
    pub fn with_length(length: usize) -> Self {
        Self {
            length,
            ..Self::default()
        }
    }

    /// Filter `samples` in place, returning how many samples were removed
    #[inline]
    pub fn apply(&self, samples: &mut [f32]) -> usize {
        filter_runs(samples, self.length, self.stride, self.gap_tolerance)
    }

    /// Longest run that this filter removes
    pub fn max_removed_len(&self) -> usize {
        self.length.saturating_add(1)
    }
}
