//! Cloud sinks: where the worker delivers encoded clouds.

use crate::cloud::PointCloudBuffer;
use crate::error::{ReconError, Result};
use crate::filter::LineFilter;
use crossbeam_channel::Sender;

/// Destination for emitted clouds.
///
/// A failing sink never stops the worker; the error is logged and counted.
#[cfg_attr(test, mockall::automock)]
pub trait CloudSink {
    fn publish(&mut self, cloud: PointCloudBuffer) -> Result<()>;
}

impl CloudSink for Sender<PointCloudBuffer> {
    fn publish(&mut self, cloud: PointCloudBuffer) -> Result<()> {
        self.send(cloud)
            .map_err(|_| ReconError::Channel("cloud receiver disconnected".to_string()))
    }
}

impl CloudSink for Vec<PointCloudBuffer> {
    fn publish(&mut self, cloud: PointCloudBuffer) -> Result<()> {
        self.push(cloud);
        Ok(())
    }
}

/// Sink adapter that runs the [`LineFilter`] post-pass before forwarding
pub struct LineFilterSink<S> {
    filter: Option<LineFilter>,
    inner: S,
}

impl<S: CloudSink> LineFilterSink<S> {
    pub fn new(filter: LineFilter, inner: S) -> Self {
        Self {
            filter: Some(filter),
            inner,
        }
    }

    /// Forward every cloud unchanged
    pub fn passthrough(inner: S) -> Self {
        Self {
            filter: None,
            inner,
        }
    }

    /// Filter only when `filter` is set
    pub fn optional(filter: Option<LineFilter>, inner: S) -> Self {
        Self { filter, inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: CloudSink> CloudSink for LineFilterSink<S> {
    fn publish(&mut self, cloud: PointCloudBuffer) -> Result<()> {
        let Some(filter) = &self.filter else {
            return self.inner.publish(cloud);
        };
        match filter.apply(cloud)? {
            Some(filtered) => self.inner.publish(filtered),
            None => Ok(()),
        }
    }
}
