//! Error handling for laser-recon
//!
//! This module defines the error taxonomy of the reconstruction core and a
//! Result alias for use throughout the crate.
//!
//! Only [`ReconError::Configuration`] is fatal: it is raised while building a
//! worker and prevents it from starting. Everything else is absorbed by the
//! worker loop (logged, the sample or emission skipped).

use thiserror::Error;

/// Main error type for laser-recon operations
#[derive(Error, Debug)]
pub enum ReconError {
    /// Calibration or worker configuration is unusable
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A single sample could not be mapped through the calibration
    #[error("Transform failed at column {column}: {message}")]
    Transform { column: usize, message: String },

    /// The record queue rejected or evicted a record
    #[error("Queue overflow: {dropped} record(s) dropped")]
    QueueOverflow { dropped: u64 },

    /// Encoded buffer does not match its own layout description
    #[error("Encoding invariant violated: {0}")]
    EncodingInvariant(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ReconError>,
    },
}

impl ReconError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ReconError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error must stop the worker from starting
    pub fn is_fatal(&self) -> bool {
        match self {
            ReconError::Configuration(_) => true,
            ReconError::WithContext { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ReconError {
    fn from(err: serde_json::Error) -> Self {
        ReconError::Serialization(err.to_string())
    }
}

/// Result type alias for laser-recon operations
pub type Result<T> = std::result::Result<T, ReconError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
