//! Data sources feeding the playlist
//!
//! A [`DataSource`] produces data points on demand. Sources are polled from a
//! background [`DataPoller`] that reports progress as [`SourceEvent`]s.

pub mod feeds;
pub mod file;
pub mod poller;
pub mod registry;

pub use feeds::FeedFormat;
pub use file::FileSource;
pub use poller::DataPoller;
pub use registry::{SourceConfig, SourceRegistry};

use sonify_core::{DataPoint, SonifyError};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {format} feed: {message}")]
    Parse { format: FeedFormat, message: String },

    #[error("unknown source '{0}'")]
    UnknownSource(String),
}

impl From<SourceError> for SonifyError {
    fn from(err: SourceError) -> Self {
        SonifyError::DataUnavailable(err.to_string())
    }
}

/// Something that can be asked for a fresh set of points
pub trait DataSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch(&self) -> Result<Vec<DataPoint>, SourceError>;

    /// Re-fetch period; `None` fetches once
    fn poll_interval(&self) -> Option<Duration> {
        None
    }
}

/// Progress reports from a poller, tagged with the source name
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Loading { source: String },
    Loaded { source: String, points: Vec<DataPoint> },
    /// Fetch failed; playback keeps its current playlist
    Failed { source: String, error: SonifyError },
}

impl SourceEvent {
    pub fn source(&self) -> &str {
        match self {
            SourceEvent::Loading { source }
            | SourceEvent::Loaded { source, .. }
            | SourceEvent::Failed { source, .. } => source,
        }
    }
}
