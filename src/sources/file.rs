use super::{DataSource, FeedFormat, SourceError};
use sonify_core::DataPoint;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A feed stored on disk, optionally re-read on an interval
#[derive(Debug, Clone)]
pub struct FileSource {
    name: String,
    path: PathBuf,
    format: FeedFormat,
    interval: Option<Duration>,
}

impl FileSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, format: FeedFormat) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            format,
            interval: None,
        }
    }

    /// Named after the file itself
    pub fn from_path(path: impl Into<PathBuf>, format: FeedFormat) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(name, path, format)
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> FeedFormat {
        self.format
    }
}

impl DataSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> Result<Vec<DataPoint>, SourceError> {
        let text = fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.format.parse(&text)
    }

    fn poll_interval(&self) -> Option<Duration> {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_points_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"title": "x", "value": 2, "start": 0, "end": 1}}]"#).unwrap();

        let source = FileSource::new("demo", file.path(), FeedFormat::Points);
        let points = source.fetch().unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(source.name(), "demo");
        assert_eq!(source.poll_interval(), None);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let source = FileSource::from_path("/definitely/not/here.json", FeedFormat::Points);
        assert_eq!(source.name(), "here.json");
        assert!(matches!(source.fetch(), Err(SourceError::Io { .. })));
    }
}
