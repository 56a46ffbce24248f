use super::{DataSource, FeedFormat, FileSource, SourceError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// One `[[sources]]` entry in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub format: FeedFormat,
    /// Re-read period in seconds; omitted or zero reads once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
}

impl SourceConfig {
    fn build(&self) -> FileSource {
        let source = FileSource::new(&self.name, &self.path, self.format);
        match self.interval_secs {
            Some(secs) if secs > 0 => source.with_interval(Duration::from_secs(secs)),
            _ => source,
        }
    }
}

/// Named sources in configuration order
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<SourceConfig>,
}

impl SourceRegistry {
    pub fn new(sources: Vec<SourceConfig>) -> Self {
        Self { sources }
    }

    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// The first configured source
    pub fn default_name(&self) -> Option<&str> {
        self.sources.first().map(|s| s.name.as_str())
    }

    /// `preferred` when it names a known source, else the default
    pub fn select<'a>(&'a self, preferred: Option<&'a str>) -> Option<&'a str> {
        preferred
            .filter(|name| self.contains(name))
            .or_else(|| self.default_name())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.iter().any(|s| s.name == name)
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn DataSource>, SourceError> {
        self.sources
            .iter()
            .find(|s| s.name == name)
            .map(|s| Arc::new(s.build()) as Arc<dyn DataSource>)
            .ok_or_else(|| SourceError::UnknownSource(name.to_string()))
    }
}
