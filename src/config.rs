//! Application config (`sonify.toml`) and persisted user preferences

use crate::audio::EngineKind;
use crate::sources::SourceConfig;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sonify_core::{SchedulerSettings, ScorePolicy};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const CONFIG_FILE: &str = "sonify.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Seconds per note at speed 1.0
    #[serde(default = "PlaybackConfig::default_base_note_secs")]
    pub base_note_secs: f64,
    #[serde(default)]
    pub policy: ScorePolicy,
}

impl PlaybackConfig {
    fn default_base_note_secs() -> f64 {
        2.0
    }

    pub fn base_note_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.base_note_secs)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| {
                warn!(secs = self.base_note_secs, "invalid base note duration, using default");
                Duration::from_secs_f64(Self::default_base_note_secs())
            })
    }

    /// Reject score policies that would compress a playlist into no time at all
    pub fn validate(&self) -> Result<()> {
        match self.policy {
            ScorePolicy::Tempo { notes_per_score } => {
                if !(notes_per_score.is_finite() && notes_per_score > 0.0) {
                    bail!("notes_per_score must be a positive number, got {}", notes_per_score);
                }
            }
            ScorePolicy::Fixed {
                per_point,
                min_note,
                max_note,
            } => {
                if !(per_point.is_finite() && per_point > 0.0) {
                    bail!("per_point must be a positive number, got {}", per_point);
                }
                if !(min_note.is_finite() && min_note >= 0.0) {
                    bail!("min_note must be zero or more, got {}", min_note);
                }
                if !(max_note.is_finite() && max_note >= min_note) {
                    bail!("max_note must be at least min_note, got {}", max_note);
                }
            }
        }
        Ok(())
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            base_note_secs: Self::default_base_note_secs(),
            policy: ScorePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub engine: EngineKind,
    /// Substring of the MIDI port name; empty picks the first port
    #[serde(default)]
    pub midi_port: String,
    #[serde(default = "OutputConfig::default_gain")]
    pub gain: f32,
}

impl OutputConfig {
    fn default_gain() -> f32 {
        0.5
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            midi_port: String::new(),
            gain: Self::default_gain(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl AppConfig {
    /// Load `path`, or `sonify.toml` in the working directory when none is given.
    ///
    /// An explicit path must exist; a missing default file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(CONFIG_FILE), false),
        };
        if !required && !path.exists() {
            debug!("no {} found, using defaults", CONFIG_FILE);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(contents)?;
        cfg.playback.validate().context("Invalid [playback.policy]")?;
        Ok(cfg)
    }

    /// Scheduler settings with the user's saved choices applied
    pub fn scheduler_settings(&self, prefs: &Preferences) -> SchedulerSettings {
        SchedulerSettings {
            base_note_duration: self.playback.base_note_duration(),
            speed: prefs.speed,
            policy: self.playback.policy,
            tonic: prefs.tonic.clone(),
            scale: prefs.scale.clone(),
        }
    }
}

/// Choices remembered between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub tonic: String,
    pub scale: String,
    pub speed: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            tonic: "C".to_string(),
            scale: "major".to_string(),
            speed: 1.0,
            source: None,
        }
    }
}

impl Preferences {
    /// `<config dir>/sonify/preferences.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sonify").join("preferences.toml"))
    }

    /// Missing or unreadable files fall back to defaults
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        let loaded = fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|text| Ok(toml::from_str::<Preferences>(&text)?));
        match loaded {
            Ok(prefs) => prefs.sanitized(),
            Err(e) => {
                warn!(path = %path.display(), "ignoring corrupt preferences: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
    }

    fn sanitized(mut self) -> Self {
        if !(self.speed.is_finite() && self.speed > 0.0) {
            warn!(speed = self.speed, "saved speed out of range, using 1.0");
            self.speed = 1.0;
        }
        self
    }
}
