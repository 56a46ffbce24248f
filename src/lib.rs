//! # Sonify
//!
//! Plays time-stamped data feeds as an endlessly looping melody. Each data
//! point becomes one note: its value picks a pitch from the current scale and
//! the gap to the next point sets how long the note lasts.
//!
//! ## Modules
//!
//! - `audio`: tone engines (cpal synth, MIDI out, silent) and the playback
//!   runtime thread that owns the scheduler.
//! - `sources`: data sources, feed formats and the background poller.
//! - `config`: `sonify.toml` and persisted user preferences.
//! - `commands`: the prefix command registry behind the REPL.
//! - `repl`: the interactive shell.
//!
//! The pure scheduling logic lives in the `sonify-core` crate and is
//! re-exported here.

pub mod audio;
pub mod commands;
pub mod config;
pub mod repl;
pub mod sources;

// Re-export commonly used types for convenience
pub use crate::audio::{
    spawn_playback, spawn_playback_with, EngineKind, PlaybackEvent, PlaybackHandle, StartedPlayback,
};
pub use crate::config::{AppConfig, Preferences};
pub use crate::sources::{DataSource, FeedFormat, FileSource, SourceEvent};
pub use sonify_core::{DataPoint, Playback, Pitch, Scheduler, SchedulerSettings, SonifyError};
