//! # Sonify Core
//!
//! IO-free core of the sonifier: turns a playlist of time-stamped, valued
//! data points into pitched notes and drives a self-rescheduling playback
//! loop. Audio output and data fetching live behind the [`ToneEngine`] and
//! (in the `sonify` crate) `DataSource` traits.
//!
//! ## Features
//!
//! - **serde**: derive `Serialize`/`Deserialize` for data points, pitches and
//!   score policies (used by the native shell for config and feed parsing)
//!
//! ## Example
//!
//! ```ignore
//! use sonify_core::{DataPoint, Scheduler, ScaleTable, SchedulerSettings};
//! use std::time::Instant;
//!
//! let mut scheduler = Scheduler::new(engine, ScaleTable::new(), SchedulerSettings::default())?;
//! scheduler.load_data(points);
//! let first = scheduler.play(Instant::now());
//! ```

pub mod engine;
pub mod error;
pub mod scheduler;
pub mod types;

// Re-export commonly used types
pub use engine::{ToneEngine, VoiceId, VoiceShape};
pub use error::SonifyError;
pub use scheduler::{
    Playback, PlaybackCursor, ScaleContext, Scheduler, SchedulerSettings, ScorePolicy,
    TickTiming, TransportState, min_delay,
};
pub use types::{DataPoint, Pitch, Playlist, ScaleProvider, ScaleTable};
