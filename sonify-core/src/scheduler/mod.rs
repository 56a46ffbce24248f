//! The sonification scheduler
//!
//! - `policy`: how a playlist's timestamp range is compressed into a score
//! - `timing`: per-tick pitch index, note length and inter-note delay
//! - `event`: notifications emitted for every sounded note
//! - `transport`: the Idle/Scheduled state machine that owns the single timer

mod transport;
mod event;
mod policy;
mod timing;

pub use transport::{PlaybackCursor, ScaleContext, Scheduler, SchedulerSettings, TransportState};
pub use event::Playback;
pub use policy::ScorePolicy;
pub use timing::{min_delay, pitch_index, TickTiming};
