// sonify-core/src/types/mod.rs

pub mod data_point;
pub mod pitch;
pub mod scale;

pub use data_point::{DataPoint, Playlist, TimeSpan, ValueRange};
pub use pitch::Pitch;
pub use scale::{ScaleProvider, ScaleTable, OCTAVE_RANGE, ROOT_OCTAVE, TONICS};
