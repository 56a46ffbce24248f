//! Tone engine boundary
//!
//! The scheduler never touches audio directly. It asks a [`ToneEngine`] for
//! voices, triggers pitches on the active voice, and hands retired voices
//! back for disposal once their release tail has passed.

use crate::error::SonifyError;
use crate::types::Pitch;
use std::time::Duration;

/// Opaque handle to a voice owned by a tone engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u64);

/// Envelope of a voice, derived from the note duration it is created for.
///
/// - `attack`: seconds to rise from 0 to peak
/// - `decay`: seconds to fall from peak to the sustain level
/// - `sustain`: level held while the note is on (0.0-1.0, NOT time!)
/// - `release`: seconds to fall to silence after note-off
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceShape {
    pub note_duration: Duration,
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl VoiceShape {
    /// Soft triangle-pad envelope that stretches with the note duration
    pub fn for_note_duration(note_duration: Duration) -> Self {
        let d = note_duration.as_secs_f32();
        Self {
            note_duration,
            attack: d * 0.75,
            decay: d * 1.5,
            sustain: 0.05,
            release: d,
        }
    }

    /// How long a voice keeps sounding after `release_all`
    pub fn release_tail(&self) -> Duration {
        self.note_duration * 2
    }
}

/// Audio backend driven by the scheduler.
///
/// Calls arrive from a single control thread. `dispose_voice` is only ever
/// called for a voice that has been released and whose tail has elapsed.
pub trait ToneEngine {
    /// Create a voice shaped for the given note duration
    fn create_voice(&mut self, shape: VoiceShape) -> Result<VoiceId, SonifyError>;

    /// Sound `pitch` on `voice` for `duration`
    fn trigger(&mut self, voice: VoiceId, pitch: &Pitch, duration: Duration);

    /// Release every note currently sounding on `voice`
    fn release_all(&mut self, voice: VoiceId);

    /// Free the voice; it will not be used again
    fn dispose_voice(&mut self, voice: VoiceId);

    /// Most recent output samples, for visualization
    fn waveform(&self) -> Vec<f32> {
        Vec::new()
    }
}

impl<T: ToneEngine + ?Sized> ToneEngine for Box<T> {
    fn create_voice(&mut self, shape: VoiceShape) -> Result<VoiceId, SonifyError> {
        (**self).create_voice(shape)
    }

    fn trigger(&mut self, voice: VoiceId, pitch: &Pitch, duration: Duration) {
        (**self).trigger(voice, pitch, duration)
    }

    fn release_all(&mut self, voice: VoiceId) {
        (**self).release_all(voice)
    }

    fn dispose_voice(&mut self, voice: VoiceId) {
        (**self).dispose_voice(voice)
    }

    fn waveform(&self) -> Vec<f32> {
        (**self).waveform()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_scales_with_duration() {
        let shape = VoiceShape::for_note_duration(Duration::from_secs(2));
        assert_eq!(shape.attack, 1.5);
        assert_eq!(shape.decay, 3.0);
        assert_eq!(shape.sustain, 0.05);
        assert_eq!(shape.release, 2.0);
        assert_eq!(shape.release_tail(), Duration::from_secs(4));
    }
}
