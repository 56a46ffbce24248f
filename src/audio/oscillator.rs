//! Enveloped triangle oscillator, one per sounding note

use super::adsr::Envelope;
use sonify_core::VoiceShape;

/// Peak amplitude of a single tone before master gain
const TONE_LEVEL: f32 = 0.2;

/// A triangle tone that holds for a fixed number of samples, then releases
#[derive(Debug, Clone)]
pub struct Tone {
    frequency: f32,
    phase: f32,
    sample_rate: f32,
    envelope: Envelope,
    /// Samples left before the timed note-off
    hold: u64,
}

impl Tone {
    pub fn new(frequency: f32, sample_rate: f32, shape: &VoiceShape, hold: u64) -> Self {
        let mut envelope = Envelope::new(shape, sample_rate);
        envelope.trigger();
        Self {
            frequency,
            phase: 0.0,
            sample_rate,
            envelope,
            hold,
        }
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Note-off now, regardless of remaining hold
    pub fn release(&mut self) {
        self.hold = 0;
        self.envelope.release();
    }

    pub fn is_finished(&self) -> bool {
        self.envelope.is_finished()
    }

    pub fn next_sample(&mut self) -> f32 {
        if self.hold > 0 {
            self.hold -= 1;
            if self.hold == 0 {
                self.envelope.release();
            }
        }

        let value = triangle(self.phase);
        self.phase += self.frequency / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        value * self.envelope.next_sample() * TONE_LEVEL
    }
}

/// Linear ramp -1 to 1 and back over one period
#[inline]
fn triangle(phase: f32) -> f32 {
    if phase < 0.5 {
        4.0 * phase - 1.0
    } else {
        3.0 - 4.0 * phase
    }
}
