//! ADSR amplitude envelope for synth tones
//!
//! Stage times come from the voice's [`VoiceShape`], so a slower tempo gives
//! softer attacks and longer tails. Curves are exponential: each sample moves
//! a fixed fraction of the remaining distance toward the stage target.

use sonify_core::VoiceShape;

/// Below this level a releasing envelope counts as silent
const SILENCE: f32 = 0.0001;

/// `ln(1000)`: a stage reaches 99.9% of its target in its nominal time
const TIME_CONSTANT: f32 = 6.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Per-sample envelope generator
#[derive(Debug, Clone)]
pub struct Envelope {
    stage: EnvelopeStage,
    level: f32,
    sustain: f32,
    attack_coeff: f32,
    decay_coeff: f32,
    release_coeff: f32,
}

impl Envelope {
    pub fn new(shape: &VoiceShape, sample_rate: f32) -> Self {
        Self {
            stage: EnvelopeStage::Idle,
            level: 0.0,
            sustain: shape.sustain.clamp(0.0, 1.0),
            // 1ms floor on attack and release keeps edges click-free
            attack_coeff: coefficient(shape.attack.max(0.001), sample_rate),
            decay_coeff: coefficient(shape.decay, sample_rate),
            release_coeff: coefficient(shape.release.max(0.001), sample_rate),
        }
    }

    /// Start the attack. The level is kept, so retriggering a releasing tone is smooth.
    pub fn trigger(&mut self) {
        self.stage = EnvelopeStage::Attack;
    }

    pub fn release(&mut self) {
        if self.stage != EnvelopeStage::Idle {
            self.stage = EnvelopeStage::Release;
        }
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_finished(&self) -> bool {
        self.stage == EnvelopeStage::Idle
    }

    /// Advance one sample; returns the amplitude in `[0, 1]`
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => self.level = 0.0,
            EnvelopeStage::Attack => {
                self.level += (1.0 - self.level) * self.attack_coeff;
                if self.level >= 0.999 {
                    self.level = 1.0;
                    self.stage = EnvelopeStage::Decay;
                }
            }
            EnvelopeStage::Decay => {
                self.level += (self.sustain - self.level) * self.decay_coeff;
                if (self.level - self.sustain).abs() < 0.001 {
                    self.level = self.sustain;
                    self.stage = EnvelopeStage::Sustain;
                }
            }
            EnvelopeStage::Sustain => self.level = self.sustain,
            EnvelopeStage::Release => {
                self.level -= self.level * self.release_coeff;
                if self.level < SILENCE {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
            }
        }
        self.level
    }
}

fn coefficient(seconds: f32, sample_rate: f32) -> f32 {
    if seconds > 0.0 && sample_rate > 0.0 {
        1.0 - (-TIME_CONSTANT / (seconds * sample_rate)).exp()
    } else {
        1.0
    }
}
