use sonify_core::{Pitch, SonifyError, ToneEngine, VoiceId, VoiceShape};
use std::time::Duration;
use tracing::trace;

/// Silent engine for headless runs
#[derive(Debug, Default)]
pub struct NullEngine {
    next_voice: u64,
}

impl NullEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ToneEngine for NullEngine {
    fn create_voice(&mut self, _shape: VoiceShape) -> Result<VoiceId, SonifyError> {
        self.next_voice += 1;
        Ok(VoiceId(self.next_voice))
    }

    fn trigger(&mut self, voice: VoiceId, pitch: &Pitch, duration: Duration) {
        trace!(voice = voice.0, %pitch, ?duration, "silent note");
    }

    fn release_all(&mut self, _voice: VoiceId) {}

    fn dispose_voice(&mut self, _voice: VoiceId) {}
}
