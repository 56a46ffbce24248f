//! cpal-backed polyphonic triangle synth
//!
//! All voices mix into one output stream. The stream callback and the control
//! thread share a [`Mixer`] behind a mutex; the control thread only ever
//! pushes tones and flips envelopes, so the lock is held briefly on both sides.

use super::oscillator::Tone;
use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use sonify_core::{Pitch, SonifyError, ToneEngine, VoiceId, VoiceShape};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Simultaneous tones per voice; the oldest is dropped beyond this
pub const POLYPHONY: usize = 64;

/// Samples kept for visualization (16 frames of 256)
pub const TAP_SIZE: usize = 4096;

/// Ring buffer of the most recent output samples
#[derive(Debug, Clone)]
pub struct WaveformTap {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl WaveformTap {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Oldest first
    pub fn snapshot(&self) -> Vec<f32> {
        self.samples.iter().copied().collect()
    }
}

struct SynthVoice {
    shape: VoiceShape,
    tones: VecDeque<Tone>,
}

/// Voice pool and output mix, independent of the audio device
pub struct Mixer {
    sample_rate: f32,
    gain: f32,
    voices: HashMap<VoiceId, SynthVoice>,
    tap: WaveformTap,
}

impl Mixer {
    pub fn new(sample_rate: f32, gain: f32) -> Self {
        Self {
            sample_rate,
            gain: gain.clamp(0.0, 1.0),
            voices: HashMap::new(),
            tap: WaveformTap::new(TAP_SIZE),
        }
    }

    pub fn add_voice(&mut self, id: VoiceId, shape: VoiceShape) {
        self.voices.insert(
            id,
            SynthVoice {
                shape,
                tones: VecDeque::new(),
            },
        );
    }

    pub fn trigger(&mut self, id: VoiceId, frequency: f32, duration: Duration) {
        let Some(voice) = self.voices.get_mut(&id) else {
            warn!(voice = id.0, "trigger on unknown voice");
            return;
        };
        if voice.tones.len() >= POLYPHONY {
            voice.tones.pop_front();
        }
        let hold = (duration.as_secs_f64() * self.sample_rate as f64).round() as u64;
        voice
            .tones
            .push_back(Tone::new(frequency, self.sample_rate, &voice.shape, hold.max(1)));
    }

    pub fn release_all(&mut self, id: VoiceId) {
        if let Some(voice) = self.voices.get_mut(&id) {
            voice.tones.iter_mut().for_each(Tone::release);
        }
    }

    pub fn remove_voice(&mut self, id: VoiceId) {
        self.voices.remove(&id);
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Tones still sounding on a voice
    pub fn active_tones(&self, id: VoiceId) -> usize {
        self.voices.get(&id).map_or(0, |v| v.tones.len())
    }

    /// Mix the next output sample and record it in the tap
    pub fn next_sample(&mut self) -> f32 {
        let mut sum = 0.0;
        for voice in self.voices.values_mut() {
            for tone in voice.tones.iter_mut() {
                sum += tone.next_sample();
            }
        }
        let out = (sum * self.gain).clamp(-1.0, 1.0);
        self.tap.push(out);
        out
    }

    /// Drop tones whose release has finished
    pub fn prune(&mut self) {
        for voice in self.voices.values_mut() {
            voice.tones.retain(|tone| !tone.is_finished());
        }
    }

    pub fn waveform(&self) -> Vec<f32> {
        self.tap.snapshot()
    }
}

/// Tone engine rendering through the default cpal output device
pub struct SynthEngine {
    _stream: Stream,
    mixer: Arc<Mutex<Mixer>>,
    next_voice: u64,
}

impl SynthEngine {
    pub fn new(gain: f32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No output device available"))?;
        let config = device.default_output_config()?;

        let sample_format = config.sample_format();
        let config: StreamConfig = config.into();
        let mixer = Arc::new(Mutex::new(Mixer::new(config.sample_rate.0 as f32, gain)));

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, mixer.clone())?,
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, mixer.clone())?,
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, mixer.clone())?,
            _ => return Err(anyhow!("Unsupported sample format: {:?}", sample_format)),
        };
        stream
            .play()
            .map_err(|e| anyhow!("Failed to play stream: {}", e))?;

        debug!(
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            "synth stream started"
        );
        Ok(SynthEngine {
            _stream: stream,
            mixer,
            next_voice: 0,
        })
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &StreamConfig,
        mixer: Arc<Mutex<Mixer>>,
    ) -> Result<Stream>
    where
        T: Sample + SizedSample + Send + 'static + cpal::FromSample<f32>,
    {
        let channels = config.channels as usize;
        let err_fn = |err: cpal::StreamError| error!("output stream error: {}", err);

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut mixer) = mixer.lock() else {
                        data.fill(T::EQUILIBRIUM);
                        return;
                    };
                    for frame in data.chunks_mut(channels) {
                        let value: T = T::from_sample(mixer.next_sample());
                        frame.fill(value);
                    }
                    mixer.prune();
                },
                err_fn,
                None,
            )
            .map_err(|e| anyhow!("Failed to build output stream: {}", e))?;

        Ok(stream)
    }

    fn with_mixer<R>(&self, f: impl FnOnce(&mut Mixer) -> R) -> Option<R> {
        match self.mixer.lock() {
            Ok(mut mixer) => Some(f(&mut mixer)),
            Err(_) => {
                error!("synth mixer lock poisoned");
                None
            }
        }
    }
}

impl ToneEngine for SynthEngine {
    fn create_voice(&mut self, shape: VoiceShape) -> Result<VoiceId, SonifyError> {
        self.next_voice += 1;
        let id = VoiceId(self.next_voice);
        self.with_mixer(|m| m.add_voice(id, shape))
            .ok_or_else(|| SonifyError::VoiceCreationFailure("synth mixer unavailable".into()))?;
        Ok(id)
    }

    fn trigger(&mut self, voice: VoiceId, pitch: &Pitch, duration: Duration) {
        let frequency = pitch.frequency();
        self.with_mixer(|m| m.trigger(voice, frequency, duration));
    }

    fn release_all(&mut self, voice: VoiceId) {
        self.with_mixer(|m| m.release_all(voice));
    }

    fn dispose_voice(&mut self, voice: VoiceId) {
        self.with_mixer(|m| m.remove_voice(voice));
    }

    fn waveform(&self) -> Vec<f32> {
        self.with_mixer(|m| m.waveform()).unwrap_or_default()
    }
}
