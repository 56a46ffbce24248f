pub mod adsr;
pub mod midi;
pub mod null;
pub mod oscillator;
pub mod playback_engine;
pub mod synth;

pub use midi::MidiEngine;
pub use null::NullEngine;
pub use playback_engine::{PlaybackCommand, PlaybackEngine, PlaybackEvent, PlaybackHandle, StatusReport};
pub use synth::{SynthEngine, WaveformTap};

use serde::{Deserialize, Serialize};
use sonify_core::{ScaleTable, Scheduler, SchedulerSettings, SonifyError, ToneEngine};
use std::fmt;
use tracing::warn;

/// Which output the scheduler drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    #[default]
    Synth,
    Midi,
    Null,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineKind::Synth => "synth",
            EngineKind::Midi => "midi",
            EngineKind::Null => "null",
        };
        f.write_str(name)
    }
}

/// Open the selected output.
///
/// Must run on the thread that will own the engine: cpal streams are not `Send`.
pub fn open_engine(
    kind: EngineKind,
    gain: f32,
    midi_port: &str,
) -> Result<Box<dyn ToneEngine>, SonifyError> {
    let engine: Box<dyn ToneEngine> = match kind {
        EngineKind::Synth => Box::new(
            SynthEngine::new(gain).map_err(|e| SonifyError::VoiceCreationFailure(e.to_string()))?,
        ),
        EngineKind::Midi => Box::new(
            MidiEngine::connect(midi_port)
                .map_err(|e| SonifyError::VoiceCreationFailure(e.to_string()))?,
        ),
        EngineKind::Null => Box::new(NullEngine::new()),
    };
    Ok(engine)
}

/// A running playback runtime and, when the requested output failed,
/// the reason it is running silent.
pub struct StartedPlayback {
    pub handle: PlaybackHandle,
    /// Set when the runtime fell back to [`NullEngine`]. Transport controls
    /// stay disabled while this is present.
    pub audio_down: Option<SonifyError>,
}

/// Start the playback runtime on `kind`, falling back to a silent runtime
/// when the requested output cannot be opened.
pub fn spawn_playback(
    kind: EngineKind,
    gain: f32,
    midi_port: String,
    settings: SchedulerSettings,
) -> Result<StartedPlayback, SonifyError> {
    spawn_playback_with(kind, settings, move || open_engine(kind, gain, &midi_port))
}

/// [`spawn_playback`] with the output opened by `open` on the playback thread.
///
/// Only a [`SonifyError::VoiceCreationFailure`] from a real output falls back;
/// a failing `null` engine or any other error is returned.
pub fn spawn_playback_with<F>(
    kind: EngineKind,
    settings: SchedulerSettings,
    open: F,
) -> Result<StartedPlayback, SonifyError>
where
    F: FnOnce() -> Result<Box<dyn ToneEngine>, SonifyError> + Send + 'static,
{
    let attempt = {
        let settings = settings.clone();
        PlaybackEngine::spawn(move || Scheduler::new(open()?, ScaleTable::new(), settings))
    };
    match attempt {
        Ok(handle) => Ok(StartedPlayback {
            handle,
            audio_down: None,
        }),
        Err(e @ SonifyError::VoiceCreationFailure(_)) if kind != EngineKind::Null => {
            warn!(engine = %kind, "output unavailable ({}), audio down", e);
            let handle = PlaybackEngine::spawn(move || {
                let engine: Box<dyn ToneEngine> = Box::new(NullEngine::new());
                Scheduler::new(engine, ScaleTable::new(), settings)
            })?;
            Ok(StartedPlayback {
                handle,
                audio_down: Some(e),
            })
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_engine_always_opens() {
        let mut engine = open_engine(EngineKind::Null, 0.5, "").unwrap();
        let shape = sonify_core::VoiceShape::for_note_duration(std::time::Duration::from_secs(1));
        let a = engine.create_voice(shape).unwrap();
        let b = engine.create_voice(shape).unwrap();
        assert_ne!(a, b);
        assert!(engine.waveform().is_empty());
    }

    #[test]
    fn test_spawn_null_playback() {
        let started =
            spawn_playback(EngineKind::Null, 0.5, String::new(), SchedulerSettings::default())
                .unwrap();
        assert!(started.audio_down.is_none());
        assert_eq!(started.handle.status().unwrap().points, 0);
    }

    fn no_device() -> Result<Box<dyn ToneEngine>, SonifyError> {
        Err(SonifyError::VoiceCreationFailure("no output device".into()))
    }

    #[test]
    fn test_failed_output_runs_silent_and_reports_down() {
        let started =
            spawn_playback_with(EngineKind::Synth, SchedulerSettings::default(), no_device).unwrap();
        assert_eq!(
            started.audio_down,
            Some(SonifyError::VoiceCreationFailure("no output device".into()))
        );
        // The silent runtime still answers queries
        assert_eq!(started.handle.status().unwrap().points, 0);
    }

    #[test]
    fn test_failed_null_output_is_an_error() {
        let result = spawn_playback_with(EngineKind::Null, SchedulerSettings::default(), no_device);
        assert!(matches!(result, Err(SonifyError::VoiceCreationFailure(_))));
    }

    #[test]
    fn test_engine_kind_names() {
        assert_eq!(EngineKind::Midi.to_string(), "midi");
        assert_eq!(EngineKind::default(), EngineKind::Synth);
    }
}
