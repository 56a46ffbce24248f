//! Idle/Scheduled transport state machine
//!
//! The scheduler is driven with explicit instants: callers ask for
//! [`Scheduler::next_deadline`], wait until then (or until a command
//! arrives), and call [`Scheduler::poll`]. The pending tick is a single
//! `due` instant inside [`TransportState::Scheduled`], so arming a new tick
//! always replaces the old one.

use super::event::Playback;
use super::policy::ScorePolicy;
use super::timing::{pitch_index, TickTiming};
use crate::engine::{ToneEngine, VoiceId, VoiceShape};
use crate::error::SonifyError;
use crate::types::{DataPoint, Playlist, ScaleProvider, ScaleTable};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Construction-time parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    /// Note duration at speed 1.0
    pub base_note_duration: Duration,
    pub speed: f64,
    pub policy: ScorePolicy,
    pub tonic: String,
    pub scale: String,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            base_note_duration: Duration::from_secs(2),
            speed: 1.0,
            policy: ScorePolicy::default(),
            tonic: "C".to_string(),
            scale: "major".to_string(),
        }
    }
}

/// Whether a tick is pending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// No timer armed (after construction or pause)
    Idle,
    /// Exactly one tick is armed for `due`
    Scheduled { due: Instant },
}

impl TransportState {
    pub fn is_scheduled(&self) -> bool {
        matches!(self, TransportState::Scheduled { .. })
    }
}

/// Position of the next point to sound, and the current note duration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackCursor {
    pub index: usize,
    pub note_duration: Duration,
}

/// Tonic and scale used for the next pitch lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleContext {
    pub tonic: String,
    pub scale: String,
}

/// A replaced voice waiting out its release tail
#[derive(Debug, Clone, Copy)]
struct RetiringVoice {
    voice: VoiceId,
    dispose_at: Instant,
}

/// Owns playback state, computes pitch and timing per note and drives the tone engine
pub struct Scheduler<E, S = ScaleTable> {
    engine: E,
    scales: S,
    policy: ScorePolicy,
    base_note_duration: Duration,
    speed: f64,
    playlist: Playlist,
    cursor: PlaybackCursor,
    context: ScaleContext,
    state: TransportState,
    voice: VoiceId,
    shape: VoiceShape,
    retiring: Vec<RetiringVoice>,
}

impl<E: ToneEngine, S: ScaleProvider> Scheduler<E, S> {
    /// Create an idle scheduler with an empty playlist and one live voice
    pub fn new(mut engine: E, scales: S, settings: SchedulerSettings) -> Result<Self, SonifyError> {
        let note_duration = note_duration_for(settings.base_note_duration, settings.speed)?;
        let shape = VoiceShape::for_note_duration(note_duration);
        let voice = engine.create_voice(shape)?;

        Ok(Scheduler {
            engine,
            scales,
            policy: settings.policy,
            base_note_duration: settings.base_note_duration,
            speed: settings.speed,
            playlist: Playlist::default(),
            cursor: PlaybackCursor {
                index: 0,
                note_duration,
            },
            context: ScaleContext {
                tonic: settings.tonic,
                scale: settings.scale,
            },
            state: TransportState::Idle,
            voice,
            shape,
            retiring: Vec::new(),
        })
    }

    /// Replace the playlist wholesale and rewind. Playback state is untouched:
    /// a pending tick will simply sound from the new playlist.
    pub fn load_data(&mut self, points: Vec<DataPoint>) {
        self.playlist = Playlist::new(points);
        self.cursor.index = 0;
        info!(points = self.playlist.len(), "playlist loaded");
    }

    /// Start playback: sound the next point now and arm the following tick.
    ///
    /// Playing while already scheduled is a no-op, so repeated calls never
    /// double-trigger or leave a second tick pending.
    pub fn play(&mut self, now: Instant) -> Option<Playback> {
        if self.state.is_scheduled() {
            debug!("play ignored, already scheduled");
            return None;
        }
        info!(index = self.cursor.index, "playback started");
        self.tick(now)
    }

    /// Cancel the pending tick and release everything sounding on the active voice
    pub fn pause(&mut self) {
        self.state = TransportState::Idle;
        self.engine.release_all(self.voice);
        info!(index = self.cursor.index, "playback paused");
    }

    /// Rewind to the first point without starting or stopping playback
    pub fn reset(&mut self) {
        self.cursor.index = 0;
    }

    /// Takes effect on the next pitch lookup
    pub fn set_tonic(&mut self, tonic: impl Into<String>) {
        self.context.tonic = tonic.into();
    }

    /// Takes effect on the next pitch lookup
    pub fn set_scale(&mut self, scale: impl Into<String>) {
        self.context.scale = scale.into();
    }

    /// Change tempo and swap voices.
    ///
    /// The new voice is created first, so a failure leaves the old voice and
    /// duration in place. The old voice is released immediately and disposed
    /// from [`poll`](Self::poll) once its release tail has elapsed.
    pub fn set_speed(&mut self, factor: f64, now: Instant) -> Result<(), SonifyError> {
        let note_duration = note_duration_for(self.base_note_duration, factor)?;
        let shape = VoiceShape::for_note_duration(note_duration);
        let voice = self.engine.create_voice(shape)?;

        let old_voice = std::mem::replace(&mut self.voice, voice);
        let old_shape = std::mem::replace(&mut self.shape, shape);
        self.engine.release_all(old_voice);
        self.retiring.push(RetiringVoice {
            voice: old_voice,
            dispose_at: now + old_shape.release_tail(),
        });

        self.speed = factor;
        self.cursor.note_duration = note_duration;
        info!(speed = factor, note_ms = note_duration.as_millis() as u64, "speed changed");
        Ok(())
    }

    /// Dispose voices whose tail has passed and fire the pending tick if it is due
    pub fn poll(&mut self, now: Instant) -> Option<Playback> {
        self.dispose_retired(now);
        match self.state {
            TransportState::Scheduled { due } if due <= now => self.tick(now),
            _ => None,
        }
    }

    /// Earliest instant at which [`poll`](Self::poll) has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        let tick = match self.state {
            TransportState::Scheduled { due } => Some(due),
            TransportState::Idle => None,
        };
        self.retiring
            .iter()
            .map(|r| r.dispose_at)
            .chain(tick)
            .min()
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn cursor(&self) -> PlaybackCursor {
        self.cursor
    }

    pub fn scale_context(&self) -> &ScaleContext {
        &self.context
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn policy(&self) -> ScorePolicy {
        self.policy
    }

    /// The voice new notes are triggered on
    pub fn active_voice(&self) -> VoiceId {
        self.voice
    }

    /// Number of replaced voices still waiting for disposal
    pub fn retiring_voices(&self) -> usize {
        self.retiring.len()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Sound the point under the cursor, advance, and arm exactly one next tick
    fn tick(&mut self, now: Instant) -> Option<Playback> {
        let len = self.playlist.len();
        if len == 0 {
            // Nothing to play yet; idle-retry at the note duration
            self.state = TransportState::Scheduled {
                due: now + self.cursor.note_duration,
            };
            debug!("empty playlist, retrying");
            return None;
        }

        let index = if self.cursor.index < len {
            self.cursor.index
        } else {
            0
        };
        let timing = TickTiming::compute(&self.playlist, index, &self.policy, self.cursor.note_duration)?;
        let point = &self.playlist[index];

        let scale = self.scales.resolve(&self.context.scale, &self.context.tonic);
        let playback = match self.playlist.value_range() {
            Some(range) if !scale.is_empty() => {
                let pitch = scale[pitch_index(point.value, range, scale.len())];
                self.engine.trigger(self.voice, &pitch, timing.note_length);
                debug!(
                    index,
                    %pitch,
                    note_ms = timing.note_length.as_millis() as u64,
                    delay_ms = timing.delay.as_millis() as u64,
                    "tick"
                );
                Some(Playback {
                    title: point.title.clone(),
                    pitch,
                    index,
                })
            }
            _ => {
                warn!(
                    scale = %self.context.scale,
                    tonic = %self.context.tonic,
                    "scale resolved to no pitches, skipping note"
                );
                None
            }
        };

        self.cursor.index = (index + 1) % len;
        self.state = TransportState::Scheduled {
            due: now + timing.delay,
        };
        playback
    }

    fn dispose_retired(&mut self, now: Instant) {
        let engine = &mut self.engine;
        self.retiring.retain(|retiring| {
            if retiring.dispose_at <= now {
                engine.dispose_voice(retiring.voice);
                debug!(voice = retiring.voice.0, "voice disposed");
                false
            } else {
                true
            }
        });
    }
}

/// `base / speed`, rejecting non-positive, non-finite or overflowing results
fn note_duration_for(base: Duration, speed: f64) -> Result<Duration, SonifyError> {
    if !(speed.is_finite() && speed > 0.0) {
        return Err(SonifyError::InvalidSpeed(speed));
    }
    match Duration::try_from_secs_f64(base.as_secs_f64() / speed) {
        Ok(duration) if !duration.is_zero() => Ok(duration),
        _ => Err(SonifyError::InvalidSpeed(speed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Pitch;

    /// Records every engine call
    #[derive(Default)]
    struct Recorder {
        next_voice: u64,
        created: Vec<VoiceShape>,
        triggers: Vec<(VoiceId, Pitch, Duration)>,
        released: Vec<VoiceId>,
        disposed: Vec<VoiceId>,
    }

    impl ToneEngine for Recorder {
        fn create_voice(&mut self, shape: VoiceShape) -> Result<VoiceId, SonifyError> {
            self.next_voice += 1;
            self.created.push(shape);
            Ok(VoiceId(self.next_voice))
        }

        fn trigger(&mut self, voice: VoiceId, pitch: &Pitch, duration: Duration) {
            self.triggers.push((voice, *pitch, duration));
        }

        fn release_all(&mut self, voice: VoiceId) {
            self.released.push(voice);
        }

        fn dispose_voice(&mut self, voice: VoiceId) {
            self.disposed.push(voice);
        }
    }

    fn scheduler() -> Scheduler<Recorder> {
        Scheduler::new(Recorder::default(), ScaleTable, SchedulerSettings::default()).unwrap()
    }

    fn points() -> Vec<DataPoint> {
        vec![
            DataPoint::new("a", 1.0, 0.0, 1.0),
            DataPoint::new("b", 2.0, 1.0, 3.0),
            DataPoint::new("c", 3.0, 3.0, 4.0),
        ]
    }

    #[test]
    fn test_new_scheduler_is_idle() {
        let s = scheduler();
        assert_eq!(s.state(), TransportState::Idle);
        assert_eq!(s.cursor().index, 0);
        assert_eq!(s.cursor().note_duration, Duration::from_secs(2));
        assert_eq!(s.engine().created.len(), 1);
        assert!(s.next_deadline().is_none());
    }

    #[test]
    fn test_invalid_initial_speed() {
        let settings = SchedulerSettings {
            speed: 0.0,
            ..SchedulerSettings::default()
        };
        let result = Scheduler::new(Recorder::default(), ScaleTable, settings);
        assert!(matches!(result, Err(SonifyError::InvalidSpeed(_))));
    }

    #[test]
    fn test_play_ticks_immediately_and_arms_timer() {
        let mut s = scheduler();
        s.load_data(points());
        let now = Instant::now();

        let played = s.play(now).unwrap();
        assert_eq!(played.index, 0);
        assert_eq!(played.title, "a");
        assert_eq!(s.cursor().index, 1);
        assert!(s.state().is_scheduled());
        assert_eq!(s.engine().triggers.len(), 1);
    }

    #[test]
    fn test_poll_before_due_does_nothing() {
        let mut s = scheduler();
        s.load_data(points());
        let now = Instant::now();
        s.play(now);

        assert!(s.poll(now).is_none());
        assert_eq!(s.engine().triggers.len(), 1);
    }

    #[test]
    fn test_pause_releases_and_idles() {
        let mut s = scheduler();
        s.load_data(points());
        s.play(Instant::now());
        s.pause();

        assert_eq!(s.state(), TransportState::Idle);
        assert_eq!(s.engine().released, vec![s.active_voice()]);
        assert!(s.poll(Instant::now() + Duration::from_secs(60)).is_none());
    }

    #[test]
    fn test_reset_keeps_transport_state() {
        let mut s = scheduler();
        s.load_data(points());
        s.play(Instant::now());
        s.reset();
        assert_eq!(s.cursor().index, 0);
        assert!(s.state().is_scheduled());
    }

    #[test]
    fn test_load_data_rewinds_cursor() {
        let mut s = scheduler();
        s.load_data(points());
        s.play(Instant::now());
        assert_eq!(s.cursor().index, 1);

        s.load_data(vec![DataPoint::new("z", 1.0, 0.0, 0.0)]);
        assert_eq!(s.cursor().index, 0);
        assert!(s.state().is_scheduled());
    }

    #[test]
    fn test_empty_playlist_retries_without_sound() {
        let mut s = scheduler();
        let now = Instant::now();
        assert!(s.play(now).is_none());
        assert_eq!(
            s.state(),
            TransportState::Scheduled {
                due: now + Duration::from_secs(2)
            }
        );
        assert!(s.engine().triggers.is_empty());
        assert_eq!(s.cursor().index, 0);
    }

    #[test]
    fn test_speed_change_swaps_voice() {
        let mut s = scheduler();
        let now = Instant::now();
        let old = s.active_voice();

        s.set_speed(2.0, now).unwrap();
        assert_ne!(s.active_voice(), old);
        assert_eq!(s.cursor().note_duration, Duration::from_secs(1));
        assert_eq!(s.engine().released, vec![old]);
        assert_eq!(s.retiring_voices(), 1);
        // Old 2s voice has a 4s tail
        assert_eq!(s.next_deadline(), Some(now + Duration::from_secs(4)));

        s.poll(now + Duration::from_secs(3));
        assert!(s.engine().disposed.is_empty());
        s.poll(now + Duration::from_secs(4));
        assert_eq!(s.engine().disposed, vec![old]);
        assert_eq!(s.retiring_voices(), 0);
    }

    #[test]
    fn test_invalid_speed_is_rejected() {
        let mut s = scheduler();
        let now = Instant::now();
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e-300] {
            assert!(s.set_speed(bad, now).is_err(), "{} accepted", bad);
        }
        assert_eq!(s.engine().created.len(), 1);
        assert_eq!(s.speed(), 1.0);
    }

    #[test]
    fn test_unknown_scale_skips_note_but_advances() {
        let mut s = scheduler();
        s.load_data(points());
        s.set_scale("no such scale");
        assert!(s.play(Instant::now()).is_none());
        assert!(s.engine().triggers.is_empty());
        assert_eq!(s.cursor().index, 1);
        assert!(s.state().is_scheduled());
    }
}
