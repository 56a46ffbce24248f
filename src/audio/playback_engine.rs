//! Playback runtime
//!
//! One dedicated thread owns the [`Scheduler`] and its tone engine. It sleeps
//! in `select!` on the command channel and a one-shot timer armed for the
//! scheduler's next deadline, so the timer is rebuilt after every wake-up and
//! at most one is ever outstanding. Everything else talks to the thread through
//! a [`PlaybackHandle`].

use crossbeam_channel::{after, bounded, never, select, unbounded, Receiver, Sender};
use sonify_core::{
    DataPoint, Playback, PlaybackCursor, ScaleContext, Scheduler, SonifyError, ToneEngine,
    TransportState,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// How long request/reply calls wait for the runtime thread
const REPLY_TIMEOUT: Duration = Duration::from_secs(1);

/// Commands accepted by the runtime thread
#[derive(Debug)]
pub enum PlaybackCommand {
    LoadData(Vec<DataPoint>),
    Play,
    Pause,
    Reset,
    SetTonic(String),
    SetScale(String),
    SetSpeed(f64),
    Subscribe(Sender<PlaybackEvent>),
    Waveform(Sender<Vec<f32>>),
    Status(Sender<StatusReport>),
    Shutdown,
}

/// Broadcast to every subscriber
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// A note was sounded
    Note(Playback),
    /// Playback started or stopped
    Transport(TransportState),
    /// A command failed on the runtime thread
    Error(String),
}

/// Snapshot of the runtime for `status`
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub state: TransportState,
    pub cursor: PlaybackCursor,
    pub context: ScaleContext,
    pub speed: f64,
    pub points: usize,
    pub retiring_voices: usize,
}

pub struct PlaybackEngine;

impl PlaybackEngine {
    /// Start the runtime thread.
    ///
    /// `build` runs on the new thread, so engines that must stay on the thread
    /// that created them (cpal streams) are fine. A construction error is
    /// returned here and no thread is left running.
    pub fn spawn<E, F>(build: F) -> Result<PlaybackHandle, SonifyError>
    where
        E: ToneEngine + 'static,
        F: FnOnce() -> Result<Scheduler<E>, SonifyError> + Send + 'static,
    {
        let (command_tx, command_rx) = unbounded();
        let (ready_tx, ready_rx) = bounded::<Result<(), SonifyError>>(1);

        let thread = thread::Builder::new()
            .name("sonify-playback".into())
            .spawn(move || match build() {
                Ok(scheduler) => {
                    let _ = ready_tx.send(Ok(()));
                    PlaybackLoop::new(scheduler).run(command_rx);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| SonifyError::VoiceCreationFailure(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(PlaybackHandle {
                command_tx,
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => Err(SonifyError::VoiceCreationFailure(
                "playback thread exited during startup".into(),
            )),
        }
    }
}

/// Handle to the runtime thread; dropping it shuts the thread down
pub struct PlaybackHandle {
    command_tx: Sender<PlaybackCommand>,
    thread: Option<JoinHandle<()>>,
}

impl PlaybackHandle {
    pub fn send(&self, command: PlaybackCommand) -> anyhow::Result<()> {
        self.command_tx
            .send(command)
            .map_err(|e| anyhow::anyhow!("Failed to send command: {}", e))
    }

    pub fn load_data(&self, points: Vec<DataPoint>) -> anyhow::Result<()> {
        self.send(PlaybackCommand::LoadData(points))
    }

    pub fn play(&self) -> anyhow::Result<()> {
        self.send(PlaybackCommand::Play)
    }

    pub fn pause(&self) -> anyhow::Result<()> {
        self.send(PlaybackCommand::Pause)
    }

    pub fn reset(&self) -> anyhow::Result<()> {
        self.send(PlaybackCommand::Reset)
    }

    pub fn set_tonic(&self, tonic: impl Into<String>) -> anyhow::Result<()> {
        self.send(PlaybackCommand::SetTonic(tonic.into()))
    }

    pub fn set_scale(&self, scale: impl Into<String>) -> anyhow::Result<()> {
        self.send(PlaybackCommand::SetScale(scale.into()))
    }

    pub fn set_speed(&self, factor: f64) -> anyhow::Result<()> {
        self.send(PlaybackCommand::SetSpeed(factor))
    }

    /// Create a new subscriber; every subscriber receives every event
    pub fn subscribe(&self) -> anyhow::Result<Receiver<PlaybackEvent>> {
        let (tx, rx) = unbounded();
        self.send(PlaybackCommand::Subscribe(tx))?;
        Ok(rx)
    }

    /// Latest output samples of the active engine
    pub fn waveform(&self) -> anyhow::Result<Vec<f32>> {
        let (tx, rx) = bounded(1);
        self.send(PlaybackCommand::Waveform(tx))?;
        rx.recv_timeout(REPLY_TIMEOUT)
            .map_err(|e| anyhow::anyhow!("No waveform from playback thread: {}", e))
    }

    pub fn status(&self) -> anyhow::Result<StatusReport> {
        let (tx, rx) = bounded(1);
        self.send(PlaybackCommand::Status(tx))?;
        rx.recv_timeout(REPLY_TIMEOUT)
            .map_err(|e| anyhow::anyhow!("No status from playback thread: {}", e))
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        let _ = self.command_tx.send(PlaybackCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

enum LoopAction {
    Continue,
    Shutdown,
}

/// State owned by the runtime thread
struct PlaybackLoop<E: ToneEngine> {
    scheduler: Scheduler<E>,
    subscribers: Vec<Sender<PlaybackEvent>>,
    playing: bool,
}

impl<E: ToneEngine> PlaybackLoop<E> {
    fn new(scheduler: Scheduler<E>) -> Self {
        Self {
            scheduler,
            subscribers: Vec::new(),
            playing: false,
        }
    }

    fn run(mut self, commands: Receiver<PlaybackCommand>) {
        loop {
            let timer = match self.scheduler.next_deadline() {
                Some(deadline) => after(deadline.saturating_duration_since(Instant::now())),
                None => never(),
            };

            select! {
                recv(commands) -> msg => match msg {
                    Ok(cmd) => {
                        if let LoopAction::Shutdown = self.handle_command(cmd) {
                            break;
                        }
                    }
                    Err(_) => break,
                },
                recv(timer) -> _ => {
                    let note = self.scheduler.poll(Instant::now());
                    self.emit_note(note);
                }
            }
        }

        self.scheduler.pause();
        debug!("playback thread stopped");
    }

    fn handle_command(&mut self, cmd: PlaybackCommand) -> LoopAction {
        let now = Instant::now();
        match cmd {
            PlaybackCommand::LoadData(points) => self.scheduler.load_data(points),
            PlaybackCommand::Play => {
                let note = self.scheduler.play(now);
                self.emit_note(note);
            }
            PlaybackCommand::Pause => self.scheduler.pause(),
            PlaybackCommand::Reset => self.scheduler.reset(),
            PlaybackCommand::SetTonic(tonic) => {
                info!(%tonic, "tonic changed");
                self.scheduler.set_tonic(tonic);
            }
            PlaybackCommand::SetScale(scale) => {
                info!(%scale, "scale changed");
                self.scheduler.set_scale(scale);
            }
            PlaybackCommand::SetSpeed(factor) => {
                if let Err(e) = self.scheduler.set_speed(factor, now) {
                    error!("speed change failed: {}", e);
                    self.broadcast(PlaybackEvent::Error(e.to_string()));
                }
            }
            PlaybackCommand::Subscribe(tx) => {
                let _ = tx.send(PlaybackEvent::Transport(self.scheduler.state()));
                self.subscribers.push(tx);
            }
            PlaybackCommand::Waveform(reply) => {
                let _ = reply.send(self.scheduler.engine().waveform());
            }
            PlaybackCommand::Status(reply) => {
                let _ = reply.send(self.status());
            }
            PlaybackCommand::Shutdown => return LoopAction::Shutdown,
        }
        self.sync_transport();
        LoopAction::Continue
    }

    fn status(&self) -> StatusReport {
        StatusReport {
            state: self.scheduler.state(),
            cursor: self.scheduler.cursor(),
            context: self.scheduler.scale_context().clone(),
            speed: self.scheduler.speed(),
            points: self.scheduler.playlist().len(),
            retiring_voices: self.scheduler.retiring_voices(),
        }
    }

    fn emit_note(&mut self, note: Option<Playback>) {
        if let Some(note) = note {
            self.broadcast(PlaybackEvent::Note(note));
        }
    }

    /// Announce play/pause transitions, not every re-arm
    fn sync_transport(&mut self) {
        let state = self.scheduler.state();
        if state.is_scheduled() != self.playing {
            self.playing = state.is_scheduled();
            self.broadcast(PlaybackEvent::Transport(state));
        }
    }

    fn broadcast(&mut self, event: PlaybackEvent) {
        // Drop subscribers whose receiver is gone
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullEngine;
    use sonify_core::{ScaleTable, SchedulerSettings};

    fn quick_settings() -> SchedulerSettings {
        SchedulerSettings {
            base_note_duration: Duration::from_millis(40),
            ..SchedulerSettings::default()
        }
    }

    fn spawn_null() -> PlaybackHandle {
        PlaybackEngine::spawn(|| Scheduler::new(NullEngine::new(), ScaleTable, quick_settings()))
            .unwrap()
    }

    #[test]
    fn test_spawn_reports_build_failure() {
        let result = PlaybackEngine::spawn(|| {
            let settings = SchedulerSettings {
                speed: -1.0,
                ..SchedulerSettings::default()
            };
            Scheduler::new(NullEngine::new(), ScaleTable, settings)
        });
        assert!(matches!(result, Err(SonifyError::InvalidSpeed(_))));
    }

    #[test]
    fn test_status_reflects_commands() {
        let handle = spawn_null();
        handle.load_data(vec![DataPoint::new("a", 1.0, 0.0, 1.0)]).unwrap();
        handle.set_scale("dorian").unwrap();
        handle.set_tonic("E").unwrap();

        let status = handle.status().unwrap();
        assert_eq!(status.points, 1);
        assert_eq!(status.context.scale, "dorian");
        assert_eq!(status.context.tonic, "E");
        assert_eq!(status.state, TransportState::Idle);
    }

    #[test]
    fn test_subscriber_gets_current_transport() {
        let handle = spawn_null();
        let events = handle.subscribe().unwrap();
        assert_eq!(
            events.recv_timeout(REPLY_TIMEOUT).unwrap(),
            PlaybackEvent::Transport(TransportState::Idle)
        );
    }

    #[test]
    fn test_null_engine_has_no_waveform() {
        let handle = spawn_null();
        assert!(handle.waveform().unwrap().is_empty());
    }
}
