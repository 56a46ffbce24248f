//! MIDI output tone engine
//!
//! Notes go out over midir from a dedicated thread that owns the connection.
//! Each voice maps to its own MIDI channel, and the thread schedules the
//! note-off for every note-on it sends.

use anyhow::{anyhow, Result};
use crossbeam_channel::{after, bounded, never, select, unbounded, Receiver, Sender};
use midir::{MidiOutput, MidiOutputConnection};
use sonify_core::{Pitch, SonifyError, ToneEngine, VoiceId, VoiceShape};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const CLIENT_NAME: &str = "Sonify";
const VELOCITY: u8 = 96;

/// Voice ids map onto the 16 MIDI channels
pub fn channel_for_voice(voice: VoiceId) -> u8 {
    (voice.0 % 16) as u8
}

fn note_on(channel: u8, note: u8, velocity: u8) -> [u8; 3] {
    [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
}

fn note_off(channel: u8, note: u8) -> [u8; 3] {
    [0x80 | (channel & 0x0F), note & 0x7F, 0]
}

/// Controller 123
fn all_notes_off(channel: u8) -> [u8; 3] {
    [0xB0 | (channel & 0x0F), 123, 0]
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingOff {
    voice: VoiceId,
    channel: u8,
    note: u8,
    at: Instant,
}

/// Note-offs waiting for their time
#[derive(Debug, Default)]
struct NoteOffQueue {
    pending: Vec<PendingOff>,
}

impl NoteOffQueue {
    fn push(&mut self, off: PendingOff) {
        self.pending.push(off);
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|p| p.at).min()
    }

    /// Remove and return everything due at `now`
    fn take_due(&mut self, now: Instant) -> Vec<PendingOff> {
        let (due, rest) = self.pending.drain(..).partition(|p| p.at <= now);
        self.pending = rest;
        due
    }

    fn drain(&mut self) -> Vec<PendingOff> {
        std::mem::take(&mut self.pending)
    }

    /// Remove and return everything belonging to `voice`
    fn take_voice(&mut self, voice: VoiceId) -> Vec<PendingOff> {
        let (hit, rest) = self.pending.drain(..).partition(|p| p.voice == voice);
        self.pending = rest;
        hit
    }
}

#[derive(Debug)]
enum MidiCommand {
    NoteOn {
        voice: VoiceId,
        note: u8,
        duration: Duration,
    },
    ReleaseVoice(VoiceId),
    Shutdown,
}

/// Owns the connection and the note-off queue
struct MidiOutputThread {
    connection: MidiOutputConnection,
    offs: NoteOffQueue,
}

impl MidiOutputThread {
    fn send(&mut self, message: &[u8]) {
        if let Err(e) = self.connection.send(message) {
            warn!("MIDI send failed: {}", e);
        }
    }

    fn run(mut self, commands: Receiver<MidiCommand>) {
        loop {
            let timer = match self.offs.next_deadline() {
                Some(at) => after(at.saturating_duration_since(Instant::now())),
                None => never(),
            };

            select! {
                recv(commands) -> msg => match msg {
                    Ok(MidiCommand::NoteOn { voice, note, duration }) => {
                        let channel = channel_for_voice(voice);
                        self.send(&note_on(channel, note, VELOCITY));
                        self.offs.push(PendingOff { voice, channel, note, at: Instant::now() + duration });
                    }
                    Ok(MidiCommand::ReleaseVoice(voice)) => {
                        for off in self.offs.take_voice(voice) {
                            self.send(&note_off(off.channel, off.note));
                        }
                    }
                    Ok(MidiCommand::Shutdown) | Err(_) => break,
                },
                recv(timer) -> _ => {
                    for off in self.offs.take_due(Instant::now()) {
                        self.send(&note_off(off.channel, off.note));
                    }
                }
            }
        }

        for off in self.offs.drain() {
            self.send(&note_off(off.channel, off.note));
        }
        for channel in 0..16u8 {
            self.send(&all_notes_off(channel));
        }
        debug!("MIDI output thread stopped");
    }
}

/// Tone engine that plays through a MIDI output port
pub struct MidiEngine {
    commands: Sender<MidiCommand>,
    thread: Option<JoinHandle<()>>,
    port_name: String,
    next_voice: u64,
}

impl MidiEngine {
    /// List available MIDI output ports.
    ///
    /// Creating the client occasionally fails on macOS, so this retries a few times.
    pub fn list_ports() -> Result<Vec<String>> {
        let mut last_err = None;
        for attempt in 0..3 {
            if attempt > 0 {
                thread::sleep(Duration::from_millis(100));
            }
            match MidiOutput::new(CLIENT_NAME) {
                Ok(midi_out) => {
                    return Ok(midi_out
                        .ports()
                        .iter()
                        .filter_map(|p| midi_out.port_name(p).ok())
                        .collect());
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(anyhow!(
            "MIDI initialization failed after 3 attempts: {:?}",
            last_err
        ))
    }

    /// Connect to the first port whose name contains `port_name`
    /// (an empty name picks the first port)
    pub fn connect(port_name: &str) -> Result<Self> {
        let (ready_tx, ready_rx) = bounded::<Result<String>>(1);
        let (tx, rx) = unbounded();
        let wanted = port_name.to_string();

        let thread = thread::spawn(move || {
            let opened = open_port(&wanted);
            match opened {
                Ok((connection, name)) => {
                    let _ = ready_tx.send(Ok(name));
                    MidiOutputThread {
                        connection,
                        offs: NoteOffQueue::default(),
                    }
                    .run(rx);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            }
        });

        let port_name = ready_rx
            .recv()
            .map_err(|_| anyhow!("MIDI thread exited before connecting"))??;
        info!(port = %port_name, "MIDI output connected");

        Ok(MidiEngine {
            commands: tx,
            thread: Some(thread),
            port_name,
            next_voice: 0,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn send(&self, command: MidiCommand) {
        if self.commands.send(command).is_err() {
            error!("MIDI output thread is gone");
        }
    }
}

fn open_port(wanted: &str) -> Result<(MidiOutputConnection, String)> {
    let midi_out = MidiOutput::new(CLIENT_NAME)?;
    let ports = midi_out.ports();
    let port = ports
        .iter()
        .find(|p| {
            midi_out
                .port_name(p)
                .map(|name| name.contains(wanted))
                .unwrap_or(false)
        })
        .ok_or_else(|| anyhow!("MIDI port '{}' not found", wanted))?;
    let name = midi_out.port_name(port)?;
    let connection = midi_out
        .connect(port, "sonify-out")
        .map_err(|e| anyhow!("Failed to connect to '{}': {}", name, e))?;
    Ok((connection, name))
}

impl ToneEngine for MidiEngine {
    fn create_voice(&mut self, _shape: VoiceShape) -> Result<VoiceId, SonifyError> {
        if self.thread.as_ref().map_or(true, |t| t.is_finished()) {
            return Err(SonifyError::VoiceCreationFailure(
                "MIDI output thread is not running".into(),
            ));
        }
        self.next_voice += 1;
        Ok(VoiceId(self.next_voice))
    }

    fn trigger(&mut self, voice: VoiceId, pitch: &Pitch, duration: Duration) {
        self.send(MidiCommand::NoteOn {
            voice,
            note: pitch.midi_number(),
            duration,
        });
    }

    fn release_all(&mut self, voice: VoiceId) {
        self.send(MidiCommand::ReleaseVoice(voice));
    }

    fn dispose_voice(&mut self, voice: VoiceId) {
        // Released already; nothing is allocated per voice beyond its channel
        debug!(voice = voice.0, "MIDI voice disposed");
    }
}

impl Drop for MidiEngine {
    fn drop(&mut self) {
        let _ = self.commands.send(MidiCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn off(voice: u64, note: u8, at: Instant) -> PendingOff {
        PendingOff {
            voice: VoiceId(voice),
            channel: channel_for_voice(VoiceId(voice)),
            note,
            at,
        }
    }

    #[test]
    fn test_messages() {
        assert_eq!(note_on(0, 60, 96), [0x90, 60, 96]);
        assert_eq!(note_on(3, 200, 200), [0x93, 0x48, 0x48]);
        assert_eq!(note_off(15, 69), [0x8F, 69, 0]);
        assert_eq!(all_notes_off(1), [0xB1, 123, 0]);
    }

    #[test]
    fn test_channel_per_voice() {
        assert_eq!(channel_for_voice(VoiceId(1)), 1);
        assert_eq!(channel_for_voice(VoiceId(15)), 15);
        assert_eq!(channel_for_voice(VoiceId(16)), 0);
    }

    #[test]
    fn test_note_off_queue_orders_by_time() {
        let now = Instant::now();
        let mut queue = NoteOffQueue::default();
        queue.push(off(1, 60, now + Duration::from_millis(200)));
        queue.push(off(1, 62, now + Duration::from_millis(100)));
        queue.push(off(2, 64, now + Duration::from_millis(300)));

        assert_eq!(queue.next_deadline(), Some(now + Duration::from_millis(100)));
        let due = queue.take_due(now + Duration::from_millis(150));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].note, 62);
        assert_eq!(queue.next_deadline(), Some(now + Duration::from_millis(200)));
    }

    #[test]
    fn test_note_off_queue_release_voice() {
        let now = Instant::now();
        let mut queue = NoteOffQueue::default();
        queue.push(off(1, 60, now));
        queue.push(off(2, 62, now));
        queue.push(off(1, 64, now));

        let released: Vec<u8> = queue.take_voice(VoiceId(1)).iter().map(|o| o.note).collect();
        assert_eq!(released, vec![60, 64]);
        assert_eq!(queue.pending.len(), 1);
    }

    #[test]
    fn test_list_ports() {
        // Port availability depends on the machine
        match MidiEngine::list_ports() {
            Ok(ports) => println!("MIDI ports: {:?}", ports),
            Err(e) => println!("Skipping MIDI test - {}", e),
        }
    }
}
