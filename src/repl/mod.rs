//! Interactive shell around the playback runtime
//!
//! The loop waits on four channels at once: typed lines from the readline
//! thread, playback events, source events and file-watcher events.

use crate::audio::PlaybackEvent;
use crate::commands::{create_registry, CommandContext, CommandRegistry, CommandResult};
use crate::repl::watcher::FileWatcher;
use crate::sources::{DataSource, FeedFormat, FileSource, SourceEvent};
use anyhow::Result;
use colored::*;
use crossbeam_channel::{unbounded, Receiver, Sender};
use notify::Event;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use sonify_core::TransportState;
use std::path::Path;
use std::thread;
use tracing::{debug, error, info};

pub mod now_playing;
pub mod scope;
pub mod watcher;

pub use now_playing::NowPlaying;

/// Types of events the REPL loop handles
enum ReplEvent {
    Input(Result<String, ReadlineError>),
}

/// Whether the loop keeps going after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Repl {
    editor: Option<DefaultEditor>,
    registry: CommandRegistry,
    ctx: CommandContext,

    // Event channels
    tx_input: Sender<ReplEvent>,
    rx_input: Receiver<ReplEvent>,
    rx_playback: Receiver<PlaybackEvent>,
    rx_sources: Receiver<SourceEvent>,
    tx_watcher: Sender<notify::Result<Event>>,
    rx_watcher: Receiver<notify::Result<Event>>,
}

impl Repl {
    /// `source_events` must be the receiving end of `ctx.source_events`
    pub fn new(ctx: CommandContext, source_events: Receiver<SourceEvent>) -> Result<Self> {
        let mut repl = Self::with_context(ctx, source_events)?;
        repl.editor = Some(DefaultEditor::new()?);
        Ok(repl)
    }

    /// A REPL without a line editor; input arrives through [`handle_line`](Self::handle_line)
    pub fn with_context(ctx: CommandContext, source_events: Receiver<SourceEvent>) -> Result<Self> {
        let rx_playback = ctx.playback.subscribe()?;
        let (tx_input, rx_input) = unbounded();
        let (tx_watcher, rx_watcher) = unbounded();

        Ok(Self {
            editor: None,
            registry: create_registry(),
            ctx,
            tx_input,
            rx_input,
            rx_playback,
            rx_sources: source_events,
            tx_watcher,
            rx_watcher,
        })
    }

    pub fn context(&self) -> &CommandContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut CommandContext {
        &mut self.ctx
    }

    /// Start the REPL loop
    pub fn run(&mut self) -> Result<()> {
        println!(
            "{} {}",
            "🎵".bright_yellow(),
            "Sonify: data as an endless melody".bright_cyan().bold()
        );
        println!(
            "Try {}, {} or {}",
            "play".cyan(),
            "scale minor pentatonic".cyan(),
            "speed 2".cyan()
        );
        println!(
            "Type '{}' for more information, '{}' or {} to exit.\n",
            "help".bright_green(),
            "quit".bright_red(),
            "Ctrl+C".bright_red()
        );
        if let Some(e) = &self.ctx.audio_down {
            println!(
                "{} {} (playback controls are disabled)\n",
                "Audio down:".bright_red().bold(),
                e.to_string().red()
            );
        }

        let mut editor = match self.editor.take() {
            Some(editor) => editor,
            None => DefaultEditor::new()?,
        };
        let tx_input = self.tx_input.clone();

        thread::spawn(move || loop {
            let prompt = format!("{} ", "sonify>".bright_magenta().bold());
            match editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim().to_string();
                    if !line.is_empty() {
                        let _ = editor.add_history_entry(&line);
                    }
                    if tx_input.send(ReplEvent::Input(Ok(line))).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    let _ = tx_input.send(ReplEvent::Input(Err(err)));
                    break;
                }
            }
        });

        loop {
            let flow = crossbeam_channel::select! {
                recv(self.rx_input) -> msg => match msg {
                    Ok(ReplEvent::Input(Ok(line))) => self.handle_line(&line),
                    Ok(ReplEvent::Input(Err(ReadlineError::Interrupted | ReadlineError::Eof))) => Flow::Exit,
                    Ok(ReplEvent::Input(Err(err))) => {
                        println!(
                            "{} {}",
                            "Error reading input:".bright_red().bold(),
                            err.to_string().red()
                        );
                        Flow::Exit
                    }
                    Err(_) => Flow::Exit,
                },
                recv(self.rx_playback) -> msg => match msg {
                    Ok(event) => {
                        self.handle_playback_event(event);
                        Flow::Continue
                    }
                    // Runtime thread is gone
                    Err(_) => Flow::Exit,
                },
                recv(self.rx_sources) -> msg => {
                    if let Ok(event) = msg {
                        self.handle_source_event(event);
                    }
                    Flow::Continue
                },
                recv(self.rx_watcher) -> msg => {
                    match msg {
                        Ok(Ok(event)) => self.handle_watch_event(&event),
                        Ok(Err(e)) => println!("{} Watch error: {}", "Error:".red(), e),
                        Err(_) => {}
                    }
                    Flow::Continue
                },
            };

            if flow == Flow::Exit {
                println!("{} 🎵", "Goodbye!".bright_cyan());
                break;
            }
        }

        Ok(())
    }

    /// Execute one line of input
    pub fn handle_line(&mut self, line: &str) -> Flow {
        let line = line.trim();
        if line.is_empty() {
            return Flow::Continue;
        }

        match self.registry.execute(line, &mut self.ctx) {
            CommandResult::Success => {}
            CommandResult::Message(msg) => println!("{}", msg),
            CommandResult::Exit => return Flow::Exit,
            CommandResult::Error(e) => {
                println!("{} {}", "Error:".bright_red().bold(), e.red());
            }
            CommandResult::Watch { path, format } => self.start_watch(&path, format),
            CommandResult::NotACommand => {
                println!(
                    "{} Unknown command '{}'. Type '{}' for a list.",
                    "Error:".bright_red().bold(),
                    line,
                    "help".bright_green()
                );
            }
        }
        Flow::Continue
    }

    pub fn handle_playback_event(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::Note(playback) => {
                if self.ctx.follow {
                    println!(
                        "{} {:<4} {}",
                        "♪".bright_green(),
                        playback.pitch.to_string().bright_cyan(),
                        playback.title
                    );
                }
                self.ctx.history.push(playback);
            }
            PlaybackEvent::Transport(TransportState::Idle) => debug!("transport idle"),
            PlaybackEvent::Transport(TransportState::Scheduled { .. }) => {
                debug!("transport scheduled")
            }
            PlaybackEvent::Error(message) => {
                println!("{} {}", "Playback error:".bright_red().bold(), message.red());
            }
        }
    }

    /// Only the active poller may replace the playlist
    pub fn handle_source_event(&mut self, event: SourceEvent) {
        if self.ctx.active_source() != Some(event.source()) {
            debug!(source = event.source(), "ignoring event from inactive source");
            return;
        }
        match event {
            SourceEvent::Loading { source } => debug!(%source, "loading"),
            SourceEvent::Loaded { source, points } => {
                let count = points.len();
                match self.ctx.playback.load_data(points) {
                    Ok(()) => println!(
                        "{}",
                        format!("📡 {} points from {}", count, source).dimmed()
                    ),
                    Err(e) => error!("could not hand data to playback: {:#}", e),
                }
            }
            SourceEvent::Failed { source, error } => {
                println!(
                    "{} {}: {}",
                    "Data error:".bright_red().bold(),
                    source,
                    error.to_string().red()
                );
            }
        }
    }

    fn handle_watch_event(&mut self, event: &Event) {
        let changed = match &self.ctx.watcher {
            Some(w) => w.changed(event),
            None => return,
        };
        for (path, format) in changed {
            println!("{} File changed: {}", "⚡".bright_yellow(), path.display());
            self.reload(&path, format);
        }
    }

    /// Watch a file and load it now. Watching replaces any polled source.
    fn start_watch(&mut self, path: &Path, format: FeedFormat) {
        if self.ctx.watcher.is_none() {
            match FileWatcher::new(self.tx_watcher.clone()) {
                Ok(w) => self.ctx.watcher = Some(w),
                Err(e) => {
                    println!("{} Failed to create watcher: {}", "Error:".red(), e);
                    return;
                }
            }
        }
        let Some(watcher) = &mut self.ctx.watcher else {
            return;
        };

        match watcher.watch(path, format) {
            Ok(canonical) => {
                println!(
                    "{} Watching {} for changes...",
                    "👀".bright_cyan(),
                    canonical.display().to_string().bright_green()
                );
                self.ctx.poller = None;
                self.reload(&canonical, format);
            }
            Err(e) => println!("{} Failed to watch {}: {}", "Error:".red(), path.display(), e),
        }
    }

    fn reload(&mut self, path: &Path, format: FeedFormat) {
        match FileSource::from_path(path, format).fetch() {
            Ok(points) => {
                info!(path = %path.display(), points = points.len(), "reloaded watched file");
                let count = points.len();
                match self.ctx.playback.load_data(points) {
                    Ok(()) => println!("{} Reloaded {} points", "✓".bright_green(), count),
                    Err(e) => error!("could not hand data to playback: {:#}", e),
                }
            }
            Err(e) => println!("{} {}", "Error:".red(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_context;
    use sonify_core::{DataPoint, Playback};
    use std::sync::Arc;
    use std::time::Duration;

    fn repl() -> Repl {
        let (ctx, rx) = test_context();
        Repl::with_context(ctx, rx).unwrap()
    }

    fn points_file(count: usize) -> tempfile::NamedTempFile {
        let points: Vec<DataPoint> = (0..count)
            .map(|i| DataPoint::new(format!("p{}", i), i as f64, i as f64, i as f64 + 1.0))
            .collect();
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        serde_json::to_writer(&mut file, &points).unwrap();
        file
    }

    #[test]
    fn test_lines_dispatch_to_commands() {
        let mut repl = repl();
        assert_eq!(repl.handle_line(""), Flow::Continue);
        assert_eq!(repl.handle_line("frobnicate"), Flow::Continue);
        assert_eq!(repl.handle_line("scale blues"), Flow::Continue);
        assert_eq!(repl.context().prefs.scale, "blues");
        assert_eq!(repl.handle_line("quit"), Flow::Exit);
    }

    #[test]
    fn test_notes_feed_history() {
        let mut repl = repl();
        repl.context_mut().follow = false;
        repl.handle_playback_event(PlaybackEvent::Note(Playback {
            title: "a".into(),
            pitch: "G3".parse().unwrap(),
            index: 4,
        }));
        assert_eq!(repl.context().history.latest().map(|p| p.index), Some(4));
    }

    #[test]
    fn test_inactive_source_is_ignored() {
        let mut repl = repl();
        repl.handle_source_event(SourceEvent::Loaded {
            source: "stale".into(),
            points: vec![DataPoint::new("x", 1.0, 0.0, 1.0)],
        });
        assert_eq!(repl.context().playback.status().unwrap().points, 0);
    }

    #[test]
    fn test_active_source_loads_playlist() {
        let file = points_file(3);
        let mut repl = repl();
        let source = FileSource::new("feed", file.path(), FeedFormat::Points);
        repl.context_mut().start_poller(Arc::new(source));

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while repl.context().playback.status().unwrap().points == 0 {
            assert!(std::time::Instant::now() < deadline, "playlist never loaded");
            if let Ok(event) = repl.rx_sources.recv_timeout(Duration::from_millis(50)) {
                repl.handle_source_event(event);
            }
        }
        assert_eq!(repl.context().playback.status().unwrap().points, 3);
    }

    #[test]
    fn test_watch_loads_immediately() {
        let file = points_file(5);
        let mut repl = repl();
        let line = format!("watch {}", file.path().display());
        assert_eq!(repl.handle_line(&line), Flow::Continue);
        assert!(repl.context().watcher.as_ref().unwrap().is_watching(file.path()));
        assert_eq!(repl.context().playback.status().unwrap().points, 5);
    }

    #[test]
    fn test_polled_source_replaces_watch() {
        let watched = points_file(5);
        let polled = points_file(2);
        let mut repl = repl();
        repl.handle_line(&format!("watch {}", watched.path().display()));
        repl.handle_line(&format!("load {}", polled.path().display()));

        assert!(!repl.context().watcher.as_ref().unwrap().is_watching(watched.path()));

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while repl.context().playback.status().unwrap().points != 2 {
            assert!(std::time::Instant::now() < deadline, "polled file never loaded");
            if let Ok(event) = repl.rx_sources.recv_timeout(Duration::from_millis(50)) {
                repl.handle_source_event(event);
            }
        }

        // A late change to the old file must not replace the polled playlist
        let canonical = watched.path().canonicalize().unwrap();
        let event = Event::new(notify::EventKind::Modify(notify::event::ModifyKind::Any))
            .add_path(canonical);
        repl.handle_watch_event(&event);
        assert_eq!(repl.context().playback.status().unwrap().points, 2);
    }
}
