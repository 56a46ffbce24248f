//! Command registry for REPL commands
//!
//! Commands are matched by prefix, longest first, and receive the rest of the
//! line as their argument string.

pub mod data;
pub mod general;
pub mod music;
pub mod transport;

use crate::audio::PlaybackHandle;
use crate::config::Preferences;
use crate::repl::watcher::FileWatcher;
use crate::repl::NowPlaying;
use crate::sources::{
    DataPoller, DataSource, FeedFormat, FileSource, SourceError, SourceEvent, SourceRegistry,
};
use crossbeam_channel::Sender;
use sonify_core::{ScaleTable, SonifyError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of executing a command
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Command executed successfully, continue REPL
    Success,
    /// Command executed, show this message
    Message(String),
    /// Exit the REPL
    Exit,
    /// No command matched
    NotACommand,
    Error(String),
    /// Watch a file and reload it on change
    Watch { path: PathBuf, format: FeedFormat },
}

/// Everything a command may touch
pub struct CommandContext {
    pub playback: PlaybackHandle,
    pub scales: ScaleTable,
    pub prefs: Preferences,
    /// Where preferences are saved; `None` keeps them in memory only
    pub prefs_path: Option<PathBuf>,
    pub sources: SourceRegistry,
    /// Feeds `SourceEvent`s back into the REPL loop
    pub source_events: Sender<SourceEvent>,
    pub poller: Option<DataPoller>,
    /// Files reloaded on change; created by the first `watch`
    pub watcher: Option<FileWatcher>,
    pub history: NowPlaying,
    /// Print each note as it sounds
    pub follow: bool,
    /// Why the output could not be opened; transport is disabled while set
    pub audio_down: Option<SonifyError>,
}

impl CommandContext {
    pub fn new(
        playback: PlaybackHandle,
        prefs: Preferences,
        prefs_path: Option<PathBuf>,
        sources: SourceRegistry,
        source_events: Sender<SourceEvent>,
    ) -> Self {
        Self {
            playback,
            scales: ScaleTable::new(),
            prefs,
            prefs_path,
            sources,
            source_events,
            poller: None,
            watcher: None,
            history: NowPlaying::default(),
            follow: true,
            audio_down: None,
        }
    }

    /// Error to return from transport commands while the output is down
    pub fn audio_refusal(&self) -> Option<CommandResult> {
        self.audio_down.as_ref().map(|e| {
            CommandResult::Error(format!("Audio is down ({}); playback controls are disabled", e))
        })
    }

    /// Persist preferences; failures are logged, never fatal
    pub fn save_prefs(&self) {
        if let Some(path) = &self.prefs_path {
            if let Err(e) = self.prefs.save(path) {
                warn!("could not save preferences: {:#}", e);
            }
        }
    }

    /// Replace the active poller. The old one is stopped before the new one
    /// starts, and watched files stop reloading.
    pub fn start_poller(&mut self, source: Arc<dyn DataSource>) {
        self.poller = None;
        if let Some(watcher) = &mut self.watcher {
            watcher.clear();
        }
        self.poller = Some(DataPoller::start(source, self.source_events.clone()));
    }

    /// Switch to a configured source by name and remember the choice
    pub fn select_source(&mut self, name: &str) -> Result<(), SourceError> {
        let source = self.sources.get(name)?;
        self.start_poller(source);
        self.prefs.source = Some(name.to_string());
        self.save_prefs();
        Ok(())
    }

    /// Start the first source: a file given on the command line, otherwise
    /// `preferred` or the saved choice among the configured sources.
    ///
    /// Never fails; a bad file arrives later as [`SourceEvent::Failed`] and
    /// playback waits on an empty playlist.
    pub fn open_initial_source(&mut self, load: Option<(&Path, FeedFormat)>, preferred: Option<&str>) {
        if let Some((path, format)) = load {
            info!(path = %path.display(), %format, "loading feed file");
            self.start_poller(Arc::new(FileSource::from_path(path, format)));
            return;
        }

        if let Some(name) = preferred {
            if !self.sources.contains(name) {
                warn!(source = %name, "unknown source, using the default");
            }
        }
        let preferred = preferred.map(str::to_string).or_else(|| self.prefs.source.clone());
        let chosen = self.sources.select(preferred.as_deref()).map(str::to_string);
        if let Some(name) = chosen {
            if let Err(e) = self.select_source(&name) {
                warn!(source = %name, "could not start source: {}", e);
            }
        }
    }

    /// Name of the source currently being polled
    pub fn active_source(&self) -> Option<&str> {
        self.poller.as_ref().map(|p| p.source())
    }
}

/// A command handler function
pub type CommandHandler = fn(&str, &mut CommandContext) -> CommandResult;

/// Registry of available commands
pub struct CommandRegistry {
    /// Sorted by prefix length descending for longest-match-first lookup
    commands: Vec<(String, CommandHandler)>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn register(&mut self, prefix: &str, handler: CommandHandler) {
        self.commands.push((prefix.to_string(), handler));
        self.commands.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    }

    /// Execute a command, returning NotACommand if no match found
    pub fn execute(&self, input: &str, ctx: &mut CommandContext) -> CommandResult {
        match self.lookup(input) {
            Some((handler, args)) => handler(args, ctx),
            None => CommandResult::NotACommand,
        }
    }

    fn lookup<'a>(&self, input: &'a str) -> Option<(CommandHandler, &'a str)> {
        self.commands.iter().find_map(|(prefix, handler)| {
            let rest = input.strip_prefix(prefix.as_str())?;
            if rest.is_empty() || rest.starts_with(' ') {
                Some((*handler, rest.trim()))
            } else {
                None
            }
        })
    }

    pub fn list_commands(&self) -> Vec<&str> {
        self.commands.iter().map(|(p, _)| p.as_str()).collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a fully populated command registry with all built-in commands
pub fn create_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();

    registry.register("play", transport::cmd_play);
    registry.register("pause", transport::cmd_pause);
    registry.register("stop", transport::cmd_pause);
    registry.register("reset", transport::cmd_reset);

    registry.register("tonic", music::cmd_tonic);
    registry.register("scale", music::cmd_scale);
    registry.register("scales", music::cmd_scales);
    registry.register("speed", music::cmd_speed);

    registry.register("source", data::cmd_source);
    registry.register("sources", data::cmd_sources);
    registry.register("load", data::cmd_load);
    registry.register("watch", data::cmd_watch);

    registry.register("status", general::cmd_status);
    registry.register("history", general::cmd_history);
    registry.register("scope", general::cmd_scope);
    registry.register("follow", general::cmd_follow);
    registry.register("help", general::cmd_help);
    registry.register("quit", general::cmd_quit);
    registry.register("exit", general::cmd_quit);

    registry
}

/// Context over a silent engine with nothing persisted
#[cfg(test)]
pub(crate) fn test_context() -> (CommandContext, crossbeam_channel::Receiver<SourceEvent>) {
    use crate::audio::{NullEngine, PlaybackEngine};
    use sonify_core::{Scheduler, SchedulerSettings};

    let playback = PlaybackEngine::spawn(|| {
        Scheduler::new(NullEngine::new(), ScaleTable, SchedulerSettings::default())
    })
    .expect("null engine always starts");
    let (tx, rx) = crossbeam_channel::unbounded();
    let ctx = CommandContext::new(playback, Preferences::default(), None, SourceRegistry::default(), tx);
    (ctx, rx)
}
