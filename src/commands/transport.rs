//! Transport commands (play, pause, reset)

use crate::commands::{CommandContext, CommandResult};
use colored::*;

/// Handle `play` command
pub fn cmd_play(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    if let Some(refused) = ctx.audio_refusal() {
        return refused;
    }
    match ctx.playback.play() {
        Ok(()) => CommandResult::Message(format!("{} Playing", "▶".bright_green())),
        Err(e) => CommandResult::Error(e.to_string()),
    }
}

/// Handle `pause` or `stop` command
pub fn cmd_pause(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    if let Some(refused) = ctx.audio_refusal() {
        return refused;
    }
    match ctx.playback.pause() {
        Ok(()) => CommandResult::Message(format!("{} Paused", "⏸".bright_yellow())),
        Err(e) => CommandResult::Error(e.to_string()),
    }
}

/// Handle `reset` command: rewind to the first point
pub fn cmd_reset(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    let moved = ctx.history.latest().is_some_and(|p| p.reset_enabled());
    if let Err(e) = ctx.playback.reset() {
        return CommandResult::Error(e.to_string());
    }
    if moved {
        CommandResult::Message(format!("{} Back to the first point", "⏮".bright_cyan()))
    } else {
        CommandResult::Message("Already at the first point".dimmed().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{spawn_playback_with, EngineKind};
    use crate::commands::{music::cmd_speed, test_context};
    use crate::config::Preferences;
    use crate::sources::SourceRegistry;
    use sonify_core::{Playback, SchedulerSettings, SonifyError, ToneEngine, TransportState};

    #[test]
    fn test_play_then_pause() {
        let (mut ctx, _events) = test_context();
        assert!(matches!(cmd_play("", &mut ctx), CommandResult::Message(_)));
        assert!(ctx.playback.status().unwrap().state.is_scheduled());

        assert!(matches!(cmd_pause("", &mut ctx), CommandResult::Message(_)));
        assert_eq!(ctx.playback.status().unwrap().state, TransportState::Idle);
    }

    #[test]
    fn test_reset_reports_position() {
        let (mut ctx, _events) = test_context();
        match cmd_reset("", &mut ctx) {
            CommandResult::Message(msg) => assert!(msg.contains("Already")),
            other => panic!("unexpected {:?}", other),
        }

        ctx.history.push(Playback {
            title: "b".into(),
            pitch: "D3".parse().unwrap(),
            index: 1,
        });
        match cmd_reset("", &mut ctx) {
            CommandResult::Message(msg) => assert!(msg.contains("Back")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(ctx.playback.status().unwrap().cursor.index, 0);
    }

    #[test]
    fn test_transport_refused_while_audio_down() {
        let started = spawn_playback_with(
            EngineKind::Midi,
            SchedulerSettings::default(),
            || -> Result<Box<dyn ToneEngine>, SonifyError> {
                Err(SonifyError::VoiceCreationFailure("no MIDI ports".into()))
            },
        )
        .unwrap();
        let (tx, _rx) = crossbeam_channel::unbounded();
        let mut ctx = CommandContext::new(
            started.handle,
            Preferences::default(),
            None,
            SourceRegistry::default(),
            tx,
        );
        ctx.audio_down = started.audio_down;

        for result in [
            cmd_play("", &mut ctx),
            cmd_pause("", &mut ctx),
            cmd_speed("2", &mut ctx),
        ] {
            match result {
                CommandResult::Error(msg) => assert!(msg.contains("no MIDI ports")),
                other => panic!("unexpected {:?}", other),
            }
        }
        let status = ctx.playback.status().unwrap();
        assert_eq!(status.state, TransportState::Idle);
        assert_eq!(status.speed, 1.0);
        assert_eq!(ctx.prefs.speed, 1.0);
    }
}
