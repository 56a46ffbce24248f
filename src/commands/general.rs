//! General REPL commands (status, history, scope, help, quit)

use crate::commands::{CommandContext, CommandResult};
use crate::repl::scope;
use colored::*;
use sonify_core::TransportState;
use std::time::Instant;

const SCOPE_WIDTH: usize = 64;
const SCOPE_HEIGHT: usize = 12;

/// Handle `status` command
pub fn cmd_status(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    let report = match ctx.playback.status() {
        Ok(report) => report,
        Err(e) => return CommandResult::Error(e.to_string()),
    };

    let transport = match report.state {
        TransportState::Idle => "paused".yellow().to_string(),
        TransportState::Scheduled { due } => {
            let wait = due.saturating_duration_since(Instant::now());
            format!("{} (next note in {:.2}s)", "playing".bright_green(), wait.as_secs_f64())
        }
    };
    let reset = match ctx.history.latest() {
        Some(last) if last.reset_enabled() => "available".bright_green().to_string(),
        _ => "at start".dimmed().to_string(),
    };

    let mut output = format!("{}", "Status".bold());
    output.push_str(&format!("\n  Transport: {}", transport));
    output.push_str(&format!(
        "\n  Position:  {} of {} points",
        report.cursor.index, report.points
    ));
    output.push_str(&format!(
        "\n  Note:      {:.3}s at {}x",
        report.cursor.note_duration.as_secs_f64(),
        report.speed
    ));
    output.push_str(&format!(
        "\n  Scale:     {} {}",
        report.context.tonic.bright_cyan(),
        report.context.scale.bright_cyan()
    ));
    output.push_str(&format!(
        "\n  Source:    {}",
        ctx.active_source().unwrap_or("none")
    ));
    output.push_str(&format!("\n  Reset:     {}", reset));
    if let Some(e) = &ctx.audio_down {
        output.push_str(&format!("\n  Audio:     {} ({})", "down".bright_red(), e));
    }
    if report.retiring_voices > 0 {
        output.push_str(&format!("\n  Retiring:  {} voice(s)", report.retiring_voices));
    }
    CommandResult::Message(output)
}

/// Handle `history` command: the most recent notes, newest first
pub fn cmd_history(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    if ctx.history.is_empty() {
        return CommandResult::Message("Nothing played yet".dimmed().to_string());
    }
    let mut output = format!("{}", "Now playing".bold());
    for (i, entry) in ctx.history.entries().enumerate() {
        let line = format!("#{:<4} {:<4} {}", entry.index, entry.pitch, entry.title);
        if i == 0 {
            output.push_str(&format!("\n  {} {}", "♪".bright_green(), line.bright_green()));
        } else {
            output.push_str(&format!("\n    {}", line));
        }
    }
    CommandResult::Message(output)
}

/// Handle `scope` command
pub fn cmd_scope(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    match ctx.playback.waveform() {
        Ok(samples) => CommandResult::Message(scope::render(&samples, SCOPE_WIDTH, SCOPE_HEIGHT)),
        Err(e) => CommandResult::Error(e.to_string()),
    }
}

/// Handle `follow [on|off]` command
pub fn cmd_follow(args: &str, ctx: &mut CommandContext) -> CommandResult {
    match args {
        "" => ctx.follow = !ctx.follow,
        "on" => ctx.follow = true,
        "off" => ctx.follow = false,
        _ => return CommandResult::Error("Usage: follow [on|off]".to_string()),
    }
    let state = if ctx.follow { "on" } else { "off" };
    CommandResult::Message(format!("Note display {}", state.bright_cyan()))
}

/// Handle `help` command
pub fn cmd_help(_args: &str, _ctx: &mut CommandContext) -> CommandResult {
    print_help();
    CommandResult::Success
}

/// Handle `quit` or `exit` command
pub fn cmd_quit(_args: &str, _ctx: &mut CommandContext) -> CommandResult {
    CommandResult::Exit
}

fn print_help() {
    println!("{}", "🎵 Sonify Help".bold());
    println!("{}", "==============".bold());
    println!();
    println!("{}", "Transport:".green());
    println!("  {}                 - Start the loop", "play".cyan());
    println!("  {}                - Stop after the current note", "pause".cyan());
    println!("  {}                - Rewind to the first point", "reset".cyan());
    println!();
    println!("{}", "Music:".green());
    println!("  {}         - Show or set the tonic (C, F#, Bb...)", "tonic [name]".cyan());
    println!("  {}         - Show or set the scale", "scale [name]".cyan());
    println!("  {}               - List available scales", "scales".cyan());
    println!("  {}        - Tempo multiplier, e.g. 1.5", "speed [factor]".cyan());
    println!();
    println!("{}", "Data:".green());
    println!("  {}        - Switch to a configured source", "source [name]".cyan());
    println!("  {}              - List configured sources", "sources".cyan());
    println!("  {} - Load a feed file once", "load <file> [format]".cyan());
    println!("  {} - Reload a feed file whenever it changes", "watch <file> [format]".cyan());
    println!("  Formats: points, hacker-news, wikipedia");
    println!();
    println!("{}", "Display:".green());
    println!("  {}               - Transport, position and scale", "status".cyan());
    println!("  {}              - Last notes played", "history".cyan());
    println!("  {}                - Waveform of the synth output", "scope".cyan());
    println!("  {}      - Print each note as it plays", "follow [on|off]".cyan());
    println!();
    println!("  {} / {}          - Leave", "quit".cyan(), "exit".cyan());
}
