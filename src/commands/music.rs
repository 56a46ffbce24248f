//! Musical parameter commands (tonic, scale, speed)

use crate::commands::{CommandContext, CommandResult};
use colored::*;
use sonify_core::types::TONICS;
use sonify_core::{ScaleProvider, ScaleTable, SonifyError};

/// Handle `tonic [name]` command
pub fn cmd_tonic(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Message(format!(
            "Tonic: {} (choose from {}, with # or b)",
            ctx.prefs.tonic.bright_cyan(),
            TONICS.join(" ")
        ));
    }
    if ScaleTable::tonic(args).is_none() {
        return CommandResult::Error(SonifyError::UnknownTonic(args.to_string()).to_string());
    }
    if let Err(e) = ctx.playback.set_tonic(args) {
        return CommandResult::Error(e.to_string());
    }
    ctx.prefs.tonic = args.to_string();
    ctx.save_prefs();
    CommandResult::Message(format!("🎵 Tonic set to {}", args.bright_green()))
}

/// Handle `scale [name]` command; names are case-insensitive
pub fn cmd_scale(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Message(format!("Scale: {}", ctx.prefs.scale.bright_cyan()));
    }
    let Some(name) = canonical_scale(&ctx.scales, args) else {
        return CommandResult::Error(SonifyError::UnknownScale(args.to_string()).to_string());
    };
    if let Err(e) = ctx.playback.set_scale(name.as_str()) {
        return CommandResult::Error(e.to_string());
    }
    ctx.prefs.scale = name.clone();
    ctx.save_prefs();
    CommandResult::Message(format!("🎵 Scale set to {}", name.bright_green()))
}

/// Handle `scales` command
pub fn cmd_scales(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    let mut output = String::from("Scales:");
    for name in ctx.scales.names() {
        if name.eq_ignore_ascii_case(&ctx.prefs.scale) {
            output.push_str(&format!("\n  {} {}", "▶".bright_green(), name.bright_green()));
        } else {
            output.push_str(&format!("\n    {}", name));
        }
    }
    CommandResult::Message(output)
}

/// Handle `speed [factor]` command
pub fn cmd_speed(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Message(format!("Speed: {}x", ctx.prefs.speed));
    }
    if let Some(refused) = ctx.audio_refusal() {
        return refused;
    }
    let factor = match args.trim_end_matches('x').parse::<f64>() {
        Ok(f) if f.is_finite() && f > 0.0 => f,
        Ok(f) => return CommandResult::Error(SonifyError::InvalidSpeed(f).to_string()),
        Err(_) => {
            return CommandResult::Error("Invalid speed. Use a positive number like 1.5".to_string())
        }
    };
    if let Err(e) = ctx.playback.set_speed(factor) {
        return CommandResult::Error(e.to_string());
    }
    ctx.prefs.speed = factor;
    ctx.save_prefs();
    CommandResult::Message(format!("🎵 Speed set to {}x", factor).bright_green().to_string())
}

fn canonical_scale(scales: &ScaleTable, input: &str) -> Option<String> {
    scales
        .names()
        .into_iter()
        .find(|name| name.eq_ignore_ascii_case(input.trim()))
        .map(str::to_string)
}
