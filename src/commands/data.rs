//! Data source commands (source, sources, load, watch)

use crate::commands::{CommandContext, CommandResult};
use crate::sources::{FeedFormat, FileSource};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;

/// Handle `sources` command
pub fn cmd_sources(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    if ctx.sources.is_empty() {
        return CommandResult::Message(
            "No sources configured. Add [[sources]] to sonify.toml or use 'load <file>'"
                .to_string(),
        );
    }
    let active = ctx.active_source();
    let mut output = String::from("Sources:");
    for name in ctx.sources.names() {
        if Some(name) == active {
            output.push_str(&format!("\n  {} {}", "▶".bright_green(), name.bright_green()));
        } else {
            output.push_str(&format!("\n    {}", name));
        }
    }
    CommandResult::Message(output)
}

/// Handle `source [name]` command
pub fn cmd_source(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return match ctx.active_source() {
            Some(name) => CommandResult::Message(format!("Source: {}", name.bright_cyan())),
            None => CommandResult::Message("No source selected".to_string()),
        };
    }
    match ctx.select_source(args) {
        Ok(()) => CommandResult::Message(format!("📡 Switched to {}", args.bright_green())),
        Err(e) => CommandResult::Error(e.to_string()),
    }
}

/// Handle `load <file> [format]` command
pub fn cmd_load(args: &str, ctx: &mut CommandContext) -> CommandResult {
    let Some((path, format)) = parse_file_args(args) else {
        return CommandResult::Error("Usage: load <file> [points|hacker-news|wikipedia]".to_string());
    };
    let source = FileSource::from_path(&path, format);
    let message = format!("📂 Loading {} as {}", path.display().to_string().bright_green(), format);
    ctx.start_poller(Arc::new(source));
    CommandResult::Message(message)
}

/// Handle `watch <file> [format]` command
pub fn cmd_watch(args: &str, _ctx: &mut CommandContext) -> CommandResult {
    match parse_file_args(args) {
        Some((path, format)) => CommandResult::Watch { path, format },
        None => CommandResult::Error("Usage: watch <file> [points|hacker-news|wikipedia]".to_string()),
    }
}

/// Split `<file> [format]`; a trailing word that is not a format belongs to the path
fn parse_file_args(args: &str) -> Option<(PathBuf, FeedFormat)> {
    let args = args.trim();
    if args.is_empty() {
        return None;
    }
    if let Some((path, last)) = args.rsplit_once(' ') {
        if let Some(format) = FeedFormat::from_name(last) {
            return Some((PathBuf::from(path.trim()), format));
        }
    }
    Some((PathBuf::from(args), FeedFormat::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_context;
    use crate::sources::{SourceConfig, SourceEvent, SourceRegistry};
    use std::time::Duration;

    #[test]
    fn test_parse_file_args() {
        assert_eq!(parse_file_args(""), None);
        assert_eq!(
            parse_file_args("feed.json"),
            Some((PathBuf::from("feed.json"), FeedFormat::Points))
        );
        assert_eq!(
            parse_file_args("top stories.json hn"),
            Some((PathBuf::from("top stories.json"), FeedFormat::HackerNews))
        );
        assert_eq!(
            parse_file_args("my feed.json"),
            Some((PathBuf::from("my feed.json"), FeedFormat::Points))
        );
    }

    #[test]
    fn test_watch_returns_path() {
        let (mut ctx, _events) = test_context();
        assert_eq!(
            cmd_watch("changes.json wikipedia", &mut ctx),
            CommandResult::Watch {
                path: PathBuf::from("changes.json"),
                format: FeedFormat::Wikipedia
            }
        );
        assert!(matches!(cmd_watch("", &mut ctx), CommandResult::Error(_)));
    }

    /// First event past `Loading`
    fn settled(events: &crossbeam_channel::Receiver<SourceEvent>) -> SourceEvent {
        loop {
            match events.recv_timeout(Duration::from_secs(2)).unwrap() {
                SourceEvent::Loading { .. } => continue,
                other => return other,
            }
        }
    }

    #[test]
    fn test_load_starts_poller() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"[{"title": "a", "value": 1, "start": 0, "end": 1}]"#,
        )
        .unwrap();

        let (mut ctx, events) = test_context();
        let result = cmd_load(&file.path().display().to_string(), &mut ctx);
        assert!(matches!(result, CommandResult::Message(_)));
        assert!(ctx.active_source().is_some());

        match settled(&events) {
            SourceEvent::Loaded { points, .. } => assert_eq!(points.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_source_selection() {
        let (mut ctx, events) = test_context();
        ctx.sources = SourceRegistry::new(vec![SourceConfig {
            name: "wiki".into(),
            path: PathBuf::from("/no/such/recentchanges.json"),
            format: FeedFormat::Wikipedia,
            interval_secs: None,
        }]);

        assert!(matches!(cmd_source("hn", &mut ctx), CommandResult::Error(_)));
        assert!(matches!(cmd_source("wiki", &mut ctx), CommandResult::Message(_)));
        assert_eq!(ctx.active_source(), Some("wiki"));
        assert_eq!(ctx.prefs.source.as_deref(), Some("wiki"));
        assert!(matches!(settled(&events), SourceEvent::Failed { .. }));
    }
}
