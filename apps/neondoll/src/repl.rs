//! Line commands and terminal rendering for the interactive session.

use std::{fmt::Write as _, path::PathBuf};

use anyhow::{anyhow, bail, Result};
use shared::{catalog, domain::OutfitKind};
use studio_core::{GenerationOutcome, IgnoreReason, StudioEvent, StudioSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Presets,
    Wear(OutfitKind),
    History,
    /// 1-based position in the history listing.
    Restore(usize),
    Show,
    Save(PathBuf),
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  presets          list the wardrobe
  wear <preset>    dress the character (id or label, e.g. `wear school`)
  history          list cached results, newest first
  restore <n>      show cached result n again
  show             print the current session state
  save <path>      write the displayed image to a file
  help             this text
  quit             leave";

/// Parses one input line; blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, arg) = match line.split_once(char::is_whitespace) {
        Some((verb, arg)) => (verb, arg.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "presets" | "ls" => Command::Presets,
        "wear" | "w" => {
            if arg.is_empty() {
                bail!("usage: wear <preset>");
            }
            let preset = catalog::find_preset(arg)
                .ok_or_else(|| anyhow!("unknown preset '{arg}'; try `presets`"))?;
            Command::Wear(preset.id)
        }
        "history" | "h" => Command::History,
        "restore" | "r" => {
            let index: usize = arg
                .parse()
                .map_err(|_| anyhow!("usage: restore <n> (n from `history`)"))?;
            if index == 0 {
                bail!("history positions start at 1");
            }
            Command::Restore(index)
        }
        "show" => Command::Show,
        "save" => {
            if arg.is_empty() {
                bail!("usage: save <path>");
            }
            Command::Save(PathBuf::from(arg))
        }
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("unknown command '{other}'; try `help`"),
    };
    Ok(Some(command))
}

pub fn render_presets(selected: OutfitKind) -> String {
    let mut out = String::from("SELECT WARDROBE\n");
    for preset in catalog::catalog() {
        let marker = if preset.id == selected { '>' } else { ' ' };
        let _ = writeln!(
            out,
            "{marker} {icon} {id:<10} {label:<18} {description}",
            icon = preset.icon,
            id = preset.id.as_str().to_ascii_lowercase(),
            label = preset.label,
            description = preset.description,
        );
    }
    out
}

pub fn render_history(snapshot: &StudioSnapshot) -> String {
    if snapshot.history.is_empty() {
        return "CACHE_MEMORY: NO DATA".to_string();
    }
    let mut out = String::from("CACHE_MEMORY\n");
    for (position, entry) in snapshot.history.iter().enumerate() {
        let current = if entry.image == snapshot.display { '*' } else { ' ' };
        let _ = writeln!(
            out,
            "{current}{n}. {preset:<10} {time} {image}",
            n = position + 1,
            preset = entry.preset,
            time = entry.created_at.format("%H:%M:%S"),
            image = entry.image,
        );
    }
    out
}

pub fn render_snapshot(snapshot: &StudioSnapshot) -> String {
    let identity = snapshot
        .identity
        .as_ref()
        .map_or_else(|| "not established".to_string(), |image| image.summary());
    format!(
        "selected: {}\nstatus:   {}{}\nidentity: {}\ndisplay:  {}\ncache:    {} entries",
        snapshot.selected,
        snapshot.status,
        if snapshot.busy { " (busy)" } else { "" },
        identity,
        snapshot.display,
        snapshot.history.len(),
    )
}

/// Text for outcomes the event stream does not already report.
pub fn describe_outcome(outcome: &GenerationOutcome) -> Option<String> {
    match outcome {
        GenerationOutcome::Ignored(IgnoreReason::Busy) => {
            Some("generation in progress; request ignored".to_string())
        }
        GenerationOutcome::Ignored(IgnoreReason::IdentityMissing) => {
            Some("no base character yet; run `wear base` first".to_string())
        }
        GenerationOutcome::RestoredIdentity => Some("base character restored from cache".to_string()),
        GenerationOutcome::Generated(_) | GenerationOutcome::Failed(_) => None,
    }
}

pub fn describe_event(event: &StudioEvent) -> String {
    match event {
        StudioEvent::StatusChanged(status) if status.is_working() => format!("> {status}"),
        StudioEvent::StatusChanged(status) => {
            format!("> SYS.STATUS: {}", status.message().to_ascii_uppercase())
        }
        StudioEvent::DisplayChanged(image) => format!("display: {image}"),
        StudioEvent::HistoryUpdated { len } => format!("cache: {len} entries"),
        StudioEvent::GenerationFailed { preset, message } => format!(
            "!! GENERATION FAILED for {preset}: {message}\n!! press Enter to acknowledge"
        ),
    }
}

#[cfg(test)]
#[path = "tests/repl_tests.rs"]
mod tests;
