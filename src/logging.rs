//! Decision log.
//!
//! The hook appends one line per decision to
//! `~/.local/share/cc-shellgate/decisions.log` (or `settings.log`). Logging is
//! best-effort: a log that cannot be opened never changes a decision.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;

use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

use crate::config::Settings;
use crate::eval::RuleMatch;

const DEFAULT_LOG: &str = ".local/share/cc-shellgate/decisions.log";

/// Longest command text written to the log.
const COMMAND_MAX: usize = 200;

/// Where decisions are logged: `settings.log` with `~` expanded, else the
/// default under `$HOME`.
pub fn log_path(settings: &Settings) -> Option<PathBuf> {
    if let Some(path) = &settings.log {
        return Some(PathBuf::from(shellexpand::tilde(path).into_owned()));
    }
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(DEFAULT_LOG))
}

/// Install a file logger at `settings.log_level`.
pub fn init(settings: &Settings) -> io::Result<()> {
    let path = log_path(settings)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no log path and no $HOME"))?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let level = settings
        .log_level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::Info);
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .build();
    WriteLogger::init(level, config, file).map_err(io::Error::other)
}

/// One tab-separated record: decision, source, command, reason.
pub fn format_decision(command: &str, result: &RuleMatch) -> String {
    let command: String = command
        .chars()
        .take(COMMAND_MAX)
        .map(|c| if c == '\n' || c == '\t' { ' ' } else { c })
        .collect();
    format!(
        "{}\t{}\t{}\t{}",
        result.decision.as_str(),
        result.source,
        command,
        result.reason.replace('\n', "; ")
    )
}

pub fn log_decision(command: &str, result: &RuleMatch) {
    log::info!("{}", format_decision(command, result));
}
