//! Flag-gated commands.
//!
//! A [`FlagSpec`] allows its command unless an unsafe flag is present, a
//! restricted flag carries a value outside its allowed set, or (for dry-run
//! gated commands like `rsync`) none of the required flags is present. Flags
//! that name an output file (`sort -o FILE`) are reported as writes so they go
//! through the redirect rules.

use super::CommandSpec;
use crate::config::FlagConfig;
use crate::eval::{Classification, CommandContext};

pub struct FlagSpec {
    unsafe_flags: Vec<String>,
    writes: Vec<String>,
    require_any: Vec<String>,
    restricted: Vec<(String, Vec<String>)>,
}

impl FlagSpec {
    pub fn from_config(config: &FlagConfig) -> Self {
        Self {
            unsafe_flags: config.unsafe_flags.clone(),
            writes: config.writes.clone(),
            require_any: config.require_any.clone(),
            restricted: config
                .restricted
                .iter()
                .map(|(flag, values)| (flag.clone(), values.clone()))
                .collect(),
        }
    }
}

/// Single-letter flag such as `-i`.
fn is_short(flag: &str) -> bool {
    flag.len() == 2 && flag.starts_with('-') && flag != "--"
}

/// Whether `word` spells `flag`: exactly, as `--flag=value`, with an attached
/// value (`-i.bak`), or inside a cluster of short flags (`-ni`).
fn matches_flag(word: &str, flag: &str) -> bool {
    if word == flag {
        return true;
    }
    if flag.starts_with("--") {
        return word
            .strip_prefix(flag)
            .is_some_and(|rest| rest.starts_with('='));
    }
    if !is_short(flag) || word.starts_with("--") || !word.starts_with('-') {
        return false;
    }
    let letter = &flag[1..];
    word.starts_with(flag)
        || (word[1..].chars().all(|c| c.is_ascii_alphanumeric()) && word[1..].contains(letter))
}

/// The value of `flag` at `args[i]`, if `args[i]` spells it. A short flag
/// may sit in a cluster: `-uo FILE` takes the next word, `-uoFILE` the rest.
fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Option<&'a str> {
    let word = args[i].as_str();
    if word == flag {
        return args.get(i + 1).map(String::as_str);
    }
    if flag.starts_with("--") {
        return word.strip_prefix(flag)?.strip_prefix('=');
    }
    if !is_short(flag) || word.starts_with("--") {
        return None;
    }
    let letter = flag.chars().nth(1)?;
    let cluster = word.strip_prefix('-')?;
    let at = cluster.find(letter)?;
    if !cluster[..at].chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    match &cluster[at + letter.len_utf8()..] {
        "" => args.get(i + 1).map(String::as_str),
        value => Some(value),
    }
}

/// Prefer the long spelling when describing a missing flag.
fn display_flag(flags: &[String]) -> &str {
    flags
        .iter()
        .find(|f| f.starts_with("--"))
        .or_else(|| flags.first())
        .map_or("", String::as_str)
}

impl CommandSpec for FlagSpec {
    fn classify(&self, ctx: &CommandContext) -> Classification {
        let name = ctx.base_command();
        let args = ctx.args();
        let end = args.iter().position(|a| a == "--").unwrap_or(args.len());
        let flags = &args[..end];

        let mut writes = Vec::new();
        let mut has_required = false;
        for (i, word) in flags.iter().enumerate() {
            if !word.starts_with('-') {
                continue;
            }
            if self.unsafe_flags.iter().any(|f| matches_flag(word, f)) {
                return Classification::ask(format!("{name} {word}"));
            }
            for (flag, allowed) in &self.restricted {
                if let Some(value) = flag_value(flags, i, flag)
                    && !allowed.iter().any(|a| a.eq_ignore_ascii_case(value))
                {
                    return Classification::ask(format!("{name} {flag} {value}"));
                }
            }
            for flag in &self.writes {
                if let Some(path) = flag_value(flags, i, flag) {
                    writes.push(path.to_string());
                }
            }
            if self.require_any.iter().any(|f| matches_flag(word, f)) {
                has_required = true;
            }
        }

        if !self.require_any.is_empty() && !has_required {
            return Classification::ask(format!(
                "{name} without {}",
                display_flag(&self.require_any)
            ));
        }
        if writes.is_empty() {
            return Classification::allow(name);
        }
        let description = format!("{name} writes {}", writes.join(", "));
        Classification::allow(description).with_writes(writes)
    }
}
