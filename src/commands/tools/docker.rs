//! Docker and podman evaluation.
//!
//! Global options are skipped to find the action. Object commands
//! (`image`, `container`, `compose`, ...) are keyed on their own action word.
//! `export`/`save` write to stdout unless `-o` names a file, which is then
//! reported as a write.

use std::collections::BTreeMap;

use super::super::CommandSpec;
use crate::config::DockerConfig;
use crate::eval::{Classification, CommandContext};

/// `compose` options whose value is the next word.
const COMPOSE_FLAGS_WITH_VALUE: &[&str] = &[
    "-f",
    "--file",
    "-p",
    "--project-name",
    "--project-directory",
    "--env-file",
    "--profile",
    "--ansi",
];

pub struct DockerSpec {
    global_flags_with_value: Vec<String>,
    read_only: Vec<String>,
    read_only_subcommands: BTreeMap<String, Vec<String>>,
}

impl DockerSpec {
    pub fn from_config(config: &DockerConfig) -> Self {
        Self {
            global_flags_with_value: config.global_flags_with_value.clone(),
            read_only: config.read_only.clone(),
            read_only_subcommands: config.read_only_subcommands.clone(),
        }
    }

    /// Index of the first word that is not a flag, skipping flag values.
    fn next_word(words: &[String], flags_with_value: &[&str]) -> Option<usize> {
        let mut i = 0;
        while i < words.len() {
            let word = words[i].as_str();
            if !word.starts_with('-') {
                return Some(i);
            }
            i += if flags_with_value.contains(&word) { 2 } else { 1 };
        }
        None
    }

    /// The file named by `-o FILE`, `-oFILE` or `--output[=]FILE`.
    fn output_file(rest: &[String]) -> Option<String> {
        let mut iter = rest.iter();
        while let Some(word) = iter.next() {
            if word == "-o" || word == "--output" {
                return iter.next().cloned();
            }
            if let Some(path) = word.strip_prefix("--output=") {
                return Some(path.to_string());
            }
            if let Some(path) = word.strip_prefix("-o")
                && !path.is_empty()
                && !word.starts_with("--")
            {
                return Some(path.to_string());
            }
        }
        None
    }

    fn is_read_only_sub(&self, object: &str, action: &str) -> bool {
        self.read_only_subcommands
            .get(object)
            .is_some_and(|subs| subs.iter().any(|s| s == action))
    }

    /// Allow a read-only action, reporting any `-o FILE` as a write.
    fn read(description: String, rest: &[String]) -> Classification {
        match Self::output_file(rest) {
            Some(path) => Classification::allow(description).with_writes(vec![path]),
            None => Classification::allow(description),
        }
    }
}

impl CommandSpec for DockerSpec {
    fn classify(&self, ctx: &CommandContext) -> Classification {
        let base = ctx.base_command();
        let args = ctx.args();
        let global: Vec<&str> = self.global_flags_with_value.iter().map(String::as_str).collect();
        let Some(i) = Self::next_word(args, &global) else {
            if ctx.has_any_flag(&["--version", "-v"]) {
                return Classification::allow(format!("{base} --version"));
            }
            return Classification::ask(format!("{base} with no action"));
        };
        let action = args[i].as_str();
        let rest = &args[i + 1..];

        if self.read_only_subcommands.contains_key(action) {
            let flags: &[&str] = if action == "compose" {
                COMPOSE_FLAGS_WITH_VALUE
            } else {
                &[]
            };
            let Some(j) = Self::next_word(rest, flags) else {
                return Classification::ask(format!("{base} {action} requires confirmation"));
            };
            let sub = rest[j].as_str();
            if self.is_read_only_sub(action, sub) {
                return Self::read(format!("read-only {base} {action} {sub}"), &rest[j + 1..]);
            }
            return Classification::ask(format!("{base} {action} {sub} requires confirmation"));
        }

        if self.read_only.iter().any(|s| s == action) {
            return Self::read(format!("read-only {base} {action}"), rest);
        }

        Classification::ask(format!("{base} {action} requires confirmation"))
    }
}
