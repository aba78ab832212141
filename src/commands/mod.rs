//! Command handlers: per-tool logic for deciding allow/ask/deny.
//!
//! Each handler implements [`CommandSpec`] and is registered under one or more
//! command names in the [`CommandRegistry`](crate::eval::CommandRegistry).
//! Handlers come in four shapes:
//!
//! - subcommand-keyed ([`tools`]): git, cargo, kubectl, gh, docker;
//! - flag-gated ([`flags`]): safe unless a listed flag is present, or unsafe
//!   unless a dry-run flag is present;
//! - argument-count-gated ([`arity`]): view forms with few arguments;
//! - delegating ([`wrapper`]): unwrap `sudo`, `env`, `xargs`, `bash -c` and
//!   aliases so the inner command is classified on its own.

/// Argument-count-gated commands (`hostname`, `umask`).
pub mod arity;
/// Flag-gated commands (`sed -i`, `find -exec`, `rsync --dry-run`).
pub mod flags;
/// `tee`, which writes its file arguments.
pub mod tee;
/// Subcommand-aware evaluators for specific CLI tools.
pub mod tools;
/// Delegating handlers for wrappers, `env`, `xargs`, shells and aliases.
pub mod wrapper;

use crate::eval::{Classification, CommandContext};

/// Trait for command classification handlers.
///
/// Implementations must be pure: the registry is shared read-only across
/// classifications.
pub trait CommandSpec: Send + Sync {
    /// Classify the command in the given context.
    fn classify(&self, ctx: &CommandContext) -> Classification;
}

/// Index of the first argument that is not a flag, skipping the values of
/// `flags_with_value`. `--` ends flag parsing.
pub(crate) fn first_operand(args: &[String], flags_with_value: &[&str]) -> Option<usize> {
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        if arg == "--" {
            return (i + 1 < args.len()).then_some(i + 1);
        }
        if !arg.starts_with('-') || arg == "-" {
            return Some(i);
        }
        i += if flags_with_value.contains(&arg) { 2 } else { 1 };
    }
    None
}
