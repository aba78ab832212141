//! cc-shellgate: classify shell commands an AI agent wants to run as
//! allow, ask or deny.
//!
//! A command string is parsed with tree-sitter-bash, flattened into every
//! simple command and redirect it would run (including those hidden in
//! substitutions and heredocs), and each piece is resolved through user rules,
//! the built-in allowlist and per-tool handlers. The strictest verdict wins.
//! Anything unknown or unparseable resolves to `ask`, never `allow`.
//!
//! # Architecture
//!
//! - **[`path`]**: lexical path normalization.
//! - **[`pattern`]**: command and path glob dialects.
//! - **[`parse`]**: tree-sitter front end and the extractor.
//! - **[`rules`]**: ordered user rules and the allowlist.
//! - **[`commands`]**: handlers for specific tools and wrappers.
//! - **[`eval`]**: the engine, registry, decision types and combiner.
//! - **[`config`]**: embedded defaults plus user overlays.
//! - **[`logging`]**: decision log for the hook binary.

/// Command handlers and the `CommandSpec` trait.
pub mod commands;
/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Classification engine: registry, decision types, combination.
pub mod eval;
/// File-based decision logging.
pub mod logging;
/// Shell parsing: tree-sitter conversion, extraction, tokenizing.
pub mod parse;
/// Path normalization.
pub mod path;
/// Glob matching for command and path rules.
pub mod pattern;
/// User rules and the allowlist.
pub mod rules;

use eval::{Engine, RuleMatch};

/// Classify `text` as run from `cwd` with the embedded default configuration.
///
/// For user config, build an [`Engine`] from [`config::Config::load`].
pub fn classify(text: &str, cwd: &str) -> RuleMatch {
    match Engine::from_config(&config::Config::default_config()) {
        Ok(engine) => engine.classify(text, cwd),
        Err(e) => RuleMatch::default_ask(format!("invalid configuration: {e}")),
    }
}

/// Classify `text` with the default configuration from `/work`, with `~` as
/// `/home/user`. Deterministic regardless of the caller's environment.
pub fn evaluate(text: &str) -> RuleMatch {
    let paths = path::PathContext::new("/work", Some("/home/user".into()));
    match Engine::from_config(&config::Config::default_config()) {
        Ok(engine) => engine.classify_with(text, &paths),
        Err(e) => RuleMatch::default_ask(format!("invalid configuration: {e}")),
    }
}
