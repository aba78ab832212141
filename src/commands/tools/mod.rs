//! Subcommand-aware evaluators for specific CLI tools.
//!
//! Each module implements `CommandSpec` with tool-specific
//! logic: subcommand extraction, read-only vs mutating classification,
//! and env-gated auto-allow.

/// Subcommand-aware cargo evaluation (build → allow, install → ask, etc.).
pub mod cargo;
/// Docker and podman: global flags, read-only actions, object subcommands.
pub mod docker;
/// Subcommand-aware GitHub CLI evaluation (pr list → allow, pr create → ask, etc.).
pub mod gh;
/// Subcommand-aware git evaluation with env-gating and force-push detection.
pub mod git;
/// Subcommand-aware kubectl evaluation (get → allow, apply → ask, etc.).
pub mod kubectl;

use crate::eval::CommandContext;

/// Whether an env-gated subcommand may run: the gate var is configured and
/// set on this command.
fn env_gate_open(ctx: &CommandContext, config_env_var: &str) -> bool {
    !config_env_var.is_empty() && ctx.has_env(config_env_var)
}
