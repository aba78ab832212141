//! Subcommand-aware cargo evaluation.
//!
//! Distinguishes safe subcommands (build, test, clippy) from mutating ones
//! (install, publish). Supports env-gated auto-allow and `--version`/`-V` detection.

use super::super::{CommandSpec, first_operand};
use super::env_gate_open;
use crate::config::CargoConfig;
use crate::eval::{Classification, CommandContext};

/// Global options whose value is the next word (`cargo --config k=v build`).
const GLOBAL_FLAGS_WITH_VALUE: &[&str] = &["--config", "-Z", "--color", "-C"];

/// Subcommand-aware cargo evaluator.
///
/// Evaluation order:
/// 1. Safe subcommands → ALLOW
/// 2. Env-gated subcommands → ALLOW if env var present, else ASK
/// 3. `--version` / `-V` → ALLOW
/// 4. Everything else → ASK
pub struct CargoSpec {
    /// Subcommands that are always safe (e.g. `build`, `test`, `check`).
    safe_subcommands: Vec<String>,
    /// Subcommands allowed only when `config_env_var` is present.
    allowed_with_config: Vec<String>,
    /// Env var name that gates `allowed_with_config` subcommands.
    config_env_var: String,
}

impl CargoSpec {
    /// Build a cargo spec from configuration.
    pub fn from_config(config: &CargoConfig) -> Self {
        Self {
            safe_subcommands: config.safe_subcommands.clone(),
            allowed_with_config: config.allowed_with_config.clone(),
            config_env_var: config.config_env_var.clone(),
        }
    }

    /// Extract the cargo subcommand (first non-flag word after "cargo").
    /// A `+toolchain` selector is skipped.
    fn subcommand<'a>(ctx: &CommandContext<'a>) -> Option<&'a str> {
        let args = ctx.args();
        let args = match args.first() {
            Some(first) if first.starts_with('+') => &args[1..],
            _ => args,
        };
        first_operand(args, GLOBAL_FLAGS_WITH_VALUE).map(|i| args[i].as_str())
    }
}

impl CommandSpec for CargoSpec {
    fn classify(&self, ctx: &CommandContext) -> Classification {
        let Some(sub) = Self::subcommand(ctx) else {
            // --version / -V with no subcommand
            if ctx.has_any_flag(&["--version", "-V"]) {
                return Classification::allow("cargo --version");
            }
            return Classification::ask("cargo with no subcommand");
        };

        if self.safe_subcommands.iter().any(|s| s == sub) {
            return Classification::allow(format!("cargo {sub}"));
        }

        // Env-gated subcommands: allowed only when config_env_var is set and present
        if self.allowed_with_config.iter().any(|s| s == sub) {
            if env_gate_open(ctx, &self.config_env_var) {
                return Classification::allow(format!("cargo {sub} with {}", self.config_env_var));
            }
            return Classification::ask(format!("cargo {sub} requires confirmation"));
        }

        Classification::ask(format!("cargo {sub} requires confirmation"))
    }
}
