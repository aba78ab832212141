//! Subcommand-aware GitHub CLI evaluation.

use super::super::CommandSpec;
use super::env_gate_open;
use crate::config::GhConfig;
use crate::eval::{Classification, CommandContext};

/// Matches `gh <group> <action>` against two-word entries first, then the
/// one-word group (`gh status`, `gh api`).
pub struct GhSpec {
    read_only: Vec<String>,
    mutating: Vec<String>,
    allowed_with_config: Vec<String>,
    config_env_var: String,
}

impl GhSpec {
    pub fn from_config(config: &GhConfig) -> Self {
        Self {
            read_only: config.read_only.clone(),
            mutating: config.mutating.clone(),
            allowed_with_config: config.allowed_with_config.clone(),
            config_env_var: config.config_env_var.clone(),
        }
    }

    /// Get the two-word subcommand (e.g. "pr list") and one-word fallback.
    fn subcommands(ctx: &CommandContext) -> (String, String) {
        let mut words = ctx.args().iter().filter(|w| !w.starts_with('-'));
        let sub_one = words.next().cloned().unwrap_or_else(|| "?".to_string());
        let sub_two = match words.next() {
            Some(action) => format!("{sub_one} {action}"),
            None => String::new(),
        };
        (sub_two, sub_one)
    }

    fn listed(list: &[String], sub_two: &str, sub_one: &str) -> bool {
        list.iter().any(|s| s == sub_two || s == sub_one)
    }
}

impl CommandSpec for GhSpec {
    fn classify(&self, ctx: &CommandContext) -> Classification {
        let (sub_two, sub_one) = Self::subcommands(ctx);
        let shown = if sub_two.is_empty() { &sub_one } else { &sub_two };

        if Self::listed(&self.read_only, &sub_two, &sub_one) {
            return Classification::allow(format!("read-only gh {shown}"));
        }

        if Self::listed(&self.allowed_with_config, &sub_two, &sub_one)
            && env_gate_open(ctx, &self.config_env_var)
        {
            return Classification::allow(format!("gh {shown} with {}", self.config_env_var));
        }

        if Self::listed(&self.mutating, &sub_two, &sub_one) {
            return Classification::ask(format!("gh {shown} requires confirmation"));
        }

        Classification::ask(format!("gh {sub_one} requires confirmation"))
    }
}
