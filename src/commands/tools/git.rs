//! Subcommand-aware git evaluation.
//!
//! Global options (`-C dir`, `-c key=value`, `--git-dir=...`) are skipped
//! before the subcommand is read. Listing forms of otherwise mutating
//! subcommands (`git branch -a`, `git stash list`, `git config --get`) allow.

use super::super::{CommandSpec, first_operand};
use super::env_gate_open;
use crate::config::GitConfig;
use crate::eval::{Classification, CommandContext};

/// Global options whose value is the next word.
const GLOBAL_FLAGS_WITH_VALUE: &[&str] = &["-C", "-c", "--git-dir", "--work-tree", "--namespace"];

/// Flags that turn `branch`/`tag` back into their listing mode.
const LIST_FLAGS: &[&str] = &[
    "-l",
    "--list",
    "-n",
    "--contains",
    "--no-contains",
    "--merged",
    "--no-merged",
    "--points-at",
    "--show-current",
];

const BRANCH_WRITE_FLAGS: &[&str] = &[
    "-d",
    "-D",
    "--delete",
    "-m",
    "-M",
    "--move",
    "-c",
    "-C",
    "--copy",
    "-f",
    "--force",
    "-u",
    "--set-upstream-to",
    "--unset-upstream",
    "--edit-description",
];

const TAG_WRITE_FLAGS: &[&str] = &[
    "-d", "--delete", "-a", "--annotate", "-s", "--sign", "-u", "-f", "--force", "-m", "-F",
];

const CONFIG_READ_FLAGS: &[&str] = &[
    "--get",
    "--get-all",
    "--get-regexp",
    "--get-urlmatch",
    "-l",
    "--list",
];

const CONFIG_WRITE_FLAGS: &[&str] = &[
    "--add",
    "--unset",
    "--unset-all",
    "--replace-all",
    "--rename-section",
    "--remove-section",
    "-e",
    "--edit",
];

/// Subcommand-aware git evaluator.
///
/// Evaluation order:
/// 1. Force-push → ASK regardless of config
/// 2. Read-only subcommands and listing forms → ALLOW
/// 3. Env-gated subcommands → ALLOW if env var present, else ASK
/// 4. `--version` → ALLOW
/// 5. Everything else → ASK
pub struct GitSpec {
    read_only: Vec<String>,
    allowed_with_config: Vec<String>,
    config_env_var: String,
    force_push_flags: Vec<String>,
}

impl GitSpec {
    pub fn from_config(config: &GitConfig) -> Self {
        Self {
            read_only: config.read_only.clone(),
            allowed_with_config: config.allowed_with_config.clone(),
            config_env_var: config.config_env_var.clone(),
            force_push_flags: config.force_push_flags.clone(),
        }
    }

    /// The git subcommand word and the words after it.
    fn subcommand<'a>(ctx: &CommandContext<'a>) -> Option<(&'a str, &'a [String])> {
        let args = ctx.args();
        let i = first_operand(args, GLOBAL_FLAGS_WITH_VALUE)?;
        Some((args[i].as_str(), &args[i + 1..]))
    }

    fn is_force_push(&self, rest: &[String]) -> bool {
        rest.iter().any(|w| {
            // `git push origin +main` force-updates the ref
            w.starts_with('+')
                || self.force_push_flags.iter().any(|f| {
                    w == f || w.strip_prefix(f.as_str()).is_some_and(|r| r.starts_with('='))
                })
        })
    }
}

fn has_any(rest: &[String], flags: &[&str]) -> bool {
    rest.iter().any(|w| {
        let name = w.split_once('=').map_or(w.as_str(), |(name, _)| name);
        flags.contains(&name)
    })
}

fn operands(rest: &[String]) -> usize {
    rest.iter().filter(|w| !w.starts_with('-')).count()
}

/// Whether `sub` with `rest` only lists or reads state.
fn is_listing(sub: &str, rest: &[String]) -> bool {
    match sub {
        "branch" => {
            !has_any(rest, BRANCH_WRITE_FLAGS) && (operands(rest) == 0 || has_any(rest, LIST_FLAGS))
        }
        "tag" => {
            !has_any(rest, TAG_WRITE_FLAGS) && (operands(rest) == 0 || has_any(rest, LIST_FLAGS))
        }
        "remote" => match rest.iter().find(|w| !w.starts_with('-')) {
            None => true,
            Some(action) => matches!(action.as_str(), "show" | "get-url"),
        },
        "stash" => matches!(
            rest.iter().find(|w| !w.starts_with('-')).map(String::as_str),
            Some("list" | "show")
        ),
        "config" => {
            !has_any(rest, CONFIG_WRITE_FLAGS)
                && (has_any(rest, CONFIG_READ_FLAGS) || operands(rest) == 1)
        }
        _ => false,
    }
}

impl CommandSpec for GitSpec {
    fn classify(&self, ctx: &CommandContext) -> Classification {
        let Some((sub, rest)) = Self::subcommand(ctx) else {
            if ctx.has_any_flag(&["--version", "--help"]) {
                return Classification::allow("git --version");
            }
            return Classification::ask("git with no subcommand");
        };

        // Force-push → ask regardless of config
        if sub == "push" && self.is_force_push(rest) {
            return Classification::ask("git force-push requires confirmation");
        }

        if self.read_only.iter().any(|s| s == sub) {
            return Classification::allow(format!("read-only git {sub}"));
        }

        if is_listing(sub, rest) {
            return Classification::allow(format!("git {sub} (listing)"));
        }

        // Write git subcommands require the configured env var
        if self.allowed_with_config.iter().any(|s| s == sub) {
            if env_gate_open(ctx, &self.config_env_var) {
                return Classification::allow(format!("git {sub} with {}", self.config_env_var));
            }
            return Classification::ask(format!("git {sub} requires confirmation"));
        }

        Classification::ask(format!("git {sub} requires confirmation"))
    }
}
