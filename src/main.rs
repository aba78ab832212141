//! cc-shellgate: PreToolUse hook that gates Bash commands.
//!
//! Reads the hook JSON from stdin and writes a permission decision to stdout.
//!
//! ```text
//! cc-shellgate                    hook mode (stdin -> stdout)
//! cc-shellgate --check "<cmd>"    classify one command, print LABEL: reason
//! cc-shellgate --dump-config      print the merged configuration
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::exit;

use serde::Deserialize;

use cc_shellgate::config::Config;
use cc_shellgate::eval::Engine;
use cc_shellgate::logging;

#[derive(Deserialize)]
struct HookInput {
    tool_name: Option<String>,
    tool_input: Option<ToolInput>,
    cwd: Option<String>,
}

#[derive(Deserialize)]
struct ToolInput {
    command: Option<String>,
}

/// Load config or exit 1. A broken overlay must not silently change policy.
fn load_config(cwd: &Path) -> Config {
    match Config::load(cwd) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("cc-shellgate: {e}");
            exit(1);
        }
    }
}

fn build_engine(config: &Config) -> Engine {
    match Engine::from_config(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("cc-shellgate: {e}");
            exit(1);
        }
    }
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"))
}

fn check(command: &str) {
    let cwd = current_dir();
    let engine = build_engine(&load_config(&cwd));
    let result = engine.classify(command, &cwd.to_string_lossy());
    println!("{}: {}", result.decision.label(), result.reason);
}

fn dump_config() {
    let config = load_config(&current_dir());
    match config.to_toml() {
        Ok(text) => print!("{text}"),
        Err(e) => {
            eprintln!("cc-shellgate: cannot serialize config: {e}");
            exit(1);
        }
    }
}

fn hook() {
    let mut input = String::new();
    if std::io::stdin().read_to_string(&mut input).is_err() {
        eprintln!("failed to read stdin");
        exit(1);
    }

    let hook_input: HookInput = match serde_json::from_str(&input) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("JSON parse error: {e}");
            exit(1);
        }
    };

    if hook_input.tool_name.as_deref() != Some("Bash") {
        exit(0);
    }

    let command = hook_input
        .tool_input
        .and_then(|t| t.command)
        .unwrap_or_default();

    if command.is_empty() {
        exit(0);
    }

    let cwd = hook_input.cwd.map(PathBuf::from).unwrap_or_else(current_dir);
    let config = load_config(&cwd);
    // Best-effort: a missing log never blocks a decision
    let _ = logging::init(&config.settings);
    let engine = build_engine(&config);

    let result = engine.classify(&command, &cwd.to_string_lossy());
    logging::log_decision(&command, &result);

    let output = serde_json::json!({
        "hookSpecificOutput": {
            "hookEventName": "PreToolUse",
            "permissionDecision": result.decision.as_str(),
            "permissionDecisionReason": result.reason,
        }
    });

    println!("{output}");
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None => hook(),
        Some("--check") => match args.get(1) {
            Some(command) => check(command),
            None => {
                eprintln!("usage: cc-shellgate --check \"<command>\"");
                exit(2);
            }
        },
        Some("--dump-config") => dump_config(),
        Some(other) => {
            eprintln!("cc-shellgate: unknown argument {other}");
            exit(2);
        }
    }
}
