//! Delegating handlers.
//!
//! These never decide on their own account (except for degenerate forms like a
//! bare `sudo`). They strip their own flags and hand the wrapped command back
//! to the engine, which classifies it from scratch, config rules included, and
//! raises the result to the wrapper's floor.

use super::{CommandSpec, first_operand};
use crate::eval::{Classification, CommandContext, Decision, Delegation};
use crate::parse::tokenize;

/// Flags that take the next word as their value, per wrapper.
fn value_flags(name: &str) -> &'static [&'static str] {
    match name {
        "timeout" => &["-s", "--signal", "-k", "--kill-after"],
        "nice" => &["-n", "--adjustment"],
        "strace" | "ltrace" => &["-o", "-e", "-p", "-s", "-u", "-a", "-P", "-E"],
        "watch" => &["-n", "--interval"],
        "sudo" => &["-u", "-g", "-C", "-h", "-p", "-U", "-r", "-t", "-D"],
        "doas" => &["-u", "-C"],
        "pkexec" => &["--user"],
        _ => &[],
    }
}

/// `10`, `2.5`, `30s`, `5m`, `1h`, `2d`.
fn is_duration(word: &str) -> bool {
    let number = word
        .strip_suffix(|c: char| matches!(c, 's' | 'm' | 'h' | 'd'))
        .unwrap_or(word);
    !number.is_empty() && number.parse::<f64>().is_ok()
}

/// `time`, `timeout`, `nice`, `sudo` and the like: run another command.
pub struct WrapperSpec {
    floor: Decision,
}

impl WrapperSpec {
    pub fn new(floor: Decision) -> Self {
        Self { floor }
    }
}

impl CommandSpec for WrapperSpec {
    fn classify(&self, ctx: &CommandContext) -> Classification {
        let name = ctx.base_command();
        let lookup = ctx.args().first().is_some_and(|a| a == "-v" || a == "-V");
        if name == "command" && lookup {
            return Classification::allow("command lookup");
        }

        let args = ctx.args();
        let Some(mut start) = first_operand(args, value_flags(name)) else {
            return Classification::decided(self.floor, format!("{name} with no command"));
        };
        // `timeout 10 cmd`: the duration comes before the command
        if name == "timeout" && is_duration(&args[start]) {
            start += 1;
        }
        let inner = &args[start..];
        if inner.is_empty() {
            return Classification::decided(self.floor, format!("{name} with no command"));
        }

        let description = format!("{name} wrapper");
        // watch joins its words with spaces and hands the result to `sh -c`
        if name == "watch" {
            return Classification::delegate(description, Delegation::Script(inner.join(" ")), self.floor);
        }
        Classification::delegate(description, Delegation::Tokens(inner.to_vec()), self.floor)
    }
}

const ENV_VALUE_FLAGS: &[&str] = &["-u", "--unset", "-C", "--chdir"];

/// `env [-i] [-u NAME] [NAME=value]... [COMMAND...]`.
///
/// Assignments stay on the delegated tokens. The engine peels them into the
/// inner command's env, so env-gated handlers still see them.
pub struct EnvSpec;

impl CommandSpec for EnvSpec {
    fn classify(&self, ctx: &CommandContext) -> Classification {
        let args = ctx.args();
        let mut i = 0;
        while i < args.len() {
            let arg = args[i].as_str();
            if arg == "--" {
                i += 1;
                break;
            }
            if matches!(arg, "-S" | "--split-string") {
                let script = args[i + 1..].join(" ");
                if script.is_empty() {
                    return Classification::ask("env -S with no command");
                }
                return Classification::delegate("env -S", Delegation::Script(script), Decision::Allow);
            }
            if let Some(script) = arg.strip_prefix("--split-string=") {
                let mut script = script.to_string();
                for rest in &args[i + 1..] {
                    script.push(' ');
                    script.push_str(rest);
                }
                return Classification::delegate("env -S", Delegation::Script(script), Decision::Allow);
            }
            if !arg.starts_with('-') {
                break;
            }
            i += if ENV_VALUE_FLAGS.contains(&arg) { 2 } else { 1 };
        }

        let inner = args.get(i..).unwrap_or_default();
        let has_command = inner
            .iter()
            .any(|w| crate::parse::split_assignment(w).is_none());
        if !has_command {
            return Classification::allow("env prints the environment");
        }
        Classification::delegate("env", Delegation::Tokens(inner.to_vec()), Decision::Allow)
    }
}

const XARGS_VALUE_FLAGS: &[&str] = &[
    "-a",
    "--arg-file",
    "-d",
    "--delimiter",
    "-E",
    "-I",
    "-L",
    "-n",
    "--max-args",
    "-P",
    "--max-procs",
    "-s",
    "--max-chars",
    "--process-slot-var",
];

const XARGS_INTERACTIVE: &[&str] = &["-p", "--interactive", "-o", "--open-tty"];

/// `xargs [flags] [COMMAND...]`: runs COMMAND (default `echo`) with stdin as
/// extra arguments.
pub struct XargsSpec;

impl CommandSpec for XargsSpec {
    fn classify(&self, ctx: &CommandContext) -> Classification {
        let args = ctx.args();
        let start = first_operand(args, XARGS_VALUE_FLAGS);
        let flags = &args[..start.unwrap_or(args.len())];
        if flags.iter().any(|f| XARGS_INTERACTIVE.contains(&f.as_str())) {
            return Classification::ask("xargs prompts on the terminal");
        }
        let inner = match start {
            Some(i) => args[i..].to_vec(),
            None => vec!["echo".to_string()],
        };
        Classification::delegate("xargs", Delegation::Tokens(inner), Decision::Allow)
    }
}

/// `bash -c SCRIPT` and friends. The script is parsed again in full.
pub struct ShellSpec;

impl CommandSpec for ShellSpec {
    fn classify(&self, ctx: &CommandContext) -> Classification {
        let name = ctx.base_command();
        let args = ctx.args();
        for (i, arg) in args.iter().enumerate() {
            if !arg.starts_with('-') || arg == "-" || arg == "--" {
                break;
            }
            if !arg.starts_with("--") && arg.contains('c') {
                return match args.get(i + 1) {
                    Some(script) => Classification::delegate(
                        format!("{name} -c"),
                        Delegation::Script(script.clone()),
                        Decision::Allow,
                    ),
                    None => Classification::ask(format!("{name} -c with no script")),
                };
            }
        }
        match first_operand(args, &["-o", "-O", "--rcfile", "--init-file"]) {
            Some(i) => Classification::ask(format!("{name} runs script {}", args[i])),
            None => Classification::ask(format!("{name} interactive")),
        }
    }
}

/// A configured alias: `k get pods` is classified as `kubectl get pods`.
pub struct AliasSpec {
    target: Vec<String>,
}

impl AliasSpec {
    pub fn new(target: &str) -> Self {
        Self {
            target: tokenize(target),
        }
    }
}

impl CommandSpec for AliasSpec {
    fn classify(&self, ctx: &CommandContext) -> Classification {
        if self.target.is_empty() {
            return Classification::ask(format!("alias {} is empty", ctx.base_command()));
        }
        let mut inner = self.target.clone();
        inner.extend(ctx.args().iter().cloned());
        Classification::delegate(
            format!("alias {} for {}", ctx.base_command(), self.target.join(" ")),
            Delegation::Tokens(inner),
            Decision::Allow,
        )
    }
}
