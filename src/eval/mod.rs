pub mod combine;
pub mod context;
pub mod decision;
pub mod registry;

pub use combine::{Verdict, combine};
pub use context::CommandContext;
pub use decision::{Classification, Decision, Delegation, Outcome, RuleMatch, Source};
pub use registry::CommandRegistry;

use crate::config::{Config, ConfigError};
use crate::parse::{self, Origin, RedirectOp};
use crate::path::{PathContext, normalize_path, normalize_token};
use crate::rules::RuleStore;

/// Delegation deeper than this resolves to `ask`.
pub const MAX_DELEGATION_DEPTH: usize = 32;

/// Second words that only print usage or a version string.
const HELP_PROBES: &[&str] = &["--help", "-h", "--version", "help", "version"];

/// The classification engine: rules, allowlist and handlers, immutable once
/// built and safe to share across threads.
pub struct Engine {
    rules: RuleStore,
    registry: CommandRegistry,
    redirect_default: Decision,
}

/// Resolution of one command: its verdict plus the files it writes itself.
struct Resolved {
    result: RuleMatch,
    writes: Vec<String>,
}

impl Resolved {
    fn plain(result: RuleMatch) -> Self {
        Self {
            result,
            writes: Vec::new(),
        }
    }
}

impl Engine {
    pub fn new(rules: RuleStore, registry: CommandRegistry) -> Self {
        Self {
            rules,
            registry,
            redirect_default: Decision::Ask,
        }
    }

    /// Verdict for a redirect write no rule matches.
    pub fn with_redirect_default(mut self, decision: Decision) -> Self {
        self.redirect_default = decision;
        self
    }

    /// Build an engine from merged configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let rules = RuleStore::new(config.rule_list()?, config.allowlist.commands.iter().cloned());
        Ok(Self::new(rules, CommandRegistry::from_config(config))
            .with_redirect_default(config.settings.redirect_default.decision()))
    }

    /// Classify a full command string run from `cwd`, with `~` taken from
    /// `$HOME`.
    pub fn classify(&self, text: &str, cwd: &str) -> RuleMatch {
        self.classify_with(text, &PathContext::from_env(cwd))
    }

    /// Classify a full command string in an explicit path context.
    pub fn classify_with(&self, text: &str, paths: &PathContext) -> RuleMatch {
        if text.trim().is_empty() {
            return RuleMatch::default_ask("empty command");
        }
        self.classify_script(text, paths, paths, &[], 0)
    }

    /// Parse and classify shell source. `paths` locates the source (it moves
    /// for `bash -c` run after a `cd`); `base` anchors rule patterns.
    fn classify_script(
        &self,
        text: &str,
        paths: &PathContext,
        base: &PathContext,
        env: &[(String, String)],
        depth: usize,
    ) -> RuleMatch {
        let root = match parse::parse(text) {
            Ok(root) => root,
            Err(e) => {
                log::warn!("could not parse {:?}: {e}", parse::label(text));
                return self.unparsed(text, base);
            }
        };
        let extraction = parse::extract(&root, paths);
        log::debug!(
            "extracted {} commands, {} redirects, {} unsupported",
            extraction.commands.len(),
            extraction.redirects.len(),
            extraction.unsupported.len()
        );

        let mut verdicts = Vec::new();
        let mut writes = Vec::new();
        for cmd in &extraction.commands {
            let cmd_paths = paths.with_cwd(cmd.cwd.as_str());
            let mut cmd_env = env.to_vec();
            cmd_env.extend(cmd.env.iter().cloned());
            let resolved = self.classify_command(&cmd.tokens, &cmd_env, &cmd_paths, base, depth);
            verdicts.push(Verdict::new(
                &parse::render(&cmd.tokens),
                cmd.origin,
                resolved.result,
            ));
            for path in resolved.writes {
                writes.push((normalize_path(&path, &cmd_paths), cmd.origin));
            }
        }
        for kind in &extraction.unsupported {
            verdicts.push(Verdict::new(
                kind,
                Origin::TopLevel,
                RuleMatch::default_ask(format!("unsupported shell construct: {kind}")),
            ));
        }
        for redirect in &extraction.redirects {
            verdicts.push(Verdict::new(
                &format!("{} {}", redirect.op.as_str(), redirect.path),
                redirect.origin,
                self.classify_redirect(redirect.op, &redirect.path, base),
            ));
        }
        for (path, origin) in writes {
            if parse::is_inert_target(&path) {
                continue;
            }
            verdicts.push(Verdict::new(
                &format!("write {path}"),
                origin,
                self.classify_redirect(RedirectOp::Write, &path, base),
            ));
        }
        combine(verdicts)
    }

    /// Unparseable input: only a `deny` command rule can decide it; anything
    /// else asks.
    fn unparsed(&self, text: &str, base: &PathContext) -> RuleMatch {
        let tokens = parse::tokenize(text);
        match self.rules.match_command(&tokens, base) {
            Some(m) if m.decision == Decision::Deny => m,
            _ => RuleMatch::default_ask("could not parse command"),
        }
    }

    fn classify_redirect(&self, op: RedirectOp, path: &str, base: &PathContext) -> RuleMatch {
        if op == RedirectOp::Read {
            return RuleMatch::new(Decision::Allow, format!("reads {path}"), Source::Default);
        }
        self.rules.resolve_redirect(path, base).unwrap_or_else(|| {
            RuleMatch::new(self.redirect_default, format!("writes {path}"), Source::Default)
        })
    }

    /// Rules, allowlist, handler, help probe, default; in that order.
    fn classify_command(
        &self,
        tokens: &[String],
        env: &[(String, String)],
        paths: &PathContext,
        base: &PathContext,
        depth: usize,
    ) -> Resolved {
        if depth > MAX_DELEGATION_DEPTH {
            log::warn!("delegation depth exceeded at {:?}", parse::render(tokens));
            return Resolved::plain(RuleMatch::default_ask(format!(
                "delegation deeper than {MAX_DELEGATION_DEPTH} levels"
            )));
        }

        // Delegated tokens may still carry leading assignments (`env A=1 cmd`)
        let split = tokens
            .iter()
            .position(|t| parse::split_assignment(t).is_none())
            .unwrap_or(tokens.len());
        let mut env = env.to_vec();
        env.extend(
            tokens[..split]
                .iter()
                .filter_map(|t| parse::split_assignment(t))
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        let tokens = &tokens[split..];
        let Some(name) = tokens.first() else {
            return Resolved::plain(RuleMatch::new(
                Decision::Allow,
                "only sets variables",
                Source::Default,
            ));
        };

        let normalized: Vec<String> = tokens
            .iter()
            .map(|t| normalize_token(t, paths).into_owned())
            .collect();
        if let Some(m) = self.rules.resolve_command(&normalized, base) {
            return Resolved::plain(m);
        }
        let Some(spec) = self.registry.get(name) else {
            if is_help_probe(tokens) {
                return Resolved::plain(RuleMatch::new(
                    Decision::Allow,
                    format!("{name} help/version probe"),
                    Source::Allowlist,
                ));
            }
            return Resolved::plain(RuleMatch::default_ask(format!(
                "unrecognized command: {name}"
            )));
        };

        let classification = spec.classify(&CommandContext::new(tokens, &env, &paths.cwd));
        let source = Source::Handler(name.clone());
        match classification.outcome {
            Outcome::Decided(decision) => Resolved {
                result: RuleMatch::new(decision, classification.description, source),
                writes: classification.writes,
            },
            Outcome::Delegate { inner, floor } => {
                log::debug!("{name} delegates at depth {depth}: {inner:?}");
                let mut resolved = match inner {
                    Delegation::Tokens(inner) => {
                        self.classify_command(&inner, &env, paths, base, depth + 1)
                    }
                    Delegation::Script(script) => Resolved::plain(self.classify_script(
                        &script,
                        paths,
                        base,
                        &env,
                        depth + 1,
                    )),
                };
                resolved.writes.extend(classification.writes);
                if floor > resolved.result.decision {
                    resolved.result = RuleMatch::new(
                        floor,
                        format!("{} -> {}", classification.description, resolved.result.reason),
                        source,
                    );
                }
                resolved
            }
        }
    }
}

/// `cmd --help`, `cmd version`. A path names a script, which may ignore
/// the flag.
fn is_help_probe(tokens: &[String]) -> bool {
    match tokens {
        [cmd, arg] => !cmd.contains('/') && HELP_PROBES.contains(&arg.as_str()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> PathContext {
        PathContext::new("/work", Some("/home/me".into()))
    }

    fn engine(overlay: &str) -> Engine {
        let config = Config::from_toml(overlay).unwrap();
        Engine::from_config(&config).unwrap()
    }

    fn run(engine: &Engine, cmd: &str) -> RuleMatch {
        engine.classify_with(cmd, &paths())
    }

    fn decide(engine: &Engine, cmd: &str) -> Decision {
        run(engine, cmd).decision
    }

    #[test]
    fn allowlisted_command() {
        let m = run(&engine(""), "ls -la");
        assert_eq!(m.decision, Decision::Allow);
        assert_eq!(m.source, Source::Allowlist);
    }

    #[test]
    fn unknown_command_asks() {
        let m = run(&engine(""), "rm -rf /tmp/build");
        assert_eq!(m.decision, Decision::Ask);
        assert_eq!(m.source, Source::Default);
        assert_eq!(m.reason, "unrecognized command: rm");
    }

    #[test]
    fn compound_takes_strictest() {
        let e = engine("[[rules]]\ndecision = \"deny\"\ncommand = \"rm -rf /\"\n");
        let m = run(&e, "echo hi; rm -rf /");
        assert_eq!(m.decision, Decision::Deny);
        assert!(m.reason.starts_with("rm -rf / -> DENY"), "{}", m.reason);
        assert!(m.reason.contains("[echo hi] -> ALLOW"), "{}", m.reason);
        assert_eq!(decide(&engine(""), "echo hi; rm -rf /"), Decision::Ask);
        assert_eq!(decide(&engine(""), "echo hi && ls"), Decision::Allow);
    }

    #[test]
    fn heredoc_quoting() {
        let e = engine("");
        assert_eq!(decide(&e, "cat <<'EOF'\n$(rm -rf /)\nEOF"), Decision::Allow);
        let m = run(&e, "cat <<EOF\n$(rm -rf /)\nEOF");
        assert_eq!(m.decision, Decision::Ask);
        assert!(m.reason.contains("heredoc $(rm -rf /)"), "{}", m.reason);
    }

    #[test]
    fn later_rule_wins() {
        let e = engine(
            "[[rules]]\ndecision = \"allow\"\ncommand = \"docker *\"\n\
             [[rules]]\ndecision = \"ask\"\ncommand = \"docker rm *\"\n",
        );
        assert_eq!(decide(&e, "docker rm x"), Decision::Ask);
        assert_eq!(decide(&e, "docker ps"), Decision::Allow);
        assert_eq!(decide(&e, "docker run --rm alpine"), Decision::Allow);
    }

    #[test]
    fn deny_rule_beats_allowlist() {
        let e = engine("[[rules]]\ndecision = \"deny\"\ncommand = \"cat /etc/shadow\"\n");
        assert_eq!(decide(&e, "cat /etc/shadow"), Decision::Deny);
        assert_eq!(decide(&e, "cat /etc/../etc/shadow"), Decision::Deny);
        assert_eq!(decide(&e, "cd /etc && cat ./shadow"), Decision::Deny);
        assert_eq!(decide(&e, "cat /etc/hosts"), Decision::Allow);
    }

    #[test]
    fn parse_failure_fails_safe() {
        let m = run(&engine(""), "echo 'unterminated");
        assert_eq!(m.decision, Decision::Ask);
        assert_eq!(m.reason, "could not parse command");
        let e = engine("[[rules]]\ndecision = \"deny\"\ncommand = \"rm *\"\n");
        assert_eq!(decide(&e, "rm -rf / 'oops"), Decision::Deny);
        let e = engine("[[rules]]\ndecision = \"allow\"\ncommand = \"echo *\"\n");
        assert_eq!(decide(&e, "echo 'unterminated"), Decision::Ask);
    }

    #[test]
    fn empty_and_comment_only() {
        let e = engine("");
        assert_eq!(decide(&e, "   "), Decision::Ask);
        let m = run(&e, "# just a comment");
        assert_eq!(m.decision, Decision::Allow);
        assert_eq!(m.reason, "nothing to run");
        assert_eq!(decide(&e, "FOO=bar"), Decision::Allow);
    }

    #[test]
    fn help_probes_allow() {
        let e = engine("");
        let m = run(&e, "rm --help");
        assert_eq!(m.decision, Decision::Allow);
        assert_eq!(m.source, Source::Allowlist);
        assert_eq!(decide(&e, "terraform --version"), Decision::Allow);
        assert_eq!(decide(&e, "terraform apply --help"), Decision::Ask);
        assert_eq!(decide(&e, "npm -v"), Decision::Ask);
        assert_eq!(decide(&e, "./deploy.sh --help"), Decision::Ask);
    }

    #[test]
    fn help_flag_does_not_hide_payload() {
        let e = engine("[[rules]]\ndecision = \"deny\"\ncommand = \"rm *\"\n");
        assert_eq!(decide(&e, "bash -c 'rm -rf /' --help"), Decision::Deny);
        assert_eq!(decide(&e, "sh -c 'rm -rf ~' --help"), Decision::Deny);
        assert_eq!(decide(&e, "sudo rm x --help"), Decision::Deny);
        for cmd in [
            "bash deploy.sh --help",
            "./deploy.sh prod --help",
            "python evil.py --help",
        ] {
            assert_eq!(decide(&e, cmd), Decision::Ask, "{cmd}");
        }
        let m = run(&e, "git --version");
        assert_eq!(m.decision, Decision::Allow);
        assert_eq!(m.source, Source::Handler("git".into()));
    }

    #[test]
    fn command_lookup_checks_first_argument() {
        let e = engine("[[rules]]\ndecision = \"deny\"\ncommand = \"rm *\"\n");
        assert_eq!(decide(&e, "command -v rm"), Decision::Allow);
        assert_eq!(decide(&e, "command rm -v important.txt"), Decision::Deny);
        assert_eq!(decide(&e, "command rm -rf build -v"), Decision::Deny);
    }

    #[test]
    fn wrapper_floor() {
        let e = engine("");
        assert_eq!(decide(&e, "time ls"), Decision::Allow);
        assert_eq!(decide(&e, "timeout 5 rm x"), Decision::Ask);
        let m = run(&e, "sudo ls");
        assert_eq!(m.decision, Decision::Ask);
        assert_eq!(m.reason, "sudo wrapper -> ls is read-only");
        assert_eq!(m.source, Source::Handler("sudo".into()));
    }

    #[test]
    fn delegated_commands_see_rules() {
        let e = engine("[[rules]]\ndecision = \"deny\"\ncommand = \"rm *\"\n");
        for cmd in [
            "sudo rm -rf x",
            "bash -c 'ls && rm x'",
            "find . -name '*.o' | xargs rm",
            "env -i rm x",
            "nice -n 5 timeout 10 rm x",
        ] {
            assert_eq!(decide(&e, cmd), Decision::Deny, "{cmd}");
        }
    }

    #[test]
    fn env_assignments_reach_inner_handler() {
        let e = engine("[git]\nallowed_with_config = [\"commit\"]\nconfig_env_var = \"GIT_OK\"\n");
        assert_eq!(decide(&e, "GIT_OK=1 git commit -m x"), Decision::Allow);
        assert_eq!(decide(&e, "env GIT_OK=1 git commit -m x"), Decision::Allow);
        assert_eq!(decide(&e, "GIT_OK=1 sudo git commit -m x"), Decision::Ask);
        assert_eq!(decide(&e, "git commit -m x"), Decision::Ask);
    }

    #[test]
    fn alias_loop_terminates() {
        let e = engine("[aliases]\nloop-a = \"loop-b\"\nloop-b = \"loop-a\"\nself = \"self -x\"\n");
        let m = run(&e, "loop-a");
        assert_eq!(m.decision, Decision::Ask);
        assert!(m.reason.contains("delegation deeper than"), "{}", m.reason);
        assert_eq!(decide(&e, "self"), Decision::Ask);
        assert_eq!(decide(&e, "bash -c \"bash -c 'ls'\""), Decision::Allow);
    }

    #[test]
    fn redirect_targets() {
        let e = engine("");
        let m = run(&e, "echo hi > out.txt");
        assert_eq!(m.decision, Decision::Ask);
        assert!(m.reason.contains("writes /work/out.txt"), "{}", m.reason);
        assert_eq!(decide(&e, "echo hi > /dev/null"), Decision::Allow);
        assert_eq!(decide(&e, "wc -l < input.txt"), Decision::Allow);

        let e = engine("[[rules]]\ndecision = \"allow\"\nredirect = \"/work/**\"\n");
        assert_eq!(decide(&e, "echo hi >> logs/out.txt"), Decision::Allow);
        assert_eq!(decide(&e, "echo hi > /etc/motd"), Decision::Ask);
        assert_eq!(decide(&e, "cd /tmp && echo hi > out"), Decision::Ask);
    }

    #[test]
    fn redirect_after_cd_in_list() {
        let e = engine(
            "[[rules]]\ndecision = \"allow\"\nredirect = \"/work/**\"\n\
             [[rules]]\ndecision = \"deny\"\nredirect = \"/etc/**\"\n",
        );
        assert_eq!(decide(&e, "cd /etc && echo x > passwd"), Decision::Deny);
        assert_eq!(decide(&e, "cd /etc; echo x > passwd"), Decision::Deny);
        assert_eq!(decide(&e, "cd /etc && cat hosts | sort > out"), Decision::Deny);
        assert_eq!(decide(&e, "(cd /etc; echo x) > out"), Decision::Allow);
    }

    #[test]
    fn deep_nesting_asks() {
        let depth = 1000;
        let cmd = format!("echo {}x{}", "$(echo ".repeat(depth), ")".repeat(depth));
        let m = run(&engine(""), &cmd);
        assert_eq!(m.decision, Decision::Ask);
        assert!(m.reason.contains("nesting too deep"), "{}", m.reason);
    }

    #[test]
    fn redirect_default_deny() {
        let e = engine("[settings]\nredirect_default = \"deny\"\n");
        assert_eq!(decide(&e, "echo hi > out.txt"), Decision::Deny);
        assert_eq!(decide(&e, "ls"), Decision::Allow);
    }

    #[test]
    fn handler_writes_use_redirect_rules() {
        let e = engine(
            "[[rules]]\ndecision = \"allow\"\nredirect = \"/work/**\"\n\
             [[rules]]\ndecision = \"deny\"\nredirect = \"/etc/**\"\n",
        );
        assert_eq!(decide(&e, "echo x | tee notes.txt"), Decision::Allow);
        assert_eq!(decide(&e, "echo x | tee /etc/passwd"), Decision::Deny);
        assert_eq!(decide(&e, "echo x | sudo tee /etc/passwd"), Decision::Deny);
        assert_eq!(decide(&e, "sort -o /etc/hosts data"), Decision::Deny);
        assert_eq!(decide(&e, "cd sub && sort -o out data"), Decision::Allow);
        assert_eq!(decide(&e, "echo x | tee /dev/null"), Decision::Allow);
    }

    #[test]
    fn substitution_is_classified() {
        let e = engine("[[rules]]\ndecision = \"deny\"\ncommand = \"rm *\"\n");
        let m = run(&e, "echo $(rm -rf /)");
        assert_eq!(m.decision, Decision::Deny);
        assert!(m.reason.starts_with("$(rm -rf /) -> DENY"), "{}", m.reason);
        assert_eq!(decide(&e, "echo $(( $(rm x) + 1 ))"), Decision::Deny);
        assert_eq!(decide(&e, "echo ${X:-$(rm x)}"), Decision::Deny);
    }

    #[test]
    fn help_probe_shape() {
        let t = |s: &str| s.split_whitespace().map(String::from).collect::<Vec<_>>();
        assert!(is_help_probe(&t("git --version")));
        assert!(!is_help_probe(&t("kubectl get --help")));
        assert!(!is_help_probe(&t("./run.sh --help")));
        assert!(!is_help_probe(&t("ls")));
        assert!(!is_help_probe(&t("rm -rf x --help-me")));
    }
}
