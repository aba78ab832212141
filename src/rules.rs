//! User-declared rules and the built-in allowlist.
//!
//! Rules are kept in sequence order and scanned from the highest sequence
//! number down, so the last declared matching rule wins. Command rules are
//! consulted before the allowlist, which means any config rule (including
//! `deny`) overrides allowlist membership.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::eval::{Decision, RuleMatch, Source};
use crate::path::{PathContext, is_path_like, normalize_path, normalize_token};
use crate::pattern::{self, PatternError};

/// What a rule's pattern is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleDomain {
    /// The space-joined command line.
    Command,
    /// A normalized file path written through a redirect.
    Redirect,
}

/// One user rule. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub decision: Decision,
    pub domain: RuleDomain,
    pub pattern: String,
    /// Literal patterns must equal the whole command instead of a word prefix.
    pub exact: bool,
    pub message: Option<String>,
    /// Position in the merged rule list; higher wins.
    pub sequence: usize,
    /// Where the rule was declared (a config file path), for reporting.
    pub scope: Option<String>,
}

impl Rule {
    pub fn command(decision: Decision, pattern: impl Into<String>) -> Self {
        Self::new(decision, RuleDomain::Command, pattern)
    }

    pub fn redirect(decision: Decision, pattern: impl Into<String>) -> Self {
        Self::new(decision, RuleDomain::Redirect, pattern)
    }

    fn new(decision: Decision, domain: RuleDomain, pattern: impl Into<String>) -> Self {
        Self {
            decision,
            domain,
            pattern: pattern.into().trim().to_string(),
            exact: false,
            message: None,
            sequence: 0,
            scope: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    pub fn at(mut self, sequence: usize) -> Self {
        self.sequence = sequence;
        self
    }

    /// Check the pattern compiles in its domain's dialect.
    pub fn validate(&self) -> Result<(), PatternError> {
        match self.domain {
            RuleDomain::Command => pattern::validate_command(&self.pattern),
            RuleDomain::Redirect => pattern::validate_path(&self.pattern),
        }
    }

    fn matches(&self, subject: &str, paths: &PathContext) -> bool {
        match self.domain {
            RuleDomain::Command => {
                let pattern = normalize_command_pattern(&self.pattern, paths);
                pattern::command_matches(subject, &pattern, self.exact)
            }
            RuleDomain::Redirect => {
                let pattern = normalize_path_pattern(&self.pattern, paths);
                pattern::path_matches(subject, &pattern)
            }
        }
    }

    fn to_match(&self) -> RuleMatch {
        let reason = match &self.message {
            Some(message) => format!("{message} (rule '{}')", self.pattern),
            None => format!("matched {} rule '{}'", self.decision, self.pattern),
        };
        RuleMatch::new(
            self.decision,
            reason,
            Source::ConfigRule {
                pattern: self.pattern.clone(),
                scope: self.scope.clone(),
            },
        )
    }
}

/// Patterns that start with a wildcard are never anchored to the cwd.
fn starts_with_glob(word: &str) -> bool {
    word.starts_with(['*', '?', '['])
}

fn normalize_command_pattern(pattern: &str, paths: &PathContext) -> String {
    pattern
        .split(' ')
        .map(|word| {
            if starts_with_glob(word) || !is_path_like(word) {
                word.to_string()
            } else {
                normalize_path(word, paths)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_path_pattern(pattern: &str, paths: &PathContext) -> String {
    if starts_with_glob(pattern) || !is_path_like(pattern) {
        pattern.to_string()
    } else {
        normalize_path(pattern, paths)
    }
}

/// The space-joined, path-normalized form command rules match against.
pub fn command_line(tokens: &[String], paths: &PathContext) -> String {
    tokens
        .iter()
        .map(|t| normalize_token(t, paths))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ordered rules plus the allowlist. Read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    rules: Vec<Rule>,
    allowlist: HashSet<String>,
}

impl RuleStore {
    pub fn new(mut rules: Vec<Rule>, allowlist: impl IntoIterator<Item = String>) -> Self {
        rules.sort_by_key(|r| r.sequence);
        Self {
            rules,
            allowlist: allowlist.into_iter().collect(),
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_allowlisted(&self, name: &str) -> bool {
        self.allowlist.contains(name)
    }

    fn last_match(&self, domain: RuleDomain, subject: &str, paths: &PathContext) -> Option<&Rule> {
        self.rules
            .iter()
            .rev()
            .filter(|r| r.domain == domain)
            .find(|r| r.matches(subject, paths))
    }

    /// Command rules only, without the allowlist fallback.
    pub fn match_command(&self, tokens: &[String], paths: &PathContext) -> Option<RuleMatch> {
        let line = command_line(tokens, paths);
        let rule = self.last_match(RuleDomain::Command, &line, paths)?;
        log::debug!("command {line:?} matched rule {:?}", rule.pattern);
        Some(rule.to_match())
    }

    /// Command rules, then allowlist membership of `tokens[0]`.
    pub fn resolve_command(&self, tokens: &[String], paths: &PathContext) -> Option<RuleMatch> {
        if let Some(m) = self.match_command(tokens, paths) {
            return Some(m);
        }
        let name = tokens.first()?;
        if self.is_allowlisted(name) {
            return Some(RuleMatch::new(
                Decision::Allow,
                format!("{name} is read-only"),
                Source::Allowlist,
            ));
        }
        None
    }

    /// Redirect rules for a normalized path. No allowlist.
    pub fn resolve_redirect(&self, path: &str, paths: &PathContext) -> Option<RuleMatch> {
        let rule = self.last_match(RuleDomain::Redirect, path, paths)?;
        log::debug!("redirect {path:?} matched rule {:?}", rule.pattern);
        Some(rule.to_match())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> PathContext {
        PathContext::new("/work", Some("/home/me".into()))
    }

    fn tokens(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn store(rules: Vec<Rule>) -> RuleStore {
        let rules = rules
            .into_iter()
            .enumerate()
            .map(|(i, r)| r.at(i))
            .collect();
        RuleStore::new(rules, ["ls".to_string(), "cat".to_string()])
    }

    fn decide(store: &RuleStore, cmd: &str) -> Option<Decision> {
        store.resolve_command(&tokens(cmd), &paths()).map(|m| m.decision)
    }

    #[test]
    fn later_rule_wins() {
        let s = store(vec![
            Rule::command(Decision::Allow, "docker *"),
            Rule::command(Decision::Ask, "docker rm *"),
        ]);
        assert_eq!(decide(&s, "docker rm x"), Some(Decision::Ask));
        assert_eq!(decide(&s, "docker ps"), Some(Decision::Allow));
    }

    #[test]
    fn sequence_not_vec_order_decides() {
        let s = RuleStore::new(
            vec![
                Rule::command(Decision::Deny, "git push *").at(5),
                Rule::command(Decision::Allow, "git *").at(1),
            ],
            Vec::new(),
        );
        assert_eq!(decide(&s, "git push origin"), Some(Decision::Deny));
    }

    #[test]
    fn deny_rule_beats_allowlist() {
        let s = store(vec![Rule::command(Decision::Deny, "cat /etc/shadow")]);
        assert_eq!(decide(&s, "cat /etc/shadow"), Some(Decision::Deny));
        assert_eq!(decide(&s, "cat README.md"), Some(Decision::Allow));
    }

    #[test]
    fn allowlist_fallback_has_source() {
        let s = store(Vec::new());
        let m = s.resolve_command(&tokens("ls -la"), &paths()).unwrap();
        assert_eq!(m.decision, Decision::Allow);
        assert_eq!(m.source, Source::Allowlist);
        assert!(s.resolve_command(&tokens("rm -rf x"), &paths()).is_none());
    }

    #[test]
    fn message_used_as_reason() {
        let s = store(vec![
            Rule::command(Decision::Deny, "rm -rf /*").with_message("never wipe the root"),
        ]);
        let m = s.resolve_command(&tokens("rm -rf /"), &paths()).unwrap();
        assert_eq!(m.decision, Decision::Deny);
        assert_eq!(m.reason, "never wipe the root (rule 'rm -rf /*')");
        assert!(matches!(m.source, Source::ConfigRule { ref pattern, .. } if pattern == "rm -rf /*"));
    }

    #[test]
    fn exact_rule() {
        let s = store(vec![Rule::command(Decision::Allow, "make").exact()]);
        assert_eq!(decide(&s, "make"), Some(Decision::Allow));
        assert_eq!(decide(&s, "make install"), None);
    }

    #[test]
    fn relative_patterns_resolve_against_cwd() {
        let s = store(vec![Rule::command(Decision::Allow, "./scripts/*")]);
        assert_eq!(decide(&s, "./scripts/test.sh"), Some(Decision::Allow));
        assert_eq!(decide(&s, "/work/scripts/lint.sh --fix"), Some(Decision::Allow));
        assert_eq!(decide(&s, "/elsewhere/scripts/x.sh"), None);
    }

    #[test]
    fn tilde_in_command_tokens() {
        let s = store(vec![Rule::command(Decision::Allow, "/home/me/bin/tool *")]);
        assert_eq!(decide(&s, "~/bin/tool --check"), Some(Decision::Allow));
    }

    #[test]
    fn redirect_rules_have_no_allowlist() {
        let s = store(vec![
            Rule::redirect(Decision::Allow, "/tmp/**"),
            Rule::redirect(Decision::Deny, "~/.ssh/**"),
        ]);
        let p = paths();
        assert_eq!(
            s.resolve_redirect("/tmp/a/b.txt", &p).map(|m| m.decision),
            Some(Decision::Allow)
        );
        assert_eq!(
            s.resolve_redirect("/home/me/.ssh/authorized_keys", &p)
                .map(|m| m.decision),
            Some(Decision::Deny)
        );
        assert!(s.resolve_redirect("/work/ls", &p).is_none());
    }

    #[test]
    fn relative_redirect_pattern() {
        let s = store(vec![Rule::redirect(Decision::Allow, "build/**")]);
        assert!(s.resolve_redirect("/work/build/out.o", &paths()).is_some());
        assert!(s.resolve_redirect("/other/build/out.o", &paths()).is_none());
    }

    #[test]
    fn command_rules_ignore_redirect_domain() {
        let s = store(vec![Rule::redirect(Decision::Deny, "**")]);
        assert_eq!(decide(&s, "ls"), Some(Decision::Allow));
    }

    #[test]
    fn validate_by_domain() {
        assert!(Rule::command(Decision::Allow, "ls [").validate().is_err());
        assert!(Rule::redirect(Decision::Allow, "/tmp/**").validate().is_ok());
    }
}
