use std::fmt;

use serde::{Deserialize, Serialize};

/// Verdict for a command, redirect, or whole invocation.
///
/// Variants are ordered by severity so `max` implements strictest-wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Ask,
    Deny,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Ask => "ask",
            Decision::Deny => "deny",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Decision::Allow => "ALLOW",
            Decision::Ask => "ASK",
            Decision::Deny => "DENY",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which layer of the engine produced a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A user-declared rule. `scope` names the config file it came from, if any.
    ConfigRule {
        pattern: String,
        scope: Option<String>,
    },
    /// The built-in read-only allowlist (including help/version probes).
    Allowlist,
    /// A registered handler, named by the command it was registered under.
    Handler(String),
    /// Nothing matched, or a fail-safe path fired.
    Default,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::ConfigRule { .. } => "config-rule",
            Source::Allowlist => "built-in-allowlist",
            Source::Handler(_) => "handler",
            Source::Default => "default",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::ConfigRule {
                pattern,
                scope: Some(scope),
            } => write!(f, "rule '{pattern}' from {scope}"),
            Source::ConfigRule { pattern, scope: None } => write!(f, "rule '{pattern}'"),
            Source::Allowlist => f.write_str("built-in allowlist"),
            Source::Handler(name) => write!(f, "{name} handler"),
            Source::Default => f.write_str("default"),
        }
    }
}

/// Terminal decision: a verdict, a human-readable reason, and its source.
#[derive(Debug, Clone)]
pub struct RuleMatch {
    pub decision: Decision,
    pub reason: String,
    pub source: Source,
}

impl RuleMatch {
    pub fn new(decision: Decision, reason: impl Into<String>, source: Source) -> Self {
        Self {
            decision,
            reason: reason.into(),
            source,
        }
    }

    /// Fail-safe `ask` attributed to the default layer.
    pub fn default_ask(reason: impl Into<String>) -> Self {
        Self::new(Decision::Ask, reason, Source::Default)
    }
}

/// What a delegating handler hands back for reclassification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delegation {
    /// An already-tokenized inner command (e.g. `sudo rm x` -> `rm x`).
    Tokens(Vec<String>),
    /// Shell source that must be parsed again (e.g. `bash -c 'a && b'`).
    Script(String),
}

/// Handler outcome before the orchestrator resolves delegation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Decided(Decision),
    /// Reclassify `inner`; the final verdict is at least `floor`.
    Delegate { inner: Delegation, floor: Decision },
}

/// Result of a handler's `classify` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub outcome: Outcome,
    pub description: String,
    /// Files the command writes on its own (`tee out.txt`, `sort -o out`).
    /// These are resolved through redirect rules like shell redirects.
    pub writes: Vec<String>,
}

impl Classification {
    pub fn decided(decision: Decision, description: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Decided(decision),
            description: description.into(),
            writes: Vec::new(),
        }
    }

    pub fn allow(description: impl Into<String>) -> Self {
        Self::decided(Decision::Allow, description)
    }

    pub fn ask(description: impl Into<String>) -> Self {
        Self::decided(Decision::Ask, description)
    }

    pub fn deny(description: impl Into<String>) -> Self {
        Self::decided(Decision::Deny, description)
    }

    pub fn delegate(description: impl Into<String>, inner: Delegation, floor: Decision) -> Self {
        Self {
            outcome: Outcome::Delegate { inner, floor },
            description: description.into(),
            writes: Vec::new(),
        }
    }

    pub fn with_writes(mut self, writes: Vec<String>) -> Self {
        self.writes = writes;
        self
    }

    /// The verdict if this classification is final.
    pub fn decision(&self) -> Option<Decision> {
        match self.outcome {
            Outcome::Decided(d) => Some(d),
            Outcome::Delegate { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_order() {
        assert!(Decision::Deny > Decision::Ask);
        assert!(Decision::Ask > Decision::Allow);
        assert_eq!(
            [Decision::Allow, Decision::Deny, Decision::Ask]
                .into_iter()
                .max(),
            Some(Decision::Deny)
        );
    }

    #[test]
    fn source_display() {
        let src = Source::ConfigRule {
            pattern: "git *".into(),
            scope: Some("/p/.cc-shellgate.toml".into()),
        };
        assert_eq!(src.to_string(), "rule 'git *' from /p/.cc-shellgate.toml");
        assert_eq!(Source::Handler("git".into()).to_string(), "git handler");
        assert_eq!(src.as_str(), "config-rule");
    }

    #[test]
    fn delegate_has_no_decision() {
        let c = Classification::delegate(
            "sudo",
            Delegation::Tokens(vec!["ls".into()]),
            Decision::Ask,
        );
        assert_eq!(c.decision(), None);
        assert_eq!(Classification::allow("ls").decision(), Some(Decision::Allow));
    }
}
