//! Subcommand-aware kubectl evaluation.
//!
//! Distinguishes read-only subcommands (get, describe, logs) from mutating ones
//! (apply, delete, scale). Supports env-gated auto-allow for subcommands
//! like `apply` when a specific `KUBECONFIG` is set.

use super::super::{CommandSpec, first_operand};
use super::env_gate_open;
use crate::config::KubectlConfig;
use crate::eval::{Classification, CommandContext};

/// Global options whose value is the next word (`kubectl -n prod get pods`).
const GLOBAL_FLAGS_WITH_VALUE: &[&str] = &[
    "-n",
    "--namespace",
    "--context",
    "--cluster",
    "--kubeconfig",
    "--user",
    "-s",
    "--server",
];

/// Subcommand-aware kubectl evaluator.
///
/// Evaluation order:
/// 1. Read-only subcommands → ALLOW
/// 2. Env-gated subcommands → ALLOW if env var present, else ASK
/// 3. Known mutating subcommands → ASK
/// 4. Everything else → ASK
pub struct KubectlSpec {
    /// Subcommands that are always allowed (e.g. `get`, `describe`, `logs`).
    read_only: Vec<String>,
    /// Known mutating subcommands that always require confirmation.
    mutating: Vec<String>,
    /// Subcommands allowed only when `config_env_var` is present.
    allowed_with_config: Vec<String>,
    /// Env var name that gates `allowed_with_config` subcommands.
    config_env_var: String,
}

impl KubectlSpec {
    /// Build a kubectl spec from configuration.
    pub fn from_config(config: &KubectlConfig) -> Self {
        Self {
            read_only: config.read_only.clone(),
            mutating: config.mutating.clone(),
            allowed_with_config: config.allowed_with_config.clone(),
            config_env_var: config.config_env_var.clone(),
        }
    }

    /// Extract the kubectl subcommand (first non-flag word after "kubectl").
    fn subcommand<'a>(ctx: &CommandContext<'a>) -> Option<&'a str> {
        let args = ctx.args();
        first_operand(args, GLOBAL_FLAGS_WITH_VALUE).map(|i| args[i].as_str())
    }
}

impl CommandSpec for KubectlSpec {
    fn classify(&self, ctx: &CommandContext) -> Classification {
        let sub = Self::subcommand(ctx).unwrap_or("?");

        if self.read_only.iter().any(|s| s == sub) {
            return Classification::allow(format!("read-only kubectl {sub}"));
        }

        // Env-gated subcommands: allowed only when config_env_var is set and present
        if self.allowed_with_config.iter().any(|s| s == sub) {
            if env_gate_open(ctx, &self.config_env_var) {
                return Classification::allow(format!(
                    "kubectl {sub} with {}",
                    self.config_env_var
                ));
            }
            return Classification::ask(format!("kubectl {sub} requires confirmation"));
        }

        if self.mutating.iter().any(|s| s == sub) {
            return Classification::ask(format!("kubectl {sub} modifies the cluster"));
        }

        Classification::ask(format!("kubectl {sub} requires confirmation"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::decide;
    use crate::config::Config;
    use crate::eval::Decision;

    fn spec() -> KubectlSpec {
        KubectlSpec::from_config(&Config::default_config().kubectl)
    }

    fn eval(cmd: &str) -> Decision {
        decide(&spec(), cmd)
    }

    #[test]
    fn allow_get() {
        assert_eq!(eval("kubectl get pods"), Decision::Allow);
    }

    #[test]
    fn allow_describe() {
        assert_eq!(eval("kubectl describe svc foo"), Decision::Allow);
    }

    #[test]
    fn allow_logs() {
        assert_eq!(eval("kubectl logs pod/foo"), Decision::Allow);
    }

    #[test]
    fn namespace_flag_skipped() {
        assert_eq!(eval("kubectl -n prod get pods"), Decision::Allow);
        assert_eq!(eval("kubectl --context staging delete pod x"), Decision::Ask);
    }

    #[test]
    fn ask_apply() {
        assert_eq!(eval("kubectl apply -f deploy.yaml"), Decision::Ask);
    }

    #[test]
    fn ask_delete() {
        assert_eq!(eval("kubectl delete pod foo"), Decision::Ask);
    }

    #[test]
    fn ask_bare() {
        assert_eq!(eval("kubectl"), Decision::Ask);
    }

    // ── Env-gated commands ──

    fn spec_with_env_gate() -> KubectlSpec {
        KubectlSpec::from_config(&KubectlConfig {
            read_only: vec!["get".into(), "describe".into()],
            mutating: vec!["delete".into()],
            allowed_with_config: vec!["apply".into(), "rollout".into()],
            config_env_var: "KUBECONFIG".into(),
        })
    }

    fn eval_with_env_gate(cmd: &str) -> Decision {
        decide(&spec_with_env_gate(), cmd)
    }

    #[test]
    fn env_gate_apply_with_config() {
        assert_eq!(
            eval_with_env_gate("KUBECONFIG=~/.kube/staging kubectl apply -f deploy.yaml"),
            Decision::Allow
        );
    }

    #[test]
    fn env_gate_apply_no_config() {
        assert_eq!(
            eval_with_env_gate("kubectl apply -f deploy.yaml"),
            Decision::Ask
        );
    }

    #[test]
    fn env_gate_delete_still_asks() {
        // mutating commands not in allowed_with_config always ask
        assert_eq!(
            eval_with_env_gate("KUBECONFIG=~/.kube/staging kubectl delete pod foo"),
            Decision::Ask
        );
    }
}
