use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::eval::Decision;
use crate::pattern::PatternError;
use crate::rules::{Rule, RuleDomain};

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

/// Global overlay, relative to `$HOME`.
const GLOBAL_CONFIG: &str = ".config/cc-shellgate/config.toml";
/// Project overlay, looked up in the cwd and its ancestors.
const PROJECT_CONFIG: &str = ".cc-shellgate.toml";
/// Env var naming an explicit overlay file, applied last.
pub const CONFIG_ENV_VAR: &str = "CC_SHELLGATE_CONFIG";

/// Errors raised while loading configuration. All are fatal for the hook.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("rule #{index} in {scope}: {reason}")]
    InvalidRule {
        scope: String,
        index: usize,
        reason: String,
    },
    #[error("rule pattern '{pattern}' in {scope}: {source}")]
    InvalidPattern {
        scope: String,
        pattern: String,
        #[source]
        source: PatternError,
    },
}

// ── Final (merged) config types ──

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub allowlist: Allowlist,
    #[serde(default)]
    pub wrappers: WrapperConfig,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub cargo: CargoConfig,
    #[serde(default)]
    pub kubectl: KubectlConfig,
    #[serde(default)]
    pub gh: GhConfig,
    #[serde(default)]
    pub docker: DockerConfig,
    #[serde(default)]
    pub flags: BTreeMap<String, FlagConfig>,
    #[serde(default)]
    pub arity: BTreeMap<String, usize>,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// Verdict for redirect writes no rule matches. `allow` is not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectDefault {
    #[default]
    Ask,
    Deny,
}

impl RedirectDefault {
    pub fn decision(self) -> Decision {
        match self {
            RedirectDefault::Ask => Decision::Ask,
            RedirectDefault::Deny => Decision::Deny,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub redirect_default: RedirectDefault,
    /// Decision log path. Defaults to `~/.local/share/cc-shellgate/decisions.log`.
    #[serde(default)]
    pub log: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            redirect_default: RedirectDefault::default(),
            log: None,
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

/// Read-only commands, matched on the exact first token.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Allowlist {
    #[serde(default)]
    pub commands: Vec<String>,
}

/// Commands that execute their arguments as subcommands.
/// The wrapped command is extracted and classified; the final decision
/// is max(floor, wrapped_command_decision).
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct WrapperConfig {
    /// Wrappers with Allow floor: wrapper is safe, wrapped command determines disposition.
    #[serde(default)]
    pub allow_floor: Vec<String>,
    /// Wrappers with Ask floor: always at least Ask, wrapped command can escalate to Deny.
    #[serde(default)]
    pub ask_floor: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct GitConfig {
    #[serde(default)]
    pub read_only: Vec<String>,
    #[serde(default)]
    pub allowed_with_config: Vec<String>,
    /// Env var that must be set for `allowed_with_config` commands to auto-allow.
    /// When empty, those commands fall through to ASK.
    #[serde(default)]
    pub config_env_var: String,
    #[serde(default)]
    pub force_push_flags: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct CargoConfig {
    #[serde(default)]
    pub safe_subcommands: Vec<String>,
    #[serde(default)]
    pub allowed_with_config: Vec<String>,
    #[serde(default)]
    pub config_env_var: String,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct KubectlConfig {
    #[serde(default)]
    pub read_only: Vec<String>,
    #[serde(default)]
    pub mutating: Vec<String>,
    #[serde(default)]
    pub allowed_with_config: Vec<String>,
    #[serde(default)]
    pub config_env_var: String,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct GhConfig {
    #[serde(default)]
    pub read_only: Vec<String>,
    #[serde(default)]
    pub mutating: Vec<String>,
    #[serde(default)]
    pub allowed_with_config: Vec<String>,
    #[serde(default)]
    pub config_env_var: String,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct DockerConfig {
    /// Names the docker handler is registered under.
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub global_flags_with_value: Vec<String>,
    /// Top-level actions that only read state.
    #[serde(default)]
    pub read_only: Vec<String>,
    /// Read-only actions of object commands (`image ls`, `compose ps`).
    #[serde(default)]
    pub read_only_subcommands: BTreeMap<String, Vec<String>>,
}

/// Flag tables for one flag-gated command.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct FlagConfig {
    #[serde(default)]
    pub unsafe_flags: Vec<String>,
    #[serde(default)]
    pub writes: Vec<String>,
    #[serde(default)]
    pub require_any: Vec<String>,
    #[serde(default)]
    pub restricted: BTreeMap<String, Vec<String>>,
}

/// A `[[rules]]` entry as written in a config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub exact: bool,
    /// File the rule was declared in.
    #[serde(skip)]
    pub scope: Option<String>,
}

impl RuleConfig {
    fn to_rule(&self, sequence: usize) -> Result<Rule, ConfigError> {
        let scope = self.scope.clone().unwrap_or_else(|| "inline config".into());
        let (domain, pattern) = match (&self.command, &self.redirect) {
            (Some(pattern), None) => (RuleDomain::Command, pattern),
            (None, Some(pattern)) => (RuleDomain::Redirect, pattern),
            (Some(_), Some(_)) => {
                return Err(ConfigError::InvalidRule {
                    scope,
                    index: sequence,
                    reason: "set either `command` or `redirect`, not both".into(),
                });
            }
            (None, None) => {
                return Err(ConfigError::InvalidRule {
                    scope,
                    index: sequence,
                    reason: "missing `command` or `redirect` pattern".into(),
                });
            }
        };
        if self.exact && domain == RuleDomain::Redirect {
            return Err(ConfigError::InvalidRule {
                scope,
                index: sequence,
                reason: "`exact` applies to command rules only".into(),
            });
        }
        let rule = Rule {
            decision: self.decision,
            domain,
            pattern: pattern.trim().to_string(),
            exact: self.exact,
            message: self.message.clone(),
            sequence,
            scope: self.scope.clone(),
        };
        rule.validate()
            .map_err(|source| ConfigError::InvalidPattern {
                scope,
                pattern: rule.pattern.clone(),
                source,
            })?;
        Ok(rule)
    }
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    allowlist: AllowlistOverlay,
    #[serde(default)]
    wrappers: WrappersOverlay,
    #[serde(default)]
    aliases: BTreeMap<String, String>,
    #[serde(default)]
    git: GitOverlay,
    #[serde(default)]
    cargo: CargoOverlay,
    #[serde(default)]
    kubectl: KubectlOverlay,
    #[serde(default)]
    gh: GhOverlay,
    #[serde(default)]
    docker: DockerOverlay,
    #[serde(default)]
    flags: BTreeMap<String, FlagConfig>,
    #[serde(default)]
    arity: BTreeMap<String, usize>,
    #[serde(default)]
    rules: Vec<RuleConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsOverlay {
    redirect_default: Option<RedirectDefault>,
    log: Option<String>,
    log_level: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct AllowlistOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    commands: Vec<String>,
    #[serde(default)]
    remove_commands: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct WrappersOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    allow_floor: Vec<String>,
    #[serde(default)]
    ask_floor: Vec<String>,
    #[serde(default)]
    remove_allow_floor: Vec<String>,
    #[serde(default)]
    remove_ask_floor: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct GitOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    read_only: Vec<String>,
    #[serde(default)]
    allowed_with_config: Vec<String>,
    config_env_var: Option<String>,
    #[serde(default)]
    force_push_flags: Vec<String>,
    #[serde(default)]
    remove_read_only: Vec<String>,
    #[serde(default)]
    remove_allowed_with_config: Vec<String>,
    #[serde(default)]
    remove_force_push_flags: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct CargoOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    safe_subcommands: Vec<String>,
    #[serde(default)]
    allowed_with_config: Vec<String>,
    config_env_var: Option<String>,
    #[serde(default)]
    remove_safe_subcommands: Vec<String>,
    #[serde(default)]
    remove_allowed_with_config: Vec<String>,
}

/// Shared by kubectl and gh, which have the same table shape.
#[derive(Debug, Deserialize, Default)]
struct SubcommandOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    read_only: Vec<String>,
    #[serde(default)]
    mutating: Vec<String>,
    #[serde(default)]
    allowed_with_config: Vec<String>,
    config_env_var: Option<String>,
    #[serde(default)]
    remove_read_only: Vec<String>,
    #[serde(default)]
    remove_mutating: Vec<String>,
    #[serde(default)]
    remove_allowed_with_config: Vec<String>,
}

type KubectlOverlay = SubcommandOverlay;
type GhOverlay = SubcommandOverlay;

#[derive(Debug, Deserialize, Default)]
struct DockerOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    commands: Vec<String>,
    #[serde(default)]
    read_only: Vec<String>,
    #[serde(default)]
    remove_commands: Vec<String>,
    #[serde(default)]
    remove_read_only: Vec<String>,
    #[serde(default)]
    read_only_subcommands: BTreeMap<String, Vec<String>>,
}

// ── Merge logic ──

/// Merge a user list into a default list.
/// In replace mode: user list replaces default entirely.
/// In merge mode: remove items first, then extend with additions (deduped).
fn merge_list(base: &mut Vec<String>, add: Vec<String>, remove: &[String], replace: bool) {
    if replace {
        *base = add;
    } else {
        base.retain(|item| !remove.contains(item));
        for item in add {
            if !base.contains(&item) {
                base.push(item);
            }
        }
    }
}

fn merge_scalar(base: &mut String, value: Option<String>) {
    if let Some(v) = value {
        *base = v;
    }
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Defaults with one overlay applied from a TOML string.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default_config();
        let overlay = toml::from_str(text).map_err(|source| ConfigError::Toml {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.apply_overlay(overlay, None);
        config.rule_list()?;
        Ok(config)
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge the global overlay from ~/.config/cc-shellgate/config.toml (if exists)
    /// 3. Merge the nearest .cc-shellgate.toml at or above `cwd` (if any)
    /// 4. Merge the file named by $CC_SHELLGATE_CONFIG (must exist when set)
    ///
    /// User config merges with defaults: lists extend, scalars override.
    /// Set `replace = true` in any section to replace its defaults entirely.
    /// Use `remove_<field>` lists to subtract specific items from defaults.
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default_config();
        for path in Self::overlay_paths(cwd) {
            config.apply_file(&path)?;
        }
        config.rule_list()?;
        Ok(config)
    }

    /// Overlay files that apply to `cwd`, in merge order.
    pub fn overlay_paths(cwd: &Path) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(home) = std::env::var_os("HOME") {
            let global = Path::new(&home).join(GLOBAL_CONFIG);
            if global.is_file() {
                paths.push(global);
            }
        }
        if let Some(project) = find_project_config(cwd)
            && !paths.contains(&project)
        {
            paths.push(project);
        }
        if let Ok(explicit) = std::env::var(CONFIG_ENV_VAR)
            && !explicit.is_empty()
        {
            paths.push(PathBuf::from(shellexpand::tilde(&explicit).into_owned()));
        }
        paths
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        log::debug!("loading config overlay {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let overlay = toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        self.apply_overlay(overlay, Some(path.display().to_string()));
        Ok(())
    }

    /// Rules in declaration order, numbered and validated.
    pub fn rule_list(&self) -> Result<Vec<Rule>, ConfigError> {
        self.rules
            .iter()
            .enumerate()
            .map(|(sequence, rule)| rule.to_rule(sequence))
            .collect()
    }

    /// Render the merged configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay, scope: Option<String>) {
        // Settings: scalar overrides
        let s = overlay.settings;
        if let Some(v) = s.redirect_default {
            self.settings.redirect_default = v;
        }
        if s.log.is_some() {
            self.settings.log = s.log;
        }
        merge_scalar(&mut self.settings.log_level, s.log_level);

        // Allowlist
        let a = overlay.allowlist;
        merge_list(
            &mut self.allowlist.commands,
            a.commands,
            &a.remove_commands,
            a.replace,
        );

        // Wrappers
        let w = overlay.wrappers;
        merge_list(
            &mut self.wrappers.allow_floor,
            w.allow_floor,
            &w.remove_allow_floor,
            w.replace,
        );
        merge_list(
            &mut self.wrappers.ask_floor,
            w.ask_floor,
            &w.remove_ask_floor,
            w.replace,
        );

        self.aliases.extend(overlay.aliases);

        // Git
        let g = overlay.git;
        merge_list(
            &mut self.git.read_only,
            g.read_only,
            &g.remove_read_only,
            g.replace,
        );
        merge_list(
            &mut self.git.allowed_with_config,
            g.allowed_with_config,
            &g.remove_allowed_with_config,
            g.replace,
        );
        merge_list(
            &mut self.git.force_push_flags,
            g.force_push_flags,
            &g.remove_force_push_flags,
            g.replace,
        );
        merge_scalar(&mut self.git.config_env_var, g.config_env_var);

        // Cargo
        let ca = overlay.cargo;
        merge_list(
            &mut self.cargo.safe_subcommands,
            ca.safe_subcommands,
            &ca.remove_safe_subcommands,
            ca.replace,
        );
        merge_list(
            &mut self.cargo.allowed_with_config,
            ca.allowed_with_config,
            &ca.remove_allowed_with_config,
            ca.replace,
        );
        merge_scalar(&mut self.cargo.config_env_var, ca.config_env_var);

        // Kubectl
        let k = overlay.kubectl;
        merge_list(
            &mut self.kubectl.read_only,
            k.read_only,
            &k.remove_read_only,
            k.replace,
        );
        merge_list(
            &mut self.kubectl.mutating,
            k.mutating,
            &k.remove_mutating,
            k.replace,
        );
        merge_list(
            &mut self.kubectl.allowed_with_config,
            k.allowed_with_config,
            &k.remove_allowed_with_config,
            k.replace,
        );
        merge_scalar(&mut self.kubectl.config_env_var, k.config_env_var);

        // Gh
        let gh = overlay.gh;
        merge_list(
            &mut self.gh.read_only,
            gh.read_only,
            &gh.remove_read_only,
            gh.replace,
        );
        merge_list(
            &mut self.gh.mutating,
            gh.mutating,
            &gh.remove_mutating,
            gh.replace,
        );
        merge_list(
            &mut self.gh.allowed_with_config,
            gh.allowed_with_config,
            &gh.remove_allowed_with_config,
            gh.replace,
        );
        merge_scalar(&mut self.gh.config_env_var, gh.config_env_var);

        // Docker
        let d = overlay.docker;
        merge_list(
            &mut self.docker.commands,
            d.commands,
            &d.remove_commands,
            d.replace,
        );
        merge_list(
            &mut self.docker.read_only,
            d.read_only,
            &d.remove_read_only,
            d.replace,
        );
        if d.replace {
            self.docker.read_only_subcommands = d.read_only_subcommands;
        } else {
            for (object, subs) in d.read_only_subcommands {
                let entry = self.docker.read_only_subcommands.entry(object).or_default();
                merge_list(entry, subs, &[], false);
            }
        }

        // Flag tables and arity limits replace per command
        self.flags.extend(overlay.flags);
        self.arity.extend(overlay.arity);

        // Rules append in load order
        self.rules.extend(overlay.rules.into_iter().map(|mut rule| {
            rule.scope = scope.clone();
            rule
        }));
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay, Some("test".into()));
    }
}

/// Nearest `.cc-shellgate.toml` in `cwd` or one of its ancestors.
fn find_project_config(cwd: &Path) -> Option<PathBuf> {
    cwd.ancestors()
        .map(|dir| dir.join(PROJECT_CONFIG))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses() {
        let config = Config::default_config();
        assert!(!config.allowlist.commands.is_empty());
        assert!(!config.git.read_only.is_empty());
        assert!(!config.cargo.safe_subcommands.is_empty());
        assert!(!config.kubectl.read_only.is_empty());
        assert!(!config.gh.read_only.is_empty());
        assert!(!config.docker.read_only_subcommands.is_empty());
        assert!(config.rules.is_empty());
    }

    #[test]
    fn default_config_has_expected_entries() {
        let config = Config::default_config();
        assert!(config.allowlist.commands.contains(&"ls".to_string()));
        assert!(!config.allowlist.commands.contains(&"rm".to_string()));
        assert!(config.flags.contains_key("sed"));
        assert_eq!(config.arity.get("hostname"), Some(&0));
        assert_eq!(config.settings.redirect_default, RedirectDefault::Ask);
        assert_eq!(config.settings.log_level, "info");
    }

    #[test]
    fn default_git_env_gate_disabled() {
        let config = Config::default_config();
        assert!(config.git.config_env_var.is_empty());
        assert!(config.git.allowed_with_config.is_empty());
    }

    #[test]
    fn default_wrappers_populated() {
        let config = Config::default_config();
        assert!(config.wrappers.allow_floor.contains(&"timeout".to_string()));
        assert!(config.wrappers.ask_floor.contains(&"sudo".to_string()));
        assert!(!config.allowlist.commands.contains(&"sudo".to_string()));
    }

    // ── Merge semantics ──

    #[test]
    fn overlay_extends_allowlist() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [allowlist]
            commands = ["my-tool"]
        "#,
        );
        assert!(config.allowlist.commands.contains(&"ls".to_string()));
        assert!(config.allowlist.commands.contains(&"my-tool".to_string()));
    }

    #[test]
    fn overlay_removes_from_allowlist() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [allowlist]
            remove_commands = ["cat", "grep"]
        "#,
        );
        assert!(!config.allowlist.commands.contains(&"cat".to_string()));
        assert!(!config.allowlist.commands.contains(&"grep".to_string()));
        assert!(config.allowlist.commands.contains(&"ls".to_string()));
    }

    #[test]
    fn overlay_replace_allowlist() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [allowlist]
            replace = true
            commands = ["ls", "cat"]
        "#,
        );
        assert_eq!(config.allowlist.commands, vec!["ls", "cat"]);
    }

    #[test]
    fn overlay_no_duplicates() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [allowlist]
            commands = ["ls"]
        "#,
        );
        let count = config
            .allowlist
            .commands
            .iter()
            .filter(|s| *s == "ls")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn overlay_removes_from_wrappers() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [wrappers]
            remove_allow_floor = ["watch"]
            ask_floor = ["run0"]
        "#,
        );
        assert!(!config.wrappers.allow_floor.contains(&"watch".to_string()));
        assert!(config.wrappers.allow_floor.contains(&"nice".to_string()));
        assert!(config.wrappers.ask_floor.contains(&"run0".to_string()));
    }

    #[test]
    fn overlay_git_env_gate() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [git]
            allowed_with_config = ["commit", "add", "push"]
            config_env_var = "GIT_CONFIG_GLOBAL"
        "#,
        );
        assert_eq!(config.git.config_env_var, "GIT_CONFIG_GLOBAL");
        assert_eq!(
            config.git.allowed_with_config,
            vec!["commit", "add", "push"]
        );
        assert!(config.git.read_only.contains(&"status".to_string()));
    }

    #[test]
    fn overlay_replace_git() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [git]
            replace = true
            read_only = ["status", "log"]
            force_push_flags = ["--force"]
        "#,
        );
        assert_eq!(config.git.read_only, vec!["status", "log"]);
        assert_eq!(config.git.force_push_flags, vec!["--force"]);
        assert!(config.git.allowed_with_config.is_empty());
    }

    #[test]
    fn overlay_unrelated_sections_untouched() {
        let mut config = Config::default_config();
        let original_kubectl_read_only = config.kubectl.read_only.clone();
        config.apply_overlay_str(
            r#"
            [git]
            config_env_var = "GIT_CONFIG_GLOBAL"
        "#,
        );
        assert_eq!(config.kubectl.read_only, original_kubectl_read_only);
    }

    #[test]
    fn overlay_docker_subcommands_extend() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [docker.read_only_subcommands]
            image = ["tree"]
            scout = ["cves"]
        "#,
        );
        let image = &config.docker.read_only_subcommands["image"];
        assert!(image.contains(&"ls".to_string()));
        assert!(image.contains(&"tree".to_string()));
        assert_eq!(config.docker.read_only_subcommands["scout"], vec!["cves"]);
    }

    #[test]
    fn overlay_flags_and_aliases() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [aliases]
            k = "kubectl"

            [flags.sed]
            unsafe_flags = ["-i"]

            [flags.perl]
            unsafe_flags = ["-i"]
        "#,
        );
        assert_eq!(config.aliases.get("k").map(String::as_str), Some("kubectl"));
        assert_eq!(config.flags["sed"].unsafe_flags, vec!["-i"]);
        assert!(config.flags.contains_key("perl"));
        assert!(config.flags.contains_key("find"));
    }

    #[test]
    fn overlay_settings() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [settings]
            redirect_default = "deny"
            log_level = "debug"
        "#,
        );
        assert_eq!(config.settings.redirect_default, RedirectDefault::Deny);
        assert_eq!(config.settings.log_level, "debug");
        assert!(config.settings.log.is_none());
    }

    #[test]
    fn redirect_default_rejects_allow() {
        let err = Config::from_toml(
            r#"
            [settings]
            redirect_default = "allow"
        "#,
        );
        assert!(matches!(err, Err(ConfigError::Toml { .. })));
    }

    #[test]
    fn empty_overlay_changes_nothing() {
        let original = Config::default_config();
        let mut config = Config::default_config();
        config.apply_overlay_str("");
        assert_eq!(
            config.allowlist.commands.len(),
            original.allowlist.commands.len()
        );
        assert_eq!(config.git.read_only.len(), original.git.read_only.len());
    }

    // ── Rules ──

    #[test]
    fn rules_numbered_in_declaration_order() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [[rules]]
            decision = "allow"
            command = "docker *"

            [[rules]]
            decision = "ask"
            command = "docker rm *"
            message = "removing containers"
        "#,
        );
        config.apply_overlay_str(
            r#"
            [[rules]]
            decision = "deny"
            redirect = "~/.ssh/**"
        "#,
        );
        let rules = config.rule_list().unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].sequence, 0);
        assert_eq!(rules[1].message.as_deref(), Some("removing containers"));
        assert_eq!(rules[2].domain, RuleDomain::Redirect);
        assert_eq!(rules[2].sequence, 2);
        assert_eq!(rules[2].scope.as_deref(), Some("test"));
    }

    #[test]
    fn rule_needs_exactly_one_pattern() {
        let both = Config::from_toml(
            r#"
            [[rules]]
            decision = "deny"
            command = "rm *"
            redirect = "/etc/**"
        "#,
        );
        assert!(matches!(both, Err(ConfigError::InvalidRule { .. })));

        let neither = Config::from_toml(
            r#"
            [[rules]]
            decision = "deny"
        "#,
        );
        assert!(matches!(neither, Err(ConfigError::InvalidRule { .. })));
    }

    #[test]
    fn unknown_rule_kind_is_error() {
        let err = Config::from_toml(
            r#"
            [[rules]]
            decision = "maybe"
            command = "ls"
        "#,
        );
        assert!(matches!(err, Err(ConfigError::Toml { .. })));
    }

    #[test]
    fn bad_pattern_is_error() {
        let err = Config::from_toml(
            r#"
            [[rules]]
            decision = "allow"
            command = "ls [abc"
        "#,
        );
        assert!(matches!(err, Err(ConfigError::InvalidPattern { .. })));
    }

    // ── Discovery ──

    #[test]
    fn project_config_found_in_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(PROJECT_CONFIG), "").unwrap();
        assert_eq!(
            find_project_config(&nested),
            Some(dir.path().join(PROJECT_CONFIG))
        );
    }

    #[test]
    fn apply_file_scopes_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROJECT_CONFIG);
        std::fs::write(
            &path,
            "[[rules]]\ndecision = \"deny\"\ncommand = \"rm -rf *\"\n",
        )
        .unwrap();
        let mut config = Config::default_config();
        config.apply_file(&path).unwrap();
        let rules = config.rule_list().unwrap();
        assert_eq!(rules[0].scope, Some(path.display().to_string()));
    }

    #[test]
    fn apply_file_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[allowlist\n").unwrap();
        let mut config = Config::default_config();
        let err = config.apply_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut config = Config::default_config();
        let err = config
            .apply_file(Path::new("/nonexistent/cc-shellgate.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn dump_round_trips() {
        let config = Config::from_toml(
            r#"
            [[rules]]
            decision = "ask"
            command = "npm publish"
        "#,
        )
        .unwrap();
        let text = config.to_toml().unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.rules.len(), 1);
        assert_eq!(back.allowlist.commands, config.allowlist.commands);
    }
}
