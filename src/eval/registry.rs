use std::collections::HashMap;

use crate::commands::CommandSpec;
use crate::commands::arity::ArgCountSpec;
use crate::commands::flags::FlagSpec;
use crate::commands::tee::TeeSpec;
use crate::commands::tools::{
    cargo::CargoSpec, docker::DockerSpec, gh::GhSpec, git::GitSpec, kubectl::KubectlSpec,
};
use crate::commands::wrapper::{AliasSpec, EnvSpec, ShellSpec, WrapperSpec, XargsSpec};
use crate::config::Config;

use super::decision::Decision;

const SHELLS: &[&str] = &["bash", "sh", "zsh", "dash", "ksh"];

/// Handlers keyed by command name. Built once, then shared read-only.
#[derive(Default)]
pub struct CommandRegistry {
    specs: HashMap<String, Box<dyn CommandSpec>>,
}

impl CommandRegistry {
    /// An empty registry. Every command falls through to the default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from configuration.
    ///
    /// Later registrations replace earlier ones for the same name, so
    /// configured aliases win over built-in handlers.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();

        for (name, flags) in &config.flags {
            registry.register(name, Box::new(FlagSpec::from_config(flags)));
        }
        for (name, max_args) in &config.arity {
            registry.register(name, Box::new(ArgCountSpec::new(*max_args)));
        }
        for name in &config.wrappers.allow_floor {
            registry.register(name, Box::new(WrapperSpec::new(Decision::Allow)));
        }
        for name in &config.wrappers.ask_floor {
            registry.register(name, Box::new(WrapperSpec::new(Decision::Ask)));
        }

        registry.register("git", Box::new(GitSpec::from_config(&config.git)));
        registry.register("cargo", Box::new(CargoSpec::from_config(&config.cargo)));
        registry.register("kubectl", Box::new(KubectlSpec::from_config(&config.kubectl)));
        registry.register("gh", Box::new(GhSpec::from_config(&config.gh)));
        for name in &config.docker.commands {
            registry.register(name, Box::new(DockerSpec::from_config(&config.docker)));
        }

        registry.register("env", Box::new(EnvSpec));
        registry.register("xargs", Box::new(XargsSpec));
        registry.register("tee", Box::new(TeeSpec));
        for shell in SHELLS {
            registry.register(*shell, Box::new(ShellSpec));
        }

        for (name, target) in &config.aliases {
            registry.alias(name, target);
        }

        log::debug!("registry built with {} handlers", registry.specs.len());
        registry
    }

    /// Register `spec` under `name`, replacing any existing handler.
    pub fn register(&mut self, name: impl Into<String>, spec: Box<dyn CommandSpec>) {
        self.specs.insert(name.into(), spec);
    }

    /// Make `name` an alias for the command line `target`.
    pub fn alias(&mut self, name: impl Into<String>, target: &str) {
        self.register(name, Box::new(AliasSpec::new(target)));
    }

    /// Look up a handler by exact command name.
    pub fn get(&self, name: &str) -> Option<&dyn CommandSpec> {
        self.specs.get(name).map(|b| b.as_ref())
    }
}
