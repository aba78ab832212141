/// Context handed to a [`CommandSpec`](crate::commands::CommandSpec) for one
/// simple command.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    /// All words of the command; `words[0]` is the program name.
    pub words: &'a [String],
    /// Leading `KEY=VALUE` assignments, not part of `words`.
    pub env_vars: &'a [(String, String)],
    /// Effective working directory of the command.
    pub cwd: &'a str,
}

impl<'a> CommandContext<'a> {
    pub fn new(words: &'a [String], env_vars: &'a [(String, String)], cwd: &'a str) -> Self {
        Self {
            words,
            env_vars,
            cwd,
        }
    }

    /// The program name (e.g. "git", "ls", "cargo").
    pub fn base_command(&self) -> &'a str {
        self.words.first().map(String::as_str).unwrap_or("")
    }

    /// Words after the program name.
    pub fn args(&self) -> &'a [String] {
        self.words.get(1..).unwrap_or(&[])
    }

    /// Check if a specific env var key is present.
    pub fn has_env(&self, key: &str) -> bool {
        self.env_vars.iter().any(|(k, _)| k == key)
    }

    /// Check if any argument matches a flag exactly.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.args().iter().any(|w| w == flag)
    }

    /// Check if any argument matches any of the given flags.
    pub fn has_any_flag(&self, flags: &[&str]) -> bool {
        self.args().iter().any(|w| flags.contains(&w.as_str()))
    }
}
