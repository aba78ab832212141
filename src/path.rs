//! Path normalization for rule matching.
//!
//! Command tokens, rule patterns and redirect targets are all brought into the
//! same absolute, slash-clean form before they are compared. Normalization is
//! purely lexical: nothing touches the file system, symlinks are not resolved,
//! and shell expansions (`$HOME`, `*.txt`) stay literal because the shell only
//! expands them after a decision has been made.

use std::borrow::Cow;

/// Working directory and home directory for one classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathContext {
    /// Directory relative paths resolve against.
    pub cwd: String,
    /// Expansion for `~` and `~/...`. When unset, tilde paths are left alone.
    pub home: Option<String>,
}

impl PathContext {
    pub fn new(cwd: impl Into<String>, home: Option<String>) -> Self {
        Self {
            cwd: cwd.into(),
            home,
        }
    }

    /// Context for `cwd` with the home directory taken from `$HOME`.
    pub fn from_env(cwd: impl Into<String>) -> Self {
        Self::new(cwd, std::env::var("HOME").ok())
    }

    /// Same home, different working directory (after a leading `cd`).
    pub fn with_cwd(&self, cwd: impl Into<String>) -> Self {
        Self {
            cwd: cwd.into(),
            home: self.home.clone(),
        }
    }
}

/// Whether a command token names a file path and should be normalized.
///
/// Flags, variable references and URLs are never paths.
pub fn is_path_like(token: &str) -> bool {
    if token.is_empty() || token.starts_with('-') || token.starts_with('$') || token.contains("://")
    {
        return false;
    }
    matches!(token, "~" | "." | "..")
        || token.starts_with("~/")
        || token.starts_with("./")
        || token.starts_with("../")
        || token.contains('/')
}

/// Normalize a path to an absolute, slash-clean form.
///
/// `~` and `~/x` expand to the home directory; relative paths resolve against
/// the working directory; `.`/`..` segments, repeated slashes and trailing
/// slashes are removed. `~user/x`, `$VAR/x`, URLs and empty input come back
/// unchanged. Applying this to its own output is a no-op.
pub fn normalize_path(raw: &str, ctx: &PathContext) -> String {
    if raw.is_empty() || raw.starts_with('$') || raw.contains("://") {
        return raw.to_string();
    }

    let expanded = shellexpand::tilde_with_context(raw, || ctx.home.as_deref());
    if expanded.starts_with('~') {
        // `~user/...` or no home directory known
        return raw.to_string();
    }

    if expanded.starts_with('/') {
        clean(&expanded)
    } else {
        clean(&format!("{}/{}", ctx.cwd, expanded))
    }
}

/// Normalize a command token if it looks like a path, borrow it otherwise.
pub fn normalize_token<'a>(token: &'a str, ctx: &PathContext) -> Cow<'a, str> {
    if is_path_like(token) {
        Cow::Owned(normalize_path(token, ctx))
    } else {
        Cow::Borrowed(token)
    }
}

/// Lexically collapse `.`, `..` and empty segments.
fn clean(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            s => parts.push(s),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}
