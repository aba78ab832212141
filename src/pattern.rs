//! Glob matching for rule patterns.
//!
//! Two dialects share one compiler ([`compile`]):
//!
//! - **command**: fnmatch over the whole space-joined command line. `*` crosses
//!   spaces and slashes. A literal pattern (no `*`, `?` or `[`) matches on word
//!   boundaries, so `git` matches `git status` but not `gitk`. A trailing ` *`
//!   also matches the bare command (`python *` matches `python`); `?*` does not.
//! - **path**: `/`-separated. `**` as a whole segment spans zero or more
//!   segments; any other segment is matched on its own, so `*` never crosses a
//!   separator. A pattern without any `/` is matched against the file name.
//!
//! Both are case-sensitive. Metacharacters are escaped with bracket forms
//! (`[*]`, `[?]`, `[[]`).

use glob::{MatchOptions, Pattern};

pub use glob::PatternError;

const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Whether `s` contains glob metacharacters.
pub fn has_glob(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Compile one glob. Runs of `*` are collapsed first; in fnmatch they mean the
/// same as a single `*`, and `glob` would otherwise read `**` as recursive.
fn compile(pattern: &str) -> Result<Pattern, PatternError> {
    let mut collapsed = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c == '*' && collapsed.ends_with('*') {
            continue;
        }
        collapsed.push(c);
    }
    Pattern::new(&collapsed)
}

fn glob_matches(text: &str, pattern: &str) -> bool {
    match compile(pattern) {
        Ok(p) => p.matches_with(text, OPTIONS),
        Err(e) => {
            log::warn!("invalid pattern {pattern:?}: {e}");
            false
        }
    }
}

// ── Command dialect ──

/// Check that a command pattern compiles.
pub fn validate_command(pattern: &str) -> Result<(), PatternError> {
    if has_glob(pattern) {
        compile(pattern)?;
    }
    Ok(())
}

/// Match a space-joined command line against a command pattern.
///
/// With `exact`, a literal pattern must equal the whole command and a trailing
/// ` *` no longer matches the bare command.
pub fn command_matches(text: &str, pattern: &str, exact: bool) -> bool {
    if !has_glob(pattern) {
        if exact || pattern.is_empty() {
            return text == pattern;
        }
        return text
            .strip_prefix(pattern)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '));
    }

    if !exact
        && let Some(stem) = pattern.strip_suffix(" *")
        && command_matches(text, stem.trim_end(), true)
    {
        return true;
    }
    glob_matches(text, pattern)
}

// ── Path dialect ──

enum Segment {
    /// `**`: zero or more whole segments.
    Recursive,
    Glob(Pattern),
}

/// Check that a path pattern compiles.
pub fn validate_path(pattern: &str) -> Result<(), PatternError> {
    for seg in pattern.split('/') {
        if seg != "**" {
            compile(seg)?;
        }
    }
    Ok(())
}

/// Match a normalized path against a path pattern.
pub fn path_matches(path: &str, pattern: &str) -> bool {
    if !pattern.contains('/') {
        if pattern == "**" {
            return true;
        }
        let name = path.rsplit('/').next().unwrap_or(path);
        return glob_matches(name, pattern);
    }

    let mut segments = Vec::new();
    for seg in pattern.split('/') {
        if seg == "**" {
            // `a/**/**/b` is the same as `a/**/b`
            if !matches!(segments.last(), Some(Segment::Recursive)) {
                segments.push(Segment::Recursive);
            }
            continue;
        }
        match compile(seg) {
            Ok(p) => segments.push(Segment::Glob(p)),
            Err(e) => {
                log::warn!("invalid path pattern {pattern:?}: {e}");
                return false;
            }
        }
    }

    let parts: Vec<&str> = path.split('/').collect();
    match_segments(&segments, &parts)
}

/// Segment-level wildcard match, O(segments × parts).
fn match_segments(segments: &[Segment], parts: &[&str]) -> bool {
    // row[j]: segments[..i] matches parts[..j]
    let mut row = vec![false; parts.len() + 1];
    row[0] = true;
    for seg in segments {
        let mut next = vec![false; parts.len() + 1];
        match seg {
            Segment::Recursive => {
                let mut reachable = false;
                for j in 0..=parts.len() {
                    reachable |= row[j];
                    next[j] = reachable;
                }
            }
            Segment::Glob(p) => {
                for j in 1..=parts.len() {
                    next[j] = row[j - 1] && p.matches_with(parts[j - 1], OPTIONS);
                }
            }
        }
        row = next;
    }
    row[parts.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── command dialect ──

    #[test]
    fn literal_is_word_prefix() {
        assert!(command_matches("ls", "ls", false));
        assert!(command_matches("ls -la", "ls", false));
        assert!(!command_matches("lsof", "ls", false));
        assert!(command_matches("git status -s", "git status", false));
        assert!(!command_matches("git stash", "git status", false));
    }

    #[test]
    fn exact_literal() {
        assert!(command_matches("git status", "git status", true));
        assert!(!command_matches("git status -s", "git status", true));
    }

    #[test]
    fn empty_pattern_only_matches_empty() {
        assert!(command_matches("", "", false));
        assert!(!command_matches("ls", "", false));
    }

    #[test]
    fn star_crosses_spaces() {
        assert!(command_matches("git commit -m 'a b c'", "git commit *", false));
        assert!(command_matches("rm -rf /tmp/x", "rm *", false));
        assert!(!command_matches("git commit --amend", "git commit -m *", false));
    }

    #[test]
    fn trailing_star_matches_bare() {
        assert!(command_matches("python", "python *", false));
        assert!(command_matches("python x.py", "python *", false));
        assert!(!command_matches("python3", "python *", false));
        assert!(!command_matches("python", "python *", true));
    }

    #[test]
    fn question_star_needs_argument() {
        assert!(!command_matches("python", "python ?*", false));
        assert!(command_matches("python x", "python ?*", false));
    }

    #[test]
    fn character_classes() {
        assert!(command_matches("cat a", "cat [abc]", false));
        assert!(!command_matches("cat d", "cat [abc]", false));
        assert!(command_matches("cat d", "cat [!abc]", false));
        assert!(command_matches("echo foo*bar", "echo foo[*]bar", false));
        assert!(!command_matches("echo fooXbar", "echo foo[*]bar", false));
        assert!(command_matches("echo ?", "echo [?]", false));
    }

    #[test]
    fn case_sensitive() {
        assert!(!command_matches("LS", "ls", false));
        assert!(!command_matches("Git push", "git *", false));
    }

    #[test]
    fn many_stars_terminate() {
        let text = "a".repeat(40);
        let pattern = format!("{}b", "*a".repeat(12));
        assert!(!command_matches(&text, &pattern, false));
    }

    #[test]
    fn validate_rejects_broken_class() {
        assert!(validate_command("ls [").is_err());
        assert!(validate_command("ls *").is_ok());
        assert!(validate_command("ls").is_ok());
    }

    // ── path dialect ──

    #[test]
    fn single_star_stays_in_segment() {
        assert!(path_matches("/tmp/out.txt", "/tmp/*"));
        assert!(!path_matches("/tmp/a/out.txt", "/tmp/*"));
        assert!(path_matches("/tmp/out.txt", "/tmp/*.txt"));
    }

    #[test]
    fn double_star_crosses_segments() {
        assert!(path_matches("/tmp/a/b/c", "/tmp/**"));
        assert!(path_matches("/tmp", "/tmp/**"));
        assert!(path_matches("/tmp/file.txt", "/tmp/**/*.txt"));
        assert!(path_matches("/tmp/a/b/file.txt", "/tmp/**/*.txt"));
        assert!(!path_matches("/var/file.txt", "/tmp/**/*.txt"));
    }

    #[test]
    fn leading_double_star() {
        assert!(path_matches("/foo", "**/foo"));
        assert!(path_matches("/a/b/foo", "**/foo"));
        assert!(!path_matches("/a/foobar", "**/foo"));
        assert!(path_matches("/home/user/.bashrc", "**/.*"));
    }

    #[test]
    fn bare_double_star_matches_everything() {
        assert!(path_matches("/anything/at/all", "**"));
        assert!(path_matches("/", "**"));
    }

    #[test]
    fn slashless_pattern_matches_file_name() {
        assert!(path_matches("/work/.env.local", ".env*"));
        assert!(path_matches("/var/log/app.log", "*.log"));
        assert!(!path_matches("/var/log/app.txt", "*.log"));
    }

    #[test]
    fn validate_path_patterns() {
        assert!(validate_path("/tmp/**/*.txt").is_ok());
        assert!(validate_path("/tmp/[").is_err());
    }
}
