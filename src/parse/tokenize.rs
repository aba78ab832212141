/// Longest label shown for a sub-command in a combined reason.
pub const LABEL_MAX: usize = 60;

/// Split a `NAME=value` word into name and value.
///
/// `NAME` must be a shell identifier; anything else (`--opt=x`, `=x`) is not
/// an assignment.
pub fn split_assignment(word: &str) -> Option<(&str, &str)> {
    let (name, value) = word.split_once('=')?;
    let mut chars = name.chars();
    let first = chars.next()?;
    if (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Some((name, value))
    } else {
        None
    }
}

/// Tokenize raw text using shlex (POSIX word splitting).
///
/// Only used where no syntax tree is available.
pub fn tokenize(command: &str) -> Vec<String> {
    shlex::split(command).unwrap_or_else(|| {
        // Fallback: simple whitespace splitting if shlex can't parse
        command.split_whitespace().map(String::from).collect()
    })
}

/// Render tokens back into a shell-quoted command line for display.
pub fn render(tokens: &[String]) -> String {
    shlex::try_join(tokens.iter().map(String::as_str)).unwrap_or_else(|_| tokens.join(" "))
}

/// Single-line label of at most [`LABEL_MAX`] characters.
pub fn label(text: &str) -> String {
    let flat = text.trim().replace('\n', " ");
    if flat.chars().count() <= LABEL_MAX {
        return flat;
    }
    let mut out: String = flat.chars().take(LABEL_MAX - 3).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_words() {
        assert_eq!(split_assignment("FOO=bar"), Some(("FOO", "bar")));
        assert_eq!(split_assignment("_X1="), Some(("_X1", "")));
        assert_eq!(split_assignment("--opt=x"), None);
        assert_eq!(split_assignment("1X=y"), None);
        assert_eq!(split_assignment("plain"), None);
    }

    #[test]
    fn tokenize_quotes() {
        assert_eq!(
            tokenize("echo 'a b' \"c\""),
            vec!["echo".to_string(), "a b".into(), "c".into()]
        );
    }

    #[test]
    fn tokenize_unbalanced_falls_back() {
        assert_eq!(tokenize("echo 'oops"), vec!["echo", "'oops"]);
    }

    #[test]
    fn render_quotes_spaces() {
        let tokens = vec!["git".to_string(), "commit".into(), "-m".into(), "a b".into()];
        assert_eq!(render(&tokens), "git commit -m 'a b'");
    }

    #[test]
    fn label_truncates() {
        let long = "x".repeat(100);
        let l = label(&long);
        assert_eq!(l.chars().count(), LABEL_MAX);
        assert!(l.ends_with("..."));
        assert_eq!(label("  ls\n-la "), "ls -la");
    }
}
