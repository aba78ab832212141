//! Flatten a [`SyntaxNode`] into the commands it would run and the files it
//! would touch through redirects.
//!
//! Every substitution is followed: in arguments, assignment values, redirect
//! targets, here-strings, unquoted heredoc bodies, arithmetic and parameter
//! expansions. Function bodies are walked too, even though defining a function
//! runs nothing, because the name is usually called right after.

use crate::path::{PathContext, normalize_path};

use super::types::{
    Connector, ExtractedCommand, Extraction, Origin, Redirect, RedirectTarget, SimpleCommand,
    SyntaxNode, Word, WordPart,
};

/// Redirect targets that never need a rule.
const INERT_TARGETS: &[&str] = &["/dev/null", "/dev/stdout", "/dev/stderr", "/dev/tty"];

/// Whether writing to the normalized `path` is harmless.
pub fn is_inert_target(path: &str) -> bool {
    INERT_TARGETS.contains(&path)
}

/// Extract everything `root` would run or redirect, in traversal order.
pub fn extract(root: &SyntaxNode, paths: &PathContext) -> Extraction {
    let mut extractor = Extractor::default();
    extractor.node(root, Origin::TopLevel, paths);
    extractor.out
}

#[derive(Default)]
struct Extractor {
    out: Extraction,
}

impl Extractor {
    fn node(&mut self, node: &SyntaxNode, origin: Origin, paths: &PathContext) {
        match node {
            SyntaxNode::Command(cmd) => self.command(cmd, origin, paths),
            SyntaxNode::Pipeline(stages) => {
                for stage in stages {
                    self.node(stage, origin, paths);
                }
            }
            SyntaxNode::List { items, connectors } => self.list(items, connectors, origin, paths),
            SyntaxNode::Subshell(body) => self.node(body, origin, paths),
            SyntaxNode::Compound { words, body, .. } => {
                for word in words {
                    self.word(word, paths);
                }
                for item in body {
                    self.node(item, origin, paths);
                }
            }
            SyntaxNode::FunctionDef { body, .. } => self.node(body, origin, paths),
            SyntaxNode::Redirected { body, redirects } => {
                self.node(body, origin, paths);
                self.redirects(redirects, origin, paths);
            }
            SyntaxNode::Unsupported { kind, parts } => {
                log::debug!("unsupported construct in input: {kind}");
                self.out.unsupported.push(kind.clone());
                self.parts(parts, Origin::Substitution, paths);
            }
        }
    }

    /// A `cd DIR` followed by `&&` or `;` moves every later item of the list.
    fn list(
        &mut self,
        items: &[SyntaxNode],
        connectors: &[Connector],
        origin: Origin,
        paths: &PathContext,
    ) {
        let mut current = paths.clone();
        for (i, item) in items.iter().enumerate() {
            self.node(item, origin, &current);
            if let Some(dir) = cd_target(item)
                && matches!(
                    connectors.get(i),
                    Some(Connector::And | Connector::Sequence)
                )
            {
                let cwd = normalize_path(dir, &current);
                log::debug!("cd moves later commands to {cwd}");
                current = current.with_cwd(cwd);
            }
        }
    }

    fn command(&mut self, cmd: &SimpleCommand, origin: Origin, paths: &PathContext) {
        if !cmd.words.is_empty() {
            self.out.commands.push(ExtractedCommand {
                tokens: cmd.words.iter().map(|w| w.text.clone()).collect(),
                env: cmd
                    .assignments
                    .iter()
                    .map(|a| (a.name.clone(), a.value.text.clone()))
                    .collect(),
                origin,
                cwd: paths.cwd.clone(),
            });
        }
        for assignment in &cmd.assignments {
            self.word(&assignment.value, paths);
        }
        for word in &cmd.words {
            self.word(word, paths);
        }
        self.redirects(&cmd.redirects, origin, paths);
    }

    fn word(&mut self, word: &Word, paths: &PathContext) {
        self.parts(&word.parts, Origin::Substitution, paths);
    }

    /// Walk executable parts. `tag` is the origin given to commands found in a
    /// substitution at this level; arithmetic and parameter expansions retag
    /// what they contain.
    fn parts(&mut self, parts: &[WordPart], tag: Origin, paths: &PathContext) {
        for part in parts {
            match part {
                WordPart::Substitution(body) => self.node(body, tag, paths),
                WordPart::Arithmetic(inner) => self.parts(inner, Origin::Arithmetic, paths),
                WordPart::Parameter(inner) => {
                    self.parts(inner, Origin::ParameterExpansion, paths)
                }
            }
        }
    }

    fn redirects(&mut self, redirects: &[Redirect], origin: Origin, paths: &PathContext) {
        for redirect in redirects {
            match redirect {
                Redirect::File { op, target } => {
                    self.word(target, paths);
                    let path = normalize_path(&target.text, paths);
                    if is_inert_target(&path) {
                        continue;
                    }
                    self.out.redirects.push(RedirectTarget {
                        path,
                        op: *op,
                        origin,
                    });
                }
                Redirect::Duplicate => {}
                Redirect::HereString(word) => self.word(word, paths),
                Redirect::Heredoc {
                    quoted,
                    body,
                    trailing,
                } => {
                    if !quoted {
                        self.parts(body, Origin::Heredoc, paths);
                    }
                    for item in trailing {
                        self.node(item, origin, paths);
                    }
                }
            }
        }
    }
}

/// The directory of a plain `cd DIR` (or `~` for a bare `cd`).
fn cd_target(node: &SyntaxNode) -> Option<&str> {
    let SyntaxNode::Command(cmd) = node else {
        return None;
    };
    match cmd.words.as_slice() {
        [name] if name.text == "cd" => Some("~"),
        [name, dir] if name.text == "cd" && dir.is_literal() && dir.text != "-" => {
            Some(dir.text.as_str())
        }
        _ => None,
    }
}
