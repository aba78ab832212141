//! tree-sitter-bash front end.
//!
//! The concrete tree is converted once into [`SyntaxNode`] so the extractor
//! never deals with grammar details. Unknown statement kinds are kept as
//! [`SyntaxNode::Unsupported`] with their nested substitutions still attached,
//! so nothing executable inside them is lost.

use thiserror::Error;
use tree_sitter::{Language, Node, Parser};

use super::types::{
    Assignment, Connector, Redirect, RedirectOp, SimpleCommand, SyntaxNode, Word, WordPart,
};

/// Conversion stops descending past this depth and reports the construct as
/// unsupported, which resolves to `ask`.
pub const MAX_NESTING: usize = 200;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to load bash grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),
    #[error("parser produced no tree")]
    NoTree,
    #[error("syntax error at byte {0}")]
    Syntax(usize),
}

/// Parse shell source into a [`SyntaxNode`].
pub fn parse(source: &str) -> Result<SyntaxNode, ParseError> {
    // A heredoc may end at end of input; bash accepts that, the grammar
    // wants the closing newline.
    let owned;
    let source = if source.contains("<<") && !source.ends_with('\n') {
        owned = format!("{source}\n");
        owned.as_str()
    } else {
        source
    };

    let language: Language = tree_sitter_bash::LANGUAGE.into();
    let mut parser = Parser::new();
    parser.set_language(&language)?;

    let tree = parser.parse(source, None).ok_or(ParseError::NoTree)?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(ParseError::Syntax(first_error(root).unwrap_or(0)));
    }

    Ok(Converter { source }.statements(root, 0))
}

/// Byte offset of the first ERROR or MISSING node.
fn first_error(root: Node) -> Option<usize> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node.start_byte());
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

/// Node kinds that stand for something the shell runs.
fn is_statement(kind: &str) -> bool {
    matches!(
        kind,
        "command"
            | "pipeline"
            | "list"
            | "subshell"
            | "compound_statement"
            | "if_statement"
            | "while_statement"
            | "for_statement"
            | "c_style_for_statement"
            | "case_statement"
            | "function_definition"
            | "redirected_statement"
            | "negated_command"
            | "test_command"
            | "declaration_command"
            | "unset_command"
            | "variable_assignment"
            | "variable_assignments"
    )
}

/// All children with the field name each one is attached under.
fn children_with_fields<'t>(node: Node<'t>) -> Vec<(Option<&'static str>, Node<'t>)> {
    let mut cursor = node.walk();
    let mut out = Vec::new();
    if cursor.goto_first_child() {
        loop {
            out.push((cursor.field_name(), cursor.node()));
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    out
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn too_deep() -> SyntaxNode {
    SyntaxNode::Unsupported {
        kind: "nesting too deep".into(),
        parts: Vec::new(),
    }
}

struct Converter<'a> {
    source: &'a str,
}

impl<'a> Converter<'a> {
    fn text(&self, node: Node) -> &'a str {
        self.source.get(node.byte_range()).unwrap_or("")
    }

    // ── Statements ──

    /// Convert the statement children of `node` (program, subshell, bodies).
    fn statements(&self, node: Node, depth: usize) -> SyntaxNode {
        if depth > MAX_NESTING {
            return too_deep();
        }

        let mut items: Vec<SyntaxNode> = Vec::new();
        let mut connectors = Vec::new();
        let mut pending = None;

        for (_, child) in children_with_fields(node) {
            let kind = child.kind();
            match kind {
                ";" | ";;" | ";&" | ";;&" => pending = Some(Connector::Sequence),
                "&" => pending = Some(Connector::Background),
                "heredoc_body" => {
                    let parts = self.parts(child, depth + 1);
                    attach_heredoc_body(&mut items, parts);
                }
                k if is_statement(k) => {
                    if !items.is_empty() {
                        connectors.push(pending.take().unwrap_or(Connector::Sequence));
                    }
                    pending = None;
                    items.push(self.statement(child, depth + 1));
                }
                _ => {}
            }
        }

        if items.len() == 1 {
            if let Some(only) = items.pop() {
                return only;
            }
        }
        SyntaxNode::List { items, connectors }
    }

    fn statement(&self, node: Node, depth: usize) -> SyntaxNode {
        if depth > MAX_NESTING {
            return too_deep();
        }

        match node.kind() {
            "command" => SyntaxNode::Command(self.command(node, depth)),
            "variable_assignment" => SyntaxNode::Command(SimpleCommand {
                assignments: vec![self.assignment(node, depth)],
                ..Default::default()
            }),
            "variable_assignments" => SyntaxNode::Command(SimpleCommand {
                assignments: named_children(node)
                    .into_iter()
                    .filter(|c| c.kind() == "variable_assignment")
                    .map(|c| self.assignment(c, depth))
                    .collect(),
                ..Default::default()
            }),
            "declaration_command" | "unset_command" => {
                SyntaxNode::Command(self.declaration(node, depth))
            }
            "test_command" => self.test_command(node, depth),
            "pipeline" => {
                let mut stages = Vec::new();
                for child in named_children(node) {
                    if !is_statement(child.kind()) {
                        continue;
                    }
                    match self.statement(child, depth + 1) {
                        SyntaxNode::Pipeline(inner) if child.kind() == "pipeline" => {
                            stages.extend(inner)
                        }
                        other => stages.push(other),
                    }
                }
                SyntaxNode::Pipeline(stages)
            }
            "list" => self.list(node, depth),
            "subshell" => SyntaxNode::Subshell(Box::new(self.statements(node, depth + 1))),
            "negated_command" => named_children(node)
                .into_iter()
                .find(|c| is_statement(c.kind()))
                .map(|c| self.statement(c, depth + 1))
                .unwrap_or_else(SyntaxNode::empty),
            "redirected_statement" => self.redirected(node, depth),
            "function_definition" => SyntaxNode::FunctionDef {
                name: node
                    .child_by_field_name("name")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default(),
                body: Box::new(
                    node.child_by_field_name("body")
                        .map(|b| self.statement(b, depth + 1))
                        .unwrap_or_else(SyntaxNode::empty),
                ),
            },
            "compound_statement" | "if_statement" | "while_statement" | "for_statement"
            | "c_style_for_statement" | "case_statement" => self.compound(node, depth),
            kind => {
                log::debug!("unsupported construct: {kind}");
                SyntaxNode::Unsupported {
                    kind: kind.to_string(),
                    parts: self.parts(node, depth + 1),
                }
            }
        }
    }

    /// `a && b || c` is left-nested in the tree; walk the left spine
    /// iteratively so long chains do not count against the nesting limit.
    fn list(&self, node: Node, depth: usize) -> SyntaxNode {
        let mut spine = vec![node];
        let mut current = node;
        while let Some(first) = named_children(current).into_iter().next() {
            if first.kind() != "list" {
                break;
            }
            spine.push(first);
            current = first;
        }

        let mut items = Vec::new();
        let mut connectors = Vec::new();
        for (level, list) in spine.iter().rev().enumerate() {
            let mut skipped_nested = false;
            for (_, child) in children_with_fields(*list) {
                match child.kind() {
                    "&&" => connectors.push(Connector::And),
                    "||" => connectors.push(Connector::Or),
                    // the left operand of every list above the innermost one
                    "list" if level > 0 && !skipped_nested => skipped_nested = true,
                    k if is_statement(k) => items.push(self.statement(child, depth + 1)),
                    _ => {}
                }
            }
        }
        SyntaxNode::List { items, connectors }
    }

    fn command(&self, node: Node, depth: usize) -> SimpleCommand {
        let mut cmd = SimpleCommand::default();
        for (field, child) in children_with_fields(node) {
            match (field, child.kind()) {
                (_, "variable_assignment") => cmd.assignments.push(self.assignment(child, depth)),
                (_, "file_redirect" | "heredoc_redirect" | "herestring_redirect") => {
                    self.redirect(child, depth, &mut cmd)
                }
                (Some("name" | "argument"), _) => cmd.words.push(self.word(child, depth)),
                (_, "subshell") => {
                    // `cmd (...)` is not valid bash, but keep what it would run
                    let parts = vec![WordPart::Substitution(Box::new(
                        self.statements(child, depth + 1),
                    ))];
                    cmd.words.push(Word {
                        text: self.text(child).to_string(),
                        parts,
                    });
                }
                _ => {}
            }
        }
        cmd
    }

    fn assignment(&self, node: Node, depth: usize) -> Assignment {
        Assignment {
            name: node
                .child_by_field_name("name")
                .map(|n| self.text(n).to_string())
                .unwrap_or_default(),
            value: node
                .child_by_field_name("value")
                .map(|v| self.word(v, depth))
                .unwrap_or_default(),
        }
    }

    /// `export A=1 B`, `local x`, `unset y`: the keyword is the program name.
    fn declaration(&self, node: Node, depth: usize) -> SimpleCommand {
        let mut cmd = SimpleCommand::default();
        for (_, child) in children_with_fields(node) {
            if !child.is_named() {
                if cmd.words.is_empty() {
                    cmd.words.push(Word::literal(self.text(child)));
                }
                continue;
            }
            match child.kind() {
                "variable_assignment" => {
                    let value = self.assignment(child, depth).value;
                    cmd.words.push(Word {
                        text: self.text(child).to_string(),
                        parts: value.parts,
                    });
                }
                "file_redirect" | "heredoc_redirect" | "herestring_redirect" => {
                    self.redirect(child, depth, &mut cmd)
                }
                _ => cmd.words.push(self.word(child, depth)),
            }
        }
        cmd
    }

    /// `[ ... ]`, `[[ ... ]]` and `(( ... ))` evaluate expressions without
    /// running a program; only their substitutions matter.
    fn test_command(&self, node: Node, depth: usize) -> SyntaxNode {
        let text = self.text(node);
        let keyword = if text.starts_with("((") {
            "(("
        } else if text.starts_with("[[") {
            "[["
        } else {
            "["
        };
        let mut parts = self.parts(node, depth + 1);
        if keyword == "((" && !parts.is_empty() {
            parts = vec![WordPart::Arithmetic(parts)];
        }
        SyntaxNode::Compound {
            keyword: keyword.into(),
            words: vec![Word {
                text: text.to_string(),
                parts,
            }],
            body: Vec::new(),
        }
    }

    fn redirected(&self, node: Node, depth: usize) -> SyntaxNode {
        let mut body = None;
        let mut scratch = SimpleCommand::default();
        let mut bodies = Vec::new();

        for (field, child) in children_with_fields(node) {
            match child.kind() {
                "file_redirect" | "heredoc_redirect" | "herestring_redirect" => {
                    self.redirect(child, depth, &mut scratch)
                }
                "heredoc_body" => bodies.push(self.parts(child, depth + 1)),
                k if field == Some("body") || is_statement(k) => {
                    body = Some(self.statement(child, depth + 1))
                }
                _ => {}
            }
        }
        for parts in bodies.into_iter().filter(|p| !p.is_empty()) {
            if let Some(parts) = set_heredoc_body(&mut scratch.redirects, parts) {
                scratch.redirects.push(orphan_heredoc(parts));
            }
        }

        match body {
            Some(SyntaxNode::Command(mut cmd)) => {
                cmd.redirects.append(&mut scratch.redirects);
                cmd.words.append(&mut scratch.words);
                SyntaxNode::Command(cmd)
            }
            Some(other) => {
                if !scratch.words.is_empty() {
                    log::debug!("dropping heredoc arguments on a compound statement");
                }
                bind_redirects(other, scratch.redirects)
            }
            None => SyntaxNode::Command(scratch),
        }
    }

    /// Convert one redirect node into `cmd.redirects`. Heredocs can carry
    /// extra arguments for the command, which land in `cmd.words`.
    fn redirect(&self, node: Node, depth: usize, cmd: &mut SimpleCommand) {
        match node.kind() {
            "file_redirect" => cmd.redirects.push(self.file_redirect(node, depth)),
            "herestring_redirect" => {
                let word = named_children(node)
                    .into_iter()
                    .next()
                    .map(|w| self.word(w, depth))
                    .unwrap_or_default();
                cmd.redirects.push(Redirect::HereString(word));
            }
            "heredoc_redirect" => {
                let mut quoted = false;
                let mut body = Vec::new();
                let mut trailing = Vec::new();
                for (field, child) in children_with_fields(node) {
                    match child.kind() {
                        "heredoc_start" => {
                            quoted = self.text(child).contains(['\'', '"', '\\']);
                        }
                        "heredoc_body" => body = self.parts(child, depth + 1),
                        "file_redirect" | "herestring_redirect" => {
                            self.redirect(child, depth, cmd)
                        }
                        k if is_statement(k) => trailing.push(self.statement(child, depth + 1)),
                        _ if field == Some("argument") => cmd.words.push(self.word(child, depth)),
                        _ => {}
                    }
                }
                if quoted {
                    body.clear();
                }
                cmd.redirects.push(Redirect::Heredoc {
                    quoted,
                    body,
                    trailing,
                });
            }
            _ => {}
        }
    }

    fn file_redirect(&self, node: Node, depth: usize) -> Redirect {
        let mut op = "";
        let mut target: Option<Word> = None;
        for (field, child) in children_with_fields(node) {
            if field == Some("destination") {
                let word = self.word(child, depth);
                target = Some(match target {
                    None => word,
                    Some(mut t) => {
                        t.text.push_str(&word.text);
                        t.parts.extend(word.parts);
                        t
                    }
                });
            } else if !child.is_named() {
                op = child.kind();
            }
        }

        let target = target.unwrap_or_default();
        let redirect_op = match op {
            ">>" | "&>>" => RedirectOp::Append,
            "<" => RedirectOp::Read,
            "<&" | ">&" | "<&-" | ">&-" => {
                let t = target.text.as_str();
                if t.is_empty() || t == "-" || t.bytes().all(|b| b.is_ascii_digit()) {
                    return Redirect::Duplicate;
                }
                // `>& file` writes both streams to file
                RedirectOp::Write
            }
            _ => RedirectOp::Write,
        };
        Redirect::File {
            op: redirect_op,
            target,
        }
    }

    /// `if`, loops, `case`, `{ }` and `(( ))`.
    fn compound(&self, node: Node, depth: usize) -> SyntaxNode {
        let keyword = children_with_fields(node)
            .into_iter()
            .find(|(_, c)| !c.is_named())
            .map(|(_, c)| c.kind().to_string())
            .unwrap_or_else(|| node.kind().to_string());

        let mut words = Vec::new();
        let mut body = Vec::new();
        self.compound_parts(node, depth, &mut words, &mut body);

        if node.kind() == "c_style_for_statement" || keyword == "((" {
            for word in &mut words {
                let parts = std::mem::take(&mut word.parts);
                word.parts = vec![WordPart::Arithmetic(parts)];
            }
        }
        SyntaxNode::Compound {
            keyword,
            words,
            body,
        }
    }

    fn compound_parts(
        &self,
        node: Node,
        depth: usize,
        words: &mut Vec<Word>,
        body: &mut Vec<SyntaxNode>,
    ) {
        if depth > MAX_NESTING {
            body.push(too_deep());
            return;
        }
        for (_, child) in children_with_fields(node) {
            let kind = child.kind();
            if is_statement(kind) {
                body.push(self.statement(child, depth + 1));
            } else if matches!(kind, "do_group" | "elif_clause" | "else_clause" | "case_item") {
                self.compound_parts(child, depth + 1, words, body);
            } else if kind == "heredoc_body" {
                attach_heredoc_body(body, self.parts(child, depth + 1));
            } else if child.is_named() && kind != "comment" {
                // loop word lists, case subjects and patterns, arithmetic clauses
                let word = self.word(child, depth);
                if !word.parts.is_empty() {
                    words.push(word);
                }
            }
        }
    }

    // ── Words ──

    fn word(&self, node: Node, depth: usize) -> Word {
        Word {
            text: self.word_text(node),
            parts: self.parts(node, depth + 1),
        }
    }

    /// The literal text of a word with quoting removed. Expansions keep their
    /// source text.
    fn word_text(&self, node: Node) -> String {
        let text = self.text(node);
        match node.kind() {
            "word" => unescape(text),
            "raw_string" => strip_delimiters(text, "'", "'").to_string(),
            "string" => unescape_double_quoted(strip_delimiters(text, "\"", "\"")),
            "ansi_c_string" => strip_delimiters(text, "$'", "'").to_string(),
            "translated_string" => {
                unescape_double_quoted(strip_delimiters(text, "$\"", "\""))
            }
            "concatenation" | "command_name" => children_with_fields(node)
                .into_iter()
                .map(|(_, c)| {
                    if c.is_named() {
                        self.word_text(c)
                    } else {
                        self.text(c).to_string()
                    }
                })
                .collect(),
            _ => text.to_string(),
        }
    }

    fn parts(&self, node: Node, depth: usize) -> Vec<WordPart> {
        let mut out = Vec::new();
        self.collect_parts(node, depth, &mut out);
        out
    }

    fn collect_parts(&self, node: Node, depth: usize, out: &mut Vec<WordPart>) {
        if depth > MAX_NESTING {
            out.push(WordPart::Substitution(Box::new(too_deep())));
            return;
        }
        match node.kind() {
            "command_substitution" | "process_substitution" => out.push(WordPart::Substitution(
                Box::new(self.statements(node, depth + 1)),
            )),
            "arithmetic_expansion" => {
                let inner = self.child_parts(node, depth + 1);
                if !inner.is_empty() {
                    out.push(WordPart::Arithmetic(inner));
                }
            }
            "expansion" => {
                let inner = self.child_parts(node, depth + 1);
                if !inner.is_empty() {
                    out.push(WordPart::Parameter(inner));
                }
            }
            _ => {
                for child in named_children(node) {
                    self.collect_parts(child, depth + 1, out);
                }
            }
        }
    }

    fn child_parts(&self, node: Node, depth: usize) -> Vec<WordPart> {
        let mut out = Vec::new();
        for child in named_children(node) {
            self.collect_parts(child, depth, &mut out);
        }
        out
    }
}

/// Give a heredoc body that the grammar emitted as a separate node to the
/// last heredoc redirect before it. With no such redirect, scan it anyway.
fn attach_heredoc_body(items: &mut Vec<SyntaxNode>, parts: Vec<WordPart>) {
    if parts.is_empty() {
        return;
    }
    let leftover = match items.last_mut().and_then(last_redirects) {
        Some(redirects) => set_heredoc_body(redirects, parts),
        None => Some(parts),
    };
    if let Some(parts) = leftover {
        items.push(SyntaxNode::Command(SimpleCommand {
            redirects: vec![orphan_heredoc(parts)],
            ..Default::default()
        }));
    }
}

fn last_redirects(node: &mut SyntaxNode) -> Option<&mut Vec<Redirect>> {
    match node {
        SyntaxNode::Command(cmd) => Some(&mut cmd.redirects),
        SyntaxNode::Redirected { redirects, .. } => Some(redirects),
        SyntaxNode::Pipeline(items) | SyntaxNode::List { items, .. } => {
            items.last_mut().and_then(last_redirects)
        }
        _ => None,
    }
}

/// Trailing redirects on `a && b > f` or `a | b > f` belong to `b`, even
/// though the grammar hangs them on the whole list.
fn bind_redirects(node: SyntaxNode, mut redirects: Vec<Redirect>) -> SyntaxNode {
    match node {
        SyntaxNode::Command(mut cmd) => {
            cmd.redirects.append(&mut redirects);
            SyntaxNode::Command(cmd)
        }
        SyntaxNode::Pipeline(mut stages) => match stages.pop() {
            Some(last) => {
                stages.push(bind_redirects(last, redirects));
                SyntaxNode::Pipeline(stages)
            }
            None => SyntaxNode::Redirected {
                body: Box::new(SyntaxNode::Pipeline(stages)),
                redirects,
            },
        },
        SyntaxNode::List {
            mut items,
            connectors,
        } => match items.pop() {
            Some(last) => {
                items.push(bind_redirects(last, redirects));
                SyntaxNode::List { items, connectors }
            }
            None => SyntaxNode::Redirected {
                body: Box::new(SyntaxNode::List { items, connectors }),
                redirects,
            },
        },
        other => SyntaxNode::Redirected {
            body: Box::new(other),
            redirects,
        },
    }
}

/// Fill the first unquoted heredoc that has no body yet. Hands the parts
/// back when there is none.
fn set_heredoc_body(redirects: &mut [Redirect], parts: Vec<WordPart>) -> Option<Vec<WordPart>> {
    for redirect in redirects.iter_mut() {
        if let Redirect::Heredoc {
            quoted: false,
            body,
            ..
        } = redirect
            && body.is_empty()
        {
            *body = parts;
            return None;
        }
    }
    Some(parts)
}

fn orphan_heredoc(parts: Vec<WordPart>) -> Redirect {
    Redirect::Heredoc {
        quoted: false,
        body: parts,
        trailing: Vec::new(),
    }
}

fn strip_delimiters<'s>(text: &'s str, open: &str, close: &str) -> &'s str {
    text.strip_prefix(open)
        .and_then(|t| t.strip_suffix(close))
        .unwrap_or(text)
}

/// Unquoted word: a backslash escapes the next character.
fn unescape(text: &str) -> String {
    if !text.contains('\\') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('\n') => {}
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Double-quoted: only `\"`, `\\`, `\$`, `` \` `` and line continuations are escapes.
fn unescape_double_quoted(text: &str) -> String {
    if !text.contains('\\') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('"' | '\\' | '$' | '`') => {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                Some('\n') => {
                    chars.next();
                }
                _ => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
