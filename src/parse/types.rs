/// A shell syntax tree, independent of the parser that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxNode {
    /// One program invocation (possibly with no words, e.g. `X=1` or `> f`).
    Command(SimpleCommand),
    /// `a | b | c`
    Pipeline(Vec<SyntaxNode>),
    /// Statements joined by `;`, `&`, `&&`, `||` or newlines.
    /// `connectors[i]` sits between `items[i]` and `items[i + 1]`.
    List {
        items: Vec<SyntaxNode>,
        connectors: Vec<Connector>,
    },
    /// `( ... )`
    Subshell(Box<SyntaxNode>),
    /// `{ ...; }`, `if`, `while`, `for`, `case`, `(( ))`: statements that may
    /// run, plus control words whose expansions run (loop lists, case subjects,
    /// arithmetic clauses).
    Compound {
        keyword: String,
        words: Vec<Word>,
        body: Vec<SyntaxNode>,
    },
    /// `name() { ... }`
    FunctionDef { name: String, body: Box<SyntaxNode> },
    /// Redirects attached to a non-command statement (`{ a; b; } > out`).
    Redirected {
        body: Box<SyntaxNode>,
        redirects: Vec<Redirect>,
    },
    /// A construct the engine does not model. `parts` are the executable
    /// pieces found anywhere inside it.
    Unsupported { kind: String, parts: Vec<WordPart> },
}

impl SyntaxNode {
    /// An empty statement list.
    pub fn empty() -> Self {
        SyntaxNode::List {
            items: Vec::new(),
            connectors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    /// `;` or newline
    Sequence,
    /// `&`
    Background,
    /// `&&`
    And,
    /// `||`
    Or,
}

impl Connector {
    pub fn as_str(self) -> &'static str {
        match self {
            Connector::Sequence => ";",
            Connector::Background => "&",
            Connector::And => "&&",
            Connector::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleCommand {
    /// Leading `NAME=value` assignments.
    pub assignments: Vec<Assignment>,
    /// Program name followed by its arguments.
    pub words: Vec<Word>,
    pub redirects: Vec<Redirect>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub name: String,
    pub value: Word,
}

/// One shell word: its literal (quote-stripped) text plus every executable
/// piece embedded in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    pub parts: Vec<WordPart>,
}

impl Word {
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parts: Vec::new(),
        }
    }

    /// True when the word has no substitutions or expansions inside.
    pub fn is_literal(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Executable content inside a word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordPart {
    /// `$(...)`, backticks, `<(...)`, `>(...)`
    Substitution(Box<SyntaxNode>),
    /// `$(( ... ))` and arithmetic clauses
    Arithmetic(Vec<WordPart>),
    /// `${...}`, whose default/assignment forms can hold substitutions
    Parameter(Vec<WordPart>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// `>`, `>>`, `<`, `&>` and friends.
    File {
        op: RedirectOp,
        target: Word,
    },
    /// `<&N`, `>&N`, `>&-`: descriptor duplication, no file involved.
    Duplicate,
    /// `<<< word`
    HereString(Word),
    /// `<<EOF ... EOF`. `body` is empty when the delimiter is quoted.
    /// `trailing` holds statements written after the delimiter on the same
    /// line (`cat <<EOF | grep x`, `cat <<EOF && rm f`).
    Heredoc {
        quoted: bool,
        body: Vec<WordPart>,
        trailing: Vec<SyntaxNode>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectOp {
    Write,
    Append,
    Read,
}

impl RedirectOp {
    pub fn as_str(self) -> &'static str {
        match self {
            RedirectOp::Write => "write",
            RedirectOp::Append => "append",
            RedirectOp::Read => "read",
        }
    }
}

/// Where an extracted command or redirect was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    TopLevel,
    Substitution,
    Heredoc,
    Arithmetic,
    ParameterExpansion,
}

impl Origin {
    /// Wrap a label with a marker for where it was found.
    pub fn decorate(self, label: &str) -> String {
        match self {
            Origin::TopLevel => label.to_string(),
            Origin::Substitution => format!("$({label})"),
            Origin::Heredoc => format!("heredoc $({label})"),
            Origin::Arithmetic => format!("$(( $({label}) ))"),
            Origin::ParameterExpansion => format!("${{..$({label})}}"),
        }
    }
}

/// A simple command the input would run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCommand {
    /// Non-empty; `tokens[0]` is the program name.
    pub tokens: Vec<String>,
    /// Leading `NAME=value` assignments, in order.
    pub env: Vec<(String, String)>,
    pub origin: Origin,
    /// Effective working directory (differs from the invocation's after `cd`).
    pub cwd: String,
}

/// A file the input would read or write through a redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    /// Normalized (see [`crate::path::normalize_path`]).
    pub path: String,
    pub op: RedirectOp,
    pub origin: Origin,
}

/// Everything the extractor found in one tree, in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub commands: Vec<ExtractedCommand>,
    pub redirects: Vec<RedirectTarget>,
    /// Construct kinds the engine does not model.
    pub unsupported: Vec<String>,
}
