pub mod extract;
pub mod shell;
pub mod tokenize;
pub mod types;

pub use extract::{extract, is_inert_target};
pub use shell::{ParseError, parse};
pub use tokenize::{label, render, split_assignment, tokenize};
pub use types::{
    Connector, ExtractedCommand, Extraction, Origin, Redirect, RedirectOp, RedirectTarget,
    SimpleCommand, SyntaxNode, Word, WordPart,
};
