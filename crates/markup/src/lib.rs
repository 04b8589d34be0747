//! Lexer and parser for the `.swen` declarative markup.
//!
//! `.swen` text declares the retained scene: braces delimit objects,
//! brackets ordered lists, parentheses tuples (vectors, colors, matrices).
//! The pipeline front end is
//!
//! ```text
//! source text ── Lexer ──► tokens ── Parser ──► SceneTree
//! ```
//!
//! Both stages write into bounded arenas and fail with typed
//! [`ParseError`]s carrying line/column/offset context.

pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use error::{ParseError, ParseErrorKind};
pub use lexer::{tokenize, Lexer, DEFAULT_TOKEN_CAPACITY};
pub use parser::parse;
pub use token::{Span, Token, TokenTag};

use swen_scene::SceneTree;

/// Lex and parse a complete `.swen` source with default arena capacities.
///
/// # Errors
/// Propagates the first lexer or parser error; both are fatal for the file.
pub fn parse_source(src: &str) -> Result<SceneTree, ParseError> {
    let tokens = lexer::tokenize(src)?;
    let mut tree = SceneTree::new();
    parser::parse(tokens.as_slice(), &mut tree)?;
    Ok(tree)
}
