//! Parser: logos lexer and recursive-descent parser for the C/C++ subset
//! the index resolves.
//!
//! Parsing is fail-fast per file: a structural error produces a
//! [`ParseError`] for that file and never aborts the rest of a build round.

mod errors;
mod lexer;
#[allow(clippy::module_inception)]
mod parser;

pub use errors::ParseError;
pub use lexer::{Lexer, Token, TokenKind, tokenize};
pub use parser::parse;
