//! Lossless tokenizer for PHP source text.
//!
//! `tokenize` produces every byte of the input as part of some token, so
//! concatenating the token texts in order gives back the original source.
//! The stream always ends with a zero-width `Eof` token.
//!
//! ```
//! use phpreflect::tokenizer::{tokenize, TokenKind};
//!
//! let tokens = tokenize("<?php foo($bar);");
//! assert_eq!(tokens[0].kind, TokenKind::OpenTag);
//! assert!(tokens.iter().any(|t| t.kind == TokenKind::Variable && t.text == "$bar"));
//! ```

mod lexer;
mod token;

use serde::{Deserialize, Serialize};

pub use token::{is_keyword, Token, TokenKind, Unclosed};

/// Whether whitespace and comments are kept in the token stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trivia {
    #[default]
    Keep,
    Discard,
}

/// Tokenize source text, keeping all trivia.
pub fn tokenize(source: &str) -> Vec<Token> {
    tokenize_with(source, Trivia::Keep)
}

/// Tokenize source text with the given trivia policy.
///
/// With `Trivia::Discard` the stream is no longer lossless.
pub fn tokenize_with(source: &str, trivia: Trivia) -> Vec<Token> {
    lexer::Lexer::new(source).run(trivia == Trivia::Keep)
}

/// Concatenate token texts back into source text.
pub fn reconstruct(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}
