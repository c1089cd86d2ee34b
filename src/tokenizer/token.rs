//! Token types produced by the lexer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved words of the language.
///
/// Lookups are done on the lowercased word; keywords are case-insensitive.
/// `self`, `parent`, `true`, `false`, `null` and `enum` are deliberately
/// absent: they lex as identifiers.
static KEYWORDS: phf::Set<&'static str> = phf::phf_set! {
    "__halt_compiler", "abstract", "and", "array", "as", "break", "callable",
    "case", "catch", "class", "clone", "const", "continue", "declare",
    "default", "die", "do", "echo", "else", "elseif", "empty", "enddeclare",
    "endfor", "endforeach", "endif", "endswitch", "endwhile", "eval", "exit",
    "extends", "final", "finally", "fn", "for", "foreach", "function",
    "global", "goto", "if", "implements", "include", "include_once",
    "instanceof", "insteadof", "interface", "isset", "list", "match",
    "namespace", "new", "or", "print", "private", "protected", "public",
    "readonly", "require", "require_once", "return", "static", "switch",
    "throw", "trait", "try", "unset", "use", "var", "while", "xor", "yield",
};

/// Check whether a bare word is a reserved keyword.
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(word.to_ascii_lowercase().as_str())
}

/// A literal that reached end of input without its terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unclosed {
    String,
    Comment,
    Heredoc,
}

impl Unclosed {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unclosed::String => "string",
            Unclosed::Comment => "comment",
            Unclosed::Heredoc => "heredoc",
        }
    }
}

/// Kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Text outside of `<?php ... ?>`.
    InlineHtml,
    /// `<?php` or `<?=`.
    OpenTag,
    /// `?>`.
    CloseTag,
    Whitespace,
    /// `// ...`, `# ...` and `/* ... */`.
    Comment,
    /// `/** ... */`.
    DocComment,
    /// Sigil plus name, e.g. `$this`.
    Variable,
    /// A bare or namespace-qualified name, e.g. `strlen` or `\Foo\bar`.
    Identifier,
    Keyword,
    /// Quoted, backtick, heredoc and nowdoc literals.
    String,
    Number,
    /// Operators and punctuation.
    Punct,
    /// A byte sequence the lexer does not recognise (one character).
    Unknown,
    /// A string, comment or heredoc that runs to end of input.
    Unterminated(Unclosed),
    /// Zero-width marker closing every token stream.
    Eof,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::InlineHtml => "inline_html",
            TokenKind::OpenTag => "open_tag",
            TokenKind::CloseTag => "close_tag",
            TokenKind::Whitespace => "whitespace",
            TokenKind::Comment => "comment",
            TokenKind::DocComment => "doc_comment",
            TokenKind::Variable => "variable",
            TokenKind::Identifier => "identifier",
            TokenKind::Keyword => "keyword",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::Punct => "punct",
            TokenKind::Unknown => "unknown",
            TokenKind::Unterminated(_) => "unterminated",
            TokenKind::Eof => "eof",
        }
    }

    /// Whitespace and comments.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::Comment | TokenKind::DocComment
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Unterminated(what) => write!(f, "unterminated {}", what.as_str()),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// A single lexical token with its exact source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the first character (0-indexed).
    pub offset: usize,
    /// Line of the first character (1-indexed).
    pub line: usize,
}

impl Token {
    /// Check for a punctuation token with the given text.
    pub fn is_punct(&self, text: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == text
    }

    /// Check for a keyword, ignoring case.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text.eq_ignore_ascii_case(keyword)
    }

    pub fn is_trivia(&self) -> bool {
        self.kind.is_trivia()
    }

    /// Byte offset one past the last character.
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}
