//! Hand-written single-pass lexer.
//!
//! The lexer never fails: bytes it cannot place become one-character
//! `Unknown` tokens, and literals missing their terminator become
//! `Unterminated` tokens running to end of input. Structural errors are
//! reported later by the reflection scanner.

use super::token::{is_keyword, Token, TokenKind, Unclosed};

/// Multi-character operators, longest first so the first match wins.
const OPERATORS: &[&str] = &[
    "<=>", "**=", "...", "<<=", ">>=", "===", "!==", "??=", "?->", "++", "--", "->", "=>", "::",
    "==", "!=", "<>", "<=", ">=", "&&", "||", "??", "+=", "-=", "*=", "/=", ".=", "%=", "&=", "|=",
    "^=", "<<", ">>", "**",
];

const SINGLE_PUNCT: &[u8] = b"+-*/%=<>!&|^~.,;:?()[]{}@$\\";

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c >= 0x80
}

fn is_ident_char(c: u8) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

/// Steps of `__halt_compiler ( ) ;`. Everything after the last one is data.
const HALTED: u8 = 4;

fn halt_progress(step: u8, kind: TokenKind, text: &str) -> u8 {
    match (step, kind, text) {
        (1, TokenKind::Punct, "(") => 2,
        (2, TokenKind::Punct, ")") => 3,
        (3, TokenKind::Punct, ";") | (3, TokenKind::CloseTag, _) => HALTED,
        (_, TokenKind::Keyword, t) if t.eq_ignore_ascii_case("__halt_compiler") => 1,
        _ => 0,
    }
}

fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

pub(crate) struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    in_code: bool,
    /// Last non-trivia token, used to lex reserved words in member position.
    prev: Option<(TokenKind, &'a str)>,
    halt: u8,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            in_code: false,
            prev: None,
            halt: 0,
        }
    }

    /// Lex the whole input. Trivia is dropped when `keep_trivia` is false.
    pub(crate) fn run(mut self, keep_trivia: bool) -> Vec<Token> {
        let mut tokens = Vec::new();
        let src = self.src;

        while self.pos < self.bytes.len() {
            let start = self.pos;
            let kind = if self.halt == HALTED {
                self.pos = self.bytes.len();
                TokenKind::InlineHtml
            } else if self.in_code {
                self.code_token()
            } else {
                self.inline_html()
            };
            let text = &src[start..self.pos];
            let line = self.line;
            self.line += text.bytes().filter(|&b| b == b'\n').count();

            if !kind.is_trivia() {
                self.prev = Some((kind, text));
                self.halt = halt_progress(self.halt, kind, text);
            }
            if keep_trivia || !kind.is_trivia() {
                tokens.push(Token {
                    kind,
                    text: text.to_string(),
                    offset: start,
                    line,
                });
            }
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            text: String::new(),
            offset: self.bytes.len(),
            line: self.line,
        });
        tokens
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn eat_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.pos < self.bytes.len() && pred(self.bytes[self.pos]) {
            self.pos += 1;
        }
    }

    /// Length of an open tag starting at `at`, if any.
    fn open_tag_len(&self, at: usize) -> Option<usize> {
        let rest = &self.bytes[at..];
        if rest.starts_with(b"<?=") {
            return Some(3);
        }
        if rest.len() >= 5 && rest[..5].eq_ignore_ascii_case(b"<?php") {
            // `<?phpx` is not a tag
            if rest.get(5).map_or(true, |&c| is_space(c)) {
                return Some(5);
            }
        }
        None
    }

    fn inline_html(&mut self) -> TokenKind {
        if let Some(len) = self.open_tag_len(self.pos) {
            self.pos += len;
            self.in_code = true;
            return TokenKind::OpenTag;
        }

        let mut at = self.pos + 1;
        while at < self.bytes.len() {
            if self.bytes[at] == b'<' && self.open_tag_len(at).is_some() {
                break;
            }
            at += 1;
        }
        // `<` is ASCII, so `at` is always a char boundary
        self.pos = at;
        TokenKind::InlineHtml
    }

    fn code_token(&mut self) -> TokenKind {
        let c = self.bytes[self.pos];
        match c {
            c if is_space(c) => {
                self.eat_while(is_space);
                TokenKind::Whitespace
            }
            b'#' if self.peek(1) == Some(b'[') => {
                self.pos += 2;
                TokenKind::Punct
            }
            b'#' => self.line_comment(1),
            b'/' if self.peek(1) == Some(b'/') => self.line_comment(2),
            b'/' if self.peek(1) == Some(b'*') => self.block_comment(),
            b'?' if self.peek(1) == Some(b'>') => {
                self.pos += 2;
                self.in_code = false;
                TokenKind::CloseTag
            }
            b'$' if self.peek(1).map_or(false, is_ident_start) => {
                self.pos += 1;
                self.eat_while(is_ident_char);
                TokenKind::Variable
            }
            b'\'' | b'"' | b'`' => self.quoted(c),
            b'<' if self.bytes[self.pos..].starts_with(b"<<<") => match self.heredoc() {
                Some(kind) => kind,
                None => self.operator(),
            },
            b'0'..=b'9' => self.number(),
            b'.' if self.peek(1).map_or(false, |d| d.is_ascii_digit()) => self.number(),
            b'\\' if self.peek(1).map_or(false, is_ident_start) => self.name(),
            c if is_ident_start(c) => self.name(),
            _ => self.operator(),
        }
    }

    /// Comment running to end of line or to a close tag.
    fn line_comment(&mut self, marker: usize) -> TokenKind {
        self.pos += marker;
        while self.pos < self.bytes.len() {
            let c = self.bytes[self.pos];
            if c == b'\n' || (c == b'?' && self.peek(1) == Some(b'>')) {
                break;
            }
            self.pos += 1;
        }
        TokenKind::Comment
    }

    fn block_comment(&mut self) -> TokenKind {
        let is_doc = self.bytes[self.pos..].starts_with(b"/**")
            && self.peek(3).map_or(false, is_space);
        let body = self.pos + 2;

        match self.src[body..].find("*/") {
            Some(end) => {
                self.pos = body + end + 2;
                if is_doc {
                    TokenKind::DocComment
                } else {
                    TokenKind::Comment
                }
            }
            None => {
                self.pos = self.bytes.len();
                TokenKind::Unterminated(Unclosed::Comment)
            }
        }
    }

    fn quoted(&mut self, quote: u8) -> TokenKind {
        self.pos += 1;
        while self.pos < self.bytes.len() {
            let c = self.bytes[self.pos];
            if c == b'\\' {
                self.pos = (self.pos + 2).min(self.bytes.len());
                continue;
            }
            if quote != b'\'' && self.at_interpolation() {
                if !self.interpolation() {
                    break;
                }
                continue;
            }
            self.pos += 1;
            if c == quote {
                return TokenKind::String;
            }
        }
        TokenKind::Unterminated(Unclosed::String)
    }

    /// `{$` or `${` inside an interpolating literal.
    fn at_interpolation(&self) -> bool {
        match self.bytes[self.pos] {
            b'{' => self.peek(1) == Some(b'$'),
            b'$' => self.peek(1) == Some(b'{'),
            _ => false,
        }
    }

    /// Skip a braced interpolation, including any literals nested in it
    /// (`"{$row["id"]}"`). Returns false when input ends first.
    fn interpolation(&mut self) -> bool {
        self.pos += 2;
        let mut depth = 1;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                q @ (b'\'' | b'"' | b'`') => {
                    if self.quoted(q) != TokenKind::String {
                        return false;
                    }
                }
                b'{' => {
                    depth += 1;
                    self.pos += 1;
                }
                b'}' => {
                    depth -= 1;
                    self.pos += 1;
                    if depth == 0 {
                        return true;
                    }
                }
                _ => self.pos += 1,
            }
        }
        false
    }

    /// Heredoc (`<<<EOT`) or nowdoc (`<<<'EOT'`). Returns `None` without
    /// consuming anything when the opener is not well formed.
    fn heredoc(&mut self) -> Option<TokenKind> {
        let bytes = self.bytes;
        let mut i = self.pos + 3;

        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
            i += 1;
        }
        let quote = match bytes.get(i) {
            Some(&q) if q == b'\'' || q == b'"' => {
                i += 1;
                Some(q)
            }
            _ => None,
        };

        let label_start = i;
        if !bytes.get(i).map_or(false, |&c| is_ident_start(c)) {
            return None;
        }
        while i < bytes.len() && is_ident_char(bytes[i]) {
            i += 1;
        }
        let label = &bytes[label_start..i];

        if let Some(q) = quote {
            if bytes.get(i) != Some(&q) {
                return None;
            }
            i += 1;
        }
        if bytes.get(i) == Some(&b'\r') {
            i += 1;
        }
        if bytes.get(i) != Some(&b'\n') {
            return None;
        }

        let mut line_start = i + 1;
        loop {
            let mut j = line_start;
            while j < bytes.len() && matches!(bytes[j], b' ' | b'\t') {
                j += 1;
            }
            let closes = bytes[j..].starts_with(label)
                && !bytes.get(j + label.len()).map_or(false, |&c| is_ident_char(c));
            if closes {
                self.pos = j + label.len();
                return Some(TokenKind::String);
            }

            match bytes[line_start..].iter().position(|&c| c == b'\n') {
                Some(k) => line_start += k + 1,
                None => {
                    self.pos = bytes.len();
                    return Some(TokenKind::Unterminated(Unclosed::Heredoc));
                }
            }
        }
    }

    fn number(&mut self) -> TokenKind {
        let radix_prefix = self.bytes[self.pos] == b'0'
            && matches!(self.peek(1), Some(b'x' | b'X' | b'b' | b'B' | b'o' | b'O'))
            && self.peek(2).map_or(false, |c| c.is_ascii_alphanumeric());
        if radix_prefix {
            self.pos += 2;
            self.eat_while(|c| c.is_ascii_hexdigit() || c == b'_');
            return TokenKind::Number;
        }

        self.eat_while(|c| c.is_ascii_digit() || c == b'_');
        if self.peek(0) == Some(b'.') && self.peek(1).map_or(false, |c| c.is_ascii_digit()) {
            self.pos += 1;
            self.eat_while(|c| c.is_ascii_digit() || c == b'_');
        }
        if matches!(self.peek(0), Some(b'e' | b'E')) {
            let exponent = match self.peek(1) {
                Some(b'+' | b'-') => self.peek(2).map_or(false, |c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if exponent {
                self.pos += 2;
                self.eat_while(|c| c.is_ascii_digit());
            }
        }
        TokenKind::Number
    }

    /// A name, optionally namespace-qualified. Reserved words become
    /// keywords unless they appear in member position.
    fn name(&mut self) -> TokenKind {
        let start = self.pos;
        if self.bytes[self.pos] == b'\\' {
            self.pos += 1;
        }
        loop {
            self.eat_while(is_ident_char);
            if self.peek(0) == Some(b'\\') && self.peek(1).map_or(false, is_ident_start) {
                self.pos += 1;
                continue;
            }
            break;
        }

        let word = &self.src[start..self.pos];
        if !word.contains('\\') && is_keyword(word) && !self.in_member_position() {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        }
    }

    fn in_member_position(&self) -> bool {
        match self.prev {
            Some((TokenKind::Punct, text)) => matches!(text, "->" | "?->" | "::"),
            Some((TokenKind::Keyword, text)) => {
                text.eq_ignore_ascii_case("function") || text.eq_ignore_ascii_case("const")
            }
            _ => false,
        }
    }

    fn operator(&mut self) -> TokenKind {
        let rest = &self.src[self.pos..];
        if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            self.pos += op.len();
            return TokenKind::Punct;
        }
        if SINGLE_PUNCT.contains(&self.bytes[self.pos]) {
            self.pos += 1;
            return TokenKind::Punct;
        }
        self.pos += rest.chars().next().map_or(1, char::len_utf8);
        TokenKind::Unknown
    }
}
