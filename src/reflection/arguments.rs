//! Argument classification and string literal unescaping.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use crate::tokenizer::{Token, TokenKind};

lazy_static! {
    /// `$name` or `{$` not preceded by a backslash.
    static ref INTERPOLATION: Regex = Regex::new(r"(?:^|[^\\])(?:\$[A-Za-z_\x{80}-\x{10FFFF}]|\{\$)").unwrap();
}

/// Closed set of argument shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentKind {
    /// A single variable, e.g. `$this`.
    Variable,
    /// A single quoted, heredoc or nowdoc literal.
    String,
    /// A single number or bare constant name, e.g. `123`, `null`, `PHP_EOL`.
    Constant,
    /// `[...]`, `array(...)` or `list(...)`.
    Array,
    /// Anything else.
    Expression,
}

impl ArgumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgumentKind::Variable => "variable",
            ArgumentKind::String => "string",
            ArgumentKind::Constant => "constant",
            ArgumentKind::Array => "array",
            ArgumentKind::Expression => "expression",
        }
    }
}

impl fmt::Display for ArgumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One argument of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    kind: ArgumentKind,
    value: String,
    source: String,
    name: Option<String>,
    token_start: usize,
    token_end: usize,
}

impl Argument {
    /// Classify the tokens in `range`, which must contain at least one
    /// significant token.
    pub(crate) fn classify(tokens: &[Token], range: Range<usize>) -> Self {
        let span = &tokens[range.clone()];
        let source: String = span.iter().map(|t| t.text.as_str()).collect();
        let mut sig: Vec<&Token> = span.iter().filter(|t| !t.is_trivia()).collect();

        let mut name = None;
        let labelled = sig.len() >= 3
            && matches!(sig[0].kind, TokenKind::Identifier | TokenKind::Keyword)
            && sig[1].is_punct(":");
        if labelled {
            name = Some(sig[0].text.clone());
            sig.drain(..2);
        }

        let value: String = sig.iter().map(|t| t.text.as_str()).collect();
        let kind = kind_of(&sig);

        Self {
            kind,
            value,
            source,
            name,
            token_start: range.start,
            token_end: range.end,
        }
    }

    pub fn kind(&self) -> ArgumentKind {
        self.kind
    }

    /// Argument text with whitespace and comments removed.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Exact source text of the argument span, trivia included.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Label of a named argument (`label: value`).
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Token index range of the span within the file's token stream.
    pub fn token_range(&self) -> Range<usize> {
        self.token_start..self.token_end
    }

    /// Unescaped contents of a string argument.
    pub fn string_value(&self) -> Option<String> {
        match self.kind {
            ArgumentKind::String => unescape(&self.value),
            _ => None,
        }
    }

    /// Whether a string argument contains variable interpolation.
    pub fn is_interpolated(&self) -> bool {
        if self.kind != ArgumentKind::String {
            return false;
        }
        let interpolating = self.value.starts_with('"')
            || (self.value.starts_with("<<<") && !is_nowdoc(&self.value));
        interpolating && INTERPOLATION.is_match(&self.value)
    }
}

fn kind_of(sig: &[&Token]) -> ArgumentKind {
    if let [only] = sig {
        return match only.kind {
            TokenKind::Variable => ArgumentKind::Variable,
            TokenKind::String if !only.text.starts_with('`') => ArgumentKind::String,
            TokenKind::Number | TokenKind::Identifier => ArgumentKind::Constant,
            _ => ArgumentKind::Expression,
        };
    }

    match sig {
        [first, ..] if first.is_punct("[") => ArgumentKind::Array,
        [first, second, ..]
            if (first.is_keyword("array") || first.is_keyword("list")) && second.is_punct("(") =>
        {
            ArgumentKind::Array
        }
        _ => ArgumentKind::Expression,
    }
}

fn is_nowdoc(literal: &str) -> bool {
    literal[3..]
        .trim_start_matches(|c: char| c == ' ' || c == '\t')
        .starts_with('\'')
}

/// Resolve the escape sequences of a string literal according to its
/// quoting style. Returns `None` if `literal` is not a string literal.
///
/// Interpolated variables are left as written.
pub fn unescape(literal: &str) -> Option<String> {
    if literal.starts_with("<<<") {
        return Some(unescape_heredoc(literal));
    }

    let quote = literal.chars().next()?;
    if !matches!(quote, '\'' | '"') || literal.len() < 2 || !literal.ends_with(quote) {
        return None;
    }
    let inner = &literal[1..literal.len() - 1];

    Some(if quote == '\'' {
        unescape_single(inner)
    } else {
        unescape_double(inner, true)
    })
}

/// Single quotes only know `\'` and `\\`.
fn unescape_single(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next == '\'' || next == '\\' {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Double-quote escapes. Unknown sequences keep their backslash.
fn unescape_double(inner: &str, quote_escape: bool) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(&next) = chars.peek() else {
            out.push('\\');
            break;
        };

        let simple = match next {
            'n' => Some('\n'),
            't' => Some('\t'),
            'r' => Some('\r'),
            'v' => Some('\u{0b}'),
            'e' => Some('\u{1b}'),
            'f' => Some('\u{0c}'),
            '\\' => Some('\\'),
            '$' => Some('$'),
            '"' if quote_escape => Some('"'),
            _ => None,
        };
        if let Some(resolved) = simple {
            out.push(resolved);
            chars.next();
            continue;
        }

        match next {
            '0'..='7' => {
                let digits = take_digits(&mut chars, 3, 8);
                let code = u32::from_str_radix(&digits, 8).unwrap_or(0) & 0xff;
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            'x' if chars.clone().nth(1).map_or(false, |d| d.is_ascii_hexdigit()) => {
                chars.next();
                let digits = take_digits(&mut chars, 2, 16);
                let code = u32::from_str_radix(&digits, 16).unwrap_or(0);
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            'u' if chars.clone().nth(1) == Some('{') => {
                let rest: String = chars.clone().skip(2).take_while(|&d| d != '}').collect();
                let closed = chars.clone().nth(2 + rest.chars().count()) == Some('}');
                match u32::from_str_radix(&rest, 16).ok().and_then(char::from_u32) {
                    Some(resolved) if closed => {
                        out.push(resolved);
                        for _ in 0..rest.chars().count() + 3 {
                            chars.next();
                        }
                    }
                    _ => out.push('\\'),
                }
            }
            _ => out.push('\\'),
        }
    }
    out
}

fn take_digits(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    max: usize,
    radix: u32,
) -> String {
    let mut digits = String::new();
    while digits.len() < max {
        match chars.peek() {
            Some(&d) if d.is_digit(radix) => {
                digits.push(d);
                chars.next();
            }
            _ => break,
        }
    }
    digits
}

/// Body of a heredoc or nowdoc with the closing marker's indentation
/// removed from every line.
fn unescape_heredoc(literal: &str) -> String {
    let nowdoc = is_nowdoc(literal);
    let Some((_, rest)) = literal.split_once('\n') else {
        return String::new();
    };

    let (body, closing) = match rest.rfind('\n') {
        Some(at) => (&rest[..at], &rest[at + 1..]),
        None => ("", rest),
    };
    let body = body.strip_suffix('\r').unwrap_or(body);
    let indent = closing.len() - closing.trim_start_matches(|c: char| c == ' ' || c == '\t').len();

    let lines: Vec<&str> = body
        .split('\n')
        .map(|line| {
            let strip = line
                .bytes()
                .take(indent)
                .take_while(|b| *b == b' ' || *b == b'\t')
                .count();
            &line[strip..]
        })
        .collect();
    let text = lines.join("\n");

    if nowdoc {
        text
    } else {
        unescape_double(&text, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    /// Classify everything between `<?php ` and the end of input.
    fn classify(code: &str) -> Argument {
        let tokens = tokenize(&format!("<?php {}", code));
        // skip open tag and the following whitespace, drop Eof
        Argument::classify(&tokens, 2..tokens.len() - 1)
    }

    #[test]
    fn test_classify_kinds() {
        assert_eq!(classify("$this").kind(), ArgumentKind::Variable);
        assert_eq!(classify("\"string\"").kind(), ArgumentKind::String);
        assert_eq!(classify("'single'").kind(), ArgumentKind::String);
        assert_eq!(classify("123").kind(), ArgumentKind::Constant);
        assert_eq!(classify("1.5e3").kind(), ArgumentKind::Constant);
        assert_eq!(classify("null").kind(), ArgumentKind::Constant);
        assert_eq!(classify("PHP_EOL").kind(), ArgumentKind::Constant);
        assert_eq!(classify("[1, 2]").kind(), ArgumentKind::Array);
        assert_eq!(classify("array('a' => 1)").kind(), ArgumentKind::Array);
        assert_eq!(classify("$a + $b").kind(), ArgumentKind::Expression);
        assert_eq!(classify("-1").kind(), ArgumentKind::Expression);
        assert_eq!(classify("foo($x)").kind(), ArgumentKind::Expression);
        assert_eq!(classify("`ls`").kind(), ArgumentKind::Expression);
        assert_eq!(classify("...$rest").kind(), ArgumentKind::Expression);
    }

    #[test]
    fn test_value_drops_trivia_and_source_keeps_it() {
        let arg = classify("$a + /* sum */ $b");
        assert_eq!(arg.value(), "$a+$b");
        assert_eq!(arg.source(), "$a + /* sum */ $b");
    }

    #[test]
    fn test_named_argument() {
        let arg = classify("timeout: 30");
        assert_eq!(arg.name(), Some("timeout"));
        assert_eq!(arg.kind(), ArgumentKind::Constant);
        assert_eq!(arg.value(), "30");

        let arg = classify("array: [1]");
        assert_eq!(arg.name(), Some("array"));
        assert_eq!(arg.kind(), ArgumentKind::Array);

        let arg = classify("Foo::BAR");
        assert_eq!(arg.name(), None);
        assert_eq!(arg.kind(), ArgumentKind::Expression);
    }

    #[test]
    fn test_unescape_single_quoted() {
        assert_eq!(unescape(r"'it\'s'").as_deref(), Some("it's"));
        assert_eq!(unescape(r"'back\\slash'").as_deref(), Some(r"back\slash"));
        assert_eq!(unescape(r"'keep\n'").as_deref(), Some(r"keep\n"));
    }

    #[test]
    fn test_unescape_double_quoted() {
        assert_eq!(unescape("\"string\"").as_deref(), Some("string"));
        assert_eq!(unescape(r#""a\tb\nc""#).as_deref(), Some("a\tb\nc"));
        assert_eq!(unescape(r#""say \"hi\"""#).as_deref(), Some("say \"hi\""));
        assert_eq!(unescape(r#""\x41\101\u{1F600}""#).as_deref(), Some("AA\u{1F600}"));
        assert_eq!(unescape(r#""\$price \q""#).as_deref(), Some(r"$price \q"));
        assert_eq!(unescape(r#""hello $name""#).as_deref(), Some("hello $name"));
        assert_eq!(unescape(r#""\u{zz}""#).as_deref(), Some(r"\u{zz}"));
    }

    #[test]
    fn test_unescape_rejects_non_strings() {
        assert_eq!(unescape("123"), None);
        assert_eq!(unescape("\""), None);
    }

    #[test]
    fn test_unescape_heredoc_and_nowdoc() {
        assert_eq!(
            unescape("<<<EOT\n    a\\tb\n      c\n    EOT").as_deref(),
            Some("a\tb\n  c")
        );
        assert_eq!(unescape("<<<'EOT'\n  raw\\t\n  EOT").as_deref(), Some("raw\\t"));
        assert_eq!(unescape("<<<EOT\nEOT").as_deref(), Some(""));
    }

    #[test]
    fn test_string_value_only_for_strings() {
        assert_eq!(classify("\"x\"").string_value().as_deref(), Some("x"));
        assert_eq!(classify("$x").string_value(), None);
    }

    #[test]
    fn test_interpolation() {
        assert!(classify("\"hello $name\"").is_interpolated());
        assert!(classify("\"{$user->name}\"").is_interpolated());
        assert!(!classify("\"\\$escaped\"").is_interpolated());
        assert!(!classify("'$literal'").is_interpolated());
        assert!(!classify("\"price: 5$\"").is_interpolated());
    }

    #[test]
    fn test_quotes_inside_interpolation() {
        let arg = classify(r#""Hi {$u["name"]}""#);
        assert_eq!(arg.kind(), ArgumentKind::String);
        assert!(arg.is_interpolated());
        assert_eq!(arg.string_value().as_deref(), Some(r#"Hi {$u["name"]}"#));
    }
}
