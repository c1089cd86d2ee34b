//! Call-site extraction.
//!
//! An invocation is a name immediately followed by `(`. Argument lists are
//! split on commas that sit directly inside the call's own parentheses;
//! nested groups are skipped whole using the precomputed delimiter pairs.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tokenizer::{Token, TokenKind};

use super::arguments::Argument;
use super::error::{Fault, MalformedReason, ReflectionError};

/// How a call is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationKind {
    /// `foo()`
    Function,
    /// `$obj->foo()`
    Method,
    /// `$obj?->foo()`
    NullsafeMethod,
    /// `Foo::bar()`
    Static,
}

impl InvocationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvocationKind::Function => "function",
            InvocationKind::Method => "method",
            InvocationKind::NullsafeMethod => "nullsafe_method",
            InvocationKind::Static => "static",
        }
    }

    fn from_operator(op: &str) -> Option<Self> {
        match op {
            "->" => Some(InvocationKind::Method),
            "?->" => Some(InvocationKind::NullsafeMethod),
            "::" => Some(InvocationKind::Static),
            _ => None,
        }
    }

    pub fn operator(&self) -> Option<&'static str> {
        match self {
            InvocationKind::Function => None,
            InvocationKind::Method => Some("->"),
            InvocationKind::NullsafeMethod => Some("?->"),
            InvocationKind::Static => Some("::"),
        }
    }
}

impl fmt::Display for InvocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A call expression and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    name: String,
    kind: InvocationKind,
    receiver: Option<String>,
    token_index: usize,
    line: usize,
    level: usize,
    source: String,
    arguments: Vec<Argument>,
}

impl Invocation {
    /// Called name as written, e.g. `strlen` or `\App\helper`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> InvocationKind {
        self.kind
    }

    pub fn is_method(&self) -> bool {
        self.kind != InvocationKind::Function
    }

    /// Token before the call operator: `$this`, `self`, `Foo`, ...
    ///
    /// `None` for plain functions and for receivers that are themselves
    /// expressions, e.g. `foo()->bar()`.
    pub fn receiver(&self) -> Option<&str> {
        self.receiver.as_deref()
    }

    /// Index of the name token in the token stream.
    pub fn token_index(&self) -> usize {
        self.token_index
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// Number of invocations whose argument list encloses this one.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Verbatim text of the call, receiver through closing parenthesis.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn argument_count(&self) -> usize {
        self.arguments.len()
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn argument(&self, index: usize) -> Result<&Argument, ReflectionError> {
        self.arguments
            .get(index)
            .ok_or(ReflectionError::ArgumentIndex {
                index,
                count: self.arguments.len(),
            })
    }
}

/// Find every invocation in source order.
pub(crate) fn extract_invocations(
    tokens: &[Token],
    sig: &[usize],
    partners: &[Option<usize>],
) -> Result<Vec<Invocation>, Fault> {
    let mut invocations = Vec::new();
    // closing parens of the calls enclosing the current position
    let mut enclosing: Vec<usize> = Vec::new();
    let mut p = 0;

    while p < sig.len() {
        let token = &tokens[sig[p]];

        // attribute arguments are metadata, not calls
        if token.is_punct("#[") {
            let close = partners[sig[p]].unwrap_or(sig[p]);
            while p < sig.len() && sig[p] <= close {
                p += 1;
            }
            continue;
        }

        let opens_call = token.kind == TokenKind::Identifier
            && sig.get(p + 1).map_or(false, |&i| tokens[i].is_punct("("));
        if !opens_call || is_declaration_or_constructor(tokens, sig, p) {
            p += 1;
            continue;
        }

        let open = sig[p + 1];
        let Some(close) = partners[open] else {
            return Err(Fault::new(
                tokens[open].line,
                MalformedReason::Unclosed("(".to_string()),
            ));
        };

        while enclosing.last().map_or(false, |&end| end < open) {
            enclosing.pop();
        }
        let level = enclosing.len();
        enclosing.push(close);

        let (kind, receiver, start) = dispatch(tokens, sig, p);
        let source: String = tokens[start..=close].iter().map(|t| t.text.as_str()).collect();
        let arguments = split_arguments(tokens, partners, open, close)
            .map_err(|line| Fault::new(line, MalformedReason::EmptyArgument(token.text.clone())))?;

        invocations.push(Invocation {
            name: token.text.clone(),
            kind,
            receiver,
            token_index: sig[p],
            line: token.line,
            level,
            source,
            arguments,
        });
        p += 1;
    }

    Ok(invocations)
}

/// `function foo(`, `function &foo(` and `new Foo(`.
fn is_declaration_or_constructor(tokens: &[Token], sig: &[usize], p: usize) -> bool {
    let before = |back: usize| p.checked_sub(back).map(|q| &tokens[sig[q]]);
    match before(1) {
        Some(prev) if prev.is_keyword("function") || prev.is_keyword("new") => true,
        Some(prev) if prev.is_punct("&") => before(2).map_or(false, |t| t.is_keyword("function")),
        _ => false,
    }
}

/// Work out the call kind, its receiver and the first token of the call.
fn dispatch(tokens: &[Token], sig: &[usize], p: usize) -> (InvocationKind, Option<String>, usize) {
    let operator = p.checked_sub(1).map(|q| (q, &tokens[sig[q]]));
    let kind = operator
        .filter(|(_, t)| t.kind == TokenKind::Punct)
        .and_then(|(q, t)| InvocationKind::from_operator(&t.text).map(|k| (q, k)));

    let Some((q, kind)) = kind else {
        return (InvocationKind::Function, None, sig[p]);
    };

    let receiver = q.checked_sub(1).map(|r| (r, &tokens[sig[r]])).filter(|(r, t)| {
        let simple = matches!(t.kind, TokenKind::Variable | TokenKind::Identifier)
            || t.is_keyword("static");
        // `$a->b->c()`: `b` is a property fetch, not the receiver
        let chained = r
            .checked_sub(1)
            .map_or(false, |m| InvocationKind::from_operator(&tokens[sig[m]].text).is_some());
        simple && !chained
    });
    match receiver {
        Some((r, t)) => (kind, Some(t.text.clone()), sig[r]),
        None => (kind, None, sig[q]),
    }
}

/// Split the tokens strictly between `open` and `close` on top-level commas.
///
/// A single trailing comma is allowed. Any other empty argument yields the
/// line of the comma preceding it.
fn split_arguments(
    tokens: &[Token],
    partners: &[Option<usize>],
    open: usize,
    close: usize,
) -> Result<Vec<Argument>, usize> {
    let mut spans = Vec::new();
    let mut start = open + 1;
    let mut i = open + 1;

    while i < close {
        if tokens[i].is_punct(",") {
            spans.push((start, i));
            start = i + 1;
        } else if let Some(partner) = partners[i].filter(|&j| j > i) {
            i = partner;
        }
        i += 1;
    }
    spans.push((start, close));

    let is_empty = |&(s, e): &(usize, usize)| tokens[s..e].iter().all(|t| t.is_trivia());
    // `foo()` and `foo(1, 2,)`
    if spans.last().map_or(false, is_empty) {
        spans.pop();
    }
    if let Some(&(s, _)) = spans.iter().find(|span| is_empty(span)) {
        return Err(tokens[s.saturating_sub(1)].line);
    }

    Ok(spans
        .into_iter()
        .map(|(s, e)| Argument::classify(tokens, s..e))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::arguments::ArgumentKind;
    use crate::reflection::structure::{match_delimiters, significant};
    use crate::tokenizer::{reconstruct, tokenize};

    fn extract(source: &str) -> Vec<Invocation> {
        let tokens = tokenize(source);
        let sig = significant(&tokens);
        let partners = match_delimiters(&tokens).unwrap();
        extract_invocations(&tokens, &sig, &partners).unwrap()
    }

    fn names(source: &str) -> Vec<String> {
        extract(source).iter().map(|i| i.name().to_string()).collect()
    }

    #[test]
    fn test_basic_arguments() {
        let calls = extract("<?php test_function_a($this, $a+$b);");
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.name(), "test_function_a");
        assert_eq!(call.argument_count(), 2);
        assert_eq!(call.argument(0).unwrap().kind(), ArgumentKind::Variable);
        assert_eq!(call.argument(0).unwrap().value(), "$this");
        assert_eq!(call.argument(1).unwrap().kind(), ArgumentKind::Expression);
        assert_eq!(call.argument(1).unwrap().value(), "$a+$b");
    }

    #[test]
    fn test_zero_arguments() {
        let calls = extract("<?php foo(); bar( /* nothing */ );");
        assert_eq!(calls[0].argument_count(), 0);
        assert_eq!(calls[1].argument_count(), 0);
    }

    #[test]
    fn test_argument_index_out_of_range() {
        let calls = extract("<?php foo(1);");
        assert!(calls[0].argument(0).is_ok());
        match calls[0].argument(1) {
            Err(ReflectionError::ArgumentIndex { index, count }) => {
                assert_eq!(index, 1);
                assert_eq!(count, 1);
            }
            other => panic!("expected index error, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_delimiters_do_not_split() {
        let calls = extract("<?php f(g(1, 2), [3, 4], function () { return h(5, 6); }, \"a,b\");");
        let f = &calls[0];
        assert_eq!(f.name(), "f");
        assert_eq!(f.argument_count(), 4);
        assert_eq!(f.argument(0).unwrap().value(), "g(1,2)");
        assert_eq!(f.argument(1).unwrap().kind(), ArgumentKind::Array);
        assert_eq!(f.argument(3).unwrap().kind(), ArgumentKind::String);
        assert_eq!(names("<?php f(g(1, 2), [h()]);"), vec!["f", "g", "h"]);
    }

    #[test]
    fn test_spans_reconstruct_argument_text() {
        let source = "<?php call( $a ,\n  \"x(y\" , [1,2] /* c */,foo( 3 ) );";
        let tokens = tokenize(source);
        let calls = extract(source);
        let call = &calls[0];

        let joined: Vec<String> = call
            .arguments()
            .iter()
            .map(|a| reconstruct(&tokens[a.token_range()]))
            .collect();
        let between = &source[source.find('(').unwrap() + 1..source.rfind(')').unwrap()];
        assert_eq!(joined.join(","), between);
    }

    #[test]
    fn test_trailing_comma() {
        let calls = extract("<?php foo(1, 2,);");
        assert_eq!(calls[0].argument_count(), 2);
    }

    #[test]
    fn test_empty_argument_is_malformed() {
        let tokens = tokenize("<?php foo(1,, 2);");
        let sig = significant(&tokens);
        let partners = match_delimiters(&tokens).unwrap();
        let fault = extract_invocations(&tokens, &sig, &partners).unwrap_err();
        assert_eq!(fault.reason, MalformedReason::EmptyArgument("foo".to_string()));

        let tokens = tokenize("<?php foo(,);");
        let sig = significant(&tokens);
        let partners = match_delimiters(&tokens).unwrap();
        assert!(extract_invocations(&tokens, &sig, &partners).is_err());
    }

    #[test]
    fn test_declarations_constructors_and_keywords_are_not_calls() {
        let source = r#"<?php
function hello() {}
function &ref() {}
$x = new Foo(1);
$y = new \App\Bar();
if ($a) { while (true) {} }
isset($b); empty($c); array(1); list($d) = $e; exit(0);
$f = fn($z) => $z;
$g = match ($h) { default => 1 };
"#;
        assert!(names(source).is_empty());
    }

    #[test]
    fn test_methods_and_static_calls() {
        let calls = extract("<?php $this->load('x'); $u?->name(); self::make(); static::boot(); Foo\\Bar::create(); foo()->bar();");
        let summary: Vec<(&str, InvocationKind, Option<&str>)> = calls
            .iter()
            .map(|c| (c.name(), c.kind(), c.receiver()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("load", InvocationKind::Method, Some("$this")),
                ("name", InvocationKind::NullsafeMethod, Some("$u")),
                ("make", InvocationKind::Static, Some("self")),
                ("boot", InvocationKind::Static, Some("static")),
                ("create", InvocationKind::Static, Some("Foo\\Bar")),
                ("foo", InvocationKind::Function, None),
                ("bar", InvocationKind::Method, None),
            ]
        );
        assert_eq!(calls[0].source(), "$this->load('x')");
        assert_eq!(calls[6].source(), "->bar()");
        assert!(calls[0].is_method());
        assert!(!calls[5].is_method());
    }

    #[test]
    fn test_chained_receivers_are_expressions() {
        let calls = extract("<?php $this->repo->find($id); Foo::$registry->get('k'); $a?->b?->c();");
        let summary: Vec<(&str, Option<&str>, &str)> = calls
            .iter()
            .map(|c| (c.name(), c.receiver(), c.source()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("find", None, "->find($id)"),
                ("get", None, "->get('k')"),
                ("c", None, "?->c()"),
            ]
        );
    }

    #[test]
    fn test_nesting_levels() {
        let calls = extract("<?php a(b(c()), d()); e();");
        let levels: Vec<(&str, usize)> = calls.iter().map(|c| (c.name(), c.level())).collect();
        assert_eq!(levels, vec![("a", 0), ("b", 1), ("c", 2), ("d", 1), ("e", 0)]);
    }

    #[test]
    fn test_attributes_are_skipped() {
        let source = "<?php #[Route('/x', methods: ['GET'])] function handler() { render('v'); }";
        assert_eq!(names(source), vec!["render"]);
    }

    #[test]
    fn test_lines() {
        let calls = extract("<?php\n\nfoo(\n  1\n);");
        assert_eq!(calls[0].line(), 3);
    }
}
