//! Declaration scanner: classes, interfaces, traits, enums and free functions.
//!
//! A single pass over the significant tokens with an explicit scope stack.
//! Each `{` pushes the scope announced by the preceding declaration keyword
//! (or a plain block), so nesting depth never grows the call stack.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tokenizer::{Token, TokenKind};

use super::error::{Fault, MalformedReason};

/// Kind of a named declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Class,
    Interface,
    Trait,
    Enum,
    Function,
}

impl DeclarationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationKind::Class => "class",
            DeclarationKind::Interface => "interface",
            DeclarationKind::Trait => "trait",
            DeclarationKind::Enum => "enum",
            DeclarationKind::Function => "function",
        }
    }

    /// Classes, interfaces, traits and enums.
    pub fn is_class_like(&self) -> bool {
        !matches!(self, DeclarationKind::Function)
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named declaration site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: DeclarationKind,
    /// Fully qualified name, e.g. `App\Models\User`.
    pub name: String,
    /// Name as written after the keyword.
    pub short_name: String,
    /// Index of the declaring keyword in the token stream.
    pub token_index: usize,
    /// Line number (1-indexed).
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Namespace,
    ClassLike,
    Function,
    Block,
}

/// Everything the declaration pass finds.
#[derive(Debug, Default)]
pub(crate) struct DeclarationScan {
    pub declarations: Vec<Declaration>,
    pub has_includes: bool,
}

struct Scanner<'t> {
    tokens: &'t [Token],
    sig: &'t [usize],
    scopes: Vec<Scope>,
    /// Scopes announced by a keyword whose `{` has not been reached yet.
    /// A stack, since `new class(function () {}) {` announces two.
    pending: Vec<Scope>,
    namespace: String,
    class_depth: usize,
    function_depth: usize,
    scan: DeclarationScan,
}

/// Scan the token stream for declarations.
///
/// `sig` holds the indices of significant tokens in order.
pub(crate) fn scan_declarations(tokens: &[Token], sig: &[usize]) -> Result<DeclarationScan, Fault> {
    let mut scanner = Scanner {
        tokens,
        sig,
        scopes: Vec::new(),
        pending: Vec::new(),
        namespace: String::new(),
        class_depth: 0,
        function_depth: 0,
        scan: DeclarationScan::default(),
    };

    for p in 0..sig.len() {
        scanner.step(p)?;
    }

    if !scanner.scopes.is_empty() {
        let line = tokens.last().map_or(1, |t| t.line);
        return Err(Fault::new(line, MalformedReason::Unclosed("{".to_string())));
    }
    Ok(scanner.scan)
}

impl<'t> Scanner<'t> {
    fn token(&self, p: usize) -> Option<&'t Token> {
        let tokens = self.tokens;
        self.sig.get(p).map(move |&i| &tokens[i])
    }

    fn previous(&self, p: usize) -> Option<&'t Token> {
        p.checked_sub(1).and_then(|q| self.token(q))
    }

    fn at_top_level(&self) -> bool {
        self.class_depth == 0 && self.function_depth == 0
    }

    fn step(&mut self, p: usize) -> Result<(), Fault> {
        let tokens = self.tokens;
        let token = &tokens[self.sig[p]];

        match token.kind {
            TokenKind::Punct => match token.text.as_str() {
                "{" => self.open_scope(),
                "}" => self.close_scope(token)?,
                // abstract and interface methods have no body
                ";" if self.pending.last() == Some(&Scope::Function) => {
                    self.pending.pop();
                }
                _ => {}
            },
            TokenKind::Keyword => {
                let keyword = token.text.to_ascii_lowercase();
                match keyword.as_str() {
                    "namespace" if self.at_top_level() => self.namespace(p),
                    "class" => self.class_like(p, DeclarationKind::Class),
                    "interface" => self.class_like(p, DeclarationKind::Interface),
                    "trait" => self.class_like(p, DeclarationKind::Trait),
                    "function" => self.function(p),
                    "include" | "include_once" | "require" | "require_once" => {
                        self.scan.has_includes = true;
                    }
                    _ => {}
                }
            }
            TokenKind::Identifier if token.text.eq_ignore_ascii_case("enum") => {
                if self.is_enum_declaration(p) {
                    self.class_like(p, DeclarationKind::Enum);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn open_scope(&mut self) {
        let scope = self.pending.pop().unwrap_or(Scope::Block);
        match scope {
            Scope::ClassLike => self.class_depth += 1,
            Scope::Function => self.function_depth += 1,
            _ => {}
        }
        self.scopes.push(scope);
    }

    fn close_scope(&mut self, token: &Token) -> Result<(), Fault> {
        match self.scopes.pop() {
            Some(Scope::Namespace) => self.namespace.clear(),
            Some(Scope::ClassLike) => self.class_depth -= 1,
            Some(Scope::Function) => self.function_depth -= 1,
            Some(Scope::Block) => {}
            None => {
                return Err(Fault::new(
                    token.line,
                    MalformedReason::Unexpected("}".to_string()),
                ))
            }
        }
        Ok(())
    }

    /// `namespace Foo;`, `namespace Foo { ... }` or `namespace { ... }`.
    fn namespace(&mut self, p: usize) {
        match self.token(p + 1) {
            Some(next) if next.kind == TokenKind::Identifier => {
                let name = next.text.trim_start_matches('\\').to_string();
                if self.token(p + 2).map_or(false, |t| t.is_punct("{")) {
                    self.pending.push(Scope::Namespace);
                }
                self.namespace = name;
            }
            Some(next) if next.is_punct("{") => {
                self.namespace.clear();
                self.pending.push(Scope::Namespace);
            }
            _ => {}
        }
    }

    fn class_like(&mut self, p: usize, kind: DeclarationKind) {
        // anonymous or named, the body is a class body
        self.pending.push(Scope::ClassLike);

        if self.previous(p).map_or(false, |t| t.is_keyword("new")) {
            return;
        }
        if let Some(name) = self.token(p + 1).filter(|t| t.kind == TokenKind::Identifier) {
            self.declare(kind, p, name);
        }
    }

    fn function(&mut self, p: usize) {
        // `use function Foo\bar;` imports a function
        if self.previous(p).map_or(false, |t| t.is_keyword("use")) {
            return;
        }
        self.pending.push(Scope::Function);

        let mut q = p + 1;
        if self.token(q).map_or(false, |t| t.is_punct("&")) {
            q += 1;
        }
        let Some(name) = self.token(q).filter(|t| t.kind == TokenKind::Identifier) else {
            return; // closure
        };
        if self.at_top_level() {
            self.declare(DeclarationKind::Function, p, name);
        }
    }

    /// `enum` is a soft keyword: `enum Suit {`, `enum Suit: string {` or
    /// `enum Suit implements HasLabel {`.
    fn is_enum_declaration(&self, p: usize) -> bool {
        let named = self
            .token(p + 1)
            .map_or(false, |t| t.kind == TokenKind::Identifier);
        let follows = self.token(p + 2).map_or(false, |t| {
            t.is_punct("{") || t.is_punct(":") || t.is_keyword("implements")
        });
        named && follows
    }

    fn declare(&mut self, kind: DeclarationKind, p: usize, name: &Token) {
        let short_name = name.text.clone();
        let qualified = if self.namespace.is_empty() {
            short_name.clone()
        } else {
            format!("{}\\{}", self.namespace, short_name)
        };

        self.scan.declarations.push(Declaration {
            kind,
            name: qualified,
            short_name,
            token_index: self.sig[p],
            line: self.tokens[self.sig[p]].line,
        });
    }
}
