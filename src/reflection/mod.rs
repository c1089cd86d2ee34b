//! Static reflection of a single PHP source file.
//!
//! [`ReflectionFile`] is built once from source text and is read-only
//! afterwards. Construction runs three passes over the lossless token
//! stream:
//!
//! 1. delimiter pairing, which also rejects unterminated literals,
//! 2. the declaration scanner (classes, interfaces, traits, enums and free
//!    functions, each fully qualified with the enclosing namespace),
//! 3. the call-site extractor, which classifies every argument.
//!
//! A file either reflects completely or fails with
//! [`ReflectionError::MalformedSource`]; partial results are never exposed.
//!
//! ```
//! use phpreflect::reflection::{ArgumentKind, ReflectionFile};
//!
//! let file = ReflectionFile::reflect("a.php", "<?php namespace App; log_event('boot', $ctx);").unwrap();
//! let call = &file.invocations_of("log_event")[0];
//! assert_eq!(call.argument(0).unwrap().kind(), ArgumentKind::String);
//! assert_eq!(call.argument(1).unwrap().value(), "$ctx");
//! ```

mod arguments;
mod declarations;
mod error;
mod invocations;
mod structure;

pub use arguments::{unescape, Argument, ArgumentKind};
pub use declarations::{Declaration, DeclarationKind};
pub use error::{MalformedReason, ReflectionError};
pub use invocations::{Invocation, InvocationKind};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::tokenizer::{self, Token};

/// Structural index of one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectionFile {
    filename: String,
    tokens: Vec<Token>,
    declarations: Vec<Declaration>,
    invocations: Vec<Invocation>,
    has_includes: bool,
}

impl ReflectionFile {
    /// Reflect `source`, reporting faults against `filename`.
    pub fn reflect(filename: impl Into<String>, source: &str) -> Result<Self, ReflectionError> {
        let filename = filename.into();
        let tokens = tokenizer::tokenize(source);

        let partners =
            structure::match_delimiters(&tokens).map_err(|f| f.into_error(&filename))?;
        let sig = structure::significant(&tokens);
        let scan = declarations::scan_declarations(&tokens, &sig)
            .map_err(|f| f.into_error(&filename))?;
        let invocations = invocations::extract_invocations(&tokens, &sig, &partners)
            .map_err(|f| f.into_error(&filename))?;

        Ok(Self {
            filename,
            tokens,
            declarations: scan.declarations,
            invocations,
            has_includes: scan.has_includes,
        })
    }

    /// Read and reflect a file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReflectionError> {
        let path = path.as_ref();
        let filename = path.display().to_string();
        let source = fs::read_to_string(path).map_err(|source| ReflectionError::Io {
            file: filename.clone(),
            source,
        })?;
        Self::reflect(filename, &source)
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The full lossless token stream, ending with an end-of-file marker.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn count_tokens(&self) -> usize {
        self.tokens.len()
    }

    /// All declarations in source order.
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Fully qualified names of declared classes.
    pub fn classes(&self) -> Vec<&str> {
        self.names_of(DeclarationKind::Class)
    }

    pub fn interfaces(&self) -> Vec<&str> {
        self.names_of(DeclarationKind::Interface)
    }

    pub fn traits(&self) -> Vec<&str> {
        self.names_of(DeclarationKind::Trait)
    }

    pub fn enums(&self) -> Vec<&str> {
        self.names_of(DeclarationKind::Enum)
    }

    /// Fully qualified names of free (non-method) functions.
    pub fn functions(&self) -> Vec<&str> {
        self.names_of(DeclarationKind::Function)
    }

    fn names_of(&self, kind: DeclarationKind) -> Vec<&str> {
        self.declarations
            .iter()
            .filter(|d| d.kind == kind)
            .map(|d| d.name.as_str())
            .collect()
    }

    /// All invocations in source order.
    pub fn invocations(&self) -> &[Invocation] {
        &self.invocations
    }

    /// Invocations whose called name matches `name`, ignoring ASCII case
    /// and a leading namespace separator.
    pub fn invocations_of(&self, name: &str) -> Vec<&Invocation> {
        let wanted = name.trim_start_matches('\\');
        self.invocations
            .iter()
            .filter(|i| i.name().trim_start_matches('\\').eq_ignore_ascii_case(wanted))
            .collect()
    }

    /// Whether the file contains `include`, `require` or their `_once` forms.
    pub fn has_includes(&self) -> bool {
        self.has_includes
    }
}
