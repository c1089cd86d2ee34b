//! phpreflect - static reflection for PHP sources.
//!
//! phpreflect reads PHP source text without executing it and reports what
//! the file declares and what it calls: classes, interfaces, traits, enums
//! and free functions (fully qualified with their namespace), plus every
//! call-site with each argument classified as a variable, string, constant,
//! array or expression.
//!
//! # Architecture
//!
//! - `tokenizer`: lossless token stream; concatenated token texts reproduce
//!   the input byte for byte
//! - `reflection`: declaration scanner, call-site extractor and argument
//!   classifier behind the read-only [`ReflectionFile`] facade
//! - `cache`: reflections keyed by file identity and content hash
//! - `reflector`: parallel batch reflection with per-file failures
//! - `config`: YAML configuration schema
//! - `report`: output formatting (pretty, JSON)

pub mod cache;
pub mod cli;
pub mod config;
pub mod reflection;
pub mod reflector;
pub mod report;
pub mod tokenizer;

pub use cache::ReflectionCache;
pub use config::Config;
pub use reflection::{
    Argument, ArgumentKind, Declaration, DeclarationKind, Invocation, InvocationKind,
    ReflectionError, ReflectionFile,
};
pub use reflector::{BatchResult, Reflector};
pub use tokenizer::{tokenize, Token, TokenKind};
