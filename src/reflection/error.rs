//! Reflection errors.

use thiserror::Error;

use crate::tokenizer::Unclosed;

/// Why a file could not be reflected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    #[error("unterminated {}", .0.as_str())]
    Unterminated(Unclosed),
    #[error("'{0}' is never closed")]
    Unclosed(String),
    #[error("unexpected '{0}'")]
    Unexpected(String),
    #[error("expected '{expected}', found '{found}'")]
    Mismatched { expected: String, found: String },
    #[error("empty argument in call to {0}()")]
    EmptyArgument(String),
}

/// Errors that can occur while reflecting a file or reading its results.
#[derive(Error, Debug)]
pub enum ReflectionError {
    #[error("{file}:{line}: malformed source: {reason}")]
    MalformedSource {
        file: String,
        line: usize,
        reason: MalformedReason,
    },
    #[error("argument index {index} out of range ({count} arguments)")]
    ArgumentIndex { index: usize, count: usize },
    #[error("reading {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },
}

/// A structural fault located at a line, before the file name is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fault {
    pub line: usize,
    pub reason: MalformedReason,
}

impl Fault {
    pub(crate) fn new(line: usize, reason: MalformedReason) -> Self {
        Self { line, reason }
    }

    pub(crate) fn into_error(self, file: &str) -> ReflectionError {
        ReflectionError::MalformedSource {
            file: file.to_string(),
            line: self.line,
            reason: self.reason,
        }
    }
}
