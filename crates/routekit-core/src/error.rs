//! Error types.
//!
//! Two levels, matching how much of a parse a failure invalidates:
//!
//! ```text
//! ParseError  -> aborts the whole parse call (missing file, missing root, binary input)
//! LineError   -> one source line is skipped and recorded as a diagnostic
//! ```
//!
//! Missing references (includes, structure lists) are neither: they are
//! logged, recorded and dropped by the parser that follows them.

use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::DiagnosticCode;

/// Failure of a whole `parse` call.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: expected root element <{expected}>, found <{found}>", path.display())]
    MissingRoot {
        path: PathBuf,
        expected: &'static str,
        found: String,
    },

    #[error("{}: malformed document: {source}", path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("{}: unsupported: {reason}", path.display())]
    Unsupported { path: PathBuf, reason: String },

    #[error("{}: unrecognized file format", path.display())]
    UnknownFormat { path: PathBuf },
}

impl ParseError {
    /// Map an I/O failure, turning `NotFound` into [`ParseError::FileNotFound`].
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            ParseError::FileNotFound { path }
        } else {
            ParseError::Io { path, source }
        }
    }

    pub fn unsupported(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ParseError::Unsupported {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for input the pipeline recognizes but deliberately does not parse.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            ParseError::Unsupported { .. } | ParseError::UnknownFormat { .. }
        )
    }
}

/// Failure to interpret a single command line.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LineError {
    #[error("{command}: missing argument #{index}")]
    MissingArgument { command: String, index: usize },

    #[error("{command}: '{value}' is not a number")]
    InvalidNumber { command: String, value: String },

    #[error("{command}: '{value}' is not a valid index")]
    InvalidIndex { command: String, value: String },

    #[error("{command}: '{value}' is not a valid color channel")]
    InvalidColor { command: String, value: String },

    #[error("{command}: vertex index {index} out of range ({count} vertices)")]
    VertexOutOfRange {
        command: String,
        index: usize,
        count: usize,
    },

    #[error("syntax error: {0}")]
    Syntax(String),
}

impl LineError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            LineError::MissingArgument { .. } => DiagnosticCode::MissingArgument,
            LineError::InvalidNumber { .. }
            | LineError::InvalidIndex { .. }
            | LineError::InvalidColor { .. } => DiagnosticCode::InvalidArgument,
            LineError::VertexOutOfRange { .. } => DiagnosticCode::IndexOutOfRange,
            LineError::Syntax(_) => DiagnosticCode::SyntaxError,
        }
    }
}
