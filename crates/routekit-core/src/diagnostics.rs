//! Unified Diagnostics Module
//!
//! Single diagnostic type used by format detection, the route dialect parsers
//! and the object parsers. Every recoverable problem is logged through
//! `tracing` and recorded here so callers can surface it without scraping logs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Diagnostic severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// The input was skipped or partially applied.
    Warning,
    /// Accepted but not fully honoured, e.g. an ignored transform.
    Hint,
}

/// Diagnostic codes for categorizing issues
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // =========================================================================
    // Per-line errors
    // =========================================================================
    SyntaxError,
    MissingArgument,
    InvalidArgument,
    IndexOutOfRange,

    // =========================================================================
    // Per-reference errors
    // =========================================================================
    MissingReference,
    IncludeCycle,
    IncludeDepthExceeded,

    // =========================================================================
    // Detection
    // =========================================================================
    AmbiguousFormat,
    UnknownEncoding,

    // =========================================================================
    // Geometry
    // =========================================================================
    TruncatedGeometry,
    DegenerateFace,
    TransformIgnored,
    UnknownCommand,
}

/// Source file and 1-based line a diagnostic refers to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    pub fn file(file: &Path) -> Self {
        Self::new(file, 0)
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.file.display())
        } else {
            write!(f, "{}:{}", self.file.display(), self.line)
        }
    }
}

/// A diagnostic message with location, severity, and the offending text
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub source_text: Option<String>,
}

impl Diagnostic {
    fn new(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            location: None,
            source_text: None,
        }
    }

    /// Create a warning diagnostic
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    /// Create a hint diagnostic
    pub fn hint(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Hint, code, message)
    }

    /// Add source location
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach the source line that triggered the diagnostic
    pub fn with_source_text(mut self, text: impl Into<String>) -> Self {
        self.source_text = Some(text.into());
        self
    }

    pub fn is_warning(&self) -> bool {
        matches!(self.severity, Severity::Warning)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Hint => "hint",
        };
        match &self.location {
            Some(loc) => write!(f, "{}: {}: {}", loc, level, self.message)?,
            None => write!(f, "{}: {}", level, self.message)?,
        }
        if let Some(text) = &self.source_text {
            write!(f, " [{}]", text)?;
        }
        Ok(())
    }
}

/// Output of a parse call together with everything it had to skip
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParseReport<T> {
    pub output: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> ParseReport<T> {
    pub fn new(output: T, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            output,
            diagnostics,
        }
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }
}

// =============================================================================
// Convenience Builders
// =============================================================================

/// Warning for a missing include or referenced list file
pub fn missing_reference(kind: &str, path: &Path, at: SourceLocation) -> Diagnostic {
    Diagnostic::warning(
        DiagnosticCode::MissingReference,
        format!("{} '{}' does not exist; reference dropped", kind, path.display()),
    )
    .with_location(at)
}

/// Warning for an include that would re-enter a file already being parsed
pub fn include_cycle(path: &Path, at: SourceLocation) -> Diagnostic {
    Diagnostic::warning(
        DiagnosticCode::IncludeCycle,
        format!("'{}' is already being parsed; include skipped", path.display()),
    )
    .with_location(at)
}

// =============================================================================
// Tests
// =============================================================================
