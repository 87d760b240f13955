//! Per-call parse state shared by the route and object parsers.

use std::path::Path;

use tracing::{debug, warn};

use crate::config::ParserConfig;
use crate::diagnostics::{Diagnostic, DiagnosticCode, ParseReport, SourceLocation};
use crate::error::LineError;
use crate::model::route::RouteModel;

/// Mutable state of one parse call: the model under construction and the
/// problems met so far.
///
/// A session is created per top-level call and owns its model, so parses on
/// different threads never share mutable state.
pub struct ParseSession<'a, T = RouteModel> {
    pub config: &'a ParserConfig,
    pub model: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a, T> ParseSession<'a, T> {
    pub fn new(config: &'a ParserConfig, model: T) -> Self {
        Self {
            config,
            model,
            diagnostics: Vec::new(),
        }
    }

    /// Record a line that was skipped.
    pub fn line_error(&mut self, file: &Path, line: usize, text: &str, error: &LineError) {
        warn!(file = %file.display(), line, "{} [{}]", error, text.trim());
        self.diagnostics.push(
            Diagnostic::warning(error.code(), error.to_string())
                .with_location(SourceLocation::new(file, line))
                .with_source_text(text.trim()),
        );
    }

    /// Record a warning that is not tied to a single malformed line.
    pub fn warning(&mut self, diagnostic: Diagnostic) {
        match &diagnostic.location {
            Some(loc) => warn!(location = %loc, "{}", diagnostic.message),
            None => warn!("{}", diagnostic.message),
        }
        self.diagnostics.push(diagnostic);
    }

    /// Record a hint; hints are not logged above debug level.
    pub fn hint(&mut self, diagnostic: Diagnostic) {
        debug!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    /// Unrecognized commands are skipped silently unless
    /// `log_unknown_commands` is set, in which case they are kept as hints.
    pub fn unknown_command(&mut self, file: &Path, line: usize, command: &str) {
        if !self.config.log_unknown_commands {
            return;
        }
        debug!(file = %file.display(), line, "ignoring unknown command '{}'", command);
        self.diagnostics.push(
            Diagnostic::hint(
                DiagnosticCode::UnknownCommand,
                format!("unknown command '{}'", command),
            )
            .with_location(SourceLocation::new(file, line)),
        );
    }

    pub fn finish(self) -> ParseReport<T> {
        ParseReport::new(self.model, self.diagnostics)
    }
}
