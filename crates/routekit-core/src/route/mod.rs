//! Route dialect parsers.
//!
//! ## Pipeline
//!
//! ```text
//! path -> detect_route_format -> RouteParser::parse_into(path, &mut ParseSession)
//!                                        |
//!                      (Keyed-Map: recursive Map.Load into the same session)
//!                                        v
//!                          ParseReport { RouteModel, diagnostics }
//! ```

pub mod csv;
pub mod legacy;
pub mod map;
pub mod xml;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::ParserConfig;
use crate::detect::{detect_route_format, RouteFormat};
use crate::diagnostics::{ParseReport, SourceLocation};
use crate::error::{LineError, ParseError};
use crate::model::route::RouteModel;
pub use crate::session::ParseSession;

pub use csv::ExtendedCsvParser;
pub use legacy::LegacyLinearParser;
pub use map::KeyedMapParser;
pub use xml::StructuredDocumentParser;

/// Running "meters along the route" value that records are stamped with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceCursor {
    pub position: f64,
    /// Meters per raw distance unit.
    pub unit: f64,
}

impl Default for DistanceCursor {
    fn default() -> Self {
        Self {
            position: 0.0,
            unit: 1.0,
        }
    }
}

impl DistanceCursor {
    /// Move to a raw distance literal, scaled by the current unit.
    pub fn advance_to(&mut self, raw: f64) {
        self.position = raw * self.unit;
    }
}

/// Common contract of the four route dialects.
pub trait RouteParser {
    fn format(&self) -> RouteFormat;

    /// Parse `path` into an existing session.
    fn parse_into(&self, path: &Path, session: &mut ParseSession<'_>) -> Result<(), ParseError>;

    /// Parse `path` with `config`, returning the model and its diagnostics.
    fn parse_with(
        &self,
        path: &Path,
        config: &ParserConfig,
    ) -> Result<ParseReport<RouteModel>, ParseError> {
        if !path.exists() {
            return Err(ParseError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let model = RouteModel::with_gauge(config.default_gauge);
        let mut session = ParseSession::new(config, model);
        self.parse_into(path, &mut session)?;
        let report = session.finish();
        info!(
            "Parsed {} as {}: {} geometries, {} stations, {} objects, {} diagnostics",
            path.display(),
            self.format(),
            report.output.geometries.len(),
            report.output.stations.len(),
            report.output.objects.len(),
            report.diagnostics.len()
        );
        Ok(report)
    }

    /// Parse `path` with the default configuration.
    fn parse(&self, path: &Path) -> Result<RouteModel, ParseError> {
        self.parse_with(path, &ParserConfig::default())
            .map(|report| report.output)
    }
}

/// Parser for a detected route format, if one exists.
pub fn parser_for(format: RouteFormat) -> Option<Box<dyn RouteParser>> {
    match format {
        RouteFormat::LegacyLinear => Some(Box::new(LegacyLinearParser)),
        RouteFormat::ExtendedCsv => Some(Box::new(ExtendedCsvParser)),
        RouteFormat::KeyedMap => Some(Box::new(KeyedMapParser)),
        RouteFormat::StructuredDocument => Some(Box::new(StructuredDocumentParser)),
        RouteFormat::Unknown => None,
    }
}

/// Detect the dialect of `path` and parse it.
pub fn parse_route(
    path: &Path,
    config: &ParserConfig,
) -> Result<ParseReport<RouteModel>, ParseError> {
    if !path.exists() {
        return Err(ParseError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let detection = detect_route_format(path, config);
    let parser = parser_for(detection.format).ok_or_else(|| ParseError::UnknownFormat {
        path: path.to_path_buf(),
    })?;

    let mut report = parser.parse_with(path, config)?;
    if let Some(diag) = detection.diagnostic {
        report.diagnostics.insert(0, diag);
    }
    if detection.host_extensions {
        report.output.host_extensions = true;
    }
    Ok(report)
}

/// Resolve a path referenced from `from`, relative to its directory.
///
/// Backslash separators are normalized, since most content was authored on
/// Windows.
pub fn resolve_reference(from: &Path, reference: &str) -> PathBuf {
    let normalized = reference.trim().replace('\\', "/");
    let candidate = Path::new(&normalized);
    if candidate.is_absolute() {
        return candidate.to_path_buf();
    }
    from.parent()
        .map(|dir| dir.join(candidate))
        .unwrap_or_else(|| candidate.to_path_buf())
}

/// Push a per-reference warning for a file that does not exist.
pub(crate) fn missing_reference(
    session: &mut ParseSession<'_>,
    kind: &str,
    path: &Path,
    at: SourceLocation,
) {
    session.warning(crate::diagnostics::missing_reference(kind, path, at));
}

/// Convert gauge in millimeters, the unit every dialect writes it in.
pub(crate) fn gauge_from_millimeters(mm: f64) -> Result<f64, LineError> {
    if mm > 0.0 {
        Ok(mm / 1000.0)
    } else {
        Err(LineError::InvalidNumber {
            command: "gauge".to_string(),
            value: mm.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_scaling_is_not_retroactive() {
        let mut cursor = DistanceCursor::default();
        cursor.advance_to(100.0);
        assert_eq!(cursor.position, 100.0);
        cursor.unit = 1000.0;
        assert_eq!(cursor.position, 100.0);
        cursor.advance_to(1.0);
        assert_eq!(cursor.position, 1000.0);
    }

    #[test]
    fn test_resolve_reference() {
        let from = Path::new("/routes/line/map.txt");
        assert_eq!(
            resolve_reference(from, "objects\\tree.x"),
            PathBuf::from("/routes/line/objects/tree.x")
        );
        assert_eq!(resolve_reference(from, "/abs/a.x"), PathBuf::from("/abs/a.x"));
    }

    #[test]
    fn test_gauge_conversion() {
        assert_eq!(gauge_from_millimeters(1067.0), Ok(1.067));
        assert!(gauge_from_millimeters(0.0).is_err());
    }

    #[test]
    fn test_unknown_format_has_no_parser() {
        assert!(parser_for(RouteFormat::Unknown).is_none());
        assert!(parser_for(RouteFormat::KeyedMap).is_some());
    }

    #[test]
    fn test_parse_route_missing_file() {
        let err = parse_route(Path::new("/nonexistent/route.csv"), &ParserConfig::default());
        assert!(matches!(err, Err(ParseError::FileNotFound { .. })));
    }
}
