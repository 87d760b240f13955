//! Object geometry parsers.
//!
//! Both dialects fill an [`ObjectModel`] which is handed once to
//! [`build_mesh`]; diagnostics from parsing and from mesh building end up in
//! the same report.

pub mod csv;
pub mod x;

use std::path::Path;

use tracing::info;

use crate::config::ParserConfig;
use crate::detect::{detect_object_format, ObjectFormat};
use crate::diagnostics::ParseReport;
use crate::error::ParseError;
use crate::mesh::{build_mesh, Mesh};
use crate::model::object::ObjectModel;
use crate::session::ParseSession;

pub use csv::ExplicitMeshParser;
pub use x::BlockSceneParser;

/// Session type used while scanning an object file.
pub type ObjectSession<'a> = ParseSession<'a, ObjectModel>;

/// Common contract of the object dialects.
pub trait ObjectParser {
    fn format(&self) -> ObjectFormat;

    /// Scan `path` into the session's intermediate model.
    fn parse_into(&self, path: &Path, session: &mut ObjectSession<'_>) -> Result<(), ParseError>;

    /// Parse `path` and build its mesh.
    fn parse_with(&self, path: &Path, config: &ParserConfig) -> Result<ParseReport<Mesh>, ParseError> {
        if !path.exists() {
            return Err(ParseError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let mut session = ObjectSession::new(config, ObjectModel::default());
        self.parse_into(path, &mut session)?;
        session.model.enforce_attribute_counts();

        let ParseReport {
            output: model,
            mut diagnostics,
        } = session.finish();
        let built = build_mesh(&model);
        diagnostics.extend(built.diagnostics);

        info!(
            "Parsed {} as {}: {} vertices, {} triangles",
            path.display(),
            self.format(),
            built.output.vertex_count(),
            built.output.triangle_count()
        );
        Ok(ParseReport::new(built.output, diagnostics))
    }

    /// Parse `path` with the default configuration.
    fn parse(&self, path: &Path) -> Result<Mesh, ParseError> {
        self.parse_with(path, &ParserConfig::default())
            .map(|report| report.output)
    }
}

/// Parser for a detected object format.
///
/// Recognized formats that are not parsed yield [`ParseError::Unsupported`].
pub fn parser_for(format: ObjectFormat, path: &Path) -> Result<Box<dyn ObjectParser>, ParseError> {
    match format {
        ObjectFormat::ExplicitMesh => Ok(Box::new(ExplicitMeshParser)),
        ObjectFormat::BlockScene => Ok(Box::new(BlockSceneParser)),
        ObjectFormat::BinaryScene => Err(ParseError::unsupported(
            path,
            "binary and compressed DirectX files are not supported",
        )),
        ObjectFormat::B3d | ObjectFormat::Wavefront => Err(ParseError::unsupported(
            path,
            format!("{} objects are recognized but not parsed", format),
        )),
        ObjectFormat::RouteCsv => Err(ParseError::unsupported(
            path,
            "CSV file has no mesh commands; it is a route, not an object",
        )),
        ObjectFormat::Unknown => Err(ParseError::UnknownFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Detect the dialect of `path` and parse it into a mesh.
pub fn parse_object(path: &Path, config: &ParserConfig) -> Result<ParseReport<Mesh>, ParseError> {
    if !path.exists() {
        return Err(ParseError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let format = detect_object_format(path, config);
    parser_for(format, path)?.parse_with(path, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_unparsed_formats_are_unsupported() {
        let dir = TempDir::new().unwrap();
        let b3d = dir.path().join("wall.b3d");
        fs::write(&b3d, "[MeshBuilder]\nVertex 0,0,0\n").unwrap();
        let err = parse_object(&b3d, &ParserConfig::default()).unwrap_err();
        assert!(matches!(err, ParseError::Unsupported { .. }));

        let route = dir.path().join("route.csv");
        fs::write(&route, "Route.Comment(x)\n0, Track.Curve(300)\n").unwrap();
        let err = parse_object(&route, &ParserConfig::default()).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_binary_scene_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tree.x");
        fs::write(&path, b"xof 0302bin 0032\x00\x01\x02").unwrap();
        let err = parse_object(&path, &ParserConfig::default()).unwrap_err();
        assert!(matches!(err, ParseError::Unsupported { .. }));
    }

    #[test]
    fn test_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.md");
        fs::write(&path, "# notes").unwrap();
        let err = parse_object(&path, &ParserConfig::default()).unwrap_err();
        assert!(matches!(err, ParseError::UnknownFormat { .. }));
    }
}
