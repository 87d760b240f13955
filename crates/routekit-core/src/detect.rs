//! Format detection.
//!
//! Extension rules are applied first, content probes over the first lines of
//! the file second. Detection never fails: ambiguity resolves to the most
//! common dialect plus a diagnostic, and unreadable input to `Unknown`.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ParserConfig;
use crate::diagnostics::{Diagnostic, DiagnosticCode, SourceLocation};
use crate::encoding;
use crate::tokenizer::parse_number;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RouteFormat {
    Unknown,
    LegacyLinear,
    ExtendedCsv,
    KeyedMap,
    StructuredDocument,
}

impl std::fmt::Display for RouteFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RouteFormat::Unknown => "unknown",
            RouteFormat::LegacyLinear => "legacy-linear",
            RouteFormat::ExtendedCsv => "extended-csv",
            RouteFormat::KeyedMap => "keyed-map",
            RouteFormat::StructuredDocument => "structured-document",
        };
        f.write_str(name)
    }
}

/// Route detection result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteDetection {
    pub format: RouteFormat,
    /// Extended-CSV file using host-specific extension commands.
    pub host_extensions: bool,
    /// Set when no heuristic matched and the default was assumed.
    pub diagnostic: Option<Diagnostic>,
}

impl RouteDetection {
    fn of(format: RouteFormat) -> Self {
        Self {
            format,
            host_extensions: false,
            diagnostic: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VehicleFormat {
    Unknown,
    /// `train.xml`
    TrainXml,
    /// `train.dat`
    TrainDat,
    /// `vehicle.txt`
    VehicleTxt,
}

/// Manifest file names in priority order.
const VEHICLE_MANIFESTS: &[(&str, VehicleFormat)] = &[
    ("train.xml", VehicleFormat::TrainXml),
    ("train.dat", VehicleFormat::TrainDat),
    ("vehicle.txt", VehicleFormat::VehicleTxt),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObjectFormat {
    Unknown,
    /// `.csv` with mesh-authoring commands.
    ExplicitMesh,
    /// Text `.x`.
    BlockScene,
    /// Binary or compressed `.x`.
    BinaryScene,
    B3d,
    Wavefront,
    /// `.csv` without mesh commands: a route, not an object.
    RouteCsv,
}

impl std::fmt::Display for ObjectFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ObjectFormat::Unknown => "unknown",
            ObjectFormat::ExplicitMesh => "explicit-mesh",
            ObjectFormat::BlockScene => "block-scene",
            ObjectFormat::BinaryScene => "binary-scene",
            ObjectFormat::B3d => "b3d",
            ObjectFormat::Wavefront => "wavefront",
            ObjectFormat::RouteCsv => "route-csv",
        };
        f.write_str(name)
    }
}

static NAMESPACED_COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(options|route|structure)\s*\.").expect("valid namespace regex")
});

static HOST_EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(track\s*\.\s*(sigf|pretrain)|route\s*\.\s*dynamiclight)\b")
        .expect("valid extension regex")
});

static MESH_COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(createmeshbuilder|addvertex|addface2?|vertex|face2?|setcolor|loadtexture)\b",
    )
    .expect("valid mesh command regex")
});

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Decide which route dialect `path` is written in.
pub fn detect_route_format(path: &Path, config: &ParserConfig) -> RouteDetection {
    if extension(path).as_deref() == Some("xml") {
        return RouteDetection::of(RouteFormat::StructuredDocument);
    }

    let decoded = match encoding::read_text(path, config) {
        Ok(decoded) => decoded,
        Err(e) => {
            debug!("cannot probe {}: {}", path.display(), e);
            return RouteDetection::of(RouteFormat::Unknown);
        }
    };
    let lines: Vec<&str> = decoded.text.lines().take(config.route_probe_lines).collect();
    let mut detection = classify_route_lines(&lines);

    if let Some(diag) = detection.diagnostic.take() {
        warn!("{}: {}", path.display(), diag.message);
        detection.diagnostic = Some(diag.with_location(SourceLocation::file(path)));
    }
    detection
}

/// Content heuristics, in priority order.
pub fn classify_route_lines(lines: &[&str]) -> RouteDetection {
    let trimmed: Vec<&str> = lines.iter().map(|l| l.trim()).collect();

    if trimmed.iter().any(|l| l.starts_with("<?xml")) {
        return RouteDetection::of(RouteFormat::StructuredDocument);
    }

    if trimmed
        .iter()
        .any(|l| l.to_ascii_lowercase().starts_with("bvets map"))
    {
        return RouteDetection::of(RouteFormat::KeyedMap);
    }

    if trimmed.iter().any(|l| NAMESPACED_COMMAND.is_match(l)) {
        return RouteDetection {
            format: RouteFormat::ExtendedCsv,
            host_extensions: trimmed.iter().any(|l| HOST_EXTENSION.is_match(l)),
            diagnostic: None,
        };
    }

    let bare_number = |l: &&str| {
        let code = l.split(';').next().unwrap_or("").trim();
        parse_number(code).is_some()
    };
    if trimmed.iter().any(bare_number) {
        return RouteDetection::of(RouteFormat::LegacyLinear);
    }

    RouteDetection {
        format: RouteFormat::ExtendedCsv,
        host_extensions: false,
        diagnostic: Some(Diagnostic::warning(
            DiagnosticCode::AmbiguousFormat,
            "no dialect marker found; assuming extended CSV",
        )),
    }
}

/// Decide a vehicle bundle's dialect from the manifest files in `dir`.
pub fn detect_vehicle_format(dir: &Path) -> VehicleFormat {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("cannot list {}: {}", dir.display(), e);
            return VehicleFormat::Unknown;
        }
    };
    let names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().to_str().map(|n| n.to_ascii_lowercase()))
        .collect();

    VEHICLE_MANIFESTS
        .iter()
        .find(|(manifest, _)| names.iter().any(|n| n == manifest))
        .map(|(_, format)| *format)
        .unwrap_or(VehicleFormat::Unknown)
}

/// Header variants of a DirectX `.x` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneHeader {
    Text,
    Binary,
    Compressed,
    Missing,
}

/// Classify the 16-byte `xof 0302txt 0032` header.
pub fn scene_header(bytes: &[u8]) -> SceneHeader {
    if bytes.len() < 12 || !bytes.starts_with(b"xof ") {
        return SceneHeader::Missing;
    }
    match &bytes[8..12] {
        b"txt " => SceneHeader::Text,
        b"bin " => SceneHeader::Binary,
        b"tzip" | b"bzip" => SceneHeader::Compressed,
        _ => SceneHeader::Missing,
    }
}

/// Decide an object file's dialect.
pub fn detect_object_format(path: &Path, config: &ParserConfig) -> ObjectFormat {
    match extension(path).as_deref() {
        Some("csv") => match encoding::read_text(path, config) {
            Ok(decoded) => {
                let is_mesh = decoded
                    .text
                    .lines()
                    .take(config.object_probe_lines)
                    .any(|l| MESH_COMMAND.is_match(l));
                if is_mesh {
                    ObjectFormat::ExplicitMesh
                } else {
                    ObjectFormat::RouteCsv
                }
            }
            Err(_) => ObjectFormat::Unknown,
        },
        Some("x") => match encoding::read_bytes(path) {
            Ok(bytes) => match scene_header(&bytes) {
                SceneHeader::Text => ObjectFormat::BlockScene,
                SceneHeader::Binary | SceneHeader::Compressed => ObjectFormat::BinaryScene,
                SceneHeader::Missing => ObjectFormat::Unknown,
            },
            Err(_) => ObjectFormat::Unknown,
        },
        Some("b3d") => ObjectFormat::B3d,
        Some("obj") => ObjectFormat::Wavefront,
        _ => ObjectFormat::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_declaration() {
        let d = classify_route_lines(&["<?xml version=\"1.0\"?>", "<Route>"]);
        assert_eq!(d.format, RouteFormat::StructuredDocument);
    }

    #[test]
    fn test_keyed_map_header() {
        let d = classify_route_lines(&["BveTs Map 2.02", "Structure.Load('s.txt');"]);
        assert_eq!(d.format, RouteFormat::KeyedMap);
    }

    #[test]
    fn test_extended_csv_and_host_extensions() {
        let d = classify_route_lines(&["Options.UnitOfLength(1)", "0, Track.Curve(500)"]);
        assert_eq!(d.format, RouteFormat::ExtendedCsv);
        assert!(!d.host_extensions);

        let d = classify_route_lines(&["Route.Comment(x)", "100, Track.SigF(0;0;0)"]);
        assert_eq!(d.format, RouteFormat::ExtendedCsv);
        assert!(d.host_extensions);
    }

    #[test]
    fn test_bare_number_means_legacy() {
        let d = classify_route_lines(&["comment test", "100", "curve 600"]);
        assert_eq!(d.format, RouteFormat::LegacyLinear);
        assert!(d.diagnostic.is_none());
    }

    #[test]
    fn test_default_with_diagnostic() {
        let d = classify_route_lines(&["hello", "world"]);
        assert_eq!(d.format, RouteFormat::ExtendedCsv);
        assert_eq!(
            d.diagnostic.map(|d| d.code),
            Some(DiagnosticCode::AmbiguousFormat)
        );
    }

    #[test]
    fn test_scene_headers() {
        assert_eq!(scene_header(b"xof 0302txt 0032\n"), SceneHeader::Text);
        assert_eq!(scene_header(b"xof 0302bin 0032"), SceneHeader::Binary);
        assert_eq!(scene_header(b"xof 0303tzip0032"), SceneHeader::Compressed);
        assert_eq!(scene_header(b"Mesh {"), SceneHeader::Missing);
    }
}
