//! routekit-core: format detection, dialect parsing and mesh construction
//!
//! This crate turns legacy, community-authored rail-simulation content into
//! one normalized model:
//! - Encoding resolution (byte-order marks, Shift_JIS fallback)
//! - Format detection for routes, vehicle bundles and objects
//! - Four route dialect parsers converging on [`RouteModel`]
//! - Two object parsers converging on [`ObjectModel`]
//! - Mesh builder producing triangulated [`Mesh`] data
//!
//! Parsing is synchronous and allocation-only: nothing is written to disk and
//! every parse call owns its output exclusively.

pub mod config;
pub mod detect;
pub mod diagnostics;
pub mod encoding;
pub mod error;
pub mod mesh;
pub mod model;
pub mod object;
pub mod route;
pub mod session;
pub mod syntax;
pub mod tokenizer;

// Re-export commonly used types
pub use config::loader::ConfigLoader;
pub use config::ParserConfig;
pub use detect::{
    detect_object_format, detect_route_format, detect_vehicle_format, ObjectFormat,
    RouteDetection, RouteFormat, VehicleFormat,
};
pub use diagnostics::{Diagnostic, DiagnosticCode, ParseReport, Severity, SourceLocation};
pub use error::{LineError, ParseError};
pub use mesh::{build_mesh, Mesh};
pub use model::object::{Face, Material, ObjectModel};
pub use model::route::{
    Background, BackgroundMode, DoorSide, GroundChange, PlacedObject, RailEvent, RailEventKind,
    Repeater, RepeaterKind, RouteModel, SpeedLimit, Station, Structure, TrackGeometry, UNSET_TIME,
};
pub use object::{parse_object, ObjectParser};
pub use route::{parse_route, RouteParser};
pub use session::ParseSession;
