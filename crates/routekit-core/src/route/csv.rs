//! Extended-CSV dialect.
//!
//! Each line holds comma-separated expressions. An expression is either a
//! position (`1200` or `1200;`), a `With Namespace` block opener, or a
//! `Namespace.Member(args)` call. Inside a `With` block `.Member(args)` is
//! shorthand for the opened namespace.
//!
//! ```text
//! Options.UnitOfLength(1)
//! With Route
//! .Gauge 1067
//! Structure.FreeObj(3).Load(objects\tree.x)
//! 1200, Track.Curve(600; 0), Track.FreeObj(0; 3; -4; 0; 0)
//! ```
//!
//! Commands are normalized through [`crate::tokenizer::normalize_command`] and dispatched
//! through a fixed table; anything else is ignored.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use once_cell::sync::Lazy;

use super::{gauge_from_millimeters, DistanceCursor, ParseSession, RouteParser};
use crate::detect::RouteFormat;
use crate::encoding;
use crate::error::{LineError, ParseError};
use crate::model::route::{
    Background, BackgroundMode, DoorSide, GroundChange, PlacedObject, RailEvent, RailEventKind,
    SpeedLimit, Station,
};
use crate::syntax::{parse_call, position_prefix, split_top_level, CallExpr};
use crate::tokenizer::{
    index_arg, number_arg, parse_index, parse_number, parse_time, required_number, text_arg,
    TimeNotation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CsvCommand {
    UnitOfLength,
    Comment,
    Image,
    Gauge,
    Elevation,
    StructureLoad,
    BackgroundLoad,
    BackgroundAspect,
    SignalLoad,
    Curve,
    Pitch,
    Station,
    Limit,
    RailStart,
    Rail,
    RailEnd,
    Ground,
    FreeObj,
    Back,
    /// Accepted host extension with no effect on the model.
    HostExtension,
}

static COMMANDS: Lazy<HashMap<&'static str, CsvCommand>> = Lazy::new(|| {
    HashMap::from([
        ("options_unitoflength", CsvCommand::UnitOfLength),
        ("route_comment", CsvCommand::Comment),
        ("route_image", CsvCommand::Image),
        ("route_gauge", CsvCommand::Gauge),
        ("train_gauge", CsvCommand::Gauge),
        ("route_elevation", CsvCommand::Elevation),
        ("route_dynamiclight", CsvCommand::HostExtension),
        ("texture_background", CsvCommand::BackgroundLoad),
        ("texture_background_load", CsvCommand::BackgroundLoad),
        ("texture_background_aspect", CsvCommand::BackgroundAspect),
        ("signal", CsvCommand::SignalLoad),
        ("signal_load", CsvCommand::SignalLoad),
        ("track_curve", CsvCommand::Curve),
        ("track_pitch", CsvCommand::Pitch),
        ("track_sta", CsvCommand::Station),
        ("track_station", CsvCommand::Station),
        ("track_limit", CsvCommand::Limit),
        ("track_railstart", CsvCommand::RailStart),
        ("track_rail", CsvCommand::Rail),
        ("track_railend", CsvCommand::RailEnd),
        ("track_ground", CsvCommand::Ground),
        ("track_freeobj", CsvCommand::FreeObj),
        ("track_back", CsvCommand::Back),
        ("track_background", CsvCommand::Back),
        ("track_sigf", CsvCommand::HostExtension),
        ("track_pretrain", CsvCommand::HostExtension),
    ])
});

/// Structure kinds accepted in `Structure.Kind(i).Load(path)`.
const STRUCTURE_KINDS: &[&str] = &[
    "rail", "beacon", "pole", "ground", "walll", "wallr", "dikel", "diker", "forml", "formr",
    "formcl", "formcr", "roofl", "roofr", "roofcl", "roofcr", "crackl", "crackr", "freeobj",
];

fn lookup(key: &str) -> Option<CsvCommand> {
    if let Some(command) = COMMANDS.get(key) {
        return Some(*command);
    }
    let kind = key.strip_prefix("structure_")?;
    let kind = kind.strip_suffix("_load").unwrap_or(kind);
    STRUCTURE_KINDS
        .contains(&kind)
        .then_some(CsvCommand::StructureLoad)
}

/// Key under which a numbered structure is registered, e.g. `freeobj#3`.
pub fn structure_key(kind: &str, index: usize) -> String {
    format!("{}#{}", kind.to_ascii_lowercase(), index)
}

/// Meters per unit for `Options.UnitOfLength`.
pub fn unit_factor(value: &str) -> Option<f64> {
    let value = value.trim();
    match value.to_ascii_lowercase().as_str() {
        "km" | "kilometer" | "kilometers" | "kilometre" | "kilometres" => Some(1000.0),
        "m" | "meter" | "meters" | "metre" | "metres" => Some(1.0),
        "mi" | "mile" | "miles" => Some(1609.34),
        "yd" | "yard" | "yards" => Some(0.9144),
        _ => parse_number(value).filter(|f| *f > 0.0),
    }
}

#[derive(Debug, Default)]
struct CsvState {
    cursor: DistanceCursor,
    namespace: Option<String>,
    active_rails: BTreeSet<usize>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ExtendedCsvParser;

impl RouteParser for ExtendedCsvParser {
    fn format(&self) -> RouteFormat {
        RouteFormat::ExtendedCsv
    }

    fn parse_into(&self, path: &Path, session: &mut ParseSession<'_>) -> Result<(), ParseError> {
        let decoded = encoding::read_text(path, session.config)?;
        let mut state = CsvState::default();

        for (idx, line) in decoded.text.lines().enumerate() {
            let line_no = idx + 1;
            for expr in split_top_level(line, &[',']) {
                // a leading ';' comments out the rest of the line
                if expr.starts_with(';') {
                    break;
                }
                if let Err(e) = apply_expression(expr, line_no, path, &mut state, session) {
                    session.line_error(path, line_no, expr, &e);
                }
            }
        }
        Ok(())
    }
}

fn apply_expression(
    expr: &str,
    line_no: usize,
    path: &Path,
    state: &mut CsvState,
    session: &mut ParseSession<'_>,
) -> Result<(), LineError> {
    let mut rest = expr;
    if let Ok((after, raw)) = position_prefix(expr) {
        state.cursor.advance_to(raw);
        rest = after.trim();
        if rest.is_empty() {
            return Ok(());
        }
    }

    if let Some(namespace) = with_block(rest) {
        state.namespace = Some(namespace.to_string());
        return Ok(());
    }

    let call = parse_call(rest).map_err(LineError::Syntax)?;
    let key = call.command_key_in(state.namespace.as_deref());
    match lookup(&key) {
        Some(command) => apply_command(command, &key, &call, state, session),
        None => {
            session.unknown_command(path, line_no, &key);
            Ok(())
        }
    }
}

/// `With Track` opens a namespace for shorthand calls.
fn with_block(expr: &str) -> Option<&str> {
    let (word, rest) = expr.split_once(char::is_whitespace)?;
    if word.eq_ignore_ascii_case("with") && !rest.trim().is_empty() {
        Some(rest.trim())
    } else {
        None
    }
}

/// `(index, path)` from either `Kind(i).Load(path)` or `Kind(i; path)`.
fn indexed_path(key: &str, call: &CallExpr) -> Result<(usize, String), LineError> {
    let index_args = call.index_arguments();
    let args = call.arguments();
    let (index, path) = if index_args.is_empty() {
        (index_arg(key, &args, 0, 0)?, text_arg(&args, 1))
    } else {
        (index_arg(key, &index_args, 0, 0)?, text_arg(&args, 0))
    };
    if path.is_empty() {
        return Err(LineError::MissingArgument {
            command: key.to_string(),
            index: 1,
        });
    }
    Ok((index, path))
}

fn door_side(value: &str) -> DoorSide {
    match parse_number(value) {
        Some(code) => DoorSide::from_code(code),
        None => DoorSide::from_name(value).unwrap_or_default(),
    }
}

fn safety_system(value: &str) -> i32 {
    match value.trim().to_ascii_lowercase().as_str() {
        "atc" | "1" => 1,
        _ => 0,
    }
}

fn apply_command(
    command: CsvCommand,
    key: &str,
    call: &CallExpr,
    state: &mut CsvState,
    session: &mut ParseSession<'_>,
) -> Result<(), LineError> {
    let args = call.arguments();
    let position = state.cursor.position;
    let route = &mut session.model;

    match command {
        CsvCommand::UnitOfLength => {
            let value = text_arg(&args, 0);
            state.cursor.unit = unit_factor(&value).ok_or_else(|| LineError::InvalidNumber {
                command: key.to_string(),
                value,
            })?;
        }
        CsvCommand::Comment => route.comment = call.raw_arguments().trim().to_string(),
        CsvCommand::Image => route.image = text_arg(&args, 0),
        CsvCommand::Gauge => route.gauge = gauge_from_millimeters(required_number(key, &args, 0)?)?,
        CsvCommand::Elevation => route.initial_elevation = required_number(key, &args, 0)?,
        CsvCommand::StructureLoad => {
            let kind = call
                .segments
                .get(1)
                .map(|s| s.name.as_str())
                .ok_or_else(|| LineError::Syntax(format!("{}: missing structure kind", key)))?;
            let (index, file) = indexed_path(key, call)?;
            route.define_structure(structure_key(kind, index), file);
        }
        CsvCommand::BackgroundLoad => {
            let (index, file) = indexed_path(key, call)?;
            route.define_structure(structure_key("background", index), file.clone());
            match route.background.as_mut() {
                Some(bg) if index == 0 => bg.image = file,
                Some(_) => {}
                None => {
                    route.background = Some(Background {
                        image: file,
                        mode: BackgroundMode::Fixed,
                    })
                }
            }
        }
        CsvCommand::BackgroundAspect => {
            let mode_arg = if call.index_arguments().is_empty() {
                args.get(1)
            } else {
                args.first()
            };
            let keep = mode_arg.and_then(|m| parse_number(m)).unwrap_or(0.0) != 0.0;
            let mode = if keep {
                BackgroundMode::KeepAspect
            } else {
                BackgroundMode::Fixed
            };
            match route.background.as_mut() {
                Some(bg) => bg.mode = mode,
                None => {
                    route.background = Some(Background {
                        image: String::new(),
                        mode,
                    })
                }
            }
        }
        CsvCommand::SignalLoad => {
            let (index, file) = indexed_path(key, call)?;
            route.signals.insert(index.to_string(), file);
        }
        CsvCommand::Curve => route.add_curve(position, required_number(key, &args, 0)?),
        CsvCommand::Pitch => route.add_gradient(position, required_number(key, &args, 0)?),
        CsvCommand::Station => {
            let mut station = Station::new(
                position,
                text_arg(&args, 0),
                session.config.default_stop_duration,
            );
            station.arrival = parse_time(&text_arg(&args, 1), TimeNotation::Dotted);
            station.departure = parse_time(&text_arg(&args, 2), TimeNotation::Dotted);
            station.pass_alarm = number_arg(key, &args, 3, 0.0)? != 0.0;
            station.doors = door_side(&text_arg(&args, 4));
            station.forced_red_signal = number_arg(key, &args, 5, 0.0)? != 0.0;
            station.system = safety_system(&text_arg(&args, 6));
            station.stop_duration = number_arg(key, &args, 8, station.stop_duration)?;
            route.stations.push(station);
        }
        CsvCommand::Limit => route.speed_limits.push(SpeedLimit {
            position,
            limit: number_arg(key, &args, 0, 0.0)?,
        }),
        CsvCommand::RailStart | CsvCommand::Rail | CsvCommand::RailEnd => {
            let rail = parse_index(key, &text_arg(&args, 0))?;
            let x = number_arg(key, &args, 1, 0.0)?;
            let y = number_arg(key, &args, 2, 0.0)?;
            let kind = match command {
                CsvCommand::RailEnd => {
                    state.active_rails.remove(&rail);
                    RailEventKind::End
                }
                _ if state.active_rails.insert(rail) => RailEventKind::Start,
                _ => RailEventKind::Move,
            };
            route.rails.push(RailEvent {
                position,
                rail,
                kind,
                x,
                y,
            });
        }
        CsvCommand::Ground => {
            let index = index_arg(key, &args, 0, 0)?;
            route.grounds.push(GroundChange {
                position,
                structure: structure_key("ground", index),
            });
        }
        CsvCommand::FreeObj => {
            let rail = index_arg(key, &args, 0, 0)?;
            let index = parse_index(key, &text_arg(&args, 1))?;
            route.objects.push(PlacedObject {
                position,
                structure: structure_key("freeobj", index),
                rail,
                x: number_arg(key, &args, 2, 0.0)?,
                y: number_arg(key, &args, 3, 0.0)?,
                yaw: number_arg(key, &args, 4, 0.0)?,
            });
        }
        CsvCommand::Back => {
            let index = index_arg(key, &args, 0, 0)?;
            let bg_key = structure_key("background", index);
            let image = route
                .structure(&bg_key)
                .map(|s| s.path.clone())
                .ok_or_else(|| LineError::InvalidIndex {
                    command: key.to_string(),
                    value: index.to_string(),
                })?;
            let mode = route.background.as_ref().map(|b| b.mode).unwrap_or_default();
            route.background = Some(Background { image, mode });
        }
        CsvCommand::HostExtension => route.host_extensions = true,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::diagnostics::ParseReport;
    use crate::model::route::{RouteModel, UNSET_TIME};
    use crate::tokenizer::normalize_command;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn is_known_command(name: &str) -> bool {
        lookup(&normalize_command(name)).is_some()
    }

    fn parse_text(text: &str) -> ParseReport<RouteModel> {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        ExtendedCsvParser
            .parse_with(file.path(), &ParserConfig::default())
            .unwrap()
    }

    #[test]
    fn test_command_lookup() {
        assert!(is_known_command("Track.Curve"));
        assert!(is_known_command("TRACK.FREEOBJ"));
        assert!(is_known_command("Structure.FreeObj.Load"));
        assert!(is_known_command("structure.walll"));
        assert!(!is_known_command("Structure.Teapot"));
        assert!(!is_known_command("Track.Fog"));
    }

    #[test]
    fn test_curve_with_position_prefix() {
        let route = parse_text("Route.Comment(test)\n1200, Track.Curve(600; 0)\n").output;
        assert_eq!(route.geometries.len(), 1);
        let g = route.geometries[0];
        assert_eq!((g.position, g.radius, g.gradient), (1200.0, 600.0, 0.0));
    }

    #[test]
    fn test_unit_of_length() {
        let text = "100, Track.Pitch(2)\nOptions.UnitOfLength(kilometer)\n1, Track.Curve(400)\n";
        let route = parse_text(text).output;
        assert_eq!(route.geometries[0].position, 100.0);
        assert_eq!(route.geometries[1].position, 1000.0);
        assert_eq!(unit_factor("yd"), Some(0.9144));
        assert_eq!(unit_factor("0.3048"), Some(0.3048));
        assert_eq!(unit_factor("furlong"), None);
    }

    #[test]
    fn test_structures_and_free_objects() {
        let text = "Structure.FreeObj(3).Load(objects\\tree.x)\n\
                    Structure.Ground(1; grass.csv)\n\
                    Structure.FreeObj(3).Load(objects\\pine.x)\n\
                    250, Track.FreeObj(0; 3; -4.5; 0; 10), Track.Ground(1)\n";
        let route = parse_text(text).output;
        assert_eq!(route.structures.len(), 2);
        assert_eq!(route.structure("freeobj#3").unwrap().path, "objects\\pine.x");
        assert_eq!(route.structure("ground#1").unwrap().path, "grass.csv");
        let obj = &route.objects[0];
        assert_eq!(obj.structure, "freeobj#3");
        assert_eq!((obj.position, obj.x, obj.yaw), (250.0, -4.5, 10.0));
        assert_eq!(route.grounds[0].structure, "ground#1");
    }

    #[test]
    fn test_with_block_shorthand() {
        let text = "With Route\n.Gauge 1067\n.Comment Hello\nWith Track\n50, .Curve 300\n";
        let route = parse_text(text).output;
        assert_eq!(route.gauge, 1.067);
        assert_eq!(route.comment, "Hello");
        assert_eq!(route.geometries[0].position, 50.0);
    }

    #[test]
    fn test_station_argument_order() {
        let text = "Route.Comment(x)\n500, Track.Sta(Central; 10.3015; 10.31; 0; L; 1; ATC; ; 30)\n\
                    900, Track.Sta(Halt)\n";
        let stations = parse_text(text).output.stations;
        assert_eq!(stations.len(), 2);
        let a = &stations[0];
        assert_eq!(a.name, "Central");
        assert_eq!(a.position, 500.0);
        assert_eq!(a.arrival, 37815.0);
        assert_eq!(a.departure, 37860.0);
        assert_eq!(a.doors, DoorSide::Left);
        assert!(a.forced_red_signal);
        assert_eq!(a.system, 1);
        assert_eq!(a.stop_duration, 30.0);
        assert_eq!(stations[1].arrival, UNSET_TIME);
        assert_eq!(stations[1].departure, UNSET_TIME);
        assert_eq!(stations[1].stop_duration, 15.0);
    }

    #[test]
    fn test_background_and_back() {
        let text = "Texture.Background(0).Load(sky.png)\nTexture.Background(1; dusk.png)\n\
                    Texture.Background(0).Aspect(1)\n2000, Track.Back(1)\n";
        let route = parse_text(text).output;
        let bg = route.background.unwrap();
        assert_eq!(bg.image, "dusk.png");
        assert_eq!(bg.mode, BackgroundMode::KeepAspect);
    }

    #[test]
    fn test_rails_and_limits() {
        let text = "0, Track.RailStart(1; 3.8), Track.Limit(80)\n100, Track.Rail(1; 4)\n200, Track.RailEnd(1)\n";
        let route = parse_text(text).output;
        let kinds: Vec<_> = route.rails.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![RailEventKind::Start, RailEventKind::Move, RailEventKind::End]
        );
        assert_eq!(route.speed_limits[0].limit, 80.0);
    }

    #[test]
    fn test_host_extension_commands() {
        let route = parse_text("Route.Comment(x)\n0, Track.SigF(0; 1; 0; 0)\n").output;
        assert!(route.host_extensions);
    }

    #[test]
    fn test_bad_expression_does_not_stop_the_line() {
        let report = parse_text("0, Track.Curve(abc), Track.Pitch(3)\n;100, Track.Curve(5)\n");
        assert_eq!(report.output.geometries.len(), 1);
        assert_eq!(report.output.geometries[0].gradient, 3.0);
        assert_eq!(report.diagnostics.len(), 1);
    }

    #[test]
    fn test_utf8_bom() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"\xEF\xBB\xBFRoute.Comment(caf\xC3\xA9)\n").unwrap();
        let route = ExtendedCsvParser.parse(file.path()).unwrap();
        assert_eq!(route.comment, "café");
    }
}
