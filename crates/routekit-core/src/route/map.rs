//! Keyed-Map dialect.
//!
//! ```text
//! BveTs Map 2.02:utf-8
//! Structure.Load('structures.txt');
//! Station.Load('stations.txt');
//! Include 'track/section1.txt';
//!
//! 0;
//!     Curve.Begin(600);
//!     Structure['tree01'].Put(0, -4, 0, 0, 0, 90, 0, 0, 0);
//! 150;
//!     Station['sta1'].Put(-1, -2, 2);
//! ```
//!
//! `Map.Load` / `Include` parse the referenced file into the same session and
//! share the distance cursor and key registries with the including file.
//! `Structure/Station/Signal/Sound.Load` with one argument name a list file
//! of `key, value, ...` rows; with two they register a single key.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use tracing::info;

use super::{missing_reference, resolve_reference, DistanceCursor, ParseSession, RouteParser};
use crate::detect::RouteFormat;
use crate::diagnostics::{include_cycle, Diagnostic, DiagnosticCode, SourceLocation};
use crate::encoding;
use crate::error::{LineError, ParseError};
use crate::model::route::{
    Background, BackgroundMode, DoorSide, PlacedObject, RailEvent, RailEventKind, Repeater,
    RepeaterKind, SpeedLimit, Station,
};
use crate::syntax::{parse_call, split_top_level, strip_comment, CallExpr};
use crate::tokenizer::{
    number_arg, parse_number, parse_time_any, required_number, split_arguments, text_arg,
    unquote,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MapCommand {
    Include,
    StructureLoad,
    StationLoad,
    SignalLoad,
    SoundLoad,
    StructurePut,
    StructurePut0,
    RepeaterBegin,
    RepeaterBegin0,
    RepeaterEnd,
    Curve,
    CurveEnd,
    Gradient,
    GradientEnd,
    SpeedLimit,
    SpeedLimitEnd,
    StationPut,
    BackgroundChange,
    TrackPosition,
}

static COMMANDS: Lazy<HashMap<&'static str, MapCommand>> = Lazy::new(|| {
    HashMap::from([
        ("map_load", MapCommand::Include),
        ("include", MapCommand::Include),
        ("structure_load", MapCommand::StructureLoad),
        ("station_load", MapCommand::StationLoad),
        ("signal_load", MapCommand::SignalLoad),
        ("sound_load", MapCommand::SoundLoad),
        ("structure_put", MapCommand::StructurePut),
        ("structure_put0", MapCommand::StructurePut0),
        ("repeater_begin", MapCommand::RepeaterBegin),
        ("repeater_begin0", MapCommand::RepeaterBegin0),
        ("repeater_end", MapCommand::RepeaterEnd),
        ("curve", MapCommand::Curve),
        ("curve_begin", MapCommand::Curve),
        ("curve_begincircular", MapCommand::Curve),
        ("curve_end", MapCommand::CurveEnd),
        ("gradient", MapCommand::Gradient),
        ("gradient_begin", MapCommand::Gradient),
        ("gradient_beginconst", MapCommand::Gradient),
        ("gradient_end", MapCommand::GradientEnd),
        ("speedlimit_begin", MapCommand::SpeedLimit),
        ("speedlimit_end", MapCommand::SpeedLimitEnd),
        ("station_put", MapCommand::StationPut),
        ("background_change", MapCommand::BackgroundChange),
        ("track_position", MapCommand::TrackPosition),
    ])
});

/// Registries and cursor shared by a map file and everything it includes.
#[derive(Debug, Default)]
struct MapState {
    cursor: DistanceCursor,
    /// Station definitions from `Station.Load`, keyed by lowercase key.
    stations: HashMap<String, Station>,
    /// Secondary track keys and the rail index assigned to each.
    track_keys: HashMap<String, usize>,
    active_rails: BTreeSet<usize>,
    /// Files currently being parsed, outermost first.
    include_stack: Vec<PathBuf>,
}

impl MapState {
    /// Rail index for a track key; `0` and the empty key are the main track.
    fn rail_index(&mut self, key: &str) -> usize {
        let key = unquote(key).trim().to_lowercase();
        if key.is_empty() || key == "0" {
            return 0;
        }
        let next = self.track_keys.len() + 1;
        *self.track_keys.entry(key).or_insert(next)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct KeyedMapParser;

impl RouteParser for KeyedMapParser {
    fn format(&self) -> RouteFormat {
        RouteFormat::KeyedMap
    }

    fn parse_into(&self, path: &Path, session: &mut ParseSession<'_>) -> Result<(), ParseError> {
        let mut state = MapState::default();
        parse_file(path, &mut state, session, 0)
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Encoding label from a `BveTs <kind> <version>:<label>` header line.
pub fn header_encoding(text: &str) -> Option<&str> {
    let first = text.lines().find(|l| !l.trim().is_empty())?.trim();
    if !is_header(first) {
        return None;
    }
    first
        .split_once(':')
        .map(|(_, label)| label.trim())
        .filter(|label| !label.is_empty())
}

fn is_header(line: &str) -> bool {
    line.trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("bvets "))
}

/// Read a map or list file, honouring an encoding named in its header.
fn read_keyed_text(path: &Path, session: &mut ParseSession<'_>) -> Result<String, ParseError> {
    let bytes = encoding::read_bytes(path)?;
    let decoded = encoding::decode(&bytes, session.config.legacy_encoding());
    let Some(label) = header_encoding(&decoded.text) else {
        return Ok(decoded.text);
    };
    match Encoding::for_label(label.as_bytes()) {
        Some(enc) if enc != decoded.encoding => Ok(encoding::decode_as(&bytes, enc).text),
        Some(_) => Ok(decoded.text),
        None => {
            session.warning(
                Diagnostic::warning(
                    DiagnosticCode::UnknownEncoding,
                    format!(
                        "unknown encoding '{}' in header; using {}",
                        label,
                        decoded.encoding.name()
                    ),
                )
                .with_location(SourceLocation::new(path, 1)),
            );
            Ok(decoded.text)
        }
    }
}

fn parse_file(
    path: &Path,
    state: &mut MapState,
    session: &mut ParseSession<'_>,
    depth: usize,
) -> Result<(), ParseError> {
    let text = read_keyed_text(path, session)?;
    state.include_stack.push(canonical(path));

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw, &["//", "#"]);
        if is_header(line) {
            continue;
        }
        for stmt in split_top_level(line, &[';']) {
            if let Err(e) = apply_statement(stmt, path, line_no, state, session, depth) {
                session.line_error(path, line_no, stmt, &e);
            }
        }
    }

    state.include_stack.pop();
    Ok(())
}

fn apply_statement(
    stmt: &str,
    path: &Path,
    line_no: usize,
    state: &mut MapState,
    session: &mut ParseSession<'_>,
    depth: usize,
) -> Result<(), LineError> {
    if let Some(distance) = parse_number(stmt) {
        state.cursor.advance_to(distance);
        return Ok(());
    }

    // `Include 'file'` has no parentheses
    if let Some((word, rest)) = stmt.split_once(char::is_whitespace) {
        if word.eq_ignore_ascii_case("include") && !rest.trim_start().starts_with('(') {
            include(path, line_no, unquote(rest), state, session, depth);
            return Ok(());
        }
    }

    let call = parse_call(stmt).map_err(LineError::Syntax)?;
    let key = call.command_key();
    let Some(command) = COMMANDS.get(key.as_str()).copied() else {
        session.unknown_command(path, line_no, &key);
        return Ok(());
    };
    apply_command(command, &key, &call, path, line_no, state, session, depth)
}

#[allow(clippy::too_many_arguments)]
fn apply_command(
    command: MapCommand,
    key: &str,
    call: &CallExpr,
    path: &Path,
    line_no: usize,
    state: &mut MapState,
    session: &mut ParseSession<'_>,
    depth: usize,
) -> Result<(), LineError> {
    let args = call.arguments();
    let position = state.cursor.position;

    match command {
        MapCommand::Include => {
            let reference = required_text(key, &args, 0)?;
            include(path, line_no, &reference, state, session, depth);
        }
        MapCommand::StructureLoad
        | MapCommand::StationLoad
        | MapCommand::SignalLoad
        | MapCommand::SoundLoad => {
            let first = required_text(key, &args, 0)?;
            if args.len() >= 2 {
                let row = vec![first, text_arg(&args, 1)];
                register(command, &row, path, state, session);
            } else {
                load_list(command, path, line_no, &first, state, session);
            }
        }
        MapCommand::StructurePut | MapCommand::StructurePut0 => {
            let structure = bracket_key(key, call)?;
            let track = text_arg(&args, 0);
            let object = if command == MapCommand::StructurePut {
                PlacedObject {
                    position: position + number_arg(key, &args, 3, 0.0)?,
                    structure,
                    rail: state.rail_index(&track),
                    x: number_arg(key, &args, 1, 0.0)?,
                    y: number_arg(key, &args, 2, 0.0)?,
                    yaw: number_arg(key, &args, 5, 0.0)?,
                }
            } else {
                PlacedObject {
                    position,
                    structure,
                    rail: state.rail_index(&track),
                    x: 0.0,
                    y: 0.0,
                    yaw: 0.0,
                }
            };
            session.model.objects.push(object);
        }
        MapCommand::RepeaterBegin | MapCommand::RepeaterBegin0 => {
            let repeater_key = bracket_key(key, call)?;
            // Begin: track, x, y, z, rx, ry, rz, tilt, span, interval, keys...
            // Begin0: track, tilt, span, interval, keys...
            let interval_at = if command == MapCommand::RepeaterBegin { 9 } else { 3 };
            let interval = required_number(key, &args, interval_at)?;
            let structures: Vec<String> = args
                .iter()
                .skip(interval_at + 1)
                .map(|a| unquote(a).to_lowercase())
                .filter(|a| !a.is_empty())
                .collect();
            let rail = state.rail_index(&text_arg(&args, 0));
            session.model.repeaters.push(Repeater {
                position,
                key: repeater_key,
                kind: RepeaterKind::Begin,
                rail,
                structures,
                interval,
            });
        }
        MapCommand::RepeaterEnd => {
            let repeater_key = bracket_key(key, call)?;
            session.model.repeaters.push(Repeater::end(position, repeater_key));
        }
        MapCommand::Curve => {
            let radius = required_number(key, &args, 0)?;
            session.model.add_curve(position, radius);
        }
        MapCommand::CurveEnd => session.model.add_curve(position, 0.0),
        MapCommand::Gradient => {
            let gradient = required_number(key, &args, 0)?;
            session.model.add_gradient(position, gradient);
        }
        MapCommand::GradientEnd => session.model.add_gradient(position, 0.0),
        MapCommand::SpeedLimit => {
            let limit = required_number(key, &args, 0)?;
            session.model.speed_limits.push(SpeedLimit { position, limit });
        }
        MapCommand::SpeedLimitEnd => session.model.speed_limits.push(SpeedLimit {
            position,
            limit: 0.0,
        }),
        MapCommand::StationPut => {
            let station_key = bracket_key(key, call)?;
            let doors = DoorSide::from_code(number_arg(key, &args, 0, 0.0)?);
            let mut station = state.stations.get(&station_key).cloned().unwrap_or_else(|| {
                Station::new(0.0, station_key.clone(), session.config.default_stop_duration)
            });
            station.position = position;
            station.doors = doors;
            session.model.stations.push(station);
        }
        MapCommand::BackgroundChange => {
            let background_key = required_text(key, &args, 0)?.to_lowercase();
            let image = session
                .model
                .structure(&background_key)
                .map(|s| s.path.clone())
                .unwrap_or(background_key);
            session.model.background = Some(Background {
                image,
                mode: BackgroundMode::Fixed,
            });
        }
        MapCommand::TrackPosition => {
            let track = bracket_key(key, call)?;
            let x = required_number(key, &args, 0)?;
            let y = number_arg(key, &args, 1, 0.0)?;
            let rail = state.rail_index(&track);
            let kind = if state.active_rails.insert(rail) {
                RailEventKind::Start
            } else {
                RailEventKind::Move
            };
            session.model.rails.push(RailEvent {
                position,
                rail,
                kind,
                x,
                y,
            });
        }
    }
    Ok(())
}

fn required_text(command: &str, args: &[String], index: usize) -> Result<String, LineError> {
    let text = text_arg(args, index);
    if text.is_empty() {
        Err(LineError::MissingArgument {
            command: command.to_string(),
            index,
        })
    } else {
        Ok(text)
    }
}

fn bracket_key(command: &str, call: &CallExpr) -> Result<String, LineError> {
    call.key()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| LineError::Syntax(format!("{}: missing [key]", command)))
}

/// Parse an included map file into the running session.
fn include(
    from: &Path,
    line_no: usize,
    reference: &str,
    state: &mut MapState,
    session: &mut ParseSession<'_>,
    depth: usize,
) {
    let child = resolve_reference(from, reference);
    let at = SourceLocation::new(from, line_no);

    if !child.is_file() {
        missing_reference(session, "included map", &child, at);
        return;
    }
    if state.include_stack.contains(&canonical(&child)) {
        session.warning(include_cycle(&child, at));
        return;
    }
    if depth + 1 > session.config.max_include_depth {
        session.warning(
            Diagnostic::warning(
                DiagnosticCode::IncludeDepthExceeded,
                format!(
                    "include depth limit {} reached; '{}' skipped",
                    session.config.max_include_depth,
                    child.display()
                ),
            )
            .with_location(at),
        );
        return;
    }

    info!("Including {}", child.display());
    if let Err(e) = parse_file(&child, state, session, depth + 1) {
        session.warning(
            Diagnostic::warning(DiagnosticCode::MissingReference, e.to_string()).with_location(at),
        );
    }
}

/// Read a `key, value, ...` list file and register each row.
fn load_list(
    command: MapCommand,
    from: &Path,
    line_no: usize,
    reference: &str,
    state: &mut MapState,
    session: &mut ParseSession<'_>,
) {
    let list_path = resolve_reference(from, reference);
    let at = SourceLocation::new(from, line_no);
    if !list_path.is_file() {
        missing_reference(session, "list file", &list_path, at);
        return;
    }
    let text = match read_keyed_text(&list_path, session) {
        Ok(text) => text,
        Err(e) => {
            session.warning(
                Diagnostic::warning(DiagnosticCode::MissingReference, e.to_string())
                    .with_location(at),
            );
            return;
        }
    };

    for (idx, raw) in text.lines().enumerate() {
        let line = strip_comment(raw, &["//", "#"]).trim();
        if line.is_empty() || is_header(line) {
            continue;
        }
        let row: Vec<String> = split_arguments(line)
            .iter()
            .map(|f| unquote(f).to_string())
            .collect();
        if row.len() < 2 || row[0].is_empty() {
            let e = LineError::MissingArgument {
                command: "list".to_string(),
                index: 1,
            };
            session.line_error(&list_path, idx + 1, raw, &e);
            continue;
        }
        register(command, &row, &list_path, state, session);
    }
}

/// Register one `key, value, ...` row; file values resolve against `base`.
fn register(
    command: MapCommand,
    row: &[String],
    base: &Path,
    state: &mut MapState,
    session: &mut ParseSession<'_>,
) {
    let key = row[0].to_lowercase();
    let file = || resolve_reference(base, &row[1]).to_string_lossy().into_owned();
    match command {
        MapCommand::StructureLoad => session.model.define_structure(key, file()),
        MapCommand::SignalLoad => {
            session.model.signals.insert(key, file());
        }
        MapCommand::SoundLoad => {
            session.model.sounds.insert(key, file());
        }
        MapCommand::StationLoad => {
            // key, name, arrival, departure, stoppage, default time, ...
            let field = |i: usize| row.get(i).map(String::as_str).unwrap_or("");
            let mut station = Station::new(0.0, field(1), session.config.default_stop_duration);
            // list files are written with either separator
            station.arrival = parse_time_any(field(2));
            station.departure = parse_time_any(field(3));
            if let Some(stop) = parse_number(field(4)) {
                station.stop_duration = stop;
            }
            state.stations.insert(key, station);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::diagnostics::ParseReport;
    use crate::model::route::{RouteModel, UNSET_TIME};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, text).unwrap();
        path
    }

    fn parse(path: &Path) -> ParseReport<RouteModel> {
        KeyedMapParser
            .parse_with(path, &ParserConfig::default())
            .unwrap()
    }

    #[test]
    fn test_header_encoding() {
        assert_eq!(header_encoding("BveTs Map 2.02:shift_jis\n0;"), Some("shift_jis"));
        assert_eq!(header_encoding("\nBveTs Map 2.02\n"), None);
        assert_eq!(header_encoding("Curve(5);"), None);
    }

    #[test]
    fn test_curve_and_ends() {
        let dir = TempDir::new().unwrap();
        let map = write(
            &dir,
            "map.txt",
            "BveTs Map 2.02\n100;\nCurve.Begin(600);\n250; Curve.End(); Gradient(5);\n",
        );
        let route = parse(&map).output;
        let g: Vec<_> = route
            .geometries
            .iter()
            .map(|g| (g.position, g.radius, g.gradient))
            .collect();
        assert_eq!(g, vec![(100.0, 600.0, 0.0), (250.0, 0.0, 0.0), (250.0, 0.0, 5.0)]);
    }

    #[test]
    fn test_include_shares_cursor_and_model() {
        let dir = TempDir::new().unwrap();
        write(&dir, "child.txt", "BveTs Map 2.02\n200;\nStation['s1'].Put(1, -2, 2);\n");
        let map = write(
            &dir,
            "map.txt",
            "BveTs Map 2.02\nMap.Load('child.txt');\nCurve(400);\n",
        );
        let route = parse(&map).output;
        assert_eq!(route.stations.len(), 1);
        assert_eq!(route.stations[0].position, 200.0);
        assert_eq!(route.stations[0].doors, DoorSide::Right);
        assert_eq!(route.geometries[0].position, 200.0);
    }

    #[test]
    fn test_missing_include_is_dropped() {
        let dir = TempDir::new().unwrap();
        let map = write(&dir, "map.txt", "BveTs Map 2.02\nInclude 'gone.txt';\n0; Curve(300);\n");
        let report = parse(&map);
        assert_eq!(report.output.geometries.len(), 1);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].code, DiagnosticCode::MissingReference);
    }

    #[test]
    fn test_include_cycle_is_skipped() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.txt", "BveTs Map 2.02\nInclude 'a.txt';\nCurve(100);\n");
        let a = write(&dir, "a.txt", "BveTs Map 2.02\nInclude 'b.txt';\n");
        let report = parse(&a);
        assert_eq!(report.output.geometries.len(), 1);
        assert_eq!(report.diagnostics[0].code, DiagnosticCode::IncludeCycle);
    }

    #[test]
    fn test_include_depth_limit() {
        let dir = TempDir::new().unwrap();
        write(&dir, "c.txt", "BveTs Map 2.02\nCurve(100);\n");
        write(&dir, "b.txt", "BveTs Map 2.02\nInclude 'c.txt';\n");
        let a = write(&dir, "a.txt", "BveTs Map 2.02\nInclude 'b.txt';\n");
        let config = ParserConfig {
            max_include_depth: 1,
            ..ParserConfig::default()
        };
        let report = KeyedMapParser.parse_with(&a, &config).unwrap();
        assert!(report.output.geometries.is_empty());
        assert_eq!(report.diagnostics[0].code, DiagnosticCode::IncludeDepthExceeded);
    }

    #[test]
    fn test_list_files_and_put() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "lists/structures.txt",
            "BveTs Structure List 2.00\n# key, file\nTree01, objects\\tree.x\nbad-row\n",
        );
        write(
            &dir,
            "lists/stations.txt",
            "BveTs Station List 2.00\nsta1, Central, 10:30:00, 10:31:00, 20\nsta2, Halt, P, , \n",
        );
        let map = write(
            &dir,
            "map.txt",
            "BveTs Map 2.02\nStructure.Load('lists/structures.txt');\nStation.Load('lists/stations.txt');\n\
             0; Structure['tree01'].Put(0, -4, 1, 0, 0, 90, 0, 0, 0);\n\
             500; Station['STA1'].Put(-1, -2, 2);\n800; Station['sta2'].Put(1, -2, 2);\n",
        );
        let report = parse(&map);
        let route = &report.output;

        let tree = route.structure("tree01").unwrap();
        assert!(tree.path.ends_with("objects/tree.x"));
        assert!(tree.path.contains("lists"));
        assert_eq!(route.objects[0].structure, "tree01");
        assert_eq!((route.objects[0].x, route.objects[0].yaw), (-4.0, 90.0));

        assert_eq!(route.stations.len(), 2);
        let central = &route.stations[0];
        assert_eq!(central.name, "Central");
        assert_eq!(central.position, 500.0);
        assert_eq!(central.arrival, 37800.0);
        assert_eq!(central.stop_duration, 20.0);
        assert_eq!(central.doors, DoorSide::Left);
        assert_eq!(route.stations[1].arrival, UNSET_TIME);

        // the malformed list row is reported, the rest still loads
        assert_eq!(report.diagnostics.len(), 1);
    }

    #[test]
    fn test_station_list_accepts_dotted_times() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "stations.txt",
            "BveTs Station List 2.00\nsta1, Central, 10.30.00, 10.31.00, 20\n",
        );
        let map = write(
            &dir,
            "map.txt",
            "BveTs Map 2.02\nStation.Load('stations.txt');\n500; Station['sta1'].Put(1);\n",
        );
        let station = &parse(&map).output.stations[0];
        assert_eq!((station.arrival, station.departure), (37800.0, 37860.0));
        assert_eq!(station.stop_duration, 20.0);
    }

    #[test]
    fn test_header_encoding_overrides_legacy_decode() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "stations.txt",
            "BveTs Station List 2.00:utf-8\nsta1, 東京, 10:00:00\n",
        );
        let map = write(
            &dir,
            "map.txt",
            "BveTs Map 2.02:utf-8\nStation.Load('stations.txt');\n0; Station['sta1'].Put(1);\n",
        );
        let report = parse(&map);
        assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
        assert_eq!(report.output.stations[0].name, "東京");
    }

    #[test]
    fn test_unknown_header_encoding_warns() {
        let dir = TempDir::new().unwrap();
        let map = write(&dir, "map.txt", "BveTs Map 2.02:klingon\n0; Curve(300);\n");
        let report = parse(&map);
        assert_eq!(report.output.geometries.len(), 1);
        assert_eq!(report.diagnostics.len(), 1);
        let diag = &report.diagnostics[0];
        assert_eq!(diag.code, DiagnosticCode::UnknownEncoding);
        assert_eq!(diag.location.as_ref().map(|l| l.line), Some(1));
    }

    #[test]
    fn test_repeaters_and_tracks() {
        let dir = TempDir::new().unwrap();
        let map = write(
            &dir,
            "map.txt",
            "BveTs Map 2.02\n0;\nRepeater['wall'].Begin0('up', 0, 0, 25, 'wall_a', 'wall_b');\n\
             Track['up'].Position(3.8, 0);\n100; Track['up'].Position(4.0);\nRepeater['wall'].End();\n",
        );
        let route = parse(&map).output;
        assert_eq!(route.repeaters[0].structures, vec!["wall_a", "wall_b"]);
        assert_eq!(route.repeaters[0].interval, 25.0);
        assert_eq!(route.repeaters[0].rail, 1);
        assert_eq!(route.repeaters[1].kind, RepeaterKind::End);
        assert_eq!(route.rails[0].kind, RailEventKind::Start);
        assert_eq!(route.rails[1].kind, RailEventKind::Move);
        assert_eq!(route.rails[1].rail, 1);
    }
}
