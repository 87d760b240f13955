//! Legacy-Linear dialect.
//!
//! One statement per line: either a bare distance that moves the cursor or a
//! keyword followed by whitespace-separated arguments. `;` starts a comment.
//!
//! ```text
//! comment Sample line
//! gauge 1067
//! 0
//! station Shinagawa 10.00.00 10.00.30
//! 250
//! curve -600
//! ```
//!
//! Files are decoded with the legacy encoding unless they start with a
//! byte-order mark.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use once_cell::sync::Lazy;

use super::{gauge_from_millimeters, DistanceCursor, ParseSession, RouteParser};
use crate::detect::RouteFormat;
use crate::encoding;
use crate::error::{LineError, ParseError};
use crate::model::route::{
    Background, BackgroundMode, GroundChange, PlacedObject, RailEvent, RailEventKind, Repeater,
    RepeaterKind, SpeedLimit, Station,
};
use crate::syntax::strip_comment;
use crate::tokenizer::{
    index_arg, normalize_command, number_arg, parse_index, parse_number, parse_time,
    required_number, TimeNotation,
};

/// Default spacing of `repeat` placements in meters.
const DEFAULT_REPEAT_INTERVAL: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LegacyCommand {
    Comment,
    Image,
    Gauge,
    Elevation,
    Structure,
    Object,
    Background,
    Curve,
    Gradient,
    Station,
    Limit,
    Rail,
    RailEnd,
    Ground,
    Repeat,
    RepeatEnd,
}

static COMMANDS: Lazy<HashMap<&'static str, LegacyCommand>> = Lazy::new(|| {
    HashMap::from([
        ("comment", LegacyCommand::Comment),
        ("image", LegacyCommand::Image),
        ("gauge", LegacyCommand::Gauge),
        ("elevation", LegacyCommand::Elevation),
        ("structure", LegacyCommand::Structure),
        ("object", LegacyCommand::Object),
        ("background", LegacyCommand::Background),
        ("curve", LegacyCommand::Curve),
        ("gradient", LegacyCommand::Gradient),
        ("pitch", LegacyCommand::Gradient),
        ("station", LegacyCommand::Station),
        ("limit", LegacyCommand::Limit),
        ("speed", LegacyCommand::Limit),
        ("rail", LegacyCommand::Rail),
        ("railend", LegacyCommand::RailEnd),
        ("ground", LegacyCommand::Ground),
        ("repeat", LegacyCommand::Repeat),
        ("repeatend", LegacyCommand::RepeatEnd),
    ])
});

#[derive(Debug, Default)]
struct LegacyState {
    cursor: DistanceCursor,
    active_rails: BTreeSet<usize>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyLinearParser;

impl RouteParser for LegacyLinearParser {
    fn format(&self) -> RouteFormat {
        RouteFormat::LegacyLinear
    }

    fn parse_into(&self, path: &Path, session: &mut ParseSession<'_>) -> Result<(), ParseError> {
        let decoded = encoding::read_text(path, session.config)?;
        let mut state = LegacyState::default();

        for (idx, raw) in decoded.text.lines().enumerate() {
            let line_no = idx + 1;
            let line = strip_comment(raw, &[";"]).trim();
            if line.is_empty() {
                continue;
            }
            if let Err(e) = apply_line(line, line_no, path, &mut state, session) {
                session.line_error(path, line_no, raw, &e);
            }
        }
        Ok(())
    }
}

fn apply_line(
    line: &str,
    line_no: usize,
    path: &Path,
    state: &mut LegacyState,
    session: &mut ParseSession<'_>,
) -> Result<(), LineError> {
    if let Some(distance) = parse_number(line) {
        state.cursor.advance_to(distance);
        return Ok(());
    }

    let (keyword, rest) = match line.split_once(char::is_whitespace) {
        Some((k, r)) => (k, r.trim()),
        None => (line, ""),
    };
    let key = normalize_command(keyword);
    let Some(command) = COMMANDS.get(key.as_str()).copied() else {
        session.unknown_command(path, line_no, keyword);
        return Ok(());
    };
    let args: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
    let position = state.cursor.position;
    let route = &mut session.model;

    match command {
        LegacyCommand::Comment => route.comment = rest.to_string(),
        LegacyCommand::Image => route.image = rest.to_string(),
        LegacyCommand::Gauge => {
            route.gauge = gauge_from_millimeters(required_number(&key, &args, 0)?)?;
        }
        LegacyCommand::Elevation => route.initial_elevation = required_number(&key, &args, 0)?,
        LegacyCommand::Structure => {
            let name = required_text(&key, &args, 0)?;
            let file = required_text(&key, &args, 1)?;
            route.define_structure(name, file);
        }
        LegacyCommand::Object => {
            let structure = required_text(&key, &args, 0)?;
            route.objects.push(PlacedObject {
                position,
                structure: structure.to_string(),
                rail: index_arg(&key, &args, 1, 0)?,
                x: number_arg(&key, &args, 2, 0.0)?,
                y: number_arg(&key, &args, 3, 0.0)?,
                yaw: number_arg(&key, &args, 4, 0.0)?,
            });
        }
        LegacyCommand::Background => {
            route.background = Some(Background {
                image: rest.to_string(),
                mode: BackgroundMode::Fixed,
            });
        }
        LegacyCommand::Curve => route.add_curve(position, required_number(&key, &args, 0)?),
        LegacyCommand::Gradient => route.add_gradient(position, required_number(&key, &args, 0)?),
        LegacyCommand::Station => {
            let name = required_text(&key, &args, 0)?;
            let mut station = Station::new(position, name, session.config.default_stop_duration);
            if let Some(arr) = args.get(1) {
                station.arrival = parse_time(arr, TimeNotation::Dotted);
            }
            if let Some(dep) = args.get(2) {
                station.departure = parse_time(dep, TimeNotation::Dotted);
            }
            station.stop_duration = number_arg(&key, &args, 3, station.stop_duration)?;
            route.stations.push(station);
        }
        LegacyCommand::Limit => route.speed_limits.push(SpeedLimit {
            position,
            limit: required_number(&key, &args, 0)?,
        }),
        LegacyCommand::Rail => {
            let rail = parse_index(&key, required_text(&key, &args, 0)?)?;
            let x = number_arg(&key, &args, 1, 0.0)?;
            let y = number_arg(&key, &args, 2, 0.0)?;
            let kind = if state.active_rails.insert(rail) {
                RailEventKind::Start
            } else {
                RailEventKind::Move
            };
            route.rails.push(RailEvent {
                position,
                rail,
                kind,
                x,
                y,
            });
        }
        LegacyCommand::RailEnd => {
            let rail = parse_index(&key, required_text(&key, &args, 0)?)?;
            state.active_rails.remove(&rail);
            route.rails.push(RailEvent {
                position,
                rail,
                kind: RailEventKind::End,
                x: 0.0,
                y: 0.0,
            });
        }
        LegacyCommand::Ground => route.grounds.push(GroundChange {
            position,
            structure: required_text(&key, &args, 0)?.to_string(),
        }),
        LegacyCommand::Repeat => {
            let name = required_text(&key, &args, 0)?;
            let structure = required_text(&key, &args, 1)?;
            route.repeaters.push(Repeater {
                position,
                key: name.to_string(),
                kind: RepeaterKind::Begin,
                rail: 0,
                structures: vec![structure.to_string()],
                interval: number_arg(&key, &args, 2, DEFAULT_REPEAT_INTERVAL)?,
            });
        }
        LegacyCommand::RepeatEnd => {
            let name = required_text(&key, &args, 0)?;
            route.repeaters.push(Repeater::end(position, name));
        }
    }
    Ok(())
}

fn required_text<'a>(command: &str, args: &'a [String], index: usize) -> Result<&'a str, LineError> {
    args.get(index)
        .map(String::as_str)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| LineError::MissingArgument {
            command: command.to_string(),
            index,
        })
}
