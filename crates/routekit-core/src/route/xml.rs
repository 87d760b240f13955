//! Structured-Document dialect.
//!
//! ```xml
//! <Route>
//!   <Info Comment="Sample line" Gauge="1067"/>
//!   <Structures><Structure Key="tree" Path="objects/tree.x"/></Structures>
//!   <Tracks>
//!     <Curve Distance="100" Radius="600"/>
//!     <FreeObj Distance="150" Structure="tree" X="-4"/>
//!   </Tracks>
//!   <Stations>
//!     <Station Distance="500" Name="Central" Arrival="10:30:00"/>
//!   </Stations>
//! </Route>
//! ```
//!
//! Tag and attribute names match case-insensitively. A value may be given as
//! an attribute or as a child element of the same name.

use std::path::Path;

use roxmltree as xml;
use tracing::debug;

use super::{gauge_from_millimeters, ParseSession, RouteParser};
use crate::detect::RouteFormat;
use crate::encoding;
use crate::error::{LineError, ParseError};
use crate::model::route::{
    Background, BackgroundMode, DoorSide, GroundChange, PlacedObject, RailEvent, RailEventKind,
    SpeedLimit, Station,
};
use crate::tokenizer::{parse_flag, parse_index, parse_number, parse_time, TimeNotation};

#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredDocumentParser;

impl RouteParser for StructuredDocumentParser {
    fn format(&self) -> RouteFormat {
        RouteFormat::StructuredDocument
    }

    fn parse_into(&self, path: &Path, session: &mut ParseSession<'_>) -> Result<(), ParseError> {
        let decoded = encoding::read_text(path, session.config)?;
        let doc = xml::Document::parse(&decoded.text).map_err(|source| ParseError::Xml {
            path: path.to_path_buf(),
            source,
        })?;

        let root = doc.root_element();
        if !root.tag_name().name().eq_ignore_ascii_case("route") {
            return Err(ParseError::MissingRoot {
                path: path.to_path_buf(),
                expected: "Route",
                found: root.tag_name().name().to_string(),
            });
        }

        let mut reader = DocumentReader { doc: &doc, path, session };
        for section in root.children().filter(|c| c.is_element()) {
            match section.tag_name().name().to_ascii_lowercase().as_str() {
                "info" => reader.element(&section, parse_info),
                "structures" => reader.each_child(&section, parse_structure),
                "background" => reader.element(&section, parse_background),
                "tracks" => reader.each_child(&section, parse_track_element),
                "stations" => reader.each_child(&section, parse_station),
                other => {
                    let line = reader.line(&section);
                    reader.session.unknown_command(path, line, other)
                }
            }
        }
        Ok(())
    }
}

type ElementFn = fn(&xml::Node, &mut ParseSession<'_>) -> Result<(), LineError>;

/// Walks sections and reports element failures with their line numbers.
struct DocumentReader<'d, 'input, 's, 'c> {
    doc: &'d xml::Document<'input>,
    path: &'d Path,
    session: &'s mut ParseSession<'c>,
}

impl DocumentReader<'_, '_, '_, '_> {
    fn line(&self, node: &xml::Node) -> usize {
        self.doc.text_pos_at(node.range().start).row as usize
    }

    fn element(&mut self, node: &xml::Node, parse: ElementFn) {
        if let Err(e) = parse(node, self.session) {
            let line = self.line(node);
            let text = format!("<{}>", node.tag_name().name());
            self.session.line_error(self.path, line, &text, &e);
        }
    }

    fn each_child(&mut self, section: &xml::Node, parse: ElementFn) {
        for child in section.children().filter(|c| c.is_element()) {
            self.element(&child, parse);
        }
    }
}

fn has_name(node: &xml::Node, name: &str) -> bool {
    node.tag_name().name().eq_ignore_ascii_case(name)
}

/// Attribute or child element text named `name`, trimmed.
fn value<'a>(node: &xml::Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name().eq_ignore_ascii_case(name))
        .map(|a| a.value())
        .or_else(|| {
            node.children()
                .find(|c| c.is_element() && has_name(c, name))
                .and_then(|c| c.text())
        })
        .map(str::trim)
}

fn text(node: &xml::Node, name: &str) -> String {
    value(node, name).unwrap_or_default().to_string()
}

fn number(node: &xml::Node, name: &str, default: f64) -> Result<f64, LineError> {
    match value(node, name) {
        None | Some("") => Ok(default),
        Some(v) => parse_number(v).ok_or_else(|| LineError::InvalidNumber {
            command: node.tag_name().name().to_string(),
            value: v.to_string(),
        }),
    }
}

fn required(node: &xml::Node, name: &str) -> Result<f64, LineError> {
    match value(node, name) {
        None | Some("") => Err(LineError::Syntax(format!(
            "<{}> is missing '{}'",
            node.tag_name().name(),
            name
        ))),
        Some(_) => number(node, name, 0.0),
    }
}

fn parse_info(node: &xml::Node, session: &mut ParseSession<'_>) -> Result<(), LineError> {
    let route = &mut session.model;
    if let Some(comment) = value(node, "Comment") {
        route.comment = comment.to_string();
    }
    if let Some(image) = value(node, "Image") {
        route.image = image.to_string();
    }
    if value(node, "Gauge").is_some() {
        route.gauge = gauge_from_millimeters(required(node, "Gauge")?)?;
    }
    route.initial_elevation = number(node, "Elevation", route.initial_elevation)?;
    Ok(())
}

fn parse_structure(node: &xml::Node, session: &mut ParseSession<'_>) -> Result<(), LineError> {
    let key = text(node, "Key").to_lowercase();
    let path = text(node, "Path");
    if key.is_empty() || path.is_empty() {
        return Err(LineError::Syntax(format!(
            "<{}> needs both Key and Path",
            node.tag_name().name()
        )));
    }
    session.model.define_structure(key, path);
    Ok(())
}

fn parse_background(node: &xml::Node, session: &mut ParseSession<'_>) -> Result<(), LineError> {
    let mode = match text(node, "Mode").to_ascii_lowercase().as_str() {
        "keepaspect" | "1" => BackgroundMode::KeepAspect,
        _ => BackgroundMode::Fixed,
    };
    session.model.background = Some(Background {
        image: text(node, "Image"),
        mode,
    });
    Ok(())
}

const TRACK_ELEMENTS: &[&str] = &[
    "curve", "gradient", "pitch", "ground", "freeobj", "limit", "rail",
];

fn parse_track_element(node: &xml::Node, session: &mut ParseSession<'_>) -> Result<(), LineError> {
    let tag = node.tag_name().name().to_ascii_lowercase();
    if !TRACK_ELEMENTS.contains(&tag.as_str()) {
        if session.config.log_unknown_commands {
            debug!("ignoring track element <{}>", tag);
        }
        return Ok(());
    }

    let position = required(node, "Distance")?;
    let route = &mut session.model;
    match tag.as_str() {
        "curve" => route.add_curve(position, required(node, "Radius")?),
        "gradient" | "pitch" => {
            let gradient = match value(node, "Value") {
                Some(_) => required(node, "Value")?,
                None => required(node, "Gradient")?,
            };
            route.add_gradient(position, gradient);
        }
        "ground" => route.grounds.push(GroundChange {
            position,
            structure: text(node, "Structure").to_lowercase(),
        }),
        "freeobj" => route.objects.push(PlacedObject {
            position,
            structure: text(node, "Structure").to_lowercase(),
            rail: rail_index(node)?,
            x: number(node, "X", 0.0)?,
            y: number(node, "Y", 0.0)?,
            yaw: number(node, "Yaw", 0.0)?,
        }),
        "limit" => route.speed_limits.push(SpeedLimit {
            position,
            limit: number(node, "Speed", 0.0)?,
        }),
        "rail" => {
            let kind = match text(node, "Kind").to_ascii_lowercase().as_str() {
                "end" => RailEventKind::End,
                "move" => RailEventKind::Move,
                _ => RailEventKind::Start,
            };
            route.rails.push(RailEvent {
                position,
                rail: rail_index(node)?,
                kind,
                x: number(node, "X", 0.0)?,
                y: number(node, "Y", 0.0)?,
            });
        }
        _ => {}
    }
    Ok(())
}

fn rail_index(node: &xml::Node) -> Result<usize, LineError> {
    match value(node, "Rail") {
        None | Some("") => Ok(0),
        Some(v) => parse_index(node.tag_name().name(), v),
    }
}

fn parse_station(node: &xml::Node, session: &mut ParseSession<'_>) -> Result<(), LineError> {
    if !has_name(node, "station") {
        return Ok(());
    }
    let mut station = Station::new(
        required(node, "Distance")?,
        text(node, "Name"),
        session.config.default_stop_duration,
    );
    station.arrival = parse_time(&text(node, "Arrival"), TimeNotation::Colon);
    station.departure = parse_time(&text(node, "Departure"), TimeNotation::Colon);
    station.stop_duration = number(node, "Stop", station.stop_duration)?;
    station.pass_alarm = parse_flag(&text(node, "PassAlarm"));
    station.forced_red_signal = parse_flag(&text(node, "ForcedRedSignal"));
    station.doors = DoorSide::from_name(&text(node, "Doors")).unwrap_or_default();
    station.system = number(node, "System", 0.0)? as i32;
    session.model.stations.push(station);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::diagnostics::ParseReport;
    use crate::model::route::{RouteModel, UNSET_TIME};
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse_doc(text: &str) -> Result<ParseReport<RouteModel>, ParseError> {
        let mut file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        StructuredDocumentParser.parse_with(file.path(), &ParserConfig::default())
    }

    #[test]
    fn test_single_curve() {
        let report = parse_doc(
            r#"<?xml version="1.0"?>
<Route><Tracks><Curve Distance="100" Radius="600"/></Tracks></Route>"#,
        )
        .unwrap();
        let g = &report.output.geometries;
        assert_eq!(g.len(), 1);
        assert_eq!((g[0].position, g[0].radius, g[0].gradient), (100.0, 600.0, 0.0));
    }

    #[test]
    fn test_full_document() {
        let report = parse_doc(
            r#"<?xml version="1.0" encoding="utf-8"?>
<route>
  <info gauge="1067"><Comment>Sample line</Comment></info>
  <Structures>
    <Structure Key="Tree" Path="objects/tree.x"/>
  </Structures>
  <Background Image="sky.png" Mode="KeepAspect"/>
  <Tracks>
    <Gradient Distance="50" Value="-3.5"/>
    <FreeObj Distance="150" Structure="tree" Rail="1" X="-4" Yaw="90"/>
    <Ground Distance="0" Structure="grass"/>
    <Limit Distance="0" Speed="80"/>
  </Tracks>
  <Stations>
    <Station Distance="500" Name="Central" Arrival="10:30:00" Doors="Both" Stop="25"/>
  </Stations>
</route>"#,
        )
        .unwrap();
        let route = report.output;
        assert_eq!(route.comment, "Sample line");
        assert_eq!(route.gauge, 1.067);
        assert_eq!(route.structure("tree").unwrap().path, "objects/tree.x");
        assert_eq!(
            route.background,
            Some(Background {
                image: "sky.png".into(),
                mode: BackgroundMode::KeepAspect
            })
        );
        assert_eq!(route.geometries[0].gradient, -3.5);
        assert_eq!(route.objects[0].rail, 1);
        assert_eq!(route.objects[0].yaw, 90.0);
        assert_eq!(route.grounds.len(), 1);
        assert_eq!(route.speed_limits[0].limit, 80.0);

        let sta = &route.stations[0];
        assert_eq!(sta.arrival, 37800.0);
        assert_eq!(sta.departure, UNSET_TIME);
        assert_eq!(sta.doors, DoorSide::Both);
        assert_eq!(sta.stop_duration, 25.0);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn test_bad_element_is_skipped_with_line() {
        let report = parse_doc(
            "<Route>\n<Tracks>\n<Curve Radius=\"600\"/>\n<Curve Distance=\"10\" Radius=\"300\"/>\n</Tracks>\n</Route>",
        )
        .unwrap();
        assert_eq!(report.output.geometries.len(), 1);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(
            report.diagnostics[0].location.as_ref().map(|l| l.line),
            Some(3)
        );
    }

    #[test]
    fn test_wrong_root_is_fatal() {
        let err = parse_doc("<Train><Car/></Train>").unwrap_err();
        assert!(matches!(err, ParseError::MissingRoot { .. }));
    }

    #[test]
    fn test_malformed_document_is_fatal() {
        let err = parse_doc("<Route><Tracks></Route>").unwrap_err();
        assert!(matches!(err, ParseError::Xml { .. }));
    }

    #[test]
    fn test_missing_file() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().with_extension("missing.xml");
        let err = StructuredDocumentParser.parse(&path).unwrap_err();
        assert!(matches!(err, ParseError::FileNotFound { .. }));
    }
}
