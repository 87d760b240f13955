//! Route model.
//!
//! The single aggregate every route dialect converges on. Fields default to
//! neutral values so partially specified input never leaves anything absent:
//! empty strings, zero, or [`UNSET_TIME`] for clock times.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sentinel for a station time that was not given.
pub const UNSET_TIME: f64 = -1.0;

/// Track gauge in meters when a route does not set one.
pub const DEFAULT_GAUGE: f64 = 1.435;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteModel {
    pub comment: String,
    pub image: String,
    /// Rail separation in meters.
    pub gauge: f64,
    pub initial_elevation: f64,
    /// Keyed structure definitions; a later definition replaces an earlier one.
    pub structures: BTreeMap<String, Structure>,
    /// Curve and gradient records in source order, not sorted by position.
    pub geometries: Vec<TrackGeometry>,
    pub stations: Vec<Station>,
    pub objects: Vec<PlacedObject>,
    pub background: Option<Background>,
    pub speed_limits: Vec<SpeedLimit>,
    pub rails: Vec<RailEvent>,
    pub grounds: Vec<GroundChange>,
    pub repeaters: Vec<Repeater>,
    pub signals: BTreeMap<String, String>,
    pub sounds: BTreeMap<String, String>,
    /// Set when the source used host-specific extension commands.
    pub host_extensions: bool,
}

impl Default for RouteModel {
    fn default() -> Self {
        Self::with_gauge(DEFAULT_GAUGE)
    }
}

impl RouteModel {
    pub fn with_gauge(gauge: f64) -> Self {
        Self {
            comment: String::new(),
            image: String::new(),
            gauge,
            initial_elevation: 0.0,
            structures: BTreeMap::new(),
            geometries: Vec::new(),
            stations: Vec::new(),
            objects: Vec::new(),
            background: None,
            speed_limits: Vec::new(),
            rails: Vec::new(),
            grounds: Vec::new(),
            repeaters: Vec::new(),
            signals: BTreeMap::new(),
            sounds: BTreeMap::new(),
            host_extensions: false,
        }
    }

    /// Register a structure; an existing key is replaced.
    pub fn define_structure(&mut self, key: impl Into<String>, path: impl Into<String>) {
        let key = key.into();
        let structure = Structure {
            key: key.clone(),
            path: path.into(),
        };
        self.structures.insert(key, structure);
    }

    pub fn structure(&self, key: &str) -> Option<&Structure> {
        self.structures.get(key)
    }

    pub fn add_curve(&mut self, position: f64, radius: f64) {
        self.geometries.push(TrackGeometry {
            position,
            radius,
            gradient: 0.0,
        });
    }

    pub fn add_gradient(&mut self, position: f64, gradient: f64) {
        self.geometries.push(TrackGeometry {
            position,
            radius: 0.0,
            gradient,
        });
    }

    /// Geometry records ordered by position, for consumers that need a monotonic profile.
    pub fn sorted_geometries(&self) -> Vec<TrackGeometry> {
        let mut sorted = self.geometries.clone();
        sorted.sort_by(|a, b| a.position.total_cmp(&b.position));
        sorted
    }

    /// Placed objects whose structure key has no definition.
    pub fn unresolved_objects(&self) -> impl Iterator<Item = &PlacedObject> {
        self.objects
            .iter()
            .filter(|o| !self.structures.contains_key(&o.structure))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    pub key: String,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackGeometry {
    /// Meters along the route.
    pub position: f64,
    /// Meters; 0 is straight, the sign gives the direction.
    pub radius: f64,
    /// Permille; 0 is level.
    pub gradient: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DoorSide {
    #[default]
    None,
    Left,
    Right,
    Both,
}

impl DoorSide {
    /// Signed legacy encoding: negative left, positive right, zero none.
    pub fn from_code(code: f64) -> Self {
        if code < 0.0 {
            DoorSide::Left
        } else if code > 0.0 {
            DoorSide::Right
        } else {
            DoorSide::None
        }
    }

    /// Letter or word form: `L`, `R`, `B`, `N`, `Left`, `Both`, ...
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "l" | "left" => Some(DoorSide::Left),
            "r" | "right" => Some(DoorSide::Right),
            "b" | "both" => Some(DoorSide::Both),
            "n" | "none" | "" => Some(DoorSide::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub position: f64,
    pub name: String,
    /// Seconds since midnight or [`UNSET_TIME`].
    pub arrival: f64,
    /// Seconds since midnight or [`UNSET_TIME`].
    pub departure: f64,
    /// Seconds.
    pub stop_duration: f64,
    pub pass_alarm: bool,
    pub doors: DoorSide,
    pub forced_red_signal: bool,
    /// Safety system code (0 = legacy ATS, 1 = ATC).
    pub system: i32,
}

impl Station {
    pub fn new(position: f64, name: impl Into<String>, stop_duration: f64) -> Self {
        Self {
            position,
            name: name.into(),
            arrival: UNSET_TIME,
            departure: UNSET_TIME,
            stop_duration,
            pass_alarm: false,
            doors: DoorSide::None,
            forced_red_signal: false,
            system: 0,
        }
    }

    pub fn has_arrival(&self) -> bool {
        self.arrival >= 0.0
    }

    pub fn has_departure(&self) -> bool {
        self.departure >= 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedObject {
    pub position: f64,
    /// Key into [`RouteModel::structures`]; may be unresolved.
    pub structure: String,
    /// 0 is the main track.
    pub rail: usize,
    /// Lateral offset in meters.
    pub x: f64,
    /// Vertical offset in meters.
    pub y: f64,
    /// Degrees.
    pub yaw: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackgroundMode {
    #[default]
    Fixed,
    KeepAspect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Background {
    pub image: String,
    pub mode: BackgroundMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedLimit {
    pub position: f64,
    /// km/h; 0 lifts the restriction.
    pub limit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RailEventKind {
    Start,
    Move,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RailEvent {
    pub position: f64,
    pub rail: usize,
    pub kind: RailEventKind,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundChange {
    pub position: f64,
    pub structure: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeaterKind {
    Begin,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repeater {
    pub position: f64,
    pub key: String,
    pub kind: RepeaterKind,
    pub rail: usize,
    /// Structure keys cycled through; empty for [`RepeaterKind::End`].
    pub structures: Vec<String>,
    /// Meters between placements; 0 for [`RepeaterKind::End`].
    pub interval: f64,
}

impl Repeater {
    pub fn end(position: f64, key: impl Into<String>) -> Self {
        Self {
            position,
            key: key.into(),
            kind: RepeaterKind::End,
            rail: 0,
            structures: Vec::new(),
            interval: 0.0,
        }
    }
}
