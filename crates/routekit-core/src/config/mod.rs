//! Parser configuration.
//!
//! Every field has a default so a missing or partial `routekit.yaml` still
//! yields a usable configuration.

pub mod loader;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Lines read by the route format detector.
    pub route_probe_lines: usize,
    /// Lines read when disambiguating a `.csv` object from a route.
    pub object_probe_lines: usize,
    /// WHATWG label of the encoding assumed for files without a byte-order mark.
    pub legacy_encoding: String,
    /// Track gauge in meters when a route does not set one.
    pub default_gauge: f64,
    /// Stop duration in seconds for stations that do not set one.
    pub default_stop_duration: f64,
    /// Nesting limit for `Map.Load` / `Include`.
    pub max_include_depth: usize,
    /// Emit a debug event for every unrecognized command.
    pub log_unknown_commands: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            route_probe_lines: 50,
            object_probe_lines: 10,
            legacy_encoding: "shift_jis".to_string(),
            default_gauge: 1.435,
            default_stop_duration: 15.0,
            max_include_depth: 16,
            log_unknown_commands: false,
        }
    }
}

impl ParserConfig {
    /// Encoding for unmarked files, or UTF-8 if the label is unknown.
    pub fn legacy_encoding(&self) -> &'static encoding_rs::Encoding {
        encoding_rs::Encoding::for_label(self.legacy_encoding.as_bytes())
            .unwrap_or(encoding_rs::UTF_8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ParserConfig::default();
        assert_eq!(config.route_probe_lines, 50);
        assert_eq!(config.object_probe_lines, 10);
        assert_eq!(config.default_gauge, 1.435);
        assert_eq!(config.legacy_encoding(), encoding_rs::SHIFT_JIS);
    }

    #[test]
    fn test_unknown_label_falls_back_to_utf8() {
        let config = ParserConfig {
            legacy_encoding: "no-such-encoding".into(),
            ..ParserConfig::default()
        };
        assert_eq!(config.legacy_encoding(), encoding_rs::UTF_8);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: ParserConfig = serde_yaml::from_str("max_include_depth: 4\n").unwrap();
        assert_eq!(config.max_include_depth, 4);
        assert_eq!(config.route_probe_lines, 50);
    }
}
