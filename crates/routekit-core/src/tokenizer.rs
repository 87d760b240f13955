//! Argument tokenizer and scalar conversions shared by every dialect.
//!
//! All dialects fold command names through [`normalize_command`] and split
//! argument lists through [`split_arguments`]; keeping both here stops the
//! dialects from drifting apart.

use nom::{
    combinator::{all_consuming, map_res},
    number::complete::recognize_float,
    IResult,
};

use crate::error::LineError;
use crate::model::route::UNSET_TIME;

/// Lowercase a command name and fold `.` and whitespace to `_`.
///
/// `Track.Curve`, `track.curve` and `TRACK . CURVE` all become `track_curve`.
pub fn normalize_command(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c == '.' || c.is_whitespace() {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Split an argument string on `;`, or on `,` when no `;` is present.
///
/// Separators inside single or double quotes are kept. Each argument is
/// trimmed; an empty input yields no arguments.
pub fn split_arguments(args: &str) -> Vec<String> {
    if args.trim().is_empty() {
        return Vec::new();
    }
    let separator = if contains_unquoted(args, ';') { ';' } else { ',' };

    let mut out = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in args.chars() {
        match quote {
            Some(q) if c == q => {
                quote = None;
                current.push(c);
            }
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                current.push(c);
            }
            None if c == separator => out.push(std::mem::take(&mut current).trim().to_string()),
            None => current.push(c),
        }
    }
    out.push(current.trim().to_string());
    out
}

fn contains_unquoted(s: &str, needle: char) -> bool {
    let mut quote: Option<char> = None;
    for c in s.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == needle => return true,
            None => {}
        }
    }
    false
}

/// Strip one level of matching single or double quotes.
pub fn unquote(s: &str) -> &str {
    let s = s.trim();
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

fn float(input: &str) -> IResult<&str, f64> {
    map_res(recognize_float, str::parse::<f64>)(input)
}

/// Strict decimal number: optional sign, digits, fraction and exponent.
///
/// Unlike `str::parse::<f64>` this rejects `inf`, `NaN` and friends, which
/// would otherwise swallow words such as `Info`.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    all_consuming(float)(s).ok().map(|(_, v)| v)
}

/// Argument `index` of `args` as a number, or `default` if it is absent or empty.
pub fn number_arg(command: &str, args: &[String], index: usize, default: f64) -> Result<f64, LineError> {
    match args.get(index).map(|a| a.trim()) {
        None | Some("") => Ok(default),
        Some(value) => parse_number(value).ok_or_else(|| LineError::InvalidNumber {
            command: command.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Argument `index` of `args` as a number; absence is an error.
pub fn required_number(command: &str, args: &[String], index: usize) -> Result<f64, LineError> {
    match args.get(index).map(|a| a.trim()) {
        None | Some("") => Err(LineError::MissingArgument {
            command: command.to_string(),
            index,
        }),
        Some(value) => parse_number(value).ok_or_else(|| LineError::InvalidNumber {
            command: command.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Non-negative integral index such as a rail or structure number.
pub fn parse_index(command: &str, value: &str) -> Result<usize, LineError> {
    let value = value.trim();
    match parse_number(value) {
        Some(v) if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => Ok(v as usize),
        _ => Err(LineError::InvalidIndex {
            command: command.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Argument `index` of `args` as an index, or `default` if absent or empty.
pub fn index_arg(command: &str, args: &[String], index: usize, default: usize) -> Result<usize, LineError> {
    match args.get(index).map(|a| a.trim()) {
        None | Some("") => Ok(default),
        Some(value) => parse_index(command, value),
    }
}

/// Argument `index` of `args`, unquoted, or an empty string.
pub fn text_arg(args: &[String], index: usize) -> String {
    args.get(index).map(|a| unquote(a).to_string()).unwrap_or_default()
}

/// `1`, `true`, `yes` and `on` are true; anything else is false.
pub fn parse_flag(s: &str) -> bool {
    let s = s.trim();
    matches!(s.to_ascii_lowercase().as_str(), "true" | "yes" | "on")
        || parse_number(s).is_some_and(|v| v != 0.0)
}

/// Separator between hours, minutes and seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeNotation {
    /// `HH.MM.SS`, also `HH.MM` and the packed `HH.MMSS`.
    Dotted,
    /// `HH:MM:SS` or `HH:MM`.
    Colon,
}

/// Convert a clock time to seconds since midnight.
///
/// Absent or unparsable values give [`UNSET_TIME`], never zero: `00.00.00`
/// is a legitimate midnight time.
pub fn parse_time(s: &str, notation: TimeNotation) -> f64 {
    parse_time_opt(s, notation).unwrap_or(UNSET_TIME)
}

/// Like [`parse_time`], accepting either notation.
pub fn parse_time_any(s: &str) -> f64 {
    parse_time_opt(s, TimeNotation::Colon)
        .or_else(|| parse_time_opt(s, TimeNotation::Dotted))
        .unwrap_or(UNSET_TIME)
}

fn parse_time_opt(s: &str, notation: TimeNotation) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let separator = match notation {
        TimeNotation::Dotted => '.',
        TimeNotation::Colon => ':',
    };
    let parts: Vec<&str> = s.split(separator).collect();
    let digits = |p: &str| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit());
    if !parts.iter().all(|p| digits(p)) {
        return None;
    }

    let (hours, minutes, seconds): (u32, u32, u32) = match parts.as_slice() {
        [h] => (h.parse::<u32>().ok()?, 0, 0),
        [h, m] if notation == TimeNotation::Dotted && m.len() > 2 => {
            // packed HH.MMSS
            let (mm, ss) = m.split_at(2);
            let ss = format!("{:0<2}", ss);
            (h.parse().ok()?, mm.parse().ok()?, ss.get(..2)?.parse().ok()?)
        }
        [h, m] => (h.parse().ok()?, m.parse().ok()?, 0),
        [h, m, sec] => (h.parse().ok()?, m.parse().ok()?, sec.parse().ok()?),
        _ => return None,
    };
    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    Some(f64::from(hours) * 3600.0 + f64::from(minutes) * 60.0 + f64::from(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_command() {
        assert_eq!(normalize_command("Track.Curve"), "track_curve");
        assert_eq!(normalize_command("  OPTIONS.UnitOfLength "), "options_unitoflength");
        assert_eq!(normalize_command("Map Load"), "map_load");
        assert_eq!(normalize_command("structure . load"), "structure_load");
    }

    #[test]
    fn test_semicolon_wins() {
        assert_eq!(split_arguments("a, b; c"), vec!["a, b", "c"]);
        assert_eq!(split_arguments(" 1 , 2 ,3 "), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_empty_arguments() {
        assert!(split_arguments("").is_empty());
        assert!(split_arguments("   ").is_empty());
        assert_eq!(split_arguments("a;;b"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_quoted_separators_are_kept() {
        assert_eq!(
            split_arguments("'key', \"a, b.x\""),
            vec!["'key'", "\"a, b.x\""]
        );
        assert_eq!(unquote("'key'"), "key");
        assert_eq!(unquote("\"a, b.x\""), "a, b.x");
        assert_eq!(unquote("plain"), "plain");
    }

    #[test]
    fn test_parse_number_is_strict() {
        assert_eq!(parse_number("100"), Some(100.0));
        assert_eq!(parse_number(" -2.5 "), Some(-2.5));
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number(".5"), Some(0.5));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("12abc"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_number_args() {
        let args = vec!["500".to_string(), "".to_string(), "x".to_string()];
        assert_eq!(number_arg("c", &args, 0, 0.0), Ok(500.0));
        assert_eq!(number_arg("c", &args, 1, 7.0), Ok(7.0));
        assert_eq!(number_arg("c", &args, 9, 7.0), Ok(7.0));
        assert!(number_arg("c", &args, 2, 0.0).is_err());
        assert!(matches!(
            required_number("c", &args, 1),
            Err(LineError::MissingArgument { index: 1, .. })
        ));
    }

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("rail", "3"), Ok(3));
        assert!(parse_index("rail", "-1").is_err());
        assert!(parse_index("rail", "1.5").is_err());
    }

    #[test]
    fn test_flags() {
        assert!(parse_flag("1"));
        assert!(parse_flag("True"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_dotted_times() {
        assert_eq!(parse_time("10.30.15", TimeNotation::Dotted), 37815.0);
        assert_eq!(parse_time("10.30", TimeNotation::Dotted), 37800.0);
        assert_eq!(parse_time("10.3015", TimeNotation::Dotted), 37815.0);
        assert_eq!(parse_time("10.301", TimeNotation::Dotted), 37810.0);
        assert_eq!(parse_time("00.00.00", TimeNotation::Dotted), 0.0);
    }

    #[test]
    fn test_colon_times() {
        assert_eq!(parse_time("10:30:15", TimeNotation::Colon), 37815.0);
        assert_eq!(parse_time("25:00", TimeNotation::Colon), 90000.0);
    }

    #[test]
    fn test_times_in_either_notation() {
        assert_eq!(parse_time_any("10:30:00"), 37800.0);
        assert_eq!(parse_time_any("10.31.00"), 37860.0);
        assert_eq!(parse_time_any("10.3015"), 37815.0);
        assert_eq!(parse_time_any("10"), 36000.0);
        assert_eq!(parse_time_any("P"), UNSET_TIME);
        assert_eq!(parse_time_any("10:75"), UNSET_TIME);
    }

    #[test]
    fn test_unset_times() {
        assert_eq!(parse_time("", TimeNotation::Dotted), UNSET_TIME);
        assert_eq!(parse_time("P", TimeNotation::Dotted), UNSET_TIME);
        assert_eq!(parse_time("10:30:15", TimeNotation::Dotted), UNSET_TIME);
        assert_eq!(parse_time("10.75.00", TimeNotation::Dotted), UNSET_TIME);
    }
}
