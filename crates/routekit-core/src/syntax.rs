//! Call-expression syntax shared by the parenthesised dialects.
//!
//! ```text
//! statement  := position | call
//! position   := number (';' | ',')?
//! call       := '.'? segment ('.' segment)* trailing
//! segment    := identifier ('[' key ']')? ('(' balanced ')')?
//! ```
//!
//! Examples: `Track.Curve(600; 0)`, `Structure.FreeObj(3).Load(tree.x)`,
//! `Structure['tree'].Put(0, 3, 0, 0)`, `.Pitch 5` inside a `With Track` block.
//! Statement boundaries are found first with [`split_top_level`], so commas
//! and semicolons inside parentheses, brackets or quotes never split a call.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while},
    character::complete::{alpha1, char, space0},
    combinator::{map_res, opt, recognize},
    error::{Error as NomError, ErrorKind},
    multi::separated_list1,
    number::complete::recognize_float,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::tokenizer::{normalize_command, split_arguments, unquote};

/// One `name[key](args)` link of a call chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub key: Option<String>,
    pub args: Option<String>,
}

/// A parsed call such as `Structure.FreeObj(3).Load(tree.x)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallExpr {
    /// Leading `.`: the call continues the namespace opened by `With`.
    pub shorthand: bool,
    pub segments: Vec<Segment>,
    /// Unparenthesised arguments following the call, e.g. `600;0` in `.Curve 600;0`.
    pub trailing: String,
}

impl CallExpr {
    /// Normalized dispatch key: segment names joined by `_`, lowercased.
    pub fn command_key(&self) -> String {
        let names: Vec<&str> = self.segments.iter().map(|s| s.name.as_str()).collect();
        normalize_command(&names.join("."))
    }

    /// Dispatch key with `namespace` prepended to shorthand calls.
    pub fn command_key_in(&self, namespace: Option<&str>) -> String {
        match (self.shorthand, namespace) {
            (true, Some(ns)) => normalize_command(&format!("{}.{}", ns, self.command_key())),
            _ => self.command_key(),
        }
    }

    /// First bracketed key in the chain, unquoted and lowercased.
    pub fn key(&self) -> Option<String> {
        self.segments
            .iter()
            .find_map(|s| s.key.as_deref())
            .map(|k| unquote(k).to_lowercase())
    }

    /// Arguments of the last parenthesised segment, or the trailing text.
    pub fn arguments(&self) -> Vec<String> {
        match self.segments.iter().rev().find_map(|s| s.args.as_deref()) {
            Some(args) if self.trailing.is_empty() => split_arguments(args),
            _ => split_arguments(&self.trailing),
        }
    }

    /// Arguments of the first segment when a later segment also carries some.
    ///
    /// For `Structure.FreeObj(3).Load(tree.x)` these are `["3"]`.
    pub fn index_arguments(&self) -> Vec<String> {
        let with_args: Vec<&str> = self
            .segments
            .iter()
            .filter_map(|s| s.args.as_deref())
            .collect();
        if with_args.len() >= 2 || (!with_args.is_empty() && !self.trailing.is_empty()) {
            split_arguments(with_args[0])
        } else {
            Vec::new()
        }
    }

    /// Raw, unsplit text of the arguments.
    pub fn raw_arguments(&self) -> String {
        if !self.trailing.is_empty() {
            return self.trailing.clone();
        }
        self.segments
            .iter()
            .rev()
            .find_map(|s| s.args.clone())
            .unwrap_or_default()
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn bracket_key(input: &str) -> IResult<&str, &str> {
    delimited(char('['), take_until("]"), char(']'))(input)
}

/// Parenthesised text with nested parentheses and quotes balanced.
fn balanced_args(input: &str) -> IResult<&str, &str> {
    let (body, _) = char('(')(input)?;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in body.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '(' => depth += 1,
                ')' if depth == 0 => return Ok((&body[i + 1..], &body[..i])),
                ')' => depth -= 1,
                _ => {}
            },
        }
    }
    Err(nom::Err::Error(NomError::new(input, ErrorKind::Char)))
}

fn segment(input: &str) -> IResult<&str, Segment> {
    let (input, (name, key, args)) = tuple((
        identifier,
        opt(preceded(space0, bracket_key)),
        opt(preceded(space0, balanced_args)),
    ))(input)?;
    Ok((
        input,
        Segment {
            name: name.to_string(),
            key: key.map(|k| k.trim().to_string()),
            args: args.map(|a| a.to_string()),
        },
    ))
}

/// Parse one call expression; trailing text is returned as unparenthesised arguments.
pub fn call_expr(input: &str) -> IResult<&str, CallExpr> {
    let (input, _) = space0(input)?;
    let (input, shorthand) = opt(char('.'))(input)?;
    let (input, segments) =
        separated_list1(delimited(space0, char('.'), space0), segment)(input)?;
    Ok((
        "",
        CallExpr {
            shorthand: shorthand.is_some(),
            segments,
            trailing: input.trim().to_string(),
        },
    ))
}

/// A leading distance: a number followed by `;`, `,` or the end of the input.
pub fn position_prefix(input: &str) -> IResult<&str, f64> {
    let (rest, value) = preceded(
        space0,
        terminated(map_res(recognize_float, str::parse::<f64>), space0),
    )(input)?;
    if rest.is_empty() {
        return Ok((rest, value));
    }
    let (rest, _) = alt((char(';'), char(',')))(rest)?;
    Ok((rest, value))
}

/// Parse a whole statement as a call, rejecting leftover syntax.
pub fn parse_call(input: &str) -> Result<CallExpr, String> {
    match call_expr(input) {
        Ok((_, call)) => {
            if call.trailing.starts_with('(') || call.trailing.starts_with('[') {
                Err(format!("unbalanced brackets in '{}'", input.trim()))
            } else {
                Ok(call)
            }
        }
        Err(_) => Err(format!("expected a command, found '{}'", input.trim())),
    }
}

/// Split a line at top-level occurrences of any of `separators`.
///
/// Separators inside quotes, parentheses or brackets are ignored. Empty
/// pieces are dropped and the rest trimmed.
pub fn split_top_level<'a>(line: &'a str, separators: &[char]) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in line.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '(' | '[' => depth += 1,
                ')' | ']' => depth -= 1,
                c if depth <= 0 && separators.contains(&c) => {
                    out.push(&line[start..i]);
                    start = i + c.len_utf8();
                }
                _ => {}
            },
        }
    }
    out.push(&line[start..]);
    out.into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split a mesh-authoring line into its command name and raw argument text.
///
/// Accepts `Name(args)`, `Name, args` and `Name args`.
pub fn command_line(input: &str) -> Option<(&str, &str)> {
    let (rest, name) = preceded(space0::<&str, NomError<&str>>, identifier)(input).ok()?;
    let rest = rest.trim_start();
    if rest.starts_with('(') {
        return match balanced_args(rest) {
            Ok((_, args)) => Some((name, args)),
            Err(_) => None,
        };
    }
    let rest = rest.strip_prefix(',').unwrap_or(rest);
    Some((name, rest.trim()))
}

/// Remove a `//`, `#` or `;`-style comment depending on the dialect.
pub fn strip_comment<'a>(line: &'a str, markers: &[&str]) -> &'a str {
    let mut quote: Option<char> = None;
    for (i, c) in line.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None => {
                if markers.iter().any(|m| line[i..].starts_with(m)) {
                    return &line[..i];
                }
            }
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_simple_call() {
        let call = parse_call("Track.Curve(600; 0.1)").unwrap();
        assert_eq!(call.command_key(), "track_curve");
        assert_eq!(call.arguments(), vec!["600", "0.1"]);
        assert!(call.index_arguments().is_empty());
    }

    #[test]
    fn test_chained_call() {
        let call = parse_call("Structure.FreeObj(3).Load(objects\\tree.x)").unwrap();
        assert_eq!(call.command_key(), "structure_freeobj_load");
        assert_eq!(call.index_arguments(), vec!["3"]);
        assert_eq!(call.arguments(), vec!["objects\\tree.x"]);
    }

    #[test]
    fn test_bracket_key() {
        let call = parse_call("Structure['Tree01'].Put(0, 3.5, 0, 0)").unwrap();
        assert_eq!(call.command_key(), "structure_put");
        assert_eq!(call.key().as_deref(), Some("tree01"));
        assert_eq!(call.arguments(), vec!["0", "3.5", "0", "0"]);
    }

    #[test]
    fn test_shorthand_with_trailing_arguments() {
        let call = parse_call(".Curve 600;0").unwrap();
        assert!(call.shorthand);
        assert_eq!(call.command_key_in(Some("Track")), "track_curve");
        assert_eq!(call.arguments(), vec!["600", "0"]);
    }

    #[test]
    fn test_structure_with_trailing_path() {
        let call = parse_call("Structure.Ground(1) grass.csv").unwrap();
        assert_eq!(call.index_arguments(), vec!["1"]);
        assert_eq!(call.arguments(), vec!["grass.csv"]);
    }

    #[test]
    fn test_nested_parentheses() {
        let call = parse_call("Route.Comment(A (very) nice route)").unwrap();
        assert_eq!(call.raw_arguments(), "A (very) nice route");
    }

    #[test]
    fn test_unbalanced_is_rejected() {
        assert!(parse_call("Track.Curve(600").is_err());
        assert!(parse_call("(600)").is_err());
    }

    #[test]
    fn test_position_prefix() {
        assert_eq!(position_prefix("100; Curve(5)").unwrap(), (" Curve(5)", 100.0));
        assert_eq!(position_prefix("25.5,").unwrap(), ("", 25.5));
        assert_eq!(position_prefix("  75 ").unwrap(), ("", 75.0));
        assert!(position_prefix("Info.Comment(x)").is_err());
        assert!(position_prefix("100abc").is_err());
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(
            split_top_level("100, Track.Curve(600, 0), Track.Pitch(2)", &[',']),
            vec!["100", "Track.Curve(600, 0)", "Track.Pitch(2)"]
        );
        assert_eq!(
            split_top_level("100; Structure['a;b'].Put(0);", &[';']),
            vec!["100", "Structure['a;b'].Put(0)"]
        );
    }

    #[test]
    fn test_command_line_forms() {
        assert_eq!(command_line("AddVertex, 1, 2, 3"), Some(("AddVertex", "1, 2, 3")));
        assert_eq!(command_line("vertex(1,2,3)"), Some(("vertex", "1,2,3")));
        assert_eq!(command_line("CreateMeshBuilder"), Some(("CreateMeshBuilder", "")));
        assert_eq!(command_line("face(0,1"), None);
        assert_eq!(command_line(", 1"), None);
    }

    #[test]
    fn test_strip_comment() {
        assert_eq!(strip_comment("Curve(5); // tight", &["//", "#"]), "Curve(5); ");
        assert_eq!(strip_comment("Load('a#b')", &["#"]), "Load('a#b')");
    }
}
