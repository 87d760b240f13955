//! Explicit-Mesh dialect.
//!
//! ```text
//! CreateMeshBuilder
//! AddVertex, 0, 0, 0
//! AddVertex, 1, 0, 0, 0, 1, 0
//! AddVertex, 1, 1, 0
//! AddFace2, 0, 1, 2
//! SetColor, 200, 200, 200
//! LoadTexture, wall.png
//! SetTextureCoordinates, 0, 0, 1
//! ```
//!
//! Both the long names above and the short `Vertex(...)`, `Face(...)`,
//! `Color(...)` forms are accepted. `;` starts a comment. Face indices are
//! relative to the current mesh builder; all builders are merged into one
//! model with a single material.

use std::collections::HashMap;
use std::path::Path;

use cgmath::{InnerSpace, Vector2, Vector3};
use once_cell::sync::Lazy;

use super::{ObjectParser, ObjectSession};
use crate::detect::ObjectFormat;
use crate::diagnostics::{Diagnostic, DiagnosticCode, SourceLocation};
use crate::encoding;
use crate::error::{LineError, ParseError};
use crate::model::object::{ColorRgb, Face};
use crate::syntax::{command_line, strip_comment};
use crate::tokenizer::{
    normalize_command, number_arg, parse_index, parse_number, required_number, split_arguments,
    text_arg,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MeshCommand {
    CreateMeshBuilder,
    Vertex,
    Face,
    Face2,
    Color,
    EmissiveColor,
    TransparentColor,
    Texture,
    TextureCoordinates,
    Transform,
}

static COMMANDS: Lazy<HashMap<&'static str, MeshCommand>> = Lazy::new(|| {
    HashMap::from([
        ("createmeshbuilder", MeshCommand::CreateMeshBuilder),
        ("meshbuilder", MeshCommand::CreateMeshBuilder),
        ("addvertex", MeshCommand::Vertex),
        ("vertex", MeshCommand::Vertex),
        ("addface", MeshCommand::Face),
        ("face", MeshCommand::Face),
        ("addface2", MeshCommand::Face2),
        ("face2", MeshCommand::Face2),
        ("setcolor", MeshCommand::Color),
        ("color", MeshCommand::Color),
        ("setemissivecolor", MeshCommand::EmissiveColor),
        ("emissivecolor", MeshCommand::EmissiveColor),
        ("setdecaltransparentcolor", MeshCommand::TransparentColor),
        ("transparent", MeshCommand::TransparentColor),
        ("loadtexture", MeshCommand::Texture),
        ("texture", MeshCommand::Texture),
        ("settexturecoordinates", MeshCommand::TextureCoordinates),
        ("coordinates", MeshCommand::TextureCoordinates),
        ("translate", MeshCommand::Transform),
        ("translateall", MeshCommand::Transform),
        ("rotate", MeshCommand::Transform),
        ("rotateall", MeshCommand::Transform),
        ("scale", MeshCommand::Transform),
        ("scaleall", MeshCommand::Transform),
        ("shear", MeshCommand::Transform),
        ("shearall", MeshCommand::Transform),
        ("mirror", MeshCommand::Transform),
        ("mirrorall", MeshCommand::Transform),
    ])
});

/// Per-file scan state.
#[derive(Debug, Default)]
struct MeshState {
    /// First vertex of the current mesh builder.
    base: usize,
    normals: Vec<Option<Vector3<f32>>>,
    uvs: Vec<Option<Vector2<f32>>>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ExplicitMeshParser;

impl ObjectParser for ExplicitMeshParser {
    fn format(&self) -> ObjectFormat {
        ObjectFormat::ExplicitMesh
    }

    fn parse_into(&self, path: &Path, session: &mut ObjectSession<'_>) -> Result<(), ParseError> {
        let decoded = encoding::read_text(path, session.config)?;
        let mut state = MeshState::default();

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

        // normals are all-or-nothing; partial UVs default to the origin
        if state.normals.iter().all(Option::is_some) {
            session.model.normals = state.normals.into_iter().flatten().collect();
        }
        if state.uvs.iter().any(Option::is_some) {
            session.model.uvs = state
                .uvs
                .into_iter()
                .map(|uv| uv.unwrap_or(Vector2::new(0.0, 0.0)))
                .collect();
        }
        Ok(())
    }
}

fn apply_line(
    line: &str,
    line_no: usize,
    path: &Path,
    state: &mut MeshState,
    session: &mut ObjectSession<'_>,
) -> Result<(), LineError> {
    let (name, raw_args) =
        command_line(line).ok_or_else(|| LineError::Syntax(format!("cannot read '{}'", line)))?;
    let key = normalize_command(name);
    let Some(command) = COMMANDS.get(key.as_str()).copied() else {
        session.unknown_command(path, line_no, name);
        return Ok(());
    };
    let args = split_arguments(raw_args);
    let model = &mut session.model;

    match command {
        MeshCommand::CreateMeshBuilder => state.base = model.vertices.len(),
        MeshCommand::Vertex => {
            let position = Vector3::new(
                number_arg(&key, &args, 0, 0.0)? as f32,
                number_arg(&key, &args, 1, 0.0)? as f32,
                number_arg(&key, &args, 2, 0.0)? as f32,
            );
            let normal = Vector3::new(
                number_arg(&key, &args, 3, 0.0)? as f32,
                number_arg(&key, &args, 4, 0.0)? as f32,
                number_arg(&key, &args, 5, 0.0)? as f32,
            );
            model.vertices.push(position);
            state
                .normals
                .push((normal.magnitude2() > 0.0).then(|| normal.normalize()));
            state.uvs.push(None);
        }
        MeshCommand::Face | MeshCommand::Face2 => {
            let count = model.vertices.len();
            let indices = args
                .iter()
                .filter(|a| !a.is_empty())
                .map(|a| {
                    let index = state.base + parse_index(&key, a)?;
                    if index < count {
                        Ok(index)
                    } else {
                        Err(LineError::VertexOutOfRange {
                            command: key.clone(),
                            index,
                            count,
                        })
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;
            if indices.len() < 3 {
                return Err(LineError::MissingArgument {
                    command: key,
                    index: indices.len(),
                });
            }
            model.faces.push(Face {
                indices,
                two_sided: command == MeshCommand::Face2,
            });
        }
        MeshCommand::Color => {
            let [r, g, b] = rgb(&key, &args)?;
            let a = match args.get(3).map(|a| a.trim()) {
                None | Some("") => 255,
                Some(value) => channel(&key, value)?,
            };
            model.material.color = [r, g, b, a];
        }
        MeshCommand::EmissiveColor => model.material.emissive = Some(rgb(&key, &args)?),
        MeshCommand::TransparentColor => model.material.transparent = Some(rgb(&key, &args)?),
        MeshCommand::Texture => {
            // Texture(channel, path) or LoadTexture(daytime[, nighttime]);
            // only the daytime image is kept
            let texture_channel = match args.as_slice() {
                [first, _, ..] => parse_number(first),
                _ => None,
            };
            let texture = match texture_channel {
                Some(c) if c == 0.0 => text_arg(&args, 1),
                Some(_) => String::new(),
                None => text_arg(&args, 0),
            };
            if !texture.is_empty() {
                model.material.texture = Some(texture);
            }
        }
        MeshCommand::TextureCoordinates => {
            let index = state.base + parse_index(&key, &text_arg(&args, 0))?;
            let uv = Vector2::new(
                required_number(&key, &args, 1)? as f32,
                required_number(&key, &args, 2)? as f32,
            );
            let count = state.uvs.len();
            let slot = state.uvs.get_mut(index).ok_or(LineError::VertexOutOfRange {
                command: key.clone(),
                index,
                count,
            })?;
            *slot = Some(uv);
        }
        MeshCommand::Transform => session.hint(
            Diagnostic::hint(
                DiagnosticCode::TransformIgnored,
                format!("'{}' is accepted but not applied", name),
            )
            .with_location(SourceLocation::new(path, line_no)),
        ),
    }
    Ok(())
}

fn channel(command: &str, value: &str) -> Result<u8, LineError> {
    match parse_number(value) {
        Some(v) if (0.0..=255.0).contains(&v) => Ok(v.round() as u8),
        _ => Err(LineError::InvalidColor {
            command: command.to_string(),
            value: value.to_string(),
        }),
    }
}

fn rgb(command: &str, args: &[String]) -> Result<ColorRgb, LineError> {
    let mut out = [0u8; 3];
    for (i, slot) in out.iter_mut().enumerate() {
        let value = args.get(i).map(|a| a.trim()).unwrap_or("");
        if value.is_empty() {
            return Err(LineError::MissingArgument {
                command: command.to_string(),
                index: i,
            });
        }
        *slot = channel(command, value)?;
    }
    Ok(out)
}
