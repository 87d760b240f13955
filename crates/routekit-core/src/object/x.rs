//! Block-Scene dialect: text DirectX `.x` files.
//!
//! ```text
//! xof 0302txt 0032
//! template Vector { <uuid> FLOAT x; FLOAT y; FLOAT z; }
//! Mesh {
//!   3; 0;0;0;, 1;0;0;, 0;1;0;;      vertex count, triples
//!   1; 3;0,1,2;;                    face count, (n; indices) groups
//!   MeshNormals { ... }             optional
//!   MeshTextureCoords { ... }       optional
//!   MeshMaterialList { ... Material { ... } }
//! }
//! ```
//!
//! Only the numbers a block holds directly are read, in order; separators
//! are not significant. The format is left-handed: X is negated and face
//! winding reversed on the way in.

use std::path::Path;

use cgmath::{Vector2, Vector3};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{ObjectParser, ObjectSession};
use crate::detect::{scene_header, ObjectFormat, SceneHeader};
use crate::diagnostics::{Diagnostic, DiagnosticCode, SourceLocation};
use crate::encoding;
use crate::error::ParseError;
use crate::model::object::{Face, Material};
use crate::syntax::strip_comment;
use crate::tokenizer::{parse_number, unquote};

static TEMPLATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\btemplate\b[^{]*\{").expect("valid template regex"));

static MESH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bMesh\b[\w\s-]*\{").expect("valid mesh regex"));

static MATERIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bMaterial\b[\w\s-]*\{").expect("valid material regex"));

static FRAME_TRANSFORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bFrameTransformMatrix\b").expect("valid frame transform regex")
});

#[derive(Debug, Default, Clone, Copy)]
pub struct BlockSceneParser;

impl ObjectParser for BlockSceneParser {
    fn format(&self) -> ObjectFormat {
        ObjectFormat::BlockScene
    }

    fn parse_into(&self, path: &Path, session: &mut ObjectSession<'_>) -> Result<(), ParseError> {
        let bytes = encoding::read_bytes(path)?;
        match scene_header(&bytes) {
            SceneHeader::Text => {}
            SceneHeader::Binary | SceneHeader::Compressed => {
                return Err(ParseError::unsupported(
                    path,
                    "binary and compressed DirectX files are not supported",
                ))
            }
            SceneHeader::Missing => {
                return Err(ParseError::unsupported(path, "missing 'xof' header"))
            }
        }

        let decoded = encoding::decode(&bytes, session.config.legacy_encoding());
        let body = decoded
            .text
            .split_once('\n')
            .map_or("", |(_, rest)| rest)
            .lines()
            .map(|l| strip_comment(l, &["//", "#"]))
            .collect::<Vec<_>>()
            .join("\n");
        let text = strip_templates(&body);

        if FRAME_TRANSFORM.is_match(&text) {
            session.hint(
                Diagnostic::hint(
                    DiagnosticCode::TransformIgnored,
                    "frame transforms are accepted but not applied",
                )
                .with_location(SourceLocation::file(path)),
            );
        }

        let mut scene = SceneAttributes::default();
        let mut found = false;
        let mut search_from = 0;
        while let Some(m) = MESH.find_at(&text, search_from) {
            found = true;
            let open = m.end() - 1;
            let (block, end) = match matching_brace(&text, open) {
                Some(end) => (&text[open + 1..end - 1], end),
                None => {
                    truncated(session, path, "unterminated Mesh block");
                    (&text[open + 1..], text.len())
                }
            };
            read_mesh(block, path, session, &mut scene);
            search_from = end;
        }
        if !found {
            truncated(session, path, "no Mesh block");
        }
        scene.apply(&mut session.model);

        if let Some(m) = MATERIAL.find(&text) {
            let open = m.end() - 1;
            let end = matching_brace(&text, open).unwrap_or(text.len() + 1);
            let block = text.get(open + 1..end - 1).unwrap_or_default();
            session.model.material = read_material(block);
        }
        Ok(())
    }
}

fn truncated(session: &mut ObjectSession<'_>, path: &Path, message: &str) {
    session.warning(
        Diagnostic::warning(DiagnosticCode::TruncatedGeometry, message)
            .with_location(SourceLocation::file(path)),
    );
}

/// Index one past the `}` matching the `{` at `open`.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in text.bytes().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_templates(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(m) = TEMPLATE.find(rest) {
        out.push_str(&rest[..m.start()]);
        match matching_brace(rest, m.end() - 1) {
            Some(end) => rest = &rest[end..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Split a block body into the text it holds directly and its child blocks.
///
/// Children are returned as `(lowercased name, body)`. The name is the
/// identifier between the previous `;`/`,` and the child's `{`.
fn split_block(body: &str) -> (String, Vec<(String, &str)>) {
    let mut own = String::with_capacity(body.len());
    let mut children = Vec::new();
    let mut skip_to = 0;
    for (i, c) in body.char_indices() {
        if i < skip_to {
            continue;
        }
        match c {
            '{' => {
                let header_start = own.rfind([';', ',']).map_or(0, |p| p + 1);
                let name = own[header_start..]
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                own.truncate(header_start);
                let end = matching_brace(body, i).unwrap_or(body.len() + 1);
                children.push((name, body.get(i + 1..end - 1).unwrap_or_default()));
                skip_to = end;
            }
            '}' => {}
            _ => own.push(c),
        }
    }
    (own, children)
}

/// Positional reader over the numbers of one block.
struct NumberStream {
    values: Vec<f64>,
    pos: usize,
    truncated: bool,
}

impl NumberStream {
    fn new(text: &str) -> Self {
        Self {
            values: text
                .split(|c: char| c == ';' || c == ',' || c.is_whitespace())
                .filter_map(parse_number)
                .collect(),
            pos: 0,
            truncated: false,
        }
    }

    fn next(&mut self) -> Option<f64> {
        let value = self.values.get(self.pos).copied();
        match value {
            Some(_) => self.pos += 1,
            None => self.truncated = true,
        }
        value
    }

    fn remaining(&self) -> usize {
        self.values.len().saturating_sub(self.pos)
    }

    fn count(&mut self) -> Option<usize> {
        let value = self.next()?;
        if value >= 0.0 && value.fract() == 0.0 {
            Some(value as usize)
        } else {
            self.truncated = true;
            None
        }
    }

    fn vectors(&mut self) -> Vec<Vector3<f32>> {
        let Some(count) = self.count() else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(count.min(self.remaining() / 3));
        for _ in 0..count {
            match (self.next(), self.next(), self.next()) {
                (Some(x), Some(y), Some(z)) => out.push(Vector3::new(x as f32, y as f32, z as f32)),
                _ => break,
            }
        }
        out
    }

    fn pairs(&mut self) -> Vec<Vector2<f32>> {
        let Some(count) = self.count() else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(count.min(self.remaining() / 2));
        for _ in 0..count {
            match (self.next(), self.next()) {
                (Some(u), Some(v)) => out.push(Vector2::new(u as f32, v as f32)),
                _ => break,
            }
        }
        out
    }

    fn faces(&mut self) -> Vec<Vec<usize>> {
        let Some(count) = self.count() else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(count.min(self.remaining()));
        'faces: for _ in 0..count {
            let Some(n) = self.count() else {
                break;
            };
            let mut face = Vec::with_capacity(n.min(self.remaining()));
            for _ in 0..n {
                match self.count() {
                    Some(index) => face.push(index),
                    None => break 'faces,
                }
            }
            out.push(face);
        }
        out
    }
}

/// Attributes collected over every Mesh block of a file.
///
/// Normals and texture coordinates are kept only if every block has them.
#[derive(Debug)]
struct SceneAttributes {
    vertices: Vec<Vector3<f32>>,
    faces: Vec<Face>,
    normals: Option<Vec<Vector3<f32>>>,
    uvs: Option<Vec<Vector2<f32>>>,
}

impl Default for SceneAttributes {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: Some(Vec::new()),
            uvs: Some(Vec::new()),
        }
    }
}

impl SceneAttributes {
    fn apply(self, model: &mut crate::model::object::ObjectModel) {
        model.vertices = self.vertices;
        model.faces = self.faces;
        model.normals = self.normals.unwrap_or_default();
        model.uvs = self.uvs.unwrap_or_default();
    }
}

fn read_mesh(
    block: &str,
    path: &Path,
    session: &mut ObjectSession<'_>,
    scene: &mut SceneAttributes,
) {
    let (own, children) = split_block(block);
    let mut stream = NumberStream::new(&own);
    let vertices = stream.vectors();
    let faces = stream.faces();
    if stream.truncated {
        truncated(
            session,
            path,
            &format!(
                "Mesh block ends early: kept {} vertices and {} faces",
                vertices.len(),
                faces.len()
            ),
        );
    }

    let mut normals = None;
    let mut uvs = None;
    for (name, body) in children {
        match name.as_str() {
            "meshnormals" => {
                let mut stream = NumberStream::new(&split_block(body).0);
                let values = stream.vectors();
                let normal_faces = stream.faces();
                normals = vertex_normals(&values, &normal_faces, &faces, vertices.len());
            }
            "meshtexturecoords" => {
                let coords = NumberStream::new(&split_block(body).0).pairs();
                uvs = (coords.len() == vertices.len()).then_some(coords);
            }
            _ => {}
        }
    }

    let base = scene.vertices.len();
    scene.normals = match (scene.normals.take(), normals) {
        (Some(mut all), Some(block)) => {
            all.extend(block.into_iter().map(|n| Vector3::new(-n.x, n.y, n.z)));
            Some(all)
        }
        _ => None,
    };
    scene.uvs = match (scene.uvs.take(), uvs) {
        (Some(mut all), Some(block)) => {
            all.extend(block);
            Some(all)
        }
        _ => None,
    };
    scene
        .vertices
        .extend(vertices.into_iter().map(|v| Vector3::new(-v.x, v.y, v.z)));
    scene.faces.extend(faces.into_iter().map(|face| {
        Face::new(face.into_iter().rev().map(|i| base + i).collect())
    }));
}

/// Per-vertex normals of one Mesh block.
///
/// A list as long as the vertex list is taken as is; otherwise each face's
/// normal indices are matched to its vertex indices. `None` if any vertex
/// is left without a normal.
fn vertex_normals(
    normals: &[Vector3<f32>],
    normal_faces: &[Vec<usize>],
    faces: &[Vec<usize>],
    vertex_count: usize,
) -> Option<Vec<Vector3<f32>>> {
    if normals.len() == vertex_count {
        return Some(normals.to_vec());
    }
    let mut out = vec![None; vertex_count];
    for (face, normal_face) in faces.iter().zip(normal_faces) {
        for (&v, &n) in face.iter().zip(normal_face) {
            if let (Some(slot), Some(&normal)) = (out.get_mut(v), normals.get(n)) {
                *slot = Some(normal);
            }
        }
    }
    out.into_iter().collect()
}

fn unit_channel(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Diffuse RGBA, specular exponent, specular RGB and emissive RGB, each
/// group optional, plus the file named in `TextureFilename`.
fn read_material(block: &str) -> Material {
    let (own, children) = split_block(block);
    let values = NumberStream::new(&own).values;
    let rgb = |range: std::ops::Range<usize>| match values.get(range) {
        Some(&[r, g, b]) => Some([unit_channel(r), unit_channel(g), unit_channel(b)]),
        _ => None,
    };

    let mut material = Material::default();
    if let Some(&[r, g, b, a]) = values.get(0..4) {
        material.color = [unit_channel(r), unit_channel(g), unit_channel(b), unit_channel(a)];
    }
    if let Some(&power) = values.get(4) {
        material.specular_power = power as f32;
    }
    material.specular = rgb(5..8);
    material.emissive = rgb(8..11);
    material.texture = children
        .iter()
        .find(|(name, _)| name == "texturefilename")
        .map(|(_, body)| unquote(body.trim().trim_end_matches(';')).to_string())
        .filter(|t| !t.is_empty());
    material
}
