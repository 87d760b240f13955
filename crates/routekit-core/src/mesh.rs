//! Mesh builder: turns an [`ObjectModel`] into indexed triangles.

use cgmath::{InnerSpace, Vector2, Vector3, Zero};
use serde::Serialize;
use tracing::warn;

use crate::diagnostics::{Diagnostic, DiagnosticCode, ParseReport};
use crate::model::object::{Face, Material, ObjectModel};

/// Normal used where no direction can be derived, e.g. for unused vertices.
const FALLBACK_NORMAL: Vector3<f32> = Vector3 {
    x: 0.0,
    y: 1.0,
    z: 0.0,
};

/// Renderable output of one object parse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mesh {
    pub positions: Vec<Vector3<f32>>,
    /// One per position.
    pub normals: Vec<Vector3<f32>>,
    /// One per position, or empty when the source had no texture coordinates.
    pub uvs: Vec<Vector2<f32>>,
    pub triangles: Vec<[usize; 3]>,
    pub material: Material,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Flattened 32-bit index buffer, or `None` if a vertex index does not
    /// fit in `u32`.
    pub fn indices(&self) -> Option<Vec<u32>> {
        self.triangles
            .iter()
            .flatten()
            .map(|&i| u32::try_from(i).ok())
            .collect()
    }
}

/// Fan-triangulate a polygon: `(0, i, i + 1)` for `i` in `1..n - 1`.
///
/// Faces are assumed convex.
pub fn triangulate(indices: &[usize]) -> Vec<[usize; 3]> {
    if indices.len() < 3 {
        return Vec::new();
    }
    (1..indices.len() - 1)
        .map(|i| [indices[0], indices[i], indices[i + 1]])
        .collect()
}

fn check_face(face: &Face, vertex_count: usize) -> Result<(), Diagnostic> {
    if face.indices.len() < 3 {
        return Err(Diagnostic::warning(
            DiagnosticCode::DegenerateFace,
            format!("face with {} indices skipped", face.indices.len()),
        ));
    }
    if let Some(&bad) = face.indices.iter().find(|&&i| i >= vertex_count) {
        return Err(Diagnostic::warning(
            DiagnosticCode::IndexOutOfRange,
            format!(
                "face references vertex {} but only {} exist; face skipped",
                bad, vertex_count
            ),
        ));
    }
    Ok(())
}

/// Build the triangle mesh for `model`.
///
/// Two-sided faces additionally emit every triangle with reversed winding.
/// Missing normals are derived from the front-facing triangles, weighted by
/// area.
pub fn build_mesh(model: &ObjectModel) -> ParseReport<Mesh> {
    let vertex_count = model.vertices.len();
    let mut diagnostics = Vec::new();
    let mut front = Vec::new();
    let mut triangles = Vec::new();

    for face in &model.faces {
        if let Err(diag) = check_face(face, vertex_count) {
            warn!("{}", diag.message);
            diagnostics.push(diag);
            continue;
        }
        let fan = triangulate(&face.indices);
        triangles.extend_from_slice(&fan);
        if face.two_sided {
            triangles.extend(fan.iter().map(|&[a, b, c]| [a, c, b]));
        }
        // reversed copies would cancel the front normals out
        front.extend(fan);
    }

    let normals = if model.has_normals() {
        model.normals.clone()
    } else {
        compute_normals(&model.vertices, &front)
    };

    let mesh = Mesh {
        positions: model.vertices.clone(),
        normals,
        uvs: if model.has_uvs() {
            model.uvs.clone()
        } else {
            Vec::new()
        },
        triangles,
        material: model.material.clone(),
    };
    ParseReport::new(mesh, diagnostics)
}

/// Area-weighted vertex normals for `triangles`.
pub fn compute_normals(vertices: &[Vector3<f32>], triangles: &[[usize; 3]]) -> Vec<Vector3<f32>> {
    let mut sums = vec![Vector3::zero(); vertices.len()];
    for &[a, b, c] in triangles {
        // cross product length is twice the triangle area
        let n = (vertices[b] - vertices[a]).cross(vertices[c] - vertices[a]);
        sums[a] += n;
        sums[b] += n;
        sums[c] += n;
    }
    sums.into_iter()
        .map(|n| {
            if n.magnitude2() > f32::EPSILON {
                n.normalize()
            } else {
                FALLBACK_NORMAL
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn quad(two_sided: bool) -> ObjectModel {
        ObjectModel {
            vertices: vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 1.0),
                Vector3::new(0.0, 0.0, 1.0),
            ],
            faces: vec![Face {
                indices: vec![0, 1, 2, 3],
                two_sided,
            }],
            ..ObjectModel::default()
        }
    }

    #[test]
    fn test_triangle_passthrough() {
        assert_eq!(triangulate(&[4, 5, 6]), vec![[4, 5, 6]]);
        assert!(triangulate(&[1, 2]).is_empty());
    }

    #[test]
    fn test_quad_fan() {
        let mesh = build_mesh(&quad(false)).output;
        assert_eq!(mesh.triangles, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(mesh.indices(), Some(vec![0, 1, 2, 0, 2, 3]));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_index_buffer_rejects_wide_indices() {
        let mut mesh = build_mesh(&quad(false)).output;
        mesh.triangles.push([0, 1, u32::MAX as usize + 1]);
        assert_eq!(mesh.indices(), None);
    }

    #[test]
    fn test_two_sided_quad() {
        let mesh = build_mesh(&quad(true)).output;
        assert_eq!(
            mesh.triangles,
            vec![[0, 1, 2], [0, 2, 3], [0, 2, 1], [0, 3, 2]]
        );
    }

    #[test]
    fn test_computed_normals_follow_winding() {
        let mesh = build_mesh(&quad(true)).output;
        assert_eq!(mesh.normals.len(), 4);
        // (1,0,0) x (1,0,1) = (0,-1,0): every vertex shares the plane normal
        for n in &mesh.normals {
            assert!((n.y + 1.0).abs() < 1e-6, "unexpected normal {:?}", n);
        }
    }

    #[test]
    fn test_supplied_normals_are_kept() {
        let mut model = quad(false);
        model.normals = vec![Vector3::new(0.0, 0.0, 1.0); 4];
        let mesh = build_mesh(&model).output;
        assert_eq!(mesh.normals, model.normals);
    }

    #[test]
    fn test_bad_faces_are_skipped() {
        let mut model = quad(false);
        model.faces.push(Face::new(vec![0, 1, 9]));
        model.faces.push(Face::new(vec![0, 1]));
        model.faces.push(Face::two_sided(vec![1, 2, 3]));
        let report = build_mesh(&model);
        assert_eq!(
            report.output.triangles,
            vec![[0, 1, 2], [0, 2, 3], [1, 2, 3], [1, 3, 2]]
        );
        let codes: Vec<_> = report.diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![DiagnosticCode::IndexOutOfRange, DiagnosticCode::DegenerateFace]
        );
    }

    #[test]
    fn test_unused_vertex_gets_fallback_normal() {
        let mut model = quad(false);
        model.vertices.push(Vector3::new(5.0, 5.0, 5.0));
        let mesh = build_mesh(&model).output;
        assert_eq!(mesh.normals[4], FALLBACK_NORMAL);
    }
}
