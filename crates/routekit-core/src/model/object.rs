//! Intermediate object model shared by the two geometry parsers.

use cgmath::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

pub type ColorRgba = [u8; 4];
pub type ColorRgb = [u8; 3];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub color: ColorRgba,
    pub emissive: Option<ColorRgb>,
    /// Texels of this color are rendered transparent.
    pub transparent: Option<ColorRgb>,
    pub specular: Option<ColorRgb>,
    pub specular_power: f32,
    pub texture: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: [255, 255, 255, 255],
            emissive: None,
            transparent: None,
            specular: None,
            specular_power: 0.0,
            texture: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    pub indices: Vec<usize>,
    pub two_sided: bool,
}

impl Face {
    pub fn new(indices: Vec<usize>) -> Self {
        Self {
            indices,
            two_sided: false,
        }
    }

    pub fn two_sided(indices: Vec<usize>) -> Self {
        Self {
            indices,
            two_sided: true,
        }
    }
}

/// Geometry collected while scanning one object file.
///
/// `normals` and `uvs` are either empty or hold exactly one entry per vertex.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectModel {
    pub vertices: Vec<Vector3<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub uvs: Vec<Vector2<f32>>,
    pub faces: Vec<Face>,
    pub material: Material,
}

impl ObjectModel {
    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty() && self.normals.len() == self.vertices.len()
    }

    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty() && self.uvs.len() == self.vertices.len()
    }

    /// Drop normal or UV arrays that do not cover every vertex.
    pub fn enforce_attribute_counts(&mut self) {
        if !self.has_normals() {
            self.normals.clear();
        }
        if !self.has_uvs() {
            self.uvs.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_attributes_are_dropped() {
        let mut model = ObjectModel {
            vertices: vec![Vector3::new(0.0, 0.0, 0.0); 3],
            normals: vec![Vector3::new(0.0, 1.0, 0.0); 2],
            uvs: vec![Vector2::new(0.0, 0.0); 3],
            ..ObjectModel::default()
        };
        model.enforce_attribute_counts();
        assert!(model.normals.is_empty());
        assert_eq!(model.uvs.len(), 3);
    }
}
