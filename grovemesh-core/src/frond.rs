//! Frond templates: pre-authored meshes that replace thin branches.

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};

/// An immutable template mesh in its own local space.
///
/// Local X runs along the frond's length, already in skeleton units. Faces are
/// polygons of any arity; `uvs` holds one coordinate per face corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrondTemplate {
    pub name: String,
    pub vertices: Vec<Point3f>,
    pub faces: Vec<Vec<usize>>,
    pub uvs: Vec<Vec<Uv>>,
    /// Per-face index into `FrondSet::material_names`.
    pub material_ids: Vec<u32>,
    /// Bounding box extents; `bounds.x` is the reference length.
    pub bounds: Vector3f,
}

impl FrondTemplate {
    /// Build a template, checking face indices and corner UV arity.
    pub fn new(
        name: impl Into<String>,
        vertices: Vec<Point3f>,
        faces: Vec<Vec<usize>>,
        uvs: Vec<Vec<Uv>>,
        material_ids: Vec<u32>,
    ) -> Result<Self> {
        let name = name.into();
        if uvs.len() != faces.len() || material_ids.len() != faces.len() {
            return Err(Error::InvalidData(format!(
                "frond '{}': {} faces but {} uv loops and {} material ids",
                name,
                faces.len(),
                uvs.len(),
                material_ids.len()
            )));
        }
        for (face, corners) in faces.iter().zip(&uvs) {
            if face.len() < 3 || face.len() != corners.len() {
                return Err(Error::InvalidData(format!(
                    "frond '{}': face with {} vertices and {} uv corners",
                    name,
                    face.len(),
                    corners.len()
                )));
            }
            if let Some(&bad) = face.iter().find(|&&i| i >= vertices.len()) {
                return Err(Error::InvalidData(format!(
                    "frond '{}': face index {} out of range ({} vertices)",
                    name,
                    bad,
                    vertices.len()
                )));
            }
        }
        let bounds = extents(&vertices);
        Ok(Self {
            name,
            vertices,
            faces,
            uvs,
            material_ids,
            bounds,
        })
    }

    /// Reference length along local X.
    pub fn length(&self) -> f32 {
        self.bounds.x
    }

    /// Divide every coordinate (and the bounds) by `scale_to_twig`.
    pub fn scaled(mut self, scale_to_twig: f32) -> Self {
        let factor = 1.0 / scale_to_twig;
        for v in &mut self.vertices {
            v.coords *= factor;
        }
        self.bounds *= factor;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Number of face corners, equal to the number of UV entries.
    pub fn corner_count(&self) -> usize {
        self.faces.iter().map(Vec::len).sum()
    }
}

fn extents(vertices: &[Point3f]) -> Vector3f {
    if vertices.is_empty() {
        return Vector3f::zeros();
    }
    let mut min = vertices[0];
    let mut max = vertices[0];
    for v in vertices {
        for i in 0..3 {
            min[i] = min[i].min(v[i]);
            max[i] = max[i].max(v[i]);
        }
    }
    max - min
}

/// Material name given to template faces that carry no material.
pub const DEFAULT_FROND_MATERIAL: &str = "frond";

/// A collection of templates with a merged material name table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrondSet {
    pub templates: Vec<FrondTemplate>,
    pub material_names: Vec<String>,
}

impl FrondSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template whose `material_ids` index into `local_materials`.
    ///
    /// Materials already known by name are reused, new names are appended, and
    /// the template's ids are rewritten to index the merged table. A template
    /// without materials uses the [`DEFAULT_FROND_MATERIAL`] slot. On error the
    /// set is left unchanged.
    pub fn add_template(&mut self, mut template: FrondTemplate, local_materials: &[String]) -> Result<()> {
        let default = [String::from(DEFAULT_FROND_MATERIAL)];
        let local = if local_materials.is_empty() { &default[..] } else { local_materials };
        if let Some(&bad) = template.material_ids.iter().find(|&&id| id as usize >= local.len()) {
            return Err(Error::InvalidData(format!(
                "frond '{}': material id {} but only {} materials",
                template.name,
                bad,
                local_materials.len()
            )));
        }

        let mut added: Vec<String> = Vec::new();
        let mut remap = Vec::with_capacity(local.len());
        for name in local {
            let known = self.material_names.iter().chain(&added).position(|n| n == name);
            let id = known.unwrap_or_else(|| {
                added.push(name.clone());
                self.material_names.len() + added.len() - 1
            });
            remap.push(id as u32);
        }

        for id in &mut template.material_ids {
            *id = remap[*id as usize];
        }
        self.material_names.extend(added);
        self.templates.push(template);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Template whose reference length is closest to `length`.
    /// Ties go to the template added first.
    pub fn closest(&self, length: f32) -> Option<&FrondTemplate> {
        self.templates.iter().fold(None, |best: Option<&FrondTemplate>, t| match best {
            Some(b) if (b.length() - length).abs() <= (t.length() - length).abs() => Some(b),
            _ => Some(t),
        })
    }
}
