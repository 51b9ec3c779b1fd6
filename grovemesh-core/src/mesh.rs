//! Output buffers of a tree build

use crate::attributes::*;
use crate::point::*;
use serde::{Deserialize, Serialize};

/// Which material a face belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialSlot {
    Bark,
    /// Twig duplicator triangles used for particle scattering.
    Twig,
    /// Index into `FrondSet::material_names`.
    Frond(u32),
}

/// A polygon mesh with per-corner UVs and per-vertex attribute layers.
///
/// Buffers are append-only while a tree is being built. `uvs` is aligned with
/// the flattened corners of `faces`, `face_materials` with `faces`, and every
/// attribute layer with `vertices`.
///
/// Shape-only builds (growth and wind poses) leave the topology buffers empty
/// and write positions into `shape` instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<Vec<usize>>,
    pub uvs: Vec<Uv>,
    pub face_materials: Vec<MaterialSlot>,
    pub layers: AttributeLayers,
    pub shape: Vec<Point3f>,
}

impl TreeMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Get the number of face corners
    pub fn corner_count(&self) -> usize {
        self.faces.iter().map(Vec::len).sum()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Add a vertex together with its attribute values, returning its index.
    pub fn push_vertex(&mut self, position: Point3f, attributes: &VertexAttributes) -> usize {
        let index = self.vertices.len();
        self.vertices.push(position);
        self.layers.push(attributes, 1);
        index
    }

    /// Add a polygon with one UV per corner.
    ///
    /// # Panics
    /// When the UV count differs from the corner count or an index does not
    /// name an existing vertex. Both are programming errors in the builder.
    pub fn push_face(&mut self, face: Vec<usize>, corner_uvs: &[Uv], material: MaterialSlot) {
        assert_eq!(
            face.len(),
            corner_uvs.len(),
            "face has {} corners but {} uvs",
            face.len(),
            corner_uvs.len()
        );
        assert!(
            face.iter().all(|&i| i < self.vertices.len()),
            "face {:?} references a vertex past {}",
            face,
            self.vertices.len()
        );
        self.uvs.extend_from_slice(corner_uvs);
        self.faces.push(face);
        self.face_materials.push(material);
    }

    /// Add a shape-key position.
    pub fn push_shape_point(&mut self, position: Point3f) {
        self.shape.push(position);
    }

    pub fn layer(&self, kind: AttributeKind) -> &[f32] {
        self.layers.layer(kind)
    }

    /// One-hot per-face mask for frond material `id`.
    pub fn material_mask(&self, id: u32) -> Vec<f32> {
        self.face_materials
            .iter()
            .map(|m| if *m == MaterialSlot::Frond(id) { 1.0 } else { 0.0 })
            .collect()
    }

    /// Assert the buffer alignment invariants.
    ///
    /// # Panics
    /// On any misalignment between vertices, layers, faces, corners and UVs.
    pub fn assert_consistent(&self) {
        assert_eq!(
            self.layers.len(),
            self.vertices.len(),
            "attribute layers out of step with vertices"
        );
        assert_eq!(self.uvs.len(), self.corner_count(), "uvs out of step with face corners");
        assert_eq!(
            self.face_materials.len(),
            self.faces.len(),
            "material slots out of step with faces"
        );
    }

    /// Count faces by arity: (triangles, quads, other).
    pub fn face_arity_counts(&self) -> (usize, usize, usize) {
        self.faces.iter().fold((0, 0, 0), |(t, q, o), f| match f.len() {
            3 => (t + 1, q, o),
            4 => (t, q + 1, o),
            _ => (t, q, o + 1),
        })
    }

}
