//! Mode-aware writer over a [`TreeMesh`].

use crate::settings::{BuildMode, ModeCapabilities};
use grovemesh_core::{AttributeKind, MaterialSlot, Point3f, TreeMesh, Uv, VertexAttributes};
use std::ops::Range;

/// Appends geometry to a mesh, honouring what the build mode produces.
///
/// Full builds write vertices, faces, UVs and attribute layers. Shape builds
/// only write positions into `TreeMesh::shape`, in the same order, so a vertex
/// index means the same thing in every mode.
pub struct MeshSink<'m> {
    mesh: &'m mut TreeMesh,
    capabilities: ModeCapabilities,
    origin: Point3f,
}

impl<'m> MeshSink<'m> {
    /// Positions are written relative to `origin`.
    pub fn new(mesh: &'m mut TreeMesh, mode: BuildMode, origin: Point3f) -> Self {
        Self {
            mesh,
            capabilities: mode.capabilities(),
            origin,
        }
    }

    pub fn capabilities(&self) -> ModeCapabilities {
        self.capabilities
    }

    /// Number of positions written so far.
    pub fn count(&self) -> usize {
        if self.capabilities.emits_faces {
            self.mesh.vertex_count()
        } else {
            self.mesh.shape.len()
        }
    }

    /// Write a vertex given in world space and return its index.
    pub fn vertex(&mut self, world: Point3f, attributes: &VertexAttributes) -> usize {
        let local = Point3f::from(world - self.origin);
        if self.capabilities.emits_faces {
            self.mesh.push_vertex(local, attributes)
        } else {
            self.mesh.push_shape_point(local);
            self.mesh.shape.len() - 1
        }
    }

    pub fn face(&mut self, face: Vec<usize>, corner_uvs: &[Uv], material: MaterialSlot) {
        if !self.capabilities.emits_faces {
            return;
        }
        if self.capabilities.emits_uvs {
            self.mesh.push_face(face, corner_uvs, material);
        } else {
            let zeros = vec![[0.0, 0.0]; face.len()];
            self.mesh.push_face(face, &zeros, material);
        }
    }

    /// Divide `kind` over `range` by its maximum. No-op without layers.
    pub fn normalize_layer(&mut self, kind: AttributeKind, range: Range<usize>) {
        if self.capabilities.records_layers && range.start < range.end {
            self.mesh.layers.normalize_range(kind, range);
        }
    }
}
