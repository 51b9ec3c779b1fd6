//! Per-node attribute values for the vertex layers.

use crate::node::BuildNode;
use grovemesh_core::{world_up, Vector3f, VertexAttributes};
use std::f32::consts::PI;

/// Branch-wide inputs shared by every vertex a branch emits.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeContext {
    pub shade: f32,
    pub power: f32,
    pub dead: bool,
    pub tree_age: f32,
    pub base_weight: f32,
    pub branch_index: usize,
    pub parent_index: usize,
    /// Trunk distance at the branch's first node.
    pub trunk_distance: f32,
    pub branch_length: f32,
    pub branch_group: usize,
}

/// `1 - angle(world up, tangent) / π`: 1 pointing up, 0 pointing down.
pub fn pitch(tangent: &Vector3f) -> f32 {
    1.0 - world_up().angle(tangent) / PI
}

impl AttributeContext {
    /// Values for a vertex at node `node` with tangent `tangent`, `dist` along the branch.
    pub fn node(&self, node: &BuildNode, tangent: &Vector3f, dist: f32) -> VertexAttributes {
        let branch_distance = if self.branch_length > 0.0 {
            dist / self.branch_length
        } else {
            0.0
        };
        VertexAttributes {
            shade: self.shade,
            thickness: node.thickness,
            age: node.age / self.tree_age,
            weight: node.weight / self.base_weight,
            power: self.power,
            health: node.photosynthesis.max(0.0).powf(0.2),
            dead: if self.dead { 1.0 } else { 0.0 },
            pitch: pitch(tangent),
            branch_index: self.branch_index as f32,
            branch_index_parent: self.parent_index as f32,
            trunk_distance: self.trunk_distance + dist,
            branch_distance,
            branch_group: self.branch_group as f32,
            ..Default::default()
        }
    }
}
