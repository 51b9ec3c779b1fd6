//! Tree skeleton: branches made of nodes, sub-branches hanging off nodes.
//!
//! The skeleton is produced by an external growth simulation and is read-only
//! while a mesh is being built.

use crate::point::*;
use serde::{Deserialize, Serialize};

/// One sample along a branch polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub position: Point3f,
    /// Position at the end of the previous growth season.
    pub position_last_year: Point3f,
    /// Intended growth direction. Not the same as the meshing tangent.
    pub direction: Vector3f,
    pub radius: f32,
    pub radius_last_year: f32,
    /// Drives ring resolution. Not the same as `radius`.
    pub thickness: f32,
    pub age: f32,
    pub weight: f32,
    /// Health proxy in [0, 1].
    pub photosynthesis: f32,
    pub dead: bool,
    pub sub_branches: Vec<Branch>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            position: Point3f::origin(),
            position_last_year: Point3f::origin(),
            direction: Vector3f::z(),
            radius: 0.0,
            radius_last_year: 0.0,
            thickness: 0.0,
            age: 0.0,
            weight: 0.0,
            photosynthesis: 1.0,
            dead: false,
            sub_branches: Vec::new(),
        }
    }
}

impl Node {
    /// Create a node at `position` with the same current and last-year pose.
    pub fn new(position: Point3f, radius: f32) -> Self {
        Self {
            position,
            position_last_year: position,
            radius,
            radius_last_year: radius,
            thickness: radius * 2.0,
            ..Default::default()
        }
    }

    pub fn with_direction(mut self, direction: Vector3f) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_thickness(mut self, thickness: f32) -> Self {
        self.thickness = thickness;
        self
    }

    pub fn with_age(mut self, age: f32) -> Self {
        self.age = age;
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_last_year(mut self, position: Point3f, radius: f32) -> Self {
        self.position_last_year = position;
        self.radius_last_year = radius;
        self
    }

    pub fn with_sub_branch(mut self, branch: Branch) -> Self {
        self.sub_branches.push(branch);
        self
    }

    pub fn has_sub_branches(&self) -> bool {
        !self.sub_branches.is_empty()
    }
}

/// An ordered run of nodes. Sub-branches are owned by the node they attach to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Branch {
    pub nodes: Vec<Node>,
    pub is_trunk: bool,
    pub dead: bool,
    pub shade: f32,
    pub power: f32,
    pub uv_offset: Uv,
    /// Phyllotaxic start angle for lateral twig placement, in radians.
    pub initial_phyllotaxic_angle: f32,
}

impl Default for Branch {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            is_trunk: false,
            dead: false,
            shade: 0.0,
            power: 1.0,
            uv_offset: [0.0, 0.0],
            initial_phyllotaxic_angle: 0.0,
        }
    }
}

impl Branch {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            ..Default::default()
        }
    }

    /// Create a trunk branch.
    pub fn trunk(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            is_trunk: true,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of branches in this subtree, including this one.
    pub fn branch_count(&self) -> usize {
        1 + self
            .nodes
            .iter()
            .flat_map(|n| n.sub_branches.iter())
            .map(Branch::branch_count)
            .sum::<usize>()
    }
}

/// A complete tree skeleton rooted at the trunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    pub trunk: Branch,
}

impl Skeleton {
    pub fn new(trunk: Branch) -> Self {
        Self { trunk }
    }

    /// Base of the trunk. Built meshes are expressed relative to it.
    pub fn origin(&self) -> Point3f {
        self.trunk
            .nodes
            .first()
            .map(|n| n.position)
            .unwrap_or_else(Point3f::origin)
    }

    /// Age of the tree: trunk base age plus one season.
    pub fn tree_age(&self) -> f32 {
        self.trunk.nodes.first().map(|n| n.age).unwrap_or(0.0) + 1.0
    }

    /// Trunk base weight used to normalise the weight layer.
    pub fn base_weight(&self) -> f32 {
        let weight = self.trunk.nodes.first().map(|n| n.weight).unwrap_or(0.0);
        if weight == 0.0 {
            0.0001
        } else {
            weight
        }
    }

    pub fn branch_count(&self) -> usize {
        self.trunk.branch_count()
    }
}
