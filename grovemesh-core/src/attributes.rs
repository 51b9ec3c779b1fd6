//! Per-vertex scalar attribute layers.
//!
//! Layers are stored as a fixed struct-of-arrays indexed by [`AttributeKind`].
//! The only way to grow them is [`AttributeLayers::push`], which appends one
//! value to every layer, so all layers always have the same length.

use serde::{Deserialize, Serialize};

/// The named attribute layers. Names are a stable contract with consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeKind {
    Shade,
    Thickness,
    Age,
    Weight,
    Power,
    Health,
    Dead,
    Pitch,
    Apical,
    Lateral,
    Upward,
    DeadTwig,
    BranchIndex,
    BranchIndexParent,
    Frond,
    Height,
    TrunkDistance,
    BranchDistance,
    BranchGroup,
}

impl AttributeKind {
    pub const COUNT: usize = 19;

    pub const ALL: [AttributeKind; Self::COUNT] = [
        AttributeKind::Shade,
        AttributeKind::Thickness,
        AttributeKind::Age,
        AttributeKind::Weight,
        AttributeKind::Power,
        AttributeKind::Health,
        AttributeKind::Dead,
        AttributeKind::Pitch,
        AttributeKind::Apical,
        AttributeKind::Lateral,
        AttributeKind::Upward,
        AttributeKind::DeadTwig,
        AttributeKind::BranchIndex,
        AttributeKind::BranchIndexParent,
        AttributeKind::Frond,
        AttributeKind::Height,
        AttributeKind::TrunkDistance,
        AttributeKind::BranchDistance,
        AttributeKind::BranchGroup,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AttributeKind::Shade => "shade",
            AttributeKind::Thickness => "thickness",
            AttributeKind::Age => "age",
            AttributeKind::Weight => "weight",
            AttributeKind::Power => "power",
            AttributeKind::Health => "health",
            AttributeKind::Dead => "dead",
            AttributeKind::Pitch => "pitch",
            AttributeKind::Apical => "apical",
            AttributeKind::Lateral => "lateral",
            AttributeKind::Upward => "upward",
            AttributeKind::DeadTwig => "dead-twig",
            AttributeKind::BranchIndex => "branch-index",
            AttributeKind::BranchIndexParent => "branch-index-parent",
            AttributeKind::Frond => "frond-flag",
            AttributeKind::Height => "height",
            AttributeKind::TrunkDistance => "trunk-distance",
            AttributeKind::BranchDistance => "branch-distance",
            AttributeKind::BranchGroup => "branch-group",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// The attribute values of one vertex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VertexAttributes {
    pub shade: f32,
    pub thickness: f32,
    pub age: f32,
    pub weight: f32,
    pub power: f32,
    pub health: f32,
    pub dead: f32,
    pub pitch: f32,
    pub apical: f32,
    pub lateral: f32,
    pub upward: f32,
    pub dead_twig: f32,
    pub branch_index: f32,
    pub branch_index_parent: f32,
    pub frond: f32,
    pub height: f32,
    pub trunk_distance: f32,
    pub branch_distance: f32,
    pub branch_group: f32,
}

impl VertexAttributes {
    pub fn get(&self, kind: AttributeKind) -> f32 {
        match kind {
            AttributeKind::Shade => self.shade,
            AttributeKind::Thickness => self.thickness,
            AttributeKind::Age => self.age,
            AttributeKind::Weight => self.weight,
            AttributeKind::Power => self.power,
            AttributeKind::Health => self.health,
            AttributeKind::Dead => self.dead,
            AttributeKind::Pitch => self.pitch,
            AttributeKind::Apical => self.apical,
            AttributeKind::Lateral => self.lateral,
            AttributeKind::Upward => self.upward,
            AttributeKind::DeadTwig => self.dead_twig,
            AttributeKind::BranchIndex => self.branch_index,
            AttributeKind::BranchIndexParent => self.branch_index_parent,
            AttributeKind::Frond => self.frond,
            AttributeKind::Height => self.height,
            AttributeKind::TrunkDistance => self.trunk_distance,
            AttributeKind::BranchDistance => self.branch_distance,
            AttributeKind::BranchGroup => self.branch_group,
        }
    }

    /// Component-wise linear interpolation.
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        let mix = |a: f32, b: f32| a + (b - a) * t;
        Self {
            shade: mix(self.shade, other.shade),
            thickness: mix(self.thickness, other.thickness),
            age: mix(self.age, other.age),
            weight: mix(self.weight, other.weight),
            power: mix(self.power, other.power),
            health: mix(self.health, other.health),
            dead: mix(self.dead, other.dead),
            pitch: mix(self.pitch, other.pitch),
            apical: mix(self.apical, other.apical),
            lateral: mix(self.lateral, other.lateral),
            upward: mix(self.upward, other.upward),
            dead_twig: mix(self.dead_twig, other.dead_twig),
            branch_index: mix(self.branch_index, other.branch_index),
            branch_index_parent: mix(self.branch_index_parent, other.branch_index_parent),
            frond: mix(self.frond, other.frond),
            height: mix(self.height, other.height),
            trunk_distance: mix(self.trunk_distance, other.trunk_distance),
            branch_distance: mix(self.branch_distance, other.branch_distance),
            branch_group: mix(self.branch_group, other.branch_group),
        }
    }
}

/// Struct-of-arrays storage for every [`AttributeKind`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeLayers {
    layers: [Vec<f32>; AttributeKind::COUNT],
}

impl AttributeLayers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Length shared by every layer.
    pub fn len(&self) -> usize {
        self.layers[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `count` copies of `values` to every layer.
    pub fn push(&mut self, values: &VertexAttributes, count: usize) {
        for kind in AttributeKind::ALL {
            let value = values.get(kind);
            self.layers[kind.index()].extend(std::iter::repeat(value).take(count));
        }
    }

    pub fn layer(&self, kind: AttributeKind) -> &[f32] {
        &self.layers[kind.index()]
    }

    /// Iterate `(name, values)` pairs in a fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[f32])> {
        AttributeKind::ALL
            .iter()
            .map(move |&k| (k.name(), self.layers[k.index()].as_slice()))
    }

    /// Divide `kind` over `range` by its maximum so the slice lies in [0, 1].
    /// Slices whose maximum is not positive are left untouched.
    pub fn normalize_range(&mut self, kind: AttributeKind, range: std::ops::Range<usize>) {
        let slice = &mut self.layers[kind.index()][range];
        let max = slice.iter().copied().fold(0.0_f32, f32::max);
        if max > 0.0 {
            for v in slice {
                *v /= max;
            }
        }
    }
}
