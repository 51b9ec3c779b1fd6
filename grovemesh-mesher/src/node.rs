//! Branch-local node buffer.
//!
//! Each branch build copies its skeleton nodes into a fresh `Vec<BuildNode>`
//! so smoothing can insert and move nodes without touching the skeleton.

use grovemesh_core::{Node, Point3f, Vector3f};

/// Position and radius of a node in one season.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Point3f,
    pub radius: f32,
}

impl Pose {
    pub fn new(position: Point3f, radius: f32) -> Self {
        Self { position, radius }
    }
}

/// Which season's pose drives geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseKind {
    Current,
    LastYear,
}

impl PoseKind {
    pub const BOTH: [PoseKind; 2] = [PoseKind::Current, PoseKind::LastYear];
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildNode {
    pub current: Pose,
    pub last_year: Pose,
    pub direction: Vector3f,
    pub thickness: f32,
    pub age: f32,
    pub weight: f32,
    pub photosynthesis: f32,
    pub dead: bool,
    pub has_sub_branches: bool,
    /// Index of the skeleton node this was copied from; `None` for synthetic nodes.
    pub source: Option<usize>,
}

impl BuildNode {
    pub fn from_node(node: &Node, index: usize) -> Self {
        Self {
            current: Pose::new(node.position, node.radius),
            last_year: Pose::new(node.position_last_year, node.radius_last_year),
            direction: node.direction,
            thickness: node.thickness,
            age: node.age,
            weight: node.weight,
            photosynthesis: node.photosynthesis,
            dead: node.dead,
            has_sub_branches: node.has_sub_branches(),
            source: Some(index),
        }
    }

    /// A synthetic node inheriting the non-geometric data of `template`.
    pub fn synthetic_from(template: &BuildNode) -> Self {
        Self {
            has_sub_branches: false,
            source: None,
            ..template.clone()
        }
    }

    pub fn pose(&self, kind: PoseKind) -> &Pose {
        match kind {
            PoseKind::Current => &self.current,
            PoseKind::LastYear => &self.last_year,
        }
    }

    pub fn pose_mut(&mut self, kind: PoseKind) -> &mut Pose {
        match kind {
            PoseKind::Current => &mut self.current,
            PoseKind::LastYear => &mut self.last_year,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.source.is_none()
    }
}

/// Copy a branch's skeleton nodes into a local buffer.
pub fn copy_nodes(nodes: &[Node]) -> Vec<BuildNode> {
    nodes
        .iter()
        .enumerate()
        .map(|(i, n)| BuildNode::from_node(n, i))
        .collect()
}

/// Positions of `nodes` in the given pose.
pub fn positions(nodes: &[BuildNode], kind: PoseKind) -> Vec<Point3f> {
    nodes.iter().map(|n| n.pose(kind).position).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use grovemesh_core::Branch;

    #[test]
    fn test_copy_keeps_source_indices() {
        let mut nodes = vec![
            Node::new(Point3f::new(0.0, 0.0, 0.0), 0.2),
            Node::new(Point3f::new(0.0, 0.0, 1.0), 0.1).with_last_year(Point3f::new(0.0, 0.0, 0.8), 0.05),
        ];
        nodes[1].sub_branches.push(Branch::default());

        let copied = copy_nodes(&nodes);
        assert_eq!(copied[0].source, Some(0));
        assert_eq!(copied[1].source, Some(1));
        assert!(copied[1].has_sub_branches);
        assert_eq!(copied[1].pose(PoseKind::LastYear).radius, 0.05);
        assert_eq!(positions(&copied, PoseKind::LastYear)[1], Point3f::new(0.0, 0.0, 0.8));

        let synthetic = BuildNode::synthetic_from(&copied[1]);
        assert!(synthetic.is_synthetic());
        assert!(!synthetic.has_sub_branches);
    }
}
