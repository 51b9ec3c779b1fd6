//! Recursive tree walker.
//!
//! Builds the trunk, then every sub-branch depth first in skeleton order.
//! The running vertex count and the next free branch index are threaded
//! through the recursion by return value.

use crate::frame::{arc_lengths, compute_frames, tangents};
use crate::graft::{graft_template, GraftTarget};
use crate::node::{copy_nodes, positions, BuildNode, PoseKind};
use crate::recorder::AttributeContext;
use crate::rings::{emit_rings, plan_rings, RingBranch};
use crate::settings::{BuildMode, BuildSettings};
use crate::sink::MeshSink;
use crate::smoothing::{smooth_branch, taper_radii, Joint};
use crate::twigs::emit_twigs;
use crate::TreeMesher;
use grovemesh_core::{
    is_finite_point, AttributeKind, Branch, Error, FrondSet, Node, Result, Skeleton, TreeMesh, Vector3f,
    VertexAttributes,
};
use log::{debug, info, warn};

/// Builds a [`TreeMesh`] from a [`Skeleton`].
///
/// ```ignore
/// let mesh = TreeBuilder::new(&settings)
///     .with_fronds(&fronds)
///     .with_mode(BuildMode::Full)
///     .build(&skeleton)?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TreeBuilder<'a> {
    settings: &'a BuildSettings,
    fronds: Option<&'a FrondSet>,
    mode: BuildMode,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(settings: &'a BuildSettings) -> Self {
        Self {
            settings,
            fronds: None,
            mode: BuildMode::Full,
        }
    }

    pub fn with_fronds(mut self, fronds: &'a FrondSet) -> Self {
        self.fronds = Some(fronds);
        self
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    /// Check everything that can be rejected before emitting geometry.
    fn check(&self, skeleton: &Skeleton) -> Result<()> {
        self.settings.validate()?;
        if self.settings.fronds.is_enabled() && self.fronds.map_or(true, FrondSet::is_empty) {
            return Err(Error::InvalidConfig(String::from(
                "frond grafting is enabled but no frond templates were given",
            )));
        }
        if skeleton.trunk.len() < 2 {
            return Err(Error::InvalidData(format!(
                "trunk needs at least two nodes, got {}",
                skeleton.trunk.len()
            )));
        }
        Ok(())
    }

    pub fn build(&self, skeleton: &Skeleton) -> Result<TreeMesh> {
        self.check(skeleton)?;

        let mut mesh = TreeMesh::new();
        let mut sink = MeshSink::new(&mut mesh, self.mode, skeleton.origin());
        let mut walk = Walk {
            settings: self.settings,
            fronds: self.fronds,
            kind: if self.mode.capabilities().uses_last_year_pose {
                PoseKind::LastYear
            } else {
                PoseKind::Current
            },
            tree_age: skeleton.tree_age(),
            base_weight: skeleton.base_weight(),
            group: 0,
            group_start: 0,
        };

        let (v, next_index) = walk.branch(
            &mut sink,
            BranchCall {
                branch: &skeleton.trunk,
                joint: None,
                branch_index: 0,
                parent_index: 0,
                depth: 0,
                trunk_distance: 0.0,
                v: 0,
            },
        );
        walk.close_group(&mut sink, v);
        assert_eq!(v, sink.count(), "vertex counter drifted from the output buffers");

        if self.mode == BuildMode::Full {
            mesh.assert_consistent();
            info!(
                "built tree: {} branches, {} vertices, {} faces",
                next_index + 1,
                mesh.vertex_count(),
                mesh.face_count()
            );
        } else {
            info!("built {:?} pose: {} positions", self.mode, mesh.shape.len());
        }
        Ok(mesh)
    }
}

impl TreeMesher for TreeBuilder<'_> {
    fn build(&self, skeleton: &Skeleton) -> Result<TreeMesh> {
        TreeBuilder::build(self, skeleton)
    }
}

/// Arguments of one recursive branch build.
struct BranchCall<'s> {
    branch: &'s Branch,
    joint: Option<Joint>,
    branch_index: usize,
    parent_index: usize,
    depth: usize,
    /// Trunk distance at the attachment point.
    trunk_distance: f32,
    /// Vertices written before this branch.
    v: usize,
}

/// State shared by the whole recursion.
struct Walk<'a> {
    settings: &'a BuildSettings,
    fronds: Option<&'a FrondSet>,
    kind: PoseKind,
    tree_age: f32,
    base_weight: f32,
    group: usize,
    group_start: usize,
}

fn branch_is_finite(branch: &Branch) -> bool {
    branch.nodes.iter().all(|n| {
        is_finite_point(&n.position)
            && is_finite_point(&n.position_last_year)
            && n.radius.is_finite()
            && n.radius_last_year.is_finite()
    })
}

/// Parent nodes around permanent node `i` of `skeleton`, whose smoothed
/// node list is `nodes`. Sub-branches on a branch's first node are not
/// smoothed.
fn joint_at(nodes: &[BuildNode], skeleton: &[Node], i: usize) -> Option<Joint> {
    if i == 0 {
        return None;
    }
    let k = nodes.iter().position(|n| n.source == Some(i))?;
    if k == 0 {
        return None;
    }
    // the last node of a two-node parent joins against its unsmoothed first node
    let previous = if i == 1 && i + 1 == skeleton.len() {
        BuildNode::from_node(&skeleton[0], 0)
    } else {
        nodes[k - 1].clone()
    };
    Some(Joint {
        previous,
        current: nodes[k].clone(),
        next: nodes.get(k + 1).cloned(),
    })
}

/// Arc length at permanent node `i`, 0 when it was replaced by smoothing.
fn distance_at(nodes: &[BuildNode], dist: &[f32], i: usize) -> f32 {
    nodes
        .iter()
        .position(|n| n.source == Some(i))
        .map_or(0.0, |k| dist[k])
}

impl Walk<'_> {
    /// Renormalise the trunk distance of the group ending at `v` and start a new one.
    fn close_group(&mut self, sink: &mut MeshSink<'_>, v: usize) {
        sink.normalize_layer(AttributeKind::TrunkDistance, self.group_start..v);
        self.group_start = v;
    }

    /// Build `call.branch` and its subtree. Returns the vertex count and the
    /// last branch index used.
    fn branch(&mut self, sink: &mut MeshSink<'_>, call: BranchCall<'_>) -> (usize, usize) {
        let BranchCall {
            branch,
            joint,
            branch_index,
            parent_index,
            depth,
            trunk_distance,
            mut v,
        } = call;
        let capabilities = sink.capabilities();

        if !branch_is_finite(branch) {
            warn!("branch {} has non-finite node data, skipping its subtree", branch_index);
            let consumed = branch.nodes.iter().map(|n| n.sub_branches.len()).sum::<usize>();
            return (v, branch_index + consumed);
        }

        let mut nodes = smooth_branch(&copy_nodes(&branch.nodes), joint.as_ref(), branch.is_trunk);
        if capabilities.tapers_radius {
            taper_radii(&mut nodes, self.kind);
        }

        let pose_positions = positions(&nodes, self.kind);
        let frames = compute_frames(&pose_positions);
        let dist = arc_lengths(&pose_positions);
        let current_positions = positions(&nodes, PoseKind::Current);
        let current_tangents: Vec<Vector3f> = match self.kind {
            PoseKind::Current => frames.iter().map(|f| f.tangent).collect(),
            PoseKind::LastYear => tangents(&current_positions),
        };

        let context = AttributeContext {
            shade: branch.shade,
            power: branch.power,
            dead: branch.dead,
            tree_age: self.tree_age,
            base_weight: self.base_weight,
            branch_index,
            parent_index,
            trunk_distance,
            branch_length: dist.last().copied().unwrap_or(0.0),
            branch_group: self.group,
        };
        let attributes: Vec<VertexAttributes> = if capabilities.records_layers {
            nodes
                .iter()
                .zip(&frames)
                .zip(&dist)
                .map(|((node, frame), d)| context.node(node, &frame.tangent, *d))
                .collect()
        } else {
            vec![VertexAttributes::default(); nodes.len()]
        };

        let base_thickness = branch.nodes[0].thickness;
        let template = if self.settings.fronds.should_graft(base_thickness, depth) {
            // template choice must not depend on the pose being built
            let length = arc_lengths(&current_positions).last().copied().unwrap_or(0.0);
            self.fronds.and_then(|set| set.closest(length))
        } else {
            None
        };

        match template {
            Some(template) => {
                debug!("branch {} grafted with frond '{}'", branch_index, template.name);
                let target = GraftTarget {
                    positions: &pose_positions,
                    frames: &frames,
                    dist: &dist,
                    attributes: &attributes,
                };
                v += graft_template(template, &target, &self.settings.fronds, sink);
            }
            None => {
                let plans = plan_rings(&nodes, &current_tangents, base_thickness, self.settings);
                let rings = RingBranch {
                    nodes: &nodes,
                    frames: &frames,
                    attributes: &attributes,
                    kind: self.kind,
                    base_thickness,
                    uv_offset: branch.uv_offset,
                    is_trunk: branch.is_trunk,
                };
                v += emit_rings(&rings, &plans, self.settings, sink);
                if self.settings.twigs.enabled {
                    v += emit_twigs(branch, self.kind, &context, &self.settings.twigs, self.settings.twist, sink);
                }
            }
        }
        assert_eq!(v, sink.count(), "branch {} wrote an unexpected vertex count", branch_index);

        let recurse = template.is_none();
        let mut next_index = branch_index;
        for (i, node) in branch.nodes.iter().enumerate() {
            for sub in &node.sub_branches {
                next_index += 1;
                if !recurse {
                    continue;
                }
                if sub.len() < 2 {
                    debug!("skipping branch {} with {} nodes", next_index, sub.len());
                    continue;
                }

                let trunk_distance = if branch.is_trunk {
                    self.close_group(sink, v);
                    self.group += 1;
                    0.0
                } else {
                    trunk_distance + distance_at(&nodes, &dist, i)
                };

                let (sub_v, sub_index) = self.branch(
                    sink,
                    BranchCall {
                        branch: sub,
                        joint: joint_at(&nodes, &branch.nodes, i),
                        branch_index: next_index,
                        parent_index: branch_index,
                        depth: depth + 1,
                        trunk_distance,
                        v,
                    },
                );
                v = sub_v;
                next_index = sub_index;
            }
        }

        (v, next_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{FrondPolicy, FrondSettings};
    use grovemesh_core::{FrondTemplate, Node, Point3f};

    fn column(n: usize, radius: f32) -> Vec<Node> {
        (0..n)
            .map(|i| Node::new(Point3f::new(0.0, 0.0, i as f32), radius).with_thickness(1.0))
            .collect()
    }

    fn side_branch(at: Point3f, n: usize) -> Branch {
        Branch::new(
            (0..n)
                .map(|i| Node::new(at + Vector3f::new(0.5 * i as f32, 0.0, 0.2 * i as f32), 0.02).with_thickness(0.2))
                .collect(),
        )
    }

    fn forked_tree() -> Skeleton {
        let mut trunk = column(5, 0.2);
        trunk[2].sub_branches.push(side_branch(Point3f::new(0.0, 0.0, 2.0), 4));
        trunk[3].sub_branches.push(side_branch(Point3f::new(0.0, 0.0, 3.0), 3));
        Skeleton::new(Branch::trunk(trunk))
    }

    #[test]
    fn test_rejects_short_trunk() {
        let settings = BuildSettings::default();
        let skeleton = Skeleton::new(Branch::trunk(column(1, 0.1)));
        assert!(matches!(
            TreeBuilder::new(&settings).build(&skeleton),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_rejects_grafting_without_templates() {
        let settings = BuildSettings::default().with_fronds(FrondSettings {
            policy: FrondPolicy::ByThickness,
            ..Default::default()
        });
        let empty = FrondSet::new();
        let builder = TreeBuilder::new(&settings).with_fronds(&empty);
        assert!(matches!(builder.build(&forked_tree()), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_joint_lookup_follows_smoothed_nodes() {
        let skeleton = column(4, 0.1);
        let nodes = copy_nodes(&skeleton);
        assert!(joint_at(&nodes, &skeleton, 0).is_none());
        let joint = joint_at(&nodes, &skeleton, 3).unwrap();
        assert_eq!(joint.previous.source, Some(2));
        assert!(joint.next.is_none());

        let mut smoothed = nodes.clone();
        smoothed.insert(0, BuildNode::synthetic_from(&nodes[0]));
        smoothed.insert(0, BuildNode::synthetic_from(&nodes[0]));
        smoothed[2] = BuildNode::synthetic_from(&nodes[0]);
        let joint = joint_at(&smoothed, &skeleton, 1).unwrap();
        assert!(joint.previous.is_synthetic());
        assert_eq!(joint.current.source, Some(1));
        assert_eq!(joint.next.unwrap().source, Some(2));
    }

    #[test]
    fn test_joint_on_last_node_of_two_node_branch_uses_skeleton_start() {
        let skeleton = side_branch(Point3f::new(0.0, 0.0, 1.0), 2).nodes;
        let mut smoothed = copy_nodes(&skeleton);
        let mut end = BuildNode::synthetic_from(&smoothed[0]);
        end.current.position = Point3f::new(0.3, 0.0, 1.1);
        smoothed[0] = end.clone();
        smoothed.insert(0, end.clone());
        smoothed.insert(0, end);

        let joint = joint_at(&smoothed, &skeleton, 1).unwrap();
        assert_eq!(joint.previous.source, Some(0));
        assert_eq!(joint.previous.current.position, skeleton[0].position);
        assert_eq!(joint.current.source, Some(1));
        assert!(joint.next.is_none());
    }

    #[test]
    fn test_branch_indices_are_pre_order() {
        let mut trunk = column(4, 0.2);
        let mut first = side_branch(Point3f::new(0.0, 0.0, 1.0), 3);
        first.nodes[1].sub_branches.push(side_branch(Point3f::new(0.5, 0.0, 1.2), 2));
        trunk[1].sub_branches.push(first);
        trunk[2].sub_branches.push(side_branch(Point3f::new(0.0, 0.0, 2.0), 3));
        let skeleton = Skeleton::new(Branch::trunk(trunk));

        let settings = BuildSettings::default();
        let mesh = TreeBuilder::new(&settings).build(&skeleton).unwrap();
        let mut seen: Vec<(f32, f32)> = Vec::new();
        let index = mesh.layer(AttributeKind::BranchIndex);
        let parent = mesh.layer(AttributeKind::BranchIndexParent);
        for (i, p) in index.iter().zip(parent) {
            if seen.last() != Some(&(*i, *p)) {
                seen.push((*i, *p));
            }
        }
        assert_eq!(seen, vec![(0.0, 0.0), (1.0, 0.0), (2.0, 1.0), (3.0, 0.0)]);
    }

    #[test]
    fn test_grafted_branch_replaces_subtree() {
        let mut trunk = column(4, 0.2);
        let mut first = side_branch(Point3f::new(0.0, 0.0, 1.0), 3);
        first.nodes[1].sub_branches.push(side_branch(Point3f::new(0.5, 0.0, 1.2), 2));
        trunk[1].sub_branches.push(first);
        trunk[2].sub_branches.push(side_branch(Point3f::new(0.0, 0.0, 2.0), 3));
        let skeleton = Skeleton::new(Branch::trunk(trunk));

        let mut fronds = FrondSet::new();
        let template = FrondTemplate::new(
            "leaf",
            vec![
                Point3f::new(0.0, -0.1, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 0.1, 0.0),
            ],
            vec![vec![0, 1, 2]],
            vec![vec![[0.0, 0.0], [1.0, 0.5], [0.0, 1.0]]],
            vec![0],
        )
        .unwrap();
        fronds.add_template(template, &[String::from("leaf")]).unwrap();

        let settings = BuildSettings::default().with_fronds(FrondSettings {
            policy: FrondPolicy::ByThickness,
            thickness_cutoff: 0.5,
            ..Default::default()
        });
        let mesh = TreeBuilder::new(&settings).with_fronds(&fronds).build(&skeleton).unwrap();
        mesh.assert_consistent();

        let frond = mesh.layer(AttributeKind::Frond);
        assert_eq!(frond.iter().filter(|f| **f == 1.0).count(), 6);
        assert_eq!(mesh.material_mask(0).iter().sum::<f32>(), 2.0);

        let grafted: Vec<f32> = mesh
            .layer(AttributeKind::BranchIndex)
            .iter()
            .zip(frond)
            .filter(|(_, f)| **f == 1.0)
            .map(|(i, _)| *i)
            .collect();
        // the nested branch keeps index 2 even though it is not built
        assert_eq!(grafted, vec![1.0, 1.0, 1.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_branch_groups_and_trunk_distance() {
        let settings = BuildSettings::default();
        let mesh = TreeBuilder::new(&settings).build(&forked_tree()).unwrap();
        let groups = mesh.layer(AttributeKind::BranchGroup);
        let distance = mesh.layer(AttributeKind::TrunkDistance);

        assert_eq!(groups.first(), Some(&0.0));
        assert_eq!(groups.last(), Some(&2.0));
        assert!(distance.iter().all(|d| (0.0..=1.0).contains(d)));
        for group in 0..3 {
            let max = groups
                .iter()
                .zip(distance)
                .filter(|(g, _)| **g == group as f32)
                .map(|(_, d)| *d)
                .fold(0.0_f32, f32::max);
            approx::assert_relative_eq!(max, 1.0);
        }
    }

    #[test]
    fn test_non_finite_branch_is_skipped() {
        let mut skeleton = forked_tree();
        skeleton.trunk.nodes[2].sub_branches[0].nodes[1].position.x = f32::NAN;
        let settings = BuildSettings::default();
        let mesh = TreeBuilder::new(&settings).build(&skeleton).unwrap();
        mesh.assert_consistent();
        assert!(mesh.vertices.iter().all(is_finite_point));
        assert!(!mesh.layer(AttributeKind::BranchIndex).contains(&1.0));
        assert!(mesh.layer(AttributeKind::BranchIndex).contains(&2.0));
    }
}
