//! LOD ring tessellation.
//!
//! Every kept node gets a ring of vertices whose count follows the node's
//! thickness. Consecutive rings are stitched with quads, with one extra
//! triangle where the resolution steps down by one, and the last ring is
//! closed with a fan into a tip vertex.
//!
//! Ring planning (which nodes get a ring, at which resolution and twist)
//! only looks at thickness and current-year tangents, so growth and wind
//! builds produce the same topology as a full build.

use crate::node::{BuildNode, PoseKind};
use crate::settings::BuildSettings;
use crate::sink::MeshSink;
use grovemesh_core::{Frame, MaterialSlot, Uv, Vector3f, VertexAttributes};
use log::warn;
use std::f32::consts::TAU;

/// Extra twist applied when a ring steps down from 4 to 3 vertices.
const STEP_TO_TRIANGLE_TWIST: f32 = 0.5;
const MIN_RESOLUTION: usize = 3;

/// One ring to emit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingPlan {
    /// Index into the smoothed node list.
    pub node: usize,
    pub resolution: usize,
    /// Accumulated rotation about the tangent.
    pub twist: f32,
}

/// Unclamped ring resolution for a node of `thickness`.
pub fn target_resolution(profile_resolution: usize, reduction: f32, thickness: f32) -> usize {
    let full = profile_resolution as f32;
    let res = reduction * full * thickness + (1.0 - reduction) * full;
    (res.max(0.0) as usize).max(MIN_RESOLUTION)
}

/// Choose the rings of a branch.
///
/// `tangents` must be the current-year tangents of `nodes`. `base_thickness`
/// is the branch's own first node thickness, which sets the first ring's
/// resolution regardless of any smoothing nodes in front of it.
pub fn plan_rings(
    nodes: &[BuildNode],
    tangents: &[Vector3f],
    base_thickness: f32,
    settings: &BuildSettings,
) -> Vec<RingPlan> {
    let last = nodes.len().saturating_sub(1);
    let base_threshold = settings.edge_loop_threshold;
    let increment = (1.0 - base_threshold) / 10.0;

    let mut plans: Vec<RingPlan> = Vec::with_capacity(nodes.len());
    let mut threshold = base_threshold;
    let mut last_tangent: Option<Vector3f> = None;
    let mut twist = 0.0;

    for (j, node) in nodes.iter().enumerate() {
        if settings.reduce_edge_loops && j > 1 && j != last {
            if let Some(previous) = last_tangent {
                if previous.dot(&tangents[j]) > threshold && !node.has_sub_branches {
                    threshold += increment;
                    continue;
                }
            }
        }
        last_tangent = Some(tangents[j]);
        threshold = base_threshold;

        if j > 0 {
            twist += settings.twist;
        }

        let thickness = if j == 0 { base_thickness } else { node.thickness };
        let mut resolution = target_resolution(
            settings.profile_resolution,
            settings.profile_resolution_reduction,
            thickness,
        );
        if let Some(previous) = plans.last() {
            let prev = previous.resolution;
            if resolution + 1 < prev {
                resolution = prev - 1;
            } else if resolution == 3 && prev == 4 {
                twist += STEP_TO_TRIANGLE_TWIST;
            } else if resolution > prev {
                resolution = prev;
            }
        }
        resolution = resolution.min(settings.profile_resolution);

        plans.push(RingPlan {
            node: j,
            resolution,
            twist,
        });
    }

    plans
}

/// Root flare: (scaled radius, bump amount) of node `j`.
fn root_flare(radius: f32, j: usize, reach: f32, settings: &BuildSettings) -> (f32, f32) {
    if (j as f32) >= reach {
        return (radius, 0.0);
    }
    let x = 1.0 - j as f32 / reach;
    let y = x.powf(settings.root_shape * 75.0);
    let multiplier = y * (settings.root_scale - 1.0);
    let radius = radius + radius * multiplier;
    (radius, multiplier * 0.2 * settings.root_bump * radius)
}

/// Radius of ring point `i` of `n` with two superposed bump lobes.
fn bumped_radius(radius: f32, amount: f32, i: usize, n: usize) -> f32 {
    let t = i as f32 / n as f32 * TAU;
    radius + amount * (1.0 + 0.5 * (6.0 * t).sin()) + amount * (1.0 + 0.5 * (9.0 * t).cos()) * 0.5
}

/// Inputs of ring emission for one branch.
pub struct RingBranch<'a> {
    pub nodes: &'a [BuildNode],
    pub frames: &'a [Frame],
    /// Per-node attribute values, aligned with `nodes`.
    pub attributes: &'a [VertexAttributes],
    pub kind: PoseKind,
    pub base_thickness: f32,
    pub uv_offset: Uv,
    pub is_trunk: bool,
}

/// A ring already written to the sink.
#[derive(Debug, Clone, Copy)]
struct EmittedRing {
    start: usize,
    resolution: usize,
    node: usize,
    v: f32,
}

/// Horizontal texture layout of a branch.
#[derive(Debug, Clone, Copy)]
struct ULayout {
    offset: f32,
    repeat: f32,
}

impl ULayout {
    fn u(&self, i: usize, n: usize) -> f32 {
        self.offset + i as f32 / n as f32 * self.repeat
    }
}

/// Write the planned rings, side faces and tip cap. Returns the number of
/// vertices written.
pub fn emit_rings(branch: &RingBranch<'_>, plans: &[RingPlan], settings: &BuildSettings, sink: &mut MeshSink<'_>) -> usize {
    let first_vertex = sink.count();
    let repeat = ((settings.u_repeat * branch.base_thickness) as i64).max(1) as f32;
    let layout = ULayout {
        offset: branch.uv_offset[0],
        repeat,
    };
    let aspect = settings.texture_aspect_ratio * repeat;
    let reach = settings.root_distribution * branch.nodes.len() as f32;

    let mut previous: Option<EmittedRing> = None;
    for plan in plans {
        let node = &branch.nodes[plan.node];
        let pose = node.pose(branch.kind);
        let frame = &branch.frames[plan.node];

        let mut v = branch.uv_offset[1];
        if let Some(prev) = previous {
            v = prev.v;
            let segment = (pose.position - branch.nodes[prev.node].pose(branch.kind).position).norm();
            let circumference = TAU * pose.radius;
            if circumference > 0.0 {
                v += aspect / circumference * segment;
            } else {
                warn!("zero radius at node {}, texture v held", plan.node);
            }
        }

        let (radius, amount) = if branch.is_trunk {
            root_flare(pose.radius, plan.node, reach, settings)
        } else {
            (pose.radius, 0.0)
        };

        let n = plan.resolution;
        let start = sink.count();
        for i in 0..n {
            let r = if branch.is_trunk {
                bumped_radius(radius, amount, i, n)
            } else {
                radius
            };
            let angle = i as f32 / n as f32 * TAU + plan.twist;
            sink.vertex(pose.position + frame.ring_offset(angle, r), &branch.attributes[plan.node]);
        }

        let ring = EmittedRing {
            start,
            resolution: n,
            node: plan.node,
            v,
        };
        if let Some(prev) = previous {
            stitch(sink, &prev, &ring, &layout);
        }
        previous = Some(ring);
    }

    if let Some(last) = previous {
        let pose = branch.nodes[last.node].pose(branch.kind);
        let tip = sink.vertex(pose.position, &branch.attributes[last.node]);
        cap(sink, &last, tip);
    }

    sink.count() - first_vertex
}

/// Faces between two consecutive rings.
fn stitch(sink: &mut MeshSink<'_>, prev: &EmittedRing, cur: &EmittedRing, layout: &ULayout) {
    let (p, n) = (prev.resolution, cur.resolution);
    let (ps, cs) = (prev.start, cur.start);
    let (vp, vc) = (prev.v, cur.v);
    let repeat = layout.repeat;
    let seam_u = layout.u(n - 1, n) - repeat;

    if p == n {
        for i in 1..n {
            sink.face(
                vec![ps + i - 1, ps + i, cs + i, cs + i - 1],
                &[
                    [layout.u(i - 1, n), vp],
                    [layout.u(i, n), vp],
                    [layout.u(i, n), vc],
                    [layout.u(i - 1, n), vc],
                ],
                MaterialSlot::Bark,
            );
        }
        sink.face(
            vec![ps + n - 1, ps, cs, cs + n - 1],
            &[[seam_u, vp], [layout.offset, vp], [layout.offset, vc], [seam_u, vc]],
            MaterialSlot::Bark,
        );
    } else {
        assert_eq!(p, n + 1, "ring resolution changed from {} to {}", p, n);
        for i in 1..n {
            sink.face(
                vec![ps + i, ps + i + 1, cs + i, cs + i - 1],
                &[
                    [layout.u(i, p), vp],
                    [layout.u(i + 1, p), vp],
                    [layout.u(i, n), vc],
                    [layout.u(i - 1, n), vc],
                ],
                MaterialSlot::Bark,
            );
        }
        sink.face(
            vec![ps, ps + 1, cs, cs + n - 1],
            &[
                [layout.offset, vp],
                [layout.u(1, p), vp],
                [layout.offset, vc],
                [seam_u, vc],
            ],
            MaterialSlot::Bark,
        );
        sink.face(
            vec![ps + n, ps, cs + n - 1],
            &[[layout.u(n, p) - repeat, vp], [layout.offset, vp], [seam_u, vc]],
            MaterialSlot::Bark,
        );
    }
}

/// Point `k` of an `n`-gon on the unit disc centred at (0.5, 0.5).
fn disc_uv(k: usize, n: usize) -> Uv {
    let a = k as f32 / n as f32 * TAU;
    [0.5 * a.cos() + 0.5, 0.5 * a.sin() + 0.5]
}

/// Triangle fan from the last ring into the tip vertex.
fn cap(sink: &mut MeshSink<'_>, ring: &EmittedRing, tip: usize) {
    let n = ring.resolution;
    for k in 0..n {
        let next = (k + 1) % n;
        sink.face(
            vec![ring.start + k, ring.start + next, tip],
            &[disc_uv(k, n), disc_uv(next, n), [0.5, 0.5]],
            MaterialSlot::Bark,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{compute_frames, tangents};
    use crate::node::{copy_nodes, positions};
    use crate::settings::BuildMode;
    use approx::assert_relative_eq;
    use grovemesh_core::{Node, Point3f, TreeMesh};

    fn column(thicknesses: &[f32]) -> Vec<BuildNode> {
        copy_nodes(
            &thicknesses
                .iter()
                .enumerate()
                .map(|(i, &t)| Node::new(Point3f::new(0.0, 0.0, i as f32), 0.1).with_thickness(t))
                .collect::<Vec<_>>(),
        )
    }

    fn build(nodes: &[BuildNode], settings: &BuildSettings, is_trunk: bool) -> (TreeMesh, Vec<RingPlan>) {
        let pos = positions(nodes, PoseKind::Current);
        let frames = compute_frames(&pos);
        let tans: Vec<Vector3f> = frames.iter().map(|f| f.tangent).collect();
        let plans = plan_rings(nodes, &tans, nodes[0].thickness, settings);
        let attributes = vec![VertexAttributes::default(); nodes.len()];
        let mut mesh = TreeMesh::new();
        let mut sink = MeshSink::new(&mut mesh, BuildMode::Full, Point3f::origin());
        let branch = RingBranch {
            nodes,
            frames: &frames,
            attributes: &attributes,
            kind: PoseKind::Current,
            base_thickness: nodes[0].thickness,
            uv_offset: [0.0, 0.0],
            is_trunk,
        };
        let written = emit_rings(&branch, &plans, settings, &mut sink);
        assert_eq!(written, mesh.vertex_count());
        (mesh, plans)
    }

    #[test]
    fn test_target_resolution_clamps_to_three() {
        assert_eq!(target_resolution(16, 1.0, 0.0), 3);
        assert_eq!(target_resolution(16, 0.0, 0.0), 16);
        assert_eq!(target_resolution(16, 0.5, 0.5), 12);
    }

    #[test]
    fn test_two_node_branch_counts() {
        let settings = BuildSettings::default()
            .with_profile_resolution(8)
            .with_resolution_reduction(0.0);
        let (mesh, plans) = build(&column(&[1.0, 1.0]), &settings, false);
        assert_eq!(plans.len(), 2);
        assert_eq!(mesh.vertex_count(), 17);
        assert_eq!(mesh.face_arity_counts(), (8, 8, 0));
        mesh.assert_consistent();
    }

    #[test]
    fn test_resolution_drops_by_one_per_ring() {
        let settings = BuildSettings::default()
            .with_profile_resolution(12)
            .with_resolution_reduction(1.0);
        let nodes = column(&[1.0, 0.2, 0.1, 0.05, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let (mesh, plans) = build(&nodes, &settings, false);
        let res: Vec<usize> = plans.iter().map(|p| p.resolution).collect();
        assert_eq!(res, vec![12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 3]);
        mesh.assert_consistent();

        let triangles = mesh.face_arity_counts().0;
        // one wedge per step plus the tip fan
        assert_eq!(triangles, 9 + 3);
    }

    #[test]
    fn test_step_to_three_adds_twist() {
        let settings = BuildSettings::default()
            .with_profile_resolution(4)
            .with_resolution_reduction(1.0);
        let nodes = column(&[1.0, 0.0]);
        let tans = tangents(&positions(&nodes, PoseKind::Current));
        let plans = plan_rings(&nodes, &tans, 1.0, &settings);
        assert_eq!(plans[1].resolution, 3);
        assert_relative_eq!(plans[1].twist, STEP_TO_TRIANGLE_TWIST);
    }

    #[test]
    fn test_resolution_never_rises() {
        let settings = BuildSettings::default().with_resolution_reduction(1.0);
        let nodes = column(&[0.3, 1.0, 1.0, 0.5]);
        let tans = tangents(&positions(&nodes, PoseKind::Current));
        let plans = plan_rings(&nodes, &tans, 0.3, &settings);
        for pair in plans.windows(2) {
            assert!(pair[1].resolution <= pair[0].resolution);
            assert!(pair[0].resolution - pair[1].resolution <= 1);
        }
    }

    #[test]
    fn test_edge_loop_reduction_skips_straight_nodes() {
        let settings = BuildSettings::default().with_edge_loop_reduction(0.9);
        let nodes = column(&[1.0; 8]);
        let tans = tangents(&positions(&nodes, PoseKind::Current));
        let plans = plan_rings(&nodes, &tans, 1.0, &settings);
        let kept: Vec<usize> = plans.iter().map(|p| p.node).collect();
        assert_eq!(kept, vec![0, 1, 7]);
    }

    #[test]
    fn test_edge_loop_threshold_relaxes_with_each_skip() {
        let nodes = column(&[1.0; 30]);
        let tans = tangents(&positions(&nodes, PoseKind::Current));
        let kept = |threshold: f32| -> Vec<usize> {
            let settings = BuildSettings::default().with_edge_loop_reduction(threshold);
            plan_rings(&nodes, &tans, 1.0, &settings).iter().map(|p| p.node).collect()
        };
        // a straight run still gets a ring once the threshold climbs past 1
        assert_eq!(kept(0.9), vec![0, 1, 13, 25, 29]);
        assert_eq!(kept(0.995), vec![0, 1, 12, 23, 29]);
    }

    #[test]
    fn test_edge_loop_reduction_keeps_nodes_with_sub_branches() {
        let settings = BuildSettings::default().with_edge_loop_reduction(0.9);
        let mut nodes = column(&[1.0; 6]);
        nodes[3].has_sub_branches = true;
        let tans = tangents(&positions(&nodes, PoseKind::Current));
        let kept: Vec<usize> = plan_rings(&nodes, &tans, 1.0, &settings).iter().map(|p| p.node).collect();
        assert_eq!(kept, vec![0, 1, 3, 5]);
    }

    #[test]
    fn test_texture_v_grows_along_branch() {
        let settings = BuildSettings::default()
            .with_profile_resolution(6)
            .with_resolution_reduction(0.0)
            .with_uv(1.0, 1.0);
        let (mesh, _) = build(&column(&[1.0, 1.0, 1.0]), &settings, false);
        let expected = 1.0 / (TAU * 0.1);
        // corner 2 of the first quad sits on the second ring
        assert_relative_eq!(mesh.uvs[2][1], expected, epsilon = 1e-4);
        assert_relative_eq!(mesh.uvs[0][1], 0.0);
    }

    #[test]
    fn test_root_flare_widens_trunk_base() {
        let settings = BuildSettings::default()
            .with_profile_resolution(8)
            .with_resolution_reduction(0.0)
            .with_roots(0.5, 0.01, 2.0, 0.0);
        let nodes = column(&[1.0, 1.0, 1.0, 1.0]);
        let (flared, _) = build(&nodes, &settings, true);
        let (plain, _) = build(&nodes, &settings, false);
        let r_flared = flared.vertices[0].coords.xy().norm();
        let r_plain = plain.vertices[0].coords.xy().norm();
        assert!(r_flared > r_plain * 1.5);
        // beyond the reach the rings are untouched
        assert_relative_eq!(flared.vertices[16], plain.vertices[16], epsilon = 1e-6);
    }

    #[test]
    fn test_root_bump_shapes_base_rings() {
        let settings = BuildSettings::default()
            .with_profile_resolution(8)
            .with_resolution_reduction(0.0)
            .with_roots(0.5, 0.01, 2.0, 1.0);
        let (mesh, plans) = build(&column(&[1.0, 1.0, 1.0, 1.0]), &settings, true);
        assert!(plans.iter().all(|p| p.resolution == 8));

        // reach is 2 nodes, so rings 0 and 1 flare
        let expected = |j: usize, i: usize| {
            let multiplier = (1.0 - j as f32 / 2.0).powf(0.75);
            let radius = 0.1 + 0.1 * multiplier;
            let amount = multiplier * 0.2 * radius;
            let t = i as f32 / 8.0 * TAU;
            radius + amount * (1.0 + 0.5 * (6.0 * t).sin()) + amount * (1.0 + 0.5 * (9.0 * t).cos()) * 0.5
        };
        for j in 0..3 {
            for i in 0..8 {
                let r = mesh.vertices[j * 8 + i].coords.xy().norm();
                assert_relative_eq!(r, expected(j, i), epsilon = 1e-5);
            }
        }
        assert_relative_eq!(mesh.vertices[0].coords.xy().norm(), 0.27, epsilon = 1e-5);
        assert!((mesh.vertices[1].coords.xy().norm() - mesh.vertices[0].coords.xy().norm()).abs() > 1e-3);
    }
}
