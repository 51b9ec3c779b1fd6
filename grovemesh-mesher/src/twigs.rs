//! Twig duplicator triangles.
//!
//! Tiny triangles marking where an external particle system should place
//! apical and lateral twigs. The triangle's local X axis points along the
//! twig direction.

use crate::frame::{arc_lengths, initial_axis};
use crate::node::{copy_nodes, positions, PoseKind};
use crate::recorder::{pitch, AttributeContext};
use crate::settings::TwigSettings;
use crate::sink::MeshSink;
use grovemesh_core::{Branch, MaterialSlot, Point3f, UnitQuaternion, Vector3f, VertexAttributes};
use nalgebra::Unit;
use std::f32::consts::{PI, TAU};

const DUPLICATOR: [[f32; 3]; 3] = [[0.0, -0.001, -0.001], [0.0, 0.001, -0.001], [0.0, 0.0, 0.001]];
/// Apical twigs only grow on tips younger than this.
const APICAL_AGE_LIMIT: f32 = 4.0;
/// Elevation above the horizon beyond which an apical twig counts as upward.
const UPWARD_ELEVATION: f32 = 0.8;

/// Which twig layer a duplicator lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwigKind {
    Apical,
    Upward,
    Lateral,
    Dead,
}

/// Rotation taking local X onto `direction`.
fn align_x(direction: &Vector3f) -> UnitQuaternion<f32> {
    UnitQuaternion::rotation_between(&Vector3f::x(), direction)
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3f::z_axis(), PI))
}

/// Number of lateral twigs per node.
pub fn lateral_count(branching: u32, power: f32) -> u32 {
    let count = (branching as f32 * power.min(1.0)).max(0.0) as u32;
    if branching > 1 && count < 2 {
        2
    } else if branching == 1 && count == 0 {
        1
    } else {
        count
    }
}

/// Direction of one lateral twig: `direction` tilted by `angle`, spun by
/// `spin` about it, then pulled toward the horizontal by `plagiotropism`.
pub fn deviate(direction: &Vector3f, angle: f32, spin: f32, plagiotropism: f32) -> Vector3f {
    let Some(d) = direction.try_normalize(1e-9) else {
        return *direction;
    };
    let side = UnitQuaternion::from_axis_angle(&Unit::new_unchecked(d), spin) * initial_axis(&d);
    let tilt_axis = d.cross(&side);
    let tilted = match Unit::try_new(tilt_axis, 1e-9) {
        Some(axis) => UnitQuaternion::from_axis_angle(&axis, angle) * d,
        None => d,
    };
    let flat = Vector3f::new(tilted.x, tilted.y, 0.0);
    match flat.try_normalize(1e-6) {
        Some(flat) => tilted
            .lerp(&flat, plagiotropism.clamp(0.0, 1.0))
            .try_normalize(1e-9)
            .unwrap_or(tilted),
        None => tilted,
    }
}

fn flags(kind: TwigKind) -> VertexAttributes {
    let mut attrs = VertexAttributes::default();
    match kind {
        TwigKind::Apical => attrs.apical = 1.0,
        TwigKind::Upward => attrs.upward = 1.0,
        TwigKind::Lateral => attrs.lateral = 1.0,
        TwigKind::Dead => attrs.dead_twig = 1.0,
    }
    attrs
}

fn emit_duplicator(
    sink: &mut MeshSink<'_>,
    at: Point3f,
    direction: &Vector3f,
    base: &VertexAttributes,
    kind: TwigKind,
) {
    let rotation = align_x(direction);
    let marker = flags(kind);
    let attrs = VertexAttributes {
        apical: marker.apical,
        upward: marker.upward,
        lateral: marker.lateral,
        dead_twig: marker.dead_twig,
        pitch: pitch(direction),
        ..*base
    };
    let first = sink.count();
    for corner in DUPLICATOR {
        sink.vertex(at + rotation * Vector3f::from(corner), &attrs);
    }
    sink.face(vec![first, first + 1, first + 2], &[[0.5, 0.5]; 3], MaterialSlot::Twig);
}

/// Emit the apical and lateral twigs of `branch`. Returns the number of
/// vertices written.
pub fn emit_twigs(
    branch: &Branch,
    kind: PoseKind,
    context: &AttributeContext,
    settings: &TwigSettings,
    twist: f32,
    sink: &mut MeshSink<'_>,
) -> usize {
    let nodes = copy_nodes(&branch.nodes);
    if nodes.len() < 2 {
        return 0;
    }
    let start = sink.count();
    let pos = positions(&nodes, kind);
    let dist = arc_lengths(&pos);
    let last = nodes.len() - 1;

    let segment = |i: usize| {
        let d = pos[i + 1] - pos[i];
        if d.norm_squared() > 0.0 {
            d
        } else {
            nodes[i].direction
        }
    };

    let tip = &nodes[last];
    if tip.age < APICAL_AGE_LIMIT {
        let direction = segment(last - 1);
        let twig = if branch.dead || tip.dead {
            TwigKind::Dead
        } else {
            let elevation = (direction.z / direction.norm()).clamp(-1.0, 1.0).asin();
            if elevation > UPWARD_ELEVATION {
                TwigKind::Upward
            } else {
                TwigKind::Apical
            }
        };
        let base = context.node(tip, &direction, dist[last]);
        emit_duplicator(sink, pos[last], &direction, &base, twig);
    }

    for (i, (node, skeleton_node)) in nodes.iter().zip(&branch.nodes).enumerate().skip(1) {
        if node.age > settings.lateral_twig_age_limit + settings.dead_twig_wither {
            continue;
        }
        if i == last && !settings.lateral_on_apical {
            continue;
        }
        if skeleton_node.sub_branches.first().is_some_and(|b| b.len() > 2) {
            continue;
        }

        let direction = if i == last { node.direction } else { segment(i) };
        let twig = if node.age > settings.lateral_twig_age_limit || branch.dead {
            TwigKind::Dead
        } else {
            TwigKind::Lateral
        };
        let count = lateral_count(settings.branching, branch.power);
        for k in 0..count {
            let spin = branch.initial_phyllotaxic_angle + i as f32 * twist + k as f32 * TAU / count as f32;
            let twig_direction = deviate(&direction, settings.branch_angle, spin, settings.plagiotropism);
            let base = context.node(node, &twig_direction, dist[i]);
            emit_duplicator(sink, pos[i], &twig_direction, &base, twig);
        }
    }

    sink.count() - start
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::BuildMode;
    use approx::assert_relative_eq;
    use grovemesh_core::{AttributeKind, Node, TreeMesh};

    fn young_branch(direction: Vector3f) -> Branch {
        Branch::new(
            (0..4)
                .map(|i| Node::new(Point3f::origin() + direction * i as f32, 0.01).with_age(1.0))
                .collect(),
        )
    }

    fn emit(branch: &Branch, settings: &TwigSettings) -> TreeMesh {
        let mut mesh = TreeMesh::new();
        let mut sink = MeshSink::new(&mut mesh, BuildMode::Full, Point3f::origin());
        let context = AttributeContext {
            tree_age: 5.0,
            base_weight: 1.0,
            ..Default::default()
        };
        emit_twigs(branch, PoseKind::Current, &context, settings, 0.0, &mut sink);
        mesh
    }

    #[test]
    fn test_lateral_count_promotion() {
        assert_eq!(lateral_count(3, 1.0), 3);
        assert_eq!(lateral_count(3, 0.2), 2);
        assert_eq!(lateral_count(1, 0.1), 1);
        assert_eq!(lateral_count(0, 1.0), 0);
    }

    #[test]
    fn test_deviate_tilts_by_branch_angle() {
        let d = Vector3f::new(1.0, 0.0, 0.0);
        for k in 0..4 {
            let t = deviate(&d, 0.5, k as f32, 0.0);
            assert_relative_eq!(t.angle(&d), 0.5, epsilon = 1e-4);
        }
        let flat = deviate(&Vector3f::z(), 0.3, 0.0, 1.0);
        assert_relative_eq!(flat.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_duplicator_points_along_direction() {
        let q = align_x(&Vector3f::new(0.0, 1.0, 0.0));
        assert_relative_eq!(q * Vector3f::x(), Vector3f::y(), epsilon = 1e-6);
        let q = align_x(&-Vector3f::x());
        assert_relative_eq!(q * Vector3f::x(), -Vector3f::x(), epsilon = 1e-6);
    }

    #[test]
    fn test_upward_branch_gets_upward_tip_and_laterals() {
        let settings = TwigSettings {
            enabled: true,
            branching: 2,
            ..Default::default()
        };
        let mesh = emit(&young_branch(Vector3f::z()), &settings);
        // one apical plus two laterals at nodes 1 and 2
        assert_eq!(mesh.face_count(), 5);
        assert_eq!(mesh.vertex_count(), 15);
        assert!(mesh.face_materials.iter().all(|m| *m == MaterialSlot::Twig));
        assert_eq!(&mesh.layer(AttributeKind::Upward)[..3], &[1.0; 3]);
        assert_eq!(mesh.layer(AttributeKind::Lateral).iter().sum::<f32>(), 12.0);
        mesh.assert_consistent();
    }

    #[test]
    fn test_horizontal_dead_branch_gets_dead_twigs() {
        let mut branch = young_branch(Vector3f::x());
        branch.dead = true;
        let settings = TwigSettings {
            enabled: true,
            branching: 1,
            lateral_on_apical: true,
            ..Default::default()
        };
        let mesh = emit(&branch, &settings);
        assert_eq!(mesh.face_count(), 4);
        assert!(mesh.layer(AttributeKind::DeadTwig).iter().all(|v| *v == 1.0));
    }

    #[test]
    fn test_old_nodes_get_no_twigs() {
        let branch = Branch::new(
            (0..3)
                .map(|i| Node::new(Point3f::new(i as f32, 0.0, 0.0), 0.01).with_age(10.0))
                .collect(),
        );
        let settings = TwigSettings {
            enabled: true,
            ..Default::default()
        };
        assert!(emit(&branch, &settings).is_empty());
    }
}
