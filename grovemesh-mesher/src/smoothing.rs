//! Joint smoothing where a child branch meets its parent, the trunk root node,
//! and the radius taper pass.

use crate::node::{BuildNode, PoseKind};
use grovemesh_core::{lerp, lerp_point, Vector3f};
use log::debug;

/// Parent radius at which smoothing reaches full strength.
const FULL_SMOOTHING_RADIUS: f32 = 0.05;
const SMOOTHING_EXPONENT: f32 = 0.7;
/// Maximum depth of the synthetic trunk root below the first node.
const ROOT_DEPTH_LIMIT: f32 = 0.05;
/// First node index touched by the taper pass.
const TAPER_START: usize = 5;

/// Parent nodes around the point where a sub-branch is attached.
#[derive(Debug, Clone)]
pub struct Joint {
    pub previous: BuildNode,
    pub current: BuildNode,
    pub next: Option<BuildNode>,
}

/// How the second node of a branch relates to the parent's surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointCase {
    /// Second node sticks out of the parent's radius envelope.
    Outside,
    /// Second node is buried inside the parent.
    Engulfed,
}

impl Joint {
    /// Classify a child by the perpendicular distance of its second node from
    /// the parent's lead direction. Always decided on the current pose.
    pub fn classify(&self, second: &BuildNode) -> JointCase {
        let parent = &self.current.current;
        let lead = match &self.next {
            Some(next) => next.current.position - parent.position,
            None => self.current.direction,
        };
        let sub = second.current.position - parent.position;
        let distance = match lead.try_normalize(1e-12) {
            Some(lead) => lead.cross(&sub).norm(),
            None => sub.norm(),
        };
        if distance > parent.radius {
            JointCase::Outside
        } else {
            JointCase::Engulfed
        }
    }
}

/// `a / b`, or 1 when `b` is not positive.
fn radius_ratio(a: f32, b: f32) -> f32 {
    if b > 0.0 {
        a / b
    } else {
        1.0
    }
}

/// Produce the node list a branch is meshed from.
///
/// Child branches get their first node replaced by three transition nodes
/// (two more nodes than the skeleton branch in both joint cases, so growth
/// and wind builds keep the same topology). A trunk whose first node does
/// not point straight up gets a root node prepended.
pub fn smooth_branch(nodes: &[BuildNode], joint: Option<&Joint>, is_trunk: bool) -> Vec<BuildNode> {
    let mut smoothed = match joint {
        Some(joint) if nodes.len() >= 2 => smooth_joint(nodes, joint),
        _ => nodes.to_vec(),
    };
    if is_trunk {
        prepend_root(&mut smoothed);
    }
    smoothed
}

fn smooth_joint(nodes: &[BuildNode], joint: &Joint) -> Vec<BuildNode> {
    let case = joint.classify(&nodes[1]);
    debug!("joint smoothing: {:?}", case);
    let transition = match case {
        JointCase::Outside => outside_transition(nodes, joint),
        JointCase::Engulfed => engulfed_transition(nodes, joint),
    };
    let mut smoothed = Vec::with_capacity(nodes.len() + 2);
    smoothed.extend(transition);
    smoothed.extend_from_slice(&nodes[1..]);
    smoothed
}

/// Three nodes blending from the parent's previous node into the child.
fn outside_transition(nodes: &[BuildNode], joint: &Joint) -> [BuildNode; 3] {
    let (first, second) = (&nodes[0], &nodes[1]);
    let pprev = &joint.previous;
    let parent = &joint.current;

    let mut start = BuildNode::synthetic_from(pprev);
    let mut middle = BuildNode::synthetic_from(pprev);
    let mut end = BuildNode::synthetic_from(first);
    end.weight = second.weight;
    end.thickness = parent.thickness;
    end.age = pprev.age;

    let keep_thin = radius_ratio(second.current.radius, parent.current.radius) < 0.25;

    for kind in PoseKind::BOTH {
        let f = first.pose(kind);
        let s = second.pose(kind);

        let smooth = (f.radius / FULL_SMOOTHING_RADIUS).min(1.0).powf(SMOOTHING_EXPONENT);
        let start_pose = start.pose_mut(kind);
        start_pose.position = lerp_point(&f.position, &pprev.pose(kind).position, smooth);
        start_pose.radius = parent.pose(kind).radius * 0.9;
        let start_position = start_pose.position;

        let halfway = lerp_point(&start_position, &s.position, 0.5);
        let middle_pose = middle.pose_mut(kind);
        middle_pose.position = lerp_point(&halfway, &f.position, 0.5);
        middle_pose.radius = if keep_thin {
            s.radius
        } else {
            (pprev.pose(kind).radius + f.radius) / 2.0
        };

        let mut position = lerp_point(&f.position, &s.position, 0.5);
        if let Some(third) = nodes.get(2) {
            let back = s.position + (s.position - third.pose(kind).position) / 2.0;
            position = ((position.coords * 2.0 + back.coords) / 3.0).into();
        }
        let end_pose = end.pose_mut(kind);
        end_pose.position = position;
        end_pose.radius = f.radius;
    }

    [start, middle, end]
}

/// Three nodes pulling the child into the parent's axis.
fn engulfed_transition(nodes: &[BuildNode], joint: &Joint) -> [BuildNode; 3] {
    let (first, second) = (&nodes[0], &nodes[1]);
    let pprev = &joint.previous;
    let parent = &joint.current;

    let mut start = BuildNode::synthetic_from(pprev);
    let mut middle = BuildNode::synthetic_from(pprev);
    let mut end = BuildNode::synthetic_from(pprev);
    end.thickness = second.thickness;

    let thin = radius_ratio(second.current.radius, parent.current.radius) < 0.5;

    for kind in PoseKind::BOTH {
        let f = first.pose(kind);
        let s = second.pose(kind);
        let p = parent.pose(kind);
        let pulled_radius = if thin { s.radius } else { f.radius };
        let midpoint = lerp_point(&f.position, &s.position, 0.5);

        // last-year radii keep the parent ring and the pulled child radius
        let (start_radius, middle_radius) = match kind {
            PoseKind::Current => {
                let weight = radius_ratio(pulled_radius, p.radius).max(0.0).sqrt();
                (lerp(pulled_radius, p.radius, weight), p.radius)
            }
            PoseKind::LastYear => (p.radius * 0.9, pulled_radius),
        };
        let start_pose = start.pose_mut(kind);
        start_pose.position = pprev.pose(kind).position;
        start_pose.radius = start_radius;

        let middle_pose = middle.pose_mut(kind);
        middle_pose.position = p.position;
        middle_pose.radius = middle_radius;

        let end_pose = end.pose_mut(kind);
        end_pose.position = lerp_point(&s.position, &midpoint, 0.5);
        end_pose.radius = (s.radius + pulled_radius) / 2.0;
    }

    [start, middle, end]
}

/// Prepend a node straight below the first one when the trunk base leans.
fn prepend_root(nodes: &mut Vec<BuildNode>) {
    let Some(first) = nodes.first() else {
        return;
    };
    if first.direction.x == 0.0 && first.direction.y == 0.0 {
        return;
    }
    let mut root = BuildNode::synthetic_from(first);
    root.direction = Vector3f::z();
    for kind in PoseKind::BOTH {
        let pose = root.pose_mut(kind);
        let depth = pose.radius.min(ROOT_DEPTH_LIMIT);
        pose.position.z -= depth;
    }
    debug!("trunk base leans, prepending root node");
    nodes.insert(0, root);
}

/// Raise nodes thinner than the mean of their neighbours, left to right.
pub fn taper_radii(nodes: &mut [BuildNode], kind: PoseKind) {
    let n = nodes.len();
    for o in TAPER_START..n.saturating_sub(1) {
        let mean = (nodes[o - 1].pose(kind).radius + nodes[o + 1].pose(kind).radius) / 2.0;
        let pose = nodes[o].pose_mut(kind);
        if pose.radius < mean {
            pose.radius = mean;
        }
    }
}
