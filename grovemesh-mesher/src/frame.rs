//! Rotation-minimizing frames along a branch polyline.
//!
//! Tangents come from the neighbouring segments. The first axis is world up
//! projected off the first tangent; every following axis is carried over with
//! the double-reflection method (Wang et al. 2008), which keeps the frame free
//! of twist about the curve.

use grovemesh_core::{world_up, Frame, Point3f, Vector3f};
use log::warn;

const EPSILON: f32 = 1e-8;

/// Unit tangent per node.
///
/// The first node uses the first segment, the last node the last segment, and
/// interior nodes the normalized mean of their two unit segment directions.
pub fn tangents(positions: &[Point3f]) -> Vec<Vector3f> {
    let n = positions.len();
    if n < 2 {
        return vec![Vector3f::z(); n];
    }

    let segments: Vec<Vector3f> = positions.windows(2).map(|w| w[1] - w[0]).collect();
    let mut last_valid = segments
        .iter()
        .find_map(|s| s.try_normalize(EPSILON))
        .unwrap_or_else(Vector3f::z);

    let mut units = Vec::with_capacity(segments.len());
    for (i, s) in segments.iter().enumerate() {
        match s.try_normalize(EPSILON) {
            Some(u) => {
                last_valid = u;
                units.push(u);
            }
            None => {
                warn!("zero-length segment {} of {}, reusing neighbouring direction", i, segments.len());
                units.push(last_valid);
            }
        }
    }

    (0..n)
        .map(|j| {
            if j == 0 {
                units[0]
            } else if j == n - 1 {
                units[j - 1]
            } else {
                (units[j - 1] + units[j])
                    .try_normalize(EPSILON)
                    .unwrap_or(units[j])
            }
        })
        .collect()
}

/// Initial axis: world up with its tangent component removed.
/// Falls back to world Y when the tangent is vertical.
pub fn initial_axis(tangent: &Vector3f) -> Vector3f {
    let project = |reference: Vector3f| (reference - tangent * tangent.dot(&reference)).try_normalize(1e-4);
    project(world_up())
        .or_else(|| project(Vector3f::y()))
        .unwrap_or_else(|| {
            warn!("could not derive an axis for tangent {:?}", tangent);
            Vector3f::y()
        })
}

/// Carry `axis` from node `p0` (tangent `t0`) to node `p1` (tangent `t1`).
///
/// First reflection: across the plane bisecting the segment. Second
/// reflection: across the plane that maps the reflected tangent onto `t1`.
/// A zero-length segment keeps the axis unchanged.
pub fn propagate_axis(
    p0: &Point3f,
    t0: &Vector3f,
    axis: &Vector3f,
    p1: &Point3f,
    t1: &Vector3f,
) -> Vector3f {
    let v1 = p1 - p0;
    let c1 = v1.dot(&v1);
    if c1 < EPSILON {
        warn!("zero-length segment at {:?}, holding frame axis", p1);
        return reorthonormalize(axis, t1);
    }

    let axis_l = axis - v1 * (2.0 / c1 * v1.dot(axis));
    let tangent_l = t0 - v1 * (2.0 / c1 * v1.dot(t0));

    let v2 = t1 - tangent_l;
    let c2 = v2.dot(&v2);
    let reflected = if c2 < EPSILON {
        axis_l
    } else {
        axis_l - v2 * (2.0 / c2 * v2.dot(&axis_l))
    };

    reorthonormalize(&reflected, t1)
}

/// Remove drift: project `axis` off `tangent` and normalize.
fn reorthonormalize(axis: &Vector3f, tangent: &Vector3f) -> Vector3f {
    (axis - tangent * tangent.dot(axis))
        .try_normalize(EPSILON)
        .unwrap_or_else(|| {
            warn!("degenerate axis after propagation, deriving a fresh one");
            initial_axis(tangent)
        })
}

/// Frames for every node of a polyline.
pub fn compute_frames(positions: &[Point3f]) -> Vec<Frame> {
    let tangents = tangents(positions);
    let mut frames: Vec<Frame> = Vec::with_capacity(positions.len());

    for (j, tangent) in tangents.iter().enumerate() {
        let axis = match frames.last() {
            None => initial_axis(tangent),
            Some(prev) => propagate_axis(
                &positions[j - 1],
                &prev.tangent,
                &prev.axis,
                &positions[j],
                tangent,
            ),
        };
        frames.push(Frame::new(*tangent, axis));
    }

    frames
}

/// Cumulative arc length: `dist[0] = 0`, `dist[j] = dist[j-1] + |p[j] - p[j-1]|`.
pub fn arc_lengths(positions: &[Point3f]) -> Vec<f32> {
    let mut dist = Vec::with_capacity(positions.len());
    let mut total = 0.0;
    for (j, p) in positions.iter().enumerate() {
        if j > 0 {
            total += (p - positions[j - 1]).norm();
        }
        dist.push(total);
    }
    dist
}
