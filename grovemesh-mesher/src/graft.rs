//! Frond grafting: deform a template mesh onto a branch polyline by
//! arc-length resampling.

use crate::settings::FrondSettings;
use crate::sink::MeshSink;
use grovemesh_core::{Frame, FrondTemplate, MaterialSlot, Point3f, Vector3f, VertexAttributes};
use itertools::Itertools;
use log::debug;

/// Indices of the two samples of the sorted `dist` bracketing `x`.
///
/// Values before the first sample clamp to `[0, 1]`, values past the last
/// clamp to `[len - 2, len - 1]`. A value equal to a sample brackets from
/// below.
///
/// # Panics
/// When `dist` has fewer than two samples.
pub fn take_boundaries(dist: &[f32], x: f32) -> [usize; 2] {
    assert!(dist.len() >= 2, "need at least two samples, got {}", dist.len());
    let pos = dist.partition_point(|d| *d < x);
    if pos == 0 {
        [0, 1]
    } else if pos == dist.len() {
        [dist.len() - 2, dist.len() - 1]
    } else {
        [pos - 1, pos]
    }
}

/// `1 + stretch * (branch_length / template_length - 1)`.
pub fn stretch_factor(stretch: f32, branch_length: f32, template_length: f32) -> f32 {
    if template_length <= 0.0 {
        return 1.0;
    }
    1.0 + stretch * (branch_length / template_length - 1.0)
}

/// Branch data a template is resampled onto.
pub struct GraftTarget<'a> {
    pub positions: &'a [Point3f],
    pub frames: &'a [Frame],
    /// Cumulative arc length of `positions`.
    pub dist: &'a [f32],
    /// Per-node attribute values, aligned with `positions`.
    pub attributes: &'a [VertexAttributes],
}

impl GraftTarget<'_> {
    pub fn length(&self) -> f32 {
        self.dist.last().copied().unwrap_or(0.0)
    }

    /// World position and interpolation data of a local template point.
    ///
    /// The point is expressed in the lower bracket's frame only, with its X
    /// re-based onto that node.
    pub fn place(&self, local: &Vector3f) -> (Point3f, [usize; 2], f32) {
        let [lo, hi] = take_boundaries(self.dist, local.x);
        let span = self.dist[hi] - self.dist[lo];
        let fraction = if span > 0.0 {
            ((local.x - self.dist[lo]) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let rebased = Vector3f::new(local.x - self.dist[lo], local.y, local.z);
        let world = self.positions[lo] + self.frames[lo].transform_vector(&rebased);
        (world, [lo, hi], fraction)
    }
}

/// Write `template` deformed onto `target`. Returns the number of vertices written.
pub fn graft_template(
    template: &FrondTemplate,
    target: &GraftTarget<'_>,
    settings: &FrondSettings,
    sink: &mut MeshSink<'_>,
) -> usize {
    assert!(
        target.dist.iter().tuple_windows().all(|(a, b)| b >= a),
        "arc length must be non-decreasing"
    );

    let branch_length = target.length();
    let template_length = template.length();
    let sx = stretch_factor(settings.stretch_x, branch_length, template_length);
    let syz = stretch_factor(settings.stretch_yz, branch_length, template_length);
    debug!(
        "grafting '{}' ({:.3}) onto branch of length {:.3}, stretch {:.3}/{:.3}",
        template.name, template_length, branch_length, sx, syz
    );

    let offset = sink.count();
    for vertex in &template.vertices {
        let local = Vector3f::new(vertex.x * sx, vertex.y * syz, vertex.z * syz);
        let (world, [lo, hi], fraction) = target.place(&local);

        let mut attributes = target.attributes[lo].lerp(&target.attributes[hi], fraction);
        attributes.frond = 1.0;
        attributes.height = if template_length > 0.0 {
            (vertex.x / template_length).clamp(0.0, 1.0)
        } else {
            0.0
        };
        sink.vertex(world, &attributes);
    }

    for ((face, corners), material) in template.faces.iter().zip(&template.uvs).zip(&template.material_ids) {
        let face = face.iter().map(|i| i + offset).collect();
        sink.face(face, corners, MaterialSlot::Frond(*material));
    }

    template.vertex_count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{arc_lengths, compute_frames};
    use crate::settings::BuildMode;
    use approx::assert_relative_eq;
    use grovemesh_core::TreeMesh;

    fn ladder(length: f32) -> FrondTemplate {
        FrondTemplate::new(
            "ladder",
            vec![
                Point3f::new(0.0, -0.1, 0.0),
                Point3f::new(0.0, 0.1, 0.0),
                Point3f::new(length * 0.5, 0.1, 0.05),
                Point3f::new(length * 0.5, -0.1, 0.05),
                Point3f::new(length, 0.1, 0.0),
                Point3f::new(length, -0.1, 0.0),
            ],
            vec![vec![0, 1, 2, 3], vec![3, 2, 4, 5]],
            vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 0.5], [0.0, 0.5]]; 2],
            vec![0, 1],
        )
        .unwrap()
    }

    fn graft(template: &FrondTemplate, positions: &[Point3f], settings: &FrondSettings) -> TreeMesh {
        let frames = compute_frames(positions);
        let dist = arc_lengths(positions);
        let attributes: Vec<VertexAttributes> = dist
            .iter()
            .map(|d| VertexAttributes {
                branch_distance: *d,
                ..Default::default()
            })
            .collect();
        let target = GraftTarget {
            positions,
            frames: &frames,
            dist: &dist,
            attributes: &attributes,
        };
        let mut mesh = TreeMesh::new();
        let mut sink = MeshSink::new(&mut mesh, BuildMode::Full, Point3f::origin());
        let written = graft_template(template, &target, settings, &mut sink);
        assert_eq!(written, template.vertex_count());
        mesh
    }

    fn no_stretch() -> FrondSettings {
        FrondSettings {
            stretch_x: 0.0,
            stretch_yz: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_take_boundaries() {
        let dist = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(take_boundaries(&dist, 0.5), [0, 1]);
        assert_eq!(take_boundaries(&dist, -1.0), [0, 1]);
        assert_eq!(take_boundaries(&dist, 10.0), [2, 3]);
        assert_eq!(take_boundaries(&dist, 2.0), [1, 2]);
        assert_eq!(take_boundaries(&dist, 2.5), [2, 3]);
    }

    #[test]
    fn test_stretch_factor() {
        assert_relative_eq!(stretch_factor(1.0, 2.0, 1.0), 2.0);
        assert_relative_eq!(stretch_factor(0.0, 2.0, 1.0), 1.0);
        assert_relative_eq!(stretch_factor(0.5, 3.0, 1.0), 2.0);
    }

    #[test]
    fn test_graft_on_straight_branch_is_rigid() {
        let template = ladder(2.0);
        let positions: Vec<Point3f> = (0..5).map(|i| Point3f::new(0.0, 0.0, i as f32 * 0.5)).collect();
        let mesh = graft(&template, &positions, &no_stretch());

        for i in 0..template.vertex_count() {
            for j in 0..template.vertex_count() {
                let expected = (template.vertices[i] - template.vertices[j]).norm();
                let actual = (mesh.vertices[i] - mesh.vertices[j]).norm();
                assert_relative_eq!(actual, expected, epsilon = 1e-5);
            }
        }
        // X runs along the branch
        assert_relative_eq!(mesh.vertices[4].z, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_graft_copies_faces_and_materials() {
        let template = ladder(1.0);
        let positions = [Point3f::origin(), Point3f::new(1.0, 0.0, 0.0)];
        let mesh = graft(&template, &positions, &no_stretch());

        mesh.assert_consistent();
        assert_eq!(mesh.faces, template.faces);
        assert_eq!(mesh.uvs.len(), template.corner_count());
        assert_eq!(mesh.face_materials, vec![MaterialSlot::Frond(0), MaterialSlot::Frond(1)]);
        assert!(mesh.layer(grovemesh_core::AttributeKind::Frond).iter().all(|f| *f == 1.0));
        assert_relative_eq!(mesh.layer(grovemesh_core::AttributeKind::Height)[4], 1.0);
    }

    #[test]
    fn test_graft_interpolates_attributes() {
        let template = ladder(1.0);
        let positions = [Point3f::origin(), Point3f::new(0.0, 0.0, 1.0)];
        let mesh = graft(&template, &positions, &no_stretch());
        let distance = mesh.layer(grovemesh_core::AttributeKind::BranchDistance);
        assert_relative_eq!(distance[0], 0.0);
        assert_relative_eq!(distance[2], 0.5);
        assert_relative_eq!(distance[4], 1.0);
    }

    #[test]
    fn test_stretch_scales_to_branch_length() {
        let template = ladder(1.0);
        let positions: Vec<Point3f> = (0..3).map(|i| Point3f::new(i as f32, 0.0, 0.0)).collect();
        let settings = FrondSettings {
            stretch_x: 1.0,
            stretch_yz: 0.0,
            ..Default::default()
        };
        let mesh = graft(&template, &positions, &settings);
        assert_relative_eq!(mesh.vertices[4].x, 2.0, epsilon = 1e-5);
        assert_relative_eq!((mesh.vertices[4] - mesh.vertices[5]).norm(), 0.2, epsilon = 1e-5);
    }
}
