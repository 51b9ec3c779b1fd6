//! Core traits for grovemesh

use crate::{mesh::TreeMesh, point::*};

/// Trait for drawable/renderable objects
pub trait Drawable {
    /// Get the bounding box of the object
    fn bounding_box(&self) -> (Point3f, Point3f);

    /// Get the center point of the object
    fn center(&self) -> Point3f {
        let (min, max) = self.bounding_box();
        Point3f::new(
            (min.x + max.x) / 2.0,
            (min.y + max.y) / 2.0,
            (min.z + max.z) / 2.0,
        )
    }
}

fn bounds_of(points: &[Point3f]) -> (Point3f, Point3f) {
    if points.is_empty() {
        return (Point3f::origin(), Point3f::origin());
    }

    let mut min = points[0];
    let mut max = points[0];

    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        min.z = min.z.min(p.z);

        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
        max.z = max.z.max(p.z);
    }

    (min, max)
}

impl Drawable for TreeMesh {
    /// Bounds of the vertices, or of the shape key for shape-only builds.
    fn bounding_box(&self) -> (Point3f, Point3f) {
        if self.vertices.is_empty() {
            bounds_of(&self.shape)
        } else {
            bounds_of(&self.vertices)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VertexAttributes;
    use approx::assert_relative_eq;

    #[test]
    fn test_mesh_bounds() {
        let mut mesh = TreeMesh::new();
        mesh.push_vertex(Point3f::new(-1.0, 0.0, 2.0), &VertexAttributes::default());
        mesh.push_vertex(Point3f::new(1.0, 3.0, 0.0), &VertexAttributes::default());
        let (min, max) = mesh.bounding_box();
        assert_relative_eq!(min, Point3f::new(-1.0, 0.0, 0.0));
        assert_relative_eq!(max, Point3f::new(1.0, 3.0, 2.0));
        assert_relative_eq!(mesh.center(), Point3f::new(0.0, 1.5, 1.0));
    }

    #[test]
    fn test_shape_only_bounds() {
        let mut mesh = TreeMesh::new();
        mesh.push_shape_point(Point3f::new(0.0, 0.0, 4.0));
        mesh.push_shape_point(Point3f::new(0.0, 0.0, 1.0));
        let (min, max) = mesh.bounding_box();
        assert_relative_eq!(min.z, 1.0);
        assert_relative_eq!(max.z, 4.0);
    }
}
