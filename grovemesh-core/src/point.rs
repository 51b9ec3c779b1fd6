//! Point types and related functionality

use nalgebra::{Point3, Vector3};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// Texture coordinates of one face corner
pub type Uv = [f32; 2];

/// World up. The skeleton is Z-up.
pub fn world_up() -> Vector3f {
    Vector3f::z()
}

/// Linear blend `a + (b - a) * t` of two points.
pub fn lerp_point(a: &Point3f, b: &Point3f, t: f32) -> Point3f {
    a + (b - a) * t
}

/// Linear blend of two scalars.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// True when every coordinate is finite.
pub fn is_finite_point(p: &Point3f) -> bool {
    p.x.is_finite() && p.y.is_finite() && p.z.is_finite()
}
