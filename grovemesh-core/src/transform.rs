//! Per-node orthonormal frames

use crate::point::*;
use nalgebra::{Matrix3, Unit, UnitQuaternion};
use serde::{Deserialize, Serialize};

/// Orthonormal frame at a skeleton node.
///
/// `tangent` follows the branch, `axis` is perpendicular to it and is the
/// direction the first profile vertex points to, `binormal` completes the
/// right-handed basis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub tangent: Vector3f,
    pub axis: Vector3f,
}

impl Frame {
    pub fn new(tangent: Vector3f, axis: Vector3f) -> Self {
        Self { tangent, axis }
    }

    /// `tangent × axis`
    pub fn binormal(&self) -> Vector3f {
        self.tangent.cross(&self.axis)
    }

    /// Local-to-world rotation: local X → tangent, Y → binormal, Z → axis.
    pub fn matrix(&self) -> Matrix3<f32> {
        Matrix3::from_columns(&[self.tangent, self.binormal(), self.axis])
    }

    /// Rotate a local-space offset into world space.
    pub fn transform_vector(&self, local: &Vector3f) -> Vector3f {
        self.matrix() * local
    }

    /// Point on the profile circle: `axis` rotated by `angle` about `tangent`,
    /// scaled by `radius`.
    pub fn ring_offset(&self, angle: f32, radius: f32) -> Vector3f {
        let rotation = UnitQuaternion::from_axis_angle(&Unit::new_normalize(self.tangent), angle);
        rotation * (self.axis * radius)
    }

    /// True when both vectors are unit length and perpendicular within `epsilon`.
    pub fn is_orthonormal(&self, epsilon: f32) -> bool {
        (self.tangent.norm() - 1.0).abs() < epsilon
            && (self.axis.norm() - 1.0).abs() < epsilon
            && self.tangent.dot(&self.axis).abs() < epsilon
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            tangent: Vector3f::z(),
            axis: Vector3f::x(),
        }
    }
}
