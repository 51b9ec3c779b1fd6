//! Core data structures for grovemesh
//!
//! This crate provides the skeleton model consumed by the mesher, the frond
//! templates that can replace thin branches, and the append-only output
//! buffers (`TreeMesh`) with their per-vertex attribute layers.

pub mod point;
pub mod skeleton;
pub mod frond;
pub mod attributes;
pub mod mesh;
pub mod traits;
pub mod transform;
pub mod error;

pub use point::*;
pub use skeleton::*;
pub use frond::*;
pub use attributes::*;
pub use mesh::*;
pub use traits::*;
pub use transform::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix3, UnitQuaternion};
