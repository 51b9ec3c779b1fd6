//! Tree skeleton to surface mesh conversion
//!
//! This crate turns a [`Skeleton`] into a single [`TreeMesh`]:
//! - Rotation-minimizing frames along every branch
//! - Joint smoothing where sub-branches meet their parent
//! - Thickness-adaptive ring tessellation with UVs and root flare
//! - Frond grafting that replaces thin branches with template meshes
//! - Twig duplicator triangles for particle scattering

pub mod settings;
pub mod node;
pub mod frame;
pub mod smoothing;
pub mod recorder;
pub mod sink;
pub mod rings;
pub mod graft;
pub mod twigs;
pub mod walker;

pub use settings::*;
pub use frame::{arc_lengths, compute_frames};
pub use graft::{stretch_factor, take_boundaries};
pub use rings::{plan_rings, target_resolution, RingPlan};
pub use walker::TreeBuilder;

use grovemesh_core::{FrondSet, Result, Skeleton, TreeMesh};

/// Turn a skeleton into a mesh
pub trait TreeMesher {
    fn build(&self, skeleton: &Skeleton) -> Result<TreeMesh>;
}

/// Build `skeleton` in `mode`, grafting from `fronds` when the settings ask for it.
pub fn build_tree(
    skeleton: &Skeleton,
    settings: &BuildSettings,
    fronds: Option<&FrondSet>,
    mode: BuildMode,
) -> Result<TreeMesh> {
    let builder = TreeBuilder::new(settings).with_mode(mode);
    match fronds {
        Some(fronds) => builder.with_fronds(fronds).build(skeleton),
        None => builder.build(skeleton),
    }
}
