//! Build configuration: global shape parameters, frond policy, twig policy and
//! build modes.

use grovemesh_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// What a build pass produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BuildMode {
    /// Vertices, faces, UVs, material slots and attribute layers.
    #[default]
    Full,
    /// Shape-key positions from last year's pose, for growth animation.
    GrowthShape,
    /// Shape-key positions from the current (wind-deformed) pose.
    WindShape,
}

/// Side effects enabled by a [`BuildMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeCapabilities {
    pub emits_faces: bool,
    pub emits_uvs: bool,
    pub records_layers: bool,
    pub uses_last_year_pose: bool,
    pub tapers_radius: bool,
}

impl BuildMode {
    pub const fn capabilities(self) -> ModeCapabilities {
        match self {
            BuildMode::Full => ModeCapabilities {
                emits_faces: true,
                emits_uvs: true,
                records_layers: true,
                uses_last_year_pose: false,
                tapers_radius: true,
            },
            BuildMode::GrowthShape => ModeCapabilities {
                emits_faces: false,
                emits_uvs: false,
                records_layers: false,
                uses_last_year_pose: true,
                tapers_radius: true,
            },
            BuildMode::WindShape => ModeCapabilities {
                emits_faces: false,
                emits_uvs: false,
                records_layers: false,
                uses_last_year_pose: false,
                tapers_radius: false,
            },
        }
    }
}

/// When a branch is replaced by a frond template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FrondPolicy {
    #[default]
    Disabled,
    /// Branches whose base thickness is below the cutoff.
    ByThickness,
    /// Branches at least `min_depth` levels below the trunk (trunk is depth 0).
    ByDepth,
    /// Both conditions must hold.
    Both,
}

/// Frond grafting parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrondSettings {
    pub policy: FrondPolicy,
    pub thickness_cutoff: f32,
    pub min_depth: usize,
    /// Blend between template length (0) and branch length (1) along local X.
    pub stretch_x: f32,
    /// Same blend for local Y and Z. 0 disables cross-section stretching.
    pub stretch_yz: f32,
}

impl Default for FrondSettings {
    fn default() -> Self {
        Self {
            policy: FrondPolicy::Disabled,
            thickness_cutoff: 1.0,
            min_depth: 2,
            stretch_x: 1.0,
            stretch_yz: 0.0,
        }
    }
}

impl FrondSettings {
    pub fn is_enabled(&self) -> bool {
        self.policy != FrondPolicy::Disabled
    }

    /// Decide once per branch, before any geometry is emitted.
    pub fn should_graft(&self, base_thickness: f32, depth: usize) -> bool {
        let thin = base_thickness < self.thickness_cutoff;
        let deep = depth >= self.min_depth;
        match self.policy {
            FrondPolicy::Disabled => false,
            FrondPolicy::ByThickness => thin,
            FrondPolicy::ByDepth => deep,
            FrondPolicy::Both => thin && deep,
        }
    }
}

/// Twig duplicator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwigSettings {
    pub enabled: bool,
    pub lateral_on_apical: bool,
    pub lateral_twig_age_limit: f32,
    pub dead_twig_wither: f32,
    /// Angle between a lateral twig and its parent segment, in radians.
    pub branch_angle: f32,
    pub branching: u32,
    /// 0 keeps the tilted direction, 1 lays twigs flat.
    pub plagiotropism: f32,
}

impl Default for TwigSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            lateral_on_apical: false,
            lateral_twig_age_limit: 3.0,
            dead_twig_wither: 1.0,
            branch_angle: 0.8,
            branching: 2,
            plagiotropism: 0.0,
        }
    }
}

/// Global parameters of a tree build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Vertices per ring at full thickness.
    pub profile_resolution: usize,
    /// 0 keeps full resolution everywhere, 1 scales it fully with thickness.
    pub profile_resolution_reduction: f32,
    /// Extra rotation of each ring about its tangent, accumulated per node.
    pub twist: f32,
    pub u_repeat: f32,
    pub texture_aspect_ratio: f32,
    /// Fraction of the trunk's nodes affected by root flare.
    pub root_distribution: f32,
    pub root_shape: f32,
    pub root_scale: f32,
    pub root_bump: f32,
    pub reduce_edge_loops: bool,
    /// Tangent dot product above which a straight ring may be skipped.
    pub edge_loop_threshold: f32,
    pub fronds: FrondSettings,
    pub twigs: TwigSettings,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            profile_resolution: 16,
            profile_resolution_reduction: 0.9,
            twist: 0.0,
            u_repeat: 3.0,
            texture_aspect_ratio: 3.0,
            root_distribution: 0.1,
            root_shape: 0.5,
            root_scale: 1.0,
            root_bump: 0.5,
            reduce_edge_loops: false,
            edge_loop_threshold: 0.995,
            fronds: FrondSettings::default(),
            twigs: TwigSettings::default(),
        }
    }
}

impl BuildSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile_resolution(mut self, resolution: usize) -> Self {
        self.profile_resolution = resolution;
        self
    }

    pub fn with_resolution_reduction(mut self, reduction: f32) -> Self {
        self.profile_resolution_reduction = reduction;
        self
    }

    pub fn with_twist(mut self, twist: f32) -> Self {
        self.twist = twist;
        self
    }

    pub fn with_uv(mut self, u_repeat: f32, texture_aspect_ratio: f32) -> Self {
        self.u_repeat = u_repeat;
        self.texture_aspect_ratio = texture_aspect_ratio;
        self
    }

    pub fn with_roots(mut self, distribution: f32, shape: f32, scale: f32, bump: f32) -> Self {
        self.root_distribution = distribution;
        self.root_shape = shape;
        self.root_scale = scale;
        self.root_bump = bump;
        self
    }

    pub fn with_edge_loop_reduction(mut self, threshold: f32) -> Self {
        self.reduce_edge_loops = true;
        self.edge_loop_threshold = threshold;
        self
    }

    pub fn with_fronds(mut self, fronds: FrondSettings) -> Self {
        self.fronds = fronds;
        self
    }

    pub fn with_twigs(mut self, twigs: TwigSettings) -> Self {
        self.twigs = twigs;
        self
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.profile_resolution < 3 {
            return Err(Error::InvalidConfig(format!(
                "profile resolution must be at least 3, got {}",
                self.profile_resolution
            )));
        }
        if !(0.0..=1.0).contains(&self.profile_resolution_reduction) {
            return Err(Error::InvalidConfig(format!(
                "profile resolution reduction must lie in [0, 1], got {}",
                self.profile_resolution_reduction
            )));
        }
        if !(self.edge_loop_threshold > -1.0 && self.edge_loop_threshold <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "edge loop threshold must lie in (-1, 1], got {}",
                self.edge_loop_threshold
            )));
        }
        if self.texture_aspect_ratio <= 0.0 || self.u_repeat <= 0.0 {
            return Err(Error::InvalidConfig(String::from(
                "u repeat and texture aspect ratio must be positive",
            )));
        }
        Ok(())
    }
}
