//! Render configuration and named presets
//!
//! All knobs are plain scalars. The two presets mirror the two dataset
//! variants that exist in practice: a 256 px three-point-lit set with fixed
//! views, and a 320 px camera-lit set with a randomized query view.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::ManifestError,
    gfx::lighting::LightingRig,
    pipeline::{
        orbit::camera_distance,
        poses::{FixedOffsetPolicy, PosePolicy, RandomQueryPolicy},
    },
};

/// Canonical edge length of the normalized asset.
pub const TARGET_SIZE: f32 = 1.0;

/// Renderer quality and framing parameters applied to every scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Square output edge in pixels.
    pub resolution: u32,
    /// Samples per pixel. The GPU backend only distinguishes one sample
    /// from 4x MSAA.
    pub samples: u32,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    /// Safety factor applied to the fixed camera distance.
    pub radius_margin: f32,
    /// Shade uniform pixels once instead of once per sample. CPU backend
    /// only.
    pub adaptive_sampling: bool,
    /// Coverage-weighted 3x3 color smoothing. CPU backend only.
    pub denoise: bool,
    pub transparent_background: bool,
    pub lighting: LightingRig,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Preset::ThreePoint256.settings()
    }
}

impl RenderSettings {
    /// Loads settings from a JSON file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ManifestError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Named configuration bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum Preset {
    /// 256 px, 24 samples, denoised, three-point rig, fixed-offset views.
    #[default]
    #[value(name = "three-point-256")]
    ThreePoint256,
    /// 320 px, 32 samples, camera-co-located light, randomized query view.
    #[value(name = "camera-light-320")]
    CameraLight320,
}

impl Preset {
    pub fn settings(self) -> RenderSettings {
        match self {
            Preset::ThreePoint256 => RenderSettings {
                resolution: 256,
                samples: 24,
                fov_degrees: 50.0,
                radius_margin: 2.0,
                adaptive_sampling: true,
                denoise: true,
                transparent_background: true,
                lighting: LightingRig::ThreePoint,
            },
            Preset::CameraLight320 => RenderSettings {
                resolution: 320,
                samples: 32,
                fov_degrees: 50.0,
                radius_margin: 2.0,
                adaptive_sampling: true,
                denoise: false,
                transparent_background: true,
                lighting: LightingRig::CameraLight,
            },
        }
    }

    pub fn policy(self) -> PolicyKind {
        match self {
            Preset::ThreePoint256 => PolicyKind::FixedOffset,
            Preset::CameraLight320 => PolicyKind::RandomQuery,
        }
    }
}

/// Which camera pose policy drives the orbit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum PolicyKind {
    FixedOffset,
    RandomQuery,
}

impl PolicyKind {
    /// Instantiates the policy for the given settings.
    pub fn build(self, settings: &RenderSettings) -> Box<dyn PosePolicy> {
        match self {
            PolicyKind::FixedOffset => Box::new(FixedOffsetPolicy::new(camera_distance(
                settings.fov_degrees,
                settings.radius_margin,
            ))),
            PolicyKind::RandomQuery => Box::new(RandomQueryPolicy::default()),
        }
    }
}
