//! # Lighting
//!
//! Light rigs, the world background and the shading model shared by both
//! renderers. The WGSL shader in `rendering/orbit.wgsl` mirrors [`shade`]
//! line for line so GPU and CPU frames agree up to rasterization.
//!
//! Lights are point emitters with an energy in watts. Irradiance falls off
//! with `energy / (4π d²)`, is scaled by [`EXPOSURE`] and the result is
//! tone mapped with `1 - exp(-x)` per channel.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Vector3};
use serde::{Deserialize, Serialize};

/// Scales watts-based irradiance into display range.
pub const EXPOSURE: f32 = 0.05;

/// Upper bound on lights per scene; the shader's light array has this size.
pub const MAX_LIGHTS: usize = 4;

/// Which set of lights a scene is composed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum LightingRig {
    /// Fixed key, fill and rim lights.
    ThreePoint,
    /// A single light riding on the camera.
    CameraLight,
}

impl LightingRig {
    /// Instantiates the rig's lights at their rest positions.
    pub fn lights(self) -> Vec<Light> {
        match self {
            LightingRig::ThreePoint => vec![
                Light::new("key", Vector3::new(3.0, -3.0, 3.0), 1500.0),
                Light::new("fill", Vector3::new(-3.0, 3.0, 2.0), 800.0),
                Light::new("rim", Vector3::new(-2.0, -3.0, 4.0), 600.0),
            ],
            LightingRig::CameraLight => {
                let mut light = Light::new("camera", Vector3::new(0.0, 0.0, 0.0), 3000.0);
                light.follows_camera = true;
                vec![light]
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub name: &'static str,
    pub position: Vector3<f32>,
    pub color: [f32; 3],
    /// Emitted power in watts.
    pub energy: f32,
    /// Moved onto the camera eye whenever the camera moves.
    pub follows_camera: bool,
}

impl Light {
    pub fn new(name: &'static str, position: Vector3<f32>, energy: f32) -> Self {
        Self {
            name,
            position,
            color: [1.0, 1.0, 1.0],
            energy,
            follows_camera: false,
        }
    }
}

/// Uniform environment light, also the color of an opaque background.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct World {
    pub color: [f32; 3],
    pub strength: f32,
}

impl Default for World {
    fn default() -> Self {
        Self {
            color: [0.9, 0.9, 0.9],
            strength: 0.35,
        }
    }
}

/// Shades one surface point. Returns tone-mapped linear RGB in `0..1`.
///
/// Normals facing away from the eye are flipped, so open and inconsistently
/// wound meshes shade the same from both sides.
pub fn shade(
    base_color: [f32; 3],
    position: Vector3<f32>,
    normal: Vector3<f32>,
    eye: Vector3<f32>,
    lights: &[Light],
    world: &World,
) -> [f32; 3] {
    let mut n = if normal.magnitude2() > 0.0 {
        normal.normalize()
    } else {
        (eye - position).normalize()
    };
    if n.dot(eye - position) < 0.0 {
        n = -n;
    }

    let mut radiance = Vector3::from(world.color) * world.strength;
    for light in lights {
        let to_light = light.position - position;
        let dist2 = to_light.magnitude2().max(1e-4);
        let lambert = n.dot(to_light / dist2.sqrt()).max(0.0);
        let irradiance = light.energy / (4.0 * PI * dist2) * lambert * EXPOSURE;
        radiance += Vector3::from(light.color) * irradiance;
    }

    [
        tone_map(base_color[0] * radiance.x),
        tone_map(base_color[1] * radiance.y),
        tone_map(base_color[2] * radiance.z),
    ]
}

#[inline]
fn tone_map(x: f32) -> f32 {
    1.0 - (-x.max(0.0)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rigs() {
        let three = LightingRig::ThreePoint.lights();
        assert_eq!(three.len(), 3);
        assert!(three.iter().all(|l| !l.follows_camera));
        assert_eq!(three[0].energy, 1500.0);

        let cam = LightingRig::CameraLight.lights();
        assert_eq!(cam.len(), 1);
        assert!(cam[0].follows_camera);
        assert!(cam.len() <= MAX_LIGHTS && three.len() <= MAX_LIGHTS);
    }

    #[test]
    fn test_lit_side_is_brighter_than_ambient_only() {
        let world = World::default();
        let lights = vec![Light::new("l", Vector3::new(0.0, 0.0, 2.0), 1000.0)];
        let p = Vector3::new(0.0, 0.0, 0.0);
        let eye = Vector3::new(0.0, 0.0, 3.0);

        let lit = shade([0.8; 3], p, Vector3::unit_z(), eye, &lights, &world);
        let unlit = shade([0.8; 3], p, Vector3::unit_z(), eye, &[], &world);
        assert!(lit[0] > unlit[0]);
        assert!(lit.iter().all(|c| (0.0..1.0).contains(c)));
    }

    #[test]
    fn test_back_facing_normal_is_flipped() {
        let world = World::default();
        let lights = vec![Light::new("l", Vector3::new(0.0, 0.0, 2.0), 1000.0)];
        let eye = Vector3::new(0.0, 0.0, 3.0);
        let p = Vector3::new(0.0, 0.0, 0.0);
        let front = shade([0.8; 3], p, Vector3::unit_z(), eye, &lights, &world);
        let back = shade([0.8; 3], p, -Vector3::unit_z(), eye, &lights, &world);
        assert_eq!(front, back);
    }
}
