//! # Rendering
//!
//! Two interchangeable renderers produce RGBA frames of a [`Scene`]:
//!
//! - [`GpuRenderer`] draws with wgpu into an offscreen target and reads the
//!   pixels back.
//! - [`SoftwareRenderer`] rasterizes on the CPU and is used whenever no
//!   hardware adapter is available.
//!
//! [`probe_backend`] decides between them once per process and
//! [`create_renderer`] hands out the matching [`Renderer`].

pub mod backend;
pub mod gpu;
pub mod software;

use std::path::Path;

pub use backend::{create_renderer, probe_backend, AdapterSummary, BackendPreference, RenderBackend};
pub use gpu::GpuRenderer;
pub use software::SoftwareRenderer;

use crate::{error::RenderError, gfx::scene::Scene};

/// An 8-bit RGBA image with straight (non-premultiplied) alpha, rows top to
/// bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Fraction of pixels with non-zero alpha.
    pub fn coverage(&self) -> f32 {
        let total = (self.width * self.height).max(1) as f32;
        let covered = self.pixels.chunks_exact(4).filter(|p| p[3] > 0).count();
        covered as f32 / total
    }

    /// Encodes the frame as an RGBA PNG.
    pub fn save_png(&self, path: &Path) -> Result<(), RenderError> {
        let image = image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| {
                RenderError::Readback(format!(
                    "pixel buffer of {} bytes does not fit {}x{}",
                    self.pixels.len(),
                    self.width,
                    self.height
                ))
            })?;
        image.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

/// A renderer bound to one backend for the lifetime of a process.
///
/// `prepare` is called once per scene to upload or bake geometry, `render`
/// once per camera pose. Renderers hold no state that outlives the next
/// `prepare`.
pub trait Renderer {
    fn backend(&self) -> &RenderBackend;

    fn prepare(&mut self, scene: &Scene) -> Result<(), RenderError>;

    fn render(&mut self, scene: &Scene) -> Result<Frame, RenderError>;
}

/// Standard sRGB transfer function for a linear value in `0..1`.
pub fn linear_to_srgb(c: f32) -> f32 {
    let c = c.clamp(0.0, 1.0);
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[inline]
pub(crate) fn to_u8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_endpoints() {
        assert_eq!(linear_to_srgb(0.0), 0.0);
        assert!((linear_to_srgb(1.0) - 1.0).abs() < 1e-6);
        assert!(linear_to_srgb(0.5) > 0.5);
    }

    #[test]
    fn test_save_png_round_trips_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("000.png");
        let frame = Frame {
            width: 3,
            height: 2,
            pixels: vec![128; 3 * 2 * 4],
        };
        frame.save_png(&path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(2, 1).0, [128, 128, 128, 128]);
    }

    #[test]
    fn test_mismatched_buffer_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let frame = Frame {
            width: 4,
            height: 4,
            pixels: vec![0; 10],
        };
        assert!(frame.save_png(&dir.path().join("x.png")).is_err());
    }
}
