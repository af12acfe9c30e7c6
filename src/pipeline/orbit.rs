//! Orbit rendering: one image per planned pose.

use std::path::{Path, PathBuf};

use cgmath::{Deg, Rad};

use crate::{
    error::RenderError,
    gfx::{rendering::Renderer, scene::Scene},
    pipeline::poses::PoseSequence,
};

/// Half the edge of the normalized unit box.
pub const NOMINAL_RADIUS: f32 = 0.5;

/// Distance at which a sphere of [`NOMINAL_RADIUS`] spans the field of view,
/// times `margin`.
pub fn camera_distance(fov_degrees: f32, margin: f32) -> f32 {
    let half_fov: Rad<f32> = Deg(fov_degrees * 0.5).into();
    NOMINAL_RADIUS / half_fov.0.tan() * margin
}

/// `000.png`, `001.png`, ...
pub fn view_file_name(index: usize) -> String {
    format!("{index:03}.png")
}

/// Renders every pose of `poses` in order into `out_dir`.
///
/// The renderer is prepared once for the scene; each pose then moves the
/// camera (and any camera-bound light) and writes one PNG. Returns the
/// written paths in pose order.
pub fn render_orbit(
    renderer: &mut dyn Renderer,
    scene: &mut Scene,
    poses: &PoseSequence,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, RenderError> {
    renderer.prepare(scene)?;

    let mut written = Vec::with_capacity(poses.len());
    for (index, pose) in poses.iter().enumerate() {
        scene.set_camera_pose(pose);
        let frame = renderer.render(scene)?;
        let path = out_dir.join(view_file_name(index));
        frame.save_png(&path)?;
        log::debug!(
            "view {index}: az {:.1} el {:.1} r {:.3} -> {}",
            pose.azimuth_deg,
            pose.elevation_deg,
            pose.radius,
            path.display()
        );
        written.push(path);
    }
    Ok(written)
}
