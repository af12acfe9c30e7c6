use super::camera_utils::Camera;
use crate::pipeline::poses::CameraPose;
use cgmath::*;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Camera constrained to a sphere around `target`, Z-up.
///
/// Azimuth is measured in the XY plane from +X towards +Y, elevation from the
/// XY plane towards +Z. The camera always looks at `target`.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub distance: f32,
    pub azimuth: Deg<f32>,
    pub elevation: Deg<f32>,
    pub eye: Vector3<f32>,
    pub target: Vector3<f32>,
    pub up: Vector3<f32>,
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera for OrbitCamera {
    fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }
}

impl OrbitCamera {
    pub fn new(fov_degrees: f32, aspect: f32) -> Self {
        let mut camera = Self {
            distance: 1.0,
            azimuth: Deg(0.0),
            elevation: Deg(0.0),
            eye: Vector3::zero(), // Set by `update()` below.
            target: Vector3::zero(),
            up: Vector3::unit_z(),
            aspect,
            fovy: Rad::from(Deg(fov_degrees)),
            znear: 0.05,
            zfar: 100.0,
        };
        camera.update();
        camera
    }

    /// Moves the camera onto the orbit described by `pose`.
    pub fn set_pose(&mut self, pose: &CameraPose) {
        self.azimuth = Deg(pose.azimuth_deg);
        self.elevation = Deg(pose.elevation_deg);
        self.distance = pose.radius;
        self.update();
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        let eye = Point3::from_vec(self.eye);
        let target = Point3::from_vec(self.target);
        Matrix4::look_at_rh(eye, target, self.up)
    }

    /// Projection into wgpu clip space (depth in `0..1`).
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    /// Updates the camera after changing `distance`, `azimuth` or `elevation`.
    fn update(&mut self) {
        self.eye = calculate_cartesian_eye_position(
            self.azimuth,
            self.elevation,
            self.distance,
            self.target,
        );
    }
}

/// `x = r·cos(el)·cos(az)`, `y = r·cos(el)·sin(az)`, `z = r·sin(el)`, offset by `target`.
pub fn calculate_cartesian_eye_position(
    azimuth: Deg<f32>,
    elevation: Deg<f32>,
    distance: f32,
    target: Vector3<f32>,
) -> Vector3<f32> {
    let az = Rad::from(azimuth).0;
    let el = Rad::from(elevation).0;
    Vector3::new(
        distance * el.cos() * az.cos(),
        distance * el.cos() * az.sin(),
        distance * el.sin(),
    ) + target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vector3<f32>, b: Vector3<f32>) -> bool {
        (a - b).magnitude() < 1e-5
    }

    #[test]
    fn test_eye_on_axes() {
        let origin = Vector3::zero();
        assert!(approx(
            calculate_cartesian_eye_position(Deg(0.0), Deg(0.0), 2.0, origin),
            Vector3::new(2.0, 0.0, 0.0)
        ));
        assert!(approx(
            calculate_cartesian_eye_position(Deg(90.0), Deg(0.0), 2.0, origin),
            Vector3::new(0.0, 2.0, 0.0)
        ));
        assert!(approx(
            calculate_cartesian_eye_position(Deg(0.0), Deg(90.0), 2.0, origin),
            Vector3::new(0.0, 0.0, 2.0)
        ));
    }

    #[test]
    fn test_set_pose_keeps_radius_and_faces_origin() {
        let mut camera = OrbitCamera::new(50.0, 1.0);
        camera.set_pose(&CameraPose::new(137.0, 23.0, 2.6));
        assert!((camera.eye.magnitude() - 2.6).abs() < 1e-5);

        // The origin projects onto the image centre.
        let clip = camera.build_view_projection_matrix() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!((clip.x / clip.w).abs() < 1e-5);
        assert!((clip.y / clip.w).abs() < 1e-5);
        let depth = clip.z / clip.w;
        assert!(depth > 0.0 && depth < 1.0);
    }

    #[test]
    fn test_up_is_world_z() {
        let mut camera = OrbitCamera::new(50.0, 1.0);
        camera.set_pose(&CameraPose::new(0.0, 0.0, 3.0));
        // A point above the origin lands in the upper half of the image.
        let clip = camera.build_view_projection_matrix() * Vector4::new(0.0, 0.0, 0.4, 1.0);
        assert!(clip.y / clip.w > 0.0);
    }
}
