use crate::{
    config::RenderSettings,
    gfx::{
        camera::OrbitCamera,
        lighting::{Light, World},
    },
    pipeline::poses::CameraPose,
};

use super::object::Object;

/// Everything needed to render one asset.
///
/// A scene is built for a single uid and dropped afterwards; nothing carries
/// over from one asset to the next.
#[derive(Debug, Clone)]
pub struct Scene {
    pub objects: Vec<Object>,
    pub camera: OrbitCamera,
    pub lights: Vec<Light>,
    pub world: World,
    pub settings: RenderSettings,
}

impl Scene {
    /// Empty scene with a square camera and the lights of `settings.lighting`.
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            objects: Vec::new(),
            camera: OrbitCamera::new(settings.fov_degrees, 1.0),
            lights: settings.lighting.lights(),
            world: World::default(),
            settings,
        }
    }

    pub fn add_object(&mut self, object: Object) {
        self.objects.push(object);
    }

    /// Moves the camera onto `pose` and carries camera-bound lights along.
    pub fn set_camera_pose(&mut self, pose: &CameraPose) {
        self.camera.set_pose(pose);
        let eye = self.camera.eye;
        for light in self.lights.iter_mut().filter(|l| l.follows_camera) {
            light.position = eye;
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.objects.iter().map(Object::triangle_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Preset, gfx::lighting::LightingRig};
    use cgmath::InnerSpace;

    #[test]
    fn test_camera_light_follows_pose() {
        let settings = Preset::CameraLight320.settings();
        assert_eq!(settings.lighting, LightingRig::CameraLight);
        let mut scene = Scene::new(settings);

        scene.set_camera_pose(&CameraPose::new(90.0, 0.0, 2.5));
        assert_eq!(scene.lights[0].position, scene.camera.eye);
        assert!((scene.lights[0].position.y - 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_fixed_rig_stays_put() {
        let mut scene = Scene::new(Preset::ThreePoint256.settings());
        let before: Vec<_> = scene.lights.iter().map(|l| l.position).collect();
        scene.set_camera_pose(&CameraPose::new(200.0, 20.0, 3.0));
        let after: Vec<_> = scene.lights.iter().map(|l| l.position).collect();
        assert_eq!(before, after);
        assert!((scene.camera.eye.magnitude() - 3.0).abs() < 1e-5);
    }
}
