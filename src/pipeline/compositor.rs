use crate::{
    config::RenderSettings,
    gfx::scene::{Object, Scene},
};

/// Builds the scene for one asset: gray world, the configured light rig, a
/// square camera with the configured field of view and the asset itself.
///
/// The object is expected to be normalized already.
pub fn compose_scene(object: Object, settings: &RenderSettings) -> Scene {
    let mut scene = Scene::new(settings.clone());
    log::debug!(
        "composing '{}': {} lights ({:?}), {}px, {} spp",
        object.name,
        scene.lights.len(),
        settings.lighting,
        settings.resolution,
        settings.samples
    );
    scene.add_object(object);
    scene
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Preset, gfx::geometry::generate_cube};

    #[test]
    fn test_scene_per_preset() {
        let cube = generate_cube().into_mesh();

        let a = compose_scene(
            Object::new("a", vec![cube.clone()]),
            &Preset::ThreePoint256.settings(),
        );
        assert_eq!(a.objects.len(), 1);
        assert_eq!(a.lights.len(), 3);
        assert_eq!(a.world.color, [0.9, 0.9, 0.9]);
        assert!((a.camera.fovy.0.to_degrees() - 50.0).abs() < 1e-4);

        let b = compose_scene(Object::new("b", vec![cube]), &Preset::CameraLight320.settings());
        assert_eq!(b.lights.len(), 1);
        assert!(b.lights[0].follows_camera);
        assert_eq!(b.settings.resolution, 320);
    }
}
