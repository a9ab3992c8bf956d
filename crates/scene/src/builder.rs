use bloomwater_common::Transform;
use glam::{Vec2, Vec3};
use std::f32::consts::FRAC_PI_2;

use crate::camera::SceneCamera;
use crate::geometry::Geometry;
use crate::material::{Material, WaterMaterial};
use crate::object::Renderable;
use crate::scene::{Light, Scene};

/// Builds the procedural part of each demo scene.
///
/// Loaded assets are attached later through [`Scene::attach_asset`].
pub struct SceneBuilder;

impl SceneBuilder {
    /// Large water plane under a glowing set; the set itself comes from an asset.
    pub fn bloom_set() -> Scene {
        let camera = SceneCamera::with_euler_xyz(Vec3::new(-21.9, 1.52, -0.48), -1.870, -1.537, -1.870);
        let mut scene = Scene::new(camera);

        scene.add_water(
            "water",
            water_plane(100.0, WaterMaterial::new(Vec3::ONE, 1.0, Vec2::new(-0.2, 0.2))),
        );
        add_lights(&mut scene);

        tracing::info!(objects = scene.len(), "bloom set scene built");
        scene
    }

    /// Spinning torus knot over a ground plane with a small pool of water.
    pub fn torus_pool() -> Scene {
        let mut camera = SceneCamera::looking_at(Vec3::new(-15.0, 7.0, 15.0), Vec3::ZERO);
        camera.set_controls_enabled(true);
        let mut scene = Scene::new(camera);
        scene.clear_color = Vec3::new(0.45, 0.6, 0.8);

        scene.add(
            Renderable::mesh(
                "torus_knot",
                Geometry::torus_knot(3.0, 1.0, 256, 32),
                Material::Normal,
            )
            .with_transform(Transform::from_position(Vec3::new(0.0, 4.0, 0.0)).with_uniform_scale(0.5))
            .with_spin(Vec3::new(1.0, 0.5, 0.0)),
        );

        scene.add(
            Renderable::mesh(
                "ground",
                Geometry::plane(20.0, 20.0),
                Material::standard(Vec3::new(0.55, 0.38, 0.24), 0.8, 0.4),
            )
            .with_transform(Transform::default().with_euler_xyz(-FRAC_PI_2, 0.0, 0.0)),
        );

        scene.add_water(
            "water",
            water_plane(20.0, WaterMaterial::new(Vec3::ONE, 4.0, Vec2::new(1.0, 1.0))),
        );
        add_lights(&mut scene);

        tracing::info!(objects = scene.len(), "torus pool scene built");
        scene
    }
}

fn water_plane(size: f32, water: WaterMaterial) -> Renderable {
    Renderable::mesh("water", Geometry::plane(size, size), Material::Water(water)).with_transform(
        Transform::from_position(Vec3::new(0.0, 1.0, 0.0)).with_euler_xyz(-FRAC_PI_2, 0.0, 0.0),
    )
}

fn add_lights(scene: &mut Scene) {
    scene.add_light(Light::ambient(0xcccccc, 0.4));
    scene.add_light(Light::directional(0xffffff, 0.6, Vec3::new(-1.0, 1.0, 1.0)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{RenderCategory, RenderKind};

    #[test]
    fn bloom_set_has_only_water_and_lights() {
        let scene = SceneBuilder::bloom_set();
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.lights().len(), 2);
        let water = scene.get(scene.water_id().unwrap()).unwrap();
        assert_eq!(water.kind, RenderKind::Water);
        assert_eq!(water.transform.position.y, 1.0);
        assert!(!scene.camera().controls_enabled());
    }

    #[test]
    fn torus_pool_layout() {
        let scene = SceneBuilder::torus_pool();
        assert_eq!(scene.len(), 3);
        assert_eq!(scene.count_in(RenderCategory::Bloom), 0);
        let knot = scene
            .objects()
            .values()
            .find(|o| o.name == "torus_knot")
            .unwrap();
        assert!(knot.spin.is_some());
        assert_eq!(knot.transform.scale, Vec3::splat(0.5));
        let water = scene.water().unwrap();
        assert_eq!(water.scale, 4.0);
        assert_eq!(water.flow_direction(), Vec2::new(1.0, 1.0));
    }
}
