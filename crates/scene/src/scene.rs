use bloomwater_common::{ObjectId, Transform, rgb_hex};
use glam::Vec3;
use std::collections::BTreeMap;

use crate::asset::SceneAsset;
use crate::camera::SceneCamera;
use crate::material::{Material, WaterMaterial};
use crate::object::{RenderCategory, RenderKind, Renderable};

/// A light source. Lights are never renderables and never glow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Ambient {
        color: Vec3,
        intensity: f32,
    },
    /// Shines from `position` toward the origin.
    Directional {
        color: Vec3,
        intensity: f32,
        position: Vec3,
    },
}

impl Light {
    pub fn ambient(hex: u32, intensity: f32) -> Self {
        Light::Ambient {
            color: rgb_hex(hex),
            intensity,
        }
    }

    pub fn directional(hex: u32, intensity: f32, position: Vec3) -> Self {
        Light::Directional {
            color: rgb_hex(hex),
            intensity,
            position,
        }
    }
}

/// The scene container. Owned by the render context.
#[derive(Debug, Clone)]
pub struct Scene {
    objects: BTreeMap<ObjectId, Renderable>,
    lights: Vec<Light>,
    camera: SceneCamera,
    pub clear_color: Vec3,
}

impl Scene {
    pub fn new(camera: SceneCamera) -> Self {
        Self {
            objects: BTreeMap::new(),
            lights: Vec::new(),
            camera,
            clear_color: Vec3::ZERO,
        }
    }

    /// Add a renderable. Returns its id.
    pub fn add(&mut self, renderable: Renderable) -> ObjectId {
        let id = ObjectId::new();
        tracing::debug!(
            id = %id.short(),
            name = %renderable.name,
            category = ?renderable.category,
            "object added"
        );
        self.objects.insert(id, renderable);
        id
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn get(&self, id: ObjectId) -> Option<&Renderable> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Renderable> {
        self.objects.get_mut(&id)
    }

    /// Read-only access to all renderables (BTreeMap for stable traversal order).
    pub fn objects(&self) -> &BTreeMap<ObjectId, Renderable> {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> impl Iterator<Item = (&ObjectId, &mut Renderable)> {
        self.objects.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn count_in(&self, category: RenderCategory) -> usize {
        self.objects
            .values()
            .filter(|o| o.category == category)
            .count()
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn camera(&self) -> &SceneCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut SceneCamera {
        &mut self.camera
    }

    /// Id of the water surface, if the scene has one.
    pub fn water_id(&self) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, o)| o.kind == RenderKind::Water)
            .map(|(id, _)| *id)
    }

    /// Uniform state of the water surface.
    pub fn water_mut(&mut self) -> Option<&mut WaterMaterial> {
        self.objects
            .values_mut()
            .filter(|o| o.kind == RenderKind::Water)
            .find_map(|o| match &mut o.material {
                Material::Water(water) => Some(water),
                _ => None,
            })
    }

    pub fn water(&self) -> Option<&WaterMaterial> {
        self.objects
            .values()
            .filter(|o| o.kind == RenderKind::Water)
            .find_map(|o| match &o.material {
                Material::Water(water) => Some(water),
                _ => None,
            })
    }

    /// Add a water surface. A scene holds at most one; later calls are ignored
    /// and return the existing id.
    pub fn add_water(&mut self, name: impl Into<String>, renderable: Renderable) -> ObjectId {
        if let Some(id) = self.water_id() {
            tracing::warn!("scene already has a water surface, keeping the first one");
            return id;
        }
        self.add(Renderable {
            name: name.into(),
            kind: RenderKind::Water,
            ..renderable
        })
    }

    /// Place every object of `asset` in the bloom category, rotated a quarter
    /// turn about Y as one group. Returns the new ids.
    pub fn attach_asset(&mut self, asset: SceneAsset) -> Vec<ObjectId> {
        let group = Transform::default().with_euler_xyz(0.0, std::f32::consts::FRAC_PI_2, 0.0);
        let flattened = asset.flatten();
        let mut ids = Vec::with_capacity(flattened.len());
        for (name, geometry, material, transform) in flattened {
            let renderable = Renderable::mesh(name, geometry, material)
                .with_transform(transform.in_parent(&group))
                .with_category(RenderCategory::Bloom);
            ids.push(self.add(renderable));
        }
        tracing::info!(
            asset = %asset.name,
            objects = ids.len(),
            "scene asset attached"
        );
        ids
    }

    /// Advance animation: water flow and spinning meshes.
    pub fn advance(&mut self, dt: f32) {
        for object in self.objects.values_mut() {
            object.advance(dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetObject;
    use crate::geometry::Geometry;
    use glam::Vec2;

    fn water() -> Renderable {
        Renderable::mesh(
            "water",
            Geometry::plane(10.0, 10.0),
            Material::Water(WaterMaterial::new(Vec3::ONE, 1.0, Vec2::X)),
        )
    }

    #[test]
    fn single_water_surface() {
        let mut scene = Scene::new(SceneCamera::default());
        let a = scene.add_water("water", water());
        let second = Renderable::mesh(
            "water",
            Geometry::plane(10.0, 10.0),
            Material::Water(WaterMaterial::new(Vec3::ONE, 5.0, Vec2::Y)),
        );
        let b = scene.add_water("water2", second);
        assert_eq!(a, b);
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.water_id(), Some(a));
        assert_eq!(scene.get(a).unwrap().name, "water");
        assert_eq!(scene.water().unwrap().scale, 1.0);
        assert_eq!(scene.water().unwrap().flow_direction(), Vec2::X);
    }

    #[test]
    fn attached_asset_glows_and_rotates() {
        let mut scene = Scene::new(SceneCamera::default());
        let asset = SceneAsset {
            name: "set".into(),
            objects: vec![AssetObject {
                name: "arch".into(),
                geometry: Some(Geometry::plane(1.0, 1.0)),
                material: None,
                transform: Transform::from_position(Vec3::new(1.0, 0.0, 0.0)),
                children: Vec::new(),
            }],
        };
        let ids = scene.attach_asset(asset);
        assert_eq!(ids.len(), 1);
        let obj = scene.get(ids[0]).unwrap();
        assert!(obj.is_bloom());
        assert_eq!(obj.kind, RenderKind::Mesh);
        assert!((obj.transform.position - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
        assert_eq!(scene.count_in(RenderCategory::Bloom), 1);
    }

    #[test]
    fn advance_moves_water_flow() {
        let mut scene = Scene::new(SceneCamera::default());
        scene.add_water("water", water());
        let before = scene.water().unwrap().config();
        scene.advance(0.1);
        assert_ne!(scene.water().unwrap().config(), before);
    }
}
