use bloomwater_common::ObjectId;
use bloomwater_scene::{Material, RenderKind, Renderable, Scene};
use std::collections::BTreeMap;

/// Original materials of objects masked for the bloom pass, keyed by object.
///
/// Filled by [`darken_non_bloomed`](Self::darken_non_bloomed) and drained by
/// [`restore`](Self::restore) within the same frame.
#[derive(Debug, Default)]
pub struct SubstitutionTable {
    saved: BTreeMap<ObjectId, Material>,
}

impl SubstitutionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the mask pass replaces this object's material.
    pub fn masks(object: &Renderable) -> bool {
        object.kind == RenderKind::Mesh && !object.is_bloom()
    }

    /// Swap every maskable object's material for [`Material::DARK`].
    /// Returns the number of objects masked.
    pub fn darken_non_bloomed(&mut self, scene: &mut Scene) -> usize {
        let mut masked = 0;
        for (id, object) in scene.objects_mut() {
            if !Self::masks(object) {
                continue;
            }
            let original = std::mem::replace(&mut object.material, Material::DARK);
            // An entry left over from an interrupted frame already holds the real material.
            self.saved.entry(*id).or_insert(original);
            masked += 1;
        }
        tracing::trace!(masked, "mask pass");
        masked
    }

    /// Put every saved material back, whatever the object's current category.
    /// Returns the number of objects restored. The table is empty afterwards.
    pub fn restore(&mut self, scene: &mut Scene) -> usize {
        let mut restored = 0;
        for (id, object) in scene.objects_mut() {
            if let Some(original) = self.saved.remove(id) {
                object.material = original;
                restored += 1;
            }
        }
        if !self.saved.is_empty() {
            tracing::warn!(
                orphaned = self.saved.len(),
                "saved materials for objects missing from the scene"
            );
            self.saved.clear();
        }
        tracing::trace!(restored, "restore pass");
        restored
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.saved.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.saved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloomwater_scene::{Geometry, RenderCategory, SceneBuilder};
    use glam::Vec3;

    fn scene_with_meshes() -> (Scene, ObjectId, ObjectId) {
        let mut scene = SceneBuilder::bloom_set();
        let plain = scene.add(Renderable::mesh(
            "plain",
            Geometry::plane(1.0, 1.0),
            Material::standard(Vec3::new(0.2, 0.3, 0.4), 0.5, 0.1),
        ));
        let glowing = scene.add(
            Renderable::mesh("glow", Geometry::plane(1.0, 1.0), Material::Normal)
                .with_category(RenderCategory::Bloom),
        );
        (scene, plain, glowing)
    }

    #[test]
    fn mask_and_restore_round_trip() {
        let (mut scene, plain, glowing) = scene_with_meshes();
        let before: Vec<Material> = scene.objects().values().map(|o| o.material.clone()).collect();
        let mut table = SubstitutionTable::new();

        assert_eq!(table.darken_non_bloomed(&mut scene), 1);
        assert!(table.contains(plain));
        assert!(!table.contains(glowing));
        assert!(!table.contains(scene.water_id().unwrap()));
        assert_eq!(scene.get(plain).unwrap().material, Material::DARK);
        assert_eq!(scene.get(glowing).unwrap().material, Material::Normal);

        assert_eq!(table.restore(&mut scene), 1);
        assert!(table.is_empty());
        let after: Vec<Material> = scene.objects().values().map(|o| o.material.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn restore_ignores_category_changes() {
        let (mut scene, plain, _) = scene_with_meshes();
        let original = scene.get(plain).unwrap().material.clone();
        let mut table = SubstitutionTable::new();
        table.darken_non_bloomed(&mut scene);

        scene.get_mut(plain).unwrap().category = RenderCategory::Bloom;
        table.restore(&mut scene);

        assert!(table.is_empty());
        assert_eq!(scene.get(plain).unwrap().material, original);
    }

    #[test]
    fn double_mask_keeps_real_material() {
        let (mut scene, plain, _) = scene_with_meshes();
        let original = scene.get(plain).unwrap().material.clone();
        let mut table = SubstitutionTable::new();
        table.darken_non_bloomed(&mut scene);
        table.darken_non_bloomed(&mut scene);
        assert_eq!(table.len(), 1);
        table.restore(&mut scene);
        assert_eq!(scene.get(plain).unwrap().material, original);
    }

    #[test]
    fn water_is_exempt_even_outside_bloom() {
        let mut scene = SceneBuilder::torus_pool();
        let water = scene.water_id().unwrap();
        assert_eq!(
            scene.get(water).unwrap().category,
            RenderCategory::Default
        );
        let mut table = SubstitutionTable::new();
        assert_eq!(table.darken_non_bloomed(&mut scene), 2);
        assert!(!table.contains(water));
        assert!(scene.get(water).unwrap().material.is_water());
        table.restore(&mut scene);
    }
}
