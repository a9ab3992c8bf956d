use bloomwater_common::Transform;
use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::geometry::Geometry;
use crate::material::Material;

/// What kind of renderable an object is. The compositor never masks water.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderKind {
    Mesh,
    Water,
}

/// Which render subset an object belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RenderCategory {
    #[default]
    Default,
    /// Contributes its own colour to the glow pass.
    Bloom,
}

/// Constant-rate rotation, accumulated as XYZ Euler angles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spin {
    pub angles: Vec3,
    pub rate: Vec3,
}

impl Spin {
    pub fn new(rate: Vec3) -> Self {
        Self {
            angles: Vec3::ZERO,
            rate,
        }
    }

    pub fn advance(&mut self, dt: f32) -> Quat {
        self.angles += self.rate * dt;
        Quat::from_euler(EulerRot::XYZ, self.angles.x, self.angles.y, self.angles.z)
    }
}

/// A drawable object in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Renderable {
    pub name: String,
    pub kind: RenderKind,
    pub category: RenderCategory,
    pub geometry: Geometry,
    pub material: Material,
    pub transform: Transform,
    pub spin: Option<Spin>,
}

impl Renderable {
    pub fn mesh(name: impl Into<String>, geometry: Geometry, material: Material) -> Self {
        Self {
            name: name.into(),
            kind: RenderKind::Mesh,
            category: RenderCategory::Default,
            geometry,
            material,
            transform: Transform::default(),
            spin: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_category(mut self, category: RenderCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_spin(mut self, rate: Vec3) -> Self {
        self.spin = Some(Spin::new(rate));
        self
    }

    pub fn is_bloom(&self) -> bool {
        self.category == RenderCategory::Bloom
    }

    pub(crate) fn advance(&mut self, dt: f32) {
        if let Some(spin) = &mut self.spin {
            self.transform.rotation = spin.advance(dt);
        }
        if let Material::Water(water) = &mut self.material {
            water.advance(dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spin_accumulates() {
        let mut obj = Renderable::mesh("knot", Geometry::plane(1.0, 1.0), Material::Normal)
            .with_spin(Vec3::new(1.0, 0.5, 0.0));
        obj.advance(0.5);
        obj.advance(0.5);
        let spin = obj.spin.unwrap();
        assert!((spin.angles - Vec3::new(1.0, 0.5, 0.0)).length() < 1e-6);
        assert_ne!(obj.transform.rotation, Quat::IDENTITY);
    }

    #[test]
    fn default_category_is_not_bloom() {
        let obj = Renderable::mesh("plane", Geometry::plane(1.0, 1.0), Material::default());
        assert!(!obj.is_bloom());
        assert!(obj.with_category(RenderCategory::Bloom).is_bloom());
    }
}
