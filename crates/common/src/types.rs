use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an object in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for log lines and panels.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

/// Spatial transform: position, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Rotation given as intrinsic X, then Y, then Z angles in radians.
    pub fn with_euler_xyz(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = Quat::from_euler(EulerRot::XYZ, x, y, z);
        self
    }

    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Express this local transform in the parent's space.
    pub fn in_parent(&self, parent: &Transform) -> Transform {
        let (scale, rotation, position) =
            (parent.matrix() * self.matrix()).to_scale_rotation_translation();
        Transform {
            position,
            rotation,
            scale,
        }
    }
}

/// Drawable surface size in physical pixels. Never zero in either axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

/// Convert a 0xRRGGBB literal into an RGB vector in [0, 1].
pub fn rgb_hex(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_id_uniqueness() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        assert_ne!(a, b);
        assert_eq!(a.short().len(), 8);
    }

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn parent_rotation_moves_child() {
        let parent = Transform::default().with_euler_xyz(0.0, std::f32::consts::FRAC_PI_2, 0.0);
        let child = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        let world = child.in_parent(&parent);
        assert!((world.position - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn viewport_never_zero() {
        let vp = Viewport::new(0, 0);
        assert_eq!((vp.width, vp.height), (1, 1));
        assert_eq!(Viewport::new(1920, 1080).aspect(), 1920.0 / 1080.0);
    }

    #[test]
    fn hex_colors() {
        assert_eq!(rgb_hex(0xffffff), Vec3::ONE);
        assert_eq!(rgb_hex(0x000000), Vec3::ZERO);
        assert!((rgb_hex(0xcccccc).x - 0.8).abs() < 1e-6);
    }
}
