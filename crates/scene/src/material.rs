use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Surface description of a renderable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Material {
    /// Lit with ambient and directional lights.
    Standard {
        #[serde(default = "white")]
        color: Vec3,
        #[serde(default = "one")]
        roughness: f32,
        #[serde(default)]
        metalness: f32,
        #[serde(default)]
        emissive: Vec3,
    },
    /// Colour from the world-space normal.
    Normal,
    /// Unlit flat colour.
    Basic {
        #[serde(default = "white")]
        color: Vec3,
    },
    /// Procedural flowing water. Only the scene's water surface uses it.
    Water(WaterMaterial),
}

fn white() -> Vec3 {
    Vec3::ONE
}

fn one() -> f32 {
    1.0
}

impl Material {
    /// Opaque black used to mask non-glowing meshes out of the bloom pass.
    pub const DARK: Material = Material::Basic { color: Vec3::ZERO };

    pub fn standard(color: Vec3, roughness: f32, metalness: f32) -> Self {
        Self::Standard {
            color,
            roughness,
            metalness,
            emissive: Vec3::ZERO,
        }
    }

    pub fn is_water(&self) -> bool {
        matches!(self, Material::Water(_))
    }

    /// Short tag used in logs and text renders.
    pub fn label(&self) -> &'static str {
        match self {
            Material::Standard { .. } => "standard",
            Material::Normal => "normal",
            Material::Basic { .. } if *self == Material::DARK => "dark",
            Material::Basic { .. } => "basic",
            Material::Water(_) => "water",
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::standard(Vec3::ONE, 1.0, 0.0)
    }
}

/// Uniform state of the water surface.
///
/// The flow is sampled at two offsets half a cycle apart and blended, so the
/// texture never visibly resets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterMaterial {
    pub color: Vec3,
    pub scale: f32,
    flow_direction: Vec2,
    pub flow_speed: f32,
    pub cycle: f32,
    offsets: Vec2,
}

impl Default for WaterMaterial {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            scale: 1.0,
            flow_direction: Vec2::new(1.0, 0.0),
            flow_speed: 0.03,
            cycle: 0.15,
            offsets: Vec2::new(0.0, 0.075),
        }
    }
}

impl WaterMaterial {
    /// `flow` is stored as given; only the per-component edits normalize it.
    pub fn new(color: Vec3, scale: f32, flow: Vec2) -> Self {
        let mut water = Self {
            color,
            scale,
            ..Self::default()
        };
        water.reset_flow(flow);
        water
    }

    /// Replace the flow vector without normalizing it. Zero is ignored.
    pub fn reset_flow(&mut self, flow: Vec2) {
        if flow != Vec2::ZERO {
            self.flow_direction = flow;
        }
    }

    /// Unit length once any flow edit has been applied.
    pub fn flow_direction(&self) -> Vec2 {
        self.flow_direction
    }

    /// Normalize and store `flow`. A zero-length input keeps the previous direction.
    pub fn set_flow_direction(&mut self, flow: Vec2) {
        if let Some(dir) = flow.try_normalize() {
            self.flow_direction = dir;
        }
    }

    /// Overwrite the x component of the stored direction, then re-normalize.
    pub fn set_flow_x(&mut self, x: f32) {
        self.set_flow_direction(Vec2::new(x, self.flow_direction.y));
    }

    /// Overwrite the y component of the stored direction, then re-normalize.
    pub fn set_flow_y(&mut self, y: f32) {
        self.set_flow_direction(Vec2::new(self.flow_direction.x, y));
    }

    pub fn advance(&mut self, dt: f32) {
        let half_cycle = self.cycle * 0.5;
        self.offsets.x += self.flow_speed * dt;
        self.offsets.y = self.offsets.x + half_cycle;
        if self.offsets.x >= self.cycle {
            self.offsets = Vec2::new(0.0, half_cycle);
        } else if self.offsets.y >= self.cycle {
            self.offsets.y -= self.cycle;
        }
    }

    /// (offset0, offset1, half cycle, scale), the layout the water shader reads.
    pub fn config(&self) -> Vec4 {
        Vec4::new(self.offsets.x, self.offsets.y, self.cycle * 0.5, self.scale)
    }
}
