//! Scene graph for the bloomwater demo.
//!
//! A [`Scene`] owns every renderable object, the lights and the camera. Each
//! renderable carries a [`RenderKind`] (mesh or water surface) and a
//! [`RenderCategory`] deciding whether it contributes to the glow pass.
//!
//! # Invariants
//! - Objects are never removed once added.
//! - At most one object has [`RenderKind::Water`].
//! - Assets never introduce water materials.

mod asset;
mod builder;
mod camera;
mod geometry;
mod material;
mod object;
mod scene;

pub use asset::{AssetError, AssetLoader, AssetObject, PendingAsset, SceneAsset};
pub use builder::SceneBuilder;
pub use camera::SceneCamera;
pub use geometry::{Geometry, GeometryError};
pub use material::{Material, WaterMaterial};
pub use object::{RenderCategory, RenderKind, Renderable, Spin};
pub use scene::{Light, Scene};
