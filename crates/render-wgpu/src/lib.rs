//! wgpu render backend for the selective bloom demo.
//!
//! Draws lit meshes and a procedural water surface into HDR targets, runs a
//! five-level gaussian bloom over the masked scene and tone maps the sum of
//! both targets onto the window surface.
//!
//! # Invariants
//! - The backend reads the scene; material swaps belong to the compositor.
//! - Both HDR targets always match the viewport they were last resized to.

mod bloom;
mod composite;
mod error;
mod mesh;
mod renderer;
mod scene_pass;
mod shaders;
mod targets;

pub use bloom::{BLOOM_FACTORS, KERNEL_RADII, MIP_COUNT, mip_sizes};
pub use error::RenderError;
pub use mesh::{MeshData, Vertex};
pub use renderer::BloomRenderer;
pub use targets::HDR_FORMAT;
