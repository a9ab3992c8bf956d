//! Shared types for the bloomwater workspace.

mod types;

pub use types::{ObjectId, Transform, Viewport, rgb_hex};
