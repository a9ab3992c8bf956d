//! Render context: the one owner of per-run demo state.
//!
//! Window and panel handlers never touch the scene directly. They queue
//! [`ParamChange`](bloomwater_compositor::ParamChange) messages, which the
//! context applies at the start of the next frame, before the mask pass.

mod context;
mod timing;

pub use context::{ContextConfig, Demo, RenderContext};
pub use timing::FrameTimer;
