//! Selective bloom compositor.
//!
//! Each frame renders the scene twice. The first render has every non-glowing
//! mesh swapped to an opaque black material and feeds the bloom filter; the
//! second render is the untouched scene, combined with the glow additively.
//!
//! # Invariants
//! - The substitution table is empty before the mask pass and after the restore pass.
//! - Water and bloom-category objects are never masked.
//! - The compositor never adds or removes scene objects.
//!
//! The GPU lives behind [`RenderBackend`]; [`DebugTextBackend`] renders passes
//! as text for tests and headless runs.

mod backend;
mod compositor;
mod debug_text;
mod params;
mod substitution;

pub use backend::{BloomSettings, FrameSettings, RenderBackend, TargetSizes};
pub use compositor::{FrameReport, SelectiveBloomCompositor};
pub use debug_text::DebugTextBackend;
pub use params::{
    BLOOM_RADIUS_RANGE, BLOOM_STRENGTH_RANGE, BLOOM_THRESHOLD_RANGE, EXPOSURE_RANGE, FLOW_RANGE,
    ParamChange, ParamEffect, ParamOverrides, ParamsError, SCALE_RANGE, TunableParams,
};
pub use substitution::SubstitutionTable;
