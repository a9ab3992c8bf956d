use bloomwater_common::Viewport;
use bloomwater_scene::Scene;
use glam::{Mat4, Vec3};

use crate::params::TunableParams;

/// Bloom filter settings for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomSettings {
    pub enabled: bool,
    pub threshold: f32,
    pub strength: f32,
    pub radius: f32,
}

/// Everything a backend needs besides the scene itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSettings {
    pub view_proj: Mat4,
    pub camera_position: Vec3,
    /// Already raised to the tone mapper's power.
    pub exposure: f32,
    pub bloom: BloomSettings,
    /// Seconds since start.
    pub time: f32,
    pub clear_color: Vec3,
}

impl FrameSettings {
    pub fn new(scene: &Scene, params: &TunableParams, time: f32) -> Self {
        let camera = scene.camera();
        Self {
            view_proj: camera.view_projection(),
            camera_position: camera.position,
            exposure: params.tone_mapping_exposure(),
            bloom: BloomSettings {
                enabled: params.bloom_enabled,
                threshold: params.bloom_threshold,
                strength: params.bloom_strength,
                radius: params.bloom_radius,
            },
            time,
            clear_color: scene.clear_color,
        }
    }
}

/// Current sizes of the two full-resolution render targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSizes {
    pub bloom: Viewport,
    pub final_scene: Viewport,
}

/// A renderer able to run the two passes of the selective bloom frame.
///
/// The backend reads the scene; it never changes materials or categories.
pub trait RenderBackend {
    /// Where the final image goes (a swapchain view, or nothing for text output).
    type Target;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Recreate both render targets at exactly `viewport`.
    fn resize(&mut self, viewport: Viewport);

    fn target_sizes(&self) -> TargetSizes;

    /// Render the (masked) scene into the bloom target and run the bloom filter on it.
    fn render_bloom_pass(&mut self, scene: &Scene, settings: &FrameSettings)
    -> Result<(), Self::Error>;

    /// Render the scene normally, combine it with the bloom target, tone map
    /// and write the result to `target`.
    fn render_final_pass(
        &mut self,
        scene: &Scene,
        settings: &FrameSettings,
        target: &Self::Target,
    ) -> Result<(), Self::Error>;
}
