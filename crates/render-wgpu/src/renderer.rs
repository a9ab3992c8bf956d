use crate::bloom::BloomChain;
use crate::composite::FinalComposite;
use crate::error::RenderError;
use crate::scene_pass::ScenePass;
use crate::targets::SceneTarget;
use bloomwater_common::Viewport;
use bloomwater_compositor::{FrameSettings, RenderBackend, TargetSizes};
use bloomwater_scene::Scene;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// wgpu implementation of the two-pass selective bloom frame.
///
/// Each pass is submitted on its own: object uniforms are rewritten between
/// the passes and a queued write only lands at the next submit.
pub struct BloomRenderer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    scene_pass: ScenePass,
    bloom_target: SceneTarget,
    final_target: SceneTarget,
    chain: BloomChain,
    composite: FinalComposite,
    lost: Arc<AtomicBool>,
}

impl BloomRenderer {
    /// Build every pipeline and both targets at `viewport`.
    ///
    /// Validation errors raised while building are returned instead of
    /// reaching wgpu's uncaptured error handler.
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        surface_format: wgpu::TextureFormat,
        viewport: Viewport,
    ) -> Result<Self, RenderError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let scene_pass = ScenePass::new(&device);
        let bloom_target = SceneTarget::new(&device, "bloom_target", viewport);
        let final_target = SceneTarget::new(&device, "final_target", viewport);
        let chain = BloomChain::new(&device, &bloom_target.color, viewport);
        let composite = FinalComposite::new(
            &device,
            surface_format,
            &final_target.color,
            &bloom_target.color,
        );
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::Pipeline(error.to_string()));
        }

        let lost = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            tracing::error!(?reason, %message, "GPU device lost");
            flag.store(true, Ordering::SeqCst);
        });

        tracing::info!(
            width = viewport.width,
            height = viewport.height,
            ?surface_format,
            "bloom renderer ready"
        );
        Ok(Self {
            device,
            queue,
            scene_pass,
            bloom_target,
            final_target,
            chain,
            composite,
            lost,
        })
    }

    pub fn device_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    fn check_device(&self) -> Result<(), RenderError> {
        if self.device_lost() {
            Err(RenderError::DeviceLost)
        } else {
            Ok(())
        }
    }

    pub fn bloom_mip_sizes(&self) -> [Viewport; crate::bloom::MIP_COUNT] {
        self.chain.mip_sizes()
    }
}

impl RenderBackend for BloomRenderer {
    type Target = wgpu::TextureView;
    type Error = RenderError;

    fn resize(&mut self, viewport: Viewport) {
        self.bloom_target = SceneTarget::new(&self.device, "bloom_target", viewport);
        self.final_target = SceneTarget::new(&self.device, "final_target", viewport);
        self.chain
            .resize(&self.device, &self.bloom_target.color, viewport);
        self.composite
            .rebind(&self.device, &self.final_target.color, &self.bloom_target.color);
    }

    fn target_sizes(&self) -> TargetSizes {
        TargetSizes {
            bloom: self.bloom_target.size,
            final_scene: self.final_target.size,
        }
    }

    fn render_bloom_pass(&mut self, scene: &Scene, settings: &FrameSettings) -> Result<(), RenderError> {
        self.check_device()?;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("bloom_encoder"),
            });
        self.scene_pass.encode(
            &self.device,
            &self.queue,
            &mut encoder,
            scene,
            settings,
            &self.bloom_target,
            "bloom_scene_pass",
        );
        self.chain
            .encode(&self.queue, &mut encoder, &settings.bloom, &self.bloom_target.color);
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn render_final_pass(
        &mut self,
        scene: &Scene,
        settings: &FrameSettings,
        target: &wgpu::TextureView,
    ) -> Result<(), RenderError> {
        self.check_device()?;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("final_encoder"),
            });
        self.scene_pass.encode(
            &self.device,
            &self.queue,
            &mut encoder,
            scene,
            settings,
            &self.final_target,
            "final_scene_pass",
        );
        let bloom_mix = if settings.bloom.enabled { 1.0 } else { 0.0 };
        self.composite
            .encode(&self.queue, &mut encoder, settings.exposure, bloom_mix, target);
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}
