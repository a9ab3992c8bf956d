use bloomwater_common::Viewport;
use bloomwater_compositor::{
    FrameReport, FrameSettings, ParamChange, ParamEffect, RenderBackend,
    SelectiveBloomCompositor, TargetSizes, TunableParams,
};
use bloomwater_scene::{AssetError, AssetLoader, PendingAsset, Scene, SceneAsset, SceneBuilder};
use glam::Vec2;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use crate::timing::FrameTimer;

/// Which demo scene to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Demo {
    /// Glowing set loaded from an asset, over a large water plane.
    #[default]
    BloomSet,
    /// Spinning torus knot and a pool; bloom off by default.
    TorusPool,
}

impl Demo {
    pub fn default_params(self) -> TunableParams {
        match self {
            Demo::BloomSet => TunableParams::bloom_set(),
            Demo::TorusPool => TunableParams::torus_pool(),
        }
    }

    fn build_scene(self) -> Scene {
        match self {
            Demo::BloomSet => SceneBuilder::bloom_set(),
            Demo::TorusPool => SceneBuilder::torus_pool(),
        }
    }

    fn uses_asset(self) -> bool {
        matches!(self, Demo::BloomSet)
    }
}

/// Startup configuration for a [`RenderContext`].
#[derive(Debug, Clone, Default)]
pub struct ContextConfig {
    pub demo: Demo,
    /// Scene asset to attach once loaded. Ignored by demos without one.
    pub asset: Option<PathBuf>,
    /// Initial parameters; the demo defaults when `None`.
    pub params: Option<TunableParams>,
    pub viewport: Viewport,
}

/// Owns everything the frame loop reads or writes.
pub struct RenderContext {
    demo: Demo,
    scene: Scene,
    params: TunableParams,
    compositor: SelectiveBloomCompositor,
    pending_changes: VecDeque<ParamChange>,
    asset: Option<PendingAsset>,
    viewport: Viewport,
    time: f32,
    timer: FrameTimer,
    last_report: Option<FrameReport>,
}

impl RenderContext {
    pub fn new(config: ContextConfig) -> Self {
        let demo = config.demo;
        let params = config
            .params
            .unwrap_or_else(|| demo.default_params())
            .clamped();

        let mut scene = demo.build_scene();
        scene.camera_mut().aspect = config.viewport.aspect();
        scene
            .camera_mut()
            .set_controls_enabled(params.controls_enabled);
        if let Some(water) = scene.water_mut() {
            water.color = params.water_color;
            water.scale = params.scale;
            water.reset_flow(Vec2::new(params.flow_x, params.flow_y));
        }

        let asset = match (demo.uses_asset(), config.asset) {
            (true, Some(path)) => Some(AssetLoader::spawn(path)),
            _ => None,
        };

        tracing::info!(?demo, objects = scene.len(), "render context ready");

        Self {
            demo,
            scene,
            params,
            compositor: SelectiveBloomCompositor::new(),
            pending_changes: VecDeque::new(),
            asset,
            viewport: config.viewport,
            time: 0.0,
            timer: FrameTimer::default(),
            last_report: None,
        }
    }

    pub fn demo(&self) -> Demo {
        self.demo
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn params(&self) -> &TunableParams {
        &self.params
    }

    pub fn compositor(&self) -> &SelectiveBloomCompositor {
        &self.compositor
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    pub fn last_report(&self) -> Option<FrameReport> {
        self.last_report
    }

    pub fn asset_pending(&self) -> bool {
        self.asset.is_some()
    }

    /// Queue a parameter change for the next frame boundary.
    pub fn queue_change(&mut self, change: ParamChange) {
        self.pending_changes.push_back(change);
    }

    pub fn pending_changes(&self) -> usize {
        self.pending_changes.len()
    }

    /// Apply every queued change in order and mirror it into scene uniforms.
    pub fn apply_pending_changes(&mut self) -> ParamEffect {
        let mut effect = ParamEffect::default();
        while let Some(change) = self.pending_changes.pop_front() {
            let (applied, change_effect) = self.params.apply(change);
            self.mirror(applied);
            effect.rerender |= change_effect.rerender;
            tracing::debug!(?applied, "parameter changed");
        }
        effect
    }

    fn mirror(&mut self, change: ParamChange) {
        match change {
            ParamChange::ControlsEnabled(on) => self.scene.camera_mut().set_controls_enabled(on),
            ParamChange::Scale(_)
            | ParamChange::FlowX(_)
            | ParamChange::FlowY(_)
            | ParamChange::WaterColor(_) => {
                let Some(water) = self.scene.water_mut() else {
                    return;
                };
                match change {
                    ParamChange::Scale(v) => water.scale = v,
                    ParamChange::FlowX(v) => water.set_flow_x(v),
                    ParamChange::FlowY(v) => water.set_flow_y(v),
                    ParamChange::WaterColor(c) => water.color = c,
                    _ => {}
                }
            }
            // Read from the parameters when building the frame settings.
            ParamChange::Exposure(_)
            | ParamChange::BloomThreshold(_)
            | ParamChange::BloomStrength(_)
            | ParamChange::BloomRadius(_)
            | ParamChange::BloomEnabled(_) => {}
        }
    }

    /// Attach the asset if its load has finished. Returns true once resolved.
    pub fn poll_asset(&mut self) -> bool {
        let Some(pending) = &mut self.asset else {
            return false;
        };
        match pending.try_take() {
            None => false,
            Some(result) => {
                self.asset = None;
                self.attach_loaded(result);
                true
            }
        }
    }

    /// Block until the pending asset load (if any) resolves.
    pub fn finish_asset_load(&mut self) {
        if let Some(pending) = self.asset.take() {
            let result = pending.wait();
            self.attach_loaded(result);
        }
    }

    fn attach_loaded(&mut self, result: Result<SceneAsset, AssetError>) {
        match result {
            Ok(asset) => {
                self.scene.attach_asset(asset);
            }
            Err(e) => {
                tracing::error!("scene asset failed to load, continuing without it: {e}");
            }
        }
    }

    /// Orbit the camera by a mouse delta. No-op while controls are disabled.
    pub fn orbit_camera(&mut self, dx: f32, dy: f32) {
        self.scene.camera_mut().orbit(dx, dy);
    }

    pub fn zoom_camera(&mut self, steps: f32) {
        self.scene.camera_mut().zoom(steps);
    }

    /// Resize the camera and both render targets before the next frame.
    pub fn resize<B: RenderBackend>(&mut self, backend: &mut B, width: u32, height: u32) -> TargetSizes {
        self.viewport = Viewport::new(width, height);
        self.scene.camera_mut().aspect = self.viewport.aspect();
        self.compositor.resize(backend, self.viewport)
    }

    /// Run one frame: apply queued changes, pick up the asset, animate, composite.
    pub fn frame<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        target: &B::Target,
        dt: Duration,
    ) -> Result<FrameReport, B::Error> {
        self.timer.record(dt);
        let dt = dt.as_secs_f32().min(0.1);

        self.apply_pending_changes();
        self.poll_asset();
        self.time += dt;
        self.scene.advance(dt);

        let settings = FrameSettings::new(&self.scene, &self.params, self.time);
        let report = self
            .compositor
            .render_frame(&mut self.scene, &settings, backend, target)?;
        tracing::trace!(
            frame = report.frame,
            masked = report.masked,
            glowing = report.glowing,
            "frame composited"
        );
        self.last_report = Some(report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloomwater_compositor::DebugTextBackend;
    use bloomwater_scene::{RenderCategory, RenderKind};

    const FRAME: Duration = Duration::from_millis(16);

    const ASSET: &str = r#"{
        "objects": [
            { "name": "arch", "geometry": { "type": "torus_knot" },
              "material": { "type": "basic", "color": [1.0, 0.3, 0.8] } },
            { "name": "floor", "geometry": { "type": "box", "width": 4, "height": 0.2, "depth": 4 } }
        ]
    }"#;

    fn flow_len(ctx: &RenderContext) -> f32 {
        ctx.scene().water().unwrap().flow_direction().length()
    }

    #[test]
    fn failed_asset_leaves_procedural_scene() {
        let mut ctx = RenderContext::new(ContextConfig {
            asset: Some("/no/such/dir/set.json".into()),
            ..ContextConfig::default()
        });
        ctx.finish_asset_load();
        assert!(!ctx.asset_pending());
        assert_eq!(ctx.scene().len(), 1);
        assert_eq!(ctx.scene().lights().len(), 2);
        let only = ctx.scene().objects().values().next().unwrap();
        assert_eq!(only.kind, RenderKind::Water);

        let mut backend = DebugTextBackend::new();
        assert!(ctx.frame(&mut backend, &(), FRAME).is_ok());
    }

    #[test]
    fn loaded_asset_glows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set.json");
        std::fs::write(&path, ASSET).unwrap();

        let mut ctx = RenderContext::new(ContextConfig {
            asset: Some(path),
            ..ContextConfig::default()
        });
        ctx.finish_asset_load();
        assert_eq!(ctx.scene().count_in(RenderCategory::Bloom), 2);

        let mut backend = DebugTextBackend::new();
        let report = ctx.frame(&mut backend, &(), FRAME).unwrap();
        assert_eq!(report.glowing, 2);
        assert_eq!(report.masked, 0);
        assert!(ctx.compositor().substitutions().is_empty());
    }

    #[test]
    fn frame_picks_up_asset_when_ready() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set.json");
        std::fs::write(&path, ASSET).unwrap();
        let mut ctx = RenderContext::new(ContextConfig {
            asset: Some(path),
            ..ContextConfig::default()
        });
        let mut backend = DebugTextBackend::new();
        for _ in 0..10_000 {
            ctx.frame(&mut backend, &(), FRAME).unwrap();
            if !ctx.asset_pending() {
                break;
            }
            std::thread::yield_now();
        }
        assert!(!ctx.asset_pending());
        assert_eq!(ctx.scene().len(), 3);
    }

    #[test]
    fn torus_demo_ignores_asset() {
        let ctx = RenderContext::new(ContextConfig {
            demo: Demo::TorusPool,
            asset: Some("assets/set.json".into()),
            ..ContextConfig::default()
        });
        assert!(!ctx.asset_pending());
        assert!(!ctx.params().bloom_enabled);
        assert!(ctx.scene().camera().controls_enabled());
    }

    #[test]
    fn changes_wait_for_frame_boundary() {
        let mut ctx = RenderContext::new(ContextConfig::default());
        ctx.queue_change(ParamChange::BloomStrength(7.0));
        assert_eq!(ctx.params().bloom_strength, 2.5);
        assert_eq!(ctx.pending_changes(), 1);

        let mut backend = DebugTextBackend::new();
        ctx.frame(&mut backend, &(), FRAME).unwrap();
        assert_eq!(ctx.params().bloom_strength, 7.0);
        assert_eq!(ctx.pending_changes(), 0);
        assert!(backend.passes()[0].contains("strength=7.00"));
    }

    #[test]
    fn flow_changes_keep_unit_direction() {
        let mut ctx = RenderContext::new(ContextConfig::default());
        let initial = ctx.scene().water().unwrap().flow_direction();
        assert_eq!(initial, glam::Vec2::new(-0.2, 0.2));
        for v in [-1.0, -0.5, 0.0, 0.01, 0.5, 1.0] {
            ctx.queue_change(ParamChange::FlowX(v));
            ctx.apply_pending_changes();
            assert!((flow_len(&ctx) - 1.0).abs() < 1e-5);
            ctx.queue_change(ParamChange::FlowY(-v));
            ctx.apply_pending_changes();
            assert!((flow_len(&ctx) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn water_uniforms_follow_params() {
        let mut ctx = RenderContext::new(ContextConfig::default());
        ctx.queue_change(ParamChange::Scale(6.0));
        ctx.queue_change(ParamChange::WaterColor(glam::Vec3::new(0.1, 0.5, 0.9)));
        let effect = ctx.apply_pending_changes();
        assert!(!effect.rerender);
        let water = ctx.scene().water().unwrap();
        assert_eq!(water.scale, 6.0);
        assert_eq!(water.color, glam::Vec3::new(0.1, 0.5, 0.9));

        ctx.queue_change(ParamChange::Exposure(1.2));
        assert!(ctx.apply_pending_changes().rerender);
    }

    #[test]
    fn resize_updates_targets_and_aspect() {
        let mut ctx = RenderContext::new(ContextConfig::default());
        let mut backend = DebugTextBackend::new();
        let sizes = ctx.resize(&mut backend, 1024, 512);
        assert_eq!(sizes.bloom, Viewport::new(1024, 512));
        assert_eq!(sizes.final_scene, Viewport::new(1024, 512));
        assert_eq!(ctx.scene().camera().aspect, 2.0);

        ctx.frame(&mut backend, &(), FRAME).unwrap();
        assert!(backend.passes()[0].contains("1024x512"));
    }

    #[test]
    fn controls_toggle_reaches_camera() {
        let mut ctx = RenderContext::new(ContextConfig::default());
        let start = ctx.scene().camera().position;
        ctx.orbit_camera(50.0, 0.0);
        assert_eq!(ctx.scene().camera().position, start);

        ctx.queue_change(ParamChange::ControlsEnabled(true));
        ctx.apply_pending_changes();
        ctx.orbit_camera(50.0, 0.0);
        assert_ne!(ctx.scene().camera().position, start);
    }

    #[test]
    fn table_empty_after_every_frame() {
        let mut ctx = RenderContext::new(ContextConfig {
            demo: Demo::TorusPool,
            ..ContextConfig::default()
        });
        ctx.queue_change(ParamChange::BloomEnabled(true));
        let mut backend = DebugTextBackend::new();
        for _ in 0..5 {
            let report = ctx.frame(&mut backend, &(), FRAME).unwrap();
            assert_eq!(report.masked, report.restored);
            assert_eq!(report.masked, 2);
            assert!(ctx.compositor().substitutions().is_empty());
        }
    }
}
