use bloomwater_common::Viewport;
use bloomwater_scene::{RenderCategory, Scene};

use crate::backend::{FrameSettings, RenderBackend, TargetSizes};
use crate::substitution::SubstitutionTable;

/// Counts from one composited frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    pub frame: u64,
    pub masked: usize,
    pub restored: usize,
    pub glowing: usize,
}

/// Drives the mask, bloom, restore and composite steps of every frame.
#[derive(Debug, Default)]
pub struct SelectiveBloomCompositor {
    table: SubstitutionTable,
    frames: u64,
}

impl SelectiveBloomCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Empty between frames.
    pub fn substitutions(&self) -> &SubstitutionTable {
        &self.table
    }

    /// Resize both render targets. They match `viewport` when this returns.
    pub fn resize<B: RenderBackend>(&self, backend: &mut B, viewport: Viewport) -> TargetSizes {
        backend.resize(viewport);
        let sizes = backend.target_sizes();
        debug_assert_eq!(sizes.bloom, viewport);
        debug_assert_eq!(sizes.final_scene, viewport);
        tracing::debug!(width = viewport.width, height = viewport.height, "render targets resized");
        sizes
    }

    /// Produce one composited frame.
    ///
    /// Materials are restored even when the bloom pass fails; its error is
    /// returned afterwards and the final pass is skipped.
    pub fn render_frame<B: RenderBackend>(
        &mut self,
        scene: &mut Scene,
        settings: &FrameSettings,
        backend: &mut B,
        target: &B::Target,
    ) -> Result<FrameReport, B::Error> {
        let _span = tracing::trace_span!("frame", n = self.frames).entered();
        debug_assert!(self.table.is_empty());

        let mut report = FrameReport {
            frame: self.frames,
            glowing: scene.count_in(RenderCategory::Bloom),
            ..FrameReport::default()
        };

        if settings.bloom.enabled {
            report.masked = self.table.darken_non_bloomed(scene);
            let bloom = backend.render_bloom_pass(scene, settings);
            report.restored = self.table.restore(scene);
            bloom?;
        }

        backend.render_final_pass(scene, settings, target)?;
        self.frames += 1;
        Ok(report)
    }
}
