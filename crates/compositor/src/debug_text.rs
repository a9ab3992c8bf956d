use bloomwater_common::Viewport;
use bloomwater_scene::{RenderKind, Scene};
use std::convert::Infallible;
use std::fmt::Write;

use crate::backend::{FrameSettings, RenderBackend, TargetSizes};

/// Backend that renders each pass as a human-readable listing.
///
/// Used for headless runs and tests of the compositor; no GPU involved.
#[derive(Debug, Default)]
pub struct DebugTextBackend {
    viewport: Viewport,
    passes: Vec<String>,
}

impl DebugTextBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pass rendered so far, oldest first.
    pub fn passes(&self) -> &[String] {
        &self.passes
    }

    pub fn take_passes(&mut self) -> Vec<String> {
        std::mem::take(&mut self.passes)
    }

    fn listing(&self, title: &str, scene: &Scene, settings: &FrameSettings) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== {title} ({}x{}, t={:.2}) ===",
            self.viewport.width, self.viewport.height, settings.time
        );
        let p = settings.camera_position;
        let _ = writeln!(out, "Camera: ({:.1}, {:.1}, {:.1})", p.x, p.y, p.z);
        for (id, object) in scene.objects() {
            let kind = match object.kind {
                RenderKind::Mesh => "mesh",
                RenderKind::Water => "water",
            };
            let p = object.transform.position;
            let _ = writeln!(
                out,
                "  [{}] {:<12} {kind:<5} {:?} material={} pos=({:.2}, {:.2}, {:.2})",
                id.short(),
                object.name,
                object.category,
                object.material.label(),
                p.x,
                p.y,
                p.z
            );
        }
        out
    }
}

impl RenderBackend for DebugTextBackend {
    type Target = ();
    type Error = Infallible;

    fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn target_sizes(&self) -> TargetSizes {
        TargetSizes {
            bloom: self.viewport,
            final_scene: self.viewport,
        }
    }

    fn render_bloom_pass(&mut self, scene: &Scene, settings: &FrameSettings) -> Result<(), Infallible> {
        let b = settings.bloom;
        let title = format!(
            "bloom pass threshold={:.2} strength={:.2} radius={:.2}",
            b.threshold, b.strength, b.radius
        );
        let listing = self.listing(&title, scene, settings);
        self.passes.push(listing);
        Ok(())
    }

    fn render_final_pass(
        &mut self,
        scene: &Scene,
        settings: &FrameSettings,
        _target: &(),
    ) -> Result<(), Infallible> {
        let title = format!(
            "final pass exposure={:.3} bloom={}",
            settings.exposure,
            if settings.bloom.enabled { "on" } else { "off" }
        );
        let listing = self.listing(&title, scene, settings);
        self.passes.push(listing);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::SelectiveBloomCompositor;
    use crate::params::TunableParams;
    use bloomwater_scene::{Geometry, Material, Renderable, SceneBuilder};

    #[test]
    fn lists_masked_materials_in_bloom_pass() {
        let mut scene = SceneBuilder::bloom_set();
        scene.add(Renderable::mesh(
            "rock",
            Geometry::plane(1.0, 1.0),
            Material::default(),
        ));
        let settings = FrameSettings::new(&scene, &TunableParams::default(), 0.0);
        let mut backend = DebugTextBackend::new();
        backend.resize(Viewport::new(800, 600));
        SelectiveBloomCompositor::new()
            .render_frame(&mut scene, &settings, &mut backend, &())
            .unwrap();

        let passes = backend.passes();
        assert_eq!(passes.len(), 2);
        assert!(passes[0].contains("bloom pass"));
        assert!(passes[0].contains("800x600"));
        assert!(passes[0].contains("material=dark"));
        assert!(passes[0].contains("material=water"));
        assert!(passes[1].contains("final pass"));
        assert!(!passes[1].contains("material=dark"));
        assert!(passes[1].contains("material=standard"));
    }

    #[test]
    fn empty_scene_renders_header_only() {
        let scene = Scene::new(Default::default());
        let settings = FrameSettings::new(&scene, &TunableParams::torus_pool(), 1.5);
        let mut backend = DebugTextBackend::new();
        backend.render_final_pass(&scene, &settings, &()).unwrap();
        let out = &backend.passes()[0];
        assert!(out.contains("bloom=off"));
        assert!(out.contains("t=1.50"));
        assert_eq!(out.lines().count(), 2);
    }
}
