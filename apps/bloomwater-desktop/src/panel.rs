use bloomwater_compositor::{
    BLOOM_RADIUS_RANGE, BLOOM_STRENGTH_RANGE, BLOOM_THRESHOLD_RANGE, EXPOSURE_RANGE, FLOW_RANGE,
    FrameReport, ParamChange, SCALE_RANGE, TunableParams,
};
use bloomwater_context::{Demo, FrameTimer};
use glam::Vec3;

/// Everything the panel shows besides the parameters themselves.
pub struct PanelStatus<'a> {
    pub timer: &'a FrameTimer,
    pub report: Option<FrameReport>,
    pub asset_pending: bool,
}

/// Draw the control panel over a copy of `params` and return the edits as
/// messages. Nothing is applied here; the render context does that at the
/// next frame boundary.
pub fn draw(
    ctx: &egui::Context,
    demo: Demo,
    params: &TunableParams,
    status: &PanelStatus<'_>,
) -> Vec<ParamChange> {
    let mut edited = params.clone();
    egui::SidePanel::left("controls")
        .default_width(260.0)
        .show(ctx, |ui| {
            ui.heading("Bloom Water");
            ui.separator();

            ui.label(format!(
                "{:.0} fps  avg {:.2} ms  max {:.2} ms",
                status.timer.fps(),
                status.timer.average().as_secs_f64() * 1000.0,
                status.timer.max().as_secs_f64() * 1000.0
            ));
            if let Some(report) = status.report {
                ui.label(format!(
                    "Frame {}  masked {}  glowing {}",
                    report.frame, report.masked, report.glowing
                ));
            }
            if status.asset_pending {
                ui.label("Loading scene asset...");
            }
            ui.separator();

            ui.heading("Water");
            let mut color = edited.water_color.to_array();
            ui.horizontal(|ui| {
                ui.label("Color");
                ui.color_edit_button_rgb(&mut color);
            });
            edited.water_color = Vec3::from_array(color);
            ui.add(egui::Slider::new(&mut edited.scale, SCALE_RANGE).text("scale"));
            ui.add(egui::Slider::new(&mut edited.flow_x, FLOW_RANGE).step_by(0.01).text("flowX"));
            ui.add(egui::Slider::new(&mut edited.flow_y, FLOW_RANGE).step_by(0.01).text("flowY"));

            if demo == Demo::BloomSet {
                ui.separator();
                ui.heading("Bloom");
                ui.checkbox(&mut edited.bloom_enabled, "enabled");
                ui.add(egui::Slider::new(&mut edited.exposure, EXPOSURE_RANGE).text("exposure"));
                ui.add(
                    egui::Slider::new(&mut edited.bloom_threshold, BLOOM_THRESHOLD_RANGE)
                        .step_by(0.01)
                        .text("threshold"),
                );
                ui.add(
                    egui::Slider::new(&mut edited.bloom_strength, BLOOM_STRENGTH_RANGE)
                        .step_by(0.1)
                        .text("strength"),
                );
                ui.add(
                    egui::Slider::new(&mut edited.bloom_radius, BLOOM_RADIUS_RANGE)
                        .step_by(0.01)
                        .text("radius"),
                );
                ui.separator();
                ui.checkbox(&mut edited.controls_enabled, "Enable camera controls");
            }

            ui.separator();
            ui.small("RMB drag: orbit | Wheel: zoom (when controls are enabled)");
        });
    changes_between(params, &edited)
}

/// One message per field that differs, in panel order.
fn changes_between(before: &TunableParams, after: &TunableParams) -> Vec<ParamChange> {
    let mut changes = Vec::new();
    if before.water_color != after.water_color {
        changes.push(ParamChange::WaterColor(after.water_color));
    }
    if before.scale != after.scale {
        changes.push(ParamChange::Scale(after.scale));
    }
    if before.flow_x != after.flow_x {
        changes.push(ParamChange::FlowX(after.flow_x));
    }
    if before.flow_y != after.flow_y {
        changes.push(ParamChange::FlowY(after.flow_y));
    }
    if before.bloom_enabled != after.bloom_enabled {
        changes.push(ParamChange::BloomEnabled(after.bloom_enabled));
    }
    if before.exposure != after.exposure {
        changes.push(ParamChange::Exposure(after.exposure));
    }
    if before.bloom_threshold != after.bloom_threshold {
        changes.push(ParamChange::BloomThreshold(after.bloom_threshold));
    }
    if before.bloom_strength != after.bloom_strength {
        changes.push(ParamChange::BloomStrength(after.bloom_strength));
    }
    if before.bloom_radius != after.bloom_radius {
        changes.push(ParamChange::BloomRadius(after.bloom_radius));
    }
    if before.controls_enabled != after.controls_enabled {
        changes.push(ParamChange::ControlsEnabled(after.controls_enabled));
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_params_emit_nothing() {
        let params = TunableParams::bloom_set();
        assert!(changes_between(&params, &params.clone()).is_empty());
    }

    #[test]
    fn each_edit_becomes_one_message() {
        let before = TunableParams::bloom_set();
        let after = TunableParams {
            flow_x: 0.5,
            bloom_strength: 7.0,
            controls_enabled: true,
            ..before.clone()
        };
        assert_eq!(
            changes_between(&before, &after),
            vec![
                ParamChange::FlowX(0.5),
                ParamChange::BloomStrength(7.0),
                ParamChange::ControlsEnabled(true),
            ]
        );
    }

    #[test]
    fn idle_panel_run_emits_nothing() {
        let ctx = egui::Context::default();
        let timer = FrameTimer::default();
        let status = PanelStatus {
            timer: &timer,
            report: None,
            asset_pending: true,
        };
        let params = TunableParams::torus_pool();
        let mut changes = Vec::new();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            changes = draw(ctx, Demo::TorusPool, &params, &status);
        });
        assert!(changes.is_empty());
    }
}
