use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;

pub const SCALE_RANGE: RangeInclusive<f32> = 1.0..=10.0;
pub const FLOW_RANGE: RangeInclusive<f32> = -1.0..=1.0;
pub const EXPOSURE_RANGE: RangeInclusive<f32> = 0.1..=2.0;
pub const BLOOM_THRESHOLD_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const BLOOM_STRENGTH_RANGE: RangeInclusive<f32> = 0.0..=10.0;
pub const BLOOM_RADIUS_RANGE: RangeInclusive<f32> = 0.0..=1.0;

fn clamp(value: f32, range: &RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        return *range.start();
    }
    value.clamp(*range.start(), *range.end())
}

/// Live-tunable values shown in the control panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunableParams {
    pub scale: f32,
    pub flow_x: f32,
    pub flow_y: f32,
    pub exposure: f32,
    pub bloom_threshold: f32,
    pub bloom_strength: f32,
    pub bloom_radius: f32,
    pub controls_enabled: bool,
    pub water_color: Vec3,
    pub bloom_enabled: bool,
}

impl TunableParams {
    /// Defaults for the glowing set over a large water plane.
    pub fn bloom_set() -> Self {
        Self {
            scale: 1.0,
            flow_x: -0.2,
            flow_y: 0.2,
            exposure: 1.0,
            bloom_threshold: 0.0,
            bloom_strength: 2.5,
            bloom_radius: 0.0,
            controls_enabled: false,
            water_color: Vec3::ONE,
            bloom_enabled: true,
        }
    }

    /// Defaults for the torus knot over a small pool.
    pub fn torus_pool() -> Self {
        Self {
            scale: 4.0,
            flow_x: 1.0,
            flow_y: 1.0,
            controls_enabled: true,
            bloom_enabled: false,
            ..Self::bloom_set()
        }
    }

    /// Exposure handed to the tone mapper.
    pub fn tone_mapping_exposure(&self) -> f32 {
        self.exposure.powi(4)
    }

    /// Clamp every field into its range.
    pub fn clamped(mut self) -> Self {
        self.scale = clamp(self.scale, &SCALE_RANGE);
        self.flow_x = clamp(self.flow_x, &FLOW_RANGE);
        self.flow_y = clamp(self.flow_y, &FLOW_RANGE);
        self.exposure = clamp(self.exposure, &EXPOSURE_RANGE);
        self.bloom_threshold = clamp(self.bloom_threshold, &BLOOM_THRESHOLD_RANGE);
        self.bloom_strength = clamp(self.bloom_strength, &BLOOM_STRENGTH_RANGE);
        self.bloom_radius = clamp(self.bloom_radius, &BLOOM_RADIUS_RANGE);
        self.water_color = self.water_color.clamp(Vec3::ZERO, Vec3::ONE);
        self
    }

    /// Apply one change, clamped to its range. Returns the clamped change so
    /// callers can mirror it into scene uniforms.
    pub fn apply(&mut self, change: ParamChange) -> (ParamChange, ParamEffect) {
        let change = match change {
            ParamChange::Scale(v) => {
                self.scale = clamp(v, &SCALE_RANGE);
                ParamChange::Scale(self.scale)
            }
            ParamChange::FlowX(v) => {
                self.flow_x = clamp(v, &FLOW_RANGE);
                ParamChange::FlowX(self.flow_x)
            }
            ParamChange::FlowY(v) => {
                self.flow_y = clamp(v, &FLOW_RANGE);
                ParamChange::FlowY(self.flow_y)
            }
            ParamChange::Exposure(v) => {
                self.exposure = clamp(v, &EXPOSURE_RANGE);
                ParamChange::Exposure(self.exposure)
            }
            ParamChange::BloomThreshold(v) => {
                self.bloom_threshold = clamp(v, &BLOOM_THRESHOLD_RANGE);
                ParamChange::BloomThreshold(self.bloom_threshold)
            }
            ParamChange::BloomStrength(v) => {
                self.bloom_strength = clamp(v, &BLOOM_STRENGTH_RANGE);
                ParamChange::BloomStrength(self.bloom_strength)
            }
            ParamChange::BloomRadius(v) => {
                self.bloom_radius = clamp(v, &BLOOM_RADIUS_RANGE);
                ParamChange::BloomRadius(self.bloom_radius)
            }
            ParamChange::ControlsEnabled(on) => {
                self.controls_enabled = on;
                change
            }
            ParamChange::WaterColor(c) => {
                self.water_color = c.clamp(Vec3::ZERO, Vec3::ONE);
                ParamChange::WaterColor(self.water_color)
            }
            ParamChange::BloomEnabled(on) => {
                self.bloom_enabled = on;
                change
            }
        };
        (change, change.effect())
    }
}

impl Default for TunableParams {
    fn default() -> Self {
        Self::bloom_set()
    }
}

/// A single parameter edit, produced by the panel and consumed at the next
/// frame boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamChange {
    Scale(f32),
    FlowX(f32),
    FlowY(f32),
    Exposure(f32),
    BloomThreshold(f32),
    BloomStrength(f32),
    BloomRadius(f32),
    ControlsEnabled(bool),
    WaterColor(Vec3),
    BloomEnabled(bool),
}

/// Which part of the frame a change affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParamEffect {
    /// The change alters the bloom or tone mapping settings. A caller that
    /// draws only on demand needs a new frame to show it.
    pub rerender: bool,
}

impl ParamChange {
    pub fn effect(&self) -> ParamEffect {
        let rerender = matches!(
            self,
            ParamChange::Exposure(_)
                | ParamChange::BloomThreshold(_)
                | ParamChange::BloomStrength(_)
                | ParamChange::BloomRadius(_)
                | ParamChange::BloomEnabled(_)
        );
        ParamEffect { rerender }
    }
}

/// Errors from reading a parameter override file.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Partial parameter set read from a JSON file. Missing fields keep the demo defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParamOverrides {
    pub scale: Option<f32>,
    pub flow_x: Option<f32>,
    pub flow_y: Option<f32>,
    pub exposure: Option<f32>,
    pub bloom_threshold: Option<f32>,
    pub bloom_strength: Option<f32>,
    pub bloom_radius: Option<f32>,
    pub controls_enabled: Option<bool>,
    pub water_color: Option<Vec3>,
    pub bloom_enabled: Option<bool>,
}

impl ParamOverrides {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ParamsError> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    /// Overlay onto `base`, clamping the result.
    pub fn apply_to(&self, base: TunableParams) -> TunableParams {
        TunableParams {
            scale: self.scale.unwrap_or(base.scale),
            flow_x: self.flow_x.unwrap_or(base.flow_x),
            flow_y: self.flow_y.unwrap_or(base.flow_y),
            exposure: self.exposure.unwrap_or(base.exposure),
            bloom_threshold: self.bloom_threshold.unwrap_or(base.bloom_threshold),
            bloom_strength: self.bloom_strength.unwrap_or(base.bloom_strength),
            bloom_radius: self.bloom_radius.unwrap_or(base.bloom_radius),
            controls_enabled: self.controls_enabled.unwrap_or(base.controls_enabled),
            water_color: self.water_color.unwrap_or(base.water_color),
            bloom_enabled: self.bloom_enabled.unwrap_or(base.bloom_enabled),
        }
        .clamped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changes_are_clamped() {
        let mut params = TunableParams::default();
        let (applied, _) = params.apply(ParamChange::BloomStrength(42.0));
        assert_eq!(applied, ParamChange::BloomStrength(10.0));
        assert_eq!(params.bloom_strength, 10.0);

        params.apply(ParamChange::Exposure(0.0));
        assert_eq!(params.exposure, 0.1);

        params.apply(ParamChange::FlowX(f32::NAN));
        assert_eq!(params.flow_x, -1.0);
    }

    #[test]
    fn bloom_and_exposure_changes_rerender() {
        let mut params = TunableParams::default();
        assert!(params.apply(ParamChange::Exposure(1.5)).1.rerender);
        assert!(params.apply(ParamChange::BloomRadius(0.5)).1.rerender);
        assert!(!params.apply(ParamChange::FlowY(0.5)).1.rerender);
        assert!(!params.apply(ParamChange::Scale(3.0)).1.rerender);
    }

    #[test]
    fn exposure_is_raised_to_fourth_power() {
        let mut params = TunableParams::default();
        params.apply(ParamChange::Exposure(0.5));
        assert_eq!(params.tone_mapping_exposure(), 0.0625);
    }

    #[test]
    fn overrides_keep_missing_fields() {
        let json = r#"{ "bloom_strength": 4.0, "scale": 99 }"#;
        let overrides: ParamOverrides = serde_json::from_str(json).unwrap();
        let params = overrides.apply_to(TunableParams::torus_pool());
        assert_eq!(params.bloom_strength, 4.0);
        assert_eq!(params.scale, 10.0);
        assert_eq!(params.flow_x, 1.0);
        assert!(!params.bloom_enabled);
    }

    #[test]
    fn overrides_reject_unknown_fields() {
        assert!(serde_json::from_str::<ParamOverrides>(r#"{ "bloom": 1 }"#).is_err());
    }

    #[test]
    fn overrides_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{ "exposure": 0.8, "water_color": [0.2, 0.4, 1.0] }"#).unwrap();
        let params = ParamOverrides::load(&path)
            .unwrap()
            .apply_to(TunableParams::bloom_set());
        assert_eq!(params.exposure, 0.8);
        assert_eq!(params.water_color, Vec3::new(0.2, 0.4, 1.0));
    }
}
