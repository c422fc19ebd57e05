use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_SCALE: f64 = 70.0;
pub const MIN_SCALE: f64 = 5.0;
pub const MAX_SCALE: f64 = 1000.0;
pub const ZOOM_FACTOR: f64 = 1.1;
pub const WHEEL_DEBOUNCE_MS: u64 = 60;
pub const MIN_WHEEL_DEBOUNCE_MS: u64 = 50;
pub const MAX_WHEEL_DEBOUNCE_MS: u64 = 100;

/// Tunables for the pan/zoom controller. Scales are in pixels per meter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    pub default_scale: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub zoom_factor: f64,
    pub wheel_debounce_ms: u64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_scale: DEFAULT_SCALE,
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            zoom_factor: ZOOM_FACTOR,
            wheel_debounce_ms: WHEEL_DEBOUNCE_MS,
        }
    }
}

impl ViewConfig {
    /// Coerces user-supplied values into a usable configuration: a positive
    /// scale range, a zoom factor in (1, 1.2], a wheel debounce window of
    /// 50 to 100 ms and a default scale inside the range.
    pub fn normalized(mut self) -> Self {
        if !(self.min_scale.is_finite() && self.min_scale > 0.0) {
            self.min_scale = MIN_SCALE;
        }
        if !(self.max_scale.is_finite() && self.max_scale >= self.min_scale) {
            self.max_scale = self.min_scale.max(MAX_SCALE);
        }
        if !(self.zoom_factor > 1.0 && self.zoom_factor <= 1.2) {
            self.zoom_factor = ZOOM_FACTOR;
        }
        self.wheel_debounce_ms = self
            .wheel_debounce_ms
            .clamp(MIN_WHEEL_DEBOUNCE_MS, MAX_WHEEL_DEBOUNCE_MS);
        if !self.default_scale.is_finite() {
            self.default_scale = DEFAULT_SCALE;
        }
        self.default_scale = self.clamp_scale(self.default_scale);
        self
    }

    pub fn clamp_scale(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }

    pub fn wheel_debounce(&self) -> Duration {
        Duration::from_millis(self.wheel_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_survive_normalization() {
        assert_eq!(ViewConfig::default().normalized(), ViewConfig::default());
    }

    #[test]
    fn out_of_range_zoom_factor_is_reset() {
        let config = ViewConfig {
            zoom_factor: 3.0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(config.zoom_factor, ZOOM_FACTOR);
    }

    #[test]
    fn wheel_debounce_is_kept_inside_window() {
        let off = ViewConfig {
            wheel_debounce_ms: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(off.wheel_debounce(), Duration::from_millis(MIN_WHEEL_DEBOUNCE_MS));

        let sluggish = ViewConfig {
            wheel_debounce_ms: 5_000,
            ..Default::default()
        }
        .normalized();
        assert_eq!(sluggish.wheel_debounce_ms, MAX_WHEEL_DEBOUNCE_MS);
    }

    #[test]
    fn default_scale_is_pulled_into_range() {
        let config = ViewConfig {
            default_scale: 1.0e6,
            ..Default::default()
        }
        .normalized();
        assert_eq!(config.default_scale, MAX_SCALE);
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: ViewConfig = serde_json::from_str(r#"{"max_scale": 400.0}"#).unwrap();
        assert_eq!(config.max_scale, 400.0);
        assert_eq!(config.min_scale, MIN_SCALE);
    }
}
