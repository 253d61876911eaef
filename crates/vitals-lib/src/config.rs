use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How raw scrollbar values translate into viewport pans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollMode {
    /// Symmetric signed delta against the previous raw value.
    Signed,
    /// Asymmetric rule kept for bit-compatible replay of recorded
    /// sessions: proportional on increase, a fixed `-|value|` step on
    /// decrease.
    Legacy,
}

/// Tunable playback constants shared by both graph sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Tick period at rate multiplier 1.0, in milliseconds.
    pub base_interval_ms: u64,
    /// Samples of history included in a slice at neutral zoom.
    pub slice_window: usize,
    /// Scale applied to the zoom factor per zoom-in press.
    pub zoom_step: f64,
    /// Presses allowed in each direction from the neutral zoom state.
    pub max_zoom_steps: i32,
    /// Visible x-span of a freshly created viewport, in samples.
    pub initial_view_width: f64,
    /// Shift applied to the computed x-range for renderers that reserve
    /// a left margin for axis labels. The bundled renderers do not.
    pub x_axis_offset: f64,
    /// Lower bound of the playback-rate multiplier.
    pub min_rate: f64,
    /// Upper bound of the playback-rate multiplier.
    pub max_rate: f64,
    pub scroll_mode: ScrollMode,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: 200,
            slice_window: 1000,
            zoom_step: 0.91,
            max_zoom_steps: 5,
            initial_view_width: 60.0,
            x_axis_offset: 0.0,
            min_rate: 0.25,
            max_rate: 2.0,
            scroll_mode: ScrollMode::Signed,
        }
    }
}

impl PlaybackConfig {
    pub fn base_interval(&self) -> Duration {
        Duration::from_millis(self.base_interval_ms)
    }

    /// Map a raw 0..=100 speed-slider value linearly onto the rate range.
    pub fn rate_for_slider(&self, raw: u8) -> f64 {
        let frac = f64::from(raw.min(100)) / 100.0;
        self.min_rate + (self.max_rate - self.min_rate) * frac
    }

    /// Clamp an arbitrary multiplier into the configured rate range.
    pub fn clamp_rate(&self, rate: f64) -> f64 {
        rate.clamp(self.min_rate, self.max_rate)
    }
}

/// Read a `PlaybackConfig` from a TOML file. Missing keys fall back to
/// the defaults above.
pub fn load_config(path: &Path) -> anyhow::Result<PlaybackConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slider_mapping_is_linear_over_rate_range() {
        let cfg = PlaybackConfig::default();
        assert_eq!(cfg.rate_for_slider(0), 0.25);
        assert_eq!(cfg.rate_for_slider(100), 2.0);
        assert!((cfg.rate_for_slider(50) - 1.125).abs() < 1e-12);
        // Out-of-range raw values saturate at the top of the slider.
        assert_eq!(cfg.rate_for_slider(200), 2.0);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg: PlaybackConfig =
            toml::from_str("base_interval_ms = 100\nscroll_mode = \"legacy\"").unwrap();
        assert_eq!(cfg.base_interval_ms, 100);
        assert_eq!(cfg.scroll_mode, ScrollMode::Legacy);
        assert_eq!(cfg.slice_window, 1000);
        assert_eq!(cfg.max_zoom_steps, 5);
    }
}
