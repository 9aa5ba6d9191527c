//! Configuration types for sync engines and device credentials.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tapo cloud account credentials used for device login.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Reads credentials from the `TAPO_EMAIL` / `TAPO_PASSWORD` environment
    /// variables.
    pub fn from_env() -> Result<Self> {
        let email = std::env::var("TAPO_EMAIL")
            .map_err(|_| Error::MissingCredentials("TAPO_EMAIL"))?;
        let password = std::env::var("TAPO_PASSWORD")
            .map_err(|_| Error::MissingCredentials("TAPO_PASSWORD"))?;
        Ok(Self { email, password })
    }
}

/// Settings for the audio sync engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioSettings {
    /// Input device index as enumerated by the audio host.
    /// `None` selects the host's default input device.
    #[serde(default)]
    pub device_index: Option<usize>,
    /// Samples per captured frame (also the FFT size).
    #[serde(default = "default_chunk")]
    pub chunk: usize,
    /// Number of analysis bands. Only 10 is supported.
    #[serde(default = "default_num_bands")]
    pub num_bands: usize,
    /// Minimum milliseconds between color pushes to the device.
    #[serde(default = "default_push_interval_ms")]
    pub min_push_interval_ms: u64,
    /// Per-band energy history length for adaptive normalization.
    #[serde(default = "default_history_len")]
    pub history_len: usize,
}

fn default_chunk() -> usize {
    1024
}

fn default_num_bands() -> usize {
    10
}

fn default_push_interval_ms() -> u64 {
    50
}

fn default_history_len() -> usize {
    300
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            device_index: None,
            chunk: default_chunk(),
            num_bands: default_num_bands(),
            min_push_interval_ms: default_push_interval_ms(),
            history_len: default_history_len(),
        }
    }
}

impl AudioSettings {
    /// Validates value ranges. Band-count support is checked separately at
    /// engine construction.
    pub fn validate(&self) -> Result<()> {
        if self.chunk == 0 {
            return Err(Error::ConfigValidation("audio.chunk must be > 0".into()));
        }
        if self.history_len == 0 {
            return Err(Error::ConfigValidation(
                "audio.history_len must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Settings for the screen sync engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScreenSettings {
    /// Ticks per second.
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate: u32,
    /// Exponential smoothing factor applied per tick, in (0, 1].
    #[serde(default = "default_smoothing")]
    pub smoothing_factor: f32,
    /// Gamma applied to the averaged color before HSV conversion.
    #[serde(default = "default_gamma")]
    pub gamma_correction: f32,
    /// Multiplier applied to saturation (clamped to 1.0 after boost).
    #[serde(default = "default_saturation_boost")]
    pub saturation_boost: f32,
    /// Lower clamp for the brightness target (1-100).
    #[serde(default = "default_min_brightness")]
    pub min_brightness: u8,
    /// Upper clamp for the brightness target (1-100).
    #[serde(default = "default_max_brightness")]
    pub max_brightness: u8,
    /// Exponent applied to per-pixel luminance when weighting the average.
    #[serde(default = "default_power_factor")]
    pub power_factor: f32,
    /// Monitor to capture. Out-of-range indices fall back to the primary.
    #[serde(default)]
    pub monitor_index: usize,
}

fn default_refresh_rate() -> u32 {
    60
}

fn default_smoothing() -> f32 {
    0.4
}

fn default_gamma() -> f32 {
    1.2
}

fn default_saturation_boost() -> f32 {
    1.5
}

fn default_min_brightness() -> u8 {
    10
}

fn default_max_brightness() -> u8 {
    80
}

fn default_power_factor() -> f32 {
    1.8
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            refresh_rate: default_refresh_rate(),
            smoothing_factor: default_smoothing(),
            gamma_correction: default_gamma(),
            saturation_boost: default_saturation_boost(),
            min_brightness: default_min_brightness(),
            max_brightness: default_max_brightness(),
            power_factor: default_power_factor(),
            monitor_index: 0,
        }
    }
}

impl ScreenSettings {
    /// Validates value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.refresh_rate == 0 {
            return Err(Error::ConfigValidation(
                "screen.refresh_rate must be > 0".into(),
            ));
        }
        if !(self.smoothing_factor > 0.0 && self.smoothing_factor <= 1.0) {
            return Err(Error::ConfigValidation(
                "screen.smoothing_factor must be in (0, 1]".into(),
            ));
        }
        if self.gamma_correction <= 0.0 {
            return Err(Error::ConfigValidation(
                "screen.gamma_correction must be > 0".into(),
            ));
        }
        if self.saturation_boost <= 0.0 {
            return Err(Error::ConfigValidation(
                "screen.saturation_boost must be > 0".into(),
            ));
        }
        if self.min_brightness < 1
            || self.max_brightness > 100
            || self.min_brightness > self.max_brightness
        {
            return Err(Error::ConfigValidation(
                "screen brightness bounds must satisfy 1 <= min <= max <= 100".into(),
            ));
        }
        if self.power_factor < 0.0 {
            return Err(Error::ConfigValidation(
                "screen.power_factor must be >= 0".into(),
            ));
        }
        Ok(())
    }
}

/// Complete sync settings as loaded from a YAML file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SyncSettings {
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub screen: ScreenSettings,
}

impl SyncSettings {
    /// Validates both engine sections.
    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;
        self.screen.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SyncSettings::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_brightness_bounds() {
        let mut settings = ScreenSettings::default();
        settings.min_brightness = 90;
        settings.max_brightness = 40;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_refresh_rate() {
        let mut settings = ScreenSettings::default();
        settings.refresh_rate = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_smoothing() {
        let mut settings = ScreenSettings::default();
        settings.smoothing_factor = 0.0;
        assert!(settings.validate().is_err());
        settings.smoothing_factor = 1.5;
        assert!(settings.validate().is_err());
    }
}
