//! Engine constants loaded from TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::paths;

/// Smallest accepted analyser frame.
pub const MIN_FFT_SIZE: usize = 32;

/// Largest accepted analyser frame.
pub const MAX_FFT_SIZE: usize = 32768;

/// Top-level engine configuration.
///
/// Every section and field has a default, so a file only needs to name the
/// settings it changes:
///
/// ```toml
/// [audio]
/// sample_rate = 44100
///
/// [analyser]
/// fft_size = 4096
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Clock and render quantum.
    pub audio: AudioConfig,
    /// Envelope and parameter-smoothing constants.
    pub envelope: EnvelopeConfig,
    /// Spectrum tap settings.
    pub analyser: AnalyserConfig,
    /// Voice reconciliation policy.
    pub voices: VoiceConfig,
}

/// `[audio]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Frames per render quantum.
    pub block_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 128,
        }
    }
}

/// `[envelope]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Near-zero gain that attacks start from and releases fade to.
    pub gain_floor: f32,
    /// Shortest attack or release ramp, used when the requested time is not positive.
    pub min_ramp_secs: f64,
    /// Extra time after a release before the oscillator stops and nodes are disposed.
    pub release_guard_secs: f64,
    /// Time constant for bus-level and filter parameter changes.
    pub smoothing_time_constant_secs: f64,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            gain_floor: 0.0001,
            min_ramp_secs: 0.001,
            release_guard_secs: 0.05,
            smoothing_time_constant_secs: 0.02,
        }
    }
}

/// `[analyser]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyserConfig {
    /// FFT frame size; a power of two.
    pub fft_size: usize,
    /// Frame-to-frame smoothing in `[0, 1]`.
    pub smoothing: f32,
    /// Level mapped to byte 0.
    pub min_decibels: f32,
    /// Level mapped to byte 255.
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

/// `[voices]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Rebuild every held bank when the voice count changes.
    ///
    /// When false, held banks keep their size and only newly pressed notes
    /// use the new count.
    pub rebuild_on_voice_change: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            rebuild_on_voice_change: true,
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Load from the user config directory, falling back to defaults when
    /// no file exists there.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        Self::load_or_default_from(paths::engine_config_path())
    }

    /// Load `path` if it exists, otherwise return defaults.
    ///
    /// A file that exists but fails to parse or validate is an error.
    pub fn load_or_default_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every setting is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audio.sample_rate == 0 {
            return Err(ConfigError::invalid("audio.sample_rate", "must be positive"));
        }
        if self.audio.block_size == 0 {
            return Err(ConfigError::invalid("audio.block_size", "must be positive"));
        }

        let env = &self.envelope;
        if !(env.gain_floor > 0.0 && env.gain_floor < 1.0) {
            return Err(ConfigError::invalid(
                "envelope.gain_floor",
                "must be between 0 and 1 exclusive",
            ));
        }
        for (field, value) in [
            ("envelope.min_ramp_secs", env.min_ramp_secs),
            (
                "envelope.smoothing_time_constant_secs",
                env.smoothing_time_constant_secs,
            ),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::invalid(field, "must be a positive number of seconds"));
            }
        }
        if !(env.release_guard_secs >= 0.0 && env.release_guard_secs.is_finite()) {
            return Err(ConfigError::invalid(
                "envelope.release_guard_secs",
                "must not be negative",
            ));
        }

        let an = &self.analyser;
        if !an.fft_size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&an.fft_size)
        {
            return Err(ConfigError::invalid(
                "analyser.fft_size",
                format!("must be a power of two in {MIN_FFT_SIZE}..={MAX_FFT_SIZE}"),
            ));
        }
        if !(0.0..=1.0).contains(&an.smoothing) {
            return Err(ConfigError::invalid("analyser.smoothing", "must be in [0, 1]"));
        }
        if !(an.min_decibels < an.max_decibels) {
            return Err(ConfigError::invalid(
                "analyser.min_decibels",
                "must be below analyser.max_decibels",
            ));
        }
        Ok(())
    }

    /// Sample rate as the graph's `f32`.
    pub fn sample_rate_hz(&self) -> f32 {
        self.audio.sample_rate as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.audio.sample_rate, 48000);
        assert_eq!(config.analyser.fft_size, 2048);
        assert!(config.voices.rebuild_on_voice_change);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [audio]
            sample_rate = 44100
            "#,
        )
        .unwrap();
        assert_eq!(config.audio.sample_rate, 44100);
        assert_eq!(config.audio.block_size, 128);
        assert_eq!(config.envelope, EnvelopeConfig::default());
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn rejects_non_power_of_two_fft() {
        let err = EngineConfig::from_toml_str("[analyser]\nfft_size = 1000\n").unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { ref field, .. } if field == "analyser.fft_size")
        );
    }

    #[test]
    fn rejects_inverted_decibel_range() {
        let mut config = EngineConfig::default();
        config.analyser.min_decibels = -20.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_gain_floor() {
        let mut config = EngineConfig::default();
        config.envelope.gain_floor = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = EngineConfig::from_toml_str("[audio\nsample_rate = ").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }
}
