//! Engine configuration for the polyvox voice engine.
//!
//! [`EngineConfig`] holds the constants the engine is built with: sample
//! rate and render quantum, envelope floors and guard times, analyser
//! resolution, and the voice-count reconciliation policy. It is stored as
//! TOML in the user's config directory.
//!
//! # Example
//!
//! ```rust,no_run
//! use polyvox_config::{EngineConfig, paths};
//!
//! // Defaults unless ~/.config/polyvox/engine.toml exists
//! let mut config = EngineConfig::load_or_default().unwrap();
//! config.analyser.fft_size = 4096;
//! config.save(paths::engine_config_path()).unwrap();
//! ```

mod engine_config;
mod error;

/// Platform-specific paths for configuration.
pub mod paths;

pub use engine_config::{
    AnalyserConfig, AudioConfig, EngineConfig, EnvelopeConfig, MAX_FFT_SIZE, MIN_FFT_SIZE,
    VoiceConfig,
};
pub use error::ConfigError;
pub use paths::{engine_config_path, user_config_dir};
