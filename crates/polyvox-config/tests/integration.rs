//! Integration tests for polyvox-config file I/O.

use polyvox_config::{ConfigError, EngineConfig};
use tempfile::TempDir;

#[test]
fn save_then_load_preserves_every_section() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("engine.toml");

    let mut config = EngineConfig::default();
    config.audio.sample_rate = 96000;
    config.audio.block_size = 64;
    config.envelope.release_guard_secs = 0.1;
    config.analyser.fft_size = 8192;
    config.analyser.smoothing = 0.5;
    config.voices.rebuild_on_voice_change = false;

    config.save(&path).unwrap();
    let loaded = EngineConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn default_toml_round_trips() {
    let text = EngineConfig::default().to_toml_string().unwrap();
    assert!(text.contains("[analyser]"));
    assert!(text.contains("fft_size = 2048"));
    assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), EngineConfig::default());
}

#[test]
fn missing_file_is_read_error() {
    let dir = TempDir::new().unwrap();
    let err = EngineConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
}

#[test]
fn load_or_default_without_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::load_or_default_from(dir.path().join("engine.toml")).unwrap();
    assert_eq!(config, EngineConfig::default());
}

#[test]
fn load_or_default_reports_invalid_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "[analyser]\nsmoothing = 1.5\n").unwrap();

    let err = EngineConfig::load_or_default_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "analyser.smoothing"));
}

#[test]
fn hand_written_file_loads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(
        &path,
        r#"
[audio]
sample_rate = 44100

[envelope]
gain_floor = 0.001
min_ramp_secs = 0.005

[voices]
rebuild_on_voice_change = false
"#,
    )
    .unwrap();

    let config = EngineConfig::load(&path).unwrap();
    assert_eq!(config.audio.sample_rate, 44100);
    assert_eq!(config.audio.block_size, 128);
    assert!((config.envelope.gain_floor - 0.001).abs() < 1e-9);
    assert!(!config.voices.rebuild_on_voice_change);
    assert_eq!(config.analyser.fft_size, 2048);
}
