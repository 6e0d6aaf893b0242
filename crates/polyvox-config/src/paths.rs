//! Platform-specific location of the engine configuration file.
//!
//! - Linux: `~/.config/polyvox/engine.toml`
//! - macOS: `~/Library/Application Support/polyvox/engine.toml`
//! - Windows: `%APPDATA%\polyvox\engine.toml`

use std::path::PathBuf;

/// Application name used for directory paths.
const APP_NAME: &str = "polyvox";

/// File name of the engine configuration.
const ENGINE_FILE: &str = "engine.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the path `EngineConfig::load_or_default` reads.
pub fn engine_config_path() -> PathBuf {
    user_config_dir().join(ENGINE_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_file_lives_in_app_dir() {
        let path = engine_config_path();
        assert!(path.ends_with("polyvox/engine.toml"));
        assert_eq!(path.parent(), Some(user_config_dir().as_path()));
    }
}
