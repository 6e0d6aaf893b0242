//! Error types for engine construction.

use polyvox_config::ConfigError;
use polyvox_core::GraphError;
use thiserror::Error;

/// Errors returned while building the engine.
///
/// Reactive operations never fail; teardown problems are logged and skipped.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Wiring the fixed buses failed
    #[error("audio graph error: {0}")]
    Graph(#[from] GraphError),

    /// The engine configuration is invalid
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
