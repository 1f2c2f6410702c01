//! Error types for the viewer binary.

use std::path::PathBuf;

use blend_order::{ConfigError, FrameError, SceneError};

#[derive(Debug, thiserror::Error)]
pub enum VizError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read scene {}: {source}", path.display())]
    ReadScene {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scene {}: {source}", path.display())]
    ParseScene {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid scene: {0}")]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Frame(#[from] FrameError),
}
