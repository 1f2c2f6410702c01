//! Error types.

use std::path::PathBuf;

use crate::scene::GeometryKind;

/// Structural problems in a decoded scene, reported by [`Scene::validate`].
///
/// [`Scene::validate`]: crate::Scene::validate
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    #[error("object `{object}`: {kind:?} vertex array has {len} floats, not a multiple of 3")]
    RaggedVertices {
        object: String,
        kind: GeometryKind,
        len: usize,
    },

    #[error("object `{object}`: {kind:?} index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        object: String,
        kind: GeometryKind,
        index: u32,
        vertex_count: usize,
    },

    #[error("object `{object}`: triangle index array has {len} entries, not a multiple of 3")]
    RaggedFaces { object: String, len: usize },

    #[error("object `{object}` uses colour map {index} but only {count} are defined")]
    UnknownColourMap {
        object: String,
        index: usize,
        count: usize,
    },
}

/// Failure reported by a [`GpuBackend`](crate::GpuBackend) implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("gpu backend: {message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors surfaced while drawing a frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Problems with the RON viewer settings file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read viewer settings {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write viewer settings {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("viewer settings {} are not valid RON: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("cannot encode viewer settings as RON: {0}")]
    Encode(#[source] ron::Error),

    /// A setting parsed but holds a value the viewer cannot use.
    #[error("viewer setting `{field}` {reason}")]
    OutOfRange {
        field: &'static str,
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_converts_into_frame_error() {
        let err: FrameError = BackendError::new("lost context").into();
        assert_eq!(err.to_string(), "gpu backend: lost context");
    }

    #[test]
    fn scene_error_names_the_object() {
        let err = SceneError::UnknownColourMap {
            object: "surface".to_string(),
            index: 3,
            count: 1,
        };
        assert!(err.to_string().contains("`surface`"));
    }

    #[test]
    fn config_errors_name_the_settings_file() {
        let err = ConfigError::Read {
            path: PathBuf::from("viewer.ron"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().starts_with("cannot read viewer settings viewer.ron"));

        let err = ConfigError::OutOfRange {
            field: "opacity",
            reason: "must lie in [0, 1]",
        };
        assert_eq!(err.to_string(), "viewer setting `opacity` must lie in [0, 1]");
    }
}
