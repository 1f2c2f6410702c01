//! Viewer settings with sensible defaults and RON persistence.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// When a rotation triggers a depth re-sort.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SortPolicy {
    /// Re-sort on every rotation event.
    Immediate,
    /// Re-sort once, a fixed delay after the last rotation.
    #[default]
    Deferred,
}

/// Settings for a [`Viewer`](crate::Viewer).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerSettings {
    pub sort_policy: SortPolicy,
    /// Debounce delay for deferred sorting, in milliseconds.
    pub sort_delay_ms: u64,
    /// Delay before a full redraw follows a border-only frame, in milliseconds.
    pub redraw_delay_ms: u64,
    /// Draw the scene bounding box every frame.
    pub show_border: bool,
    /// Point size multiplier.
    pub point_scale: f32,
    /// Global point shape.
    pub point_type: i32,
    /// Global alpha multiplier.
    pub opacity: f32,
    /// Scenes up to this many vertices redraw fully while dragging; larger
    /// ones draw only the border until the drag settles.
    pub interactive_vertex_limit: usize,
    /// Log level (e.g., "debug", "info", "warn").
    pub log_level: String,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            sort_policy: SortPolicy::Deferred,
            sort_delay_ms: 2000,
            redraw_delay_ms: 100,
            show_border: false,
            point_scale: 1.0,
            point_type: 0,
            opacity: 1.0,
            interactive_vertex_limit: 500_000,
            log_level: "info".to_string(),
        }
    }
}

impl ViewerSettings {
    #[inline]
    pub fn sort_delay(&self) -> Duration {
        Duration::from_millis(self.sort_delay_ms)
    }

    #[inline]
    pub fn redraw_delay(&self) -> Duration {
        Duration::from_millis(self.redraw_delay_ms)
    }

    /// Checks values that parse but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(ConfigError::OutOfRange {
                field: "opacity",
                reason: "must lie in [0, 1]",
            });
        }
        if !(self.point_scale.is_finite() && self.point_scale > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "point_scale",
                reason: "must be a positive number",
            });
        }
        Ok(())
    }

    /// Load settings from a RON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = ron::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `path`, falling back to defaults if it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save settings as pretty-printed RON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(2)
            .enumerate_arrays(false);
        let serialized = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Encode)?;

        std::fs::write(path, serialized).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}
