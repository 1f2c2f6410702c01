//! Per-frame orchestration of packing, sorting and drawing.
//!
//! A [`Viewer`] owns the scene, the camera and one [`Renderer`] per
//! geometry kind plus the bounding-box border. Each renderer tracks two
//! dirty flags:
//!
//! - `reload`: the vertex buffer must be repacked (new scene data)
//! - `sort`: the index buffer must be rebuilt (camera rotated, visibility
//!   changed)
//!
//! Drawing a frame runs points, then triangles, then lines, then the border,
//! doing only the work the flags ask for and always re-submitting the
//! camera uniforms.
//!
//! # Example
//!
//! ```ignore
//! use blend_order::{RecordingBackend, Scene, Viewer, ViewerSettings};
//! use std::time::Instant;
//!
//! let mut backend = RecordingBackend::new();
//! let mut viewer = Viewer::new(ViewerSettings::default());
//! viewer.load_scene(scene)?;
//!
//! viewer.rotate(5.0, nalgebra::Vector3::y(), Instant::now());
//! viewer.draw_frame(&mut backend, Instant::now(), false)?;
//! ```

mod renderer;
mod viewer;

pub use renderer::{Renderer, RendererKind};
pub use viewer::Viewer;
