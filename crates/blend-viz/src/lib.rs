//! Interactive macroquad viewer for `blend-order` scenes.

pub mod backend;
pub mod cli;
pub mod demo;
pub mod error;
pub mod input;
pub mod logging;
pub mod source;

pub use backend::MacroquadBackend;
pub use cli::{CliArgs, apply_cli_overrides, load_settings};
pub use demo::demo_scene;
pub use error::VizError;
pub use input::{DragButton, ViewerInput};
pub use logging::init_logging;
pub use source::{read_scene, scene_from_args};
