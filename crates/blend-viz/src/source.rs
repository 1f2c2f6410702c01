//! Where the viewed scene comes from.

use std::path::Path;

use blend_order::Scene;
use tracing::info;

use crate::cli::CliArgs;
use crate::demo::demo_scene;
use crate::error::VizError;

/// Reads a JSON scene file.
pub fn read_scene(path: &Path) -> Result<Scene, VizError> {
    let text = std::fs::read_to_string(path).map_err(|source| VizError::ReadScene {
        path: path.to_path_buf(),
        source,
    })?;
    let scene: Scene = serde_json::from_str(&text).map_err(|source| VizError::ParseScene {
        path: path.to_path_buf(),
        source,
    })?;
    scene.validate()?;
    Ok(scene)
}

/// The scene file named on the command line, or the demo scene.
pub fn scene_from_args(args: &CliArgs) -> Result<Scene, VizError> {
    match &args.scene {
        Some(path) => {
            info!("Reading scene from {}", path.display());
            read_scene(path)
        }
        None => {
            info!("No scene given, generating {} demo points", args.points);
            Ok(demo_scene(args.points, args.seed))
        }
    }
}
