//! Command-line argument parsing for the viewer.

use std::path::PathBuf;

use blend_order::{ConfigError, SortPolicy, ViewerSettings};
use clap::Parser;

/// Number of demo points generated when no scene file is given.
pub const DEFAULT_DEMO_POINTS: usize = 20_000;

/// Viewer command-line arguments.
///
/// CLI values override settings loaded from the settings file.
#[derive(Parser, Debug)]
#[command(name = "blend-viz", about = "Depth-sorted point cloud and mesh viewer")]
pub struct CliArgs {
    /// Scene file (JSON). A generated demo scene is shown when omitted.
    pub scene: Option<PathBuf>,

    /// Settings file (RON).
    #[arg(long, default_value = "blend-viz.ron")]
    pub settings: PathBuf,

    /// Re-sort on every rotation step instead of after the drag settles.
    #[arg(long)]
    pub immediate_sort: bool,

    /// Always draw the bounding box.
    #[arg(long)]
    pub border: bool,

    /// Point count for the demo scene.
    #[arg(long, default_value_t = DEFAULT_DEMO_POINTS)]
    pub points: usize,

    /// Seed for the demo scene.
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Apply CLI overrides to loaded settings.
pub fn apply_cli_overrides(settings: &mut ViewerSettings, args: &CliArgs) {
    if args.immediate_sort {
        settings.sort_policy = SortPolicy::Immediate;
    }
    if args.border {
        settings.show_border = true;
    }
    if let Some(ref level) = args.log_level {
        settings.log_level = level.clone();
    }
}

/// Loads the settings file named by `args`, or defaults when it is absent,
/// and applies the CLI overrides. The flag reports whether the file was read.
pub fn load_settings(args: &CliArgs) -> Result<(ViewerSettings, bool), ConfigError> {
    let from_file = args.settings.exists();
    let mut settings = ViewerSettings::load_or_default(&args.settings)?;
    apply_cli_overrides(&mut settings, args);
    Ok((settings, from_file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_override() {
        let mut settings = ViewerSettings::default();
        let args = CliArgs::parse_from([
            "blend-viz",
            "scene.json",
            "--immediate-sort",
            "--log-level",
            "debug",
        ]);
        apply_cli_overrides(&mut settings, &args);

        assert_eq!(args.scene, Some(PathBuf::from("scene.json")));
        assert_eq!(settings.sort_policy, SortPolicy::Immediate);
        assert_eq!(settings.log_level, "debug");
        // Non-overridden fields retain defaults
        assert!(!settings.show_border);
        assert_eq!(settings.sort_delay_ms, 2000);
    }

    #[test]
    fn cli_no_override() {
        let original = ViewerSettings::default();
        let mut settings = ViewerSettings::default();
        let args = CliArgs::parse_from(["blend-viz"]);
        apply_cli_overrides(&mut settings, &args);

        assert_eq!(settings, original);
        assert_eq!(args.scene, None);
        assert_eq!(args.points, DEFAULT_DEMO_POINTS);
        assert_eq!(args.settings, PathBuf::from("blend-viz.ron"));
    }

    #[test]
    fn settings_file_then_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.ron");
        std::fs::write(&path, "(log_level: \"warn\", show_border: true)").unwrap();
        let path_arg = path.to_string_lossy().into_owned();

        let args = CliArgs::parse_from([
            "blend-viz",
            "--settings",
            &path_arg,
            "--log-level",
            "debug",
        ]);
        let (settings, from_file) = load_settings(&args).unwrap();
        assert!(from_file);
        assert!(settings.show_border);
        assert_eq!(settings.log_level, "debug");

        let absent = dir.path().join("absent.ron").to_string_lossy().into_owned();
        let args = CliArgs::parse_from(["blend-viz", "--settings", &absent]);
        let (settings, from_file) = load_settings(&args).unwrap();
        assert!(!from_file);
        assert_eq!(settings, ViewerSettings::default());
    }

    #[test]
    fn demo_options() {
        let args = CliArgs::parse_from(["blend-viz", "--points", "500", "--seed", "9", "--border"]);
        assert_eq!(args.points, 500);
        assert_eq!(args.seed, 9);
        assert!(args.border);
    }
}
