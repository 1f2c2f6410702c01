use std::time::Instant;

use blend_order::{GpuBackend, SortPolicy, Viewer};
use blend_viz::{
    CliArgs, MacroquadBackend, ViewerInput, VizError, init_logging, load_settings, scene_from_args,
};
use clap::Parser;
use macroquad::prelude::*;
use tracing::{error, info};

#[macroquad::main("Blend Order Viewer")]
async fn main() {
    let args = CliArgs::parse();
    if let Err(err) = run(args).await {
        error!("{err}");
        eprintln!("blend-viz: {err}");
    }
}

async fn run(args: CliArgs) -> Result<(), VizError> {
    let (settings, from_file) = load_settings(&args)?;
    init_logging(&settings.log_level);
    if from_file {
        info!("Loaded viewer settings from {}", args.settings.display());
    } else {
        info!("No settings at {}, using defaults", args.settings.display());
    }

    let scene = scene_from_args(&args)?;
    let mut viewer = Viewer::new(settings);
    viewer.load_scene(scene)?;

    let mut backend = MacroquadBackend::new();
    let mut input = ViewerInput::new();

    loop {
        let now = Instant::now();
        clear_background(BLACK);
        viewer.set_aspect(screen_width() / screen_height().max(1.0));

        input.update(&mut viewer, now);
        viewer.tick(now);

        // Large scenes show only the bounding box mid-drag.
        let border_only = input.dragging() && !viewer.is_interactive();
        viewer.draw_frame(&mut backend, now, border_only)?;

        set_default_camera();
        draw_hud(&viewer);

        if is_key_pressed(KeyCode::Escape) {
            break;
        }
        next_frame().await
    }
    Ok(())
}

fn draw_hud<G: GpuBackend>(viewer: &Viewer<G>) {
    let mut y = 24.0;
    let sort = match viewer.settings().sort_policy {
        SortPolicy::Immediate => "immediate",
        SortPolicy::Deferred if viewer.sort_pending() => "deferred (pending)",
        SortPolicy::Deferred => "deferred",
    };
    draw_text(
        &format!("{} fps | sort: {sort}", get_fps()),
        12.0,
        y,
        20.0,
        WHITE,
    );

    for (i, object) in viewer.scene().objects.iter().enumerate().take(9) {
        y += 20.0;
        let colour = if object.visible { WHITE } else { GRAY };
        draw_text(&format!("[{}] {}", i + 1, object.name), 12.0, y, 18.0, colour);
    }

    draw_text(
        "drag: rotate | right: pan | wheel: zoom | shift+wheel: clip | B border | R reset | I sort",
        12.0,
        screen_height() - 12.0,
        16.0,
        LIGHTGRAY,
    );
}
