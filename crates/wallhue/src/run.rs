use anyhow::Result;
use renderer::{RenderMode, Renderer};
use tracing_subscriber::EnvFilter;

use crate::bootstrap::{build_renderer_config, load_scene_config};
use crate::cli::{Cli, Command, SceneArgs};

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let (scene_args, mode) = match cli.command {
        Command::View(args) => (args, RenderMode::Windowed),
        Command::Render(args) => (
            args.scene,
            RenderMode::Headless {
                output: args.output,
            },
        ),
    };

    let mut renderer = prepare(&scene_args, mode)?;
    let config = renderer.config();
    tracing::info!(
        image = %config.image,
        mask = %config.mask,
        tint = %config.tint,
        width = config.canvas_size.0,
        height = config.canvas_size.1,
        headless = config.output_path().is_some(),
        "starting wallhue"
    );
    renderer.run()
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn prepare(args: &SceneArgs, mode: RenderMode) -> Result<Renderer> {
    let scene = args
        .config
        .as_deref()
        .map(load_scene_config)
        .transpose()?;
    let config = build_renderer_config(args, scene.as_ref(), mode)?;
    Ok(Renderer::new(config))
}
