use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use renderer::{RenderMode, RendererConfig, TextureRole, TextureSource, Tint};
use sceneconfig::SceneConfig;
use tracing::debug;

use crate::cli::SceneArgs;

pub fn load_scene_config(path: &Path) -> Result<SceneConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read scene config at {}", path.display()))?;
    let config = SceneConfig::from_toml_str(&contents)
        .with_context(|| format!("failed to load scene config at {}", path.display()))?;
    debug!(path = %path.display(), "loaded scene config");
    Ok(config)
}

/// Merges flags over the scene file over built-in defaults.
pub fn build_renderer_config(
    args: &SceneArgs,
    scene: Option<&SceneConfig>,
    mode: RenderMode,
) -> Result<RendererConfig> {
    let defaults = RendererConfig::default();

    let canvas_size = match args.size.as_deref() {
        Some(spec) => parse_surface_size(spec)?,
        None => scene
            .and_then(SceneConfig::canvas_size)
            .unwrap_or(defaults.canvas_size),
    };

    let image = resolve_source(
        TextureRole::Image,
        args.image.as_deref(),
        scene.and_then(|scene| scene.inputs.image.as_deref()),
        defaults.image,
    )?;
    let mask = resolve_source(
        TextureRole::Mask,
        args.mask.as_deref(),
        scene.and_then(|scene| scene.inputs.mask.as_deref()),
        defaults.mask,
    )?;

    let tint = args
        .color
        .or_else(|| {
            scene
                .and_then(|scene| scene.tint.color)
                .map(|hex| Tint::from_rgb8(hex.rgb()))
        })
        .unwrap_or(defaults.tint);
    let clear_color = args
        .clear_color
        .or_else(|| {
            scene
                .and_then(|scene| scene.canvas.clear_color)
                .map(|hex| Tint::from_rgb8(hex.rgb()))
        })
        .unwrap_or(defaults.clear_color);

    Ok(RendererConfig {
        canvas_size,
        image,
        mask,
        tint,
        clear_color,
        color_space: args.color_space,
        mode,
    })
}

fn resolve_source(
    role: TextureRole,
    flag: Option<&str>,
    scene: Option<&str>,
    fallback: TextureSource,
) -> Result<TextureSource> {
    match flag.or(scene) {
        Some(raw) => {
            TextureSource::parse(raw).with_context(|| format!("invalid {role} source '{raw}'"))
        }
        None => Ok(fallback),
    }
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32)> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| anyhow::anyhow!("expected WxH format, e.g. 1920x1440"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid width in size specification"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid height in size specification"))?;

    if width == 0 || height == 0 {
        anyhow::bail!("canvas dimensions must be greater than zero");
    }

    Ok((width, height))
}
