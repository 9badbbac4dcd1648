use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crossbeam_channel::unbounded;
use image::ImageFormat;
use thiserror::Error;
use tracing::{debug, info};

use crate::compositor::Compositor;
use crate::gpu::OffscreenRenderer;
use crate::loader::spawn_load;
use crate::types::{RendererConfig, TextureRole, TextureStatus};

#[derive(Debug, Error)]
pub enum RenderError {
    /// At least one texture failed, so the composite was never drawn.
    #[error("nothing rendered: image {image}, mask {mask}")]
    GateClosed {
        image: TextureStatus,
        mask: TextureStatus,
    },
    #[error("failed to write {path}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Loads both textures, renders once the gate opens and writes a PNG.
///
/// Every loader reports exactly once, so the loop ends after two events
/// whether the loads succeeded or not.
pub fn run_headless(config: &RendererConfig, output: &Path) -> Result<()> {
    let (tx, rx) = unbounded();
    for role in TextureRole::ALL {
        let tx = tx.clone();
        spawn_load(role, config.source(role).clone(), move |event| {
            let _ = tx.send(event);
        })?;
    }
    drop(tx);

    let renderer =
        OffscreenRenderer::new(config.canvas_size, config.color_space, config.clear_color)?;
    let profile = renderer.adapter_profile();
    debug!(
        adapter = %profile.name,
        backend = ?profile.backend,
        software = profile.is_software(),
        "offscreen renderer ready"
    );

    let mut compositor = Compositor::new(renderer, config.tint);
    for event in rx.iter().take(TextureRole::ALL.len()) {
        compositor.handle_load(event)?;
    }

    if !compositor.is_open() {
        return Err(RenderError::GateClosed {
            image: compositor.status(TextureRole::Image).clone(),
            mask: compositor.status(TextureRole::Mask).clone(),
        }
        .into());
    }

    let renderer = compositor.into_driver();
    let pixels = renderer.read_back().context("failed to read back composite")?;
    save_png(&pixels, output)?;

    let size = renderer.size();
    info!(
        output = %output.display(),
        width = size.0,
        height = size.1,
        frames = renderer.frames_rendered(),
        "wrote composite"
    );
    Ok(())
}

fn save_png(pixels: &image::RgbaImage, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    pixels
        .save_with_format(output, ImageFormat::Png)
        .map_err(|source| RenderError::Save {
            path: output.to_path_buf(),
            source,
        })?;
    Ok(())
}
