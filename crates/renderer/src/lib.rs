//! Renderer crate for wallhue.
//!
//! wallhue draws a photograph with one region recoloured: a grayscale mask
//! selects the pixels whose colour is multiplied by a tint. The flow is:
//!
//! ```text
//!   CLI / wallhue
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ loader threads ──▶ LoadEvent ──▶ Compositor
//!                                                        │ gate open?
//!          colour input ─────────────────────────────────┤
//!                                                        ▼
//!                                     RenderDriver (window surface | offscreen PNG)
//! ```
//!
//! Nothing is drawn until both the image and the mask have loaded. After that
//! every tint change redraws the same two textures with the new colour.
//! [`shade::composite`] evaluates the same per-pixel rule on the CPU.

mod color;
mod compile;
mod compositor;
mod gate;
mod gpu;
mod headless;
mod loader;
mod scene;
pub mod shade;
mod types;
mod window;

use anyhow::Result;

pub use color::{ColorParseError, Tint};
pub use compositor::{Compositor, FrameState, Outcome, RenderDriver};
pub use gate::LoadGate;
pub use gpu::{OffscreenRenderer, SurfaceRenderer};
pub use headless::{run_headless, RenderError};
pub use loader::{load, spawn_load, LoadError, LoadEvent, LoadedTexture, TextureSource};
pub use scene::{Mesh, QuadVertex};
pub use types::{
    AdapterProfile, ColorSpaceMode, RenderMode, RendererConfig, TextureRole, TextureStatus,
    DEFAULT_CANVAS_SIZE,
};
pub use window::{run_window, ViewerEvent};

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Runs the configured presentation path to completion.
    ///
    /// Windowed mode returns when the window closes. Headless mode returns
    /// after the PNG is written, or with [`RenderError::GateClosed`] when a
    /// texture failed to load.
    pub fn run(&mut self) -> Result<()> {
        match &self.config.mode {
            RenderMode::Windowed => run_window(&self.config),
            RenderMode::Headless { output } => run_headless(&self.config, output),
        }
    }
}
