use std::fmt;
use std::path::{Path, PathBuf};

use crate::color::Tint;
use crate::loader::TextureSource;

/// Default canvas size in physical pixels.
pub const DEFAULT_CANVAS_SIZE: (u32, u32) = (1920, 1440);

/// The two textures the composite pass samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureRole {
    /// Base photograph whose colours are recoloured.
    Image,
    /// Grayscale selection; its red channel decides where the tint applies.
    Mask,
}

impl TextureRole {
    pub const ALL: [TextureRole; 2] = [TextureRole::Image, TextureRole::Mask];

    pub(crate) fn index(self) -> usize {
        match self {
            TextureRole::Image => 0,
            TextureRole::Mask => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TextureRole::Image => "image",
            TextureRole::Mask => "mask",
        }
    }
}

impl fmt::Display for TextureRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Load progress for one texture. Each texture leaves `Pending` exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TextureStatus {
    #[default]
    Pending,
    Loaded { width: u32, height: u32 },
    Failed(String),
}

impl TextureStatus {
    pub fn is_settled(&self) -> bool {
        !matches!(self, TextureStatus::Pending)
    }
}

impl fmt::Display for TextureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureStatus::Pending => f.write_str("pending"),
            TextureStatus::Loaded { width, height } => write!(f, "loaded ({width}x{height})"),
            TextureStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Output color handling for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Gamma-encoded textures and target, matching how browsers composite.
    #[default]
    Auto,
    /// Treat texture bytes and shader output as gamma-encoded; use non-sRGB targets.
    Gamma,
    /// Decode textures to linear, blend in linear space, re-encode on write.
    Linear,
}

/// Where the composite frame ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderMode {
    /// Interactive preview window; stdin lines change the tint.
    Windowed,
    /// Offscreen render written to a PNG once both textures have loaded.
    Headless { output: PathBuf },
}

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors CLI flags and the scene file: which textures to
/// load, how large the canvas is, the initial tint and the presentation mode.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Canvas size in physical pixels.
    pub canvas_size: (u32, u32),
    /// Base image to recolour.
    pub image: TextureSource,
    /// Mask selecting which image pixels receive the tint.
    pub mask: TextureSource,
    /// Tint applied before any colour input arrives.
    pub tint: Tint,
    /// Background shown before the first composite is drawn.
    pub clear_color: Tint,
    /// Desired color handling for textures and the render target.
    pub color_space: ColorSpaceMode,
    /// Presentation mode (window vs offscreen file).
    pub mode: RenderMode,
}

impl RendererConfig {
    pub fn source(&self, role: TextureRole) -> &TextureSource {
        match role {
            TextureRole::Image => &self.image,
            TextureRole::Mask => &self.mask,
        }
    }

    pub fn output_path(&self) -> Option<&Path> {
        match &self.mode {
            RenderMode::Headless { output } => Some(output.as_path()),
            RenderMode::Windowed => None,
        }
    }
}

impl Default for RendererConfig {
    /// Windowed 1920x1440 canvas reading `data/image.jpg` and `data/mask.jpg`.
    fn default() -> Self {
        Self {
            canvas_size: DEFAULT_CANVAS_SIZE,
            image: TextureSource::Path(PathBuf::from("data/image.jpg")),
            mask: TextureSource::Path(PathBuf::from("data/mask.jpg")),
            tint: Tint::default(),
            clear_color: Tint::WHITE,
            color_space: ColorSpaceMode::default(),
            mode: RenderMode::Windowed,
        }
    }
}

/// Summary of the GPU adapter wgpu picked, for diagnostics.
#[derive(Debug, Clone)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
}

impl AdapterProfile {
    pub(crate) fn from_wgpu(info: &wgpu::AdapterInfo) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
        }
    }

    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }
}
