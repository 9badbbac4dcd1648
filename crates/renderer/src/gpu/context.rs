use anyhow::{anyhow, Context as AnyhowContext, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;

use crate::color::Tint;
use crate::types::{AdapterProfile, ColorSpaceMode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SurfaceColorSpace {
    Gamma,
    Linear,
}

impl SurfaceColorSpace {
    pub(crate) fn resolve(mode: ColorSpaceMode) -> Self {
        match mode {
            ColorSpaceMode::Auto | ColorSpaceMode::Gamma => SurfaceColorSpace::Gamma,
            ColorSpaceMode::Linear => SurfaceColorSpace::Linear,
        }
    }

    /// Format for colour textures and offscreen targets.
    pub(crate) fn color_format(self) -> wgpu::TextureFormat {
        match self {
            SurfaceColorSpace::Gamma => wgpu::TextureFormat::Rgba8Unorm,
            SurfaceColorSpace::Linear => wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }

    /// Expresses a hex-parsed colour in the space the shader multiplies in.
    ///
    /// Linear mode samples the image through an sRGB view, so the tint has to
    /// be decoded as well.
    pub(crate) fn shader_color(self, color: Tint) -> Tint {
        match self {
            SurfaceColorSpace::Gamma => color,
            SurfaceColorSpace::Linear => color.to_linear(),
        }
    }
}

/// Clear value for a target of `format`; sRGB targets re-encode on write.
pub(crate) fn clear_value(color: Tint, format: wgpu::TextureFormat) -> wgpu::Color {
    if format.is_srgb() {
        color.to_linear().to_wgpu()
    } else {
        color.to_wgpu()
    }
}

pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub color_space: SurfaceColorSpace,
    pub adapter_profile: AdapterProfile,
    pub max_texture_dimension: u32,
}

/// Swapchain half of a windowed context.
pub(crate) struct SurfaceBinding {
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Creates a device with no presentation surface.
    pub(crate) fn headless(color_space: ColorSpaceMode, size: (u32, u32)) -> Result<Self> {
        let instance = create_instance();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        Self::from_adapter(instance, &adapter, color_space, size)
    }

    /// Creates a device that can present to `target`.
    ///
    /// # Safety contract
    ///
    /// `target` must outlive the returned surface; callers keep the window in
    /// an `Arc` next to the context for the lifetime of the event loop.
    pub(crate) fn with_surface<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        color_space: ColorSpaceMode,
    ) -> Result<(Self, SurfaceBinding)>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let instance = create_instance();

        let window_handle = target
            .window_handle()
            .map_err(|err| anyhow!("failed to acquire window handle: {err}"))?;
        let display_handle = target
            .display_handle()
            .map_err(|err| anyhow!("failed to acquire display handle: {err}"))?;

        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .context("failed to create rendering surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let size = PhysicalSize::new(initial_size.width.max(1), initial_size.height.max(1));
        let context =
            Self::from_adapter(instance, &adapter, color_space, (size.width, size.height))?;

        let surface_caps = surface.get_capabilities(&adapter);
        if surface_caps.formats.is_empty() {
            anyhow::bail!("surface reports no supported formats for this adapter");
        }
        let surface_format = match context.color_space {
            SurfaceColorSpace::Linear => pick_format(&surface_caps.formats, true),
            SurfaceColorSpace::Gamma => pick_format(&surface_caps.formats, false),
        };

        let present_mode = surface_caps
            .present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::PresentMode::Fifo)
            .unwrap_or(wgpu::PresentMode::AutoVsync);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&context.device, &config);
        tracing::debug!(?surface_format, ?present_mode, "configured surface");

        Ok((context, SurfaceBinding { surface, config }))
    }

    fn from_adapter(
        instance: wgpu::Instance,
        adapter: &wgpu::Adapter,
        color_space: ColorSpaceMode,
        size: (u32, u32),
    ) -> Result<Self> {
        let adapter_info = adapter.get_info();
        let limits = adapter.limits();
        let adapter_profile = AdapterProfile::from_wgpu(&adapter_info);
        tracing::debug!(
            name = %adapter_profile.name,
            backend = ?adapter_profile.backend,
            device_type = ?adapter_profile.device_type,
            is_software = adapter_profile.is_software(),
            "selected GPU adapter"
        );

        let max_dimension = limits.max_texture_dimension_2d;
        let (width, height) = (size.0.max(1), size.1.max(1));
        if width > max_dimension || height > max_dimension {
            anyhow::bail!(
                "GPU max texture dimension is {max_dimension}, requested canvas is {width}x{height}"
            );
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("wallhue device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        Ok(Self {
            _instance: instance,
            device,
            queue,
            color_space: SurfaceColorSpace::resolve(color_space),
            adapter_profile,
            max_texture_dimension: max_dimension,
        })
    }
}

impl SurfaceBinding {
    pub(crate) fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub(crate) fn resize(&mut self, device: &wgpu::Device, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(device, &self.config);
    }

    pub(crate) fn reconfigure(&self, device: &wgpu::Device) {
        self.surface.configure(device, &self.config);
    }
}

fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        flags: wgpu::InstanceFlags::default(),
        memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        backend_options: wgpu::BackendOptions::default(),
    })
}

fn pick_format(formats: &[wgpu::TextureFormat], want_srgb: bool) -> wgpu::TextureFormat {
    formats
        .iter()
        .copied()
        .find(|format| format.is_srgb() == want_srgb)
        .unwrap_or_else(|| {
            let fallback = formats[0];
            tracing::warn!(
                ?fallback,
                want_srgb,
                "no surface format matches the requested color space; falling back"
            );
            fallback
        })
}
