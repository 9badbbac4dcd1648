use std::num::NonZeroU32;
use std::sync::mpsc;

use anyhow::{anyhow, bail, Context, Result};
use image::RgbaImage;

use crate::color::Tint;
use crate::compositor::{FrameState, RenderDriver};
use crate::loader::LoadedTexture;
use crate::types::{AdapterProfile, ColorSpaceMode};

use super::context::{clear_value, GpuContext};
use super::pipeline::CompositeScene;

const BYTES_PER_PIXEL: u32 = 4;

/// Renders the composite into an offscreen texture that can be read back.
pub struct OffscreenRenderer {
    context: GpuContext,
    scene: CompositeScene,
    target: wgpu::Texture,
    target_view: wgpu::TextureView,
    size: (u32, u32),
    clear_color: wgpu::Color,
    frames_rendered: u64,
}

impl OffscreenRenderer {
    pub fn new(size: (u32, u32), color_space: ColorSpaceMode, clear_color: Tint) -> Result<Self> {
        let size = (size.0.max(1), size.1.max(1));
        let context = GpuContext::headless(color_space, size)?;
        let format = context.color_space.color_format();
        let scene = CompositeScene::new(&context, format)?;

        let target = context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen target"),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            context,
            scene,
            target,
            target_view,
            size,
            clear_color: clear_value(clear_color, format),
            frames_rendered: 0,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Copies the target back to the CPU, row by row without padding.
    pub fn read_back(&self) -> Result<RgbaImage> {
        let (width, height) = self.size;
        let layout = ReadbackLayout::new(width, height);

        let buffer = self.context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("offscreen readback"),
            size: layout.buffer_size(),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("readback encoder"),
                });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(layout.padded_bytes_per_row.get()),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.context
            .device
            .poll(wgpu::PollType::Wait)
            .map_err(|err| anyhow!("failed waiting for GPU readback: {err}"))?;
        receiver
            .recv()
            .map_err(|_| anyhow!("failed receiving GPU map callback"))?
            .context("GPU buffer mapping failed")?;

        let mapped = slice.get_mapped_range();
        let pixels = layout.strip_padding(&mapped)?;
        drop(mapped);
        buffer.unmap();

        RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("readback produced a short buffer"))
    }

    fn draw(&mut self, frame: Option<&FrameState>) {
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("offscreen encoder"),
                });
        self.scene.encode(
            &self.context.queue,
            &mut encoder,
            &self.target_view,
            frame,
            self.clear_color,
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl RenderDriver for OffscreenRenderer {
    fn attach_texture(&mut self, texture: LoadedTexture) -> Result<()> {
        self.scene.attach(&self.context, texture)
    }

    fn render(&mut self, frame: &FrameState) -> Result<()> {
        if !self.scene.is_complete() {
            bail!("render requested before both textures were attached");
        }
        self.draw(Some(frame));
        self.frames_rendered += 1;
        Ok(())
    }

    fn present_background(&mut self) -> Result<()> {
        self.draw(None);
        Ok(())
    }
}

/// Row pitch bookkeeping for texture-to-buffer copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReadbackLayout {
    unpadded_bytes_per_row: u32,
    padded_bytes_per_row: NonZeroU32,
    height: u32,
}

impl ReadbackLayout {
    fn new(width: u32, height: u32) -> Self {
        let unpadded = width.max(1) * BYTES_PER_PIXEL;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;
        Self {
            unpadded_bytes_per_row: unpadded,
            padded_bytes_per_row: NonZeroU32::new(padded).unwrap_or(NonZeroU32::MIN),
            height: height.max(1),
        }
    }

    fn buffer_size(&self) -> wgpu::BufferAddress {
        u64::from(self.padded_bytes_per_row.get()) * u64::from(self.height)
    }

    fn strip_padding(&self, padded: &[u8]) -> Result<Vec<u8>> {
        let padded_row = self.padded_bytes_per_row.get() as usize;
        let row = self.unpadded_bytes_per_row as usize;
        let expected = padded_row * self.height as usize;
        if padded.len() < expected {
            bail!(
                "readback buffer is {} bytes, expected at least {expected}",
                padded.len()
            );
        }

        let mut tight = Vec::with_capacity(row * self.height as usize);
        for chunk in padded.chunks(padded_row).take(self.height as usize) {
            tight.extend_from_slice(&chunk[..row]);
        }
        Ok(tight)
    }
}
