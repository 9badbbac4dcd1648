use anyhow::{anyhow, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, warn};
use winit::dpi::PhysicalSize;

use crate::color::Tint;
use crate::compositor::{FrameState, RenderDriver};
use crate::loader::LoadedTexture;
use crate::types::{AdapterProfile, ColorSpaceMode};

use super::context::{clear_value, GpuContext, SurfaceBinding};
use super::pipeline::CompositeScene;

/// Presents the composite to a window surface.
pub struct SurfaceRenderer {
    context: GpuContext,
    binding: SurfaceBinding,
    scene: CompositeScene,
    clear_color: wgpu::Color,
}

impl SurfaceRenderer {
    pub fn new<T>(
        target: &T,
        size: PhysicalSize<u32>,
        color_space: ColorSpaceMode,
        clear_color: Tint,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let (context, binding) = GpuContext::with_surface(target, size, color_space)?;
        let scene = CompositeScene::new(&context, binding.format())?;
        let clear_color = clear_value(clear_color, binding.format());
        Ok(Self {
            context,
            binding,
            scene,
            clear_color,
        })
    }

    pub fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.binding.resize(&self.context.device, new_size);
    }

    fn draw(&mut self, frame: Option<&FrameState>) -> Result<()> {
        let binding = &self.binding;
        let device = &self.context.device;
        let surface_texture = acquire_with_retry(
            || binding.surface.get_current_texture(),
            || binding.reconfigure(device),
        )?;
        let Some(surface_texture) = surface_texture else {
            return Ok(());
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("surface encoder"),
                });
        self.scene.encode(
            &self.context.queue,
            &mut encoder,
            &view,
            frame,
            self.clear_color,
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }
}

/// Acquires the next frame, reconfiguring and retrying once when the surface
/// went stale. `Ok(None)` means the frame is skipped.
fn acquire_with_retry<T>(
    mut acquire: impl FnMut() -> Result<T, wgpu::SurfaceError>,
    mut reconfigure: impl FnMut(),
) -> Result<Option<T>> {
    for attempt in 0..2 {
        match acquire() {
            Ok(frame) => return Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) if attempt == 0 => {
                debug!("surface lost or outdated; reconfiguring");
                reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(anyhow!("surface out of memory")),
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timeout; skipping frame");
                return Ok(None);
            }
            Err(other) => {
                warn!(error = ?other, "surface error; skipping frame");
                return Ok(None);
            }
        }
    }
    Ok(None)
}

impl RenderDriver for SurfaceRenderer {
    fn attach_texture(&mut self, texture: LoadedTexture) -> Result<()> {
        self.scene.attach(&self.context, texture)
    }

    fn render(&mut self, frame: &FrameState) -> Result<()> {
        if !self.scene.is_complete() {
            return Err(anyhow!("render requested before both textures were attached"));
        }
        self.draw(Some(frame))
    }

    fn present_background(&mut self) -> Result<()> {
        self.draw(None)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn stale_surface_is_reconfigured_and_retried() {
        let attempts = Cell::new(0);
        let reconfigured = Cell::new(0);
        let frame = acquire_with_retry(
            || {
                attempts.set(attempts.get() + 1);
                if attempts.get() == 1 {
                    Err(wgpu::SurfaceError::Outdated)
                } else {
                    Ok("frame")
                }
            },
            || reconfigured.set(reconfigured.get() + 1),
        )
        .unwrap();

        assert_eq!(frame, Some("frame"));
        assert_eq!(attempts.get(), 2);
        assert_eq!(reconfigured.get(), 1);
    }

    #[test]
    fn retries_only_once() {
        let attempts = Cell::new(0);
        let reconfigured = Cell::new(0);
        let frame = acquire_with_retry(
            || {
                attempts.set(attempts.get() + 1);
                Err::<(), _>(wgpu::SurfaceError::Lost)
            },
            || reconfigured.set(reconfigured.get() + 1),
        )
        .unwrap();

        assert_eq!(frame, None);
        assert_eq!(attempts.get(), 2);
        assert_eq!(reconfigured.get(), 1);
    }

    #[test]
    fn timeout_skips_without_reconfiguring() {
        let reconfigured = Cell::new(false);
        let frame = acquire_with_retry(
            || Err::<(), _>(wgpu::SurfaceError::Timeout),
            || reconfigured.set(true),
        )
        .unwrap();
        assert_eq!(frame, None);
        assert!(!reconfigured.get());
    }

    #[test]
    fn out_of_memory_is_fatal() {
        let result = acquire_with_retry(|| Err::<(), _>(wgpu::SurfaceError::OutOfMemory), || {});
        assert!(result.is_err());
    }
}
