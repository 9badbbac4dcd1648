use anyhow::{bail, Result};
use image::imageops::flip_vertical_in_place;
use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::loader::LoadedTexture;
use crate::types::TextureRole;

use super::context::SurfaceColorSpace;

/// A decoded texture living on the GPU with its sampler.
pub(crate) struct TextureResources {
    pub _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// Format a texture of `role` is uploaded with.
///
/// The mask holds selection data, not colour, so it never goes through sRGB
/// decoding; otherwise the 0.5 threshold would move.
pub(crate) fn texture_format(
    role: TextureRole,
    color_space: SurfaceColorSpace,
) -> wgpu::TextureFormat {
    match role {
        TextureRole::Image => color_space.color_format(),
        TextureRole::Mask => wgpu::TextureFormat::Rgba8Unorm,
    }
}

pub(crate) fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: LoadedTexture,
    color_space: SurfaceColorSpace,
    max_dimension: u32,
) -> Result<TextureResources> {
    let LoadedTexture {
        role,
        origin,
        pixels: mut rgba,
    } = texture;
    let (width, height) = rgba.dimensions();
    if width > max_dimension || height > max_dimension {
        bail!("{role} texture {origin} is {width}x{height}, GPU limit is {max_dimension}");
    }
    flip_vertical_in_place(&mut rgba);

    let gpu_texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(&format!("{role} texture")),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(role, color_space),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        &rgba,
    );

    let view = gpu_texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(&format!("{role} sampler")),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    tracing::debug!(%role, origin = %origin, width, height, "uploaded texture");

    Ok(TextureResources {
        _texture: gpu_texture,
        view,
        sampler,
    })
}
