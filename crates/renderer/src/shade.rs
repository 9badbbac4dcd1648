//! CPU rendition of the composite fragment stage.
//!
//! The GLSL in [`crate::compile`] and [`shade_fragment`] implement the same
//! function; keep them in step. The CPU path samples with nearest filtering and
//! works in image space, so for a canvas that matches the image size it
//! produces the frame the GPU writes into a gamma-encoded target.

use glam::{Vec3, Vec4};
use image::{Rgba, RgbaImage};

use crate::color::Tint;

/// Mask red-channel intensity above which a pixel receives the tint.
///
/// The comparison is strict, so a mask value of exactly `0.5` stays untinted.
pub const MASK_THRESHOLD: f32 = 0.5;

/// Evaluates the fragment stage for one pixel.
pub fn shade_fragment(image_rgb: Vec3, mask_r: f32, tint: Tint) -> Vec4 {
    let color = if mask_r > MASK_THRESHOLD {
        image_rgb * Vec3::from_array(tint.rgb())
    } else {
        image_rgb
    };
    color.extend(1.0)
}

/// Composites `mask` over `image` and returns a frame the size of `image`.
///
/// The mask is sampled at the same normalised coordinate as the image, so
/// the two inputs may have different dimensions.
pub fn composite(image: &RgbaImage, mask: &RgbaImage, tint: Tint) -> RgbaImage {
    let (width, height) = image.dimensions();
    let (mask_width, mask_height) = mask.dimensions();

    RgbaImage::from_fn(width, height, |x, y| {
        let texel = image.get_pixel(x, y).0;
        let image_rgb = Vec3::new(unorm(texel[0]), unorm(texel[1]), unorm(texel[2]));
        let mask_r = if mask_width == 0 || mask_height == 0 {
            0.0
        } else {
            let mx = nearest(x, width, mask_width);
            let my = nearest(y, height, mask_height);
            unorm(mask.get_pixel(mx, my).0[0])
        };

        let color = shade_fragment(image_rgb, mask_r, tint);
        Rgba([
            to_unorm8(color.x),
            to_unorm8(color.y),
            to_unorm8(color.z),
            to_unorm8(color.w),
        ])
    })
}

fn nearest(coord: u32, extent: u32, target_extent: u32) -> u32 {
    let scaled = (u64::from(coord) * u64::from(target_extent)) / u64::from(extent.max(1));
    (scaled as u32).min(target_extent - 1)
}

fn unorm(value: u8) -> f32 {
    f32::from(value) / 255.0
}

fn to_unorm8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
