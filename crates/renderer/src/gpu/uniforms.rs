use bytemuck::{Pod, Zeroable};

use crate::compositor::FrameState;

use super::context::SurfaceColorSpace;

/// Mirrors the `TintParams` std140 block in the fragment shader.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct TintUniforms {
    pub tint: [f32; 4],
}

unsafe impl Zeroable for TintUniforms {}
unsafe impl Pod for TintUniforms {}

impl TintUniforms {
    pub fn from_frame(frame: &FrameState, color_space: SurfaceColorSpace) -> Self {
        let [r, g, b] = color_space.shader_color(frame.tint).rgb();
        Self {
            tint: [r, g, b, 1.0],
        }
    }
}

impl Default for TintUniforms {
    fn default() -> Self {
        Self {
            tint: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Tint;

    #[test]
    fn matches_std140_block_size() {
        assert_eq!(std::mem::size_of::<TintUniforms>(), 16);
        assert_eq!(std::mem::align_of::<TintUniforms>(), 16);
    }

    #[test]
    fn carries_frame_tint() {
        let frame = FrameState {
            tint: Tint::new(1.0, 0.5, 0.0),
        };
        let uniforms = TintUniforms::from_frame(&frame, SurfaceColorSpace::Gamma);
        assert_eq!(uniforms.tint, [1.0, 0.5, 0.0, 1.0]);
    }

    #[test]
    fn linear_space_uploads_decoded_tint() {
        let frame = FrameState {
            tint: Tint::from_rgb8([255, 128, 0]),
        };
        let uniforms = TintUniforms::from_frame(&frame, SurfaceColorSpace::Linear);
        assert!((uniforms.tint[0] - 1.0).abs() < 1e-6);
        assert!((uniforms.tint[1] - 0.2158).abs() < 1e-3);
        assert_eq!(uniforms.tint[2], 0.0);
        assert_eq!(uniforms.tint[3], 1.0);
    }
}
