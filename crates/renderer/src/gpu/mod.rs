//! GPU side of the compositor.
//!
//! - `context` owns the wgpu instance, device and (for windows) the surface.
//! - `textures` uploads decoded images and builds their samplers.
//! - `uniforms` mirrors the tint block read by the fragment shader.
//! - `pipeline` compiles the composite program and encodes the draw.
//! - `surface` and `offscreen` are the two [`RenderDriver`] implementations.
//!
//! [`RenderDriver`]: crate::compositor::RenderDriver

mod context;
mod offscreen;
mod pipeline;
mod surface;
mod textures;
mod uniforms;

pub use offscreen::OffscreenRenderer;
pub use surface::SurfaceRenderer;
