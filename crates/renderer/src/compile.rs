use std::borrow::Cow;

use anyhow::{bail, Result};
use wgpu::naga::ShaderStage;

/// Compiles the pass-through quad vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    compile_glsl(
        device,
        "composite vertex",
        VERTEX_SHADER_GLSL,
        ShaderStage::Vertex,
    )
}

/// Compiles the mask/tint fragment shader.
pub(crate) fn compile_fragment_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    compile_glsl(
        device,
        "composite fragment",
        FRAGMENT_SHADER_GLSL,
        ShaderStage::Fragment,
    )
}

/// Hands GLSL to naga and turns validation failures into errors instead of
/// letting wgpu's uncaptured-error handler panic.
fn compile_glsl(
    device: &wgpu::Device,
    label: &str,
    source: &'static str,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage,
            defines: &[],
        },
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        bail!("failed to compile {label} shader: {err}");
    }
    Ok(module)
}

/// Identity vertex stage; the quad is already in clip space.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec3 position;
layout(location = 1) in vec2 uv;

layout(location = 0) out vec2 v_uv;

void main() {
    gl_Position = vec4(position, 1.0);
    v_uv = uv;
}
";

/// Fragment stage. The uniform block layout must match `TintUniforms` in
/// `gpu/uniforms.rs`, and the threshold must match `shade::MASK_THRESHOLD`.
const FRAGMENT_SHADER_GLSL: &str = r"#version 450
#define MASK_THRESHOLD 0.5

layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform TintParams {
    vec4 tint;
} params;

layout(set = 1, binding = 0) uniform texture2D image_texture;
layout(set = 1, binding = 1) uniform sampler image_sampler;
layout(set = 1, binding = 2) uniform texture2D mask_texture;
layout(set = 1, binding = 3) uniform sampler mask_sampler;

void main() {
    vec3 image_color = texture(sampler2D(image_texture, image_sampler), v_uv).rgb;
    float mask_value = texture(sampler2D(mask_texture, mask_sampler), v_uv).r;

    if (mask_value > MASK_THRESHOLD) {
        image_color *= params.tint.rgb;
    }

    out_color = vec4(image_color, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shade::MASK_THRESHOLD;

    #[test]
    fn fragment_threshold_matches_cpu_reference() {
        let define = format!("#define MASK_THRESHOLD {MASK_THRESHOLD:?}");
        assert!(FRAGMENT_SHADER_GLSL.contains(&define));
        assert!(FRAGMENT_SHADER_GLSL.contains("mask_value > MASK_THRESHOLD"));
    }

    #[test]
    fn fragment_forces_opaque_alpha() {
        assert!(FRAGMENT_SHADER_GLSL.contains("out_color = vec4(image_color, 1.0);"));
    }

    #[test]
    fn shaders_parse_with_naga() {
        use wgpu::naga::front::glsl::{Frontend, Options};

        let mut frontend = Frontend::default();
        frontend
            .parse(&Options::from(ShaderStage::Vertex), VERTEX_SHADER_GLSL)
            .expect("vertex shader parses");
        frontend
            .parse(&Options::from(ShaderStage::Fragment), FRAGMENT_SHADER_GLSL)
            .expect("fragment shader parses");
    }
}
