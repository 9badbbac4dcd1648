use anyhow::{Context, Result};
use wgpu::util::DeviceExt;

use crate::compile::{compile_fragment_shader, compile_vertex_shader};
use crate::compositor::FrameState;
use crate::loader::LoadedTexture;
use crate::scene::{Mesh, QuadVertex};
use crate::types::TextureRole;

use super::context::{GpuContext, SurfaceColorSpace};
use super::textures::{self, TextureResources};
use super::uniforms::TintUniforms;

/// Compiled composite program plus the buffers it draws from.
pub(crate) struct CompositePipeline {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl CompositePipeline {
    pub fn new(device: &wgpu::Device, target_format: wgpu::TextureFormat) -> Result<Self> {
        let vertex_module = compile_vertex_shader(device)?;
        let fragment_module =
            compile_fragment_shader(device).context("failed to compile composite shader")?;

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tint uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite texture layout"),
            entries: &build_texture_layout_entries(),
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tint uniforms"),
            contents: bytemuck::bytes_of(&TintUniforms::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tint uniform bind group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let mesh = Mesh::full_screen_quad();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad vertices"),
            contents: bytemuck::cast_slice(mesh.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad indices"),
            contents: bytemuck::cast_slice(mesh.indices()),
            usage: wgpu::BufferUsages::INDEX,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("composite pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("composite pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &[QuadVertex::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            texture_layout,
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
        })
    }
}

/// Pipeline plus whichever textures have been attached so far.
///
/// The texture bind group only exists once both roles are present, so the
/// draw call cannot be encoded against a partial set.
pub(crate) struct CompositeScene {
    pipeline: CompositePipeline,
    textures: [Option<TextureResources>; 2],
    texture_bind_group: Option<wgpu::BindGroup>,
    color_space: SurfaceColorSpace,
    max_texture_dimension: u32,
}

impl CompositeScene {
    pub fn new(context: &GpuContext, target_format: wgpu::TextureFormat) -> Result<Self> {
        Ok(Self {
            pipeline: CompositePipeline::new(&context.device, target_format)?,
            textures: [None, None],
            texture_bind_group: None,
            color_space: context.color_space,
            max_texture_dimension: context.max_texture_dimension,
        })
    }

    pub fn attach(&mut self, context: &GpuContext, texture: LoadedTexture) -> Result<()> {
        let role = texture.role;
        let resources = textures::upload_texture(
            &context.device,
            &context.queue,
            texture,
            self.color_space,
            self.max_texture_dimension,
        )?;
        self.textures[role.index()] = Some(resources);
        self.rebuild_bind_group(&context.device);
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.texture_bind_group.is_some()
    }

    /// Encodes one pass into `view`: clear to `clear`, then draw the composite
    /// if both textures are bound.
    pub fn encode(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        frame: Option<&FrameState>,
        clear: wgpu::Color,
    ) {
        if let Some(frame) = frame {
            queue.write_buffer(
                &self.pipeline.uniform_buffer,
                0,
                bytemuck::bytes_of(&TintUniforms::from_frame(frame, self.color_space)),
            );
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("composite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        let (Some(_), Some(bind_group)) = (frame, self.texture_bind_group.as_ref()) else {
            return;
        };
        render_pass.set_pipeline(&self.pipeline.pipeline);
        render_pass.set_bind_group(0, &self.pipeline.uniform_bind_group, &[]);
        render_pass.set_bind_group(1, bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.pipeline.vertex_buffer.slice(..));
        render_pass.set_index_buffer(
            self.pipeline.index_buffer.slice(..),
            wgpu::IndexFormat::Uint16,
        );
        render_pass.draw_indexed(0..self.pipeline.index_count, 0, 0..1);
    }

    fn rebuild_bind_group(&mut self, device: &wgpu::Device) {
        let [Some(image), Some(mask)] = &self.textures else {
            return;
        };
        self.texture_bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("composite texture bind group"),
            layout: &self.pipeline.texture_layout,
            entries: &build_texture_entries(image, mask),
        }));
    }
}

fn build_texture_entries<'a>(
    image: &'a TextureResources,
    mask: &'a TextureResources,
) -> [wgpu::BindGroupEntry<'a>; 4] {
    [
        wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::TextureView(&image.view),
        },
        wgpu::BindGroupEntry {
            binding: 1,
            resource: wgpu::BindingResource::Sampler(&image.sampler),
        },
        wgpu::BindGroupEntry {
            binding: 2,
            resource: wgpu::BindingResource::TextureView(&mask.view),
        },
        wgpu::BindGroupEntry {
            binding: 3,
            resource: wgpu::BindingResource::Sampler(&mask.sampler),
        },
    ]
}

/// Texture/sampler pairs at bindings `2 * role` and `2 * role + 1`.
fn build_texture_layout_entries() -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = Vec::with_capacity(TextureRole::ALL.len() * 2);
    for role in TextureRole::ALL {
        let base = (role.index() as u32) * 2;
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: base,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: base + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_layout_pairs_views_with_samplers() {
        let entries = build_texture_layout_entries();
        let bindings: Vec<u32> = entries.iter().map(|entry| entry.binding).collect();
        assert_eq!(bindings, vec![0, 1, 2, 3]);
        for pair in entries.chunks(2) {
            assert!(matches!(pair[0].ty, wgpu::BindingType::Texture { .. }));
            assert!(matches!(pair[1].ty, wgpu::BindingType::Sampler(_)));
        }
    }
}
