use bytemuck::{Pod, Zeroable};

/// One vertex of the full-screen quad: clip-space position plus UV.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl QuadVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Static two-triangle mesh covering clip space `[-1, 1]²`.
///
/// UVs run `[0, 1]²` with `v` pointing up, so textures are uploaded flipped
/// vertically.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: [QuadVertex; 4],
    indices: [u16; 6],
}

impl Mesh {
    pub fn full_screen_quad() -> Self {
        Self {
            vertices: [
                QuadVertex {
                    position: [-1.0, -1.0, 0.0],
                    uv: [0.0, 0.0],
                },
                QuadVertex {
                    position: [1.0, -1.0, 0.0],
                    uv: [1.0, 0.0],
                },
                QuadVertex {
                    position: [-1.0, 1.0, 0.0],
                    uv: [0.0, 1.0],
                },
                QuadVertex {
                    position: [1.0, 1.0, 0.0],
                    uv: [1.0, 1.0],
                },
            ],
            indices: [0, 1, 2, 2, 1, 3],
        }
    }

    pub fn vertices(&self) -> &[QuadVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}
