//! A [`GpuBackend`] that draws through macroquad.
//!
//! Buffers live in memory. Each draw decodes the bound vertex buffer with
//! the layout its primitive mode implies, moves positions into eye space on
//! the CPU and submits them in index order, so the sorted order survives.
//! The frame's projection matrix, clip planes included, is installed as the
//! macroquad camera.

use blend_order::{
    BackendError, BufferTarget, BufferUsage, DrawCall, FrameUniforms, GpuBackend, IndexType,
    LineVertex, ParticleVertex, PrimitiveMode, TriangleVertex, VertexAttribute, VertexLayout,
};
use macroquad::camera::Camera;
use macroquad::texture::RenderPass;
use macroquad::models::{Mesh, Vertex, draw_mesh};
use macroquad::prelude::*;
use nalgebra::{Matrix4, Point3};

/// Largest vertex count per macroquad mesh; indices are `u16`.
const MESH_VERTEX_LIMIT: usize = 3 * 20_000;

/// Screen-space point radius per unit of size, before the point scale.
const POINT_RADIUS: f32 = 0.005;

/// Rim vertices of a round point.
const POINT_SEGMENTS: usize = 8;

/// A camera that applies a ready-made projection to eye-space positions.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionCamera {
    projection: Mat4,
}

impl ProjectionCamera {
    pub fn new(projection: &Matrix4<f32>) -> Self {
        Self {
            projection: Mat4::from_cols_slice(projection.as_slice()),
        }
    }
}

impl Camera for ProjectionCamera {
    fn matrix(&self) -> Mat4 {
        self.projection
    }

    fn depth_enabled(&self) -> bool {
        true
    }

    fn render_pass(&self) -> Option<RenderPass> {
        None
    }

    fn viewport(&self) -> Option<(i32, i32, i32, i32)> {
        None
    }
}

/// How a point sprite is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointShape {
    /// Round, fading to transparent at the rim.
    Blurred,
    /// Round with a hard edge.
    Disc,
    Square,
}

/// Shape for a point. A non-negative per-vertex type wins over the frame's.
pub fn point_shape(vertex_type: f32, frame_type: i32) -> PointShape {
    let selector = if vertex_type >= 0.0 {
        vertex_type.round() as i32
    } else {
        frame_type
    };
    match selector {
        0 => PointShape::Blurred,
        4 => PointShape::Square,
        _ => PointShape::Disc,
    }
}

/// Corner order that hands macroquad counter-clockwise front faces.
pub fn corner_order(counter_clockwise: bool) -> [usize; 3] {
    if counter_clockwise { [0, 1, 2] } else { [0, 2, 1] }
}

fn push_point(mesh: &mut Mesh, centre: Vec3, radius: f32, colour: Color, shape: PointShape) {
    let base = mesh.vertices.len() as u16;
    let uv = vec2(0.0, 0.0);
    if shape == PointShape::Square {
        let r = radius;
        for (dx, dy) in [(-r, -r), (r, -r), (r, r), (-r, r)] {
            mesh.vertices
                .push(Vertex::new2(centre + vec3(dx, dy, 0.0), uv, colour));
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        return;
    }

    let rim = match shape {
        PointShape::Blurred => Color { a: 0.0, ..colour },
        _ => colour,
    };
    mesh.vertices.push(Vertex::new2(centre, uv, colour));
    for k in 0..POINT_SEGMENTS {
        let angle = k as f32 * std::f32::consts::TAU / POINT_SEGMENTS as f32;
        let offset = vec3(angle.cos() * radius, angle.sin() * radius, 0.0);
        mesh.vertices.push(Vertex::new2(centre + offset, uv, rim));
    }
    for k in 0..POINT_SEGMENTS as u16 {
        let next = (k + 1) % POINT_SEGMENTS as u16;
        mesh.indices.extend_from_slice(&[base, base + 1 + k, base + 1 + next]);
    }
}

pub struct MacroquadBackend {
    buffers: Vec<Vec<u8>>,
    array: Option<usize>,
    element_array: Option<usize>,
    stride: usize,
    model_view: Matrix4<f32>,
    uniforms: Option<FrameUniforms>,
}

impl Default for MacroquadBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MacroquadBackend {
    pub fn new() -> Self {
        Self {
            buffers: Vec::new(),
            array: None,
            element_array: None,
            stride: 0,
            model_view: Matrix4::identity(),
            uniforms: None,
        }
    }

    fn eye(&self, position: [f32; 3]) -> Vec3 {
        let p = self.model_view.transform_point(&Point3::from(position));
        vec3(p.x, p.y, p.z)
    }

    fn colour(&self, packed: u32) -> Color {
        let [r, g, b, a] = packed.to_le_bytes();
        let opacity = self.uniforms.map_or(1.0, |u| u.opacity);
        let a = (a as f32 * opacity).round().clamp(0.0, 255.0) as u8;
        Color::from_rgba(r, g, b, a)
    }

    fn bound(&self, target: BufferTarget) -> Result<&[u8], BackendError> {
        let slot = match target {
            BufferTarget::Array => self.array,
            BufferTarget::ElementArray => self.element_array,
        };
        slot.and_then(|i| self.buffers.get(i))
            .map(Vec::as_slice)
            .ok_or_else(|| BackendError::new(format!("no buffer bound to {target:?}")))
    }

    fn indices(&self, draw: &DrawCall) -> Result<Vec<usize>, BackendError> {
        let bytes = self.bound(BufferTarget::ElementArray)?;
        let size = draw.index_type.size();
        let bytes = bytes
            .get(draw.offset..draw.offset + draw.count * size)
            .ok_or_else(|| BackendError::new("index range past end of buffer"))?;
        Ok(bytes
            .chunks_exact(size)
            .map(|c| match draw.index_type {
                IndexType::U16 => u16::from_le_bytes([c[0], c[1]]) as usize,
                IndexType::U32 => u32::from_le_bytes([c[0], c[1], c[2], c[3]]) as usize,
            })
            .collect())
    }

    fn vertices<V: VertexLayout>(&self) -> Result<Vec<V>, BackendError> {
        if self.stride != V::STRIDE {
            return Err(BackendError::new(format!(
                "vertex layout stride {} does not match {}",
                self.stride,
                V::STRIDE
            )));
        }
        Ok(self
            .bound(BufferTarget::Array)?
            .chunks_exact(V::STRIDE)
            .map(bytemuck::pod_read_unaligned::<V>)
            .collect())
    }

    fn draw_triangles(&self, indices: &[usize]) -> Result<(), BackendError> {
        let vertices: Vec<TriangleVertex> = self.vertices()?;
        let corners = corner_order(self.uniforms.is_none_or(|u| u.counter_clockwise));
        for chunk in indices.chunks(MESH_VERTEX_LIMIT) {
            let mesh_vertices = chunk
                .chunks_exact(3)
                .flat_map(|face| corners.map(|c| face[c]))
                .map(|i| {
                    let v = lookup(&vertices, i)?;
                    let uv = vec2(v.texcoord[0] as f32 / 255.0, v.texcoord[1] as f32 / 255.0);
                    Ok(Vertex::new2(self.eye(v.position), uv, self.colour(v.colour)))
                })
                .collect::<Result<Vec<_>, BackendError>>()?;
            let mesh = Mesh {
                indices: (0..mesh_vertices.len() as u16).collect(),
                vertices: mesh_vertices,
                texture: None,
            };
            draw_mesh(&mesh);
        }
        Ok(())
    }

    /// Points become eye-facing sprites, batched into meshes.
    fn draw_points(&self, indices: &[usize]) -> Result<(), BackendError> {
        let vertices: Vec<ParticleVertex> = self.vertices()?;
        let scale = self.uniforms.map_or(1.0, |u| u.point_scale) * POINT_RADIUS;
        let frame_type = self.uniforms.map_or(0, |u| u.point_type);

        for chunk in indices.chunks(MESH_VERTEX_LIMIT / (POINT_SEGMENTS + 1)) {
            let mut mesh = Mesh {
                vertices: Vec::with_capacity(chunk.len() * (POINT_SEGMENTS + 1)),
                indices: Vec::with_capacity(chunk.len() * POINT_SEGMENTS * 3),
                texture: None,
            };
            for &i in chunk {
                let v = lookup(&vertices, i)?;
                push_point(
                    &mut mesh,
                    self.eye(v.position),
                    v.size * scale,
                    self.colour(v.colour),
                    point_shape(v.point_type, frame_type),
                );
            }
            draw_mesh(&mesh);
        }
        Ok(())
    }

    fn draw_lines(&self, indices: &[usize]) -> Result<(), BackendError> {
        let vertices: Vec<LineVertex> = self.vertices()?;
        for pair in indices.chunks_exact(2) {
            let a = lookup(&vertices, pair[0])?;
            let b = lookup(&vertices, pair[1])?;
            draw_line_3d(self.eye(a.position), self.eye(b.position), self.colour(a.colour));
        }
        Ok(())
    }
}

fn lookup<V>(vertices: &[V], index: usize) -> Result<&V, BackendError> {
    vertices.get(index).ok_or_else(|| {
        BackendError::new(format!(
            "index {index} out of range for {} vertices",
            vertices.len()
        ))
    })
}

impl GpuBackend for MacroquadBackend {
    type Buffer = usize;

    fn create_buffer(&mut self) -> Result<usize, BackendError> {
        self.buffers.push(Vec::new());
        Ok(self.buffers.len() - 1)
    }

    fn bind_buffer(
        &mut self,
        target: BufferTarget,
        buffer: Option<usize>,
    ) -> Result<(), BackendError> {
        if let Some(handle) = buffer
            && handle >= self.buffers.len()
        {
            return Err(BackendError::new(format!("unknown buffer {handle}")));
        }
        match target {
            BufferTarget::Array => self.array = buffer,
            BufferTarget::ElementArray => self.element_array = buffer,
        }
        Ok(())
    }

    fn buffer_data(
        &mut self,
        target: BufferTarget,
        bytes: &[u8],
        _usage: BufferUsage,
    ) -> Result<(), BackendError> {
        let slot = match target {
            BufferTarget::Array => self.array,
            BufferTarget::ElementArray => self.element_array,
        };
        let buffer = slot
            .and_then(|i| self.buffers.get_mut(i))
            .ok_or_else(|| BackendError::new(format!("no buffer bound to {target:?}")))?;
        buffer.clear();
        buffer.extend_from_slice(bytes);
        Ok(())
    }

    fn vertex_layout(
        &mut self,
        stride: usize,
        _attributes: &[VertexAttribute],
    ) -> Result<(), BackendError> {
        self.stride = stride;
        Ok(())
    }

    fn set_camera(&mut self, uniforms: &FrameUniforms) -> Result<(), BackendError> {
        self.model_view = uniforms.model_view;
        self.uniforms = Some(*uniforms);
        set_camera(&ProjectionCamera::new(&uniforms.projection));
        Ok(())
    }

    fn draw_elements(&mut self, draw: DrawCall) -> Result<(), BackendError> {
        let indices = self.indices(&draw)?;
        match draw.mode {
            PrimitiveMode::Triangles => self.draw_triangles(&indices),
            PrimitiveMode::Points => self.draw_points(&indices),
            PrimitiveMode::Lines => self.draw_lines(&indices),
        }
    }
}
