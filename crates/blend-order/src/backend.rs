//! The seam between the sorting pipeline and whatever draws its output.
//!
//! The pipeline only produces bytes: interleaved vertex buffers, index
//! buffers and a handful of per-frame uniforms. A [`GpuBackend`] uploads
//! and draws them. [`RecordingBackend`] keeps everything in memory and logs
//! each call, for tests and headless runs.

use std::collections::HashMap;

use nalgebra::Matrix4;

use crate::error::BackendError;

/// Buffer binding points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Interleaved vertex attributes.
    Array,
    /// Draw-order indices.
    ElementArray,
}

/// Upload frequency hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    StaticDraw,
    DynamicDraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveMode {
    Points,
    Triangles,
    Lines,
}

/// Width of the entries in an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    /// Bytes per index.
    #[inline]
    pub fn size(self) -> usize {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Component type of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeFormat {
    F32,
    U8,
}

/// One attribute inside an interleaved vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub name: &'static str,
    pub components: u32,
    pub format: AttributeFormat,
    /// Integer data is mapped to `[0, 1]` by the shader.
    pub normalized: bool,
    pub offset: usize,
}

/// Per-draw state the backend binds to its shaders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub model_view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    /// Front faces wind counter-clockwise.
    pub counter_clockwise: bool,
    /// Global alpha multiplier.
    pub opacity: f32,
    /// Point size multiplier, already scaled by the model size.
    pub point_scale: f32,
    /// Point shape selector.
    pub point_type: i32,
}

/// An indexed draw over the currently bound buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub mode: PrimitiveMode,
    pub count: usize,
    pub index_type: IndexType,
    /// Byte offset into the bound index buffer.
    pub offset: usize,
}

/// Buffer upload and draw submission.
///
/// Implementations hold the GPU context; the pipeline never touches shaders
/// and only talks to the backend through these calls.
pub trait GpuBackend {
    /// Opaque buffer handle.
    type Buffer: Copy + std::fmt::Debug;

    fn create_buffer(&mut self) -> Result<Self::Buffer, BackendError>;

    /// Binds `buffer` to `target`, or unbinds it with `None`.
    fn bind_buffer(
        &mut self,
        target: BufferTarget,
        buffer: Option<Self::Buffer>,
    ) -> Result<(), BackendError>;

    /// Replaces the contents of the buffer bound to `target`.
    fn buffer_data(
        &mut self,
        target: BufferTarget,
        bytes: &[u8],
        usage: BufferUsage,
    ) -> Result<(), BackendError>;

    /// Describes the interleaved layout of the bound vertex buffer.
    fn vertex_layout(
        &mut self,
        stride: usize,
        attributes: &[VertexAttribute],
    ) -> Result<(), BackendError>;

    /// Binds camera matrices and global draw settings.
    fn set_camera(&mut self, uniforms: &FrameUniforms) -> Result<(), BackendError>;

    fn draw_elements(&mut self, draw: DrawCall) -> Result<(), BackendError>;
}

/// A call received by a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateBuffer(u32),
    BindBuffer(BufferTarget, Option<u32>),
    BufferData {
        target: BufferTarget,
        buffer: u32,
        len: usize,
        usage: BufferUsage,
    },
    VertexLayout { stride: usize },
    SetCamera(FrameUniforms),
    DrawElements {
        draw: DrawCall,
        vertices: u32,
        indices: u32,
    },
}

/// In-memory backend that records every call.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    buffers: HashMap<u32, Vec<u8>>,
    next_handle: u32,
    array: Option<u32>,
    element_array: Option<u32>,
    fail_draws: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent draw call fail.
    pub fn fail_draws(&mut self, fail: bool) {
        self.fail_draws = fail;
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Contents of a buffer, if it exists and has been filled.
    pub fn buffer(&self, handle: u32) -> Option<&[u8]> {
        self.buffers.get(&handle).map(Vec::as_slice)
    }

    /// Every draw recorded so far, with the buffers bound at the time.
    pub fn draws(&self) -> impl Iterator<Item = (DrawCall, u32, u32)> + '_ {
        self.calls.iter().filter_map(|call| match call {
            BackendCall::DrawElements {
                draw,
                vertices,
                indices,
            } => Some((*draw, *vertices, *indices)),
            _ => None,
        })
    }

    /// The most recent draw of `mode`.
    pub fn last_draw(&self, mode: PrimitiveMode) -> Option<(DrawCall, u32, u32)> {
        self.draws().filter(|(d, _, _)| d.mode == mode).last()
    }

    /// Decodes the indices a draw used.
    pub fn draw_indices(&self, draw: DrawCall, indices: u32) -> Vec<u32> {
        let Some(bytes) = self.buffer(indices) else {
            return Vec::new();
        };
        let size = draw.index_type.size();
        bytes
            .get(draw.offset..draw.offset + draw.count * size)
            .unwrap_or(&[])
            .chunks_exact(size)
            .map(|c| match draw.index_type {
                IndexType::U16 => u16::from_le_bytes([c[0], c[1]]) as u32,
                IndexType::U32 => u32::from_le_bytes([c[0], c[1], c[2], c[3]]),
            })
            .collect()
    }

    fn bound(&self, target: BufferTarget) -> Option<u32> {
        match target {
            BufferTarget::Array => self.array,
            BufferTarget::ElementArray => self.element_array,
        }
    }
}

impl GpuBackend for RecordingBackend {
    type Buffer = u32;

    fn create_buffer(&mut self) -> Result<u32, BackendError> {
        self.next_handle += 1;
        let handle = self.next_handle;
        self.buffers.insert(handle, Vec::new());
        self.calls.push(BackendCall::CreateBuffer(handle));
        Ok(handle)
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<u32>) -> Result<(), BackendError> {
        if let Some(handle) = buffer
            && !self.buffers.contains_key(&handle)
        {
            return Err(BackendError::new(format!("unknown buffer {handle}")));
        }
        match target {
            BufferTarget::Array => self.array = buffer,
            BufferTarget::ElementArray => self.element_array = buffer,
        }
        self.calls.push(BackendCall::BindBuffer(target, buffer));
        Ok(())
    }

    fn buffer_data(
        &mut self,
        target: BufferTarget,
        bytes: &[u8],
        usage: BufferUsage,
    ) -> Result<(), BackendError> {
        let handle = self
            .bound(target)
            .ok_or_else(|| BackendError::new(format!("no buffer bound to {target:?}")))?;
        self.buffers.insert(handle, bytes.to_vec());
        self.calls.push(BackendCall::BufferData {
            target,
            buffer: handle,
            len: bytes.len(),
            usage,
        });
        Ok(())
    }

    fn vertex_layout(
        &mut self,
        stride: usize,
        _attributes: &[VertexAttribute],
    ) -> Result<(), BackendError> {
        self.calls.push(BackendCall::VertexLayout { stride });
        Ok(())
    }

    fn set_camera(&mut self, uniforms: &FrameUniforms) -> Result<(), BackendError> {
        self.calls.push(BackendCall::SetCamera(*uniforms));
        Ok(())
    }

    fn draw_elements(&mut self, draw: DrawCall) -> Result<(), BackendError> {
        if self.fail_draws {
            return Err(BackendError::new("draw rejected"));
        }
        let (Some(vertices), Some(indices)) = (self.array, self.element_array) else {
            return Err(BackendError::new("draw with no buffers bound"));
        };
        self.calls.push(BackendCall::DrawElements {
            draw,
            vertices,
            indices,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_uploads_into_bound_buffer() {
        let mut backend = RecordingBackend::new();
        let vbo = backend.create_buffer().unwrap();
        let ibo = backend.create_buffer().unwrap();
        backend.bind_buffer(BufferTarget::Array, Some(vbo)).unwrap();
        backend.bind_buffer(BufferTarget::ElementArray, Some(ibo)).unwrap();

        let indices: [u32; 3] = [2, 0, 1];
        backend
            .buffer_data(
                BufferTarget::ElementArray,
                bytemuck::cast_slice(&indices),
                BufferUsage::StaticDraw,
            )
            .unwrap();

        let draw = DrawCall {
            mode: PrimitiveMode::Points,
            count: 3,
            index_type: IndexType::U32,
            offset: 0,
        };
        backend.draw_elements(draw).unwrap();

        let (recorded, v, i) = backend.last_draw(PrimitiveMode::Points).unwrap();
        assert_eq!((recorded, v, i), (draw, vbo, ibo));
        assert_eq!(backend.draw_indices(recorded, i), vec![2, 0, 1]);
    }

    #[test]
    fn upload_without_binding_fails() {
        let mut backend = RecordingBackend::new();
        let err = backend
            .buffer_data(BufferTarget::Array, &[0, 1], BufferUsage::StaticDraw)
            .unwrap_err();
        assert!(err.message().contains("Array"));
    }

    #[test]
    fn binding_unknown_buffer_fails() {
        let mut backend = RecordingBackend::new();
        assert!(backend.bind_buffer(BufferTarget::Array, Some(7)).is_err());
    }

    #[test]
    fn u16_indices_decode() {
        let mut backend = RecordingBackend::new();
        let vbo = backend.create_buffer().unwrap();
        let ibo = backend.create_buffer().unwrap();
        backend.bind_buffer(BufferTarget::Array, Some(vbo)).unwrap();
        backend.bind_buffer(BufferTarget::ElementArray, Some(ibo)).unwrap();
        let indices: [u16; 4] = [0, 1, 1, 2];
        backend
            .buffer_data(
                BufferTarget::ElementArray,
                bytemuck::cast_slice(&indices),
                BufferUsage::StaticDraw,
            )
            .unwrap();
        let draw = DrawCall {
            mode: PrimitiveMode::Lines,
            count: 4,
            index_type: IndexType::U16,
            offset: 0,
        };
        assert_eq!(backend.draw_indices(draw, ibo), vec![0, 1, 1, 2]);
    }
}
