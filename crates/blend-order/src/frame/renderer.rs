//! One buffer pair and its dirty flags.

use std::time::Instant;

use log::debug;

use crate::backend::{
    BufferTarget, BufferUsage, DrawCall, FrameUniforms, GpuBackend, IndexType, PrimitiveMode,
};
use crate::camera::CameraState;
use crate::depth::{self, DepthAxis, DepthRef};
use crate::error::BackendError;
use crate::index::{self, BORDER_INDICES, IndexData};
use crate::pack::{self, LineVertex, ParticleVertex, TriangleVertex, VertexLayout};
use crate::scene::{GeometryKind, Scene};
use crate::sort::radix_sort;

/// What a [`Renderer`] draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererKind {
    Points,
    Triangles,
    Lines,
    /// The scene bounding box.
    Border,
}

impl RendererKind {
    pub fn mode(self) -> PrimitiveMode {
        match self {
            RendererKind::Points => ParticleVertex::MODE,
            RendererKind::Triangles => TriangleVertex::MODE,
            RendererKind::Lines | RendererKind::Border => LineVertex::MODE,
        }
    }

    pub fn geometry(self) -> Option<GeometryKind> {
        match self {
            RendererKind::Points => Some(GeometryKind::Points),
            RendererKind::Triangles => Some(GeometryKind::Triangles),
            RendererKind::Lines => Some(GeometryKind::Lines),
            RendererKind::Border => None,
        }
    }

    /// Usage hint for the index buffer. Sorted kinds rewrite it on every
    /// re-sort.
    pub fn index_usage(self) -> BufferUsage {
        match self {
            RendererKind::Points | RendererKind::Triangles => BufferUsage::DynamicDraw,
            RendererKind::Lines | RendererKind::Border => BufferUsage::StaticDraw,
        }
    }

    fn label(self) -> &'static str {
        match self {
            RendererKind::Points => "particle",
            RendererKind::Triangles => "triangle",
            RendererKind::Lines => "line",
            RendererKind::Border => "border",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Buffers<B> {
    vertices: B,
    indices: B,
}

/// Vertex and index buffers for one [`RendererKind`], created lazily on
/// first draw.
///
/// Sorted renderers keep the reference points they last sorted. A re-sort
/// caused only by camera rotation reuses them; anything else gathers them
/// again.
pub struct Renderer<G: GpuBackend> {
    kind: RendererKind,
    reload: bool,
    sort: bool,
    buffers: Option<Buffers<G::Buffer>>,
    refs: Option<Vec<DepthRef>>,
    index_type: IndexType,
    elements: usize,
}

impl<G: GpuBackend> std::fmt::Debug for Renderer<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("kind", &self.kind)
            .field("reload", &self.reload)
            .field("sort", &self.sort)
            .field("buffers", &self.buffers)
            .field("elements", &self.elements)
            .finish()
    }
}

impl<G: GpuBackend> Renderer<G> {
    pub fn new(kind: RendererKind) -> Self {
        Self {
            kind,
            reload: true,
            sort: true,
            buffers: None,
            refs: None,
            index_type: IndexType::U32,
            elements: 0,
        }
    }

    #[inline]
    pub fn kind(&self) -> RendererKind {
        self.kind
    }

    #[inline]
    pub fn needs_reload(&self) -> bool {
        self.reload
    }

    #[inline]
    pub fn needs_sort(&self) -> bool {
        self.sort
    }

    /// Number of indices the last draw submitted.
    #[inline]
    pub fn elements(&self) -> usize {
        self.elements
    }

    /// Whether gathered reference points are being kept for the next sort.
    #[inline]
    pub fn has_cached_refs(&self) -> bool {
        self.refs.is_some()
    }

    /// Scene data changed: repack vertices and rebuild the draw order.
    pub fn mark_reload(&mut self) {
        self.reload = true;
        self.sort = true;
        self.refs = None;
    }

    /// Which primitives are drawn changed: rebuild the draw order from
    /// freshly gathered reference points.
    pub fn mark_sort(&mut self) {
        self.sort = true;
        self.refs = None;
    }

    /// The camera rotated: re-sort the cached reference points.
    pub fn mark_rotated(&mut self) {
        self.sort = true;
    }

    fn has_geometry(&self, scene: &Scene) -> bool {
        match self.kind.geometry() {
            Some(kind) => scene.has(kind),
            None => true,
        }
    }

    /// Draws with the given uniforms, repacking and re-sorting first if
    /// flagged.
    pub fn draw(
        &mut self,
        backend: &mut G,
        scene: &Scene,
        camera: &CameraState,
        uniforms: &FrameUniforms,
    ) -> Result<(), BackendError> {
        if !self.has_geometry(scene) {
            return Ok(());
        }

        let buffers = match self.buffers {
            Some(buffers) => buffers,
            None => {
                debug!("Creating {} buffers", self.kind.label());
                let buffers = Buffers {
                    vertices: backend.create_buffer()?,
                    indices: backend.create_buffer()?,
                };
                self.buffers = Some(buffers);
                buffers
            }
        };

        backend.set_camera(uniforms)?;
        backend.bind_buffer(BufferTarget::Array, Some(buffers.vertices))?;
        backend.bind_buffer(BufferTarget::ElementArray, Some(buffers.indices))?;

        if self.reload {
            self.update_buffers(backend, scene)?;
        }
        if self.sort || self.reload {
            self.load_elements(backend, scene, camera)?;
        }
        self.reload = false;
        self.sort = false;

        if self.elements > 0 {
            let (stride, attributes) = match self.kind {
                RendererKind::Points => (ParticleVertex::STRIDE, ParticleVertex::ATTRIBUTES),
                RendererKind::Triangles => (TriangleVertex::STRIDE, TriangleVertex::ATTRIBUTES),
                RendererKind::Lines | RendererKind::Border => {
                    (LineVertex::STRIDE, LineVertex::ATTRIBUTES)
                }
            };
            backend.vertex_layout(stride, attributes)?;
            backend.draw_elements(DrawCall {
                mode: self.kind.mode(),
                count: self.elements,
                index_type: self.index_type,
                offset: 0,
            })?;
        }

        backend.bind_buffer(BufferTarget::Array, None)?;
        backend.bind_buffer(BufferTarget::ElementArray, None)?;
        Ok(())
    }

    /// Repacks the vertex buffer from every object, visible or not.
    fn update_buffers(&mut self, backend: &mut G, scene: &Scene) -> Result<(), BackendError> {
        let start = Instant::now();
        let count = match self.kind {
            RendererKind::Points => upload_vertices(backend, &pack::pack_particles(scene))?,
            RendererKind::Triangles => upload_vertices(backend, &pack::pack_triangles(scene))?,
            RendererKind::Lines => upload_vertices(backend, &pack::pack_lines(scene))?,
            RendererKind::Border => {
                let (min, max) = scene.options.bounds();
                upload_vertices(backend, &pack::pack_border(min, max))?
            }
        };
        debug!(
            "{:?} to load and upload {} buffers ({} elements)",
            start.elapsed(),
            self.kind.label(),
            count
        );
        Ok(())
    }

    /// Rebuilds and uploads the index buffer in draw order.
    fn load_elements(
        &mut self,
        backend: &mut G,
        scene: &Scene,
        camera: &CameraState,
    ) -> Result<(), BackendError> {
        let indices = match self.kind {
            RendererKind::Border => IndexData::U16(BORDER_INDICES.to_vec()),
            RendererKind::Lines => IndexData::U32(index::line_indices(scene)),
            RendererKind::Points | RendererKind::Triangles => {
                IndexData::U32(self.sorted_indices(scene, camera))
            }
        };

        self.index_type = indices.index_type();
        self.elements = indices.len();
        if indices.is_empty() {
            return Ok(());
        }

        let start = Instant::now();
        backend.buffer_data(
            BufferTarget::ElementArray,
            indices.as_bytes(),
            self.kind.index_usage(),
        )?;
        debug!("{:?} to update index buffer", start.elapsed());
        Ok(())
    }

    fn sorted_indices(&mut self, scene: &Scene, camera: &CameraState) -> Vec<u32> {
        let start = Instant::now();
        let refs = match self.refs.take() {
            Some(refs) => refs,
            None => {
                let refs = match self.kind {
                    RendererKind::Points => depth::point_refs(scene),
                    _ => depth::face_refs(scene),
                };
                debug!("{:?} to update positions", start.elapsed());
                refs
            }
        };

        let start = Instant::now();
        let axis = DepthAxis::new(&camera.model_view());
        let (min, max) = scene.options.bounds();
        let range = depth::scene_depth_range(min, max, &axis);
        let mut keys = depth::depth_keys(&refs, &axis, range);
        debug!("{:?} to update distances", start.elapsed());
        self.refs = Some(refs);

        let start = Instant::now();
        radix_sort(&mut keys);
        debug!("{:?} to sort {} keys", start.elapsed(), keys.len());

        let start = Instant::now();
        let indices = match self.kind {
            RendererKind::Points => index::point_indices(&keys),
            _ => index::triangle_indices(&keys),
        };
        debug!("{:?} to build indices", start.elapsed());
        indices
    }
}

fn upload_vertices<G: GpuBackend, V: VertexLayout>(
    backend: &mut G,
    vertices: &[V],
) -> Result<usize, BackendError> {
    backend.buffer_data(
        BufferTarget::Array,
        bytemuck::cast_slice(vertices),
        BufferUsage::StaticDraw,
    )?;
    Ok(vertices.len())
}
