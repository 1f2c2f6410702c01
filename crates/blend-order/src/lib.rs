//! Back-to-front ordering and vertex packing for alpha-blended point clouds
//! and triangle meshes.
//!
//! Alpha blending only composites correctly when primitives reach the
//! rasterizer farthest first. Every time the camera rotates, this crate:
//!
//! 1. takes the view-axis row of the model-view matrix ([`DepthAxis`]),
//! 2. measures each point or face centroid along it,
//! 3. quantizes the distances into 16-bit keys ([`Quantizer`]),
//! 4. radix sorts the keys ([`radix_sort`]),
//! 5. writes the sorted order into an index buffer.
//!
//! Vertex buffers are packed once per scene load into fixed interleaved
//! layouts ([`ParticleVertex`], [`TriangleVertex`], [`LineVertex`]) and are
//! never touched by a re-sort.
//!
//! [`Viewer`] ties it together behind a [`GpuBackend`] trait, so the same
//! pipeline drives a real renderer or the in-memory [`RecordingBackend`].

pub mod backend;
pub mod camera;
pub mod colour;
pub mod config;
pub mod depth;
pub mod error;
pub mod frame;
pub mod index;
pub mod pack;
pub mod scene;
pub mod schedule;
pub mod sort;

pub use backend::{
    AttributeFormat, BackendCall, BufferTarget, BufferUsage, DrawCall, FrameUniforms, GpuBackend,
    IndexType, PrimitiveMode, RecordingBackend, VertexAttribute,
};
pub use camera::CameraState;
pub use colour::{ColourMap, ColourResolver, ColourStop, PALETTE_SIZE, Rgba, palette_index};
pub use config::{SortPolicy, ViewerSettings};
pub use depth::{
    DEPTH_EPSILON, DepthAxis, DepthRange, DepthRef, MAX_KEY, Quantizer, eye_distance, quantize,
    scene_depth_range,
};
pub use error::{BackendError, ConfigError, FrameError, SceneError};
pub use frame::{Renderer, RendererKind, Viewer};
pub use index::{BORDER_INDICES, IndexData};
pub use pack::{LineVertex, ParticleVertex, TriangleVertex, VertexLayout};
pub use scene::{
    GeometryKind, GridSize, InitialRotation, Normals, PrimitiveBlock, ScalarValues, Scene,
    SceneObject, SceneOptions, VertexValues,
};
pub use schedule::DeferredTask;
pub use sort::{RadixKey, SortKey, radix_sort};
