//! Decoded scene data: objects, primitive blocks, colour maps and view options.
//!
//! Everything here arrives already decoded from a scene loader. The types
//! derive [`Deserialize`] against the JSON layout the loader produces, with
//! nested `{ "data": [...] }` arrays flattened into plain vectors.

use std::cell::OnceCell;

use nalgebra::Point3;
use serde::Deserialize;

use crate::colour::{ColourMap, Rgba};
use crate::error::SceneError;

/// The three kinds of geometry an object can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Points,
    Triangles,
    Lines,
}

/// Per-vertex scalar data used for colour mapping.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScalarValues {
    pub data: Vec<f32>,
    /// Declared lower bound. Overrides the colour map's own range.
    #[serde(default)]
    pub minimum: Option<f32>,
    /// Declared upper bound. Overrides the colour map's own range.
    #[serde(default)]
    pub maximum: Option<f32>,
}

impl ScalarValues {
    pub fn new(data: Vec<f32>) -> Self {
        Self {
            data,
            minimum: None,
            maximum: None,
        }
    }

    pub fn with_range(mut self, minimum: f32, maximum: f32) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    /// Extents of the data itself, ignoring NaNs. `None` when there is no data.
    pub fn data_range(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// Per-vertex data that decides vertex colour.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "ValuesDesc")]
pub enum VertexValues {
    /// Scalars looked up in the object's colour map.
    Scalar(ScalarValues),
    /// Packed RGBA colours, drawn as given.
    Colours(Vec<u32>),
}

impl From<ScalarValues> for VertexValues {
    fn from(values: ScalarValues) -> Self {
        VertexValues::Scalar(values)
    }
}

/// Surface normals of a block: one for the whole block, or one per vertex.
#[derive(Debug, Clone, PartialEq)]
pub enum Normals {
    Uniform([f32; 3]),
    PerVertex(Vec<f32>),
}

impl Normals {
    /// Interprets a flat normal array; exactly three floats means one shared normal.
    pub fn from_flat(data: Vec<f32>) -> Self {
        match data.as_slice() {
            &[x, y, z] => Normals::Uniform([x, y, z]),
            _ => Normals::PerVertex(data),
        }
    }

    /// Normal for `vertex`, zero when the per-vertex array is short.
    #[inline]
    pub fn get(&self, vertex: usize) -> [f32; 3] {
        match self {
            Normals::Uniform(n) => *n,
            Normals::PerVertex(data) => {
                let i = vertex * 3;
                match data.get(i..i + 3) {
                    Some(&[x, y, z]) => [x, y, z],
                    _ => [0.0; 3],
                }
            }
        }
    }
}

/// Dimensions of a cross-section slice sampled on a regular vertex grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

/// Triangulates a `width × height` vertex grid, two triangles per cell.
pub fn grid_indices(grid: GridSize) -> Vec<u32> {
    let (w, h) = (grid.width, grid.height);
    if w < 2 || h < 2 {
        return Vec::new();
    }

    let mut indices = Vec::with_capacity(((w - 1) * (h - 1) * 6) as usize);
    for j in 0..h - 1 {
        let row0 = j * w;
        let row1 = (j + 1) * w;
        for k in 0..w - 1 {
            indices.extend_from_slice(&[row0 + k, row1 + k, row0 + k + 1]);
            indices.extend_from_slice(&[row1 + k, row0 + k + 1, row1 + k + 1]);
        }
    }
    indices
}

/// One block of geometry: positions plus optional attributes and topology.
///
/// Triangle blocks keep a lazily computed centroid per face. The cache is
/// dropped in full whenever the vertices or indices are replaced.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "BlockDesc")]
pub struct PrimitiveBlock {
    vertices: Vec<f32>,
    indices: Option<Vec<u32>>,
    pub values: Option<VertexValues>,
    pub sizes: Option<Vec<f32>>,
    pub normals: Option<Normals>,
    grid: Option<GridSize>,
    centroids: OnceCell<Vec<Option<Point3<f32>>>>,
}

impl PrimitiveBlock {
    /// Creates a block from flat `x, y, z` positions.
    pub fn new(vertices: Vec<f32>) -> Self {
        Self {
            vertices,
            ..Self::default()
        }
    }

    /// Creates a cross-section slice over a `width × height` vertex grid.
    ///
    /// Its triangles are generated from the grid and its faces have no
    /// centroid, so they always sort into the nearest bucket.
    pub fn cross_section(vertices: Vec<f32>, width: u32, height: u32) -> Self {
        let grid = GridSize { width, height };
        Self {
            vertices,
            indices: Some(grid_indices(grid)),
            grid: Some(grid),
            ..Self::default()
        }
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.set_indices(indices);
        self
    }

    pub fn with_values(mut self, values: impl Into<VertexValues>) -> Self {
        self.values = Some(values.into());
        self
    }

    /// Per-vertex packed RGBA colours, used instead of a colour map.
    pub fn with_colours(mut self, colours: Vec<u32>) -> Self {
        self.values = Some(VertexValues::Colours(colours));
        self
    }

    pub fn with_sizes(mut self, sizes: Vec<f32>) -> Self {
        self.sizes = Some(sizes);
        self
    }

    pub fn with_normals(mut self, normals: Normals) -> Self {
        self.normals = Some(normals);
        self
    }

    #[inline]
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    /// The index array, empty when the block has none.
    #[inline]
    pub fn indices(&self) -> &[u32] {
        self.indices.as_deref().unwrap_or(&[])
    }

    pub fn set_vertices(&mut self, vertices: Vec<f32>) {
        self.vertices = vertices;
        self.centroids.take();
    }

    pub fn set_indices(&mut self, indices: Vec<u32>) {
        self.indices = Some(indices);
        self.centroids.take();
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Number of whole triangles described by the index array.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.indices().len() / 3
    }

    #[inline]
    pub fn vertex(&self, index: usize) -> Option<Point3<f32>> {
        let i = index * 3;
        match self.vertices.get(i..i + 3) {
            Some(&[x, y, z]) => Some(Point3::new(x, y, z)),
            _ => None,
        }
    }

    pub fn is_cross_section(&self) -> bool {
        self.grid.is_some()
    }

    pub fn grid(&self) -> Option<GridSize> {
        self.grid
    }

    /// Per-face centroids, computed on first access.
    ///
    /// `None` marks a face with no usable position (cross-section faces and
    /// faces referencing missing vertices).
    pub fn centroids(&self) -> &[Option<Point3<f32>>] {
        self.centroids.get_or_init(|| self.compute_centroids())
    }

    /// Fills the centroid cache now rather than on the first sort.
    pub fn warm_centroids(&self) {
        self.centroids();
    }

    /// Whether the centroid cache is currently populated.
    pub fn has_cached_centroids(&self) -> bool {
        self.centroids.get().is_some()
    }

    fn compute_centroids(&self) -> Vec<Option<Point3<f32>>> {
        if self.is_cross_section() {
            return vec![None; self.face_count()];
        }

        self.indices()
            .chunks_exact(3)
            .map(|face| {
                let a = self.vertex(face[0] as usize)?;
                let b = self.vertex(face[1] as usize)?;
                let c = self.vertex(face[2] as usize)?;
                Some(Point3::from((a.coords + b.coords + c.coords) / 3.0))
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct DataArray<T> {
    data: Vec<T>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ValueType {
    #[default]
    Float,
    Integer,
}

#[derive(Deserialize)]
struct ValuesDesc {
    #[serde(default, rename = "type")]
    value_type: ValueType,
    data: Vec<f64>,
    #[serde(default)]
    minimum: Option<f32>,
    #[serde(default)]
    maximum: Option<f32>,
}

impl From<ValuesDesc> for VertexValues {
    fn from(desc: ValuesDesc) -> Self {
        match desc.value_type {
            ValueType::Integer => {
                VertexValues::Colours(desc.data.into_iter().map(|v| v as u32).collect())
            }
            ValueType::Float => VertexValues::Scalar(ScalarValues {
                data: desc.data.into_iter().map(|v| v as f32).collect(),
                minimum: desc.minimum,
                maximum: desc.maximum,
            }),
        }
    }
}

#[derive(Deserialize)]
struct BlockDesc {
    vertices: DataArray<f32>,
    #[serde(default)]
    indices: Option<DataArray<u32>>,
    #[serde(default)]
    values: Option<VertexValues>,
    #[serde(default)]
    normals: Option<DataArray<f32>>,
    #[serde(default)]
    sizes: Option<DataArray<f32>>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

impl From<BlockDesc> for PrimitiveBlock {
    fn from(desc: BlockDesc) -> Self {
        let grid = match (desc.width, desc.height) {
            (Some(width), Some(height)) => Some(GridSize { width, height }),
            _ => None,
        };
        let indices = match (desc.indices, grid) {
            (Some(indices), _) => Some(indices.data),
            (None, Some(grid)) => Some(grid_indices(grid)),
            (None, None) => None,
        };

        Self {
            vertices: desc.vertices.data,
            indices,
            values: desc.values,
            sizes: desc.sizes.map(|s| s.data),
            normals: desc.normals.map(|n| Normals::from_flat(n.data)),
            grid,
            centroids: OnceCell::new(),
        }
    }
}

fn visible_default() -> bool {
    true
}

fn point_size_default() -> f32 {
    1.0
}

/// A named scene object with its own colour settings and geometry blocks.
#[derive(Debug, Clone, Deserialize)]
pub struct SceneObject {
    pub name: String,
    #[serde(default = "visible_default")]
    pub visible: bool,
    #[serde(default)]
    pub colour: Rgba,
    #[serde(default)]
    pub opacity: Option<f32>,
    #[serde(default, rename = "colourmap")]
    pub colour_map: Option<usize>,
    #[serde(default = "point_size_default", rename = "pointsize")]
    pub point_size: f32,
    /// Point shape; `0` leaves it to the renderer default.
    #[serde(default, rename = "pointtype")]
    pub point_type: i32,
    #[serde(default)]
    pub wireframe: bool,
    #[serde(default)]
    pub points: Vec<PrimitiveBlock>,
    #[serde(default)]
    pub triangles: Vec<PrimitiveBlock>,
    #[serde(default)]
    pub lines: Vec<PrimitiveBlock>,
}

impl SceneObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            colour: Rgba::WHITE,
            opacity: None,
            colour_map: None,
            point_size: 1.0,
            point_type: 0,
            wireframe: false,
            points: Vec::new(),
            triangles: Vec::new(),
            lines: Vec::new(),
        }
    }

    pub fn with_colour(mut self, colour: Rgba) -> Self {
        self.colour = colour;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn with_colour_map(mut self, index: usize) -> Self {
        self.colour_map = Some(index);
        self
    }

    pub fn with_points(mut self, block: PrimitiveBlock) -> Self {
        self.points.push(block);
        self
    }

    pub fn with_triangles(mut self, block: PrimitiveBlock) -> Self {
        self.triangles.push(block);
        self
    }

    pub fn with_lines(mut self, block: PrimitiveBlock) -> Self {
        self.lines.push(block);
        self
    }

    #[inline]
    pub fn blocks(&self, kind: GeometryKind) -> &[PrimitiveBlock] {
        match kind {
            GeometryKind::Points => &self.points,
            GeometryKind::Triangles => &self.triangles,
            GeometryKind::Lines => &self.lines,
        }
    }

    pub fn has(&self, kind: GeometryKind) -> bool {
        !self.blocks(kind).is_empty()
    }
}

/// Initial rotation: Euler angles in degrees, or an `[x, y, z, w]` quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InitialRotation {
    Euler([f32; 3]),
    Quaternion([f32; 4]),
}

/// View options carried by the scene description.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SceneOptions {
    pub min: [f32; 3],
    pub max: [f32; 3],
    pub rotate: Option<InitialRotation>,
    pub translate: Option<[f32; 3]>,
    pub scale: Option<[f32; 3]>,
    pub focus: Option<[f32; 3]>,
    pub near_clip: Option<f32>,
    pub far_clip: Option<f32>,
    pub orientation: Option<f32>,
    pub border: bool,
    #[serde(rename = "pointScale")]
    pub point_scale: Option<f32>,
    #[serde(rename = "pointType")]
    pub point_type: Option<i32>,
    pub opacity: Option<f32>,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            min: [0.0; 3],
            max: [1.0; 3],
            rotate: None,
            translate: None,
            scale: None,
            focus: None,
            near_clip: None,
            far_clip: None,
            orientation: None,
            border: false,
            point_scale: None,
            point_type: None,
            opacity: None,
        }
    }
}

impl SceneOptions {
    pub fn with_bounds(mut self, min: [f32; 3], max: [f32; 3]) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn bounds(&self) -> (Point3<f32>, Point3<f32>) {
        (Point3::from(self.min), Point3::from(self.max))
    }
}

/// A complete decoded scene.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub objects: Vec<SceneObject>,
    #[serde(rename = "colourmaps")]
    pub colour_maps: Vec<ColourMap>,
    pub options: SceneOptions,
}

impl Scene {
    pub fn new(options: SceneOptions) -> Self {
        Self {
            objects: Vec::new(),
            colour_maps: Vec::new(),
            options,
        }
    }

    pub fn with_object(mut self, object: SceneObject) -> Self {
        self.objects.push(object);
        self
    }

    pub fn with_colour_map(mut self, map: ColourMap) -> Self {
        self.colour_maps.push(map);
        self
    }

    /// The colour map an object refers to, if the reference resolves.
    pub fn colour_map_of(&self, object: &SceneObject) -> Option<&ColourMap> {
        object.colour_map.and_then(|i| self.colour_maps.get(i))
    }

    pub fn has(&self, kind: GeometryKind) -> bool {
        self.objects.iter().any(|o| o.has(kind))
    }

    /// Total vertices across every block of every kind.
    pub fn vertex_count(&self) -> usize {
        self.objects
            .iter()
            .flat_map(|o| o.points.iter().chain(&o.triangles).chain(&o.lines))
            .map(PrimitiveBlock::vertex_count)
            .sum()
    }

    /// Checks the structural invariants the packers rely on.
    pub fn validate(&self) -> Result<(), SceneError> {
        for object in &self.objects {
            if let Some(index) = object.colour_map
                && index >= self.colour_maps.len()
            {
                return Err(SceneError::UnknownColourMap {
                    object: object.name.clone(),
                    index,
                    count: self.colour_maps.len(),
                });
            }

            for kind in [
                GeometryKind::Points,
                GeometryKind::Triangles,
                GeometryKind::Lines,
            ] {
                for block in object.blocks(kind) {
                    validate_block(object, kind, block)?;
                }
            }
        }
        Ok(())
    }
}

fn validate_block(
    object: &SceneObject,
    kind: GeometryKind,
    block: &PrimitiveBlock,
) -> Result<(), SceneError> {
    let len = block.vertices().len();
    if len % 3 != 0 {
        return Err(SceneError::RaggedVertices {
            object: object.name.clone(),
            kind,
            len,
        });
    }

    if kind == GeometryKind::Triangles && block.indices().len() % 3 != 0 {
        return Err(SceneError::RaggedFaces {
            object: object.name.clone(),
            len: block.indices().len(),
        });
    }

    let vertex_count = block.vertex_count();
    if let Some(&index) = block
        .indices()
        .iter()
        .find(|&&i| i as usize >= vertex_count)
    {
        return Err(SceneError::IndexOutOfRange {
            object: object.name.clone(),
            kind,
            index,
            vertex_count,
        });
    }
    Ok(())
}
