//! Index buffers in draw order.

use crate::backend::IndexType;
use crate::scene::Scene;
use crate::sort::SortKey;

/// Edges of the scene bounding box over the eight corners written by
/// [`pack_border`](crate::pack::pack_border).
pub const BORDER_INDICES: [u16; 24] = [
    0, 1, 1, 2, 2, 3, 3, 0, // max-z face
    4, 5, 5, 6, 6, 7, 7, 4, // min-z face
    0, 4, 3, 7, 1, 5, 2, 6, // connecting edges
];

/// Index data in either width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexData {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexData {
    #[inline]
    pub fn index_type(&self) -> IndexType {
        match self {
            IndexData::U16(_) => IndexType::U16,
            IndexData::U32(_) => IndexType::U32,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            IndexData::U16(data) => data.len(),
            IndexData::U32(data) => data.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw bytes for upload.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexData::U16(data) => bytemuck::cast_slice(data),
            IndexData::U32(data) => bytemuck::cast_slice(data),
        }
    }
}

/// One index per sorted point.
pub fn point_indices(sorted: &[SortKey]) -> Vec<u32> {
    sorted.iter().map(|k| k.index).collect()
}

/// Three consecutive indices per sorted face, matching the unrolled
/// triangle vertex buffer.
pub fn triangle_indices(sorted: &[SortKey]) -> Vec<u32> {
    sorted
        .iter()
        .flat_map(|k| {
            let first = k.index * 3;
            [first, first + 1, first + 2]
        })
        .collect()
}

/// Line indices of every visible object, in object order.
///
/// Every line block, visible or not, occupies vertices in the shared line
/// vertex buffer, so each block's indices are offset by the vertices packed
/// before it.
pub fn line_indices(scene: &Scene) -> Vec<u32> {
    let mut indices = Vec::new();
    let mut base = 0u32;
    for object in &scene.objects {
        for block in &object.lines {
            if object.visible {
                indices.extend(block.indices().iter().map(|&i| base + i));
            }
            base += block.vertex_count() as u32;
        }
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{PrimitiveBlock, SceneObject};

    fn make_lines(name: &str, vertices: usize, indices: Vec<u32>) -> SceneObject {
        SceneObject::new(name)
            .with_lines(PrimitiveBlock::new(vec![0.0; vertices * 3]).with_indices(indices))
    }

    #[test]
    fn points_follow_sorted_order() {
        let sorted = [SortKey::new(4, 1), SortKey::new(0, 9), SortKey::new(2, 300)];
        assert_eq!(point_indices(&sorted), vec![4, 0, 2]);
    }

    #[test]
    fn triangles_expand_to_three_indices() {
        let sorted = [SortKey::new(1, 0), SortKey::new(0, 5)];
        assert_eq!(triangle_indices(&sorted), vec![3, 4, 5, 0, 1, 2]);
    }

    #[test]
    fn lines_skip_hidden_objects_and_keep_offsets() {
        let mut hidden = make_lines("hidden", 3, vec![0, 1, 1, 2]);
        hidden.visible = false;
        let scene = Scene::default()
            .with_object(make_lines("a", 2, vec![0, 1]))
            .with_object(hidden)
            .with_object(make_lines("b", 2, vec![1, 0]));

        assert_eq!(line_indices(&scene), vec![0, 1, 6, 5]);
    }

    #[test]
    fn border_covers_twelve_edges() {
        assert_eq!(BORDER_INDICES.len(), 24);
        assert!(BORDER_INDICES.iter().all(|&i| i < 8));
        let data = IndexData::U16(BORDER_INDICES.to_vec());
        assert_eq!(data.index_type(), IndexType::U16);
        assert_eq!(data.as_bytes().len(), 48);
    }
}
