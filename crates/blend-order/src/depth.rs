//! Eye-space depth and its quantization into 16-bit sort keys.
//!
//! Only the third row of the model-view matrix matters for depth, so
//! [`DepthAxis`] keeps just those four coefficients.

use nalgebra::{Matrix4, Point3};

use crate::scene::Scene;
use crate::sort::SortKey;

/// Largest sort key, shared by the nearest depth and by primitives without a
/// position, which therefore draw with the nearest.
pub const MAX_KEY: u16 = u16::MAX;

/// Widening applied to a zero-extent depth range.
pub const DEPTH_EPSILON: f32 = 1e-7;

/// Spread of quantized depths; one less than the key range so the nearest
/// depth maps to [`MAX_KEY`] and the farthest to `1`.
const KEY_SPAN: f32 = 65534.0;

/// The view-axis row of a model-view matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthAxis {
    row: [f32; 4],
}

impl DepthAxis {
    pub fn new(model_view: &Matrix4<f32>) -> Self {
        Self {
            row: [
                model_view[(2, 0)],
                model_view[(2, 1)],
                model_view[(2, 2)],
                model_view[(2, 3)],
            ],
        }
    }

    /// Distance from the eye along the view axis; positive in front.
    #[inline]
    pub fn eye_distance(&self, p: &Point3<f32>) -> f32 {
        let [a, b, c, d] = self.row;
        -(a * p.x + b * p.y + c * p.z + d)
    }
}

/// Convenience wrapper around [`DepthAxis::eye_distance`].
#[inline]
pub fn eye_distance(point: &Point3<f32>, model_view: &Matrix4<f32>) -> f32 {
    DepthAxis::new(model_view).eye_distance(point)
}

/// Closest and farthest eye distances of a scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthRange {
    pub min: f32,
    pub max: f32,
}

impl DepthRange {
    #[inline]
    pub fn contains(&self, d: f32) -> bool {
        d >= self.min && d <= self.max
    }
}

/// Depth extrema over the eight corners of the scene bounding box.
///
/// A range with no extent is widened by [`DEPTH_EPSILON`] (or by one unit
/// in the last place when the values are too large for that to register),
/// so quantization never divides by zero.
pub fn scene_depth_range(min: Point3<f32>, max: Point3<f32>, axis: &DepthAxis) -> DepthRange {
    let mut range = DepthRange {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };
    for i in 0..8 {
        let corner = Point3::new(
            if i & 1 == 0 { min.x } else { max.x },
            if i & 2 == 0 { min.y } else { max.y },
            if i & 4 == 0 { min.z } else { max.z },
        );
        let d = axis.eye_distance(&corner);
        range.min = range.min.min(d);
        range.max = range.max.max(d);
    }

    if range.max <= range.min {
        range.max = range.min + DEPTH_EPSILON;
        if range.max <= range.min {
            range.max = range.min + range.min.abs() * f32::EPSILON;
        }
    }
    range
}

/// Maps eye distances in a [`DepthRange`] onto sort keys.
///
/// Nearer is larger, so an ascending sort draws farthest first.
#[derive(Debug, Clone, Copy)]
pub struct Quantizer {
    min: f32,
    multiplier: f32,
}

impl Quantizer {
    pub fn new(range: DepthRange) -> Self {
        Self {
            min: range.min,
            multiplier: KEY_SPAN / (range.max - range.min),
        }
    }

    /// Key for a distance. Out-of-range distances clamp to the ends.
    #[inline]
    pub fn key(&self, distance: f32) -> u16 {
        let scaled = (self.multiplier * (distance - self.min)).clamp(0.0, 65535.0);
        // NaN casts to 0 and lands on MAX_KEY
        MAX_KEY - scaled.round() as u16
    }
}

/// One-shot form of [`Quantizer::key`].
#[inline]
pub fn quantize(distance: f32, range: DepthRange) -> u16 {
    Quantizer::new(range).key(distance)
}

/// The position a primitive sorts by.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DepthRef {
    /// Belongs to an invisible object and is left out of the draw order.
    Hidden,
    /// Has no usable position.
    Absent,
    At(Point3<f32>),
}

/// Sort keys for every visible reference, tagged with its position in `refs`.
pub fn depth_keys(refs: &[DepthRef], axis: &DepthAxis, range: DepthRange) -> Vec<SortKey> {
    let quantizer = Quantizer::new(range);
    refs.iter()
        .enumerate()
        .filter_map(|(i, r)| {
            let key = match r {
                DepthRef::Hidden => return None,
                DepthRef::Absent => MAX_KEY,
                DepthRef::At(p) => quantizer.key(axis.eye_distance(p)),
            };
            Some(SortKey::new(i as u32, key))
        })
        .collect()
}

/// One reference per point vertex, in packing order.
pub fn point_refs(scene: &Scene) -> Vec<DepthRef> {
    let mut refs = Vec::with_capacity(scene.vertex_count());
    for object in &scene.objects {
        for block in &object.points {
            if object.visible {
                refs.extend((0..block.vertex_count()).map(|i| match block.vertex(i) {
                    Some(p) => DepthRef::At(p),
                    None => DepthRef::Absent,
                }));
            } else {
                refs.extend(std::iter::repeat_n(DepthRef::Hidden, block.vertex_count()));
            }
        }
    }
    refs
}

/// One reference per triangle face, in packing order, from the centroid
/// caches.
pub fn face_refs(scene: &Scene) -> Vec<DepthRef> {
    let mut refs = Vec::new();
    for object in &scene.objects {
        for block in &object.triangles {
            if object.visible {
                refs.extend(block.centroids().iter().map(|c| match c {
                    Some(p) => DepthRef::At(*p),
                    None => DepthRef::Absent,
                }));
            } else {
                refs.extend(std::iter::repeat_n(DepthRef::Hidden, block.face_count()));
            }
        }
    }
    refs
}
