//! Interleaved vertex layouts and the packers that fill them from a scene.
//!
//! Every object contributes vertices whether it is visible or not; hiding an
//! object only changes the index buffer, so toggling visibility never forces
//! a repack.

use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};
use nalgebra::Point3;

use crate::backend::{AttributeFormat, PrimitiveMode, VertexAttribute};
use crate::colour::{ColourResolver, Rgba};
use crate::scene::{PrimitiveBlock, Scene, SceneObject};

/// Texture coordinates per face corner, used by the shader to draw wireframe
/// edges. Index 0 is the solid pattern; wireframe faces alternate 1 and 2.
const WIREFRAME_TEXCOORDS: [[[u8; 2]; 3]; 3] = [
    [[0, 0], [0, 0], [0, 0]],
    [[0, 0], [0, 255], [255, 0]],
    [[255, 255], [0, 0], [0, 255]],
];

/// A vertex type with a fixed interleaved layout.
pub trait VertexLayout: Pod {
    /// Bytes per vertex.
    const STRIDE: usize = size_of::<Self>();
    /// Primitive mode the layout is drawn with.
    const MODE: PrimitiveMode;
    const ATTRIBUTES: &'static [VertexAttribute];
}

const fn attribute(
    name: &'static str,
    components: u32,
    format: AttributeFormat,
    normalized: bool,
    offset: usize,
) -> VertexAttribute {
    VertexAttribute {
        name,
        components,
        format,
        normalized,
        offset,
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ParticleVertex {
    pub position: [f32; 3],
    pub colour: u32,
    pub size: f32,
    /// Shape selector, `-1` for the renderer default.
    pub point_type: f32,
}

impl VertexLayout for ParticleVertex {
    const MODE: PrimitiveMode = PrimitiveMode::Points;
    const ATTRIBUTES: &'static [VertexAttribute] = &[
        attribute("position", 3, AttributeFormat::F32, false, offset_of!(ParticleVertex, position)),
        attribute("colour", 4, AttributeFormat::U8, true, offset_of!(ParticleVertex, colour)),
        attribute("size", 1, AttributeFormat::F32, false, offset_of!(ParticleVertex, size)),
        attribute("point_type", 1, AttributeFormat::F32, false, offset_of!(ParticleVertex, point_type)),
    ];
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TriangleVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub colour: u32,
    pub object_id: u8,
    pub texcoord: [u8; 2],
    pub _pad: u8,
}

impl VertexLayout for TriangleVertex {
    const MODE: PrimitiveMode = PrimitiveMode::Triangles;
    const ATTRIBUTES: &'static [VertexAttribute] = &[
        attribute("position", 3, AttributeFormat::F32, false, offset_of!(TriangleVertex, position)),
        attribute("normal", 3, AttributeFormat::F32, false, offset_of!(TriangleVertex, normal)),
        attribute("colour", 4, AttributeFormat::U8, true, offset_of!(TriangleVertex, colour)),
        attribute("object_id", 1, AttributeFormat::U8, false, offset_of!(TriangleVertex, object_id)),
        attribute("texcoord", 2, AttributeFormat::U8, true, offset_of!(TriangleVertex, texcoord)),
    ];
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub colour: u32,
}

impl VertexLayout for LineVertex {
    const MODE: PrimitiveMode = PrimitiveMode::Lines;
    const ATTRIBUTES: &'static [VertexAttribute] = &[
        attribute("position", 3, AttributeFormat::F32, false, offset_of!(LineVertex, position)),
        attribute("colour", 4, AttributeFormat::U8, true, offset_of!(LineVertex, colour)),
    ];
}

fn resolver<'a>(
    scene: &'a Scene,
    object: &SceneObject,
    block: &'a PrimitiveBlock,
) -> ColourResolver<'a> {
    ColourResolver::for_block(
        object.colour,
        object.opacity,
        scene.colour_map_of(object),
        block.values.as_ref(),
    )
}

#[inline]
fn position(block: &PrimitiveBlock, vertex: usize) -> [f32; 3] {
    block.vertex(vertex).map(|p| p.coords.into()).unwrap_or_default()
}

/// One particle per point vertex, objects in scene order.
pub fn pack_particles(scene: &Scene) -> Vec<ParticleVertex> {
    let mut out = Vec::new();
    for object in &scene.objects {
        let point_type = if object.point_type > 0 {
            (object.point_type - 1) as f32
        } else {
            -1.0
        };
        for block in &object.points {
            let colours = resolver(scene, object, block);
            let sizes = block.sizes.as_deref().unwrap_or(&[]);
            out.extend((0..block.vertex_count()).map(|i| ParticleVertex {
                position: position(block, i),
                colour: colours.resolve(i),
                size: sizes.get(i).map_or(object.point_size, |s| s * object.point_size),
                point_type,
            }));
        }
    }
    out
}

/// Three vertices per face, unrolled through the index array.
///
/// Also fills each block's centroid cache so the first sort finds it ready.
pub fn pack_triangles(scene: &Scene) -> Vec<TriangleVertex> {
    let mut out = Vec::new();
    for (id, object) in scene.objects.iter().enumerate() {
        let wireframe = usize::from(object.wireframe);
        for block in &object.triangles {
            let colours = resolver(scene, object, block);
            for (face, corners) in block.indices().chunks_exact(3).enumerate() {
                let texcoords = &WIREFRAME_TEXCOORDS[(face % 2 + 1) * wireframe];
                for (&vertex, &texcoord) in corners.iter().zip(texcoords) {
                    let vertex = vertex as usize;
                    out.push(TriangleVertex {
                        position: position(block, vertex),
                        normal: block.normals.as_ref().map_or([0.0; 3], |n| n.get(vertex)),
                        colour: colours.resolve(vertex),
                        object_id: id as u8,
                        texcoord,
                        _pad: 0,
                    });
                }
            }
            block.warm_centroids();
        }
    }
    out
}

/// One vertex per line vertex, objects in scene order.
pub fn pack_lines(scene: &Scene) -> Vec<LineVertex> {
    let mut out = Vec::new();
    for object in &scene.objects {
        for block in &object.lines {
            let colours = resolver(scene, object, block);
            out.extend((0..block.vertex_count()).map(|i| LineVertex {
                position: position(block, i),
                colour: colours.resolve(i),
            }));
        }
    }
    out
}

/// The eight white corners of a box, in the order
/// [`BORDER_INDICES`](crate::index::BORDER_INDICES) expects.
pub fn pack_border(min: Point3<f32>, max: Point3<f32>) -> [LineVertex; 8] {
    let colour = Rgba::WHITE.to_packed();
    let corner = |x: f32, y: f32, z: f32| LineVertex {
        position: [x, y, z],
        colour,
    };
    [
        corner(min.x, min.y, max.z),
        corner(min.x, max.y, max.z),
        corner(max.x, max.y, max.z),
        corner(max.x, min.y, max.z),
        corner(min.x, min.y, min.z),
        corner(min.x, max.y, min.z),
        corner(max.x, max.y, min.z),
        corner(max.x, min.y, min.z),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour::{ColourMap, ColourStop};
    use crate::scene::{Normals, ScalarValues};

    fn make_points(n: usize) -> PrimitiveBlock {
        PrimitiveBlock::new((0..n * 3).map(|i| i as f32).collect())
    }

    fn make_quad() -> PrimitiveBlock {
        PrimitiveBlock::new(vec![
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            1.0, 1.0, 0.0,
        ])
        .with_indices(vec![0, 1, 2, 1, 3, 2])
    }

    #[test]
    fn strides_and_offsets() {
        assert_eq!(ParticleVertex::STRIDE, 24);
        assert_eq!(TriangleVertex::STRIDE, 32);
        assert_eq!(LineVertex::STRIDE, 16);

        let offsets: Vec<usize> = TriangleVertex::ATTRIBUTES.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 28, 29]);
        let offsets: Vec<usize> = ParticleVertex::ATTRIBUTES.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 16, 20]);
    }

    #[test]
    fn packed_bytes_match_element_count() {
        let scene = Scene::default()
            .with_object(SceneObject::new("p").with_points(make_points(5)))
            .with_object(SceneObject::new("t").with_triangles(make_quad()))
            .with_object(SceneObject::new("l").with_lines(make_points(4)));

        let particles = pack_particles(&scene);
        assert_eq!(bytemuck::cast_slice::<_, u8>(&particles).len(), 5 * 24);
        let triangles = pack_triangles(&scene);
        assert_eq!(bytemuck::cast_slice::<_, u8>(&triangles).len(), 6 * 32);
        let lines = pack_lines(&scene);
        assert_eq!(bytemuck::cast_slice::<_, u8>(&lines).len(), 4 * 16);
    }

    #[test]
    fn particle_size_and_type() {
        let mut object =
            SceneObject::new("p").with_points(make_points(3).with_sizes(vec![2.0, 4.0]));
        object.point_size = 1.5;
        object.point_type = 3;
        let scene = Scene::default().with_object(object);

        let packed = pack_particles(&scene);
        let sizes: Vec<f32> = packed.iter().map(|v| v.size).collect();
        assert_eq!(sizes, vec![3.0, 6.0, 1.5]);
        assert!(packed.iter().all(|v| v.point_type == 2.0));

        let scene = Scene::default().with_object(SceneObject::new("d").with_points(make_points(1)));
        assert_eq!(pack_particles(&scene)[0].point_type, -1.0);
    }

    #[test]
    fn triangle_opacity_halves_alpha() {
        let scene = Scene::default().with_object(
            SceneObject::new("t")
                .with_colour(Rgba::new(200, 100, 50, 255))
                .with_opacity(0.5)
                .with_triangles(make_quad()),
        );
        let packed = pack_triangles(&scene);
        assert_eq!(packed.len(), 6);
        for v in &packed {
            assert_eq!(Rgba::from_packed(v.colour), Rgba::new(200, 100, 50, 128));
        }
    }

    #[test]
    fn triangles_unroll_through_indices() {
        let block = make_quad().with_normals(Normals::from_flat(vec![
            0.0, 0.0, 1.0, //
            0.0, 0.0, 2.0, //
            0.0, 0.0, 3.0, //
            0.0, 0.0, 4.0,
        ]));
        let scene = Scene::default()
            .with_object(SceneObject::new("a"))
            .with_object(SceneObject::new("b").with_triangles(block));
        let packed = pack_triangles(&scene);

        let positions: Vec<[f32; 3]> = packed.iter().map(|v| v.position).collect();
        assert_eq!(positions[3], [1.0, 0.0, 0.0]);
        assert_eq!(positions[4], [1.0, 1.0, 0.0]);
        assert_eq!(packed[4].normal, [0.0, 0.0, 4.0]);
        assert!(packed.iter().all(|v| v.object_id == 1));
        assert!(scene.objects[1].triangles[0].has_cached_centroids());
    }

    #[test]
    fn wireframe_texcoords_alternate() {
        let mut object = SceneObject::new("w").with_triangles(make_quad());
        object.wireframe = true;
        let packed = pack_triangles(&Scene::default().with_object(object));
        let first: Vec<[u8; 2]> = packed[..3].iter().map(|v| v.texcoord).collect();
        let second: Vec<[u8; 2]> = packed[3..].iter().map(|v| v.texcoord).collect();
        assert_eq!(first, WIREFRAME_TEXCOORDS[1]);
        assert_eq!(second, WIREFRAME_TEXCOORDS[2]);

        let solid = SceneObject::new("s").with_triangles(make_quad());
        let solid = pack_triangles(&Scene::default().with_object(solid));
        assert!(solid.iter().all(|v| v.texcoord == [0, 0]));
    }

    #[test]
    fn colour_mapped_points() {
        let map = ColourMap::new(vec![
            ColourStop::new(0.0, Rgba::new(0, 0, 0, 255)),
            ColourStop::new(1.0, Rgba::new(255, 255, 255, 255)),
        ]);
        let block = make_points(2).with_values(ScalarValues::new(vec![0.0, 1.0]));
        let scene = Scene::default()
            .with_colour_map(map)
            .with_object(SceneObject::new("p").with_colour_map(0).with_points(block));
        let packed = pack_particles(&scene);
        assert_eq!(Rgba::from_packed(packed[0].colour), Rgba::new(0, 0, 0, 255));
        assert_eq!(Rgba::from_packed(packed[1].colour), Rgba::WHITE);
    }

    #[test]
    fn packed_colours_reach_every_corner() {
        let block =
            make_quad().with_colours(vec![0xff00_00ff, 0xff00_ff00, 0xffff_0000, 0x8000_0000]);
        let scene =
            Scene::default().with_object(SceneObject::new("t").with_opacity(0.5).with_triangles(block));
        let packed = pack_triangles(&scene);
        let colours: Vec<Rgba> = packed.iter().map(|v| Rgba::from_packed(v.colour)).collect();
        // Corners follow the index array 0, 1, 2, 1, 3, 2.
        assert_eq!(colours[0], Rgba::new(255, 0, 0, 128));
        assert_eq!(colours[1], Rgba::new(0, 255, 0, 128));
        assert_eq!(colours[2], Rgba::new(0, 0, 255, 128));
        assert_eq!(colours[4], Rgba::new(0, 0, 0, 64));
    }

    #[test]
    fn hidden_objects_are_still_packed() {
        let mut hidden = SceneObject::new("h").with_points(make_points(4));
        hidden.visible = false;
        let scene = Scene::default().with_object(hidden);
        assert_eq!(pack_particles(&scene).len(), 4);
    }

    #[test]
    fn border_corners() {
        let corners = pack_border(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 2.0, 3.0));
        assert_eq!(corners[0].position, [0.0, 0.0, 3.0]);
        assert_eq!(corners[2].position, [1.0, 2.0, 3.0]);
        assert_eq!(corners[7].position, [1.0, 0.0, 0.0]);
        assert!(corners.iter().all(|c| c.colour == u32::MAX));
    }
}
