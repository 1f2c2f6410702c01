//! A generated scene for running the viewer without an input file.

use std::f32::consts::TAU;

use blend_order::scene::{GridSize, grid_indices};
use blend_order::{
    ColourMap, ColourStop, PrimitiveBlock, Rgba, ScalarValues, Scene, SceneObject, SceneOptions,
};

const SURFACE_RESOLUTION: u32 = 48;
const SLICE_RESOLUTION: u32 = 32;

/// Simple seeded random number generator (LCG).
struct Rng {
    state: u64,
}

impl Rng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_f32(&mut self) -> f32 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((self.state >> 40) as f32) / (1u64 << 24) as f32
    }

    fn range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }
}

/// Builds the demo scene inside the `[-1, 1]` cube:
///
/// 1. a colour-mapped point cloud in a ball
/// 2. a translucent rippled surface
/// 3. a wireframe cross-section slice
/// 4. the coordinate axes
pub fn demo_scene(points: usize, seed: u64) -> Scene {
    let mut rng = Rng::new(seed);
    let options = SceneOptions::default().with_bounds([-1.0; 3], [1.0; 3]);

    Scene::new(options)
        .with_colour_map(heat_map())
        .with_object(point_cloud(&mut rng, points))
        .with_object(surface())
        .with_object(slice())
        .with_object(axes())
}

fn heat_map() -> ColourMap {
    ColourMap::new(vec![
        ColourStop::new(0.0, Rgba::new(20, 40, 200, 255)),
        ColourStop::new(0.5, Rgba::new(240, 240, 60, 255)),
        ColourStop::new(1.0, Rgba::new(220, 30, 20, 255)),
    ])
    .with_name("heat")
}

fn point_cloud(rng: &mut Rng, count: usize) -> SceneObject {
    let mut vertices = Vec::with_capacity(count * 3);
    let mut values = Vec::with_capacity(count);
    let mut sizes = Vec::with_capacity(count);

    for _ in 0..count {
        let theta = rng.range(0.0, TAU);
        let z = rng.range(-1.0, 1.0);
        let radius = rng.next_f32().cbrt() * 0.9;
        let ring = (1.0 - z * z).sqrt();
        vertices.extend_from_slice(&[
            radius * ring * theta.cos(),
            radius * ring * theta.sin(),
            radius * z,
        ]);
        values.push(radius);
        sizes.push(rng.range(0.5, 1.5));
    }

    SceneObject::new("cloud")
        .with_colour_map(0)
        .with_opacity(0.6)
        .with_points(
            PrimitiveBlock::new(vertices)
                .with_values(ScalarValues::new(values).with_range(0.0, 0.9))
                .with_sizes(sizes),
        )
}

fn surface() -> SceneObject {
    let n = SURFACE_RESOLUTION;
    let mut vertices = Vec::with_capacity((n * n * 3) as usize);
    let mut heights = Vec::with_capacity((n * n) as usize);
    for j in 0..n {
        for i in 0..n {
            let x = -1.0 + 2.0 * i as f32 / (n - 1) as f32;
            let y = -1.0 + 2.0 * j as f32 / (n - 1) as f32;
            let z = 0.25 * (3.0 * x).sin() * (3.0 * y).cos() - 0.5;
            vertices.extend_from_slice(&[x, y, z]);
            heights.push(z);
        }
    }
    let indices = grid_indices(GridSize {
        width: n,
        height: n,
    });

    SceneObject::new("surface")
        .with_colour_map(0)
        .with_opacity(0.5)
        .with_triangles(
            PrimitiveBlock::new(vertices)
                .with_indices(indices)
                .with_values(ScalarValues::new(heights)),
        )
}

fn slice() -> SceneObject {
    let n = SLICE_RESOLUTION;
    let mut vertices = Vec::with_capacity((n * n * 3) as usize);
    for j in 0..n {
        for i in 0..n {
            let y = -0.8 + 1.6 * i as f32 / (n - 1) as f32;
            let z = -0.8 + 1.6 * j as f32 / (n - 1) as f32;
            vertices.extend_from_slice(&[0.0, y, z]);
        }
    }

    let mut object = SceneObject::new("slice")
        .with_colour(Rgba::new(120, 200, 255, 255))
        .with_opacity(0.35)
        .with_triangles(PrimitiveBlock::cross_section(vertices, n, n));
    object.wireframe = true;
    object
}

fn axes() -> SceneObject {
    #[rustfmt::skip]
    let vertices = vec![
        0.0, 0.0, 0.0,
        1.0, 0.0, 0.0,
        0.0, 1.0, 0.0,
        0.0, 0.0, 1.0,
    ];
    SceneObject::new("axes")
        .with_colour(Rgba::WHITE)
        .with_lines(PrimitiveBlock::new(vertices).with_indices(vec![0, 1, 0, 2, 0, 3]))
}
