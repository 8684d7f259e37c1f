use athena_model::{Material, Mesh};
use glam::Vec3;

use crate::{primitives, GeneratedAsset};

const SUBDIVISIONS: u32 = 80;
const SIZE: f32 = 200.0;
/// Radius of the flattened play area around the origin.
const FLAT_RADIUS: f32 = 15.0;

/// Layered rolling hills, blended linearly down to flat ground near the origin.
pub fn terrain_height(x: f32, y: f32) -> f32 {
    let mut h = 3.0 * (x * 0.03).sin() * (y * 0.025).cos();
    h += 1.5 * (x * 0.08 + 1.5).sin() * (y * 0.06 + 0.7).cos();
    h += 0.5 * (x * 0.2 + 3.0).sin() * (y * 0.25 + 2.1).cos();
    h += 0.2 * (x * 0.5).sin() * (y * 0.5).sin();

    let distance = (x * x + y * y).sqrt();
    if distance < FLAT_RADIUS {
        h *= distance / FLAT_RADIUS;
    }
    h
}

pub fn create_terrain() -> GeneratedAsset {
    athena_profiling::profile_function!();

    let mut mesh = primitives::grid(SUBDIVISIONS, SUBDIVISIONS, SIZE);
    mesh.materials = vec![Material::pbr("TerrainGround", Vec3::new(0.22, 0.4, 0.12), 0.95, 0.0)];
    for position in &mut mesh.vertex_positions {
        position.z = terrain_height(position.x, position.y);
    }

    GeneratedAsset::finalize("Terrain", mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centre_is_flat() {
        assert_eq!(terrain_height(0.0, 0.0), 0.0);
        assert!(terrain_height(1.0, 1.0).abs() < 0.6);
    }

    #[test]
    fn heights_are_bit_identical_across_runs() {
        let a = create_terrain();
        let b = create_terrain();
        let a: Vec<u32> = a.mesh.vertex_positions.iter().map(|p| p.z.to_bits()).collect();
        let b: Vec<u32> = b.mesh.vertex_positions.iter().map(|p| p.z.to_bits()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn grid_shape() {
        let terrain = create_terrain();
        assert_eq!(terrain.mesh.vertex_positions.len(), 81 * 81);
        assert_eq!(terrain.mesh.faces().len(), 80 * 80);
        let bounds = terrain.mesh.bounds().unwrap();
        assert!((bounds.size().x - SIZE).abs() < 1e-3);
    }
}
