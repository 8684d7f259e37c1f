use std::f32::consts::TAU;

use athena_model::{Material, Mesh};
use glam::Vec3;
use rand::Rng;

use crate::{random::RandomExt, GeneratedAsset};

const BLADES: usize = 80;
const BLADE_SEGMENTS: u32 = 4;
const FLOWERS: usize = 5;

pub fn create_grass_patch(rng: &mut impl Rng) -> GeneratedAsset {
    athena_profiling::profile_function!();

    let mut mesh = Mesh::new("GrassPatchMesh");
    let base = mesh.add_material(
        Material::pbr("GrassBase", Vec3::new(0.08, 0.28, 0.04), 0.95, 0.0)
            .with_subsurface(0.2, Vec3::new(0.15, 0.4, 0.08)),
    );
    let mid = mesh.add_material(
        Material::pbr("GrassMid", Vec3::new(0.12, 0.38, 0.06), 0.93, 0.0)
            .with_subsurface(0.15, Vec3::new(0.2, 0.5, 0.1)),
    );
    let tip = mesh.add_material(
        Material::pbr("GrassTip", Vec3::new(0.18, 0.48, 0.1), 0.9, 0.0)
            .with_subsurface(0.1, Vec3::new(0.25, 0.55, 0.12)),
    );
    let dry = mesh.add_material(Material::pbr("GrassDry", Vec3::new(0.35, 0.32, 0.15), 0.96, 0.0));

    for _ in 0..BLADES {
        let x = rng.uniform(-1.5, 1.5);
        let y = rng.uniform(-1.5, 1.5);
        let height = rng.uniform(0.15, 0.55);
        let width = rng.uniform(0.01, 0.035);

        // Wind curve of the blade's centreline.
        let curve_x = rng.uniform(-0.08, 0.08);
        let curve_y = rng.uniform(-0.08, 0.08);
        let bend = rng.uniform(0.05, 0.2);
        let (sin, cos) = rng.uniform(0.0, TAU).sin_cos();

        let mut left = Vec::with_capacity(BLADE_SEGMENTS as usize + 1);
        let mut right = Vec::with_capacity(BLADE_SEGMENTS as usize + 1);
        for s in 0..=BLADE_SEGMENTS {
            let t = s as f32 / BLADE_SEGMENTS as f32;
            let z = t * height;
            let w = width * (1.0 - t * 0.8);
            let cx = curve_x * t * t + bend * t * t * t;
            let cy = curve_y * t * t;

            let bx = x + cos * cx - sin * cy;
            let by = y + sin * cx + cos * cy;
            left.push(mesh.add_vertex(Vec3::new(bx - sin * w, by + cos * w, z)));
            right.push(mesh.add_vertex(Vec3::new(bx + sin * w, by - cos * w, z)));
        }

        for s in 0..BLADE_SEGMENTS as usize {
            let t = s as f32 / BLADE_SEGMENTS as f32;
            let material = if rng.unit() < 0.15 {
                dry
            } else if t < 0.3 {
                base
            } else if t < 0.7 {
                mid
            } else {
                tip
            };
            let _ = mesh.add_face(&[left[s], right[s], right[s + 1], left[s + 1]], material);
        }
    }

    // Tiny flowers between the blades.
    for _ in 0..FLOWERS {
        let fx = rng.uniform(-1.2, 1.2);
        let fy = rng.uniform(-1.2, 1.2);
        let fh = rng.uniform(0.1, 0.2);
        let fw = 0.02;

        let v1 = mesh.add_vertex(Vec3::new(fx - fw, fy, fh));
        let v2 = mesh.add_vertex(Vec3::new(fx + fw, fy, fh));
        let v3 = mesh.add_vertex(Vec3::new(fx, fy - fw, fh));
        let v4 = mesh.add_vertex(Vec3::new(fx, fy + fw, fh));
        let _ = mesh.add_face(&[v1, v3, v2, v4], tip);
    }

    GeneratedAsset::finalize("GrassPatch", mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{seeded, NATURE_SEED};

    #[test]
    fn patch_has_blades_and_flowers() {
        let grass = create_grass_patch(&mut seeded(NATURE_SEED));
        assert_eq!(grass.name, "GrassPatch");
        assert_eq!(grass.mesh.materials.len(), 4);
        assert_eq!(
            grass.mesh.faces().len(),
            BLADES * BLADE_SEGMENTS as usize + FLOWERS
        );

        let bounds = grass.mesh.bounds().unwrap();
        assert!(bounds.max.x <= 2.0 && bounds.min.x >= -2.0);
        assert!(bounds.max.z <= 0.6);
    }

    #[test]
    fn some_blades_are_dry() {
        let grass = create_grass_patch(&mut seeded(NATURE_SEED));
        let dry = grass.mesh.faces().iter().filter(|f| f.material_index == 3).count();
        // Around 15% of 320 segments.
        assert!(dry > 10 && dry < 120, "{} dry segments", dry);
    }
}
