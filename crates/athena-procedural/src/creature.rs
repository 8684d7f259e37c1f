use athena_model::{Material, Mesh};
use athena_transform::Transform;
use glam::Vec3;

use crate::{primitives, GeneratedAsset};

pub const CREATURE_NAME: &str = "EnemyCreature";

struct Palette {
    body: Material,
    belly: Material,
    eyes: Material,
    horns: Material,
    claws: Material,
    teeth: Material,
}

impl Palette {
    fn new() -> Self {
        Self {
            body: Material::pbr("EnemyBody", Vec3::new(0.15, 0.22, 0.12), 0.9, 0.0),
            belly: Material::pbr("EnemyBelly", Vec3::new(0.25, 0.18, 0.12), 0.85, 0.0),
            eyes: Material::pbr("EnemyEyes", Vec3::new(0.9, 0.1, 0.05), 0.3, 0.0)
                .with_emission(Vec3::new(1.0, 0.15, 0.05), 3.0),
            horns: Material::pbr("EnemyHorns", Vec3::new(0.35, 0.28, 0.18), 0.6, 0.1),
            claws: Material::pbr("EnemyClaws", Vec3::new(0.2, 0.15, 0.1), 0.5, 0.2),
            teeth: Material::pbr("EnemyTeeth", Vec3::new(0.85, 0.82, 0.7), 0.4, 0.0),
        }
    }
}

/// Places a primitive: assigns its material and bakes location, XYZ Euler degrees and scale.
fn place(mut mesh: Mesh, material: &Material, location: Vec3, rotation: Vec3, scale: Vec3) -> Mesh {
    mesh.materials = vec![material.clone()];
    mesh.apply_matrix(Transform::from_euler_degrees(location, rotation, scale).get_matrix());
    mesh
}

fn sculpt(mesh: &mut Mesh, deform: impl Fn(Vec3) -> Vec3) {
    for position in &mut mesh.vertex_positions {
        *position = deform(*position);
    }
}

struct Builder {
    mesh: Mesh,
}

impl Builder {
    fn add(&mut self, part: Mesh) {
        self.mesh.join(&part);
    }
}

pub fn create_enemy_creature() -> GeneratedAsset {
    athena_profiling::profile_function!();

    let palette = Palette::new();
    let mut creature = Builder {
        mesh: Mesh::new(CREATURE_NAME),
    };

    // Torso, wider at the chest and narrow at the hips.
    let mut body = primitives::uv_sphere(24, 16, 0.55);
    sculpt(&mut body, |p| {
        if p.z > 0.3 {
            Vec3::new(p.x * 1.15, p.y * 1.1, p.z)
        } else if p.z < -0.2 {
            Vec3::new(p.x * 0.85, p.y, p.z)
        } else {
            p
        }
    });
    creature.add(place(
        body,
        &palette.body,
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::ZERO,
        Vec3::new(1.0, 0.85, 1.1),
    ));

    creature.add(place(
        primitives::uv_sphere(16, 12, 0.38),
        &palette.belly,
        Vec3::new(0.0, -0.12, 0.85),
        Vec3::ZERO,
        Vec3::new(0.9, 0.75, 0.85),
    ));

    // Head with a heavy jaw line and a pronounced brow.
    let mut head = primitives::uv_sphere(20, 14, 0.32);
    sculpt(&mut head, |p| {
        if p.z < 0.0 {
            Vec3::new(p.x * 1.2, p.y, p.z * 1.1)
        } else if p.z > 0.15 && p.y < -0.1 {
            Vec3::new(p.x, p.y - 0.06, p.z + 0.04)
        } else {
            p
        }
    });
    creature.add(place(
        head,
        &palette.body,
        Vec3::new(0.0, 0.0, 1.7),
        Vec3::ZERO,
        Vec3::new(1.1, 1.0, 0.95),
    ));

    for side in [-1.0_f32, 1.0] {
        creature.add(place(
            primitives::uv_sphere(12, 8, 0.06),
            &palette.eyes,
            Vec3::new(side * 0.13, -0.26, 1.75),
            Vec3::ZERO,
            Vec3::new(1.3, 0.7, 0.9),
        ));
        creature.add(place(
            primitives::cone(12, 0.07, 0.01, 0.4),
            &palette.horns,
            Vec3::new(side * 0.2, -0.05, 2.0),
            Vec3::new(-30.0, side * 25.0, 0.0),
            Vec3::ONE,
        ));
    }

    creature.add(place(
        primitives::cube(0.2),
        &palette.body,
        Vec3::new(0.0, -0.28, 1.6),
        Vec3::ZERO,
        Vec3::new(1.4, 0.5, 0.4),
    ));
    for i in 0..5 {
        creature.add(place(
            primitives::cone(6, 0.015, 0.003, 0.05),
            &palette.teeth,
            Vec3::new(-0.1 + i as f32 * 0.05, -0.32, 1.56),
            Vec3::new(180.0, 0.0, 0.0),
            Vec3::ONE,
        ));
    }

    for side in [-1.0_f32, 1.0] {
        add_arm(&mut creature, &palette, side);
        add_leg(&mut creature, &palette, side);
    }

    for i in 0..8 {
        let t = i as f32 / 7.0;
        creature.add(place(
            primitives::uv_sphere(8, 6, 0.08 * (1.0 - t * 0.7)),
            &palette.body,
            Vec3::new(0.0, 0.15 + i as f32 * 0.12, 0.7 - i as f32 * 0.05),
            Vec3::ZERO,
            Vec3::new(0.8, 1.2, 0.8),
        ));
    }
    creature.add(place(
        primitives::cone(8, 0.04, 0.005, 0.15),
        &palette.claws,
        Vec3::new(0.0, 0.15 + 8.0 * 0.12, 0.7 - 8.0 * 0.05),
        Vec3::new(75.0, 0.0, 0.0),
        Vec3::ONE,
    ));

    for i in 0..6 {
        creature.add(place(
            primitives::cone(6, 0.04, 0.008, 0.12),
            &palette.horns,
            Vec3::new(0.0, 0.18, 1.5 - i as f32 * 0.12),
            Vec3::new(-60.0, 0.0, 0.0),
            Vec3::ONE,
        ));
    }

    log::info!(
        "Built {}: {} vertices, {} faces",
        CREATURE_NAME,
        creature.mesh.vertex_positions.len(),
        creature.mesh.faces().len()
    );
    GeneratedAsset::finalize(CREATURE_NAME, creature.mesh)
}

fn add_arm(creature: &mut Builder, palette: &Palette, side: f32) {
    creature.add(place(
        primitives::cylinder(12, 0.12, 0.5),
        &palette.body,
        Vec3::new(side * 0.65, 0.0, 1.2),
        Vec3::new(0.0, 0.0, side * 25.0),
        Vec3::new(1.0, 0.9, 1.0),
    ));
    creature.add(place(
        primitives::cylinder(12, 0.1, 0.45),
        &palette.body,
        Vec3::new(side * 0.85, 0.0, 0.78),
        Vec3::new(0.0, 0.0, side * 10.0),
        Vec3::ONE,
    ));
    creature.add(place(
        primitives::uv_sphere(10, 8, 0.14),
        &palette.body,
        Vec3::new(side * 0.55, 0.0, 1.4),
        Vec3::ZERO,
        Vec3::new(1.2, 0.9, 0.8),
    ));

    for c in 0..3 {
        let angle = (-20.0 + c as f32 * 20.0).to_radians();
        creature.add(place(
            primitives::cone(8, 0.025, 0.005, 0.12),
            &palette.claws,
            Vec3::new(
                side * 0.9 + angle.sin() * 0.06 * side,
                -0.04,
                0.5 + c as f32 * 0.02,
            ),
            Vec3::new(70.0, 0.0, side * 10.0),
            Vec3::ONE,
        ));
    }
}

fn add_leg(creature: &mut Builder, palette: &Palette, side: f32) {
    creature.add(place(
        primitives::cylinder(12, 0.14, 0.45),
        &palette.body,
        Vec3::new(side * 0.25, 0.0, 0.45),
        Vec3::ZERO,
        Vec3::new(1.1, 0.95, 1.0),
    ));
    creature.add(place(
        primitives::cylinder(12, 0.1, 0.4),
        &palette.body,
        Vec3::new(side * 0.25, 0.02, 0.1),
        Vec3::ZERO,
        Vec3::ONE,
    ));
    creature.add(place(
        primitives::cube(0.15),
        &palette.body,
        Vec3::new(side * 0.25, -0.08, -0.08),
        Vec3::ZERO,
        Vec3::new(1.0, 1.8, 0.5),
    ));

    for tc in 0..2 {
        creature.add(place(
            primitives::cone(6, 0.02, 0.005, 0.08),
            &palette.claws,
            Vec3::new(side * 0.25 + (tc as f32 - 0.5) * 0.06, -0.2, -0.1),
            Vec3::new(80.0, 0.0, 0.0),
            Vec3::ONE,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creature_is_one_grounded_mesh_with_six_materials() {
        let asset = create_enemy_creature();
        assert_eq!(asset.name, CREATURE_NAME);

        let names: Vec<&str> = asset.mesh.materials.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names.len(), 6);
        for name in [
            "EnemyBody",
            "EnemyBelly",
            "EnemyEyes",
            "EnemyHorns",
            "EnemyClaws",
            "EnemyTeeth",
        ] {
            assert!(names.contains(&name), "missing {}", name);
        }

        let bounds = asset.mesh.bounds().unwrap();
        assert!(bounds.min.z.abs() < 1e-5);
        assert!(asset.mesh.has_normals());

        let eyes = asset
            .mesh
            .materials
            .iter()
            .find(|m| m.name == "EnemyEyes")
            .unwrap();
        assert_eq!(eyes.emission_strength, 3.0);
    }

    #[test]
    fn creature_is_deterministic() {
        let a = create_enemy_creature();
        let b = create_enemy_creature();
        assert_eq!(a.mesh.vertex_positions, b.mesh.vertex_positions);
    }
}
