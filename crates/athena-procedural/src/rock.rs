use athena_model::{Material, Mesh};
use athena_transform::Transform;
use glam::{Quat, Vec3};
use rand::Rng;

use crate::{primitives, random::RandomExt, GeneratedAsset};

pub fn create_rock(rng: &mut impl Rng) -> GeneratedAsset {
    athena_profiling::profile_function!();

    let mut mesh: Mesh = primitives::icosphere(3, 0.8);
    mesh.materials = vec![
        Material::pbr("Rock", Vec3::new(0.38, 0.36, 0.33), 0.97, 0.0),
        Material::pbr("RockMoss", Vec3::new(0.15, 0.3, 0.1), 0.95, 0.0),
    ];

    for position in &mut mesh.vertex_positions {
        position.x *= rng.uniform(0.75, 1.25);
        position.y *= rng.uniform(0.75, 1.25);
        position.z *= rng.uniform(0.8, 1.2);
        position.x += rng.uniform(-0.03, 0.03);
        position.y += rng.uniform(-0.03, 0.03);
    }

    // Moss grows on faces pointing up, judged before the object is squashed.
    let mossy: Vec<bool> = mesh
        .faces()
        .iter()
        .map(|face| mesh.face_normal(face).z > 0.5)
        .collect();
    for (face, mossy) in mossy.into_iter().enumerate() {
        mesh.set_face_material(face, mossy as u32);
    }

    let transform = Transform::new(
        Vec3::new(0.0, 0.0, 0.3),
        Quat::IDENTITY,
        Vec3::new(1.0, 0.8, 0.5),
    );
    mesh.apply_matrix(transform.get_matrix());

    GeneratedAsset::finalize("Rock", mesh)
}
