#![allow(dead_code)]

use std::path::Path;

use athena_model::{
    write_glb, Action, AnimationData, Armature, Bone, ExportOptions, Mesh, Object, ObjectData,
    Scene,
};
use athena_transform::Transform;
use glam::Vec3;

/// Small biped: Hips at the root with Spine, Head and both feet.
pub fn biped_armature() -> Armature {
    let mut armature = Armature::new();
    let hips = armature.add_bone(Bone::new(
        "Hips",
        None,
        Transform::from_translation(Vec3::new(0.0, 1.0, 0.0)),
    ));
    let spine = armature.add_bone(Bone::new(
        "Spine",
        Some(hips),
        Transform::from_translation(Vec3::new(0.0, 0.2, 0.0)),
    ));
    armature.add_bone(Bone::new(
        "Head",
        Some(spine),
        Transform::from_translation(Vec3::new(0.0, 0.5, 0.0)),
    ));
    armature.add_bone(Bone::new(
        "LeftFoot",
        Some(hips),
        Transform::from_translation(Vec3::new(0.1, -0.9, 0.0)),
    ));
    armature.add_bone(Bone::new(
        "RightFoot",
        Some(hips),
        Transform::from_translation(Vec3::new(-0.1, -0.9, 0.0)),
    ));
    armature
}

fn skinned_body() -> Mesh {
    let mut mesh = Mesh::new("Body");
    mesh.add_vertex(Vec3::new(-0.2, 0.0, 0.0));
    mesh.add_vertex(Vec3::new(0.2, 0.0, 0.0));
    mesh.add_vertex(Vec3::new(0.0, 1.7, 0.0));
    mesh.add_face(&[0, 1, 2], 0).unwrap();
    mesh.vertex_joints = vec![[0, 0, 0, 0], [0, 0, 0, 0], [2, 0, 0, 0]];
    mesh.vertex_weights = vec![[1.0, 0.0, 0.0, 0.0]; 3];
    mesh.generate_normals();
    mesh
}

/// Armature plus one skinned mesh, with `action` as the active action when given.
pub fn biped_scene(action: Option<Action>) -> Scene {
    let mut scene = Scene::new();
    let mut animation = AnimationData::default();
    if let Some(action) = action {
        animation.action = Some(scene.add_action(action));
    }

    let rig = scene.add_object(Object::new(
        "Armature",
        ObjectData::Armature {
            armature: biped_armature(),
            animation,
        },
    ));
    scene.add_object(Object::new(
        "Body",
        ObjectData::Mesh {
            mesh: skinned_body(),
            armature: Some(rig),
        },
    ));
    scene
}

/// A clip keying the Hips location on every frame of `frames` and the Head rotation at both ends.
pub fn clip(name: &str, frames: std::ops::RangeInclusive<u32>, stride: f32) -> Action {
    let mut action = Action::new(name);
    let (first, last) = (*frames.start() as f32, *frames.end() as f32);
    for frame in frames {
        let f = frame as f32;
        action.insert_location("Hips", f, Vec3::new(0.0, (f * stride).sin() * 0.05, f * stride));
    }
    action.insert_rotation(
        "Head",
        first,
        athena_transform::quat_from_euler_xyz_degrees(Vec3::new(-5.0, 0.0, 0.0)),
    );
    action.insert_rotation(
        "Head",
        last,
        athena_transform::quat_from_euler_xyz_degrees(Vec3::new(5.0, 10.0, 0.0)),
    );
    action
}

pub fn write_scene(scene: &Scene, path: &Path) {
    write_glb(scene, &ExportOptions::default(), path).unwrap();
}
