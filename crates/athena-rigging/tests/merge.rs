mod common;

use athena_asset_database::AssetDatabase;
use athena_model::{Action, Mesh, Object, ObjectData, Scene};
use athena_rigging::{merge_animation_files, merge_animations, MergeSource};
use glam::Vec3;

fn key_count_and_ranges(action: &Action) -> (usize, Option<(Vec<f32>, Vec<f32>)>) {
    (action.key_count(), action.locations["Hips"].value_range())
}

fn assert_ranges_close(a: &(Vec<f32>, Vec<f32>), b: &(Vec<f32>, Vec<f32>)) {
    for (x, y) in a.0.iter().chain(&a.1).zip(b.0.iter().chain(&b.1)) {
        assert!((x - y).abs() < 1e-4, "{} != {}", x, y);
    }
}

#[test]
fn clips_become_tracks_on_one_armature() {
    let dir = tempfile::tempdir().unwrap();
    let idle = common::clip("Armature|Breathe", 1..=40, 0.1);
    let walk = common::clip("Armature|Walk", 1..=24, 0.25);
    let expected = [
        ("Idle", key_count_and_ranges(&idle)),
        ("Walk", key_count_and_ranges(&walk)),
    ];

    common::write_scene(&common::biped_scene(Some(idle)), &dir.path().join("idle.glb"));
    common::write_scene(&common::biped_scene(Some(walk)), &dir.path().join("walk.glb"));
    // Armature without any animation.
    common::write_scene(&common::biped_scene(None), &dir.path().join("pose.glb"));
    // Static prop without an armature.
    let mut prop = Scene::new();
    let mut mesh = Mesh::new("Crate");
    mesh.add_vertex(Vec3::ZERO);
    mesh.add_vertex(Vec3::X);
    mesh.add_vertex(Vec3::Y);
    mesh.add_face(&[0, 1, 2], 0).unwrap();
    prop.add_object(Object::new("Crate", ObjectData::Mesh { mesh, armature: None }));
    common::write_scene(&prop, &dir.path().join("prop.glb"));

    let sources = [
        MergeSource::new(dir.path().join("prop.glb"), "IdleShort"),
        MergeSource::new(dir.path().join("idle.glb"), "Idle"),
        MergeSource::new(dir.path().join("pose.glb"), "Pose"),
        MergeSource::new(dir.path().join("walk.glb"), "Walk"),
        MergeSource::new(dir.path().join("run.glb"), "Run"),
    ];

    let merged = merge_animations(&sources).unwrap();
    let armature = merged.armatures()[0];
    let tracks: Vec<&str> = merged.objects[armature]
        .animation()
        .unwrap()
        .nla_tracks
        .iter()
        .map(|track| track.name.as_str())
        .collect();
    assert_eq!(tracks, ["Idle", "Walk"]);
    assert_eq!(merged.active_action(armature), None);
    assert!(merged.objects[armature].selected);
    for mesh in merged.skinned_meshes(armature) {
        assert!(merged.objects[mesh].selected);
    }

    let output = dir.path().join("all.glb");
    merge_animation_files(&sources, &output).unwrap();

    let mut database = AssetDatabase::<Scene>::new();
    let scene = database.get(&output).unwrap();
    assert_eq!(scene.armatures().len(), 1);
    let armature = scene.armatures()[0];
    let meshes = scene
        .objects
        .iter()
        .filter(|o| matches!(o.data, ObjectData::Mesh { .. }))
        .count();
    assert_eq!(meshes, 1);
    assert_eq!(scene.skinned_meshes(armature).len(), 1);

    assert_eq!(scene.action_count(), 2);
    for (label, (key_count, range)) in &expected {
        let id = scene.find_action(label).unwrap();
        let action = scene.action(id).unwrap();
        let (count, imported_range) = key_count_and_ranges(action);
        assert_eq!(count, *key_count, "{}", label);
        assert_ranges_close(range.as_ref().unwrap(), imported_range.as_ref().unwrap());
    }
}
