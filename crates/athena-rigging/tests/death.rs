mod common;

use athena_asset_database::AssetDatabase;
use athena_model::{Action, Object, ObjectData, Scene};
use athena_rigging::{create_death_animation, RigError, DEATH_ACTION};
use athena_transform::euler_xyz_degrees_from_quat;
use glam::Vec3;

#[test]
fn death_clip_survives_export_and_import() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("character.glb");
    let output = dir.path().join("out/death.glb");

    let mut base = Action::new("BasePose");
    base.insert_location("Hips", 1.0, Vec3::ZERO);
    common::write_scene(&common::biped_scene(Some(base)), &input);

    create_death_animation(&input, &output).unwrap();

    let mut database = AssetDatabase::<Scene>::new();
    let scene = database.get(&output).unwrap();

    assert_eq!(scene.armatures().len(), 1);
    let armature = scene.armatures()[0];
    assert_eq!(scene.skinned_meshes(armature).len(), 1);

    assert_eq!(scene.action_count(), 1);
    let id = scene.active_action(armature).unwrap();
    let death = scene.action(id).unwrap();
    assert_eq!(death.name, DEATH_ACTION);

    let (start, end) = death.frame_range().unwrap();
    assert!(start.abs() < 1e-3 && (end - 72.0).abs() < 1e-3);

    let hips = death.evaluate("Hips", 72.0);
    assert!((hips.location - Vec3::new(0.0, 22.0, -65.0)).length() < 1e-3);
    assert!((euler_xyz_degrees_from_quat(hips.rotation) - Vec3::new(85.0, 0.0, 0.0)).length() < 1e-2);

    let head = death.evaluate("Head", 36.0);
    assert!((euler_xyz_degrees_from_quat(head.rotation) - Vec3::new(25.0, -3.0, 5.0)).length() < 1e-2);

    let foot = death.evaluate("RightFoot", 54.0);
    assert!((euler_xyz_degrees_from_quat(foot.rotation) - Vec3::new(5.0, 0.0, 5.0)).length() < 1e-2);
}

#[test]
fn character_without_armature_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("prop.glb");
    let output = dir.path().join("death.glb");

    let mut scene = Scene::new();
    scene.add_object(Object::new("Marker", ObjectData::Empty));
    common::write_scene(&scene, &input);

    let err = create_death_animation(&input, &output).unwrap_err();
    assert_eq!(err.downcast_ref::<RigError>(), Some(&RigError::NoArmature));
    assert!(!output.exists());
}

#[test]
fn missing_character_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(create_death_animation(&dir.path().join("missing.glb"), &dir.path().join("out.glb")).is_err());
}
