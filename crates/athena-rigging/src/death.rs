use std::{collections::BTreeSet, path::Path};

use anyhow::{Context, Result};
use athena_asset_database::AssetDatabase;
use athena_model::{write_glb, Action, ActionId, Armature, ExportOptions, Scene};
use athena_transform::quat_from_euler_xyz_degrees;
use glam::{Quat, Vec3};
use thiserror::Error;

pub const DEATH_ACTION: &str = "Death";
pub const DEATH_FPS: f32 = 24.0;
/// Three seconds, played once.
pub const DEATH_FRAMES: f32 = 72.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RigError {
    #[error("no armature found in the scene")]
    NoArmature,
}

/// Explicit transform of one bone at one frame. Locations are offsets from the rest pose in
/// the bone's own space, rotations are XYZ Euler angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseKey {
    pub bone: &'static str,
    pub frame: u32,
    pub location: Option<[f32; 3]>,
    pub rotation: Option<[f32; 3]>,
}

const fn rot(bone: &'static str, frame: u32, rotation: [f32; 3]) -> PoseKey {
    PoseKey {
        bone,
        frame,
        location: None,
        rotation: Some(rotation),
    }
}

const fn loc_rot(
    bone: &'static str,
    frame: u32,
    location: [f32; 3],
    rotation: [f32; 3],
) -> PoseKey {
    PoseKey {
        bone,
        frame,
        location: Some(location),
        rotation: Some(rotation),
    }
}

#[rustfmt::skip]
pub const POSE_TABLE: &[PoseKey] = &[
    // Stagger (0-18): clutch the chest and stumble back.
    rot("Hips", 6, [-3.0, 0.0, 0.0]),
    loc_rot("Hips", 12, [0.0, 0.0, -2.0], [-5.0, 2.0, 0.0]),
    loc_rot("Hips", 18, [0.0, 0.0, -5.0], [-8.0, -3.0, 0.0]),

    rot("Spine", 6, [5.0, 0.0, 0.0]),
    rot("Spine", 12, [10.0, 0.0, 2.0]),
    rot("Spine", 18, [15.0, 0.0, -2.0]),

    rot("Spine01", 6, [3.0, 0.0, 0.0]),
    rot("Spine01", 12, [8.0, 0.0, 0.0]),
    rot("Spine01", 18, [12.0, 0.0, 0.0]),

    rot("Spine02", 6, [2.0, 0.0, 0.0]),
    rot("Spine02", 12, [5.0, 0.0, 0.0]),
    rot("Spine02", 18, [8.0, 0.0, 0.0]),

    rot("LeftShoulder", 12, [10.0, 0.0, 20.0]),
    rot("LeftArm", 6, [20.0, 0.0, -30.0]),
    rot("LeftArm", 12, [40.0, 20.0, -50.0]),
    rot("LeftArm", 18, [45.0, 25.0, -55.0]),
    rot("LeftForeArm", 6, [-30.0, 0.0, 0.0]),
    rot("LeftForeArm", 12, [-80.0, 0.0, 0.0]),
    rot("LeftForeArm", 18, [-90.0, 0.0, 0.0]),

    rot("RightShoulder", 12, [5.0, 0.0, -10.0]),
    rot("RightArm", 6, [10.0, 0.0, 15.0]),
    rot("RightArm", 12, [25.0, -10.0, 30.0]),
    rot("RightArm", 18, [15.0, -5.0, 20.0]),
    rot("RightForeArm", 6, [-10.0, 0.0, 0.0]),
    rot("RightForeArm", 12, [-40.0, 0.0, 0.0]),
    rot("RightForeArm", 18, [-30.0, 0.0, 0.0]),

    rot("Head", 6, [-8.0, 0.0, 0.0]),
    rot("Head", 12, [-15.0, 5.0, 0.0]),
    rot("Head", 18, [-10.0, -5.0, 5.0]),

    rot("neck", 6, [-5.0, 0.0, 0.0]),
    rot("neck", 12, [-10.0, 3.0, 0.0]),
    rot("neck", 18, [-5.0, -3.0, 3.0]),

    rot("LeftUpLeg", 12, [5.0, 0.0, -3.0]),
    rot("LeftLeg", 12, [-8.0, 0.0, 0.0]),
    rot("RightUpLeg", 12, [-3.0, 0.0, 3.0]),
    rot("RightLeg", 12, [-5.0, 0.0, 0.0]),

    // Buckle (18-36): the knees give way.
    loc_rot("Hips", 24, [0.0, 0.0, -15.0], [-5.0, 0.0, 3.0]),
    loc_rot("Hips", 30, [0.0, 0.0, -30.0], [5.0, 0.0, 5.0]),
    loc_rot("Hips", 36, [0.0, 0.0, -45.0], [15.0, 0.0, 3.0]),

    rot("LeftUpLeg", 24, [25.0, 0.0, -5.0]),
    rot("LeftUpLeg", 30, [50.0, 0.0, -5.0]),
    rot("LeftUpLeg", 36, [70.0, 0.0, -3.0]),
    rot("LeftLeg", 24, [-30.0, 0.0, 0.0]),
    rot("LeftLeg", 30, [-70.0, 0.0, 0.0]),
    rot("LeftLeg", 36, [-100.0, 0.0, 0.0]),

    rot("RightUpLeg", 24, [20.0, 0.0, 5.0]),
    rot("RightUpLeg", 30, [45.0, 0.0, 5.0]),
    rot("RightUpLeg", 36, [65.0, 0.0, 3.0]),
    rot("RightLeg", 24, [-25.0, 0.0, 0.0]),
    rot("RightLeg", 30, [-65.0, 0.0, 0.0]),
    rot("RightLeg", 36, [-95.0, 0.0, 0.0]),

    rot("Spine", 24, [20.0, 0.0, 0.0]),
    rot("Spine", 30, [30.0, 2.0, 0.0]),
    rot("Spine", 36, [35.0, 3.0, 0.0]),

    rot("Spine01", 24, [15.0, 0.0, 0.0]),
    rot("Spine01", 30, [20.0, 0.0, 0.0]),
    rot("Spine01", 36, [25.0, 0.0, 0.0]),

    rot("Spine02", 24, [10.0, 0.0, 0.0]),
    rot("Spine02", 30, [12.0, 0.0, 0.0]),
    rot("Spine02", 36, [15.0, 0.0, 0.0]),

    rot("LeftArm", 24, [30.0, 15.0, -40.0]),
    rot("LeftArm", 30, [15.0, 5.0, -20.0]),
    rot("LeftArm", 36, [5.0, 0.0, -10.0]),
    rot("LeftForeArm", 24, [-70.0, 0.0, 0.0]),
    rot("LeftForeArm", 30, [-40.0, 0.0, 0.0]),
    rot("LeftForeArm", 36, [-20.0, 0.0, 0.0]),

    rot("RightArm", 24, [10.0, -3.0, 15.0]),
    rot("RightArm", 30, [5.0, 0.0, 10.0]),
    rot("RightArm", 36, [0.0, 0.0, 5.0]),
    rot("RightForeArm", 24, [-20.0, 0.0, 0.0]),
    rot("RightForeArm", 30, [-10.0, 0.0, 0.0]),
    rot("RightForeArm", 36, [-5.0, 0.0, 0.0]),

    rot("Head", 24, [5.0, 0.0, 3.0]),
    rot("Head", 30, [15.0, 0.0, 5.0]),
    rot("Head", 36, [25.0, -3.0, 5.0]),

    rot("neck", 24, [5.0, 0.0, 2.0]),
    rot("neck", 30, [10.0, 0.0, 3.0]),
    rot("neck", 36, [15.0, -2.0, 3.0]),

    // Fall (36-54): face down onto the ground.
    loc_rot("Hips", 42, [0.0, 5.0, -55.0], [30.0, 0.0, 5.0]),
    loc_rot("Hips", 48, [0.0, 12.0, -60.0], [55.0, 0.0, 3.0]),
    loc_rot("Hips", 54, [0.0, 18.0, -63.0], [75.0, 0.0, 2.0]),

    rot("LeftUpLeg", 42, [50.0, 0.0, -3.0]),
    rot("LeftUpLeg", 48, [30.0, 0.0, -2.0]),
    rot("LeftUpLeg", 54, [10.0, 0.0, -2.0]),
    rot("LeftLeg", 42, [-60.0, 0.0, 0.0]),
    rot("LeftLeg", 48, [-30.0, 0.0, 0.0]),
    rot("LeftLeg", 54, [-10.0, 0.0, 0.0]),

    rot("RightUpLeg", 42, [45.0, 0.0, 3.0]),
    rot("RightUpLeg", 48, [25.0, 0.0, 2.0]),
    rot("RightUpLeg", 54, [8.0, 0.0, 2.0]),
    rot("RightLeg", 42, [-55.0, 0.0, 0.0]),
    rot("RightLeg", 48, [-25.0, 0.0, 0.0]),
    rot("RightLeg", 54, [-8.0, 0.0, 0.0]),

    rot("Spine", 42, [25.0, 2.0, 0.0]),
    rot("Spine", 48, [15.0, 0.0, 0.0]),
    rot("Spine", 54, [5.0, 0.0, 0.0]),

    rot("Spine01", 42, [15.0, 0.0, 0.0]),
    rot("Spine01", 48, [8.0, 0.0, 0.0]),
    rot("Spine01", 54, [3.0, 0.0, 0.0]),

    rot("LeftArm", 42, [0.0, 0.0, -40.0]),
    rot("LeftArm", 48, [-10.0, 0.0, -60.0]),
    rot("LeftArm", 54, [-15.0, 0.0, -70.0]),
    rot("LeftForeArm", 42, [-15.0, 0.0, 0.0]),
    rot("LeftForeArm", 48, [-10.0, 0.0, 0.0]),
    rot("LeftForeArm", 54, [-5.0, 0.0, 0.0]),

    rot("RightArm", 42, [0.0, 0.0, 40.0]),
    rot("RightArm", 48, [-10.0, 0.0, 60.0]),
    rot("RightArm", 54, [-15.0, 0.0, 70.0]),
    rot("RightForeArm", 42, [-15.0, 0.0, 0.0]),
    rot("RightForeArm", 48, [-10.0, 0.0, 0.0]),
    rot("RightForeArm", 54, [-5.0, 0.0, 0.0]),

    rot("Head", 42, [20.0, -2.0, 5.0]),
    rot("Head", 48, [10.0, 0.0, 3.0]),
    rot("Head", 54, [5.0, 0.0, 0.0]),

    rot("neck", 42, [10.0, 0.0, 2.0]),
    rot("neck", 48, [5.0, 0.0, 0.0]),
    rot("neck", 54, [3.0, 0.0, 0.0]),

    // Settle (54-72): final resting pose.
    loc_rot("Hips", 60, [0.0, 20.0, -64.0], [82.0, 0.0, 1.0]),
    loc_rot("Hips", 72, [0.0, 22.0, -65.0], [85.0, 0.0, 0.0]),

    rot("LeftUpLeg", 60, [5.0, 0.0, -3.0]),
    rot("LeftUpLeg", 72, [3.0, 0.0, -5.0]),
    rot("LeftLeg", 60, [-5.0, 0.0, 0.0]),
    rot("LeftLeg", 72, [-3.0, 0.0, 0.0]),

    rot("RightUpLeg", 60, [3.0, 0.0, 3.0]),
    rot("RightUpLeg", 72, [2.0, 0.0, 5.0]),
    rot("RightLeg", 60, [-3.0, 0.0, 0.0]),
    rot("RightLeg", 72, [-2.0, 0.0, 0.0]),

    rot("Spine", 60, [3.0, 0.0, 0.0]),
    rot("Spine", 72, [2.0, 0.0, 0.0]),
    rot("Spine01", 60, [2.0, 0.0, 0.0]),
    rot("Spine01", 72, [1.0, 0.0, 0.0]),
    rot("Spine02", 60, [2.0, 0.0, 0.0]),
    rot("Spine02", 72, [1.0, 0.0, 0.0]),

    rot("LeftArm", 60, [-18.0, 0.0, -75.0]),
    rot("LeftArm", 72, [-20.0, 0.0, -80.0]),
    rot("LeftForeArm", 60, [-3.0, 0.0, 0.0]),
    rot("LeftForeArm", 72, [-2.0, 0.0, 0.0]),

    rot("RightArm", 60, [-18.0, 0.0, 75.0]),
    rot("RightArm", 72, [-20.0, 0.0, 80.0]),
    rot("RightForeArm", 60, [-3.0, 0.0, 0.0]),
    rot("RightForeArm", 72, [-2.0, 0.0, 0.0]),

    rot("Head", 60, [3.0, 0.0, -5.0]),
    rot("Head", 72, [2.0, 0.0, -8.0]),
    rot("neck", 60, [2.0, 0.0, -3.0]),
    rot("neck", 72, [1.0, 0.0, -5.0]),

    // Feet relax.
    rot("LeftFoot", 36, [-10.0, 0.0, 0.0]),
    rot("LeftFoot", 54, [5.0, 0.0, -5.0]),
    rot("LeftFoot", 72, [10.0, 0.0, -8.0]),

    rot("RightFoot", 36, [-8.0, 0.0, 0.0]),
    rot("RightFoot", 54, [5.0, 0.0, 5.0]),
    rot("RightFoot", 72, [10.0, 0.0, 8.0]),
];

/// Writes the keys of `key` into `action`. Returns false, writing nothing, when the armature
/// has no bone of that name.
pub fn set_key(action: &mut Action, armature: &Armature, key: &PoseKey) -> bool {
    if armature.find_bone(key.bone).is_none() {
        return false;
    }

    let frame = key.frame as f32;
    if let Some(location) = key.location {
        action.insert_location(key.bone, frame, Vec3::from(location));
    }
    if let Some(rotation) = key.rotation {
        action.insert_rotation(
            key.bone,
            frame,
            quat_from_euler_xyz_degrees(Vec3::from(rotation)),
        );
    }
    true
}

fn build_death_action(armature: &Armature) -> Action {
    let mut action = Action::new(DEATH_ACTION);

    // Standing pose.
    for bone in &armature.bones {
        action.insert_location(&bone.name, 0.0, Vec3::ZERO);
        action.insert_rotation(&bone.name, 0.0, Quat::IDENTITY);
    }

    let mut skipped = BTreeSet::new();
    for key in POSE_TABLE {
        if !set_key(&mut action, armature, key) {
            skipped.insert(key.bone);
        }
    }
    for bone in skipped {
        log::warn!("Armature has no bone {}, its keys were skipped", bone);
    }

    action.manual_frame_range = Some((0.0, DEATH_FRAMES));
    action
}

/// Keys the Death clip on the first armature of `scene` and makes it the only action left.
pub fn author_death_clip(scene: &mut Scene) -> Result<ActionId, RigError> {
    athena_profiling::profile_function!();

    let object = *scene.armatures().first().ok_or(RigError::NoArmature)?;
    let action = build_death_action(
        scene.objects[object]
            .armature()
            .ok_or(RigError::NoArmature)?,
    );
    log::info!(
        "Authored {} on {}: {} channels, {} keys",
        DEATH_ACTION,
        scene.objects[object].name,
        action.channel_count(),
        action.key_count()
    );

    scene.fps = DEATH_FPS;
    scene.frame_start = 0.0;
    scene.frame_end = DEATH_FRAMES;

    let id = scene.add_action(action);
    scene.retain_actions(|other, _| other == id);
    if let Some(animation) = scene.objects[object].animation_mut() {
        animation.action = Some(id);
    }

    Ok(id)
}

/// Imports the character at `input`, authors its Death clip and exports it to `output`.
pub fn create_death_animation(input: &Path, output: &Path) -> Result<()> {
    athena_profiling::profile_function!();

    let mut database = AssetDatabase::<Scene>::new();
    let mut scene = Scene::clone(&database.get(input)?);

    author_death_clip(&mut scene)
        .with_context(|| format!("author {} clip for {}", DEATH_ACTION, input.display()))?;

    write_glb(&scene, &ExportOptions::default(), output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use athena_model::{AnimationData, Bone, Object, ObjectData};
    use athena_transform::{euler_xyz_degrees_from_quat, Transform};

    const BONES: &[&str] = &[
        "Hips",
        "Spine",
        "Spine01",
        "Spine02",
        "neck",
        "Head",
        "LeftShoulder",
        "LeftArm",
        "LeftForeArm",
        "RightShoulder",
        "RightArm",
        "RightForeArm",
        "LeftUpLeg",
        "LeftLeg",
        "LeftFoot",
        "RightUpLeg",
        "RightLeg",
        "RightFoot",
    ];

    fn biped() -> Armature {
        let mut armature = Armature::new();
        for (i, name) in BONES.iter().enumerate() {
            let parent = if i == 0 { None } else { Some(0) };
            armature.add_bone(Bone::new(
                name,
                parent,
                Transform::from_translation(Vec3::new(0.0, 0.1 * i as f32, 0.0)),
            ));
        }
        armature
    }

    fn rigged_scene(armature: Armature) -> Scene {
        let mut scene = Scene::new();
        let base = scene.add_action(Action::new("BasePose"));
        scene.add_action(Action::new("Leftover"));
        scene.add_object(Object::new(
            "Armature",
            ObjectData::Armature {
                armature,
                animation: AnimationData {
                    action: Some(base),
                    nla_tracks: Vec::new(),
                },
            },
        ));
        scene
    }

    #[test]
    fn death_is_the_only_action_left() {
        let mut scene = rigged_scene(biped());
        let id = author_death_clip(&mut scene).unwrap();

        assert_eq!(scene.action_count(), 1);
        assert_eq!(scene.active_action(0), Some(id));

        let death = scene.action(id).unwrap();
        assert_eq!(death.name, DEATH_ACTION);
        assert_eq!(death.frame_range(), Some((0.0, 72.0)));
        assert_eq!(death.manual_frame_range, Some((0.0, 72.0)));
        assert_eq!(scene.fps, 24.0);
    }

    #[test]
    fn authored_rotations_match_the_table() {
        let mut scene = rigged_scene(biped());
        let id = author_death_clip(&mut scene).unwrap();
        let death = scene.action(id).unwrap();

        for key in POSE_TABLE {
            let frame = key.frame as f32;
            if let Some(expected) = key.rotation {
                let rotation = death.rotations[key.bone].evaluate(frame).unwrap();
                let degrees = euler_xyz_degrees_from_quat(rotation);
                assert!(
                    (degrees - Vec3::from(expected)).length() < 1e-3,
                    "{} @ {}: {} != {:?}",
                    key.bone,
                    key.frame,
                    degrees,
                    expected
                );
            }
            if let Some(expected) = key.location {
                let location = death.locations[key.bone].evaluate(frame).unwrap();
                assert_eq!(location, Vec3::from(expected));
            }
        }

        // Every bone starts from the standing pose.
        for bone in BONES {
            assert_eq!(death.evaluate(bone, 0.0).rotation, Quat::IDENTITY);
            assert_eq!(death.evaluate(bone, 0.0).location, Vec3::ZERO);
        }
    }

    #[test]
    fn unknown_bone_writes_no_key() {
        let armature = biped();
        let mut action = Action::new(DEATH_ACTION);
        let tail = rot("Tail", 12, [10.0, 0.0, 0.0]);

        assert!(!set_key(&mut action, &armature, &tail));
        assert!(action.is_empty());
        assert!(set_key(&mut action, &armature, &POSE_TABLE[0]));
        assert_eq!(action.key_count(), 1);
    }

    #[test]
    fn missing_bones_are_skipped() {
        let mut armature = Armature::new();
        armature.add_bone(Bone::new("Hips", None, Transform::IDENTITY));
        let mut scene = rigged_scene(armature);

        let id = author_death_clip(&mut scene).unwrap();
        assert_eq!(scene.action(id).unwrap().bones(), vec!["Hips"]);
    }

    #[test]
    fn scene_without_armature_is_an_error() {
        let mut scene = Scene::new();
        scene.add_object(Object::new("Empty", ObjectData::Empty));
        assert_eq!(author_death_clip(&mut scene), Err(RigError::NoArmature));
        assert_eq!(scene.action_count(), 0);
    }
}
