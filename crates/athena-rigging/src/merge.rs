use std::path::{Path, PathBuf};

use anyhow::Result;
use athena_asset_database::AssetDatabase;
use athena_model::{write_glb, ActionId, AnimationMode, ExportOptions, Scene};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("none of the animation sources contained an armature")]
    NoArmature,
}

/// An animation file and the clip name its action gets in the merged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSource {
    pub path: PathBuf,
    pub label: String,
}

impl MergeSource {
    pub fn new(path: impl Into<PathBuf>, label: &str) -> Self {
        Self {
            path: path.into(),
            label: label.to_owned(),
        }
    }
}

/// Frame an NLA strip starts at: the first frame of its action, truncated to a whole frame.
fn strip_start(scene: &Scene, action: ActionId) -> f32 {
    scene
        .action(action)
        .and_then(|action| action.frame_range())
        .map_or(0.0, |(start, _)| start.trunc())
}

/// Collects the active action of every source onto the armature of the first source that has
/// one, each renamed to its label and pushed into an NLA track of the same name.
///
/// Only that armature and the meshes skinned to it are left selected.
pub fn merge_animations(sources: &[MergeSource]) -> Result<Scene, MergeError> {
    athena_profiling::profile_function!();

    let mut database = AssetDatabase::<Scene>::new();
    let mut merged: Option<(Scene, usize)> = None;

    for source in sources {
        athena_profiling::profile_scope!("merge source", &source.label);

        if !source.path.exists() {
            log::error!("File not found: {}", source.path.display());
            continue;
        }
        let imported = match database.get(&source.path) {
            Ok(scene) => scene,
            Err(err) => {
                log::error!("Failed to import {}: {:#}", source.path.display(), err);
                continue;
            }
        };
        let Some(&armature) = imported.armatures().last() else {
            log::error!("No armature in {}", source.path.display());
            continue;
        };

        if merged.is_none() {
            let mut base = Scene::clone(&imported);
            if let Some(id) = base.active_action(armature) {
                if let Some(action) = base.action_mut(id) {
                    action.name = source.label.clone();
                }
                let start = strip_start(&base, id);
                if let Some(animation) = base.objects[armature].animation_mut() {
                    animation.push_track(&source.label, id, start);
                    animation.action = None;
                }
            }
            log::info!("Imported base: {}", source.label);
            merged = Some((base, armature));
            continue;
        }

        let Some((base, base_armature)) = merged.as_mut() else {
            continue;
        };
        let Some(mut action) = imported
            .active_action(armature)
            .and_then(|id| imported.action(id))
            .cloned()
        else {
            log::info!("{} has no active action, skipped", source.path.display());
            continue;
        };

        // Channels are keyed by bone name, so the copy drives the base armature as is.
        action.name = source.label.clone();
        let id = base.add_action(action);
        let start = strip_start(base, id);
        if let Some(animation) = base.objects[*base_armature].animation_mut() {
            animation.push_track(&source.label, id, start);
            animation.action = None;
        }
        log::info!("Added animation: {}", source.label);
    }

    let (mut scene, armature) = merged.ok_or(MergeError::NoArmature)?;
    scene.deselect_all();
    scene.objects[armature].selected = true;
    for mesh in scene.skinned_meshes(armature) {
        scene.objects[mesh].selected = true;
    }

    Ok(scene)
}

/// Merges `sources` and exports the base armature, its meshes and one animation per track.
pub fn merge_animation_files(sources: &[MergeSource], output: &Path) -> Result<()> {
    let scene = merge_animations(sources)?;

    let options = ExportOptions {
        use_selection: true,
        apply_transforms: false,
        animation_mode: AnimationMode::NlaTracks,
        force_sampling: false,
        ..Default::default()
    };
    write_glb(&scene, &options, output)
}
