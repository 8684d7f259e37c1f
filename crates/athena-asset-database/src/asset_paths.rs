use std::path::{Path, PathBuf};

pub const ENEMY_CREATURE: &str = "::models/enemy_creature.glb";

pub const OAK_TREE: &str = "::models/nature/oak_tree.glb";
pub const PINE_TREE: &str = "::models/nature/pine_tree.glb";
pub const BIRCH_TREE: &str = "::models/nature/birch_tree.glb";
pub const GRASS_PATCH: &str = "::models/nature/grass_patch.glb";
pub const TERRAIN: &str = "::models/nature/terrain.glb";
pub const ROCK: &str = "::models/nature/rock.glb";

pub const BIPED_CHARACTER: &str = "::models/Meshy_AI_biped/Meshy_AI_Character_output.glb";
pub const BIPED_DEATH: &str = "::models/Meshy_AI_biped/Meshy_AI_Animation_Death.glb";
pub const BIPED_ALL_ANIMATIONS: &str =
    "::models/Meshy_AI_biped/Meshy_AI_Character_AllAnimations.glb";

/// Animation sources merged into [`BIPED_ALL_ANIMATIONS`], with the clip name each one gets.
pub const BIPED_ANIMATION_SOURCES: &[(&str, &str)] = &[
    (
        "::models/Meshy_AI_biped/Meshy_AI_Animation_Long_Breathe_and_Look_Around_withSkin.glb",
        "Idle",
    ),
    (
        "::models/Meshy_AI_biped/Meshy_AI_Animation_Short_Breathe_and_Look_Around_withSkin.glb",
        "IdleShort",
    ),
    (
        "::models/Meshy_AI_biped/Meshy_AI_Animation_Walking_withSkin.glb",
        "Walk",
    ),
    (
        "::models/Meshy_AI_biped/Meshy_AI_Animation_Running_withSkin.glb",
        "Run",
    ),
];

/// Resolves `::`-prefixed paths against the assets directory; any other path is used as is.
pub fn resolve_asset_path(path: &str, assets_dir: &Path) -> PathBuf {
    match path.strip_prefix("::") {
        Some(relative) => assets_dir.join(relative),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_paths_are_relative_to_assets_dir() {
        assert_eq!(
            resolve_asset_path(ROCK, Path::new("assets")),
            Path::new("assets/models/nature/rock.glb")
        );
        assert_eq!(
            resolve_asset_path("/tmp/out.glb", Path::new("assets")),
            Path::new("/tmp/out.glb")
        );
    }
}
