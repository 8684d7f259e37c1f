use athena_model::{Mesh, Object, ObjectData, Scene};

pub mod creature;
pub mod grass;
pub mod primitives;
pub mod random;
pub mod rock;
pub mod terrain;
pub mod trees;

pub use creature::create_enemy_creature;
pub use grass::create_grass_patch;
pub use random::{seeded, RandomExt, NATURE_SEED, TREE_SEED};
pub use rock::create_rock;
pub use terrain::{create_terrain, terrain_height};
pub use trees::{create_birch_tree, create_oak_tree, create_pine_tree, grow_branch};

/// A single generated mesh object, still in the Z-up authoring frame.
#[derive(Debug, Clone)]
pub struct GeneratedAsset {
    pub name: String,
    pub mesh: Mesh,
}

impl GeneratedAsset {
    /// Smooth shades the mesh and rests it on the ground plane.
    pub fn finalize(name: &str, mut mesh: Mesh) -> Self {
        athena_profiling::profile_function!();

        mesh.name = name.to_owned();
        mesh.generate_normals();
        mesh.snap_to_ground();

        Self {
            name: name.to_owned(),
            mesh,
        }
    }

    /// Wraps the asset in a fresh scene as the only, selected, object.
    pub fn into_scene(self) -> Scene {
        let mut mesh = self.mesh;
        mesh.convert_z_up_to_y_up();

        let mut object = Object::new(
            &self.name,
            ObjectData::Mesh {
                mesh,
                armature: None,
            },
        );
        object.selected = true;

        let mut scene = Scene::new();
        scene.add_object(object);
        scene
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_generated_asset_rests_on_the_ground() {
        let mut trees = seeded(TREE_SEED);
        let mut nature = seeded(NATURE_SEED);
        let assets = [
            create_enemy_creature(),
            create_oak_tree(&mut trees),
            create_pine_tree(&mut trees),
            create_birch_tree(&mut trees),
            create_grass_patch(&mut nature),
            create_terrain(),
            create_rock(&mut nature),
        ];

        for asset in &assets {
            let bounds = asset.mesh.bounds().unwrap();
            assert!(bounds.min.z.abs() < 1e-4, "{} min z {}", asset.name, bounds.min.z);
            assert!(asset.mesh.has_normals(), "{} has no normals", asset.name);
            assert!(!asset.mesh.faces().is_empty());
        }
    }

    #[test]
    fn scene_conversion_puts_up_on_y() {
        let asset = create_rock(&mut seeded(NATURE_SEED));
        let height = asset.mesh.bounds().unwrap().max.z;

        let scene = asset.into_scene();
        assert_eq!(scene.objects.len(), 1);
        let object = &scene.objects[0];
        assert!(object.selected);
        assert_eq!(object.name, "Rock");

        let bounds = object.mesh().unwrap().bounds().unwrap();
        assert!(bounds.min.y.abs() < 1e-4);
        assert!((bounds.max.y - height).abs() < 1e-4);
        for normal in &object.mesh().unwrap().vertex_normals {
            assert!((normal.length() - 1.0).abs() < 1e-3);
        }
    }
}
