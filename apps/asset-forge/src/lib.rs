use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use athena::athena_asset_database::{
    asset_paths::{self, resolve_asset_path},
    AssetDatabase,
};
use athena::athena_model::{write_glb, ExportOptions, InspectReport, Scene};
use athena::athena_procedural::{
    create_birch_tree, create_enemy_creature, create_grass_patch, create_oak_tree,
    create_pine_tree, create_rock, create_terrain, seeded, GeneratedAsset, NATURE_SEED, TREE_SEED,
};
use athena::athena_rigging::{create_death_animation, merge_animation_files, MergeSource};
use athena::{athena_profiling, Athena};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory that `::` asset paths are resolved against
    #[arg(long, global = true, default_value = "assets")]
    assets_dir: PathBuf,

    /// Log the time spent in the top level profiling scopes
    #[arg(long, global = true, default_value_t = false)]
    profile: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the enemy creature
    Creature {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Generate the oak, pine and birch trees
    Trees {
        /// Write into this directory instead of the assets tree
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long, default_value_t = TREE_SEED)]
        seed: u64,
    },
    /// Generate the grass patch, terrain and rock
    Nature {
        /// Write into this directory instead of the assets tree
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long, default_value_t = NATURE_SEED)]
        seed: u64,
    },
    /// Author the Death clip on the biped character
    Death {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Merge the biped animation clips into a single file
    Merge {
        #[arg(long)]
        output: Option<PathBuf>,
        /// `path=label` pairs replacing the default clip list
        #[arg(long = "source", value_parser = parse_source)]
        sources: Vec<MergeSource>,
    },
    /// Print the structure of a glb file
    Inspect {
        #[arg(default_value = asset_paths::BIPED_DEATH)]
        file: String,
        /// Fail when the file contains no armature
        #[arg(long, default_value_t = false)]
        require_armature: bool,
        #[arg(long, value_delimiter = ',', default_values_t = ["Hips".to_owned(), "Head".to_owned()])]
        sample_bones: Vec<String>,
        #[arg(long, value_delimiter = ',', default_values_t = [0.0, 18.0, 36.0, 54.0, 72.0])]
        sample_frames: Vec<f32>,
    },
}

fn parse_source(value: &str) -> Result<MergeSource, String> {
    match value.split_once('=') {
        Some((path, label)) if !path.is_empty() && !label.is_empty() => {
            Ok(MergeSource::new(path, label))
        }
        _ => Err(format!("expected `path=label`, got `{}`", value)),
    }
}

/// Output location of `asset`: its file name inside `dir` when given, else its place in the
/// assets tree.
fn output_path(asset: &str, dir: Option<&Path>, assets_dir: &Path) -> PathBuf {
    let default = resolve_asset_path(asset, assets_dir);
    match (dir, default.file_name()) {
        (Some(dir), Some(file_name)) => dir.join(file_name),
        _ => default,
    }
}

fn export_generated(asset: GeneratedAsset, path: &Path) -> Result<()> {
    let name = asset.name.clone();
    let options = ExportOptions {
        use_selection: true,
        apply_transforms: true,
        materials: true,
        ..Default::default()
    };
    write_glb(&asset.into_scene(), &options, path)
        .with_context(|| format!("export {}", name))?;
    println!("Exported {}", path.display());
    Ok(())
}

fn inspect(
    path: &Path,
    require_armature: bool,
    sample_bones: &[String],
    sample_frames: &[f32],
) -> Result<()> {
    let mut database = AssetDatabase::<Scene>::new();
    let scene = database.get(path)?;

    let report = InspectReport::new(&scene, sample_bones, sample_frames);
    print!("{}", report);

    if require_armature && !report.has_armature() {
        bail!("No armature found in {}", path.display());
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let assets_dir = args.assets_dir.as_path();

    match args.command {
        Command::Creature { output } => {
            let path = output.unwrap_or_else(|| {
                resolve_asset_path(asset_paths::ENEMY_CREATURE, assets_dir)
            });
            export_generated(create_enemy_creature(), &path)?;
        }
        Command::Trees { output_dir, seed } => {
            let dir = output_dir.as_deref();
            log::info!("Growing trees with seed {}", seed);
            let mut rng = seeded(seed);
            export_generated(
                create_oak_tree(&mut rng),
                &output_path(asset_paths::OAK_TREE, dir, assets_dir),
            )?;
            export_generated(
                create_pine_tree(&mut rng),
                &output_path(asset_paths::PINE_TREE, dir, assets_dir),
            )?;
            export_generated(
                create_birch_tree(&mut rng),
                &output_path(asset_paths::BIRCH_TREE, dir, assets_dir),
            )?;
        }
        Command::Nature { output_dir, seed } => {
            let dir = output_dir.as_deref();
            log::info!("Generating nature assets with seed {}", seed);
            let mut rng = seeded(seed);
            export_generated(
                create_grass_patch(&mut rng),
                &output_path(asset_paths::GRASS_PATCH, dir, assets_dir),
            )?;
            export_generated(
                create_terrain(),
                &output_path(asset_paths::TERRAIN, dir, assets_dir),
            )?;
            export_generated(
                create_rock(&mut rng),
                &output_path(asset_paths::ROCK, dir, assets_dir),
            )?;
        }
        Command::Death { input, output } => {
            let input = input.unwrap_or_else(|| {
                resolve_asset_path(asset_paths::BIPED_CHARACTER, assets_dir)
            });
            let output = output
                .unwrap_or_else(|| resolve_asset_path(asset_paths::BIPED_DEATH, assets_dir));
            create_death_animation(&input, &output)?;
            println!("Exported death animation to: {}", output.display());
        }
        Command::Merge { output, sources } => {
            let sources = if sources.is_empty() {
                asset_paths::BIPED_ANIMATION_SOURCES
                    .iter()
                    .map(|(path, label)| {
                        MergeSource::new(resolve_asset_path(path, assets_dir), label)
                    })
                    .collect()
            } else {
                sources
            };
            let output = output.unwrap_or_else(|| {
                resolve_asset_path(asset_paths::BIPED_ALL_ANIMATIONS, assets_dir)
            });
            merge_animation_files(&sources, &output)?;
            println!("Exported: {}", output.display());
        }
        Command::Inspect {
            file,
            require_armature,
            sample_bones,
            sample_frames,
        } => {
            inspect(
                &resolve_asset_path(&file, assets_dir),
                require_armature,
                &sample_bones,
                &sample_frames,
            )?;
        }
    }

    Ok(())
}

/// Runs the command inside a single profiler frame and logs its scopes once it finishes.
fn run_profiled(args: Args) -> Result<()> {
    let sink = athena_profiling::log_frames();
    athena_profiling::new_frame();

    let result = run(args);

    athena_profiling::new_frame();
    athena_profiling::puffin::GlobalProfiler::lock().remove_sink(sink);
    athena_profiling::puffin::set_scopes_on(false);
    result
}

pub fn internal_main() -> Result<()> {
    let args = Args::parse();
    let _athena = Athena::new("Asset Forge");

    if args.profile {
        run_profiled(args)
    } else {
        run(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("asset-forge").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn inspect_defaults() {
        let args = parse(&["inspect"]);
        assert_eq!(args.assets_dir, Path::new("assets"));
        match args.command {
            Command::Inspect {
                file,
                require_armature,
                sample_bones,
                sample_frames,
            } => {
                assert_eq!(file, asset_paths::BIPED_DEATH);
                assert!(!require_armature);
                assert_eq!(sample_bones, ["Hips", "Head"]);
                assert_eq!(sample_frames, [0.0, 18.0, 36.0, 54.0, 72.0]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn merge_sources_parse() {
        let args = parse(&["merge", "--source", "a.glb=Idle", "--source", "b.glb=Walk"]);
        let Command::Merge { sources, .. } = args.command else {
            panic!("expected merge");
        };
        assert_eq!(sources[1], MergeSource::new("b.glb", "Walk"));
        assert!(parse_source("no-label").is_err());
        assert!(parse_source("a.glb=").is_err());
    }

    #[test]
    fn output_dir_keeps_file_names() {
        assert_eq!(
            output_path(asset_paths::OAK_TREE, Some(Path::new("out")), Path::new("assets")),
            Path::new("out/oak_tree.glb")
        );
        assert_eq!(
            output_path(asset_paths::OAK_TREE, None, Path::new("assets")),
            Path::new("assets/models/nature/oak_tree.glb")
        );
    }

    #[test]
    fn generated_creature_has_no_armature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enemy_creature.glb");
        run(parse(&["creature", "--output", path.to_str().unwrap()])).unwrap();
        assert!(path.exists());

        assert!(inspect(&path, false, &[], &[]).is_ok());
        assert!(inspect(&path, true, &[], &[]).is_err());
    }

    #[test]
    fn profiled_run_turns_scopes_back_off() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rock.glb");
        let args = parse(&["--profile", "nature", "--output-dir", dir.path().to_str().unwrap()]);
        assert!(args.profile);

        run_profiled(args).unwrap();
        assert!(path.exists());
        assert!(!athena_profiling::puffin::are_scopes_on());
    }
}
