use std::f32::consts::{PI, TAU};

use athena_model::{Material, Mesh};
use athena_transform::quat_from_euler_xyz;
use glam::{Quat, Vec3};
use rand::Rng;

use crate::{random::RandomExt, GeneratedAsset};

const BRANCH_SEGMENTS: u32 = 5;

/// One branch to grow: where it starts, where it points and how big it is.
#[derive(Debug, Clone, Copy)]
pub struct Branch {
    pub origin: Vec3,
    pub direction: Vec3,
    pub length: f32,
    pub radius: f32,
    pub depth: u32,
}

/// Grows a tapering, drooping branch and recursively its children.
///
/// Nothing is emitted, and no random numbers are drawn, once `depth` exceeds `max_depth`
/// or the branch gets shorter than 5 cm. Branches near the maximum depth end in leaf clusters.
pub fn grow_branch(
    mesh: &mut Mesh,
    rng: &mut impl Rng,
    branch: Branch,
    max_depth: u32,
    bark_material: u32,
    leaf_material: u32,
) {
    if branch.depth > max_depth || branch.length < 0.05 {
        return;
    }

    let depth = branch.depth as f32;
    let sides = 8u32.saturating_sub(branch.depth).max(4);
    let mut position = branch.origin;
    let mut direction = branch.direction.normalize();

    let mut rings = Vec::with_capacity(BRANCH_SEGMENTS as usize + 1);
    for i in 0..=BRANCH_SEGMENTS {
        let t = i as f32 / BRANCH_SEGMENTS as f32;
        let r = branch.radius * (1.0 - t * 0.7);

        // Gravity pulls deeper branches down, and they wander more.
        direction.z -= 0.02 * depth;
        direction.x += rng.uniform(-0.1, 0.1) * depth;
        direction.y += rng.uniform(-0.1, 0.1) * depth;
        direction = direction.normalize();

        let perp1 = if direction.z.abs() < 0.9 {
            direction.cross(Vec3::Z).normalize()
        } else {
            direction.cross(Vec3::X).normalize()
        };
        let perp2 = direction.cross(perp1).normalize();

        let ring: Vec<u32> = (0..sides)
            .map(|j| {
                let angle = j as f32 * TAU / sides as f32;
                mesh.add_vertex(position + (perp1 * angle.cos() + perp2 * angle.sin()) * r)
            })
            .collect();
        rings.push(ring);

        position += direction * (branch.length / BRANCH_SEGMENTS as f32);
    }

    for pair in rings.windows(2) {
        let (lower, upper) = (&pair[0], &pair[1]);
        for j in 0..lower.len() {
            let next = (j + 1) % lower.len();
            let _ = mesh.add_face(&[lower[j], lower[next], upper[next], upper[j]], bark_material);
        }
    }

    let tip = position;

    if branch.depth + 1 >= max_depth {
        for _ in 0..rng.randint(2, 4) {
            let offset = Vec3::new(
                rng.uniform(-0.3, 0.3),
                rng.uniform(-0.3, 0.3),
                rng.uniform(-0.1, 0.3),
            );
            let size = rng.uniform(0.3, 0.8) * (1.0 / (depth * 0.5 + 1.0));
            add_leaf_cluster(mesh, rng, tip + offset, size, leaf_material);
        }
    }

    if branch.depth < max_depth {
        let children = if branch.depth < 2 {
            rng.randint(1, 3)
        } else {
            rng.randint(1, 2)
        };
        for _ in 0..children {
            let angle = rng.uniform(20.0, 60.0).to_radians();
            let twist = rng.uniform(0.0, 360.0).to_radians();
            let child_direction =
                Quat::from_rotation_z(twist) * (Quat::from_rotation_x(angle) * direction);

            let child = Branch {
                origin: tip,
                direction: child_direction,
                length: branch.length * rng.uniform(0.5, 0.75),
                radius: branch.radius * rng.uniform(0.4, 0.65),
                depth: branch.depth + 1,
            };
            grow_branch(mesh, rng, child, max_depth, bark_material, leaf_material);
        }
    }
}

/// Upright quad rotated around its bottom edge centre.
fn add_leaf(
    mesh: &mut Mesh,
    position: Vec3,
    rotation: Quat,
    width: f32,
    height: f32,
    material: u32,
) {
    let corners = [
        Vec3::new(-width, 0.0, 0.0),
        Vec3::new(width, 0.0, 0.0),
        Vec3::new(width, 0.0, height),
        Vec3::new(-width, 0.0, height),
    ];
    let vertices: Vec<u32> = corners
        .iter()
        .map(|&corner| mesh.add_vertex(position + rotation * corner))
        .collect();
    let _ = mesh.add_face(&vertices, material);
}

fn add_leaf_cluster(mesh: &mut Mesh, rng: &mut impl Rng, center: Vec3, size: f32, material: u32) {
    for _ in 0..rng.randint(4, 8) {
        let offset = Vec3::new(
            rng.uniform(-size, size),
            rng.uniform(-size, size),
            rng.uniform(-size * 0.5, size * 0.5),
        );
        let width = rng.uniform(0.08, 0.15) * size * 3.0;
        let height = rng.uniform(0.1, 0.2) * size * 3.0;

        let rotation = quat_from_euler_xyz(Vec3::new(
            rng.uniform(-0.5, 0.5),
            rng.uniform(-0.5, 0.5),
            rng.uniform(0.0, TAU),
        ));
        add_leaf(mesh, center + offset, rotation, width, height, material);
    }
}

pub fn create_oak_tree(rng: &mut impl Rng) -> GeneratedAsset {
    athena_profiling::profile_function!();

    let mut mesh = Mesh::new("OakTreeMesh");
    let bark = mesh.add_material(Material::pbr("OakBark", Vec3::new(0.18, 0.1, 0.05), 0.98, 0.0));
    let leaves = mesh.add_material(
        Material::pbr("OakLeaves", Vec3::new(0.12, 0.35, 0.08), 0.92, 0.0)
            .with_subsurface(0.3, Vec3::new(0.2, 0.5, 0.1)),
    );
    let leaves_light = mesh.add_material(
        Material::pbr("OakLeavesLight", Vec3::new(0.2, 0.45, 0.12), 0.9, 0.0)
            .with_subsurface(0.2, Vec3::new(0.3, 0.6, 0.15)),
    );

    let trunk = Branch {
        origin: Vec3::ZERO,
        direction: Vec3::Z,
        length: 3.5,
        radius: 0.25,
        depth: 0,
    };
    grow_branch(&mut mesh, rng, trunk, 4, bark, leaves);

    // Side branches off the lower trunk.
    for i in 0..3 {
        let angle = i as f32 * 2.1 + rng.uniform(-0.3, 0.3);
        let side = Branch {
            origin: Vec3::new(0.0, 0.0, 1.5 + rng.uniform(0.0, 1.0)),
            direction: Vec3::new(angle.cos() * 0.6, angle.sin() * 0.6, 0.8),
            length: 2.0,
            radius: 0.1,
            depth: 1,
        };
        grow_branch(&mut mesh, rng, side, 4, bark, leaves_light);
    }

    GeneratedAsset::finalize("OakTree", mesh)
}

pub fn create_pine_tree(rng: &mut impl Rng) -> GeneratedAsset {
    athena_profiling::profile_function!();

    let mut mesh = Mesh::new("PineTreeMesh");
    let bark = mesh.add_material(Material::pbr("PineBark", Vec3::new(0.22, 0.12, 0.06), 0.97, 0.0));
    let needles = mesh.add_material(
        Material::pbr("PineNeedles", Vec3::new(0.06, 0.22, 0.06), 0.95, 0.0)
            .with_subsurface(0.15, Vec3::new(0.1, 0.3, 0.05)),
    );
    let needles_tip =
        mesh.add_material(Material::pbr("PineNeedlesTip", Vec3::new(0.1, 0.3, 0.08), 0.93, 0.0));

    // Tall, straight and slightly irregular trunk.
    let trunk_height = 7.0;
    let trunk_segments = 12;
    let mut rings = Vec::with_capacity(trunk_segments + 1);
    for i in 0..=trunk_segments {
        let t = i as f32 / trunk_segments as f32;
        let r = 0.15 * (1.0 - t * 0.6);
        let ring: Vec<u32> = (0..8)
            .map(|j| {
                let angle = j as f32 * TAU / 8.0;
                let x = angle.cos() * r + rng.uniform(-0.01, 0.01);
                let y = angle.sin() * r + rng.uniform(-0.01, 0.01);
                mesh.add_vertex(Vec3::new(x, y, t * trunk_height))
            })
            .collect();
        rings.push(ring);
    }
    for pair in rings.windows(2) {
        for j in 0..8 {
            let next = (j + 1) % 8;
            let _ = mesh.add_face(&[pair[0][j], pair[0][next], pair[1][next], pair[1][j]], bark);
        }
    }

    // Conical layers of drooping needle strips.
    let layers = 7;
    for layer in 0..layers {
        let t = layer as f32 / (layers - 1) as f32;
        let base_z = 2.0 + t * 5.0;
        let base_radius = 2.0 * (1.0 - t * 0.8) + 0.2;
        let material = if t > 0.7 { needles_tip } else { needles };

        let branches = rng.randint(6, 10);
        for b in 0..branches {
            let angle = b as f32 * TAU / branches as f32 + rng.uniform(-0.2, 0.2);
            let branch_length = base_radius * rng.uniform(0.7, 1.1);
            let (sin, cos) = angle.sin_cos();

            let segments = 4;
            for s in 0..segments {
                let st = s as f32 / segments as f32;
                let st_next = (s + 1) as f32 / segments as f32;
                let w = 0.15 * (1.0 - st * 0.5);

                let p1 = Vec3::new(
                    cos * branch_length * st,
                    sin * branch_length * st,
                    base_z - st * st * 0.3,
                );
                let p2 = Vec3::new(
                    cos * branch_length * st_next,
                    sin * branch_length * st_next,
                    base_z - st_next * st_next * 0.3,
                );
                let perp = Vec3::new(-sin * w, cos * w, 0.0);

                let v1 = mesh.add_vertex(p1 + perp);
                let v2 = mesh.add_vertex(p1 - perp);
                let v3 = mesh.add_vertex(p2 - perp);
                let v4 = mesh.add_vertex(p2 + perp);
                let _ = mesh.add_face(&[v1, v2, v3, v4], material);
            }
        }
    }

    GeneratedAsset::finalize("PineTree", mesh)
}

pub fn create_birch_tree(rng: &mut impl Rng) -> GeneratedAsset {
    athena_profiling::profile_function!();

    let mut mesh = Mesh::new("BirchTreeMesh");
    let bark =
        mesh.add_material(Material::pbr("BirchBark", Vec3::new(0.88, 0.85, 0.78), 0.75, 0.0));
    let bark_dark =
        mesh.add_material(Material::pbr("BirchBarkDark", Vec3::new(0.2, 0.18, 0.15), 0.85, 0.0));
    let leaves = mesh.add_material(
        Material::pbr("BirchLeaves", Vec3::new(0.25, 0.5, 0.12), 0.88, 0.0)
            .with_subsurface(0.25, Vec3::new(0.3, 0.6, 0.15)),
    );

    // Slender trunk drifting sideways as it rises.
    let trunk_height = 6.0;
    let segments = 16;
    let mut curve_x = 0.0;
    let mut rings = Vec::with_capacity(segments + 1);
    for i in 0..=segments {
        let t = i as f32 / segments as f32;
        let r = 0.08 * (1.0 - t * 0.5);
        curve_x += rng.uniform(-0.02, 0.02);

        let ring: Vec<u32> = (0..6)
            .map(|j| {
                let angle = j as f32 * TAU / 6.0;
                mesh.add_vertex(Vec3::new(
                    angle.cos() * r + curve_x,
                    angle.sin() * r,
                    t * trunk_height,
                ))
            })
            .collect();
        rings.push(ring);
    }
    for pair in rings.windows(2) {
        for j in 0..6 {
            let next = (j + 1) % 6;
            let material = if rng.unit() > 0.3 { bark } else { bark_dark };
            let quad = [pair[0][j], pair[0][next], pair[1][next], pair[1][j]];
            let _ = mesh.add_face(&quad, material);
        }
    }

    // Hanging leaf strands.
    for i in 0..12 {
        let angle = i as f32 * PI / 6.0 + rng.uniform(-0.3, 0.3);
        let distance = rng.uniform(0.5, 1.5);
        let z = rng.uniform(3.5, 6.5);
        let x = angle.cos() * distance + curve_x;
        let y = angle.sin() * distance;

        let strand_length = rng.uniform(0.5, 1.2);
        let strand_segments = rng.randint(3, 5);
        for s in 0..strand_segments {
            let st = s as f32 / strand_segments as f32;
            let width = rng.uniform(0.05, 0.12);
            let height = rng.uniform(0.08, 0.15);
            let position = Vec3::new(
                x + rng.uniform(-0.15, 0.15),
                y + rng.uniform(-0.15, 0.15),
                z - st * strand_length,
            );
            let rotation = quat_from_euler_xyz(Vec3::new(
                rng.uniform(-0.3, 0.3),
                rng.uniform(-0.3, 0.3),
                rng.uniform(0.0, TAU),
            ));
            add_leaf(&mut mesh, position, rotation, width, height, leaves);
        }
    }

    // Canopy.
    for _ in 0..6 {
        let center = Vec3::new(
            curve_x + rng.uniform(-0.4, 0.4),
            rng.uniform(-0.4, 0.4),
            rng.uniform(5.0, 6.5),
        );
        let size = rng.uniform(0.4, 0.7);
        add_leaf_cluster(&mut mesh, rng, center, size, leaves);
    }

    GeneratedAsset::finalize("BirchTree", mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{seeded, TREE_SEED};

    #[test]
    fn branches_beyond_max_depth_emit_nothing() {
        let mut rng = seeded(TREE_SEED);
        let mut mesh = Mesh::new("branch");

        for depth in [5, 6, 10] {
            let branch = Branch {
                origin: Vec3::ZERO,
                direction: Vec3::Z,
                length: 1.0,
                radius: 0.1,
                depth,
            };
            grow_branch(&mut mesh, &mut rng, branch, 4, 0, 1);
        }
        assert!(mesh.is_empty());
        assert!(mesh.faces().is_empty());

        // No random numbers were consumed either.
        let mut fresh = seeded(TREE_SEED);
        assert_eq!(rng.unit().to_bits(), fresh.unit().to_bits());
    }

    #[test]
    fn short_branches_emit_nothing() {
        let mut mesh = Mesh::new("branch");
        let branch = Branch {
            origin: Vec3::ZERO,
            direction: Vec3::Z,
            length: 0.04,
            radius: 0.1,
            depth: 0,
        };
        grow_branch(&mut mesh, &mut seeded(TREE_SEED), branch, 4, 0, 1);
        assert!(mesh.is_empty());
    }

    #[test]
    fn leaf_only_branch_at_max_depth() {
        let mut mesh = Mesh::new("branch");
        let branch = Branch {
            origin: Vec3::ZERO,
            direction: Vec3::Z,
            length: 1.0,
            radius: 0.1,
            depth: 4,
        };
        grow_branch(&mut mesh, &mut seeded(TREE_SEED), branch, 4, 0, 1);

        // Four sided rings, five segments of bark, no children.
        let bark = mesh.faces().iter().filter(|f| f.material_index == 0).count();
        assert_eq!(bark, 4 * BRANCH_SEGMENTS as usize);
        let leaves = mesh.faces().iter().filter(|f| f.material_index == 1).count();
        assert!((2 * 4..=4 * 8).contains(&leaves), "{} leaves", leaves);
    }

    #[test]
    fn trees_have_their_palettes_and_are_reproducible() {
        let oak = create_oak_tree(&mut seeded(TREE_SEED));
        let names: Vec<&str> = oak.mesh.materials.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["OakBark", "OakLeaves", "OakLeavesLight"]);
        assert_eq!(oak.name, "OakTree");

        let again = create_oak_tree(&mut seeded(TREE_SEED));
        assert_eq!(oak.mesh.vertex_positions, again.mesh.vertex_positions);

        let pine = create_pine_tree(&mut seeded(TREE_SEED));
        let bounds = pine.mesh.bounds().unwrap();
        assert!(bounds.max.z > 6.5);
        assert!(pine.mesh.faces().iter().any(|f| f.material_index == 2));

        let birch = create_birch_tree(&mut seeded(TREE_SEED));
        assert_eq!(birch.mesh.materials.len(), 3);
        // 16 segments of six bark quads.
        let bark = birch
            .mesh
            .faces()
            .iter()
            .filter(|f| f.material_index < 2)
            .count();
        assert_eq!(bark, 16 * 6);
    }
}
