//! Z-up primitive meshes centred at the origin, with outward facing counter-clockwise faces.
//! Faces reference material slot 0; callers assign the material.

use std::collections::HashMap;
use std::f32::consts::TAU;

use athena_model::Mesh;
use glam::Vec3;

fn ring(mesh: &mut Mesh, sides: u32, radius: f32, z: f32) -> Vec<u32> {
    (0..sides)
        .map(|j| {
            let angle = j as f32 * TAU / sides as f32;
            mesh.add_vertex(Vec3::new(angle.cos() * radius, angle.sin() * radius, z))
        })
        .collect()
}

fn bridge(mesh: &mut Mesh, lower: &[u32], upper: &[u32]) {
    let sides = lower.len();
    for j in 0..sides {
        let next = (j + 1) % sides;
        let _ = mesh.add_face(&[lower[j], lower[next], upper[next], upper[j]], 0);
    }
}

/// Sphere around the origin with poles on the z axis. Clamped to at least 3 segments and 2 rings.
pub fn uv_sphere(segments: u32, rings: u32, radius: f32) -> Mesh {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let mut mesh = Mesh::new("Sphere");

    let top = mesh.add_vertex(Vec3::new(0.0, 0.0, radius));
    let mut layers = Vec::with_capacity(rings as usize - 1);
    for i in 1..rings {
        let theta = std::f32::consts::PI * i as f32 / rings as f32;
        layers.push(ring(
            &mut mesh,
            segments,
            radius * theta.sin(),
            radius * theta.cos(),
        ));
    }
    let bottom = mesh.add_vertex(Vec3::new(0.0, 0.0, -radius));

    let n = segments as usize;
    for j in 0..n {
        let next = (j + 1) % n;
        let _ = mesh.add_face(&[top, layers[0][j], layers[0][next]], 0);
    }
    for i in 0..layers.len() - 1 {
        // Upper ring first keeps the quads facing outward.
        let (upper, lower) = (&layers[i], &layers[i + 1]);
        for j in 0..n {
            let next = (j + 1) % n;
            let _ = mesh.add_face(&[upper[j], lower[j], lower[next], upper[next]], 0);
        }
    }
    let last = &layers[layers.len() - 1];
    for j in 0..n {
        let next = (j + 1) % n;
        let _ = mesh.add_face(&[bottom, last[next], last[j]], 0);
    }

    mesh
}

/// Cone from `bottom_radius` at `-depth / 2` to `top_radius` at `depth / 2`.
pub fn cone(vertices: u32, bottom_radius: f32, top_radius: f32, depth: f32) -> Mesh {
    let mut mesh = Mesh::new("Cone");

    let bottom = ring(&mut mesh, vertices, bottom_radius, -depth * 0.5);
    let top = ring(&mut mesh, vertices, top_radius, depth * 0.5);
    bridge(&mut mesh, &bottom, &top);

    let cap: Vec<u32> = bottom.iter().rev().copied().collect();
    let _ = mesh.add_face(&cap, 0);
    let _ = mesh.add_face(&top, 0);

    mesh
}

pub fn cylinder(vertices: u32, radius: f32, depth: f32) -> Mesh {
    let mut mesh = cone(vertices, radius, radius, depth);
    mesh.name = "Cylinder".to_owned();
    mesh
}

/// Axis aligned cube with edge length `size`.
pub fn cube(size: f32) -> Mesh {
    let mut mesh = Mesh::new("Cube");
    let h = size * 0.5;
    for z in [-h, h] {
        mesh.add_vertex(Vec3::new(-h, -h, z));
        mesh.add_vertex(Vec3::new(h, -h, z));
        mesh.add_vertex(Vec3::new(h, h, z));
        mesh.add_vertex(Vec3::new(-h, h, z));
    }

    for face in [
        [0, 3, 2, 1],
        [4, 5, 6, 7],
        [0, 1, 5, 4],
        [1, 2, 6, 5],
        [2, 3, 7, 6],
        [3, 0, 4, 7],
    ] {
        let _ = mesh.add_face(&face, 0);
    }

    mesh
}

/// Flat XY grid of `x_subdivisions` by `y_subdivisions` quads spanning `size` on each axis.
pub fn grid(x_subdivisions: u32, y_subdivisions: u32, size: f32) -> Mesh {
    let mut mesh = Mesh::new("Grid");
    let columns = x_subdivisions + 1;

    for j in 0..=y_subdivisions {
        for i in 0..=x_subdivisions {
            mesh.add_vertex(Vec3::new(
                -size * 0.5 + size * i as f32 / x_subdivisions as f32,
                -size * 0.5 + size * j as f32 / y_subdivisions as f32,
                0.0,
            ));
        }
    }

    for j in 0..y_subdivisions {
        for i in 0..x_subdivisions {
            let v = j * columns + i;
            let _ = mesh.add_face(&[v, v + 1, v + 1 + columns, v + columns], 0);
        }
    }

    mesh
}

/// Icosphere where one subdivision is the bare icosahedron.
pub fn icosphere(subdivisions: u32, radius: f32) -> Mesh {
    let t = (1.0 + 5.0_f32.sqrt()) * 0.5;
    let mut positions: Vec<Vec3> = [
        (-1.0, t, 0.0),
        (1.0, t, 0.0),
        (-1.0, -t, 0.0),
        (1.0, -t, 0.0),
        (0.0, -1.0, t),
        (0.0, 1.0, t),
        (0.0, -1.0, -t),
        (0.0, 1.0, -t),
        (t, 0.0, -1.0),
        (t, 0.0, 1.0),
        (-t, 0.0, -1.0),
        (-t, 0.0, 1.0),
    ]
    .into_iter()
    .map(|(x, y, z)| Vec3::new(x, y, z).normalize() * radius)
    .collect();

    let mut triangles: Vec<[u32; 3]> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    for _ in 1..subdivisions.max(1) {
        let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
        let mut midpoint = |a: u32, b: u32, positions: &mut Vec<Vec3>| -> u32 {
            *midpoints.entry((a.min(b), a.max(b))).or_insert_with(|| {
                let p = (positions[a as usize] + positions[b as usize]).normalize() * radius;
                positions.push(p);
                positions.len() as u32 - 1
            })
        };

        let mut next = Vec::with_capacity(triangles.len() * 4);
        for [a, b, c] in triangles {
            let ab = midpoint(a, b, &mut positions);
            let bc = midpoint(b, c, &mut positions);
            let ca = midpoint(c, a, &mut positions);
            next.extend_from_slice(&[[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
        }
        triangles = next;
    }

    let mut mesh = Mesh::new("Icosphere");
    for p in positions {
        mesh.add_vertex(p);
    }
    for triangle in triangles {
        let _ = mesh.add_face(&triangle, 0);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_outward(mesh: &Mesh) {
        for face in mesh.faces() {
            let centroid = face
                .vertices
                .iter()
                .map(|&v| mesh.vertex_positions[v as usize])
                .sum::<Vec3>()
                / face.vertices.len() as f32;
            assert!(
                mesh.face_normal(face).dot(centroid) > 0.0,
                "{} has an inward face",
                mesh.name
            );
        }
    }

    #[test]
    fn vertex_and_face_counts() {
        let sphere = uv_sphere(24, 16, 0.55);
        assert_eq!(sphere.vertex_positions.len(), 24 * 15 + 2);
        assert_eq!(sphere.faces().len(), 24 * 16);

        let cylinder = cylinder(12, 0.12, 0.5);
        assert_eq!(cylinder.vertex_positions.len(), 24);
        assert_eq!(cylinder.faces().len(), 14);

        assert_eq!(cube(0.2).faces().len(), 6);

        let grid = grid(80, 80, 200.0);
        assert_eq!(grid.vertex_positions.len(), 81 * 81);
        assert_eq!(grid.faces().len(), 80 * 80);

        assert_eq!(icosphere(1, 1.0).vertex_positions.len(), 12);
        let rock = icosphere(3, 0.8);
        assert_eq!(rock.vertex_positions.len(), 162);
        assert_eq!(rock.faces().len(), 320);
    }

    #[test]
    fn degenerate_sphere_is_clamped() {
        for (segments, rings) in [(0, 0), (1, 1), (2, 1)] {
            let sphere = uv_sphere(segments, rings, 1.0);
            assert_eq!(sphere.vertex_positions.len(), 3 + 2);
            assert_eq!(sphere.faces().len(), 3 * 2);
            assert_outward(&sphere);
        }
    }

    #[test]
    fn closed_primitives_face_outward() {
        assert_outward(&uv_sphere(12, 8, 1.0));
        assert_outward(&cylinder(12, 0.5, 2.0));
        assert_outward(&cone(8, 0.025, 0.005, 0.12));
        assert_outward(&cube(1.0));
        assert_outward(&icosphere(2, 1.0));
    }

    #[test]
    fn cube_spans_size() {
        let bounds = cube(0.2).bounds().unwrap();
        assert!((bounds.size() - Vec3::splat(0.2)).length() < 1e-6);
        assert!(bounds.center().length() < 1e-6);
    }
}
