use std::collections::HashSet;

use glam::{Mat4, Vec2, Vec3};
use thiserror::Error;

use crate::material::Material;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FaceError {
    #[error("a face needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),
    #[error("vertex {0} does not exist")]
    MissingVertex(u32),
    #[error("vertex {0} is used twice in the same face")]
    DuplicateVertex(u32),
    #[error("a face with these vertices already exists")]
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub vertices: Vec<u32>,
    pub material_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Polygon mesh built incrementally, owning the materials its faces refer to.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: String,
    pub vertex_positions: Vec<Vec3>,
    pub vertex_normals: Vec<Vec3>,
    pub vertex_tex_coords: Vec<Vec2>,
    pub vertex_joints: Vec<[u16; 4]>,
    pub vertex_weights: Vec<[f32; 4]>,
    pub materials: Vec<Material>,
    faces: Vec<Face>,
    face_keys: HashSet<Vec<u32>>,
}

impl Mesh {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn add_vertex(&mut self, position: Vec3) -> u32 {
        self.vertex_positions.push(position);
        self.vertex_positions.len() as u32 - 1
    }

    /// Appends a material slot and returns its index. Materials are never modified afterwards.
    pub fn add_material(&mut self, material: Material) -> u32 {
        self.materials.push(material);
        self.materials.len() as u32 - 1
    }

    pub fn add_face(&mut self, vertices: &[u32], material_index: u32) -> Result<usize, FaceError> {
        if vertices.len() < 3 {
            return Err(FaceError::TooFewVertices(vertices.len()));
        }

        let mut key = vertices.to_vec();
        key.sort_unstable();
        for pair in key.windows(2) {
            if pair[0] == pair[1] {
                return Err(FaceError::DuplicateVertex(pair[0]));
            }
        }
        if let Some(&last) = key.last() {
            if last as usize >= self.vertex_positions.len() {
                return Err(FaceError::MissingVertex(last));
            }
        }
        if !self.face_keys.insert(key) {
            return Err(FaceError::AlreadyExists);
        }

        self.faces.push(Face {
            vertices: vertices.to_vec(),
            material_index,
        });
        Ok(self.faces.len() - 1)
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn set_face_material(&mut self, face: usize, material_index: u32) {
        self.faces[face].material_index = material_index;
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_positions.is_empty()
    }

    pub fn has_normals(&self) -> bool {
        self.vertex_normals.len() == self.vertex_positions.len() && !self.vertex_normals.is_empty()
    }

    pub fn has_tex_coords(&self) -> bool {
        self.vertex_tex_coords.len() == self.vertex_positions.len()
            && !self.vertex_tex_coords.is_empty()
    }

    pub fn is_skinned(&self) -> bool {
        self.vertex_joints.len() == self.vertex_positions.len()
            && self.vertex_weights.len() == self.vertex_positions.len()
            && !self.vertex_joints.is_empty()
    }

    /// Newell normal of a polygon, which stays stable for slightly non-planar quads.
    pub fn face_normal(&self, face: &Face) -> Vec3 {
        let mut normal = Vec3::ZERO;
        for (i, &a) in face.vertices.iter().enumerate() {
            let b = face.vertices[(i + 1) % face.vertices.len()];
            let p0 = self.vertex_positions[a as usize];
            let p1 = self.vertex_positions[b as usize];
            normal.x += (p0.y - p1.y) * (p0.z + p1.z);
            normal.y += (p0.z - p1.z) * (p0.x + p1.x);
            normal.z += (p0.x - p1.x) * (p0.y + p1.y);
        }
        normal.normalize_or_zero()
    }

    /// Triangle fan indices of every face, grouped per face in face order.
    pub fn triangulate(&self, face: &Face) -> Vec<[u32; 3]> {
        (1..face.vertices.len() - 1)
            .map(|i| [face.vertices[0], face.vertices[i], face.vertices[i + 1]])
            .collect()
    }

    pub fn triangle_count(&self) -> usize {
        self.faces.iter().map(|face| face.vertices.len() - 2).sum()
    }

    /// Smooth shading: every vertex gets the area weighted average of its faces' normals.
    pub fn generate_normals(&mut self) {
        athena_profiling::profile_function!();

        self.vertex_normals.clear();
        self.vertex_normals
            .resize(self.vertex_positions.len(), Vec3::ZERO);

        for face in &self.faces {
            for [i0, i1, i2] in self.triangulate(face) {
                let p0 = self.vertex_positions[i0 as usize];
                let p1 = self.vertex_positions[i1 as usize];
                let p2 = self.vertex_positions[i2 as usize];
                let n = (p1 - p0).cross(p2 - p0);

                self.vertex_normals[i0 as usize] += n;
                self.vertex_normals[i1 as usize] += n;
                self.vertex_normals[i2 as usize] += n;
            }
        }

        for normal in &mut self.vertex_normals {
            let n = normal.normalize_or_zero();
            *normal = if n == Vec3::ZERO { Vec3::Z } else { n };
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let first = *self.vertex_positions.first()?;
        Some(
            self.vertex_positions
                .iter()
                .fold(Bounds { min: first, max: first }, |b, &p| Bounds {
                    min: b.min.min(p),
                    max: b.max.max(p),
                }),
        )
    }

    pub fn translate(&mut self, offset: Vec3) {
        for position in &mut self.vertex_positions {
            *position += offset;
        }
    }

    /// Bakes `matrix` into the vertex data, leaving the owner with an identity transform.
    pub fn apply_matrix(&mut self, matrix: Mat4) {
        for position in &mut self.vertex_positions {
            *position = matrix.transform_point3(*position);
        }

        if self.has_normals() {
            let normal_matrix = matrix.inverse().transpose();
            for normal in &mut self.vertex_normals {
                *normal = normal_matrix.transform_vector3(*normal).normalize_or_zero();
            }
        }

        // A mirroring transform flips the winding.
        if matrix.determinant() < 0.0 {
            for face in &mut self.faces {
                face.vertices.reverse();
            }
        }
    }

    /// Moves the mesh up or down so the lowest point of its bounding box sits at Z = 0.
    pub fn snap_to_ground(&mut self) {
        if let Some(bounds) = self.bounds() {
            self.translate(Vec3::new(0.0, 0.0, -bounds.min.z));
        }
    }

    /// Appends `other`, reusing material slots with the same name.
    pub fn join(&mut self, other: &Mesh) {
        athena_profiling::profile_function!();

        let material_map: Vec<u32> = other
            .materials
            .iter()
            .map(|material| {
                match self.materials.iter().position(|m| m.name == material.name) {
                    Some(index) => index as u32,
                    None => self.add_material(material.clone()),
                }
            })
            .collect();

        let vertex_offset = self.vertex_positions.len() as u32;
        let self_had_normals = self.has_normals();
        self.vertex_positions
            .extend_from_slice(&other.vertex_positions);
        if self_had_normals && other.has_normals() {
            self.vertex_normals.extend_from_slice(&other.vertex_normals);
        } else {
            self.vertex_normals.clear();
        }
        self.vertex_tex_coords.clear();
        self.vertex_joints.clear();
        self.vertex_weights.clear();

        for face in &other.faces {
            let vertices: Vec<u32> = face.vertices.iter().map(|v| v + vertex_offset).collect();
            let material_index = material_map
                .get(face.material_index as usize)
                .copied()
                .unwrap_or(0);
            if let Err(err) = self.add_face(&vertices, material_index) {
                log::debug!("Dropped face while joining {}: {}", other.name, err);
            }
        }
    }

    /// Converts from the Z-up authoring frame to the Y-up frame of a scene.
    pub fn convert_z_up_to_y_up(&mut self) {
        for position in &mut self.vertex_positions {
            *position = crate::z_up_to_y_up(*position);
        }
        for normal in &mut self.vertex_normals {
            *normal = crate::z_up_to_y_up(*normal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        let mut mesh = Mesh::new("quad");
        mesh.add_vertex(Vec3::new(0.0, 0.0, 1.0));
        mesh.add_vertex(Vec3::new(1.0, 0.0, 1.0));
        mesh.add_vertex(Vec3::new(1.0, 1.0, 2.0));
        mesh.add_vertex(Vec3::new(0.0, 1.0, 2.0));
        mesh
    }

    #[test]
    fn degenerate_faces_are_rejected() {
        let mut mesh = quad();
        assert_eq!(mesh.add_face(&[0, 1], 0), Err(FaceError::TooFewVertices(2)));
        assert_eq!(mesh.add_face(&[0, 1, 1], 0), Err(FaceError::DuplicateVertex(1)));
        assert_eq!(mesh.add_face(&[0, 1, 7], 0), Err(FaceError::MissingVertex(7)));
        assert_eq!(mesh.add_face(&[0, 1, 2, 3], 0), Ok(0));
        assert_eq!(mesh.add_face(&[1, 2, 3, 0], 0), Err(FaceError::AlreadyExists));
        assert_eq!(mesh.faces().len(), 1);
    }

    #[test]
    fn snap_to_ground_puts_lowest_vertex_at_zero() {
        let mut mesh = quad();
        mesh.snap_to_ground();
        let bounds = mesh.bounds().unwrap();
        assert_eq!(bounds.min.z, 0.0);
        assert_eq!(bounds.max.z, 1.0);
    }

    #[test]
    fn smooth_normals_point_away_from_ccw_winding() {
        let mut mesh = Mesh::new("flat");
        mesh.add_vertex(Vec3::new(0.0, 0.0, 0.0));
        mesh.add_vertex(Vec3::new(1.0, 0.0, 0.0));
        mesh.add_vertex(Vec3::new(1.0, 1.0, 0.0));
        mesh.add_vertex(Vec3::new(0.0, 1.0, 0.0));
        mesh.add_face(&[0, 1, 2, 3], 0).unwrap();
        mesh.generate_normals();

        assert!(mesh.has_normals());
        for normal in &mesh.vertex_normals {
            assert!((*normal - Vec3::Z).length() < 1e-6);
        }
        assert!((mesh.face_normal(&mesh.faces()[0]) - Vec3::Z).length() < 1e-6);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn join_merges_materials_by_name() {
        let mut a = quad();
        let body = a.add_material(Material::new("Body"));
        a.add_face(&[0, 1, 2], body).unwrap();

        let mut b = quad();
        b.add_material(Material::new("Eyes"));
        b.add_material(Material::new("Body"));
        b.add_face(&[0, 1, 2], 1).unwrap();
        b.add_face(&[0, 2, 3], 0).unwrap();

        a.join(&b);
        assert_eq!(a.materials.len(), 2);
        assert_eq!(a.vertex_positions.len(), 8);
        assert_eq!(a.faces()[1].vertices, vec![4, 5, 6]);
        assert_eq!(a.faces()[1].material_index, 0);
        assert_eq!(a.faces()[2].material_index, 1);
    }
}
