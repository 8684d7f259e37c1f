use athena_transform::Transform;
use glam::{Mat4, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub parent: Option<usize>,
    /// Rest transform relative to the parent bone, or to the armature for root bones.
    pub rest: Transform,
    /// Skin inverse bind matrix as read from a file, recomputed from the rest pose when absent.
    pub inverse_bind: Option<Mat4>,
}

impl Bone {
    pub fn new(name: &str, parent: Option<usize>, rest: Transform) -> Self {
        Self {
            name: name.to_owned(),
            parent,
            rest,
            inverse_bind: None,
        }
    }
}

/// Bone hierarchy of an armature object. Bone order matches the skin joint order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Armature {
    pub bones: Vec<Bone>,
}

impl Armature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bone(&mut self, bone: Bone) -> usize {
        self.bones.push(bone);
        self.bones.len() - 1
    }

    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|bone| bone.name == name)
    }

    pub fn children(&self, bone: usize) -> impl Iterator<Item = usize> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(move |(_, b)| b.parent == Some(bone))
            .map(|(i, _)| i)
    }

    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, b)| b.parent.is_none())
            .map(|(i, _)| i)
    }

    /// Rest matrix of `bone` in armature space.
    pub fn rest_matrix(&self, bone: usize) -> Mat4 {
        let mut matrix = self.bones[bone].rest.get_matrix();
        let mut parent = self.bones[bone].parent;
        while let Some(p) = parent {
            matrix = self.bones[p].rest.get_matrix() * matrix;
            parent = self.bones[p].parent;
        }
        matrix
    }

    pub fn inverse_bind_matrix(&self, bone: usize) -> Mat4 {
        self.bones[bone]
            .inverse_bind
            .unwrap_or_else(|| self.rest_matrix(bone).inverse())
    }

    pub fn head(&self, bone: usize) -> Vec3 {
        self.rest_matrix(bone).transform_point3(Vec3::ZERO)
    }

    /// Head of the first child, or a point along the bone's Y axis for leaf bones.
    pub fn tail(&self, bone: usize) -> Vec3 {
        if let Some(child) = self.children(bone).next() {
            return self.head(child);
        }

        let head = self.head(bone);
        let length = match self.bones[bone].parent {
            Some(parent) => (head - self.head(parent)).length(),
            None => 0.0,
        };
        let length = if length > 1e-4 { length * 0.5 } else { 0.1 };
        head + self
            .rest_matrix(bone)
            .transform_vector3(Vec3::Y)
            .normalize_or_zero()
            * length
    }
}
