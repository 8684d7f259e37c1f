use glam::{Mat4, Quat, Vec3};

pub mod euler;
pub use euler::*;

/// Translation, rotation and scale of an object or bone, composed as `T * R * S`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Mat4> for Transform {
    fn from(value: Mat4) -> Self {
        let (scale, rotation, translation) = value.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Builds a transform from a location, an XYZ Euler rotation in degrees and a scale.
    pub fn from_euler_degrees(translation: Vec3, rotation_degrees: Vec3, scale: Vec3) -> Self {
        Self {
            translation,
            rotation: quat_from_euler_xyz_degrees(rotation_degrees),
            scale,
        }
    }

    pub fn get_translation(&self) -> Vec3 {
        self.translation
    }

    pub fn get_rotation(&self) -> Quat {
        self.rotation
    }

    pub fn get_scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        self.translation = translation;
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
    }

    pub fn translate(&mut self, translation: Vec3) {
        self.translation += translation;
    }

    pub fn get_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    pub fn set_matrix(&mut self, matrix: Mat4) {
        *self = Self::from(matrix);
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.translation + self.rotation * (self.scale * point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_is_scaled_then_rotated_then_translated() {
        let transform = Transform::from_euler_degrees(
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 90.0),
            Vec3::new(2.0, 1.0, 1.0),
        );
        let p = transform.transform_point(Vec3::X);
        assert!((p - Vec3::new(0.0, 2.0, 1.0)).length() < 1e-5);
        assert!((transform.get_matrix().transform_point3(Vec3::X) - p).length() < 1e-5);
    }

    #[test]
    fn matrix_round_trip() {
        let transform = Transform::new(
            Vec3::new(1.0, -2.0, 3.0),
            Quat::from_rotation_y(0.4),
            Vec3::splat(0.5),
        );
        let mut other = Transform::IDENTITY;
        other.set_matrix(transform.get_matrix());
        assert!((other.get_translation() - transform.get_translation()).length() < 1e-5);
        assert!(other.get_rotation().dot(transform.get_rotation()).abs() > 0.9999);
        assert!((other.get_scale() - transform.get_scale()).length() < 1e-5);
    }
}
