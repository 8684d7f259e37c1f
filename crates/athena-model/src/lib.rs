use glam::Vec3;

pub mod animation;
pub mod asset;
pub mod export;
pub mod material;
pub mod mesh;
pub mod report;
pub mod scene;
pub mod skeleton;

pub use animation::{Action, ActionId, AnimationData, BonePose, Channel, Interpolation, Property};
pub use export::{export_glb, write_glb, AnimationMode, ExportOptions};
pub use material::{AlphaMode, Material};
pub use mesh::{FaceError, Mesh};
pub use report::InspectReport;
pub use scene::{Image, Object, ObjectData, Scene};
pub use skeleton::{Armature, Bone};

/// Maps a point from the Z-up authoring frame into the Y-up frame of a scene.
pub fn z_up_to_y_up(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.z, -v.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn up_axis_conversion_is_a_rotation() {
        assert_eq!(z_up_to_y_up(Vec3::Z), Vec3::Y);
        assert_eq!(z_up_to_y_up(Vec3::Y), -Vec3::Z);
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(-4.0, 0.5, 2.0);
        assert!((z_up_to_y_up(a.cross(b)) - z_up_to_y_up(a).cross(z_up_to_y_up(b))).length() < 1e-5);
    }
}
