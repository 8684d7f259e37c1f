//! XYZ Euler angles in the convention used by DCC tools: the rotation matrix is `Rz * Ry * Rx`,
//! so X is applied first.

use glam::{Mat3, Quat, Vec3};

pub fn quat_from_euler_xyz(radians: Vec3) -> Quat {
    Quat::from_rotation_z(radians.z)
        * Quat::from_rotation_y(radians.y)
        * Quat::from_rotation_x(radians.x)
}

pub fn quat_from_euler_xyz_degrees(degrees: Vec3) -> Quat {
    quat_from_euler_xyz(Vec3::new(
        degrees.x.to_radians(),
        degrees.y.to_radians(),
        degrees.z.to_radians(),
    ))
}

/// Inverse of [`quat_from_euler_xyz`] for pitch (y) within +-90 degrees.
pub fn euler_xyz_from_quat(rotation: Quat) -> Vec3 {
    let m = Mat3::from_quat(rotation.normalize());
    let cy = (m.x_axis.x * m.x_axis.x + m.x_axis.y * m.x_axis.y).sqrt();

    if cy > 16.0 * f32::EPSILON {
        Vec3::new(
            m.y_axis.z.atan2(m.z_axis.z),
            (-m.x_axis.z).atan2(cy),
            m.x_axis.y.atan2(m.x_axis.x),
        )
    } else {
        Vec3::new(
            (-m.z_axis.y).atan2(m.y_axis.y),
            (-m.x_axis.z).atan2(cy),
            0.0,
        )
    }
}

pub fn euler_xyz_degrees_from_quat(rotation: Quat) -> Vec3 {
    let radians = euler_xyz_from_quat(rotation);
    Vec3::new(
        radians.x.to_degrees(),
        radians.y.to_degrees(),
        radians.z.to_degrees(),
    )
}
