//! Minimal 3D vector and 4x4 affine helpers on top of `nalgebra`.
//!
//! Matrices are column-major: columns 0..3 hold the basis vectors and
//! column 3 holds the translation, row 3 is the homogeneous row.

use nalgebra::{Matrix3, Matrix4, Rotation3, Unit, Vector2, Vector3};

/// A point or direction in patient space.
pub type Vec3 = Vector3<f64>;

/// A point in image pixel space, `x` = column, `y` = row.
pub type Vec2 = Vector2<f64>;

pub type Mat4 = Matrix4<f64>;

pub fn vec3(x: f64, y: f64, z: f64) -> Vec3 {
    Vec3::new(x, y, z)
}

pub fn from_slice(values: &[f64; 3]) -> Vec3 {
    Vec3::new(values[0], values[1], values[2])
}

pub fn cross(a: &Vec3, b: &Vec3) -> Vec3 {
    a.cross(b)
}

pub fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a.dot(b)
}

/// Component-wise product.
pub fn multiply(a: &Vec3, b: &Vec3) -> Vec3 {
    a.component_mul(b)
}

/// Index of the component with the largest magnitude.
pub fn dominant_axis(v: &Vec3) -> usize {
    v.iamax()
}

/// Angle between two directions in radians, in `[0, PI]`.
pub fn angle_between(a: &Vec3, b: &Vec3) -> f64 {
    a.angle(b)
}

/// 4x4 rotation of `angle` radians about `axis` (through the origin).
///
/// Returns `None` for a zero-length axis.
pub fn rotation_about_axis(axis: &Vec3, angle: f64) -> Option<Mat4> {
    let axis = Unit::try_new(*axis, f64::EPSILON)?;
    Some(Rotation3::from_axis_angle(&axis, angle).to_homogeneous())
}

pub fn translation(offset: &Vec3) -> Mat4 {
    Mat4::new_translation(offset)
}

pub fn column3(m: &Mat4, index: usize) -> Vec3 {
    Vec3::new(m[(0, index)], m[(1, index)], m[(2, index)])
}

/// Upper-left 3x3 block.
pub fn linear_part(m: &Mat4) -> Matrix3<f64> {
    m.fixed_view::<3, 3>(0, 0).into_owned()
}

pub fn is_unit(v: &Vec3, epsilon: f64) -> bool {
    (v.norm() - 1.0).abs() <= epsilon
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn cross_is_right_handed() {
        let x = vec3(1.0, 0.0, 0.0);
        let y = vec3(0.0, 1.0, 0.0);
        assert_eq!(cross(&x, &y), vec3(0.0, 0.0, 1.0));
        assert_eq!(cross(&y, &x), vec3(0.0, 0.0, -1.0));
    }

    #[test]
    fn multiply_scales_each_component() {
        assert_eq!(multiply(&vec3(1.0, -2.0, 3.0), &vec3(2.0, 0.5, 0.0)), vec3(2.0, -1.0, 0.0));
    }

    #[test]
    fn dominant_axis_uses_magnitude() {
        assert_eq!(dominant_axis(&vec3(0.1, -0.9, 0.3)), 1);
        assert_eq!(dominant_axis(&vec3(0.0, 0.0, -1.0)), 2);
    }

    #[test]
    fn quarter_turn_about_z_maps_x_to_y() {
        let rotation = rotation_about_axis(&vec3(0.0, 0.0, 1.0), FRAC_PI_2).unwrap();
        let rotated = rotation.transform_vector(&vec3(1.0, 0.0, 0.0));
        assert!((rotated - vec3(0.0, 1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn zero_axis_has_no_rotation() {
        assert!(rotation_about_axis(&Vec3::zeros(), 1.0).is_none());
    }
}
