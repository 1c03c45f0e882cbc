//! Reslice axes: the 4x4 matrix describing an arbitrary cutting plane.

use crate::error::MprError;
use crate::math::{Mat4, Vec3, column3, cross, dot, is_unit, rotation_about_axis, translation};

/// Columns are `[row, 0]`, `[column, 0]`, `[row x column, 0]`, `[anchor, 1]`.
///
/// The anchor is the patient position of the output's top-left pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResliceAxes {
    matrix: Mat4,
}

impl ResliceAxes {
    /// Build axes from orthonormal row/column cosines and an anchor.
    ///
    /// Parallel cosines are rejected as degenerate, any other deviation
    /// from orthonormality as [`MprError::NonOrthonormal`]. Nothing is
    /// normalised.
    pub fn new(row: &Vec3, column: &Vec3, anchor: &Vec3, epsilon: f64) -> Result<Self, MprError> {
        let normal = cross(row, column);
        if normal.norm() <= epsilon {
            return Err(MprError::DegenerateAxes);
        }
        if !is_unit(row, epsilon) || !is_unit(column, epsilon) || dot(row, column).abs() > epsilon {
            return Err(MprError::NonOrthonormal);
        }
        Ok(Self::from_columns(row, column, &normal, anchor))
    }

    fn from_columns(row: &Vec3, column: &Vec3, normal: &Vec3, anchor: &Vec3) -> Self {
        #[rustfmt::skip]
        let matrix = Mat4::new(
            row.x, column.x, normal.x, anchor.x,
            row.y, column.y, normal.y, anchor.y,
            row.z, column.z, normal.z, anchor.z,
            0.0,   0.0,      0.0,      1.0,
        );
        Self { matrix }
    }

    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }

    pub fn row_cosines(&self) -> Vec3 {
        column3(&self.matrix, 0)
    }

    pub fn column_cosines(&self) -> Vec3 {
        column3(&self.matrix, 1)
    }

    pub fn normal(&self) -> Vec3 {
        column3(&self.matrix, 2)
    }

    pub fn anchor(&self) -> Vec3 {
        column3(&self.matrix, 3)
    }

    /// Same orientation, new anchor.
    pub fn with_anchor(&self, anchor: &Vec3) -> Self {
        let mut matrix = self.matrix;
        matrix[(0, 3)] = anchor.x;
        matrix[(1, 3)] = anchor.y;
        matrix[(2, 3)] = anchor.z;
        Self { matrix }
    }

    /// Patient position of the in-plane offset `(u, v)` from the anchor,
    /// in patient units along the row and column directions.
    pub fn point_at(&self, u: f64, v: f64) -> Vec3 {
        self.anchor() + self.row_cosines() * u + self.column_cosines() * v
    }

    /// Rotate the basis by `angle` radians about `axis` (a patient-space
    /// direction). The anchor stays where it is.
    pub fn rotate(&self, axis: &Vec3, angle: f64) -> Result<Self, MprError> {
        let rotation = rotation_about_axis(axis, angle).ok_or(MprError::DegenerateAxes)?;
        let mut matrix = rotation * self.matrix;
        matrix.set_column(3, &self.matrix.column(3));
        Ok(Self { matrix })
    }

    /// Rotate about the normal through the anchor.
    pub fn rotate_in_plane(&self, angle: f64) -> Result<Self, MprError> {
        self.rotate(&self.normal(), angle)
    }

    /// Rotate the whole plane, anchor included, about the line through
    /// `pivot` along `axis`.
    pub fn rotate_about_point(
        &self,
        axis: &Vec3,
        angle: f64,
        pivot: &Vec3,
    ) -> Result<Self, MprError> {
        let rotation = rotation_about_axis(axis, angle).ok_or(MprError::DegenerateAxes)?;
        let about_pivot = translation(pivot) * rotation * translation(&-pivot);
        Ok(Self {
            matrix: about_pivot * self.matrix,
        })
    }
}
