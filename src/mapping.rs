//! Conversions between image pixel coordinates and patient coordinates.
//!
//! Row cosines describe the direction of increasing *column* index, so they
//! scale with the column spacing; column cosines scale with the row spacing.

use crate::math::{Vec2, Vec3, dot};
use crate::plane::ImagePlane;

/// Patient coordinate of the pixel position `point` (`x` = column, `y` = row).
pub fn image_to_patient(point: &Vec2, plane: &ImagePlane) -> Vec3 {
    plane.position
        + plane.row_cosines * (point.x * plane.column_pixel_spacing)
        + plane.column_cosines * (point.y * plane.row_pixel_spacing)
}

/// Project a patient coordinate onto `plane` and express it in pixels.
///
/// Any offset along the plane normal is dropped.
pub fn patient_to_image(point: &Vec3, plane: &ImagePlane) -> Vec2 {
    let offset = point - plane.position;
    Vec2::new(
        dot(&offset, &plane.row_cosines) / plane.column_pixel_spacing,
        dot(&offset, &plane.column_cosines) / plane.row_pixel_spacing,
    )
}

/// Physical length covered along `direction` by a volume whose grid is
/// spanned by `edges` (see [`Volume::extent_edges`]).
///
/// This is the length of the projection of the grid onto `direction`, so
/// it follows the volume's own axes rather than the patient axes.
///
/// [`Volume::extent_edges`]: crate::volume::Volume::extent_edges
pub fn physical_span(direction: &Vec3, edges: &[Vec3; 3]) -> f64 {
    edges.iter().map(|edge| dot(direction, edge).abs()).sum()
}

/// Anchor (top-left) for a plane with the given cosines whose centre should
/// land on `center`.
pub fn top_left_for_center_of(
    row_cosines: &Vec3,
    column_cosines: &Vec3,
    center: &Vec3,
    edges: &[Vec3; 3],
) -> Vec3 {
    let row_span = physical_span(row_cosines, edges);
    let column_span = physical_span(column_cosines, edges);
    center - row_cosines * (0.5 * row_span) - column_cosines * (0.5 * column_span)
}

/// [`top_left_for_center_of`] using the orientation of `plane`.
pub fn top_left_for_center(plane: &ImagePlane, center: &Vec3, edges: &[Vec3; 3]) -> Vec3 {
    top_left_for_center_of(&plane.row_cosines, &plane.column_cosines, center, edges)
}
