//! Through-plane (z) axis analysis of a slice stack.

use std::cmp::Ordering;

use log::debug;

use crate::config::MprConfig;
use crate::enums::PatientDirection;
use crate::error::MprError;
use crate::math::{Vec3, cross, dominant_axis};
use crate::plane::ImagePlane;

/// Where and how far apart the slices of a stack lie along their scan axis.
#[derive(Clone, Debug, PartialEq)]
pub struct ZAxis {
    pub direction: PatientDirection,
    /// 0 = L/R, 1 = A/P, 2 = S/I.
    pub axis_index: usize,
    /// Mean distance between consecutive sorted positions.
    pub spacing: f64,
    /// Slice positions along `axis_index`, ascending.
    pub positions: Vec<f64>,
    /// Full patient position of the slice with the smallest position.
    pub origin: Vec3,
    /// Destination slice index for each input plane, in input order.
    pub ranks: Vec<usize>,
}

/// Classify a slice normal to the patient direction it is most aligned with.
///
/// Normals with no clearly dominant component are oblique and rejected.
pub fn determine_orientation(
    normal: &Vec3,
    config: &MprConfig,
) -> Result<PatientDirection, MprError> {
    let length = normal.norm();
    if length <= config.geometry_epsilon {
        return Err(MprError::DegenerateAxes);
    }
    let unit = normal / length;
    let axis = dominant_axis(&unit);
    if unit[axis].abs() < config.orientation_dominance {
        return Err(MprError::ObliqueOrientation { normal: *normal });
    }
    Ok(PatientDirection::from_dominant(&unit, axis))
}

/// Analyse the stack described by `planes` (in any order).
///
/// The scan axis is derived from the first plane's cosines. A single slice
/// has no neighbour to measure against, so its spacing falls back to the
/// mean of its in-plane pixel spacings.
pub fn compute_z_axis(planes: &[ImagePlane], config: &MprConfig) -> Result<ZAxis, MprError> {
    let first = planes.first().ok_or(MprError::EmptySeries)?;
    let normal = cross(&first.column_cosines, &first.row_cosines);
    let direction = determine_orientation(&normal, config)?;
    let axis_index = direction.axis_index();

    let mut order: Vec<usize> = (0..planes.len()).collect();
    order.sort_by(|&a, &b| {
        planes[a].position[axis_index]
            .partial_cmp(&planes[b].position[axis_index])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    let positions: Vec<f64> = order
        .iter()
        .map(|&i| planes[i].position[axis_index])
        .collect();
    let mut ranks = vec![0; planes.len()];
    for (rank, &i) in order.iter().enumerate() {
        ranks[i] = rank;
    }

    let spacing = if positions.len() == 1 {
        (first.row_pixel_spacing + first.column_pixel_spacing) / 2.0
    } else {
        mean_difference(&positions)
    };
    if !(spacing > 0.0) {
        return Err(MprError::InconsistentDimensions);
    }

    let origin = planes[order[0]].position;
    debug!(
        "z axis {direction} (index {axis_index}): {} slices, spacing {spacing}",
        positions.len()
    );

    Ok(ZAxis {
        direction,
        axis_index,
        spacing,
        positions,
        origin,
        ranks,
    })
}

fn mean_difference(sorted: &[f64]) -> f64 {
    let diffs: Vec<f64> = sorted.windows(2).map(|w| w[1] - w[0]).collect();
    diffs.iter().sum::<f64>() / diffs.len() as f64
}
