//! Reference lines: where one image plane cuts through another image.

use std::f64::consts::PI;

use log::warn;

use crate::error::MprError;
use crate::mapping::{image_to_patient, patient_to_image};
use crate::math::{Vec2, Vec3, angle_between, dot};
use crate::plane::ImagePlane;

/// A segment in target image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReferenceLine {
    pub start: Vec2,
    pub end: Vec2,
}

/// Segment along which `reference` intersects the image of `target`.
///
/// Planes whose normals are closer than `min_angle` radians (either
/// direction) are rejected with [`MprError::PlanesTooClose`]: the line
/// would be numerically meaningless. `Ok(None)` means the planes are in
/// different frames of reference or the intersection misses the target
/// image.
pub fn reference_line(
    target: &ImagePlane,
    reference: &ImagePlane,
    min_angle: f64,
) -> Result<Option<ReferenceLine>, MprError> {
    if !target.same_frame_of_reference(reference) {
        return Ok(None);
    }
    let reference_normal = reference.normal();
    let angle = angle_between(&target.normal(), &reference_normal);
    let angle = angle.min(PI - angle);
    if angle < min_angle {
        warn!("{:.1} degrees is too small for reference lines", angle.to_degrees());
        return Err(MprError::PlanesTooClose { angle });
    }

    let (width, height) = (target.columns as f64, target.rows as f64);
    let corners = [
        Vec2::new(0.0, 0.0),
        Vec2::new(width, 0.0),
        Vec2::new(width, height),
        Vec2::new(0.0, height),
    ]
    .map(|corner| image_to_patient(&corner, target));

    let signed_distance = |p: &Vec3| dot(&(p - reference.position), &reference_normal);
    let mut crossings: Vec<Vec3> = Vec::with_capacity(4);
    for i in 0..4 {
        let (a, b) = (corners[i], corners[(i + 1) % 4]);
        let (da, db) = (signed_distance(&a), signed_distance(&b));
        if da * db > 0.0 || da == db {
            continue;
        }
        let point = a + (b - a) * (da / (da - db));
        if crossings.iter().all(|c| (c - point).norm() > 1e-9) {
            crossings.push(point);
        }
    }

    let farthest = crossings
        .iter()
        .enumerate()
        .flat_map(|(i, a)| crossings[i + 1..].iter().map(move |b| (a, b)))
        .max_by(|(a1, b1), (a2, b2)| (*a1 - *b1).norm().total_cmp(&(*a2 - *b2).norm()));

    Ok(farthest.map(|(start, end)| ReferenceLine {
        start: patient_to_image(start, target),
        end: patient_to_image(end, target),
    }))
}
