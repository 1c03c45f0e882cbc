use std::fmt;

use crate::math::{Vec3, vec3};

/// Patient direction a slice stack advances along, as DICOM labels it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatientDirection {
    Left,
    Right,
    Anterior,
    Posterior,
    Superior,
    Inferior,
}

impl PatientDirection {
    /// Classify a direction vector by its dominant component.
    ///
    /// DICOM patient space is LPS: +x is left, +y is posterior, +z is superior.
    pub fn from_dominant(v: &Vec3, axis: usize) -> Self {
        let positive = v[axis] >= 0.0;
        match (axis, positive) {
            (0, true) => PatientDirection::Left,
            (0, false) => PatientDirection::Right,
            (1, true) => PatientDirection::Posterior,
            (1, false) => PatientDirection::Anterior,
            (_, true) => PatientDirection::Superior,
            (_, false) => PatientDirection::Inferior,
        }
    }

    /// Patient axis index: 0 = L/R, 1 = A/P, 2 = S/I.
    pub fn axis_index(&self) -> usize {
        match self {
            PatientDirection::Left | PatientDirection::Right => 0,
            PatientDirection::Anterior | PatientDirection::Posterior => 1,
            PatientDirection::Superior | PatientDirection::Inferior => 2,
        }
    }

    pub fn label(&self) -> char {
        match self {
            PatientDirection::Left => 'L',
            PatientDirection::Right => 'R',
            PatientDirection::Anterior => 'A',
            PatientDirection::Posterior => 'P',
            PatientDirection::Superior => 'S',
            PatientDirection::Inferior => 'I',
        }
    }
}

impl fmt::Display for PatientDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The three standard reformation planes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StandardPlane {
    Axial,
    Coronal,
    Sagittal,
}

impl StandardPlane {
    /// Row and column cosines of the plane in LPS patient space.
    pub fn cosines(&self) -> (Vec3, Vec3) {
        match self {
            StandardPlane::Axial => (vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0)),
            StandardPlane::Coronal => (vec3(1.0, 0.0, 0.0), vec3(0.0, 0.0, -1.0)),
            StandardPlane::Sagittal => (vec3(0.0, 1.0, 0.0), vec3(0.0, 0.0, -1.0)),
        }
    }

    pub fn all() -> [StandardPlane; 3] {
        [
            StandardPlane::Axial,
            StandardPlane::Coronal,
            StandardPlane::Sagittal,
        ]
    }
}

impl fmt::Display for StandardPlane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StandardPlane::Axial => "axial",
            StandardPlane::Coronal => "coronal",
            StandardPlane::Sagittal => "sagittal",
        };
        write!(f, "{name}")
    }
}

/// Stored pixel layout of a series. Only 16-bit greyscale is accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelRepresentation {
    Unsigned16,
    Signed16,
}

impl PixelRepresentation {
    pub fn is_signed(&self) -> bool {
        matches!(self, PixelRepresentation::Signed16)
    }
}
