use std::sync::Arc;

use thiserror::Error;

use crate::math::Vec3;

#[derive(Debug, Error)]
pub enum MprError {
    #[error("Series contains no slices")]
    EmptySeries,

    #[error("{bits_allocated} bit images are not supported (signed: {signed})")]
    UnsupportedBitDepth { bits_allocated: u16, signed: bool },

    #[error("Multi component images are not supported ({components} samples per pixel)")]
    MultiComponent { components: u16 },

    #[error("Oblique slice stacks are not supported (normal {normal:?})")]
    ObliqueOrientation { normal: Vec3 },

    #[error("Slice {slice_id} belongs to frame of reference {found}, expected {expected}")]
    FrameOfReferenceMismatch {
        slice_id: String,
        expected: String,
        found: String,
    },

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("Slice {slice_id} has {found} pixels, expected {expected}")]
    PixelCountMismatch {
        slice_id: String,
        expected: usize,
        found: usize,
    },

    #[error("Slice {slice_id} pixel type differs from the series pixel type")]
    PixelTypeMismatch { slice_id: String },

    #[error("Row and column cosines are not orthonormal")]
    NonOrthonormal,

    #[error("Reslice axes are degenerate: row and column directions are parallel")]
    DegenerateAxes,

    #[error("Only 2D reslicing is supported, requested {0}D output")]
    UnsupportedDimensionality(usize),

    #[error("Planes are {angle} rad apart, too close for a reference line")]
    PlanesTooClose { angle: f64 },

    #[error("Invalid MPR image id: {0}")]
    InvalidImageId(String),

    #[error("Metadata module {module} unavailable for {slice_id}")]
    MissingMetadata {
        module: &'static str,
        slice_id: String,
    },

    #[error("Failed to load slice {slice_id}: {reason}")]
    Load { slice_id: String, reason: String },

    #[error("Gave up waiting for {what} after {attempts} attempts")]
    Timeout { what: String, attempts: u32 },

    #[error("Volume for series {series_id} is unavailable")]
    VolumeUnavailable {
        series_id: String,
        #[source]
        source: Arc<MprError>,
    },

    #[error("Series {0} is not registered")]
    UnknownSeries(String),

    #[error("Unknown view {0}")]
    UnknownView(u64),

    #[error("View {0} is disabled")]
    ViewDisabled(u64),

    #[error("View {0} displays no image with a known plane")]
    NoImagePlane(u64),

    #[error("View {0} does not display a synchronised volume")]
    NotSynchronized(u64),

    #[error("Reslice task failed: {0}")]
    ResliceTask(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),
}
