use crate::enums::PixelRepresentation;
use crate::error::MprError;
use crate::math::{Vec3, cross, dot, is_unit};

/// Placement of one 2D image in patient space (the DICOM image plane module).
///
/// `row_cosines` points along increasing column index, `column_cosines`
/// along increasing row index. `row_pixel_spacing` is the distance between
/// adjacent rows, `column_pixel_spacing` the distance between adjacent
/// columns.
#[derive(Clone, Debug, PartialEq)]
pub struct ImagePlane {
    pub row_cosines: Vec3,
    pub column_cosines: Vec3,
    /// Patient position of the centre of the top-left pixel.
    pub position: Vec3,
    pub row_pixel_spacing: f64,
    pub column_pixel_spacing: f64,
    pub columns: usize,
    pub rows: usize,
    pub frame_of_reference_uid: String,
}

impl ImagePlane {
    pub fn normal(&self) -> Vec3 {
        cross(&self.row_cosines, &self.column_cosines)
    }

    /// Check the cosines are unit length and orthogonal and the grid is
    /// non-empty with positive spacing. Nothing is corrected.
    pub fn validate(&self, epsilon: f64) -> Result<(), MprError> {
        let orthonormal = is_unit(&self.row_cosines, epsilon)
            && is_unit(&self.column_cosines, epsilon)
            && dot(&self.row_cosines, &self.column_cosines).abs() <= epsilon;
        if !orthonormal {
            return Err(MprError::NonOrthonormal);
        }
        if self.rows == 0
            || self.columns == 0
            || self.row_pixel_spacing <= 0.0
            || self.column_pixel_spacing <= 0.0
        {
            return Err(MprError::InconsistentDimensions);
        }
        Ok(())
    }

    /// Width and height of the image in patient units.
    pub fn physical_size(&self) -> (f64, f64) {
        (
            self.columns as f64 * self.column_pixel_spacing,
            self.rows as f64 * self.row_pixel_spacing,
        )
    }

    pub fn same_frame_of_reference(&self, other: &ImagePlane) -> bool {
        self.frame_of_reference_uid == other.frame_of_reference_uid
    }
}

/// Pixel layout attributes (the DICOM image pixel module).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImagePixelInfo {
    pub bits_allocated: u16,
    /// 0 = unsigned, 1 = two's complement.
    pub pixel_representation: u16,
    pub samples_per_pixel: u16,
}

impl ImagePixelInfo {
    /// Reject anything other than single-sample 16-bit data.
    pub fn representation(&self) -> Result<PixelRepresentation, MprError> {
        if self.samples_per_pixel > 1 {
            return Err(MprError::MultiComponent {
                components: self.samples_per_pixel,
            });
        }
        let signed = self.pixel_representation == 1;
        match (self.bits_allocated, signed) {
            (16, false) => Ok(PixelRepresentation::Unsigned16),
            (16, true) => Ok(PixelRepresentation::Signed16),
            (bits_allocated, signed) => Err(MprError::UnsupportedBitDepth {
                bits_allocated,
                signed,
            }),
        }
    }
}
