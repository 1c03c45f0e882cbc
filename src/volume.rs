use ndarray::{Array3, ArrayView2, s};
use nalgebra::Matrix3;

use crate::enums::PixelRepresentation;
use crate::error::MprError;
use crate::math::{Vec3, vec3};
use crate::source::PixelBuffer;

/// Voxel storage, indexed `[slice, row, column]` (column fastest).
#[derive(Clone, Debug)]
pub enum VoxelData {
    Unsigned(Array3<u16>),
    Signed(Array3<i16>),
}

impl VoxelData {
    /// Zero-filled storage for `(columns, rows, slices)`.
    pub fn zeros(representation: PixelRepresentation, dimensions: [usize; 3]) -> Self {
        let shape = (dimensions[2], dimensions[1], dimensions[0]);
        match representation {
            PixelRepresentation::Unsigned16 => VoxelData::Unsigned(Array3::zeros(shape)),
            PixelRepresentation::Signed16 => VoxelData::Signed(Array3::zeros(shape)),
        }
    }

    pub fn representation(&self) -> PixelRepresentation {
        match self {
            VoxelData::Unsigned(_) => PixelRepresentation::Unsigned16,
            VoxelData::Signed(_) => PixelRepresentation::Signed16,
        }
    }

    /// Get the dimensions of the data (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        match self {
            VoxelData::Unsigned(data) => data.dim(),
            VoxelData::Signed(data) => data.dim(),
        }
    }

    /// Copy one 2D slice into slice `index`.
    pub fn insert_slice(
        &mut self,
        index: usize,
        slice_id: &str,
        pixels: &PixelBuffer,
    ) -> Result<(), MprError> {
        let (depth, height, width) = self.dim();
        if index >= depth {
            return Err(MprError::InconsistentDimensions);
        }
        if pixels.len() != height * width {
            return Err(MprError::PixelCountMismatch {
                slice_id: slice_id.to_string(),
                expected: height * width,
                found: pixels.len(),
            });
        }
        match (self, pixels) {
            (VoxelData::Unsigned(data), PixelBuffer::Unsigned(values)) => {
                let image = ArrayView2::from_shape((height, width), values.as_slice())
                    .map_err(|_| MprError::InconsistentDimensions)?;
                data.slice_mut(s![index, .., ..]).assign(&image);
            }
            (VoxelData::Signed(data), PixelBuffer::Signed(values)) => {
                let image = ArrayView2::from_shape((height, width), values.as_slice())
                    .map_err(|_| MprError::InconsistentDimensions)?;
                data.slice_mut(s![index, .., ..]).assign(&image);
            }
            _ => {
                return Err(MprError::PixelTypeMismatch {
                    slice_id: slice_id.to_string(),
                });
            }
        }
        Ok(())
    }

    #[inline]
    pub fn get(&self, column: usize, row: usize, slice: usize) -> Option<f64> {
        match self {
            VoxelData::Unsigned(data) => data.get([slice, row, column]).map(|&v| v as f64),
            VoxelData::Signed(data) => data.get([slice, row, column]).map(|&v| v as f64),
        }
    }
}

/// Placement of a volume's voxel grid in patient space.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeGeometry {
    /// Patient position of voxel (0, 0, 0).
    pub origin: Vec3,
    /// (column spacing, row spacing, inter-slice spacing).
    pub spacing: Vec3,
    pub row_cosines: Vec3,
    pub column_cosines: Vec3,
    /// Offset between consecutive slices per unit of spacing, its
    /// `through_plane_axis` component is 1.
    pub slice_direction: Vec3,
    pub through_plane_axis: usize,
    pub frame_of_reference_uid: String,
}

impl VolumeGeometry {
    /// A grid aligned with the patient axes, slices advancing along +z.
    pub fn axis_aligned(origin: Vec3, spacing: Vec3) -> Self {
        Self {
            origin,
            spacing,
            row_cosines: vec3(1.0, 0.0, 0.0),
            column_cosines: vec3(0.0, 1.0, 0.0),
            slice_direction: vec3(0.0, 0.0, 1.0),
            through_plane_axis: 2,
            frame_of_reference_uid: String::new(),
        }
    }
}

/// A 3D voxel grid assembled from one series.
#[derive(Clone, Debug)]
pub struct Volume {
    data: VoxelData,
    geometry: VolumeGeometry,
    index_to_patient: Matrix3<f64>,
    patient_to_index: Matrix3<f64>,
}

impl Volume {
    pub fn new(data: VoxelData, geometry: VolumeGeometry) -> Result<Self, MprError> {
        let (depth, height, width) = data.dim();
        if depth == 0 || height == 0 || width == 0 {
            return Err(MprError::EmptySeries);
        }
        if geometry.spacing.iter().any(|&s| !(s > 0.0)) {
            return Err(MprError::InconsistentDimensions);
        }
        let index_to_patient = Matrix3::from_columns(&[
            geometry.row_cosines * geometry.spacing.x,
            geometry.column_cosines * geometry.spacing.y,
            geometry.slice_direction * geometry.spacing.z,
        ]);
        let patient_to_index = index_to_patient
            .try_inverse()
            .ok_or(MprError::DegenerateAxes)?;
        Ok(Self {
            data,
            geometry,
            index_to_patient,
            patient_to_index,
        })
    }

    /// Get the dimensions of the volume (columns, rows, slices)
    pub fn dimensions(&self) -> [usize; 3] {
        let (depth, height, width) = self.data.dim();
        [width, height, depth]
    }

    /// Largest valid index per axis.
    pub fn extent(&self) -> [usize; 3] {
        self.dimensions().map(|d| d - 1)
    }

    pub fn spacing(&self) -> Vec3 {
        self.geometry.spacing
    }

    pub fn origin(&self) -> Vec3 {
        self.geometry.origin
    }

    pub fn through_plane_axis(&self) -> usize {
        self.geometry.through_plane_axis
    }

    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &VoxelData {
        &self.data
    }

    pub fn representation(&self) -> PixelRepresentation {
        self.data.representation()
    }

    /// Patient coordinate of a (possibly fractional) voxel index.
    pub fn index_to_patient(&self, index: &Vec3) -> Vec3 {
        self.geometry.origin + self.index_to_patient * index
    }

    /// Fractional voxel index of a patient coordinate.
    pub fn patient_to_index(&self, point: &Vec3) -> Vec3 {
        self.patient_to_index * (point - self.geometry.origin)
    }

    /// Patient-space vectors from voxel 0 to the last voxel along each
    /// index axis (columns, rows, slices).
    pub fn extent_edges(&self) -> [Vec3; 3] {
        let extent = self.extent();
        [0, 1, 2].map(|axis| self.index_to_patient.column(axis) * extent[axis] as f64)
    }

    /// Patient coordinate of the geometric centre of the grid.
    pub fn center(&self) -> Vec3 {
        let [x, y, z] = self.extent();
        self.index_to_patient(&vec3(x as f64 / 2.0, y as f64 / 2.0, z as f64 / 2.0))
    }

    /// Nearest voxel value at a patient coordinate, `None` outside the grid.
    pub fn sample_nearest(&self, point: &Vec3) -> Option<f64> {
        let index = self.patient_to_index(point);
        let [width, height, depth] = self.dimensions();
        let column = round_index(index.x, width)?;
        let row = round_index(index.y, height)?;
        let slice = round_index(index.z, depth)?;
        self.data.get(column, row, slice)
    }
}

#[inline]
fn round_index(value: f64, len: usize) -> Option<usize> {
    let rounded = value.round();
    if rounded >= 0.0 && rounded < len as f64 {
        Some(rounded as usize)
    } else {
        None
    }
}
