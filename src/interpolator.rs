use rayon::prelude::*;

use crate::{
    axes::ResliceAxes,
    error::MprError,
    mapping::physical_span,
    math::Vec3,
    source::PixelBuffer,
    volume::{Volume, VoxelData},
};

/// Output of a resampler: one 2D grid cut from a volume.
#[derive(Clone, Debug, PartialEq)]
pub struct ResampledSlice {
    pub pixels: PixelBuffer,
    pub columns: usize,
    pub rows: usize,
    /// Distance between adjacent columns.
    pub column_spacing: f64,
    /// Distance between adjacent rows.
    pub row_spacing: f64,
    /// Smallest and largest output value, background included.
    pub range: (f64, f64),
}

/// Samples a volume along the plane described by reslice axes.
///
/// Output column `i`, row `j` lies at `anchor + i * column_spacing * row
/// + j * row_spacing * column`. Samples outside the volume take the
/// `background` value.
pub trait Resampler: Send + Sync {
    fn reslice(
        &self,
        volume: &Volume,
        axes: &ResliceAxes,
        output_dimensionality: usize,
        background: f64,
    ) -> Result<ResampledSlice, MprError>;
}

/// Nearest-neighbour resampler on the CPU.
///
/// The output is isotropic at the volume's finest spacing and spans the
/// volume's physical extent along the row and column directions.
#[derive(Clone, Copy, Debug, Default)]
pub struct NearestNeighborResampler;

impl NearestNeighborResampler {
    /// Output `(columns, rows, spacing)` for `axes` over `volume`.
    pub fn output_grid(volume: &Volume, axes: &ResliceAxes) -> (usize, usize, f64) {
        let spacing = volume.spacing();
        let min_spacing = spacing.x.min(spacing.y).min(spacing.z);
        let edges = volume.extent_edges();
        let samples = |direction: Vec3| {
            (physical_span(&direction, &edges) / min_spacing).round() as usize + 1
        };
        (samples(axes.row_cosines()), samples(axes.column_cosines()), min_spacing)
    }

    fn sample_grid<T: Send>(
        volume: &Volume,
        axes: &ResliceAxes,
        (columns, rows, spacing): (usize, usize, f64),
        convert: impl Fn(Option<f64>) -> T + Sync,
    ) -> Vec<T> {
        (0..rows)
            .into_par_iter()
            .flat_map_iter(|j| {
                let convert = &convert;
                (0..columns).map(move |i| {
                    let point = axes.point_at(i as f64 * spacing, j as f64 * spacing);
                    convert(volume.sample_nearest(&point))
                })
            })
            .collect()
    }
}

impl Resampler for NearestNeighborResampler {
    fn reslice(
        &self,
        volume: &Volume,
        axes: &ResliceAxes,
        output_dimensionality: usize,
        background: f64,
    ) -> Result<ResampledSlice, MprError> {
        if output_dimensionality != 2 {
            return Err(MprError::UnsupportedDimensionality(output_dimensionality));
        }
        let grid = Self::output_grid(volume, axes);
        let pixels = match volume.data() {
            VoxelData::Unsigned(_) => {
                let fill = background.round().clamp(0.0, u16::MAX as f64) as u16;
                PixelBuffer::Unsigned(Self::sample_grid(volume, axes, grid, |v| {
                    v.map_or(fill, |v| v as u16)
                }))
            }
            VoxelData::Signed(_) => {
                let fill = background.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16;
                PixelBuffer::Signed(Self::sample_grid(volume, axes, grid, |v| {
                    v.map_or(fill, |v| v as i16)
                }))
            }
        };
        let range = pixels.range().ok_or(MprError::InconsistentDimensions)?;
        let (columns, rows, spacing) = grid;
        Ok(ResampledSlice {
            pixels,
            columns,
            rows,
            column_spacing: spacing,
            row_spacing: spacing,
            range,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::vec3;
    use crate::volume::tests::ramp_volume;

    #[test]
    fn axial_reslice_reproduces_native_slice() {
        let volume = ramp_volume([4, 3, 2], vec3(1.0, 1.0, 1.0), Vec3::zeros());
        let axes = ResliceAxes::new(
            &vec3(1.0, 0.0, 0.0),
            &vec3(0.0, 1.0, 0.0),
            &vec3(0.0, 0.0, 1.0),
            1e-6,
        )
        .unwrap();
        let slice = NearestNeighborResampler.reslice(&volume, &axes, 2, 0.0).unwrap();
        assert_eq!((slice.columns, slice.rows), (4, 3));
        assert_eq!(
            slice.pixels,
            PixelBuffer::Unsigned(vec![100, 101, 102, 103, 110, 111, 112, 113, 120, 121, 122, 123])
        );
        assert_eq!(slice.range, (100.0, 123.0));
    }

    #[test]
    fn coronal_reslice_walks_slices_downwards() {
        let volume = ramp_volume([2, 2, 3], vec3(1.0, 1.0, 1.0), Vec3::zeros());
        // row along +x, column along -z, anchored at the top slice, row 1
        let axes = ResliceAxes::new(
            &vec3(1.0, 0.0, 0.0),
            &vec3(0.0, 0.0, -1.0),
            &vec3(0.0, 1.0, 2.0),
            1e-6,
        )
        .unwrap();
        let slice = NearestNeighborResampler.reslice(&volume, &axes, 2, 0.0).unwrap();
        assert_eq!((slice.columns, slice.rows), (2, 3));
        assert_eq!(
            slice.pixels,
            PixelBuffer::Unsigned(vec![210, 211, 110, 111, 10, 11])
        );
    }

    #[test]
    fn outside_samples_take_background() {
        let volume = ramp_volume([2, 2, 2], vec3(1.0, 1.0, 1.0), Vec3::zeros());
        let axes = ResliceAxes::new(
            &vec3(1.0, 0.0, 0.0),
            &vec3(0.0, 1.0, 0.0),
            &vec3(1.0, 0.0, 0.0),
            1e-6,
        )
        .unwrap();
        let slice = NearestNeighborResampler.reslice(&volume, &axes, 2, 7.0).unwrap();
        assert_eq!(slice.pixels, PixelBuffer::Unsigned(vec![1, 7, 11, 7]));
    }

    #[test]
    fn volume_output_is_rejected() {
        let volume = ramp_volume([2, 2, 2], vec3(1.0, 1.0, 1.0), Vec3::zeros());
        let axes =
            ResliceAxes::new(&vec3(1.0, 0.0, 0.0), &vec3(0.0, 1.0, 0.0), &Vec3::zeros(), 1e-6)
                .unwrap();
        assert!(matches!(
            NearestNeighborResampler.reslice(&volume, &axes, 3, 0.0),
            Err(MprError::UnsupportedDimensionality(3))
        ));
    }
}
