use image::{ImageBuffer, Luma};
use log::debug;
use rayon::prelude::*;

use crate::{
    axes::ResliceAxes,
    config::MprConfig,
    error::MprError,
    interpolator::Resampler,
    plane::ImagePlane,
    source::PixelBuffer,
    volume::Volume,
};

/// Linear VOI window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowLevel {
    pub center: f64,
    pub width: f64,
}

impl WindowLevel {
    /// The window covering `[min, max]`.
    pub fn from_range(min: f64, max: f64) -> Self {
        Self {
            center: (max + min) / 2.0,
            width: max - min,
        }
    }

    #[inline]
    fn apply(&self, value: f64) -> u8 {
        if self.width <= 0.0 {
            return if value > self.center { 255 } else { 0 };
        }
        let lower = self.center - self.width / 2.0;
        (((value - lower) / self.width).clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

/// A resliced image together with the plane it lies in.
///
/// `plane` describes the result like any acquired slice, so it can be fed
/// back into point mapping or used as the source of another reslice.
#[derive(Clone, Debug, PartialEq)]
pub struct ResliceResult {
    pub pixels: PixelBuffer,
    pub min_pixel_value: f64,
    pub max_pixel_value: f64,
    pub window: WindowLevel,
    pub plane: ImagePlane,
}

impl ResliceResult {
    pub fn columns(&self) -> usize {
        self.plane.columns
    }

    pub fn rows(&self) -> usize {
        self.plane.rows
    }

    /// Apply the window and convert to an 8-bit greyscale image.
    pub fn to_luma_image(&self) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
        let window = self.window;
        let pixel_data: Vec<u8> = match &self.pixels {
            PixelBuffer::Unsigned(pixels) => pixels
                .par_iter()
                .map(|&v| window.apply(v as f64))
                .collect(),
            PixelBuffer::Signed(pixels) => pixels
                .par_iter()
                .map(|&v| window.apply(v as f64))
                .collect(),
        };
        ImageBuffer::from_raw(self.columns() as u32, self.rows() as u32, pixel_data)
    }
}

/// Cut a 2D image out of `volume` along `axes`.
///
/// Without an explicit `window` the result's window covers its full
/// intensity range.
pub fn reslice_volume(
    volume: &Volume,
    axes: &ResliceAxes,
    resampler: &dyn Resampler,
    window: Option<WindowLevel>,
    config: &MprConfig,
) -> Result<ResliceResult, MprError> {
    if axes.normal().norm() <= config.geometry_epsilon {
        return Err(MprError::DegenerateAxes);
    }

    let slice = resampler.reslice(volume, axes, 2, config.background)?;
    if slice.pixels.len() != slice.columns * slice.rows {
        return Err(MprError::InconsistentDimensions);
    }
    let (min, max) = slice.range;
    debug!(
        "resliced {} x {} at {:?}, range [{min}, {max}]",
        slice.columns,
        slice.rows,
        axes.anchor()
    );

    let plane = ImagePlane {
        row_cosines: axes.row_cosines(),
        column_cosines: axes.column_cosines(),
        position: axes.anchor(),
        row_pixel_spacing: slice.row_spacing,
        column_pixel_spacing: slice.column_spacing,
        columns: slice.columns,
        rows: slice.rows,
        frame_of_reference_uid: volume.geometry().frame_of_reference_uid.clone(),
    };

    Ok(ResliceResult {
        pixels: slice.pixels,
        min_pixel_value: min,
        max_pixel_value: max,
        window: window.unwrap_or_else(|| WindowLevel::from_range(min, max)),
        plane,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolator::{NearestNeighborResampler, ResampledSlice};
    use crate::mapping::{image_to_patient, patient_to_image};
    use crate::math::{Vec2, Vec3, vec3};
    use crate::volume::tests::ramp_volume;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingResampler(AtomicUsize);

    impl Resampler for CountingResampler {
        fn reslice(
            &self,
            _volume: &Volume,
            _axes: &ResliceAxes,
            _output_dimensionality: usize,
            _background: f64,
        ) -> Result<ResampledSlice, MprError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(ResampledSlice {
                pixels: PixelBuffer::Signed(vec![-10, 30]),
                columns: 2,
                rows: 1,
                column_spacing: 0.5,
                row_spacing: 2.0,
                range: (-10.0, 30.0),
            })
        }
    }

    #[test]
    fn synthesized_plane_comes_from_axes_and_spacing() {
        let volume = ramp_volume([2, 2, 2], vec3(1.0, 1.0, 1.0), Vec3::zeros());
        let axes = ResliceAxes::new(
            &vec3(0.0, 1.0, 0.0),
            &vec3(0.0, 0.0, -1.0),
            &vec3(4.0, 5.0, 6.0),
            1e-6,
        )
        .unwrap();
        let resampler = CountingResampler(AtomicUsize::new(0));
        let result =
            reslice_volume(&volume, &axes, &resampler, None, &MprConfig::default()).unwrap();

        assert_eq!(result.plane.row_cosines, vec3(0.0, 1.0, 0.0));
        assert_eq!(result.plane.column_cosines, vec3(0.0, 0.0, -1.0));
        assert_eq!(result.plane.position, vec3(4.0, 5.0, 6.0));
        assert_eq!(result.plane.column_pixel_spacing, 0.5);
        assert_eq!(result.plane.row_pixel_spacing, 2.0);
        assert_eq!(result.window, WindowLevel { center: 10.0, width: 40.0 });
    }

    #[test]
    fn explicit_window_is_kept() {
        let volume = ramp_volume([2, 2, 2], vec3(1.0, 1.0, 1.0), Vec3::zeros());
        let axes =
            ResliceAxes::new(&vec3(1.0, 0.0, 0.0), &vec3(0.0, 1.0, 0.0), &Vec3::zeros(), 1e-6)
                .unwrap();
        let window = WindowLevel { center: 40.0, width: 400.0 };
        let resampler = CountingResampler(AtomicUsize::new(0));
        let config = MprConfig::default();
        let result = reslice_volume(&volume, &axes, &resampler, Some(window), &config).unwrap();
        assert_eq!(result.window, window);
    }

    #[test]
    fn result_pixels_map_back_into_the_volume() {
        let volume = ramp_volume([3, 3, 3], vec3(1.0, 1.0, 1.0), vec3(-1.0, -1.0, -1.0));
        let axes = ResliceAxes::new(
            &vec3(0.0, 1.0, 0.0),
            &vec3(0.0, 0.0, -1.0),
            &vec3(0.0, -1.0, 1.0),
            1e-6,
        )
        .unwrap();
        let result = reslice_volume(
            &volume,
            &axes,
            &NearestNeighborResampler,
            None,
            &MprConfig::default(),
        )
        .unwrap();

        let pixel = Vec2::new(2.0, 1.0);
        let patient = image_to_patient(&pixel, &result.plane);
        let index = pixel.y as usize * result.columns() + pixel.x as usize;
        assert_eq!(result.pixels.get(index), volume.sample_nearest(&patient));
        assert!((patient_to_image(&patient, &result.plane) - pixel).norm() < 1e-9);
    }

    #[test]
    fn luma_image_applies_window() {
        let result = ResliceResult {
            pixels: PixelBuffer::Signed(vec![-100, 0, 100, 200]),
            min_pixel_value: -100.0,
            max_pixel_value: 200.0,
            window: WindowLevel { center: 50.0, width: 100.0 },
            plane: ImagePlane {
                row_cosines: vec3(1.0, 0.0, 0.0),
                column_cosines: vec3(0.0, 1.0, 0.0),
                position: Vec3::zeros(),
                row_pixel_spacing: 1.0,
                column_pixel_spacing: 1.0,
                columns: 2,
                rows: 2,
                frame_of_reference_uid: String::new(),
            },
        };
        let image = result.to_luma_image().unwrap();
        assert_eq!(image.into_raw(), vec![0, 0, 255, 255]);
    }
}
