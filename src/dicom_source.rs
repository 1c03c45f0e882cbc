//! Slice metadata and pixel data read from DICOM files.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use dicom::{
    core::Tag,
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::PixelDecoder,
};
use dicom_dictionary_std::tags;
use futures::{FutureExt, future::BoxFuture};
use log::{debug, warn};

use crate::{
    enums::PixelRepresentation,
    error::MprError,
    math::vec3,
    plane::{ImagePixelInfo, ImagePlane},
    source::{MetadataProvider, PixelBuffer, PixelLoader},
};

/// A [`MetadataProvider`] and [`PixelLoader`] over DICOM files held in memory.
///
/// Slice ids are the file paths. Multi-frame objects contribute their first
/// frame only.
pub struct DicomFileSource {
    objects: BTreeMap<String, FileDicomObject<InMemDicomObject>>,
}

impl DicomFileSource {
    pub fn from_dicom_objects(
        objects: impl IntoIterator<Item = (String, FileDicomObject<InMemDicomObject>)>,
    ) -> Self {
        Self {
            objects: objects.into_iter().collect(),
        }
    }

    /// Read the given files.
    pub fn open_files(paths: &[impl AsRef<Path>]) -> Result<Self, MprError> {
        let objects: Result<Vec<_>, MprError> = paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                Ok((path.display().to_string(), open_file(path)?))
            })
            .collect();
        Ok(Self::from_dicom_objects(objects?))
    }

    /// Read every ".dcm" file of a directory.
    pub fn open_directory(path: impl AsRef<Path>) -> Result<Self, MprError> {
        let paths: Vec<PathBuf> = fs::read_dir(path.as_ref())?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(MprError::EmptySeries);
        }
        debug!("reading {} DICOM files from {}", paths.len(), path.as_ref().display());
        Self::open_files(&paths)
    }

    /// All slice ids, ordered by path. Position order is not implied.
    pub fn slice_ids(&self) -> Vec<String> {
        self.objects.keys().cloned().collect()
    }

    fn multi_float(object: &InMemDicomObject, tag: Tag) -> Option<Vec<f64>> {
        object.element(tag).ok()?.to_multi_float64().ok()
    }

    fn int(object: &InMemDicomObject, tag: Tag) -> Option<u16> {
        object.element(tag).ok()?.to_int::<u16>().ok()
    }

    fn decode(
        object: &FileDicomObject<InMemDicomObject>,
        pixel_count: usize,
        representation: PixelRepresentation,
    ) -> Result<PixelBuffer, String> {
        let decoded = object.decode_pixel_data().map_err(|e| e.to_string())?;
        let frame = decoded
            .data()
            .get(..pixel_count * 2)
            .ok_or_else(|| format!("pixel data shorter than {pixel_count} pixels"))?;
        Ok(match representation {
            PixelRepresentation::Unsigned16 => {
                PixelBuffer::Unsigned(bytemuck::pod_collect_to_vec(frame))
            }
            PixelRepresentation::Signed16 => {
                PixelBuffer::Signed(bytemuck::pod_collect_to_vec(frame))
            }
        })
    }
}

impl MetadataProvider for DicomFileSource {
    fn image_plane(&self, slice_id: &str) -> Option<ImagePlane> {
        let object = self.objects.get(slice_id)?;
        let orientation = Self::multi_float(object, tags::IMAGE_ORIENTATION_PATIENT)?;
        let position = Self::multi_float(object, tags::IMAGE_POSITION_PATIENT)?;
        let pixel_spacing = Self::multi_float(object, tags::PIXEL_SPACING)?;
        if orientation.len() < 6 || position.len() < 3 || pixel_spacing.len() < 2 {
            warn!("{slice_id} has malformed image plane attributes");
            return None;
        }
        let frame_of_reference_uid = object
            .element(tags::FRAME_OF_REFERENCE_UID)
            .ok()
            .and_then(|e| e.to_str().ok())
            .map(|uid| uid.trim_end_matches('\0').trim().to_string())
            .unwrap_or_default();

        Some(ImagePlane {
            row_cosines: vec3(orientation[0], orientation[1], orientation[2]),
            column_cosines: vec3(orientation[3], orientation[4], orientation[5]),
            position: vec3(position[0], position[1], position[2]),
            // Pixel Spacing is (between rows, between columns)
            row_pixel_spacing: pixel_spacing[0],
            column_pixel_spacing: pixel_spacing[1],
            columns: Self::int(object, tags::COLUMNS)? as usize,
            rows: Self::int(object, tags::ROWS)? as usize,
            frame_of_reference_uid,
        })
    }

    fn image_pixel(&self, slice_id: &str) -> Option<ImagePixelInfo> {
        let object = self.objects.get(slice_id)?;
        Some(ImagePixelInfo {
            bits_allocated: Self::int(object, tags::BITS_ALLOCATED)?,
            pixel_representation: Self::int(object, tags::PIXEL_REPRESENTATION).unwrap_or(0),
            samples_per_pixel: Self::int(object, tags::SAMPLES_PER_PIXEL).unwrap_or(1),
        })
    }
}

impl PixelLoader for DicomFileSource {
    fn load<'a>(&'a self, slice_id: &'a str) -> BoxFuture<'a, Result<PixelBuffer, MprError>> {
        async move {
            let load_error = |reason: String| MprError::Load {
                slice_id: slice_id.to_string(),
                reason,
            };
            let object = self
                .objects
                .get(slice_id)
                .ok_or_else(|| load_error("unknown slice".to_string()))?;
            let info = self
                .image_pixel(slice_id)
                .ok_or_else(|| load_error("missing pixel attributes".to_string()))?;
            let representation = info.representation()?;
            let rows = Self::int(object, tags::ROWS).unwrap_or(0) as usize;
            let columns = Self::int(object, tags::COLUMNS).unwrap_or(0) as usize;
            Self::decode(object, rows * columns, representation).map_err(load_error)
        }
        .boxed()
    }
}
