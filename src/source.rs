//! Collaborators that supply slice metadata and pixel data.

use futures::future::BoxFuture;
use log::debug;

use crate::enums::PixelRepresentation;
use crate::error::MprError;
use crate::plane::{ImagePixelInfo, ImagePlane};

pub const IMAGE_PLANE_MODULE: &str = "imagePlaneModule";
pub const IMAGE_PIXEL_MODULE: &str = "imagePixelModule";

/// A flat row-major (column fastest) greyscale pixel buffer.
#[derive(Clone, Debug, PartialEq)]
pub enum PixelBuffer {
    Unsigned(Vec<u16>),
    Signed(Vec<i16>),
}

impl PixelBuffer {
    pub fn len(&self) -> usize {
        match self {
            PixelBuffer::Unsigned(pixels) => pixels.len(),
            PixelBuffer::Signed(pixels) => pixels.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn representation(&self) -> PixelRepresentation {
        match self {
            PixelBuffer::Unsigned(_) => PixelRepresentation::Unsigned16,
            PixelBuffer::Signed(_) => PixelRepresentation::Signed16,
        }
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            PixelBuffer::Unsigned(pixels) => pixels.get(index).map(|&v| v as f64),
            PixelBuffer::Signed(pixels) => pixels.get(index).map(|&v| v as f64),
        }
    }

    /// Smallest and largest value, `None` when empty.
    pub fn range(&self) -> Option<(f64, f64)> {
        fn min_max<T: Copy + Into<f64>>(pixels: &[T]) -> Option<(f64, f64)> {
            pixels.iter().fold(None, |acc, &v| {
                let v: f64 = v.into();
                Some(match acc {
                    None => (v, v),
                    Some((min, max)) => (f64::min(min, v), f64::max(max, v)),
                })
            })
        }
        match self {
            PixelBuffer::Unsigned(pixels) => min_max(pixels),
            PixelBuffer::Signed(pixels) => min_max(pixels),
        }
    }
}

/// Metadata lookup keyed by slice (or MPR image) id.
pub trait MetadataProvider: Send + Sync {
    fn image_plane(&self, slice_id: &str) -> Option<ImagePlane>;

    fn image_pixel(&self, slice_id: &str) -> Option<ImagePixelInfo>;
}

/// Asynchronous pixel data source.
pub trait PixelLoader: Send + Sync {
    fn load<'a>(&'a self, slice_id: &'a str) -> BoxFuture<'a, Result<PixelBuffer, MprError>>;
}

/// Look up a metadata module, loading the slice once if the provider does
/// not know it yet. Many providers only populate metadata on load.
pub async fn try_get_metadata<T>(
    module: &'static str,
    slice_id: &str,
    loader: &dyn PixelLoader,
    lookup: impl Fn() -> Option<T>,
) -> Result<T, MprError> {
    if let Some(found) = lookup() {
        return Ok(found);
    }
    debug!("{module} missing for {slice_id}, loading slice first");
    loader.load(slice_id).await?;
    lookup().ok_or_else(|| MprError::MissingMetadata {
        module,
        slice_id: slice_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_of_signed_pixels() {
        let pixels = PixelBuffer::Signed(vec![-1024, 3, 40]);
        assert_eq!(pixels.range(), Some((-1024.0, 40.0)));
        assert_eq!(PixelBuffer::Unsigned(vec![]).range(), None);
    }
}
