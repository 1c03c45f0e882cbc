use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use crate::{
    plane::{ImagePixelInfo, ImagePlane},
    source::MetadataProvider,
};

/// Image plane metadata of produced MPR images, keyed by image id.
#[derive(Default)]
pub struct MprMetadataStore {
    planes: RwLock<HashMap<String, ImagePlane>>,
}

impl MprMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, image_id: &str, plane: ImagePlane) {
        self.planes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(image_id.to_string(), plane);
    }
}

impl MetadataProvider for MprMetadataStore {
    fn image_plane(&self, image_id: &str) -> Option<ImagePlane> {
        self.planes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(image_id)
            .cloned()
    }

    /// MPR images carry no pixel module of their own.
    fn image_pixel(&self, _image_id: &str) -> Option<ImagePixelInfo> {
        None
    }
}
