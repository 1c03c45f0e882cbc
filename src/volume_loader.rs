use futures::{FutureExt, StreamExt, future::BoxFuture, stream};
use log::{debug, info};
use web_time::Instant;

use crate::{
    config::MprConfig,
    error::MprError,
    plane::ImagePlane,
    source::{
        IMAGE_PIXEL_MODULE, IMAGE_PLANE_MODULE, MetadataProvider, PixelBuffer, PixelLoader,
        try_get_metadata,
    },
    volume::{Volume, VolumeGeometry, VoxelData},
    z_axis::{ZAxis, compute_z_axis},
};

type SliceLoad<'a> = BoxFuture<'a, (&'a String, usize, Result<PixelBuffer, MprError>)>;

pub struct VolumeLoader;

impl VolumeLoader {
    /// Assemble a volume from the slices of one series.
    ///
    /// # Arguments
    ///
    /// * `slice_ids` - Slice identifiers in any order
    /// * `metadata` - Source of the image plane and image pixel modules
    /// * `loader` - Source of the pixel data
    ///
    /// # Errors
    ///
    /// Returns error for 8-bit or multi component pixel data, oblique
    /// stacks, mixed frames of reference or inconsistent slice dimensions.
    /// All of these are detected before any pixel data is loaded.
    pub async fn build(
        slice_ids: &[String],
        metadata: &dyn MetadataProvider,
        loader: &dyn PixelLoader,
        config: &MprConfig,
    ) -> Result<Volume, MprError> {
        let first_id = slice_ids.first().ok_or(MprError::EmptySeries)?;
        let started = Instant::now();

        let pixel_info = try_get_metadata(IMAGE_PIXEL_MODULE, first_id, loader, || {
            metadata.image_pixel(first_id)
        })
        .await?;
        let representation = pixel_info.representation()?;

        let planes = Self::collect_planes(slice_ids, metadata, loader).await?;
        Self::validate_planes(slice_ids, &planes, config)?;
        let z_axis = compute_z_axis(&planes, config)?;

        let first = &planes[0];
        let dimensions = [first.columns, first.rows, planes.len()];
        let mut data = VoxelData::zeros(representation, dimensions);

        // Slices may finish loading in any order; each lands at its rank.
        // Boxed before streaming so the build future stays `Send`.
        let loads: Vec<SliceLoad<'_>> = slice_ids
            .iter()
            .zip(z_axis.ranks.iter().copied())
            .map(|(slice_id, rank)| {
                async move { (slice_id, rank, loader.load(slice_id).await) }.boxed()
            })
            .collect();
        let mut loads = stream::iter(loads).buffer_unordered(config.max_concurrent_loads.max(1));
        while let Some((slice_id, rank, pixels)) = loads.next().await {
            let pixels = pixels?;
            data.insert_slice(rank, slice_id, &pixels)?;
            debug!("inserted {slice_id} at slice {rank}");
        }

        let geometry = Self::geometry(first, &z_axis);
        let volume = Volume::new(data, geometry)?;
        info!(
            "built {:?} volume ({} x {} x {}) in {:?}",
            representation,
            dimensions[0],
            dimensions[1],
            dimensions[2],
            started.elapsed()
        );
        Ok(volume)
    }

    async fn collect_planes(
        slice_ids: &[String],
        metadata: &dyn MetadataProvider,
        loader: &dyn PixelLoader,
    ) -> Result<Vec<ImagePlane>, MprError> {
        let mut planes = Vec::with_capacity(slice_ids.len());
        for slice_id in slice_ids {
            let plane = try_get_metadata(IMAGE_PLANE_MODULE, slice_id, loader, || {
                metadata.image_plane(slice_id)
            })
            .await?;
            planes.push(plane);
        }
        Ok(planes)
    }

    fn validate_planes(
        slice_ids: &[String],
        planes: &[ImagePlane],
        config: &MprConfig,
    ) -> Result<(), MprError> {
        let first = &planes[0];
        for (slice_id, plane) in slice_ids.iter().zip(planes) {
            plane.validate(config.geometry_epsilon)?;
            if !plane.same_frame_of_reference(first) {
                return Err(MprError::FrameOfReferenceMismatch {
                    slice_id: slice_id.clone(),
                    expected: first.frame_of_reference_uid.clone(),
                    found: plane.frame_of_reference_uid.clone(),
                });
            }
            if plane.rows != first.rows || plane.columns != first.columns {
                return Err(MprError::InconsistentDimensions);
            }
        }
        Ok(())
    }

    fn geometry(first: &ImagePlane, z_axis: &ZAxis) -> VolumeGeometry {
        let normal = first.normal();
        VolumeGeometry {
            origin: z_axis.origin,
            spacing: [
                first.column_pixel_spacing,
                first.row_pixel_spacing,
                z_axis.spacing,
            ]
            .into(),
            row_cosines: first.row_cosines,
            column_cosines: first.column_cosines,
            slice_direction: normal / normal[z_axis.axis_index],
            through_plane_axis: z_axis.axis_index,
            frame_of_reference_uid: first.frame_of_reference_uid.clone(),
        }
    }
}
