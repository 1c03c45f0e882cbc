//! # DICOM-MPR library
//!
//! This crate provides multi-planar reformation (MPR) of DICOM series:
//! stacks of acquired slices are assembled into volumes which can then be
//! cut along arbitrary planes.
//!
//! Slices are described by their image plane (position, orientation, pixel
//! spacing and dimensions, see [`ImagePlane`]) and supplied through the
//! [`MetadataProvider`] and [`PixelLoader`] traits. [`DicomFileSource`]
//! implements both over DICOM files read with dicom-rs. Volumes are built
//! once per series and cached; concurrent requests share the same build.
//!
//! Resliced images are addressed with image ids of the form
//!
//! ```text
//! mpr:<series>:<rowX,rowY,rowZ,colX,colY,colZ>:<x,y,z | center>
//! ```
//!
//! and carry an image plane of their own, so pixel positions of a reslice
//! map back to patient coordinates exactly like those of acquired slices.
//! The [`MprService`] keeps the crosshairs of several views in sync:
//! navigating in one view re-centres the reslices shown in all others.
//!
//! The following inputs are rejected:
//!   - 8-bit and multi component (RGB) images
//!   - Oblique slice stacks (the slice normal must be close to L/R, A/P or S/I)
//!   - Slices from different frames of reference
//!   - Multiframe objects contribute their first frame only
//!
//! # Examples
//!
//! ## Reslicing a series in the three standard planes
//!
//! Read all DICOM files from the dicom/ directory, register them as one
//! series and cut the volume through its center.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use dicom_mpr::{
//! #     DicomFileSource, MprConfig, MprService, NearestNeighborResampler, StandardPlane,
//! # };
//! # use dicom_mpr::service::standard_orientation;
//! # async fn run() -> Result<(), dicom_mpr::MprError> {
//! let source = Arc::new(DicomFileSource::open_directory("dicom")?);
//! let service = MprService::new(
//!     MprConfig::default(),
//!     source.clone(),
//!     source.clone(),
//!     Arc::new(NearestNeighborResampler),
//! );
//! service.register_series("1", source.slice_ids());
//!
//! for plane in StandardPlane::all() {
//!     let result = service
//!         .reslice("1", &standard_orientation(plane), "center")
//!         .await?;
//!     if let Some(image) = result.to_luma_image() {
//!         image.save(format!("{plane}.png")).expect("should have written image");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Mapping points between image and patient space
//!
//! ```
//! # use dicom_mpr::{ImagePlane, image_to_patient, patient_to_image, math::vec3};
//! # use nalgebra::Vector2;
//! let plane = ImagePlane {
//!     row_cosines: vec3(1.0, 0.0, 0.0),
//!     column_cosines: vec3(0.0, 1.0, 0.0),
//!     position: vec3(-100.0, -100.0, 40.0),
//!     row_pixel_spacing: 0.5,
//!     column_pixel_spacing: 0.5,
//!     columns: 512,
//!     rows: 512,
//!     frame_of_reference_uid: "1.2.3".to_string(),
//! };
//! let patient = image_to_patient(&Vector2::new(10.0, 20.0), &plane);
//! assert_eq!(patient, vec3(-95.0, -90.0, 40.0));
//! assert_eq!(patient_to_image(&patient, &plane), Vector2::new(10.0, 20.0));
//! ```

pub mod axes;
pub mod cache;
pub mod config;
pub mod dicom_source;
pub mod enums;
pub mod error;
pub mod image_id;
pub mod interpolator;
pub mod mapping;
pub mod math;
pub mod metadata_store;
pub mod plane;
pub mod reference_line;
pub mod reslice;
pub mod service;
pub mod source;
pub mod sync;
pub mod volume;
pub mod volume_loader;
pub mod wait;
pub mod z_axis;

pub use axes::ResliceAxes;
pub use config::MprConfig;
pub use dicom_source::DicomFileSource;
pub use enums::{PatientDirection, PixelRepresentation, StandardPlane};
pub use error::MprError;
pub use image_id::{MprImageId, PositionSpec};
pub use interpolator::{NearestNeighborResampler, ResampledSlice, Resampler};
pub use mapping::{image_to_patient, patient_to_image};
pub use plane::{ImagePixelInfo, ImagePlane};
pub use reslice::{ResliceResult, WindowLevel, reslice_volume};
pub use service::{DisplaySink, MprService};
pub use source::{MetadataProvider, PixelBuffer, PixelLoader};
pub use sync::{ApplyOutcome, ViewId, ViewRegistry, ViewState};
pub use volume::Volume;
pub use volume_loader::VolumeLoader;
