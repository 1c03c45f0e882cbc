//! Entry points for the surrounding viewer.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use futures::future::join_all;
use log::{debug, warn};

use crate::{
    axes::ResliceAxes,
    cache::VolumeCache,
    config::MprConfig,
    enums::StandardPlane,
    error::MprError,
    image_id::{MPR_SCHEME, MprImageId, PositionSpec, format_orientation},
    interpolator::Resampler,
    mapping::{image_to_patient, top_left_for_center_of},
    math::{Vec2, Vec3},
    metadata_store::MprMetadataStore,
    plane::ImagePlane,
    reference_line::{ReferenceLine, reference_line},
    reslice::{ResliceResult, reslice_volume},
    source::{MetadataProvider, PixelLoader},
    sync::{ApplyOutcome, Crosshair, ResliceTicket, SyncPlan, ViewId, ViewRegistry, ViewState},
    volume::Volume,
    volume_loader::VolumeLoader,
    wait::poll_until,
};

/// Receives images to render. Rendering itself is up to the host.
pub trait DisplaySink: Send + Sync {
    fn display(&self, view: ViewId, image_id: &str, image: &ResliceResult);
}

/// Outcome of one view's update during a navigation event.
#[derive(Debug)]
pub struct ViewUpdate {
    pub view: ViewId,
    pub outcome: Result<ApplyOutcome, MprError>,
}

pub struct MprService {
    config: MprConfig,
    metadata: Arc<dyn MetadataProvider>,
    loader: Arc<dyn PixelLoader>,
    resampler: Arc<dyn Resampler>,
    series: RwLock<HashMap<String, Arc<[String]>>>,
    cache: VolumeCache,
    mpr_metadata: MprMetadataStore,
    views: ViewRegistry,
}

impl MprService {
    pub fn new(
        config: MprConfig,
        metadata: Arc<dyn MetadataProvider>,
        loader: Arc<dyn PixelLoader>,
        resampler: Arc<dyn Resampler>,
    ) -> Self {
        let views = ViewRegistry::new(&config);
        Self {
            config,
            metadata,
            loader,
            resampler,
            series: RwLock::new(HashMap::new()),
            cache: VolumeCache::new(),
            mpr_metadata: MprMetadataStore::new(),
            views,
        }
    }

    pub fn config(&self) -> &MprConfig {
        &self.config
    }

    pub fn views(&self) -> &ViewRegistry {
        &self.views
    }

    pub fn cache(&self) -> &VolumeCache {
        &self.cache
    }

    /// Make the slices of a series known. The volume is built on first use.
    pub fn register_series(&self, series_id: impl Into<String>, slice_ids: Vec<String>) {
        self.series
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(series_id.into(), slice_ids.into());
    }

    /// The volume of `series_id`, built once and then cached.
    pub async fn get_volume(&self, series_id: &str) -> Result<Arc<Volume>, MprError> {
        let slice_ids = self
            .series
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(series_id)
            .cloned()
            .ok_or_else(|| MprError::UnknownSeries(series_id.to_string()))?;

        let metadata = self.metadata.clone();
        let loader = self.loader.clone();
        let config = self.config.clone();
        self.cache
            .get_or_build(series_id, move || async move {
                VolumeLoader::build(&slice_ids, metadata.as_ref(), loader.as_ref(), &config).await
            })
            .await
    }

    /// Reslice `series_id` with string-encoded orientation (six numbers)
    /// and position (three numbers or `center`).
    pub async fn reslice(
        &self,
        series_id: &str,
        orientation: &str,
        position: &str,
    ) -> Result<ResliceResult, MprError> {
        let image_id = format!("{MPR_SCHEME}:{series_id}:{orientation}:{position}");
        self.load_image(&image_id).await
    }

    /// Produce the image named by an MPR image id and remember its plane.
    pub async fn load_image(&self, image_id: &str) -> Result<ResliceResult, MprError> {
        let id: MprImageId = image_id.parse()?;
        let volume = self.get_volume(&id.series_id).await?;
        let anchor = match id.position {
            PositionSpec::Explicit(anchor) => anchor,
            PositionSpec::Center => top_left_for_center_of(
                &id.row_cosines,
                &id.column_cosines,
                &volume.center(),
                &volume.extent_edges(),
            ),
        };
        let axes = ResliceAxes::new(
            &id.row_cosines,
            &id.column_cosines,
            &anchor,
            self.config.geometry_epsilon,
        )?;

        let resampler = self.resampler.clone();
        let config = self.config.clone();
        let result = tokio::task::spawn_blocking(move || {
            reslice_volume(&volume, &axes, resampler.as_ref(), None, &config)
        })
        .await
        .map_err(|e| MprError::ResliceTask(e.to_string()))??;

        self.mpr_metadata.insert(image_id, result.plane.clone());
        Ok(result)
    }

    /// Plane of any image id, MPR or acquired.
    pub fn image_plane(&self, image_id: &str) -> Option<ImagePlane> {
        self.mpr_metadata
            .image_plane(image_id)
            .or_else(|| self.metadata.image_plane(image_id))
    }

    /// Load an MPR image and show it in `view`.
    pub async fn display_image(
        &self,
        view: ViewId,
        image_id: &str,
        sink: &dyn DisplaySink,
    ) -> Result<ApplyOutcome, MprError> {
        let ticket = self.views.ticket(view)?;
        let result = self.load_image(image_id).await?;
        let axes = ResliceAxes::new(
            &result.plane.row_cosines,
            &result.plane.column_cosines,
            &result.plane.position,
            self.config.geometry_epsilon,
        )?;
        Ok(self.show(&ticket, image_id, &axes, &result, None, sink))
    }

    /// Navigate to `image_point` of `source`: every other view showing the
    /// same volume is re-centred on the corresponding patient point.
    ///
    /// The patient point and all target planes are fixed before any
    /// reslice starts. A target whose reslice fails keeps its image.
    pub async fn navigate(
        &self,
        source: ViewId,
        image_point: Vec2,
        sink: &dyn DisplaySink,
    ) -> Result<Vec<ViewUpdate>, MprError> {
        let state = self.views.view(source).ok_or(MprError::UnknownView(source))?;
        let series_id = state.series_id.ok_or(MprError::NotSynchronized(source))?;
        let volume = self.get_volume(&series_id).await?;

        let plan = self.views.compute_sync_targets(source, &image_point, &volume)?;
        self.views.record_source_point(source, &image_point)?;
        debug!(
            "view {source} navigated to {:?}, updating {} views",
            plan.patient_point,
            plan.targets.len()
        );

        let plan = &plan;
        let updates = plan.targets.iter().map(|target| async move {
            let image_id = target.image_id(&plan.series_id).to_string();
            let crosshair = Crosshair {
                source: plan.source,
                patient_point: plan.patient_point,
            };
            let outcome = self.load_image(&image_id).await.map(|result| {
                self.show(&target.ticket, &image_id, &target.axes, &result, Some(crosshair), sink)
            });
            if let Err(e) = &outcome {
                warn!("view {} keeps its image: {e}", target.ticket.view);
            }
            ViewUpdate {
                view: target.ticket.view,
                outcome,
            }
        });
        Ok(join_all(updates).await)
    }

    /// The targets [`MprService::navigate`] would update, without reslicing.
    pub async fn plan_navigation(
        &self,
        source: ViewId,
        image_point: Vec2,
    ) -> Result<SyncPlan, MprError> {
        let state = self.views.view(source).ok_or(MprError::UnknownView(source))?;
        let series_id = state.series_id.ok_or(MprError::NotSynchronized(source))?;
        let volume = self.get_volume(&series_id).await?;
        self.views.compute_sync_targets(source, &image_point, &volume)
    }

    /// Rotate the plane of `view` about its normal through the image
    /// centre by `steps` wheel steps.
    pub async fn scroll_rotate(
        &self,
        view: ViewId,
        steps: i32,
        sink: &dyn DisplaySink,
    ) -> Result<ApplyOutcome, MprError> {
        let state = self.views.view(view).ok_or(MprError::UnknownView(view))?;
        let (axes, plane, series_id) = match (state.axes, state.plane, state.series_id) {
            (Some(axes), Some(plane), Some(series_id)) => (axes, plane, series_id),
            _ => return Err(MprError::NotSynchronized(view)),
        };
        let ticket = self.views.ticket(view)?;

        let degrees = steps as f64 * self.config.wheel_step_degrees;
        let pivot = image_to_patient(
            &Vec2::new(plane.columns as f64 / 2.0, plane.rows as f64 / 2.0),
            &plane,
        );
        let rotated = axes.rotate_about_point(&axes.normal(), degrees.to_radians(), &pivot)?;
        let image_id = MprImageId::new(
            series_id,
            rotated.row_cosines(),
            rotated.column_cosines(),
            PositionSpec::Explicit(rotated.anchor()),
        )
        .to_string();

        let result = self.load_image(&image_id).await?;
        let outcome = self.show(&ticket, &image_id, &rotated, &result, None, sink);
        if outcome == ApplyOutcome::Applied {
            self.views.add_rotation(view, degrees);
        }
        Ok(outcome)
    }

    pub fn enable_view(&self) -> ViewId {
        self.views.enable_view()
    }

    pub fn disable_view(&self, view: ViewId) -> Result<(), MprError> {
        self.views.disable_view(view)
    }

    /// Wait (bounded) until `view` displays an image.
    pub async fn wait_until_displayed(&self, view: ViewId) -> Result<ViewState, MprError> {
        poll_until(
            &format!("image in view {view}"),
            self.config.poll_interval,
            self.config.max_poll_attempts,
            || match self.views.view(view) {
                None => Some(Err(MprError::UnknownView(view))),
                Some(state) if !state.enabled => Some(Err(MprError::ViewDisabled(view))),
                Some(state) if state.image_id.is_some() => Some(Ok(state)),
                Some(_) => None,
            },
        )
        .await?
    }

    /// Reference line of `reference`'s plane drawn on `target`.
    pub fn reference_line(
        &self,
        target: ViewId,
        reference: ViewId,
    ) -> Result<Option<ReferenceLine>, MprError> {
        let plane_of = |view: ViewId| -> Result<ImagePlane, MprError> {
            self.views
                .view(view)
                .ok_or(MprError::UnknownView(view))?
                .plane
                .ok_or(MprError::NoImagePlane(view))
        };
        reference_line(
            &plane_of(target)?,
            &plane_of(reference)?,
            self.config.reference_line_min_angle,
        )
    }

    /// Patient coordinate under `image_point` of `view`.
    pub fn patient_point(&self, view: ViewId, image_point: &Vec2) -> Result<Vec3, MprError> {
        let state = self.views.view(view).ok_or(MprError::UnknownView(view))?;
        let plane = state.plane.ok_or(MprError::NoImagePlane(view))?;
        Ok(image_to_patient(image_point, &plane))
    }

    fn show(
        &self,
        ticket: &ResliceTicket,
        image_id: &str,
        axes: &ResliceAxes,
        result: &ResliceResult,
        crosshair: Option<Crosshair>,
        sink: &dyn DisplaySink,
    ) -> ApplyOutcome {
        let outcome = self
            .views
            .apply_reslice_to_view(ticket, image_id, axes, result, crosshair);
        match outcome {
            ApplyOutcome::Applied => sink.display(ticket.view, image_id, result),
            ApplyOutcome::Discarded => {
                warn!("view {} changed, dropping {image_id}", ticket.view)
            }
        }
        outcome
    }
}

/// Canonical orientation string for one of the standard planes.
pub fn standard_orientation(plane: StandardPlane) -> String {
    let (row, column) = plane.cosines();
    format_orientation(&row, &column)
}
