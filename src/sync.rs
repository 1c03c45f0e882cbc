//! Crosshair state of the displayed views and its synchronisation.
//!
//! Reading ([`ViewRegistry::compute_sync_targets`]) and writing
//! ([`ViewRegistry::apply_reslice_to_view`]) are separate steps: a
//! navigation event computes one patient point and one target plane per
//! view up front, the reslices then complete in any order, and each result
//! is only written if its view is still the one it was requested for.

use std::{
    collections::BTreeMap,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use log::debug;

use crate::{
    axes::ResliceAxes,
    config::MprConfig,
    error::MprError,
    image_id::{MprImageId, PositionSpec},
    mapping::{image_to_patient, patient_to_image, top_left_for_center},
    math::{Vec2, Vec3},
    plane::ImagePlane,
    reslice::ResliceResult,
    volume::Volume,
};

pub type ViewId = u64;

/// What one view displays and where its crosshair is.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewState {
    pub id: ViewId,
    pub enabled: bool,
    /// Bumped whenever results requested earlier must no longer be shown.
    pub generation: u64,
    pub image_id: Option<String>,
    pub plane: Option<ImagePlane>,
    /// Series whose volume the displayed image was cut from.
    pub series_id: Option<String>,
    /// Set only while the view shows a reslice.
    pub axes: Option<ResliceAxes>,
    pub crosshair: Option<Vec2>,
    pub sync_source: Option<ViewId>,
    pub synced_image_id: Option<String>,
    /// Accumulated wheel rotation in `[0, 360)`.
    pub rotation_degrees: f64,
    last_request: u64,
}

impl ViewState {
    pub fn is_mpr(&self) -> bool {
        self.axes.is_some() && self.series_id.is_some()
    }

    fn clear_crosshair(&mut self) {
        self.crosshair = None;
        self.sync_source = None;
        self.synced_image_id = None;
    }

    fn clear(&mut self) {
        self.clear_crosshair();
        self.axes = None;
        self.series_id = None;
        self.rotation_degrees = 0.0;
    }
}

/// Permission to show a result in a view, valid until the view changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResliceTicket {
    pub view: ViewId,
    pub generation: u64,
    pub request: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SyncTarget {
    pub ticket: ResliceTicket,
    pub axes: ResliceAxes,
}

/// Everything a navigation event needs, computed once.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncPlan {
    pub source: ViewId,
    pub series_id: String,
    pub patient_point: Vec3,
    pub targets: Vec<SyncTarget>,
}

impl SyncTarget {
    pub fn image_id(&self, series_id: &str) -> MprImageId {
        MprImageId::new(
            series_id,
            self.axes.row_cosines(),
            self.axes.column_cosines(),
            PositionSpec::Explicit(self.axes.anchor()),
        )
    }
}

/// Crosshair to place on a view once its reslice is shown.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Crosshair {
    pub source: ViewId,
    pub patient_point: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The view was disabled, repurposed or has shown a newer result.
    Discarded,
}

pub struct ViewRegistry {
    views: Mutex<BTreeMap<ViewId, ViewState>>,
    next_view: AtomicU64,
    next_request: AtomicU64,
    epsilon: f64,
}

impl Default for ViewRegistry {
    fn default() -> Self {
        Self::new(&MprConfig::default())
    }
}

impl ViewRegistry {
    pub fn new(config: &MprConfig) -> Self {
        Self {
            views: Mutex::new(BTreeMap::new()),
            next_view: AtomicU64::new(0),
            next_request: AtomicU64::new(0),
            epsilon: config.geometry_epsilon,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ViewId, ViewState>> {
        self.views.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn enable_view(&self) -> ViewId {
        let id = self.next_view.fetch_add(1, Ordering::SeqCst) + 1;
        self.lock().insert(
            id,
            ViewState {
                id,
                enabled: true,
                ..ViewState::default()
            },
        );
        id
    }

    /// Disable a view: its state is cleared and in-flight results for it
    /// are discarded when they arrive.
    pub fn disable_view(&self, view: ViewId) -> Result<(), MprError> {
        let mut views = self.lock();
        let state = views.get_mut(&view).ok_or(MprError::UnknownView(view))?;
        state.enabled = false;
        state.generation += 1;
        state.image_id = None;
        state.plane = None;
        state.clear();
        debug!("view {view} disabled");
        Ok(())
    }

    pub fn view(&self, view: ViewId) -> Option<ViewState> {
        self.lock().get(&view).cloned()
    }

    pub fn views(&self) -> Vec<ViewState> {
        self.lock().values().cloned().collect()
    }

    fn next_request(&self) -> u64 {
        self.next_request.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// A ticket for showing a new result in `view`.
    pub fn ticket(&self, view: ViewId) -> Result<ResliceTicket, MprError> {
        let views = self.lock();
        let state = views.get(&view).ok_or(MprError::UnknownView(view))?;
        if !state.enabled {
            return Err(MprError::ViewDisabled(view));
        }
        Ok(ResliceTicket {
            view,
            generation: state.generation,
            request: self.next_request(),
        })
    }

    /// Record an image the host displayed in `view` by other means.
    ///
    /// Anything that is not an MPR image leaves the view without a
    /// comparable plane: its crosshair state is cleared and pending
    /// reslices for it become stale.
    pub fn set_displayed_image(
        &self,
        view: ViewId,
        image_id: &str,
        plane: Option<ImagePlane>,
        series_id: Option<String>,
    ) -> Result<(), MprError> {
        let mut views = self.lock();
        let state = views.get_mut(&view).ok_or(MprError::UnknownView(view))?;
        if !state.enabled {
            return Err(MprError::ViewDisabled(view));
        }
        let mpr = image_id.parse::<MprImageId>().ok();
        let axes = mpr.as_ref().zip(plane.as_ref()).and_then(|(_, plane)| {
            ResliceAxes::new(
                &plane.row_cosines,
                &plane.column_cosines,
                &plane.position,
                self.epsilon,
            )
            .ok()
        });
        let unsynced = state
            .synced_image_id
            .as_deref()
            .is_some_and(|synced| synced != image_id);

        match (mpr, axes) {
            (Some(id), Some(axes)) => {
                state.series_id = Some(id.series_id);
                state.axes = Some(axes);
            }
            _ => {
                state.generation += 1;
                state.clear();
                state.series_id = series_id;
            }
        }
        state.image_id = Some(image_id.to_string());
        state.plane = plane;
        // results requested before the host's choice must not replace it
        state.last_request = self.next_request();

        if unsynced {
            Self::clear_all_crosshairs(&mut views);
        }
        Ok(())
    }

    /// Map `image_point` in `source` to patient space and derive, for every
    /// other enabled view showing a reslice of the same volume, the plane
    /// with that view's orientation centred on the point.
    pub fn compute_sync_targets(
        &self,
        source: ViewId,
        image_point: &Vec2,
        volume: &Volume,
    ) -> Result<SyncPlan, MprError> {
        let views = self.lock();
        let state = views.get(&source).ok_or(MprError::UnknownView(source))?;
        if !state.enabled {
            return Err(MprError::ViewDisabled(source));
        }
        let plane = state.plane.as_ref().ok_or(MprError::NoImagePlane(source))?;
        let series_id = state
            .series_id
            .clone()
            .ok_or(MprError::NotSynchronized(source))?;
        let patient_point = image_to_patient(image_point, plane);
        let edges = volume.extent_edges();

        let targets = views
            .values()
            .filter(|target| target.id != source && target.enabled)
            .filter(|target| target.series_id.as_deref() == Some(series_id.as_str()))
            .filter_map(|target| {
                let axes = target.axes?;
                let target_plane = target.plane.as_ref()?;
                let anchor = top_left_for_center(target_plane, &patient_point, &edges);
                Some(SyncTarget {
                    ticket: ResliceTicket {
                        view: target.id,
                        generation: target.generation,
                        request: self.next_request(),
                    },
                    axes: axes.with_anchor(&anchor),
                })
            })
            .collect();

        Ok(SyncPlan {
            source,
            series_id,
            patient_point,
            targets,
        })
    }

    /// Place the crosshair of the view the user interacted with.
    pub fn record_source_point(&self, source: ViewId, image_point: &Vec2) -> Result<(), MprError> {
        let mut views = self.lock();
        let state = views.get_mut(&source).ok_or(MprError::UnknownView(source))?;
        state.crosshair = Some(*image_point);
        state.sync_source = None;
        state.synced_image_id = state.image_id.clone();
        Ok(())
    }

    /// Show `result` in the ticket's view, unless the view has been
    /// disabled or repurposed since the ticket was issued or already shows
    /// a result requested later.
    pub fn apply_reslice_to_view(
        &self,
        ticket: &ResliceTicket,
        image_id: &str,
        axes: &ResliceAxes,
        result: &ResliceResult,
        crosshair: Option<Crosshair>,
    ) -> ApplyOutcome {
        let mut views = self.lock();
        let Some(state) = views.get_mut(&ticket.view) else {
            return ApplyOutcome::Discarded;
        };
        let stale = state.generation != ticket.generation || state.last_request > ticket.request;
        if !state.enabled || stale {
            debug!("discarding stale reslice {image_id} for view {}", ticket.view);
            return ApplyOutcome::Discarded;
        }

        let unsynced = crosshair.is_none()
            && state
                .synced_image_id
                .as_deref()
                .is_some_and(|synced| synced != image_id);

        state.last_request = ticket.request;
        state.image_id = Some(image_id.to_string());
        state.plane = Some(result.plane.clone());
        state.axes = Some(*axes);
        if let Ok(id) = image_id.parse::<MprImageId>() {
            state.series_id = Some(id.series_id);
        }
        if let Some(crosshair) = crosshair {
            state.crosshair = Some(patient_to_image(&crosshair.patient_point, &result.plane));
            state.sync_source = Some(crosshair.source);
            state.synced_image_id = Some(image_id.to_string());
        }

        if unsynced {
            Self::clear_all_crosshairs(&mut views);
        }
        ApplyOutcome::Applied
    }

    pub fn add_rotation(&self, view: ViewId, degrees: f64) {
        if let Some(state) = self.lock().get_mut(&view) {
            state.rotation_degrees = (state.rotation_degrees + degrees).rem_euclid(360.0);
        }
    }

    fn clear_all_crosshairs(views: &mut BTreeMap<ViewId, ViewState>) {
        debug!("displayed image is not the synced one, clearing crosshairs");
        for state in views.values_mut() {
            state.clear_crosshair();
        }
    }
}
