#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Condvar, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use dicom_mpr::{
    DisplaySink, ImagePixelInfo, ImagePlane, MetadataProvider, MprConfig, MprError, MprService,
    NearestNeighborResampler, PixelBuffer, PixelLoader, ResampledSlice, Resampler, ResliceAxes,
    ResliceResult, Volume, ViewId,
    math::{Vec3, vec3},
};
use futures::{FutureExt, future::BoxFuture};
use tokio::sync::Notify;

pub const SERIES: &str = "s";

/// In-memory slices with a counter of pixel loads.
pub struct FakeSeries {
    pub planes: HashMap<String, ImagePlane>,
    pub pixels: HashMap<String, PixelBuffer>,
    pub pixel_info: ImagePixelInfo,
    pub loads: AtomicUsize,
}

impl FakeSeries {
    /// An axial stack of `columns x rows` slices at the given z positions,
    /// 1 mm apart in plane. Pixel `(column, row)` of the slice at `z` holds
    /// `z * 100 + row * 10 + column`.
    pub fn axial(columns: usize, rows: usize, positions: &[f64]) -> Self {
        Self::stack(
            columns,
            rows,
            positions,
            (vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0)),
            |z| vec3(0.0, 0.0, z),
        )
    }

    /// A coronal stack at the given y positions: rows run from z = `rows - 1`
    /// down to z = 0 and columns along +x. Pixel `(column, row)` of the
    /// slice at `y` holds `y * 100 + row * 10 + column`.
    pub fn coronal(columns: usize, rows: usize, positions: &[f64]) -> Self {
        let top = (rows - 1) as f64;
        Self::stack(
            columns,
            rows,
            positions,
            (vec3(1.0, 0.0, 0.0), vec3(0.0, 0.0, -1.0)),
            |y| vec3(0.0, y, top),
        )
    }

    fn stack(
        columns: usize,
        rows: usize,
        positions: &[f64],
        (row_cosines, column_cosines): (Vec3, Vec3),
        position: impl Fn(f64) -> Vec3,
    ) -> Self {
        let mut planes = HashMap::new();
        let mut pixels = HashMap::new();
        for (i, &offset) in positions.iter().enumerate() {
            let id = format!("slice-{i}");
            planes.insert(
                id.clone(),
                ImagePlane {
                    row_cosines,
                    column_cosines,
                    position: position(offset),
                    row_pixel_spacing: 1.0,
                    column_pixel_spacing: 1.0,
                    columns,
                    rows,
                    frame_of_reference_uid: "1.2.3".to_string(),
                },
            );
            let base = offset as usize * 100;
            let values = (0..rows)
                .flat_map(|row| (0..columns).map(move |column| (base + row * 10 + column) as u16))
                .collect();
            pixels.insert(id, PixelBuffer::Unsigned(values));
        }
        Self {
            planes,
            pixels,
            pixel_info: ImagePixelInfo {
                bits_allocated: 16,
                pixel_representation: 0,
                samples_per_pixel: 1,
            },
            loads: AtomicUsize::new(0),
        }
    }

    /// Slice ids in input order.
    pub fn slice_ids(&self) -> Vec<String> {
        (0..self.planes.len()).map(|i| format!("slice-{i}")).collect()
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl MetadataProvider for FakeSeries {
    fn image_plane(&self, slice_id: &str) -> Option<ImagePlane> {
        self.planes.get(slice_id).cloned()
    }

    fn image_pixel(&self, slice_id: &str) -> Option<ImagePixelInfo> {
        self.planes.contains_key(slice_id).then_some(self.pixel_info)
    }
}

impl PixelLoader for FakeSeries {
    fn load<'a>(&'a self, slice_id: &'a str) -> BoxFuture<'a, Result<PixelBuffer, MprError>> {
        async move {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.pixels.get(slice_id).cloned().ok_or_else(|| MprError::Load {
                slice_id: slice_id.to_string(),
                reason: "unknown slice".to_string(),
            })
        }
        .boxed()
    }
}

/// Remembers every image handed to it.
#[derive(Default)]
pub struct RecordingSink {
    pub shown: Mutex<Vec<(ViewId, String, ResliceResult)>>,
}

impl RecordingSink {
    pub fn count(&self) -> usize {
        self.shown.lock().unwrap().len()
    }

    pub fn last(&self, view: ViewId) -> Option<(String, ResliceResult)> {
        self.shown
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(shown, _, _)| *shown == view)
            .map(|(_, id, result)| (id.clone(), result.clone()))
    }
}

impl DisplaySink for RecordingSink {
    fn display(&self, view: ViewId, image_id: &str, image: &ResliceResult) {
        self.shown
            .lock()
            .unwrap()
            .push((view, image_id.to_string(), image.clone()));
    }
}

/// Nearest-neighbour resampling that can be held at its entry.
#[derive(Default)]
pub struct GatedResampler {
    closed: Mutex<bool>,
    released: Condvar,
    entered: Notify,
    pub calls: AtomicUsize,
}

impl GatedResampler {
    pub fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }

    pub fn open(&self) {
        *self.closed.lock().unwrap() = false;
        self.released.notify_all();
    }

    /// Resolves once a reslice is held by the closed gate.
    pub async fn held(&self) {
        self.entered.notified().await;
    }
}

impl Resampler for GatedResampler {
    fn reslice(
        &self,
        volume: &Volume,
        axes: &ResliceAxes,
        output_dimensionality: usize,
        background: f64,
    ) -> Result<ResampledSlice, MprError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut closed = self.closed.lock().unwrap();
        if *closed {
            self.entered.notify_one();
            while *closed {
                closed = self.released.wait(closed).unwrap();
            }
        }
        drop(closed);
        NearestNeighborResampler.reslice(volume, axes, output_dimensionality, background)
    }
}

pub fn service_with(series: Arc<FakeSeries>, resampler: Arc<dyn Resampler>) -> MprService {
    let service = MprService::new(MprConfig::default(), series.clone(), series.clone(), resampler);
    service.register_series(SERIES, series.slice_ids());
    service
}

pub fn service(series: Arc<FakeSeries>) -> MprService {
    service_with(series, Arc::new(NearestNeighborResampler))
}

pub fn mpr_id(orientation: &str, position: &str) -> String {
    format!("mpr:{SERIES}:{orientation}:{position}")
}
