//! Per-series volume cache with coalesced builds.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use log::{debug, warn};

use crate::{error::MprError, volume::Volume};

type VolumeBuild = Shared<BoxFuture<'static, Result<Arc<Volume>, Arc<MprError>>>>;

/// Volumes keyed by series id, kept for the lifetime of the cache.
///
/// The first request for a series starts its build; requests arriving
/// while that build is in flight await the same build. Failed builds are
/// forgotten so a later request can try again.
#[derive(Default)]
pub struct VolumeCache {
    entries: Mutex<HashMap<String, VolumeBuild>>,
}

impl VolumeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached volume for `series_id`, building it with `build`
    /// if no build has been started yet or the last one failed.
    pub async fn get_or_build<F, Fut>(
        &self,
        series_id: &str,
        build: F,
    ) -> Result<Arc<Volume>, MprError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Volume, MprError>> + Send + 'static,
    {
        let pending = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            // a failed build may still be listed until its requester forgets it
            let reusable = entries
                .get(series_id)
                .filter(|pending| !pending.peek().is_some_and(|result| result.is_err()));
            match reusable {
                Some(pending) => {
                    debug!("joining volume build for series {series_id}");
                    pending.clone()
                }
                None => {
                    debug!("starting volume build for series {series_id}");
                    let pending = build()
                        .map(|result| result.map(Arc::new).map_err(Arc::new))
                        .boxed()
                        .shared();
                    entries.insert(series_id.to_string(), pending.clone());
                    pending
                }
            }
        };

        pending.await.map_err(|source| {
            self.forget_failed(series_id);
            MprError::VolumeUnavailable {
                series_id: series_id.to_string(),
                source,
            }
        })
    }

    /// The volume for `series_id` if its build has completed successfully.
    pub fn get(&self, series_id: &str) -> Option<Arc<Volume>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(series_id)?.peek()?.as_ref().ok().cloned()
    }

    /// Number of series with a completed or in-flight build.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn forget_failed(&self, series_id: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let failed = entries
            .get(series_id)
            .and_then(|pending| pending.peek())
            .is_some_and(|result| result.is_err());
        if failed {
            warn!("volume build for series {series_id} failed");
            entries.remove(series_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::vec3;
    use crate::volume::tests::ramp_volume;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn small_volume() -> Volume {
        ramp_volume([2, 2, 2], vec3(1.0, 1.0, 1.0), vec3(0.0, 0.0, 0.0))
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_build() {
        let cache = VolumeCache::new();
        let builds = Arc::new(AtomicUsize::new(0));
        let request = || {
            let builds = builds.clone();
            cache.get_or_build("1", move || async move {
                builds.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok(small_volume())
            })
        };

        let (a, b) = tokio::join!(request(), request());
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(cache.get("1").is_some());
    }

    #[tokio::test]
    async fn failed_build_is_retried() {
        let cache = VolumeCache::new();
        let first = cache
            .get_or_build("1", || async { Err(MprError::EmptySeries) })
            .await;
        assert!(matches!(first, Err(MprError::VolumeUnavailable { .. })));
        assert!(cache.is_empty());

        let second = cache.get_or_build("1", || async { Ok(small_volume()) }).await;
        assert!(second.is_ok());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failed_build_still_listed_is_not_joined() {
        let cache = VolumeCache::new();
        let failed: VolumeBuild = async { Err::<Arc<Volume>, _>(Arc::new(MprError::EmptySeries)) }
            .boxed()
            .shared();
        assert!(failed.clone().await.is_err());
        cache.entries.lock().unwrap().insert("1".to_string(), failed);

        let builds = AtomicUsize::new(0);
        let volume = cache
            .get_or_build("1", || {
                builds.fetch_add(1, Ordering::SeqCst);
                async { Ok(small_volume()) }
            })
            .await;
        assert!(volume.is_ok());
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(cache.get("1").is_some());
    }
}
