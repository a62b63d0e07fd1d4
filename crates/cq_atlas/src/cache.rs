//! Atlas cache keyed by creature type.
//!
//! Every on-screen slime shares the one "slime" atlas. Builds can run
//! synchronously ([`AtlasCache::get_or_build`]) or on a worker thread
//! ([`AtlasCache::request`] + [`AtlasCache::poll`]); repeated requests for a
//! key that is already building collapse into that single build.
//!
//! [`AtlasCache::sync_reference`] is the reconciliation step for when a
//! creature's image reference changes: the same reference is a no-op, a new
//! one evicts the cached atlas and starts a rebuild. Results from a build
//! that was superseded this way are dropped.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use crate::error::AtlasError;
use crate::sheet::{build_atlas, AtlasConfig, SpriteAtlas};
use crate::source::ImageSource;

struct FinishedBuild {
    key: String,
    generation: u64,
    result: Result<SpriteAtlas, AtlasError>,
}

pub struct AtlasCache {
    ready: HashMap<String, Arc<SpriteAtlas>>,
    sources: HashMap<String, ImageSource>,
    /// key -> generation of the build whose result will be accepted
    in_flight: HashMap<String, u64>,
    next_generation: u64,
    tx: Sender<FinishedBuild>,
    rx: Receiver<FinishedBuild>,
}

impl AtlasCache {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            ready: HashMap::new(),
            sources: HashMap::new(),
            in_flight: HashMap::new(),
            next_generation: 0,
            tx,
            rx,
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<SpriteAtlas>> {
        self.ready.get(key).cloned()
    }

    /// Return the cached atlas for `key`, building it on this thread first
    /// if needed. A background build still in flight for `key` is
    /// superseded. Failures are not cached so a later call can retry.
    pub fn get_or_build(
        &mut self,
        key: &str,
        source: &ImageSource,
        config: &AtlasConfig,
    ) -> Result<Arc<SpriteAtlas>, AtlasError> {
        if let Some(atlas) = self.ready.get(key) {
            return Ok(atlas.clone());
        }
        let atlas = Arc::new(build_atlas(source, config)?);
        if self.in_flight.remove(key).is_some() {
            log::debug!("Atlas '{}' built in place, dropping its background build", key);
        }
        self.sources.insert(key.to_string(), source.clone());
        self.ready.insert(key.to_string(), atlas.clone());
        log::info!("Atlas '{}' built from {}", key, source.describe());
        Ok(atlas)
    }

    /// Start a background build unless `key` is already cached or building.
    /// Returns whether a build was started.
    pub fn request(&mut self, key: &str, source: &ImageSource, config: &AtlasConfig) -> bool {
        if self.ready.contains_key(key) || self.in_flight.contains_key(key) {
            return false;
        }
        self.sources.insert(key.to_string(), source.clone());
        self.spawn_build(key, source.clone(), *config);
        true
    }

    /// Make `key` reflect `source`. Returns whether a rebuild was started.
    pub fn sync_reference(
        &mut self,
        key: &str,
        source: &ImageSource,
        config: &AtlasConfig,
    ) -> bool {
        if self.sources.get(key) == Some(source) {
            return false;
        }
        if self.ready.remove(key).is_some() {
            log::info!("Atlas '{}' image changed, rebuilding", key);
        }
        self.sources.insert(key.to_string(), source.clone());
        self.spawn_build(key, source.clone(), *config);
        true
    }

    /// Collect finished background builds. Successful atlases are cached;
    /// every accepted result is also returned so the caller can swap in a
    /// placeholder for failures.
    pub fn poll(&mut self) -> Vec<(String, Result<Arc<SpriteAtlas>, AtlasError>)> {
        let mut completed = Vec::new();
        while let Ok(finished) = self.rx.try_recv() {
            if self.in_flight.get(&finished.key) != Some(&finished.generation) {
                log::debug!(
                    "Dropping superseded atlas build for '{}' (generation {})",
                    finished.key,
                    finished.generation
                );
                continue;
            }
            self.in_flight.remove(&finished.key);
            match finished.result {
                Ok(atlas) => {
                    let atlas = Arc::new(atlas);
                    self.ready.insert(finished.key.clone(), atlas.clone());
                    log::info!("Atlas '{}' ready", finished.key);
                    completed.push((finished.key, Ok(atlas)));
                }
                Err(err) => {
                    log::warn!("Atlas '{}' failed to build: {}", finished.key, err);
                    // Forget the source so the same reference can be retried.
                    self.sources.remove(&finished.key);
                    completed.push((finished.key, Err(err)));
                }
            }
        }
        completed
    }

    pub fn evict(&mut self, key: &str) -> Option<Arc<SpriteAtlas>> {
        self.sources.remove(key);
        self.in_flight.remove(key);
        self.ready.remove(key)
    }

    pub fn is_building(&self, key: &str) -> bool {
        self.in_flight.contains_key(key)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn len(&self) -> usize {
        self.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    fn spawn_build(&mut self, key: &str, source: ImageSource, config: AtlasConfig) {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.in_flight.insert(key.to_string(), generation);

        let tx = self.tx.clone();
        let key = key.to_string();
        log::debug!("Building atlas '{}' from {}", key, source.describe());
        thread::spawn(move || {
            let result = build_atlas(&source, &config);
            // The cache may have been dropped; nothing to report to then.
            let _ = tx.send(FinishedBuild {
                key,
                generation,
                result,
            });
        });
    }
}

impl Default for AtlasCache {
    fn default() -> Self {
        Self::new()
    }
}
