//! The process-wide content cache: one memoized collection per JSON document.

use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use tracing::{info, warn};

use crate::{
    application::repos::{DocumentStore, StoreError},
    domain::{
        entities::{GalleryItem, MaterialItem, SiteConfig},
        types::Collection,
    },
};

use super::collection::CachedCollection;

const SOURCE: &str = "vitrina::cache::warmup";

pub type GalleryDocument = Vec<GalleryItem>;
pub type MaterialsDocument = Vec<MaterialItem>;

/// Owns the in-process copies of the gallery, materials and config collections.
///
/// Constructed once at startup and shared with every content service.
pub struct ContentCache {
    gallery: CachedCollection<GalleryDocument>,
    materials: CachedCollection<MaterialsDocument>,
    config: CachedCollection<SiteConfig>,
}

/// Outcome of an eager warmup pass.
#[derive(Debug, Default)]
pub struct WarmupReport {
    pub failed: Vec<(Collection, StoreError)>,
}

impl WarmupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl ContentCache {
    pub fn new(
        gallery: Arc<dyn DocumentStore<GalleryDocument>>,
        materials: Arc<dyn DocumentStore<MaterialsDocument>>,
        config: Arc<dyn DocumentStore<SiteConfig>>,
    ) -> Self {
        Self {
            gallery: CachedCollection::new(Collection::Gallery, gallery),
            materials: CachedCollection::new(Collection::Materials, materials),
            config: CachedCollection::new(Collection::Config, config),
        }
    }

    pub fn gallery(&self) -> &CachedCollection<GalleryDocument> {
        &self.gallery
    }

    pub fn materials(&self) -> &CachedCollection<MaterialsDocument> {
        &self.materials
    }

    pub fn config(&self) -> &CachedCollection<SiteConfig> {
        &self.config
    }

    /// Load every collection up front. Collections that fail to load are
    /// reported. Unreadable ones start from their default document; malformed
    /// ones stay unloaded and fail each request until the file is repaired.
    pub async fn warmup(&self) -> WarmupReport {
        let started = Instant::now();
        let (gallery, materials, config) = tokio::join!(
            self.gallery.warm(),
            self.materials.warm(),
            self.config.warm()
        );

        let mut report = WarmupReport::default();
        for (collection, result) in [
            (Collection::Gallery, gallery),
            (Collection::Materials, materials),
            (Collection::Config, config),
        ] {
            if let Err(err) = result {
                warn!(
                    target = SOURCE,
                    collection = collection.as_str(),
                    error = %err,
                    "collection warmup failed"
                );
                report.failed.push((collection, err));
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        histogram!("vitrina_cache_warm_ms").record(elapsed_ms as f64);
        info!(
            target = SOURCE,
            elapsed_ms,
            failed = report.failed.len(),
            "content cache warmed"
        );
        report
    }
}
