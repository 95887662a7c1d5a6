//! Read-through, write-back memo over a single document store.

use std::sync::{Arc, RwLock};

use metrics::counter;
use tokio::sync::Mutex;

use crate::{
    application::repos::{DocumentStore, StoreError},
    domain::types::Collection,
};

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::collection";

/// In-process copy of one collection, authoritative for reads.
///
/// The first `get` loads from the backing store and memoizes the result.
/// Every mutation goes through `set` or `update`, which write the full
/// document to the store before the memo is replaced, so a failed write
/// leaves both copies untouched. Mutations are serialized per collection.
pub struct CachedCollection<D> {
    collection: Collection,
    store: Arc<dyn DocumentStore<D>>,
    memo: RwLock<Option<D>>,
    writer: Mutex<()>,
}

impl<D> CachedCollection<D>
where
    D: Clone + Default + Send + Sync,
{
    pub fn new(collection: Collection, store: Arc<dyn DocumentStore<D>>) -> Self {
        Self {
            collection,
            store,
            memo: RwLock::new(None),
            writer: Mutex::new(()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        rw_read(&self.memo, SOURCE, "is_loaded").is_some()
    }

    /// Return the memoized document, loading it from the store on first access.
    pub async fn get(&self) -> Result<D, StoreError> {
        let memoized = rw_read(&self.memo, SOURCE, "get").clone();
        if let Some(document) = memoized {
            counter!("vitrina_cache_hit_total", "collection" => self.collection.as_str())
                .increment(1);
            return Ok(document);
        }

        let loaded = self.store.read().await?;
        counter!("vitrina_cache_load_total", "collection" => self.collection.as_str())
            .increment(1);

        let mut memo = rw_write(&self.memo, SOURCE, "get.populate");
        Ok(memo.get_or_insert(loaded).clone())
    }

    /// Replace the whole document.
    pub async fn set(&self, document: D) -> Result<(), StoreError> {
        let _writer = self.writer.lock().await;
        self.persist(document).await
    }

    /// Read-modify-write under the collection's write lock.
    ///
    /// Nothing is persisted when `mutate` fails.
    pub async fn update<T, E, F>(&self, mutate: F) -> Result<T, E>
    where
        F: FnOnce(&mut D) -> Result<T, E> + Send,
        E: From<StoreError>,
    {
        let _writer = self.writer.lock().await;
        let mut document = self.get().await?;
        let outcome = mutate(&mut document)?;
        self.persist(document).await?;
        Ok(outcome)
    }

    /// Eagerly load from the store. Read failures fall back to the default
    /// document. A malformed document leaves the memo empty, so every later
    /// `get` or `update` re-reads and fails instead of overwriting it.
    pub async fn warm(&self) -> Result<(), StoreError> {
        let result = self.store.read().await;
        let mut memo = rw_write(&self.memo, SOURCE, "warm");
        match result {
            Ok(document) => {
                *memo = Some(document);
                Ok(())
            }
            Err(err @ StoreError::Parse { .. }) => {
                *memo = None;
                Err(err)
            }
            Err(err) => {
                *memo = Some(D::default());
                Err(err)
            }
        }
    }

    async fn persist(&self, document: D) -> Result<(), StoreError> {
        self.store.write(&document).await?;
        *rw_write(&self.memo, SOURCE, "persist") = Some(document);
        Ok(())
    }
}
