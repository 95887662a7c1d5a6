//! JSON file persistence for whole-document collections.

use std::{
    io::ErrorKind,
    marker::PhantomData,
    path::PathBuf,
};

use async_trait::async_trait;
use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::{
    application::repos::{DocumentStore, StoreError},
    domain::types::Collection,
};

const SOURCE: &str = "vitrina::infra::store";

/// Stores one document as a pretty-printed JSON file.
///
/// A missing file reads as `D::default()`. Writes go to a sibling temporary
/// file that is renamed over the target.
#[derive(Debug)]
pub struct JsonFileStore<D> {
    collection: Collection,
    path: PathBuf,
    _document: PhantomData<fn() -> D>,
}

impl<D> JsonFileStore<D> {
    pub fn new(collection: Collection, path: impl Into<PathBuf>) -> Self {
        Self {
            collection,
            path: path.into(),
            _document: PhantomData,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or("document.json");
        self.path
            .with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple()))
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl<D> DocumentStore<D> for JsonFileStore<D>
where
    D: Serialize + DeserializeOwned + Default + Send + Sync,
{
    async fn read(&self) -> Result<D, StoreError> {
        counter!("vitrina_store_read_total", "collection" => self.collection.as_str())
            .increment(1);

        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(
                    target = SOURCE,
                    collection = self.collection.as_str(),
                    path = %self.path.display(),
                    "document missing, using default"
                );
                return Ok(D::default());
            }
            Err(err) => return Err(self.io_error(err)),
        };

        serde_json::from_slice(&raw).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    async fn write(&self, document: &D) -> Result<(), StoreError> {
        let payload =
            serde_json::to_vec_pretty(document).map_err(|source| StoreError::Serialize {
                path: self.path.clone(),
                source,
            })?;

        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| self.io_error(err))?;
        }

        let temp = self.temp_path();
        if let Err(err) = fs::write(&temp, &payload).await {
            let _ = fs::remove_file(&temp).await;
            return Err(self.io_error(err));
        }
        if let Err(err) = fs::rename(&temp, &self.path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(self.io_error(err));
        }

        counter!("vitrina_store_write_total", "collection" => self.collection.as_str())
            .increment(1);
        debug!(
            target = SOURCE,
            collection = self.collection.as_str(),
            path = %self.path.display(),
            bytes = payload.len(),
            "document written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::SiteConfig;

    #[tokio::test]
    async fn missing_file_reads_as_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gallery: JsonFileStore<Vec<String>> =
            JsonFileStore::new(Collection::Gallery, dir.path().join("gallery.json"));
        let config: JsonFileStore<SiteConfig> =
            JsonFileStore::new(Collection::Config, dir.path().join("config.json"));

        assert!(gallery.read().await.expect("read gallery").is_empty());
        assert_eq!(config.read().await.expect("read config"), SiteConfig::default());
    }

    #[tokio::test]
    async fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("materials.json");
        std::fs::write(&path, "[{ not json").expect("seed file");
        let store: JsonFileStore<Vec<String>> = JsonFileStore::new(Collection::Materials, &path);

        let err = store.read().await.expect_err("parse must fail");
        assert!(matches!(err, StoreError::Parse { .. }));
        assert_eq!(err.path(), path.as_path());
    }

    #[tokio::test]
    async fn write_creates_parent_and_pretty_prints() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data").join("gallery.json");
        let store: JsonFileStore<Vec<String>> = JsonFileStore::new(Collection::Gallery, &path);

        store
            .write(&vec!["a".to_string(), "b".to_string()])
            .await
            .expect("write");

        let raw = std::fs::read_to_string(&path).expect("read back");
        assert!(raw.contains('\n'), "expected pretty-printed output");
        assert_eq!(store.read().await.expect("read"), vec!["a", "b"]);

        let leftovers: Vec<_> = std::fs::read_dir(path.parent().expect("parent"))
            .expect("list dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
