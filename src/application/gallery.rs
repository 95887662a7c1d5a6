use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::{
    application::{
        repos::StoreError,
        upload::{IncomingFile, discard},
    },
    cache::ContentCache,
    domain::{entities::GalleryItem, error::DomainError},
    infra::uploads::{UploadStorage, UploadStorageError},
};

const SOURCE: &str = "vitrina::application::gallery";

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Upload(#[from] UploadStorageError),
}

#[derive(Clone)]
pub struct GalleryService {
    cache: Arc<ContentCache>,
    storage: Arc<UploadStorage>,
}

impl GalleryService {
    pub fn new(cache: Arc<ContentCache>, storage: Arc<UploadStorage>) -> Self {
        Self { cache, storage }
    }

    /// Gallery items, newest first.
    pub async fn list(&self) -> Result<Vec<GalleryItem>, GalleryError> {
        let mut items = self.cache.gallery().get().await?;
        items.reverse();
        Ok(items)
    }

    pub async fn add(
        &self,
        title: &str,
        file: Option<IncomingFile>,
    ) -> Result<GalleryItem, GalleryError> {
        let file = file.ok_or_else(|| DomainError::validation("No file uploaded"))?;
        let stored = self.storage.store(&file.original_name, file.data).await?;

        let item = GalleryItem {
            filename: stored.filename,
            title: title.trim().to_string(),
            date: OffsetDateTime::now_utc(),
        };

        let appended = item.clone();
        let result = self
            .cache
            .gallery()
            .update(move |items| {
                items.push(appended);
                Ok::<_, StoreError>(())
            })
            .await;

        if let Err(err) = result {
            discard(&self.storage, &item.filename, SOURCE).await;
            return Err(err.into());
        }

        info!(
            target = SOURCE,
            file = %item.filename,
            size_bytes = stored.size_bytes,
            checksum = %stored.checksum,
            "gallery item added"
        );
        Ok(item)
    }

    /// Drop the item with `filename` and its stored file. Unknown names succeed.
    pub async fn remove(&self, filename: &str) -> Result<(), GalleryError> {
        let removed = self
            .cache
            .gallery()
            .update(|items| {
                let before = items.len();
                items.retain(|item| item.filename != filename);
                Ok::<_, StoreError>(before != items.len())
            })
            .await?;

        info!(target = SOURCE, file = filename, removed, "gallery item removed");
        discard(&self.storage, filename, SOURCE).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::{
        cache::{GalleryDocument, MaterialsDocument, collection::tests::MemoryStore},
        domain::entities::SiteConfig,
        infra::uploads::UploadNaming,
    };

    fn service(dir: &std::path::Path) -> GalleryService {
        let cache = Arc::new(ContentCache::new(
            Arc::new(MemoryStore::<GalleryDocument>::default()),
            Arc::new(MemoryStore::<MaterialsDocument>::default()),
            Arc::new(MemoryStore::<SiteConfig>::default()),
        ));
        let storage = Arc::new(
            UploadStorage::new(dir.to_path_buf(), UploadNaming::Timestamp).expect("storage"),
        );
        GalleryService::new(cache, storage)
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gallery = service(dir.path());

        let first = gallery
            .add("First", Some(IncomingFile::new("a.jpg", Bytes::from_static(b"a"))))
            .await
            .expect("first");
        let second = gallery
            .add("Second", Some(IncomingFile::new("b.jpg", Bytes::from_static(b"b"))))
            .await
            .expect("second");

        let listed = gallery.list().await.expect("list");
        assert_eq!(listed, vec![second, first]);
    }

    #[tokio::test]
    async fn add_without_file_is_a_validation_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gallery = service(dir.path());

        let err = gallery.add("Nothing", None).await.expect_err("no file");
        assert!(matches!(err, GalleryError::Domain(DomainError::Validation { .. })));
        assert!(gallery.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn remove_deletes_file_and_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gallery = service(dir.path());
        let item = gallery
            .add("One", Some(IncomingFile::new("one.png", Bytes::from_static(b"1"))))
            .await
            .expect("add");
        assert!(dir.path().join(&item.filename).exists());

        gallery.remove(&item.filename).await.expect("remove");
        gallery.remove(&item.filename).await.expect("remove again");
        gallery.remove("never-existed.png").await.expect("remove unknown");

        assert!(gallery.list().await.expect("list").is_empty());
        assert!(!dir.path().join(&item.filename).exists());
    }
}
