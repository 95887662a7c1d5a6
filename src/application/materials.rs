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
    domain::{entities::MaterialItem, error::DomainError, types::MaterialStatus},
    infra::uploads::{UploadStorage, UploadStorageError},
    util::clock::unix_millis,
};

const SOURCE: &str = "vitrina::application::materials";

#[derive(Debug, Error)]
pub enum MaterialsError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Upload(#[from] UploadStorageError),
}

#[derive(Debug, Clone)]
pub struct CreateMaterialCommand {
    pub title: String,
    pub content: String,
    pub image: Option<IncomingFile>,
}

#[derive(Clone)]
pub struct MaterialsService {
    cache: Arc<ContentCache>,
    storage: Arc<UploadStorage>,
}

impl MaterialsService {
    pub fn new(cache: Arc<ContentCache>, storage: Arc<UploadStorage>) -> Self {
        Self { cache, storage }
    }

    /// Materials ordered by date, newest first. Stored order is untouched.
    pub async fn list(&self) -> Result<Vec<MaterialItem>, MaterialsError> {
        let mut items = self.cache.materials().get().await?;
        items.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(items)
    }

    pub async fn add(&self, command: CreateMaterialCommand) -> Result<MaterialItem, MaterialsError> {
        let image = match command.image {
            Some(file) => Some(self.storage.store(&file.original_name, file.data).await?),
            None => None,
        };
        let image_name = image
            .as_ref()
            .map(|stored| stored.filename.clone())
            .unwrap_or_default();

        let now = OffsetDateTime::now_utc();
        let title = command.title.trim().to_string();
        let content = command.content.trim().to_string();
        let stored_image = image_name.clone();
        let result = self
            .cache
            .materials()
            .update(move |items| {
                let item = MaterialItem {
                    id: next_id(items, unix_millis(now)),
                    title,
                    content,
                    image: stored_image,
                    date: now,
                    status: MaterialStatus::Published,
                };
                items.push(item.clone());
                Ok::<_, StoreError>(item)
            })
            .await;

        let item = match result {
            Ok(item) => item,
            Err(err) => {
                if !image_name.is_empty() {
                    discard(&self.storage, &image_name, SOURCE).await;
                }
                return Err(err.into());
            }
        };

        info!(
            target = SOURCE,
            id = item.id,
            image = %item.image,
            status = item.status.as_str(),
            "material added"
        );
        Ok(item)
    }

    /// Drop the material with `id` and, when given, its image file.
    pub async fn remove(&self, id: i64, image: Option<&str>) -> Result<(), MaterialsError> {
        let removed = self
            .cache
            .materials()
            .update(|items| {
                let before = items.len();
                items.retain(|item| item.id != id);
                Ok::<_, StoreError>(before != items.len())
            })
            .await?;

        info!(target = SOURCE, id, removed, "material removed");
        if let Some(image) = image.filter(|name| !name.is_empty()) {
            discard(&self.storage, image, SOURCE).await;
        }
        Ok(())
    }
}

/// `candidate` unless an existing id is already at or beyond it.
fn next_id(items: &[MaterialItem], candidate: i64) -> i64 {
    match items.iter().map(|item| item.id).max() {
        Some(max) if max >= candidate => max + 1,
        _ => candidate,
    }
}
