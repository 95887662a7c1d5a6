//! Persistence traits describing document store adapters.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed document in `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize document for `{path}`: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            StoreError::Io { path, .. }
            | StoreError::Parse { path, .. }
            | StoreError::Serialize { path, .. } => path,
        }
    }
}

/// Durable home of one whole document (a JSON array or object).
///
/// `read` yields the collection default when nothing has been stored yet and
/// fails only when stored content cannot be read or parsed. `write` replaces
/// the stored document in full.
#[async_trait]
pub trait DocumentStore<D>: Send + Sync
where
    D: Send + Sync,
{
    async fn read(&self) -> Result<D, StoreError>;

    async fn write(&self, document: &D) -> Result<(), StoreError>;
}
