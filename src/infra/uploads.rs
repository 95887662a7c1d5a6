//! Upload directories: unique naming, storage and idempotent removal.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use slug::slugify;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};

use crate::util::clock::now_millis;

const MAX_NAME_ATTEMPTS: i64 = 64;

/// Errors that can occur while interacting with the upload directories.
#[derive(Debug, Error)]
pub enum UploadStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file is empty")]
    EmptyPayload,
    #[error("uploaded file size exceeds supported range")]
    SizeOverflow,
    #[error("could not allocate a unique filename")]
    NameExhausted,
}

/// How stored filenames are derived from the upload time and client filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadNaming {
    /// `<millis><.ext>`, keeping only the lower-cased extension.
    Timestamp,
    /// `<millis>-<sanitized original name>`.
    TimestampWithName,
}

/// Result of storing an upload payload.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub filename: String,
    pub checksum: String,
    pub size_bytes: u64,
}

/// A flat directory of uploaded files.
#[derive(Debug)]
pub struct UploadStorage {
    root: PathBuf,
    naming: UploadNaming,
}

impl UploadStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf, naming: UploadNaming) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root, naming })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the payload to a freshly named file and describe what was stored.
    pub async fn store(
        &self,
        original_name: &str,
        data: Bytes,
    ) -> Result<StoredUpload, UploadStorageError> {
        if data.is_empty() {
            return Err(UploadStorageError::EmptyPayload);
        }
        let size_bytes =
            u64::try_from(data.len()).map_err(|_| UploadStorageError::SizeOverflow)?;

        fs::create_dir_all(&self.root).await?;
        let (filename, absolute, mut file) = self.create_unique(original_name).await?;

        let written = async {
            file.write_all(&data).await?;
            file.flush().await
        }
        .await;
        if let Err(err) = written {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(UploadStorageError::Io(err));
        }

        Ok(StoredUpload {
            filename,
            checksum: hex::encode(Sha256::digest(&data)),
            size_bytes,
        })
    }

    /// Remove the stored payload. Missing files are treated as success.
    pub async fn delete(&self, filename: &str) -> Result<(), UploadStorageError> {
        let absolute = self.resolve(filename)?;
        match fs::remove_file(&absolute).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(UploadStorageError::Io(err)),
        }
    }

    /// Resolve the absolute filesystem path for a stored upload.
    fn resolve(&self, filename: &str) -> Result<PathBuf, UploadStorageError> {
        let relative = Path::new(filename);
        if filename.is_empty()
            || relative.is_absolute()
            || relative
                .components()
                .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(UploadStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }

    async fn create_unique(
        &self,
        original_name: &str,
    ) -> Result<(String, PathBuf, fs::File), UploadStorageError> {
        let base = now_millis();
        for offset in 0..MAX_NAME_ATTEMPTS {
            let filename = build_filename(self.naming, base + offset, original_name);
            let absolute = self.root.join(&filename);
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&absolute)
                .await
            {
                Ok(file) => return Ok((filename, absolute, file)),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(UploadStorageError::Io(err)),
            }
        }
        Err(UploadStorageError::NameExhausted)
    }
}

fn build_filename(naming: UploadNaming, millis: i64, original: &str) -> String {
    match naming {
        UploadNaming::Timestamp => match extension_of(original) {
            Some(ext) => format!("{millis}.{ext}"),
            None => millis.to_string(),
        },
        UploadNaming::TimestampWithName => {
            format!("{millis}-{}", sanitize_filename(original))
        }
    }
}

fn extension_of(original: &str) -> Option<String> {
    Path::new(original)
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn sanitize_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("upload");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "upload".to_string();
    }

    match extension_of(original) {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}
