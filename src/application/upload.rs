//! File payloads handed from the HTTP layer to content services.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::infra::uploads::UploadStorage;

/// A file received in a multipart request, not yet written to disk.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub data: Bytes,
}

impl IncomingFile {
    pub fn new(original_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            original_name: original_name.into(),
            data: data.into(),
        }
    }
}

/// Best-effort removal of a stored file. Failures are logged and swallowed.
pub(crate) async fn discard(storage: &UploadStorage, filename: &str, source: &'static str) {
    match storage.delete(filename).await {
        Ok(()) => debug!(target = source, file = filename, "upload removed"),
        Err(err) => warn!(
            target = source,
            file = filename,
            error = %err,
            "failed to remove upload"
        ),
    }
}
