//! Static file serving from the public and hero upload directories.

use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use mime_guess::Mime;
use tokio::fs;

use crate::application::error::HttpError;

const INDEX_FILE: &str = "index.html";
const CACHE_CONTROL_VALUE: &str = "public, max-age=86400";

/// A directory served read-only over HTTP.
#[derive(Debug, Clone)]
pub struct StaticDir {
    root: PathBuf,
    source: &'static str,
}

impl StaticDir {
    pub fn new(root: impl Into<PathBuf>, source: &'static str) -> Self {
        Self {
            root: root.into(),
            source,
        }
    }

    /// Whether `path` resolves to the same file as `asset`. Leading and
    /// repeated slashes, `.` segments and ASCII case are ignored.
    pub fn resolves_to(&self, path: &str, asset: &str) -> bool {
        match (
            resolve_asset(&self.root, path),
            resolve_asset(&self.root, asset),
        ) {
            (Some(requested), Some(target)) => requested
                .to_string_lossy()
                .eq_ignore_ascii_case(&target.to_string_lossy()),
            _ => false,
        }
    }

    /// Serve `path` relative to the root. Directories resolve to their index page.
    pub async fn serve(&self, path: &str) -> Response {
        let Some(mut candidate) = resolve_asset(&self.root, path) else {
            return self.not_found("Static asset request rejected");
        };

        match fs::metadata(&candidate).await {
            Ok(metadata) if metadata.is_dir() => candidate.push(INDEX_FILE),
            Ok(_) => {}
            Err(err)
                if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) =>
            {
                return self.not_found("Static asset not found");
            }
            Err(err) => return self.failure(&err),
        }

        match fs::read(&candidate).await {
            Ok(contents) => {
                let mime = mime_guess::from_path(&candidate).first_or_octet_stream();
                build_response(Bytes::from(contents), mime)
            }
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::NotFound | ErrorKind::IsADirectory | ErrorKind::NotADirectory
                ) =>
            {
                self.not_found("Static asset not found")
            }
            Err(err) => self.failure(&err),
        }
    }

    fn not_found(&self, detail: &'static str) -> Response {
        HttpError::new(self.source, StatusCode::NOT_FOUND, "Not found", detail).into_response()
    }

    fn failure(&self, err: &std::io::Error) -> Response {
        HttpError::from_error(
            self.source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            err,
        )
        .into_response()
    }
}

fn resolve_asset(root: &Path, path: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(segment) => relative.push(segment),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(root.join(relative))
}

fn build_response(bytes: Bytes, mime: Mime) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CACHE_CONTROL_VALUE),
    );

    response
}
