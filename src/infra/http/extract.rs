//! Request extractors for the JSON/form endpoints and multipart uploads.

use std::collections::HashMap;

use axum::{
    Form, Json,
    extract::{FromRequest, Request},
    http::{StatusCode, header::CONTENT_TYPE},
};
use axum_extra::extract::Multipart;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::application::upload::IncomingFile;

use super::error::JsonError;

const SOURCE: &str = "infra::http::extract";

/// Accepts either an `application/json` body or an urlencoded form.
#[derive(Debug)]
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = JsonError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.trim_start().starts_with("application/json"));

        if is_json {
            Json::<T>::from_request(req, state)
                .await
                .map(|Json(value)| Self(value))
                .map_err(|rejection| {
                    JsonError::new(SOURCE, rejection.status(), "Malformed request body")
                })
        } else {
            Form::<T>::from_request(req, state)
                .await
                .map(|Form(value)| Self(value))
                .map_err(|rejection| {
                    JsonError::new(SOURCE, rejection.status(), "Malformed request body")
                })
        }
    }
}

/// A fully-read multipart form: text fields plus at most one file.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    file: Option<IncomingFile>,
}

impl UploadForm {
    /// Read every part. Only the part named `file_field` is treated as a file;
    /// a part with no filename or no bytes counts as "no file uploaded".
    pub async fn read(multipart: &mut Multipart, file_field: &str) -> Result<Self, JsonError> {
        let mut form = UploadForm::default();
        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(err) => {
                    let status = err.status();
                    warn!(
                        target = SOURCE,
                        status = status.as_u16(),
                        error = %err,
                        "failed to read multipart payload"
                    );
                    return Err(match status {
                        StatusCode::PAYLOAD_TOO_LARGE => JsonError::new(
                            SOURCE,
                            StatusCode::PAYLOAD_TOO_LARGE,
                            "Uploaded file is too large",
                        ),
                        _ => JsonError::bad_request(SOURCE, "Invalid form data"),
                    });
                }
            };

            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == file_field {
                let original_name = field
                    .file_name()
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(str::to_string);
                let data = field.bytes().await.map_err(|err| {
                    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
                        JsonError::new(
                            SOURCE,
                            StatusCode::PAYLOAD_TOO_LARGE,
                            "Uploaded file is too large",
                        )
                    } else {
                        JsonError::bad_request(SOURCE, "Invalid form data")
                    }
                })?;
                if let Some(original_name) = original_name
                    && !data.is_empty()
                {
                    form.file = Some(IncomingFile::new(original_name, data));
                }
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|_| JsonError::bad_request(SOURCE, "Invalid form data"))?;
            form.fields.insert(name, value);
        }
        Ok(form)
    }

    /// Text field value, or empty when the client omitted it.
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    pub fn take_file(&mut self) -> Option<IncomingFile> {
        self.file.take()
    }
}
