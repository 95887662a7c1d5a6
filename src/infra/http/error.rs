//! JSON failure responses shared by every API handler.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    application::{
        auth::{AuthError, LoginError},
        contact::{ContactError, NotifyError},
        error::ErrorReport,
        gallery::GalleryError,
        materials::MaterialsError,
        repos::StoreError,
        settings::SettingsError,
    },
    domain::error::DomainError,
    infra::uploads::UploadStorageError,
};

const SERVER_ERROR: &str = "Server error";

#[derive(Debug, Serialize)]
struct FailureBody<'a> {
    success: bool,
    message: &'a str,
}

/// `{ "success": false, "message": ... }` with a status and a diagnostic report.
#[derive(Debug)]
pub struct JsonError {
    status: StatusCode,
    message: String,
    report: ErrorReport,
}

impl JsonError {
    pub fn new(source: &'static str, status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status,
            report: ErrorReport::from_message(source, status, message.clone()),
            message,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
        error: &dyn std::error::Error,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            report: ErrorReport::from_error(source, status, error),
        }
    }

    pub fn bad_request(source: &'static str, message: impl Into<String>) -> Self {
        Self::new(source, StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        let body = FailureBody {
            success: false,
            message: &self.message,
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}

pub(crate) fn domain_error(source: &'static str, err: DomainError) -> JsonError {
    match &err {
        DomainError::Validation { message } => {
            JsonError::from_error(source, StatusCode::BAD_REQUEST, message.clone(), &err)
        }
    }
}

pub(crate) fn auth_error(source: &'static str, err: AuthError) -> JsonError {
    let status = match err {
        AuthError::Unauthenticated | AuthError::InvalidPassword => StatusCode::UNAUTHORIZED,
        AuthError::BadConfirmationKey => StatusCode::FORBIDDEN,
        AuthError::WrongPassword => StatusCode::BAD_REQUEST,
    };
    JsonError::new(source, status, err.to_string())
}

pub(crate) fn store_error(source: &'static str, err: StoreError) -> JsonError {
    JsonError::from_error(source, StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR, &err)
}

pub(crate) fn upload_error(source: &'static str, err: UploadStorageError) -> JsonError {
    let (status, message) = match &err {
        UploadStorageError::EmptyPayload => (StatusCode::BAD_REQUEST, "Uploaded file is empty"),
        UploadStorageError::InvalidPath => (StatusCode::BAD_REQUEST, "Invalid file name"),
        UploadStorageError::Io(_)
        | UploadStorageError::SizeOverflow
        | UploadStorageError::NameExhausted => (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR),
    };
    JsonError::from_error(source, status, message, &err)
}

impl From<GalleryError> for JsonError {
    fn from(err: GalleryError) -> Self {
        const SOURCE: &str = "infra::http::gallery";
        match err {
            GalleryError::Domain(err) => domain_error(SOURCE, err),
            GalleryError::Store(err) => store_error(SOURCE, err),
            GalleryError::Upload(err) => upload_error(SOURCE, err),
        }
    }
}

impl From<MaterialsError> for JsonError {
    fn from(err: MaterialsError) -> Self {
        const SOURCE: &str = "infra::http::materials";
        match err {
            MaterialsError::Domain(err) => domain_error(SOURCE, err),
            MaterialsError::Store(err) => store_error(SOURCE, err),
            MaterialsError::Upload(err) => upload_error(SOURCE, err),
        }
    }
}

impl From<SettingsError> for JsonError {
    fn from(err: SettingsError) -> Self {
        const SOURCE: &str = "infra::http::settings";
        match err {
            SettingsError::Domain(err) => domain_error(SOURCE, err),
            SettingsError::Auth(err) => auth_error(SOURCE, err),
            SettingsError::Store(err) => store_error(SOURCE, err),
            SettingsError::Upload(err) => upload_error(SOURCE, err),
        }
    }
}

impl From<LoginError> for JsonError {
    fn from(err: LoginError) -> Self {
        const SOURCE: &str = "infra::http::auth";
        match err {
            LoginError::Auth(err) => auth_error(SOURCE, err),
            LoginError::Settings(err) => err.into(),
        }
    }
}

impl From<AuthError> for JsonError {
    fn from(err: AuthError) -> Self {
        auth_error("infra::http::auth", err)
    }
}

impl From<ContactError> for JsonError {
    fn from(err: ContactError) -> Self {
        const SOURCE: &str = "infra::http::contact";
        match err {
            ContactError::Domain(err) => domain_error(SOURCE, err),
            ContactError::Notify(err) => {
                let (status, message) = match &err {
                    NotifyError::Disabled => (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "Notifications are not configured",
                    ),
                    NotifyError::Transport(_) | NotifyError::Rejected { .. } => {
                        (StatusCode::BAD_GATEWAY, "Failed to deliver the request")
                    }
                };
                JsonError::from_error(SOURCE, status, message, &err)
            }
        }
    }
}
