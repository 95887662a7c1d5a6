pub(super) mod assets;
pub(super) mod auth;
pub(super) mod contact;
pub(super) mod gallery;
pub(super) mod materials;
pub(super) mod settings;

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct Success {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

pub(crate) fn success() -> Json<Success> {
    Json(Success {
        success: true,
        message: None,
    })
}

pub(crate) fn success_with(message: &'static str) -> Json<Success> {
    Json(Success {
        success: true,
        message: Some(message),
    })
}
