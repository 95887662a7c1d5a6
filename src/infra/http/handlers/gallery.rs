use axum::{Json, extract::State};
use axum_extra::extract::Multipart;
use serde::Deserialize;

use crate::domain::entities::GalleryItem;

use super::super::{
    HttpState,
    error::JsonError,
    extract::{JsonOrForm, UploadForm},
};
use super::{Success, success};

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteRequest {
    #[serde(default)]
    filename: String,
}

pub(crate) async fn list(State(state): State<HttpState>) -> Result<Json<Vec<GalleryItem>>, JsonError> {
    Ok(Json(state.gallery.list().await?))
}

pub(crate) async fn upload(
    State(state): State<HttpState>,
    mut multipart: Multipart,
) -> Result<Json<Success>, JsonError> {
    let mut form = UploadForm::read(&mut multipart, "image").await?;
    let title = form.text("title");
    state.gallery.add(&title, form.take_file()).await?;
    Ok(success())
}

pub(crate) async fn remove(
    State(state): State<HttpState>,
    JsonOrForm(request): JsonOrForm<DeleteRequest>,
) -> Result<Json<Success>, JsonError> {
    let filename = request.filename.trim();
    if filename.is_empty() {
        return Err(JsonError::bad_request(
            "infra::http::gallery",
            "Field `filename` is required",
        ));
    }
    state.gallery.remove(filename).await?;
    Ok(success())
}
