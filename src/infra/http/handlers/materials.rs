use axum::{Json, extract::State};
use axum_extra::extract::Multipart;
use serde::Deserialize;

use crate::{
    application::materials::CreateMaterialCommand, domain::entities::MaterialItem,
};

use super::super::{
    HttpState,
    error::JsonError,
    extract::{JsonOrForm, UploadForm},
};
use super::{Success, success};

const SOURCE: &str = "infra::http::materials";

/// Browsers send the id as a string taken from a data attribute.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MaterialId {
    Number(i64),
    Text(String),
}

impl MaterialId {
    fn parse(&self) -> Option<i64> {
        match self {
            MaterialId::Number(id) => Some(*id),
            MaterialId::Text(raw) => raw.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteRequest {
    id: Option<MaterialId>,
    #[serde(default)]
    image: Option<String>,
}

pub(crate) async fn list(
    State(state): State<HttpState>,
) -> Result<Json<Vec<MaterialItem>>, JsonError> {
    Ok(Json(state.materials.list().await?))
}

pub(crate) async fn create(
    State(state): State<HttpState>,
    mut multipart: Multipart,
) -> Result<Json<Success>, JsonError> {
    let mut form = UploadForm::read(&mut multipart, "image").await?;
    let command = CreateMaterialCommand {
        title: form.text("title"),
        content: form.text("content"),
        image: form.take_file(),
    };
    state.materials.add(command).await?;
    Ok(success())
}

pub(crate) async fn remove(
    State(state): State<HttpState>,
    JsonOrForm(request): JsonOrForm<DeleteRequest>,
) -> Result<Json<Success>, JsonError> {
    let id = request
        .id
        .as_ref()
        .and_then(MaterialId::parse)
        .ok_or_else(|| JsonError::bad_request(SOURCE, "Field `id` must be a number"))?;

    let image = request.image.as_deref().map(str::trim);
    state.materials.remove(id, image).await?;
    Ok(success())
}
