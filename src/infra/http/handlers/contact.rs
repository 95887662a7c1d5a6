use axum::{Json, extract::State};
use serde::Deserialize;

use crate::application::contact::ContactRequest;

use super::super::{HttpState, error::JsonError, extract::JsonOrForm};
use super::{Success, success};

#[derive(Debug, Deserialize)]
pub(crate) struct ContactForm {
    #[serde(default)]
    phone: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    message: String,
}

pub(crate) async fn submit(
    State(state): State<HttpState>,
    JsonOrForm(form): JsonOrForm<ContactForm>,
) -> Result<Json<Success>, JsonError> {
    state
        .contact
        .submit(ContactRequest {
            phone: form.phone,
            email: form.email,
            message: form.message,
        })
        .await?;
    Ok(success())
}
