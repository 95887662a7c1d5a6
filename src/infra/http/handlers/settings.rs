use axum::{Json, extract::State};
use axum_extra::extract::Multipart;
use serde::Serialize;

use crate::{
    application::settings::SaveSettingsCommand,
    domain::entities::{SiteConfig, SiteConfigView},
};

use super::super::{HttpState, error::JsonError, extract::UploadForm};
use super::{Success, success};

#[derive(Debug, Serialize)]
pub(crate) struct Saved {
    message: &'static str,
}

pub(crate) async fn public_config(
    State(state): State<HttpState>,
) -> Result<Json<[PublicConfig; 1]>, JsonError> {
    let config = state.settings.get().await?;
    Ok(Json([PublicConfig(config)]))
}

/// Serializes through [`SiteConfig::public_view`] so the password never leaves.
#[derive(Debug)]
pub(crate) struct PublicConfig(SiteConfig);

impl Serialize for PublicConfig {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let view: SiteConfigView<'_> = self.0.public_view();
        view.serialize(serializer)
    }
}

pub(crate) async fn save_main(
    State(state): State<HttpState>,
    multipart: Multipart,
) -> Result<Json<Saved>, JsonError> {
    save(&state, multipart).await?;
    Ok(Json(Saved {
        message: "Settings saved",
    }))
}

pub(crate) async fn save_admin(
    State(state): State<HttpState>,
    multipart: Multipart,
) -> Result<Json<Success>, JsonError> {
    save(&state, multipart).await?;
    Ok(success())
}

async fn save(state: &HttpState, mut multipart: Multipart) -> Result<(), JsonError> {
    let mut form = UploadForm::read(&mut multipart, "image").await?;
    let command = SaveSettingsCommand {
        sitename: form.text("sitename"),
        description: form.text("description"),
        slogan: form.text("slogan"),
        current_image: form.text("currentImage"),
        image: form.take_file(),
    };
    state.settings.save(command).await?;
    Ok(())
}
