use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use crate::application::settings::ChangePasswordCommand;

use super::super::{HttpState, error::JsonError, extract::JsonOrForm};
use super::{Success, success_with};

const LOGIN_PAGE: &str = "/login.html";

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChangePasswordRequest {
    #[serde(rename = "oldPass", default)]
    old_pass: String,
    #[serde(rename = "newPass", default)]
    new_pass: String,
    #[serde(rename = "passKey", default)]
    pass_key: String,
}

pub(crate) fn session_token<'a>(state: &HttpState, jar: &'a CookieJar) -> Option<&'a str> {
    jar.get(&state.cookie_name).map(|cookie| cookie.value())
}

pub(crate) async fn login(
    State(state): State<HttpState>,
    jar: CookieJar,
    JsonOrForm(request): JsonOrForm<LoginRequest>,
) -> Result<(CookieJar, Json<Success>), JsonError> {
    let token = state.gate.login(&request.password).await?;

    let max_age = time::Duration::try_from(state.gate.sessions().ttl())
        .unwrap_or(time::Duration::DAY);
    let cookie = Cookie::build((state.cookie_name.to_string(), token.as_str().to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age);

    Ok((jar.add(cookie), success_with("Login successful")))
}

pub(crate) async fn logout(State(state): State<HttpState>, jar: CookieJar) -> Response {
    state.gate.logout(session_token(&state, &jar));
    let jar = jar.remove(Cookie::build(state.cookie_name.to_string()).path("/"));
    (jar, Redirect::to(LOGIN_PAGE)).into_response()
}

pub(crate) async fn change_password(
    State(state): State<HttpState>,
    jar: CookieJar,
    JsonOrForm(request): JsonOrForm<ChangePasswordRequest>,
) -> Result<Json<Success>, JsonError> {
    state.gate.require(session_token(&state, &jar))?;

    state
        .settings
        .change_password(ChangePasswordCommand {
            old_password: request.old_pass,
            new_password: request.new_pass,
            confirmation_key: request.pass_key,
        })
        .await?;

    Ok(success_with("Password changed successfully"))
}
