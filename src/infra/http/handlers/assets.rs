use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use super::super::HttpState;
use super::auth::session_token;

const ADMIN_PAGE: &str = "admin.html";
const LOGIN_PAGE: &str = "/login.html";

pub(crate) async fn public_index(State(state): State<HttpState>) -> Response {
    state.public.serve("").await
}

/// Any spelling that lands on the admin page goes through the session check.
pub(crate) async fn public(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path(path): Path<String>,
) -> Response {
    if state.public.resolves_to(&path, ADMIN_PAGE) {
        return serve_admin(&state, &jar).await;
    }
    state.public.serve(&path).await
}

pub(crate) async fn hero(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    state.hero.serve(&path).await
}

pub(crate) async fn admin_page(State(state): State<HttpState>, jar: CookieJar) -> Response {
    serve_admin(&state, &jar).await
}

async fn serve_admin(state: &HttpState, jar: &CookieJar) -> Response {
    if !state.gate.is_authenticated(session_token(state, jar)) {
        return Redirect::to(LOGIN_PAGE).into_response();
    }
    state.public.serve(ADMIN_PAGE).await
}
