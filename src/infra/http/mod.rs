//! HTTP surface: JSON endpoints, the admin gate and static files.

mod error;
mod extract;
mod handlers;
mod middleware;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};

use crate::{
    application::{
        auth::AccessGate, contact::ContactService, gallery::GalleryService,
        materials::MaterialsService, settings::SettingsService,
    },
    infra::assets::StaticDir,
};

pub use error::JsonError;
pub use extract::{JsonOrForm, UploadForm};

use middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub gallery: Arc<GalleryService>,
    pub materials: Arc<MaterialsService>,
    pub settings: Arc<SettingsService>,
    pub gate: Arc<AccessGate>,
    pub contact: Arc<ContactService>,
    pub public: Arc<StaticDir>,
    pub hero: Arc<StaticDir>,
    pub cookie_name: Arc<str>,
}

/// Build the full application router. `max_request_bytes` bounds multipart uploads.
pub fn build_router(state: HttpState, max_request_bytes: usize) -> Router {
    let uploads = Router::new()
        .route("/upload", post(handlers::gallery::upload))
        .route(
            "/materials",
            get(handlers::materials::list).post(handlers::materials::create),
        )
        .route(
            "/main",
            get(handlers::settings::public_config).post(handlers::settings::save_main),
        )
        .route(
            "/admin/save-settings",
            post(handlers::settings::save_admin),
        )
        .layer(DefaultBodyLimit::max(max_request_bytes));

    Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/logout", get(handlers::auth::logout))
        .route("/change-password", post(handlers::auth::change_password))
        .route("/gallery", get(handlers::gallery::list))
        .route("/delete", post(handlers::gallery::remove))
        .route("/materials/delete", post(handlers::materials::remove))
        .route("/request", post(handlers::contact::submit))
        .route("/admin.html", get(handlers::assets::admin_page))
        .route("/uploads2/{*path}", get(handlers::assets::hero))
        .route("/", get(handlers::assets::public_index))
        .route("/{*path}", get(handlers::assets::public))
        .merge(uploads)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
