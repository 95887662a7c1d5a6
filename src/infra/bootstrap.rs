//! Wires settings into stores, services and the HTTP state.

use std::sync::Arc;

use axum::Router;
use tracing::info;

use crate::{
    application::{
        auth::AccessGate,
        contact::{ContactService, Notifier},
        error::AppError,
        gallery::GalleryService,
        materials::MaterialsService,
        repos::DocumentStore,
        settings::{PasswordPolicy, SettingsService},
    },
    cache::{ContentCache, GalleryDocument, MaterialsDocument},
    config::Settings,
    domain::{entities::SiteConfig, types::Collection},
    infra::{
        assets::StaticDir,
        error::InfraError,
        http::{self, HttpState},
        notify::{DisabledNotifier, TelegramNotifier},
        store::JsonFileStore,
        sweeper::UploadSweeper,
        uploads::{UploadNaming, UploadStorage},
    },
};

const SOURCE: &str = "vitrina::bootstrap";

/// Everything the server needs, built once at startup.
pub struct Application {
    pub state: HttpState,
    pub cache: Arc<ContentCache>,
    pub sweeper: UploadSweeper,
    max_request_bytes: usize,
}

impl Application {
    pub fn router(&self) -> Router {
        http::build_router(self.state.clone(), self.max_request_bytes)
    }
}

/// Build the application graph. Upload directories are created here.
pub fn assemble(settings: &Settings) -> Result<Application, AppError> {
    let gallery_store: Arc<dyn DocumentStore<GalleryDocument>> = Arc::new(JsonFileStore::new(
        Collection::Gallery,
        settings.storage.gallery_file(),
    ));
    let materials_store: Arc<dyn DocumentStore<MaterialsDocument>> = Arc::new(
        JsonFileStore::new(Collection::Materials, settings.storage.materials_file()),
    );
    let config_store: Arc<dyn DocumentStore<SiteConfig>> = Arc::new(JsonFileStore::new(
        Collection::Config,
        settings.storage.config_file.clone(),
    ));
    let cache = Arc::new(ContentCache::new(
        gallery_store,
        materials_store,
        config_store,
    ));

    let gallery_storage = Arc::new(
        UploadStorage::new(settings.uploads.gallery_dir.clone(), UploadNaming::Timestamp)
            .map_err(|err| AppError::from(InfraError::Io(err)))?,
    );
    let hero_storage = Arc::new(
        UploadStorage::new(
            settings.uploads.hero_dir.clone(),
            UploadNaming::TimestampWithName,
        )
        .map_err(|err| AppError::from(InfraError::Io(err)))?,
    );

    let settings_service = SettingsService::new(
        cache.clone(),
        hero_storage.clone(),
        PasswordPolicy {
            default_password: settings.auth.default_password.clone(),
            confirmation_key: settings.auth.confirmation_key.clone(),
        },
    );
    let gate = AccessGate::new(
        settings_service.clone(),
        settings.auth.session_ttl,
        settings.auth.login_failure_delay,
    );

    let state = HttpState {
        gallery: Arc::new(GalleryService::new(cache.clone(), gallery_storage.clone())),
        materials: Arc::new(MaterialsService::new(cache.clone(), gallery_storage)),
        settings: Arc::new(settings_service),
        gate: Arc::new(gate),
        contact: Arc::new(ContactService::new(build_notifier(settings)?)),
        public: Arc::new(StaticDir::new(
            settings.uploads.public_dir.clone(),
            "infra::assets::public",
        )),
        hero: Arc::new(StaticDir::new(
            hero_storage.root().to_path_buf(),
            "infra::assets::hero",
        )),
        cookie_name: Arc::from(settings.auth.cookie_name.as_str()),
    };

    let max_request_bytes = usize::try_from(settings.uploads.max_request_bytes.get())
        .map_err(|_| InfraError::configuration("uploads.max_request_bytes exceeds usize"))?;

    Ok(Application {
        state,
        cache,
        sweeper: UploadSweeper::new(settings.uploads.hero_dir.clone()),
        max_request_bytes,
    })
}

fn build_notifier(settings: &Settings) -> Result<Arc<dyn Notifier>, AppError> {
    let notify = &settings.notify;
    match (notify.bot_token.as_deref(), notify.chat_id.as_deref()) {
        (Some(token), Some(chat_id)) => {
            let notifier = TelegramNotifier::new(&notify.api_base, token, chat_id.to_string())
                .map_err(|err| InfraError::configuration(err.to_string()))?;
            info!(target = SOURCE, api_base = %notify.api_base, "contact notifications enabled");
            Ok(Arc::new(notifier))
        }
        _ => {
            info!(
                target = SOURCE,
                "contact notifications disabled, bot token or chat id missing"
            );
            Ok(Arc::new(DisabledNotifier))
        }
    }
}
