use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    application::{
        auth::{AuthError, secrets_match},
        repos::StoreError,
        upload::{IncomingFile, discard},
    },
    cache::ContentCache,
    domain::{entities::SiteConfig, error::DomainError},
    infra::uploads::{UploadStorage, UploadStorageError},
};

const SOURCE: &str = "vitrina::application::settings";

/// URL prefix under which hero images are served.
pub const HERO_URL_PREFIX: &str = "/uploads2/";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Upload(#[from] UploadStorageError),
}

#[derive(Debug, Clone)]
pub struct SaveSettingsCommand {
    pub sitename: String,
    pub description: String,
    pub slogan: String,
    pub image: Option<IncomingFile>,
    /// Path echoed back by the client, kept when no new image is uploaded.
    pub current_image: String,
}

#[derive(Debug, Clone)]
pub struct ChangePasswordCommand {
    pub old_password: String,
    pub new_password: String,
    pub confirmation_key: String,
}

/// Secrets that guard the admin password.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    /// Used when the stored record carries no password.
    pub default_password: String,
    /// Required to change the password. Unset disables password changes.
    pub confirmation_key: Option<String>,
}

#[derive(Clone)]
pub struct SettingsService {
    cache: Arc<ContentCache>,
    hero_storage: Arc<UploadStorage>,
    policy: PasswordPolicy,
}

impl SettingsService {
    pub fn new(
        cache: Arc<ContentCache>,
        hero_storage: Arc<UploadStorage>,
        policy: PasswordPolicy,
    ) -> Self {
        if policy.confirmation_key.is_none() {
            warn!(
                target = SOURCE,
                "no confirmation key configured, password changes are disabled"
            );
        }
        Self {
            cache,
            hero_storage,
            policy,
        }
    }

    pub async fn get(&self) -> Result<SiteConfig, SettingsError> {
        Ok(self.cache.config().get().await?)
    }

    /// Replace sitename, description, slogan and image. The password is kept.
    pub async fn save(&self, command: SaveSettingsCommand) -> Result<SiteConfig, SettingsError> {
        let uploaded = match command.image {
            Some(file) => Some(
                self.hero_storage
                    .store(&file.original_name, file.data)
                    .await?,
            ),
            None => None,
        };
        let image = match &uploaded {
            Some(stored) => format!("{HERO_URL_PREFIX}{}", stored.filename),
            None => command.current_image,
        };

        let replacement = SiteConfig {
            sitename: command.sitename,
            description: command.description,
            slogan: command.slogan,
            image,
            password: String::new(),
        };
        let result = self
            .cache
            .config()
            .update(move |config| {
                let password = std::mem::take(&mut config.password);
                *config = SiteConfig {
                    password,
                    ..replacement
                };
                Ok::<_, StoreError>(config.clone())
            })
            .await;

        match result {
            Ok(saved) => {
                info!(target = SOURCE, image = %saved.image, "site settings saved");
                Ok(saved)
            }
            Err(err) => {
                if let Some(stored) = uploaded {
                    discard(&self.hero_storage, &stored.filename, SOURCE).await;
                }
                Err(err.into())
            }
        }
    }

    /// Whether `candidate` is the current admin password.
    pub async fn verify_password(&self, candidate: &str) -> Result<bool, SettingsError> {
        let config = self.cache.config().get().await?;
        Ok(secrets_match(self.effective_password(&config), candidate))
    }

    /// Rotate the admin password. The caller must already be authenticated.
    pub async fn change_password(&self, command: ChangePasswordCommand) -> Result<(), SettingsError> {
        let key_ok = self
            .policy
            .confirmation_key
            .as_deref()
            .is_some_and(|expected| secrets_match(expected, &command.confirmation_key));
        if !key_ok {
            return Err(AuthError::BadConfirmationKey.into());
        }
        if command.new_password.trim().is_empty() {
            return Err(DomainError::validation("New password must not be empty").into());
        }

        let default_password = self.policy.default_password.as_str();
        self.cache
            .config()
            .update(|config| {
                let current = if config.password.is_empty() {
                    default_password
                } else {
                    config.password.as_str()
                };
                if !secrets_match(current, &command.old_password) {
                    return Err(SettingsError::from(AuthError::WrongPassword));
                }
                config.password = command.new_password;
                Ok(())
            })
            .await?;

        info!(target = SOURCE, "admin password changed");
        Ok(())
    }

    fn effective_password<'a>(&'a self, config: &'a SiteConfig) -> &'a str {
        if config.password.is_empty() {
            &self.policy.default_password
        } else {
            &config.password
        }
    }
}
