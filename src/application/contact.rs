//! Contact-form submissions forwarded to an external chat channel.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::domain::error::DomainError;

const SOURCE: &str = "vitrina::application::contact";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification channel is not configured")]
    Disabled,
    #[error("notification request failed: {0}")]
    Transport(String),
    #[error("notification channel rejected the message with status {status}")]
    Rejected { status: u16 },
}

/// Outbound channel for operator notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Error)]
pub enum ContactError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

#[derive(Debug, Clone, Default)]
pub struct ContactRequest {
    pub phone: String,
    pub email: String,
    pub message: String,
}

impl ContactRequest {
    fn validate(&self) -> Result<(), DomainError> {
        let missing = [
            ("phone", &self.phone),
            ("email", &self.email),
            ("message", &self.message),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty());

        match missing {
            Some((field, _)) => Err(DomainError::validation(format!(
                "Field `{field}` is required"
            ))),
            None => Ok(()),
        }
    }

    /// Markdown body sent to the chat channel.
    pub fn to_markdown(&self) -> String {
        format!(
            "📨 *New request!*\n\n📞 Phone: {}\n✉️ Email: {}\n\n💬 {}",
            self.phone.trim(),
            self.email.trim(),
            self.message.trim()
        )
    }
}

#[derive(Clone)]
pub struct ContactService {
    notifier: Arc<dyn Notifier>,
}

impl ContactService {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub async fn submit(&self, request: ContactRequest) -> Result<(), ContactError> {
        request.validate()?;
        self.notifier.send(&request.to_markdown()).await?;
        info!(target = SOURCE, "contact request forwarded");
        Ok(())
    }
}
