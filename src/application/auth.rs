//! Shared-password access gate and in-memory admin sessions.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::settings::{SettingsError, SettingsService};

const SOURCE: &str = "vitrina::application::auth";

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("Invalid confirmation key")]
    BadConfirmationKey,
    #[error("Current password is incorrect")]
    WrongPassword,
    #[error("Invalid password. Please try again.")]
    InvalidPassword,
}

/// Compare two secrets without leaking where they differ.
pub fn secrets_match(expected: &str, provided: &str) -> bool {
    hash_secret(expected).ct_eq(&hash_secret(provided)).into()
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

/// Opaque session identifier handed to the browser in a cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    fn generate() -> Self {
        Self(format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Authenticated sessions keyed by token, each with an expiry deadline.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, Instant>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self) -> SessionToken {
        self.purge_expired();
        let token = SessionToken::generate();
        self.sessions
            .insert(token.as_str().to_string(), Instant::now() + self.ttl);
        token
    }

    pub fn is_active(&self, token: &str) -> bool {
        let expired = match self.sessions.get(token) {
            Some(deadline) => *deadline <= Instant::now(),
            None => return false,
        };
        if expired {
            self.sessions.remove(token);
        }
        !expired
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn purge_expired(&self) {
        let now = Instant::now();
        self.sessions.retain(|_, deadline| *deadline > now);
    }
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Checks the admin password and tracks who is logged in.
pub struct AccessGate {
    settings: SettingsService,
    sessions: SessionStore,
    failure_delay: Duration,
}

impl AccessGate {
    pub fn new(settings: SettingsService, session_ttl: Duration, failure_delay: Duration) -> Self {
        Self {
            settings,
            sessions: SessionStore::new(session_ttl),
            failure_delay,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Open a session for the right password. Wrong passwords are answered
    /// only after the configured delay.
    pub async fn login(&self, password: &str) -> Result<SessionToken, LoginError> {
        if self.settings.verify_password(password).await? {
            let token = self.sessions.issue();
            info!(target = SOURCE, active = self.sessions.len(), "admin logged in");
            return Ok(token);
        }

        warn!(target = SOURCE, "rejected admin login");
        if !self.failure_delay.is_zero() {
            tokio::time::sleep(self.failure_delay).await;
        }
        Err(AuthError::InvalidPassword.into())
    }

    pub fn is_authenticated(&self, token: Option<&str>) -> bool {
        token.is_some_and(|token| self.sessions.is_active(token))
    }

    pub fn require(&self, token: Option<&str>) -> Result<(), AuthError> {
        if self.is_authenticated(token) {
            Ok(())
        } else {
            Err(AuthError::Unauthenticated)
        }
    }

    pub fn logout(&self, token: Option<&str>) {
        if let Some(token) = token
            && self.sessions.revoke(token)
        {
            info!(target = SOURCE, "admin logged out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::settings::tests::{policy, service_with},
        domain::entities::SiteConfig,
    };

    fn gate(dir: &std::path::Path, ttl: Duration) -> AccessGate {
        let settings = service_with(
            dir,
            SiteConfig {
                password: "secret".into(),
                ..SiteConfig::default()
            },
            policy(),
        );
        AccessGate::new(settings, ttl, Duration::ZERO)
    }

    #[test]
    fn secrets_match_is_exact() {
        assert!(secrets_match("abc", "abc"));
        assert!(!secrets_match("abc", "abd"));
        assert!(!secrets_match("abc", ""));
    }

    #[tokio::test]
    async fn login_issues_session_for_correct_password() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gate = gate(dir.path(), Duration::from_secs(60));

        let token = gate.login("secret").await.expect("login");
        assert!(gate.is_authenticated(Some(token.as_str())));

        gate.logout(Some(token.as_str()));
        assert!(!gate.is_authenticated(Some(token.as_str())));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gate = gate(dir.path(), Duration::from_secs(60));

        let err = gate.login("guess").await.expect_err("must fail");
        assert!(matches!(err, LoginError::Auth(AuthError::InvalidPassword)));
        assert!(gate.sessions().is_empty());
        assert_eq!(gate.require(None), Err(AuthError::Unauthenticated));
    }

    #[tokio::test]
    async fn expired_sessions_are_not_honoured() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gate = gate(dir.path(), Duration::ZERO);

        let token = gate.login("secret").await.expect("login");
        assert!(!gate.is_authenticated(Some(token.as_str())));
        assert!(gate.sessions().is_empty());
    }
}
