//! Domain entities mirrored from the JSON collections on disk.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::types::MaterialStatus;

/// One image in the public gallery. Identified by its stored filename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryItem {
    pub filename: String,
    #[serde(default)]
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

/// An article ("material"). Identified by its creation timestamp in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialItem {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Stored filename of the attached image, or empty when none was uploaded.
    #[serde(default)]
    pub image: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    #[serde(default)]
    pub status: MaterialStatus,
}

/// The singleton site-wide settings record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub sitename: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub slogan: String,
    /// Public path of the hero image (`/uploads2/<file>`), or empty.
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub password: String,
}

impl SiteConfig {
    pub fn public_view(&self) -> SiteConfigView<'_> {
        SiteConfigView {
            sitename: &self.sitename,
            description: &self.description,
            slogan: &self.slogan,
            image: &self.image,
        }
    }
}

/// Client-facing projection of [`SiteConfig`]; never carries the password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SiteConfigView<'a> {
    pub sitename: &'a str,
    pub description: &'a str,
    pub slogan: &'a str,
    pub image: &'a str,
}
