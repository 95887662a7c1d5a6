//! Shared domain enumerations aligned with persisted JSON values.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialStatus {
    #[default]
    Published,
}

impl MaterialStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MaterialStatus::Published => "published",
        }
    }
}

/// The three persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Gallery,
    Materials,
    Config,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Gallery => "gallery",
            Collection::Materials => "materials",
            Collection::Config => "config",
        }
    }
}
