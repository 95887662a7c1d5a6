//! Application services over the cached content collections.

pub mod auth;
pub mod contact;
pub mod error;
pub mod gallery;
pub mod materials;
pub mod repos;
pub mod settings;
pub mod upload;
