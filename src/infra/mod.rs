//! Infrastructure adapters and runtime bootstrap.

pub mod assets;
pub mod bootstrap;
pub mod error;
pub mod http;
pub mod notify;
pub mod store;
pub mod sweeper;
pub mod telemetry;
pub mod uploads;
