//! Core utilities shared by every tributario crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging setup
//! - Configuration loading and validation

pub mod config;
pub mod error;
pub mod logging;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
