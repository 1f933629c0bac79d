//! Feeding Common - Shared configuration, errors and logging for the feeding bot.
//!
//! This crate provides:
//! - Configuration types and loading (JSON file plus environment overrides)
//! - The shared error type
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{ClockConfig, Config, ObservabilityConfig, TelegramConfig};
pub use error::{Error, Result};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::logging::init_logging;
}
