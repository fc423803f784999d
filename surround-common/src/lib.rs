//! # Surround Output Common Library
//!
//! Shared code for the surround output workspace:
//! - Configuration loading (TOML file, environment, command line)
//! - Common error type

pub mod config;
pub mod error;

pub use config::{CompiledDefaults, ConfigOverrides, ConfigResolver, TomlConfig};
pub use error::{Error, Result};
