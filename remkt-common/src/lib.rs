//! # remkt Common Library
//!
//! Shared code for the remkt crates:
//! - Error and result types
//! - Configuration file resolution and TOML loading
//! - Logging configuration

pub mod config;
pub mod error;

pub use error::{Error, Result};
