//! # BeatBridge Common Library
//!
//! Shared code for the BeatBridge conversion service:
//! - Common error type
//! - TOML configuration model and loading
//! - Job status / phase types and the job event bus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
