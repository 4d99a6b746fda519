//! Errors shared by the BeatBridge crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures while loading or writing shared configuration
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unparseable TOML, an unresolvable path, or an out-of-range value
    #[error("Configuration error: {0}")]
    Config(String),
}
