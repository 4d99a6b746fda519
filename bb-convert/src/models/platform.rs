//! Supported streaming platforms

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A supported music catalog
///
/// Adding a platform means adding a variant here and a matching
/// [`crate::catalog::Catalog`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Spotify,
    AppleMusic,
    #[serde(rename = "youtube_music")]
    YouTubeMusic,
}

/// Platform id not recognised
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unsupported platform: {0}")]
pub struct UnknownPlatform(pub String);

impl Platform {
    /// Every supported platform, in display order
    pub const ALL: [Platform; 3] = [Platform::Spotify, Platform::AppleMusic, Platform::YouTubeMusic];

    /// Wire id ("spotify", "apple_music", "youtube_music")
    pub fn id(self) -> &'static str {
        match self {
            Platform::Spotify => "spotify",
            Platform::AppleMusic => "apple_music",
            Platform::YouTubeMusic => "youtube_music",
        }
    }

    /// Human-readable name
    pub fn display_name(self) -> &'static str {
        match self {
            Platform::Spotify => "Spotify",
            Platform::AppleMusic => "Apple Music",
            Platform::YouTubeMusic => "YouTube Music",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spotify" => Ok(Platform::Spotify),
            "apple_music" => Ok(Platform::AppleMusic),
            "youtube_music" => Ok(Platform::YouTubeMusic),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}
