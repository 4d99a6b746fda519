//! Catalog adapters
//!
//! One adapter per streaming platform, all behind the [`CatalogAdapter`]
//! contract: fetch a playlist, search for candidates, create a playlist.
//! [`Catalog`] is the closed set of live adapters; [`CatalogProvider`] is the
//! seam the service uses to open them (tests substitute mocks).

pub mod apple_music;
mod http;
pub mod retry;
pub mod spotify;
pub mod youtube_music;

pub use apple_music::AppleMusicClient;
pub use retry::RetryPolicy;
pub use spotify::SpotifyClient;
pub use youtube_music::YouTubeMusicClient;

use crate::models::{MatchCandidate, Platform, Playlist, Track};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Adapter errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    /// Reference does not resolve
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credentials missing, invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Upstream throttled the request
    #[error("Rate limited by upstream")]
    RateLimited { retry_after: Option<Duration> },

    /// Request exceeded its time budget
    #[error("Upstream request timed out")]
    Timeout,

    /// Upstream rejected the request or answered with something unusable
    #[error("Remote error: {0}")]
    RemoteError(String),
}

impl CatalogError {
    /// Map an HTTP error status to the adapter taxonomy
    pub fn from_status(code: u16, message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        let message = message.into();
        match code {
            401 | 403 => Self::Unauthorized(message),
            404 => Self::NotFound(message),
            429 => Self::RateLimited { retry_after },
            408 | 504 => Self::Timeout,
            _ => Self::RemoteError(format!("HTTP {}: {}", code, message)),
        }
    }

    /// Rate limits and timeouts may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Timeout)
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if let Some(status) = e.status() {
            Self::from_status(status.as_u16(), e.to_string(), None)
        } else {
            Self::RemoteError(e.to_string())
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Destination search input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
}

impl SearchQuery {
    /// Free-text form for platforms without field filters
    pub fn as_text(&self) -> String {
        format!("{} {}", self.title, self.artist)
    }
}

impl From<&Track> for SearchQuery {
    fn from(track: &Track) -> Self {
        Self {
            title: track.title().to_string(),
            artist: track.artist().to_string(),
            album: track.album().map(str::to_string),
        }
    }
}

/// Identity of a newly created destination playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPlaylist {
    pub playlist_id: String,
    pub playlist_url: String,
}

/// Per-platform catalog contract
#[async_trait]
pub trait CatalogAdapter: Send + Sync {
    /// Platform this adapter talks to
    fn platform(&self) -> Platform;

    /// Fetch a playlist and all of its tracks, in order
    ///
    /// # Errors
    /// `NotFound`, `Unauthorized`, `RateLimited`, `Timeout`, `RemoteError`
    async fn fetch_playlist(&self, playlist_id: &str) -> CatalogResult<Playlist>;

    /// Search the catalog, ranked by the platform's own relevance order
    ///
    /// An empty result is not an error.
    async fn search_candidates(&self, query: &SearchQuery) -> CatalogResult<Vec<MatchCandidate>>;

    /// Create a playlist holding `track_ids` in the given order
    ///
    /// # Errors
    /// `Unauthorized`, `RemoteError` (e.g. quota exceeded)
    async fn create_playlist(
        &self,
        name: &str,
        description: Option<&str>,
        track_ids: &[String],
    ) -> CatalogResult<CreatedPlaylist>;
}

/// HTTP behaviour shared by the live clients
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Client-side request rate per adapter
    pub requests_per_second: u32,
    pub retry: RetryPolicy,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            requests_per_second: 10,
            retry: RetryPolicy::default(),
        }
    }
}

/// Server-side platform credentials
#[derive(Debug, Clone, Default)]
pub struct PlatformCredentials {
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub apple_music_developer_token: Option<String>,
    pub apple_music_storefront: String,
    pub youtube_api_key: Option<String>,
}

impl PlatformCredentials {
    /// Whether the service can read from `platform` without a user token
    pub fn is_configured(&self, platform: Platform) -> bool {
        match platform {
            Platform::Spotify => {
                self.spotify_client_id.is_some() && self.spotify_client_secret.is_some()
            }
            Platform::AppleMusic => self.apple_music_developer_token.is_some(),
            Platform::YouTubeMusic => self.youtube_api_key.is_some(),
        }
    }
}

/// Live adapters, one variant per supported platform
pub enum Catalog {
    Spotify(SpotifyClient),
    AppleMusic(AppleMusicClient),
    YouTubeMusic(YouTubeMusicClient),
}

impl Catalog {
    /// Build the adapter for `platform`
    ///
    /// `user_token` is the end user's OAuth token (Spotify access token,
    /// Apple Music user token, Google OAuth token). Fails with `Unauthorized`
    /// when neither server credentials nor a user token allow access.
    pub fn open(
        platform: Platform,
        credentials: &PlatformCredentials,
        settings: &HttpSettings,
        user_token: Option<&str>,
    ) -> CatalogResult<Self> {
        let user_token = user_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        match platform {
            Platform::Spotify => {
                let client = match (
                    user_token,
                    &credentials.spotify_client_id,
                    &credentials.spotify_client_secret,
                ) {
                    (Some(token), _, _) => SpotifyClient::with_user_token(token, settings)?,
                    (None, Some(id), Some(secret)) => {
                        SpotifyClient::with_client_credentials(id.clone(), secret.clone(), settings)?
                    }
                    _ => {
                        return Err(CatalogError::Unauthorized(
                            "Spotify client credentials are not configured".to_string(),
                        ))
                    }
                };
                Ok(Catalog::Spotify(client))
            }
            Platform::AppleMusic => {
                let developer_token = credentials.apple_music_developer_token.clone().ok_or_else(|| {
                    CatalogError::Unauthorized(
                        "Apple Music developer token is not configured".to_string(),
                    )
                })?;
                Ok(Catalog::AppleMusic(AppleMusicClient::new(
                    developer_token,
                    user_token,
                    credentials.apple_music_storefront.clone(),
                    settings,
                )?))
            }
            Platform::YouTubeMusic => {
                if credentials.youtube_api_key.is_none() && user_token.is_none() {
                    return Err(CatalogError::Unauthorized(
                        "YouTube API key is not configured".to_string(),
                    ));
                }
                Ok(Catalog::YouTubeMusic(YouTubeMusicClient::new(
                    credentials.youtube_api_key.clone(),
                    user_token,
                    settings,
                )?))
            }
        }
    }
}

#[async_trait]
impl CatalogAdapter for Catalog {
    fn platform(&self) -> Platform {
        match self {
            Catalog::Spotify(_) => Platform::Spotify,
            Catalog::AppleMusic(_) => Platform::AppleMusic,
            Catalog::YouTubeMusic(_) => Platform::YouTubeMusic,
        }
    }

    async fn fetch_playlist(&self, playlist_id: &str) -> CatalogResult<Playlist> {
        match self {
            Catalog::Spotify(c) => c.fetch_playlist(playlist_id).await,
            Catalog::AppleMusic(c) => c.fetch_playlist(playlist_id).await,
            Catalog::YouTubeMusic(c) => c.fetch_playlist(playlist_id).await,
        }
    }

    async fn search_candidates(&self, query: &SearchQuery) -> CatalogResult<Vec<MatchCandidate>> {
        match self {
            Catalog::Spotify(c) => c.search_candidates(query).await,
            Catalog::AppleMusic(c) => c.search_candidates(query).await,
            Catalog::YouTubeMusic(c) => c.search_candidates(query).await,
        }
    }

    async fn create_playlist(
        &self,
        name: &str,
        description: Option<&str>,
        track_ids: &[String],
    ) -> CatalogResult<CreatedPlaylist> {
        match self {
            Catalog::Spotify(c) => c.create_playlist(name, description, track_ids).await,
            Catalog::AppleMusic(c) => c.create_playlist(name, description, track_ids).await,
            Catalog::YouTubeMusic(c) => c.create_playlist(name, description, track_ids).await,
        }
    }
}

/// Opens adapters for the conversion service
pub trait CatalogProvider: Send + Sync {
    /// Adapter for `platform`, authenticated with `user_token` when given
    fn open(
        &self,
        platform: Platform,
        user_token: Option<&str>,
    ) -> CatalogResult<Arc<dyn CatalogAdapter>>;

    /// Whether server-side credentials exist for `platform`
    fn is_configured(&self, platform: Platform) -> bool;
}

/// Provider backed by the real platform APIs
pub struct LiveCatalogProvider {
    credentials: PlatformCredentials,
    settings: HttpSettings,
}

impl LiveCatalogProvider {
    pub fn new(credentials: PlatformCredentials, settings: HttpSettings) -> Self {
        Self {
            credentials,
            settings,
        }
    }
}

impl CatalogProvider for LiveCatalogProvider {
    fn open(
        &self,
        platform: Platform,
        user_token: Option<&str>,
    ) -> CatalogResult<Arc<dyn CatalogAdapter>> {
        let catalog = Catalog::open(platform, &self.credentials, &self.settings, user_token)?;
        Ok(Arc::new(catalog))
    }

    fn is_configured(&self, platform: Platform) -> bool {
        self.credentials.is_configured(platform)
    }
}
