//! Spotify Web API client
//!
//! Catalog reads use the caller's access token when given, otherwise a
//! client-credentials token. Playlist creation needs a user token.

use super::http::CatalogHttp;
use super::{CatalogError, CatalogResult, CreatedPlaylist, HttpSettings, SearchQuery};
use crate::models::{MatchCandidate, Platform, Playlist, Track};
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

const API_BASE_URL: &str = "https://api.spotify.com/v1";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SEARCH_LIMIT: u32 = 10;
/// Maximum URIs per add-items request
const ADD_ITEMS_BATCH: usize = 100;
/// Refresh client-credentials tokens this long before they expire
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct Paging<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpotifyPlaylist {
    id: String,
    name: String,
    description: Option<String>,
    tracks: Paging<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<SpotifyTrack>,
    #[serde(default)]
    is_local: bool,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: Option<String>,
    uri: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    album: Option<SpotifyAlbum>,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    is_local: bool,
    /// `track` or `episode`
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyAlbum {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<Paging<SpotifyTrack>>,
}

#[derive(Debug, Deserialize)]
struct CurrentUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CreatedSpotifyPlaylist {
    id: String,
    external_urls: ExternalUrls,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

enum SpotifyAuth {
    User(String),
    ClientCredentials {
        client_id: String,
        client_secret: String,
        cached: Mutex<Option<CachedToken>>,
    },
}

pub struct SpotifyClient {
    http: CatalogHttp,
    auth: SpotifyAuth,
}

impl SpotifyClient {
    /// Client acting on behalf of a user (read and write)
    pub fn with_user_token(token: String, settings: &HttpSettings) -> CatalogResult<Self> {
        Ok(Self {
            http: CatalogHttp::new(Platform::Spotify, settings)?,
            auth: SpotifyAuth::User(token),
        })
    }

    /// Client using app credentials (catalog reads only)
    pub fn with_client_credentials(
        client_id: String,
        client_secret: String,
        settings: &HttpSettings,
    ) -> CatalogResult<Self> {
        Ok(Self {
            http: CatalogHttp::new(Platform::Spotify, settings)?,
            auth: SpotifyAuth::ClientCredentials {
                client_id,
                client_secret,
                cached: Mutex::new(None),
            },
        })
    }

    async fn bearer_token(&self) -> CatalogResult<String> {
        match &self.auth {
            SpotifyAuth::User(token) => Ok(token.clone()),
            SpotifyAuth::ClientCredentials {
                client_id,
                client_secret,
                cached,
            } => {
                let mut cached = cached.lock().await;
                if let Some(token) = cached.as_ref() {
                    if Instant::now() < token.expires_at {
                        return Ok(token.value.clone());
                    }
                }

                let response: TokenResponse = self
                    .http
                    .json("token", |client| {
                        client
                            .post(TOKEN_URL)
                            .basic_auth(client_id, Some(client_secret))
                            .form(&[("grant_type", "client_credentials")])
                    })
                    .await?;

                debug!(expires_in = response.expires_in, "Obtained Spotify client token");

                let lifetime = Duration::from_secs(response.expires_in)
                    .saturating_sub(TOKEN_EXPIRY_MARGIN);
                let value = response.access_token;
                *cached = Some(CachedToken {
                    value: value.clone(),
                    expires_at: Instant::now() + lifetime,
                });
                Ok(value)
            }
        }
    }

    pub async fn fetch_playlist(&self, playlist_id: &str) -> CatalogResult<Playlist> {
        let token = self.bearer_token().await?;
        let url = format!("{}/playlists/{}", API_BASE_URL, playlist_id);

        let playlist: SpotifyPlaylist = self
            .http
            .json("fetch playlist", |client| client.get(&url).bearer_auth(&token))
            .await?;

        let mut tracks: Vec<Track> = Vec::new();
        collect_items(&mut tracks, playlist.tracks.items);

        let mut next = playlist.tracks.next;
        while let Some(page_url) = next {
            let page: Paging<PlaylistItem> = self
                .http
                .json("fetch playlist page", |client| {
                    client.get(&page_url).bearer_auth(&token)
                })
                .await?;
            collect_items(&mut tracks, page.items);
            next = page.next;
        }

        info!(
            playlist_id = %playlist.id,
            name = %playlist.name,
            tracks = tracks.len(),
            "Fetched Spotify playlist"
        );

        let mut result = Playlist::new(playlist.name, tracks);
        result.description = playlist.description.filter(|d| !d.is_empty());
        result.platform_id = Some(playlist.id);
        Ok(result)
    }

    pub async fn search_candidates(&self, query: &SearchQuery) -> CatalogResult<Vec<MatchCandidate>> {
        let token = self.bearer_token().await?;
        let url = format!("{}/search", API_BASE_URL);
        let q = search_expression(query);
        let limit = SEARCH_LIMIT.to_string();

        let response: SearchResponse = self
            .http
            .json("search", |client| {
                client
                    .get(&url)
                    .bearer_auth(&token)
                    .query(&[("q", q.as_str()), ("type", "track"), ("limit", limit.as_str())])
            })
            .await?;

        Ok(response
            .tracks
            .map(|page| page.items)
            .unwrap_or_default()
            .into_iter()
            .filter_map(into_track)
            .map(MatchCandidate::from)
            .collect())
    }

    /// Create a playlist owned by the current user
    ///
    /// `track_ids` are Spotify track URIs.
    pub async fn create_playlist(
        &self,
        name: &str,
        description: Option<&str>,
        track_ids: &[String],
    ) -> CatalogResult<CreatedPlaylist> {
        let token = match &self.auth {
            SpotifyAuth::User(token) => token.clone(),
            SpotifyAuth::ClientCredentials { .. } => {
                return Err(CatalogError::Unauthorized(
                    "A Spotify user token is required to create playlists".to_string(),
                ))
            }
        };

        let me_url = format!("{}/me", API_BASE_URL);
        let user: CurrentUser = self
            .http
            .json("current user", |client| client.get(&me_url).bearer_auth(&token))
            .await?;

        let create_url = format!("{}/users/{}/playlists", API_BASE_URL, user.id);
        let body = json!({
            "name": name,
            "description": description.unwrap_or_default(),
            "public": true,
        });
        let created: CreatedSpotifyPlaylist = self
            .http
            .json("create playlist", |client| {
                client.post(&create_url).bearer_auth(&token).json(&body)
            })
            .await?;

        let items_url = format!("{}/playlists/{}/tracks", API_BASE_URL, created.id);
        for batch in track_ids.chunks(ADD_ITEMS_BATCH) {
            let body = json!({ "uris": batch });
            self.http
                .send("add playlist items", |client| {
                    client.post(&items_url).bearer_auth(&token).json(&body)
                })
                .await?;
        }

        info!(
            playlist_id = %created.id,
            tracks = track_ids.len(),
            "Created Spotify playlist"
        );

        let playlist_url = created
            .external_urls
            .spotify
            .unwrap_or_else(|| format!("https://open.spotify.com/playlist/{}", created.id));

        Ok(CreatedPlaylist {
            playlist_id: created.id,
            playlist_url,
        })
    }
}

fn collect_items(tracks: &mut Vec<Track>, items: Vec<PlaylistItem>) {
    tracks.extend(
        items
            .into_iter()
            .filter(|item| !item.is_local)
            .filter_map(|item| item.track)
            .filter_map(into_track),
    );
}

/// Convert an API track, skipping local files, episodes and unavailable tracks
fn into_track(track: SpotifyTrack) -> Option<Track> {
    if track.is_local || track.id.is_none() {
        return None;
    }
    if track.kind.as_deref().is_some_and(|kind| kind != "track") {
        return None;
    }

    let uri = track.uri.or_else(|| track.id.map(|id| format!("spotify:track:{}", id)))?;
    let artist = track
        .artists
        .into_iter()
        .next()
        .map(|a| a.name)
        .unwrap_or_else(|| "Unknown".to_string());
    let duration = u32::try_from((track.duration_ms + 500) / 1000).unwrap_or(0);

    let mut result = Track::new(track.name, artist)
        .with_duration(duration)
        .with_platform_id(uri);
    if let Some(album) = track.album {
        result = result.with_album(album.name);
    }
    Some(result)
}

/// Field-filtered search expression, e.g. `track:"Hello" artist:"Adele"`
fn search_expression(query: &SearchQuery) -> String {
    let clean = |s: &str| s.replace('"', "");
    format!(
        "track:\"{}\" artist:\"{}\"",
        clean(&query.title),
        clean(&query.artist)
    )
}
