//! Apple Music API client
//!
//! Every request carries the developer token. Library access (reading `p.`
//! playlists, creating playlists) also needs the user's Music-User-Token.

use super::http::CatalogHttp;
use super::{CatalogError, CatalogResult, CreatedPlaylist, HttpSettings, SearchQuery};
use crate::models::{MatchCandidate, Platform, Playlist, Track};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

const API_ORIGIN: &str = "https://api.music.apple.com";
const SEARCH_LIMIT: &str = "10";
const DEFAULT_STOREFRONT: &str = "us";
const USER_TOKEN_HEADER: &str = "Music-User-Token";

#[derive(Debug, Deserialize)]
struct DataResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    /// Relative path of the next page
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistResource {
    id: String,
    #[serde(default)]
    attributes: PlaylistAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct PlaylistAttributes {
    name: Option<String>,
    description: Option<Description>,
}

#[derive(Debug, Deserialize)]
struct Description {
    standard: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SongResource {
    id: String,
    attributes: Option<SongAttributes>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SongAttributes {
    name: String,
    artist_name: Option<String>,
    album_name: Option<String>,
    duration_in_millis: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: SearchResults,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResults {
    songs: Option<DataResponse<SongResource>>,
}

#[derive(Debug, Deserialize)]
struct CreatedResource {
    id: String,
}

pub struct AppleMusicClient {
    http: CatalogHttp,
    developer_token: String,
    user_token: Option<String>,
    storefront: String,
}

impl AppleMusicClient {
    pub fn new(
        developer_token: String,
        user_token: Option<String>,
        storefront: String,
        settings: &HttpSettings,
    ) -> CatalogResult<Self> {
        let storefront = if storefront.trim().is_empty() {
            DEFAULT_STOREFRONT.to_string()
        } else {
            storefront.trim().to_lowercase()
        };

        Ok(Self {
            http: CatalogHttp::new(Platform::AppleMusic, settings)?,
            developer_token,
            user_token,
            storefront,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.bearer_auth(&self.developer_token);
        match &self.user_token {
            Some(token) => request.header(USER_TOKEN_HEADER, token),
            None => request,
        }
    }

    fn require_user_token(&self, action: &str) -> CatalogResult<()> {
        if self.user_token.is_none() {
            return Err(CatalogError::Unauthorized(format!(
                "An Apple Music user token is required to {}",
                action
            )));
        }
        Ok(())
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, operation: &str, url: &str) -> CatalogResult<T> {
        self.http
            .json(operation, |client: &Client| self.authorize(client.get(url)))
            .await
    }

    pub async fn fetch_playlist(&self, playlist_id: &str) -> CatalogResult<Playlist> {
        let is_library = is_library_playlist(playlist_id);
        let base_path = if is_library {
            self.require_user_token("read library playlists")?;
            format!("/v1/me/library/playlists/{}", playlist_id)
        } else {
            format!("/v1/catalog/{}/playlists/{}", self.storefront, playlist_id)
        };

        let response: DataResponse<PlaylistResource> = self
            .get("fetch playlist", &format!("{}{}", API_ORIGIN, base_path))
            .await?;
        let resource = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::NotFound(format!("Apple Music playlist {}", playlist_id)))?;

        let mut tracks = Vec::new();
        let mut next = Some(format!("{}/tracks", base_path));
        while let Some(path) = next {
            let page = match self
                .get::<DataResponse<SongResource>>("fetch playlist tracks", &format!("{}{}", API_ORIGIN, path))
                .await
            {
                Ok(page) => page,
                // An empty playlist has no tracks relationship
                Err(CatalogError::NotFound(_)) if tracks.is_empty() => break,
                Err(e) => return Err(e),
            };
            tracks.extend(page.data.into_iter().filter_map(into_track));
            next = page.next;
        }

        let name = resource
            .attributes
            .name
            .unwrap_or_else(|| "Unknown Playlist".to_string());
        info!(
            playlist_id = %resource.id,
            name = %name,
            tracks = tracks.len(),
            "Fetched Apple Music playlist"
        );

        let mut playlist = Playlist::new(name, tracks);
        playlist.description = resource
            .attributes
            .description
            .and_then(|d| d.standard)
            .filter(|d| !d.is_empty());
        playlist.platform_id = Some(resource.id);
        Ok(playlist)
    }

    pub async fn search_candidates(&self, query: &SearchQuery) -> CatalogResult<Vec<MatchCandidate>> {
        let url = format!("{}/v1/catalog/{}/search", API_ORIGIN, self.storefront);
        let term = query.as_text();

        let response: SearchResponse = self
            .http
            .json("search", |client| {
                self.authorize(client.get(&url)).query(&[
                    ("term", term.as_str()),
                    ("types", "songs"),
                    ("limit", SEARCH_LIMIT),
                ])
            })
            .await?;

        Ok(response
            .results
            .songs
            .map(|songs| songs.data)
            .unwrap_or_default()
            .into_iter()
            .filter_map(into_track)
            .map(MatchCandidate::from)
            .collect())
    }

    /// Create a library playlist holding catalog songs `track_ids`
    pub async fn create_playlist(
        &self,
        name: &str,
        description: Option<&str>,
        track_ids: &[String],
    ) -> CatalogResult<CreatedPlaylist> {
        self.require_user_token("create playlists")?;

        let url = format!("{}/v1/me/library/playlists", API_ORIGIN);
        let tracks: Vec<_> = track_ids
            .iter()
            .map(|id| json!({ "id": id, "type": "songs" }))
            .collect();
        let body = json!({
            "attributes": {
                "name": name,
                "description": description.unwrap_or_default(),
            },
            "relationships": {
                "tracks": { "data": tracks }
            }
        });

        let response: DataResponse<CreatedResource> = self
            .http
            .json("create playlist", |client| {
                self.authorize(client.post(&url)).json(&body)
            })
            .await?;
        let created = response.data.into_iter().next().ok_or_else(|| {
            CatalogError::RemoteError("Apple Music returned no created playlist".to_string())
        })?;

        info!(
            playlist_id = %created.id,
            tracks = track_ids.len(),
            "Created Apple Music playlist"
        );

        Ok(CreatedPlaylist {
            playlist_url: library_playlist_url(&created.id),
            playlist_id: created.id,
        })
    }
}

/// Library playlist ids start with `p.`, catalog ones with `pl.`
fn is_library_playlist(playlist_id: &str) -> bool {
    playlist_id.starts_with("p.")
}

fn library_playlist_url(playlist_id: &str) -> String {
    format!("https://music.apple.com/library/playlist/{}", playlist_id)
}

fn into_track(song: SongResource) -> Option<Track> {
    let attributes = song.attributes?;
    let duration = attributes
        .duration_in_millis
        .map(|ms| u32::try_from((ms + 500) / 1000).unwrap_or(0))
        .unwrap_or(0);

    let mut track = Track::new(
        attributes.name,
        attributes
            .artist_name
            .unwrap_or_else(|| "Unknown Artist".to_string()),
    )
    .with_duration(duration)
    .with_platform_id(song.id);
    if let Some(album) = attributes.album_name {
        track = track.with_album(album);
    }
    Some(track)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_kind() {
        assert!(is_library_playlist("p.AbCdEf"));
        assert!(!is_library_playlist("pl.d25f5d1181894928af76c85c967f8f31"));
        assert_eq!(
            library_playlist_url("p.AbCdEf"),
            "https://music.apple.com/library/playlist/p.AbCdEf"
        );
    }

    #[test]
    fn test_song_parsing() {
        let page: DataResponse<SongResource> = serde_json::from_value(json!({
            "data": [
                {
                    "id": "1440650428",
                    "type": "songs",
                    "attributes": {
                        "name": "Bohemian Rhapsody",
                        "artistName": "Queen",
                        "albumName": "A Night at the Opera (2011 Remaster)",
                        "durationInMillis": 354320
                    }
                },
                {"id": "i.unavailable", "type": "library-songs"}
            ],
            "next": "/v1/catalog/us/playlists/pl.x/tracks?offset=100"
        }))
        .unwrap();

        assert_eq!(
            page.next.as_deref(),
            Some("/v1/catalog/us/playlists/pl.x/tracks?offset=100")
        );
        let tracks: Vec<Track> = page.data.into_iter().filter_map(into_track).collect();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].artist(), "Queen");
        assert_eq!(tracks[0].duration_seconds(), Some(354));
        assert_eq!(tracks[0].platform_id(), Some("1440650428"));
    }

    #[test]
    fn test_search_without_songs_is_empty() {
        let response: SearchResponse = serde_json::from_value(json!({ "results": {} })).unwrap();
        assert!(response.results.songs.is_none());
    }

    #[tokio::test]
    async fn test_library_access_requires_user_token() {
        let client =
            AppleMusicClient::new("dev".into(), None, "".into(), &HttpSettings::default()).unwrap();
        assert_eq!(client.storefront, "us");

        assert!(matches!(
            client.fetch_playlist("p.AbCdEf").await,
            Err(CatalogError::Unauthorized(_))
        ));
        assert!(matches!(
            client.create_playlist("Mix", None, &[]).await,
            Err(CatalogError::Unauthorized(_))
        ));
    }
}
