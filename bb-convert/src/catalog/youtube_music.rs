//! YouTube Music via the YouTube Data API v3
//!
//! Reads use the API key (or the user's OAuth token when no key is
//! configured); writes always need the OAuth token. Videos carry no
//! structured artist field, so artist and title are parsed from the video
//! title and channel name.

use super::http::CatalogHttp;
use super::{CatalogError, CatalogResult, CreatedPlaylist, HttpSettings, SearchQuery};
use crate::models::{MatchCandidate, Platform, Playlist, Track};
use reqwest::RequestBuilder;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, info};

const API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
/// Page size for playlist items and batch size for video lookups
const PAGE_SIZE: usize = 50;
const SEARCH_LIMIT: &str = "10";
/// YouTube "Music" video category
const MUSIC_CATEGORY_ID: &str = "10";
const TOPIC_SUFFIX: &str = " - Topic";
/// Placeholder titles of videos that can no longer be played
const UNAVAILABLE_TITLES: &[&str] = &["Deleted video", "Private video"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistResource {
    id: String,
    snippet: PlaylistSnippet,
}

#[derive(Debug, Deserialize)]
struct PlaylistSnippet {
    title: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemResource {
    snippet: PlaylistItemSnippet,
    content_details: Option<PlaylistItemDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemSnippet {
    title: String,
    video_owner_channel_title: Option<String>,
    resource_id: Option<ResourceId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemDetails {
    video_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: ResourceId,
    snippet: SearchSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSnippet {
    title: String,
    channel_title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResource {
    id: String,
    content_details: Option<VideoDetails>,
}

#[derive(Debug, Deserialize)]
struct VideoDetails {
    duration: String,
}

#[derive(Debug, Deserialize)]
struct CreatedResource {
    id: String,
}

/// Video reference collected before durations are known
struct VideoEntry {
    video_id: String,
    title: String,
    channel: String,
}

pub struct YouTubeMusicClient {
    http: CatalogHttp,
    api_key: Option<String>,
    oauth_token: Option<String>,
}

impl YouTubeMusicClient {
    pub fn new(
        api_key: Option<String>,
        oauth_token: Option<String>,
        settings: &HttpSettings,
    ) -> CatalogResult<Self> {
        Ok(Self {
            http: CatalogHttp::new(Platform::YouTubeMusic, settings)?,
            api_key,
            oauth_token,
        })
    }

    fn authorize_read(&self, request: RequestBuilder) -> RequestBuilder {
        match (&self.api_key, &self.oauth_token) {
            (Some(key), _) => request.query(&[("key", key.as_str())]),
            (None, Some(token)) => request.bearer_auth(token),
            (None, None) => request,
        }
    }

    fn write_token(&self) -> CatalogResult<&str> {
        self.oauth_token.as_deref().ok_or_else(|| {
            CatalogError::Unauthorized(
                "A Google OAuth token is required to create YouTube playlists".to_string(),
            )
        })
    }

    pub async fn fetch_playlist(&self, playlist_id: &str) -> CatalogResult<Playlist> {
        let playlists_url = format!("{}/playlists", API_BASE_URL);
        let response: ListResponse<PlaylistResource> = self
            .http
            .json("fetch playlist", |client| {
                self.authorize_read(client.get(&playlists_url))
                    .query(&[("part", "snippet"), ("id", playlist_id)])
            })
            .await?;
        let resource = response.items.into_iter().next().ok_or_else(|| {
            CatalogError::NotFound(format!("YouTube playlist {}", playlist_id))
        })?;

        let items_url = format!("{}/playlistItems", API_BASE_URL);
        let page_size = PAGE_SIZE.to_string();
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page: ListResponse<PlaylistItemResource> = self
                .http
                .json("fetch playlist items", |client| {
                    let request = self.authorize_read(client.get(&items_url)).query(&[
                        ("part", "snippet,contentDetails"),
                        ("playlistId", playlist_id),
                        ("maxResults", page_size.as_str()),
                    ]);
                    match &page_token {
                        Some(token) => request.query(&[("pageToken", token.as_str())]),
                        None => request,
                    }
                })
                .await?;

            entries.extend(page.items.into_iter().filter_map(playlist_entry));
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        let tracks = self.resolve_tracks(entries).await?;
        info!(
            playlist_id = %resource.id,
            name = %resource.snippet.title,
            tracks = tracks.len(),
            "Fetched YouTube playlist"
        );

        let mut playlist = Playlist::new(resource.snippet.title, tracks);
        playlist.description = Some(resource.snippet.description).filter(|d| !d.is_empty());
        playlist.platform_id = Some(resource.id);
        Ok(playlist)
    }

    pub async fn search_candidates(&self, query: &SearchQuery) -> CatalogResult<Vec<MatchCandidate>> {
        let url = format!("{}/search", API_BASE_URL);
        let q = query.as_text();

        let response: ListResponse<SearchResult> = self
            .http
            .json("search", |client| {
                self.authorize_read(client.get(&url)).query(&[
                    ("part", "snippet"),
                    ("type", "video"),
                    ("videoCategoryId", MUSIC_CATEGORY_ID),
                    ("maxResults", SEARCH_LIMIT),
                    ("q", q.as_str()),
                ])
            })
            .await?;

        let entries = response
            .items
            .into_iter()
            .filter_map(|item| {
                Some(VideoEntry {
                    video_id: item.id.video_id?,
                    title: item.snippet.title,
                    channel: item.snippet.channel_title,
                })
            })
            .collect();

        Ok(self
            .resolve_tracks(entries)
            .await?
            .into_iter()
            .map(MatchCandidate::from)
            .collect())
    }

    /// Create a private playlist and insert `track_ids` (video ids) in order
    pub async fn create_playlist(
        &self,
        name: &str,
        description: Option<&str>,
        track_ids: &[String],
    ) -> CatalogResult<CreatedPlaylist> {
        let token = self.write_token()?;

        let playlists_url = format!("{}/playlists", API_BASE_URL);
        let body = json!({
            "snippet": {
                "title": name,
                "description": description.unwrap_or_default(),
            },
            "status": { "privacyStatus": "private" }
        });
        let created: CreatedResource = self
            .http
            .json("create playlist", |client| {
                client
                    .post(&playlists_url)
                    .bearer_auth(token)
                    .query(&[("part", "snippet,status")])
                    .json(&body)
            })
            .await?;

        let items_url = format!("{}/playlistItems", API_BASE_URL);
        for video_id in track_ids {
            let body = json!({
                "snippet": {
                    "playlistId": created.id,
                    "resourceId": { "kind": "youtube#video", "videoId": video_id }
                }
            });
            self.http
                .send("insert playlist item", |client| {
                    client
                        .post(&items_url)
                        .bearer_auth(token)
                        .query(&[("part", "snippet")])
                        .json(&body)
                })
                .await?;
        }

        info!(
            playlist_id = %created.id,
            tracks = track_ids.len(),
            "Created YouTube playlist"
        );

        Ok(CreatedPlaylist {
            playlist_url: format!("https://music.youtube.com/playlist?list={}", created.id),
            playlist_id: created.id,
        })
    }

    /// Look up durations in batches and build tracks, preserving order
    async fn resolve_tracks(&self, entries: Vec<VideoEntry>) -> CatalogResult<Vec<Track>> {
        let videos_url = format!("{}/videos", API_BASE_URL);
        let mut durations: HashMap<String, u32> = HashMap::new();

        for batch in entries.chunks(PAGE_SIZE) {
            let ids = batch
                .iter()
                .map(|e| e.video_id.as_str())
                .collect::<Vec<_>>()
                .join(",");
            let response: ListResponse<VideoResource> = self
                .http
                .json("video details", |client| {
                    self.authorize_read(client.get(&videos_url))
                        .query(&[("part", "contentDetails"), ("id", ids.as_str())])
                })
                .await?;

            for video in response.items {
                if let Some(seconds) = video
                    .content_details
                    .and_then(|d| parse_iso8601_duration(&d.duration))
                {
                    durations.insert(video.id, seconds);
                }
            }
        }

        Ok(entries
            .into_iter()
            .map(|entry| {
                let (artist, title) = parse_video_title(&entry.title, &entry.channel);
                let duration = durations.get(&entry.video_id).copied().unwrap_or(0);
                Track::new(title, artist)
                    .with_duration(duration)
                    .with_platform_id(entry.video_id)
            })
            .collect())
    }
}

fn playlist_entry(item: PlaylistItemResource) -> Option<VideoEntry> {
    if UNAVAILABLE_TITLES.contains(&item.snippet.title.as_str()) {
        debug!(title = %item.snippet.title, "Skipping unavailable video");
        return None;
    }
    let video_id = item
        .content_details
        .map(|d| d.video_id)
        .or_else(|| item.snippet.resource_id.and_then(|r| r.video_id))?;

    Some(VideoEntry {
        video_id,
        title: item.snippet.title,
        channel: item.snippet.video_owner_channel_title.unwrap_or_default(),
    })
}

/// Split a video title into `(artist, title)`
///
/// Auto-generated ` - Topic` channels carry the bare track title, so the
/// channel name is the artist and the title is kept whole. For other
/// channels `Artist - Title (Official Video)` yields the part before the dash
/// as the artist, falling back to the channel name.
pub fn parse_video_title(video_title: &str, channel: &str) -> (String, String) {
    let video_title = video_title.trim();
    let channel = channel.trim();

    if let Some(artist) = channel.strip_suffix(TOPIC_SUFFIX) {
        let artist = artist.trim();
        if !artist.is_empty() {
            return (artist.to_string(), video_title.to_string());
        }
    }

    let title_without_tail = video_title
        .split(" | ")
        .next()
        .unwrap_or(video_title)
        .trim();

    for separator in [" - ", " \u{2013} ", " \u{2014} "] {
        if let Some((artist, title)) = title_without_tail.split_once(separator) {
            let (artist, title) = (artist.trim(), title.trim());
            if !artist.is_empty() && !title.is_empty() {
                return (artist.to_string(), title.to_string());
            }
        }
    }

    let artist = if channel.is_empty() || channel == TOPIC_SUFFIX.trim() {
        "Unknown Artist"
    } else {
        channel
    };
    (artist.to_string(), title_without_tail.to_string())
}

/// Parse an ISO 8601 duration (`PT4M13S`, `PT1H2M3S`, `P1DT2H`) to seconds
pub fn parse_iso8601_duration(value: &str) -> Option<u32> {
    let rest = value.trim().strip_prefix('P')?;
    let mut seconds: u64 = 0;
    let mut number = String::new();
    let mut in_time = false;
    let mut saw_component = false;

    for c in rest.chars() {
        match c {
            'T' if !in_time => in_time = true,
            '0'..='9' => number.push(c),
            unit => {
                let n: u64 = number.parse().ok()?;
                number.clear();
                let factor = match (unit, in_time) {
                    ('W', false) => 7 * 86_400,
                    ('D', false) => 86_400,
                    ('H', true) => 3_600,
                    ('M', true) => 60,
                    ('S', true) => 1,
                    _ => return None,
                };
                seconds = seconds.checked_add(n.checked_mul(factor)?)?;
                saw_component = true;
            }
        }
    }

    if !number.is_empty() || !saw_component {
        return None;
    }
    u32::try_from(seconds).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso8601_duration() {
        assert_eq!(parse_iso8601_duration("PT4M13S"), Some(253));
        assert_eq!(parse_iso8601_duration("PT1H2M3S"), Some(3723));
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
        assert_eq!(parse_iso8601_duration("P1DT1S"), Some(86_401));
        assert_eq!(parse_iso8601_duration("PT0S"), Some(0));
        assert_eq!(parse_iso8601_duration("P"), None);
        assert_eq!(parse_iso8601_duration("4M13S"), None);
        assert_eq!(parse_iso8601_duration("PT4X"), None);
        assert_eq!(parse_iso8601_duration("PT12"), None);
    }

    #[test]
    fn test_parse_video_title() {
        assert_eq!(
            parse_video_title("Queen - Bohemian Rhapsody (Official Video Remastered)", "Queen Official"),
            ("Queen".to_string(), "Bohemian Rhapsody (Official Video Remastered)".to_string())
        );
        assert_eq!(
            parse_video_title("Adele - Hello | Live at the BBC", "AdeleVEVO"),
            ("Adele".to_string(), "Hello".to_string())
        );
        assert_eq!(
            parse_video_title("Bohemian Rhapsody", "Queen - Topic"),
            ("Queen".to_string(), "Bohemian Rhapsody".to_string())
        );
        assert_eq!(
            parse_video_title("Bohemian Rhapsody - Remastered 2011", "Queen - Topic"),
            ("Queen".to_string(), "Bohemian Rhapsody - Remastered 2011".to_string())
        );
        assert_eq!(
            parse_video_title("Untitled", ""),
            ("Unknown Artist".to_string(), "Untitled".to_string())
        );
    }

    #[test]
    fn test_unavailable_items_are_skipped() {
        let page: ListResponse<PlaylistItemResource> = serde_json::from_value(json!({
            "items": [
                {
                    "snippet": {
                        "title": "Bohemian Rhapsody",
                        "videoOwnerChannelTitle": "Queen - Topic",
                        "resourceId": {"kind": "youtube#video", "videoId": "abc"}
                    },
                    "contentDetails": {"videoId": "abc"}
                },
                {
                    "snippet": {"title": "Deleted video", "resourceId": {"videoId": "gone"}},
                    "contentDetails": {"videoId": "gone"}
                }
            ],
            "nextPageToken": "CAUQAA"
        }))
        .unwrap();

        assert_eq!(page.next_page_token.as_deref(), Some("CAUQAA"));
        let entries: Vec<VideoEntry> = page.items.into_iter().filter_map(playlist_entry).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].video_id, "abc");
        assert_eq!(entries[0].channel, "Queen - Topic");
    }

    #[test]
    fn test_topic_channel_tracks_match_their_source() {
        use crate::matcher::{match_track, DEFAULT_MATCH_THRESHOLD};
        use crate::models::MatchResult;

        let (artist, title) =
            parse_video_title("Bohemian Rhapsody - Remastered 2011", "Queen - Topic");
        let candidate = Track::new(title, artist)
            .with_duration(355)
            .with_platform_id("fJ9rUzIMcZQ");
        let source = Track::new("Bohemian Rhapsody - Remastered 2011", "Queen").with_duration(355);

        match match_track(&source, vec![MatchCandidate::new(candidate)], DEFAULT_MATCH_THRESHOLD) {
            MatchResult::Matched { track, score } => {
                assert_eq!(track.platform_id(), Some("fJ9rUzIMcZQ"));
                assert!(score >= 0.9);
            }
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_requires_oauth_token() {
        let client =
            YouTubeMusicClient::new(Some("key".into()), None, &HttpSettings::default()).unwrap();
        assert!(matches!(
            client.create_playlist("Mix", None, &["abc".to_string()]).await,
            Err(CatalogError::Unauthorized(_))
        ));
    }
}
