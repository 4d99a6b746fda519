//! Playlist reference parsing
//!
//! Accepts either a bare platform playlist id or a share URL and returns the id.

use crate::models::Platform;
use reqwest::Url;

/// Extract a platform playlist id from a bare id or share URL
///
/// Supported forms:
/// - Spotify: `https://open.spotify.com/playlist/<id>`, `spotify:playlist:<id>`, `<id>`
/// - Apple Music: `https://music.apple.com/<storefront>/playlist/<slug>/<pl.id>`, `<pl.id>`
/// - YouTube Music: any URL with `list=<id>`, `<id>`
pub fn extract_playlist_id(reference: &str, platform: Platform) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    match platform {
        Platform::Spotify => spotify_playlist_id(reference),
        Platform::AppleMusic => apple_music_playlist_id(reference),
        Platform::YouTubeMusic => youtube_playlist_id(reference),
    }
}

fn spotify_playlist_id(reference: &str) -> Option<String> {
    if let Some(id) = reference.strip_prefix("spotify:playlist:") {
        return alphanumeric(id);
    }

    if let Ok(url) = Url::parse(reference) {
        let host = url.host_str()?;
        if !host.ends_with("spotify.com") {
            return None;
        }
        let mut segments = url.path_segments()?;
        segments.find(|s| *s == "playlist")?;
        return segments.next().and_then(alphanumeric);
    }

    alphanumeric(reference)
}

fn apple_music_playlist_id(reference: &str) -> Option<String> {
    if let Ok(url) = Url::parse(reference) {
        if url.host_str()? != "music.apple.com" {
            return None;
        }
        let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
        let playlist_pos = segments.iter().position(|s| *s == "playlist")?;
        // The id is the last segment after the slug
        let id = segments.get(playlist_pos + 1..)?.last()?;
        return apple_id(id);
    }

    apple_id(reference)
}

fn youtube_playlist_id(reference: &str) -> Option<String> {
    if let Ok(url) = Url::parse(reference) {
        let host = url.host_str()?;
        if !(host.ends_with("youtube.com") || host == "youtu.be") {
            return None;
        }
        return url
            .query_pairs()
            .find(|(key, _)| key == "list")
            .and_then(|(_, value)| youtube_id(&value));
    }

    youtube_id(reference)
}

fn alphanumeric(id: &str) -> Option<String> {
    (!id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())).then(|| id.to_string())
}

fn apple_id(id: &str) -> Option<String> {
    let valid = !id.is_empty()
        && id.contains('.')
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    valid.then(|| id.to_string())
}

fn youtube_id(id: &str) -> Option<String> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spotify_forms() {
        assert_eq!(
            extract_playlist_id(
                "https://open.spotify.com/playlist/37i9dQZF1DX4sWSpwq3LiO?si=abc123",
                Platform::Spotify
            ),
            Some("37i9dQZF1DX4sWSpwq3LiO".to_string())
        );
        assert_eq!(
            extract_playlist_id("spotify:playlist:37i9dQZF1DX4sWSpwq3LiO", Platform::Spotify),
            Some("37i9dQZF1DX4sWSpwq3LiO".to_string())
        );
        assert_eq!(
            extract_playlist_id("37i9dQZF1DX4sWSpwq3LiO", Platform::Spotify),
            Some("37i9dQZF1DX4sWSpwq3LiO".to_string())
        );
        assert_eq!(
            extract_playlist_id("https://example.com/playlist/abc", Platform::Spotify),
            None
        );
        assert_eq!(
            extract_playlist_id("https://open.spotify.com/album/abc", Platform::Spotify),
            None
        );
    }

    #[test]
    fn test_apple_music_forms() {
        assert_eq!(
            extract_playlist_id(
                "https://music.apple.com/us/playlist/top-100-global/pl.d25f5d1181894928af76c85c967f8f31",
                Platform::AppleMusic
            ),
            Some("pl.d25f5d1181894928af76c85c967f8f31".to_string())
        );
        assert_eq!(
            extract_playlist_id("pl.d25f5d1181894928af76c85c967f8f31", Platform::AppleMusic),
            Some("pl.d25f5d1181894928af76c85c967f8f31".to_string())
        );
        assert_eq!(
            extract_playlist_id("https://music.apple.com/us/album/x/123", Platform::AppleMusic),
            None
        );
    }

    #[test]
    fn test_youtube_forms() {
        assert_eq!(
            extract_playlist_id(
                "https://music.youtube.com/playlist?list=RDCLAK5uy_ktwQ-2abc",
                Platform::YouTubeMusic
            ),
            Some("RDCLAK5uy_ktwQ-2abc".to_string())
        );
        assert_eq!(
            extract_playlist_id(
                "https://www.youtube.com/watch?v=abc&list=PL123",
                Platform::YouTubeMusic
            ),
            Some("PL123".to_string())
        );
        assert_eq!(
            extract_playlist_id("https://music.youtube.com/playlist", Platform::YouTubeMusic),
            None
        );
    }

    #[test]
    fn test_blank_reference() {
        for platform in Platform::ALL {
            assert_eq!(extract_playlist_id("   ", platform), None);
        }
    }
}
