//! Final conversion report

use crate::models::{Platform, Track};
use serde::{Deserialize, Serialize};

/// A source track that did not make it to the destination playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTrack {
    pub name: String,
    pub artist: String,
    /// Match-failure code (`NoCandidates`, `BelowThreshold`) or search error message
    pub reason: String,
}

impl FailedTrack {
    pub fn new(track: &Track, reason: impl Into<String>) -> Self {
        Self {
            name: track.title().to_string(),
            artist: track.artist().to_string(),
            reason: reason.into(),
        }
    }
}

/// Report stored on a completed job
///
/// `matched_tracks + failed_tracks.len() == total_tracks` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub success: bool,
    pub message: String,
    pub playlist_id: Option<String>,
    pub playlist_url: Option<String>,
    pub source_platform: Platform,
    pub destination_platform: Platform,
    pub source_playlist_name: String,
    pub total_tracks: usize,
    pub matched_tracks: usize,
    /// In source playlist order
    pub failed_tracks: Vec<FailedTrack>,
}

impl ConversionResult {
    /// Track counts add up
    pub fn is_consistent(&self) -> bool {
        self.matched_tracks + self.failed_tracks.len() == self.total_tracks
    }

    /// Share of source tracks that transferred, 0.0 for an empty playlist
    pub fn match_rate(&self) -> f64 {
        if self.total_tracks == 0 {
            0.0
        } else {
            self.matched_tracks as f64 / self.total_tracks as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConversionResult {
        ConversionResult {
            success: true,
            message: "done".to_string(),
            playlist_id: Some("pl-1".to_string()),
            playlist_url: Some("https://example.com/pl-1".to_string()),
            source_platform: Platform::Spotify,
            destination_platform: Platform::AppleMusic,
            source_playlist_name: "Road Trip".to_string(),
            total_tracks: 3,
            matched_tracks: 2,
            failed_tracks: vec![FailedTrack::new(
                &Track::new("Yesterday", "The Beatles"),
                "NoCandidates",
            )],
        }
    }

    #[test]
    fn test_consistency_and_rate() {
        let result = sample();
        assert!(result.is_consistent());
        assert!((result.match_rate() - 2.0 / 3.0).abs() < 1e-9);

        let mut broken = sample();
        broken.matched_tracks = 3;
        assert!(!broken.is_consistent());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(sample()).unwrap();

        for key in [
            "success",
            "message",
            "playlist_id",
            "playlist_url",
            "source_platform",
            "destination_platform",
            "source_playlist_name",
            "total_tracks",
            "matched_tracks",
            "failed_tracks",
        ] {
            assert!(json.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(json["source_platform"], "spotify");
        assert_eq!(json["failed_tracks"][0]["name"], "Yesterday");
        assert_eq!(json["failed_tracks"][0]["artist"], "The Beatles");
        assert_eq!(json["failed_tracks"][0]["reason"], "NoCandidates");
    }
}
