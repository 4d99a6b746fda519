//! Tracks, playlists and per-track match outcomes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// One song as known to a catalog
///
/// Built once through the `with_*` constructors and never mutated after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    title: String,
    artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration_seconds: Option<u32>,
    /// Platform-specific id, present once resolved on a given platform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    platform_id: Option<String>,
}

impl Track {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album: None,
            duration_seconds: None,
            platform_id: None,
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        let album = album.into();
        self.album = if album.trim().is_empty() { None } else { Some(album) };
        self
    }

    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.duration_seconds = if seconds > 0 { Some(seconds) } else { None };
        self
    }

    pub fn with_platform_id(mut self, id: impl Into<String>) -> Self {
        self.platform_id = Some(id.into());
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Primary artist
    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }

    pub fn duration_seconds(&self) -> Option<u32> {
        self.duration_seconds
    }

    pub fn platform_id(&self) -> Option<&str> {
        self.platform_id.as_deref()
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.title, self.artist)
    }
}

/// Ordered track list plus playlist metadata
///
/// Track order is meaningful and preserved end-to-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Owning platform's id, once the playlist exists there
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_id: Option<String>,
    pub tracks: Vec<Track>,
}

impl Playlist {
    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        Self {
            name: name.into(),
            description: None,
            platform_id: None,
            tracks,
        }
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }
}

impl fmt::Display for Playlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} tracks)", self.name, self.tracks.len())
    }
}

/// A track returned by a destination search, not yet scored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate(Track);

impl MatchCandidate {
    pub fn new(track: Track) -> Self {
        Self(track)
    }

    pub fn track(&self) -> &Track {
        &self.0
    }

    pub fn into_track(self) -> Track {
        self.0
    }
}

impl Deref for MatchCandidate {
    type Target = Track;

    fn deref(&self) -> &Track {
        &self.0
    }
}

impl From<Track> for MatchCandidate {
    fn from(track: Track) -> Self {
        Self(track)
    }
}

/// Why a source track has no destination counterpart
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoMatchReason {
    /// The destination search returned nothing
    NoCandidates,
    /// The best candidate scored under the threshold
    BelowThreshold { best_score: f64 },
}

impl NoMatchReason {
    /// Stable reason code reported in failed-track entries
    pub fn code(&self) -> &'static str {
        match self {
            NoMatchReason::NoCandidates => "NoCandidates",
            NoMatchReason::BelowThreshold { .. } => "BelowThreshold",
        }
    }
}

impl fmt::Display for NoMatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of matching one source track
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    /// Resolved destination track with its confidence in [0, 1]
    Matched { track: Track, score: f64 },
    NoMatch { reason: NoMatchReason },
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Matched { .. })
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            MatchResult::Matched { score, .. } => Some(*score),
            MatchResult::NoMatch { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_builder() {
        let track = Track::new("Test Track", "Test Artist")
            .with_album("Test Album")
            .with_duration(120)
            .with_platform_id("spotify:track:1234567890");

        assert_eq!(track.to_string(), "Test Track by Test Artist");
        assert_eq!(track.album(), Some("Test Album"));
        assert_eq!(track.duration_seconds(), Some(120));
        assert_eq!(track.platform_id(), Some("spotify:track:1234567890"));
    }

    #[test]
    fn test_blank_album_and_zero_duration_are_unknown() {
        let track = Track::new("A", "B").with_album("  ").with_duration(0);
        assert_eq!(track.album(), None);
        assert_eq!(track.duration_seconds(), None);
    }

    #[test]
    fn test_playlist_display() {
        let playlist = Playlist::new(
            "Test Playlist",
            vec![Track::new("Track 1", "Artist 1"), Track::new("Track 2", "Artist 2")],
        );
        assert_eq!(playlist.to_string(), "Test Playlist (2 tracks)");
        assert_eq!(playlist.track_count(), 2);
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(NoMatchReason::NoCandidates.to_string(), "NoCandidates");
        assert_eq!(
            NoMatchReason::BelowThreshold { best_score: 0.4 }.to_string(),
            "BelowThreshold"
        );
    }
}
