//! Data models for the conversion service
//!
//! - Platform identity and playlist references
//! - Tracks, playlists and match outcomes
//! - Job record and the final conversion report

pub mod conversion_result;
pub mod job;
pub mod platform;
pub mod playlist_reference;
pub mod track;

pub use conversion_result::{ConversionResult, FailedTrack};
pub use job::Job;
pub use platform::{Platform, UnknownPlatform};
pub use playlist_reference::extract_playlist_id;
pub use track::{MatchCandidate, MatchResult, NoMatchReason, Playlist, Track};
