//! Cross-catalog track matching

pub mod track_matcher;

pub use track_matcher::{
    duration_score, match_track, normalize, score_candidate, MatchScore, TrackMatcher,
    DEFAULT_MATCH_THRESHOLD,
};
