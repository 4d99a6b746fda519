//! Track matcher
//!
//! Scores destination search candidates against a source track and picks the
//! best one, or reports why nothing matched.
//!
//! Composite score:
//! - title similarity (normalized Levenshtein): 0.5
//! - primary artist similarity: 0.35
//! - duration closeness: 0.15 (neutral 0.5 when either duration is unknown)
//!
//! Pure and deterministic: no I/O, no randomness.

use crate::models::{MatchCandidate, MatchResult, NoMatchReason, Track};
use tracing::debug;

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.75;

const TITLE_WEIGHT: f64 = 0.5;
const ARTIST_WEIGHT: f64 = 0.35;
const DURATION_WEIGHT: f64 = 0.15;

/// Difference (seconds) still scored as a perfect duration match
const DURATION_EXACT_SECS: u32 = 3;
/// Difference (seconds) at which duration closeness reaches zero
const DURATION_ZERO_SECS: u32 = 10;
/// Duration score when either side is unknown
const DURATION_NEUTRAL: f64 = 0.5;

/// Words marking a ` - …` title suffix as a release variant of the same recording
const VERSION_KEYWORDS: &[&str] = &[
    "remaster",
    "remastered",
    "live",
    "radio edit",
    "edit",
    "version",
    "mono",
    "stereo",
    "single",
    "deluxe",
    "explicit",
    "clean",
    "anniversary",
    "bonus",
];

/// Per-component breakdown of a candidate's score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchScore {
    pub title: f64,
    pub artist: f64,
    pub duration: f64,
    /// Weighted total in [0, 1]
    pub total: f64,
}

/// Matcher bound to a threshold
#[derive(Debug, Clone, Copy)]
pub struct TrackMatcher {
    threshold: f64,
}

impl TrackMatcher {
    /// Create matcher; threshold is clamped to [0, 1]
    pub fn new(threshold: f64) -> Self {
        let threshold = if threshold.is_nan() {
            DEFAULT_MATCH_THRESHOLD
        } else {
            threshold.clamp(0.0, 1.0)
        };
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Match `source` against ranked `candidates`
    pub fn match_track<I>(&self, source: &Track, candidates: I) -> MatchResult
    where
        I: IntoIterator<Item = MatchCandidate>,
    {
        match_track(source, candidates, self.threshold)
    }
}

impl Default for TrackMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD)
    }
}

/// Choose the best candidate for `source`, or report no match
///
/// Candidates are consumed once, in the platform's ranking order. On equal
/// scores the earlier candidate wins.
pub fn match_track<I>(source: &Track, candidates: I, threshold: f64) -> MatchResult
where
    I: IntoIterator<Item = MatchCandidate>,
{
    let source_title = normalize(source.title());
    let source_artist = normalize(source.artist());

    let mut best: Option<(MatchCandidate, f64)> = None;

    for candidate in candidates {
        let score = score_normalized(&source_title, &source_artist, source, &candidate);
        let replace = match &best {
            None => true,
            Some((_, best_score)) => score.total > *best_score,
        };
        if replace {
            best = Some((candidate, score.total));
        }
    }

    match best {
        None => {
            debug!(track = %source, "No candidates returned");
            MatchResult::NoMatch {
                reason: NoMatchReason::NoCandidates,
            }
        }
        Some((candidate, score)) if score >= threshold => {
            debug!(
                track = %source,
                candidate = %candidate.track(),
                score,
                "Matched"
            );
            MatchResult::Matched {
                track: candidate.into_track(),
                score,
            }
        }
        Some((candidate, score)) => {
            debug!(
                track = %source,
                candidate = %candidate.track(),
                score,
                threshold,
                "Best candidate below threshold"
            );
            MatchResult::NoMatch {
                reason: NoMatchReason::BelowThreshold { best_score: score },
            }
        }
    }
}

/// Score one candidate against `source`
pub fn score_candidate(source: &Track, candidate: &Track) -> MatchScore {
    let title = similarity(&normalize(source.title()), &normalize(candidate.title()));
    let artist = similarity(&normalize(source.artist()), &normalize(candidate.artist()));
    combine(title, artist, duration_score(source.duration_seconds(), candidate.duration_seconds()))
}

fn score_normalized(
    source_title: &str,
    source_artist: &str,
    source: &Track,
    candidate: &Track,
) -> MatchScore {
    let title = similarity(source_title, &normalize(candidate.title()));
    let artist = similarity(source_artist, &normalize(candidate.artist()));
    combine(title, artist, duration_score(source.duration_seconds(), candidate.duration_seconds()))
}

fn combine(title: f64, artist: f64, duration: f64) -> MatchScore {
    let total = (title * TITLE_WEIGHT + artist * ARTIST_WEIGHT + duration * DURATION_WEIGHT)
        .clamp(0.0, 1.0);
    MatchScore {
        title,
        artist,
        duration,
        total,
    }
}

fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Duration closeness in [0, 1]
///
/// 1.0 within 3 s, 0.0 at 10 s or more, linear in between. Unknown on either
/// side is neutral (0.5).
pub fn duration_score(source: Option<u32>, candidate: Option<u32>) -> f64 {
    match (source, candidate) {
        (Some(a), Some(b)) => {
            let diff = a.abs_diff(b);
            if diff <= DURATION_EXACT_SECS {
                1.0
            } else if diff >= DURATION_ZERO_SECS {
                0.0
            } else {
                f64::from(DURATION_ZERO_SECS - diff)
                    / f64::from(DURATION_ZERO_SECS - DURATION_EXACT_SECS)
            }
        }
        _ => DURATION_NEUTRAL,
    }
}

/// Normalize a title or artist for comparison
///
/// Lower-cases, drops bracketed and parenthetical segments, featuring-artist
/// annotations and ` - Remastered`-style version suffixes, strips punctuation
/// and collapses whitespace. Falls back to the trimmed lower-cased input when
/// nothing would remain.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();

    let mut stripped = strip_bracketed(&lowered);
    stripped = strip_featuring(&stripped);
    stripped = strip_version_suffix(&stripped);

    let mut cleaned = String::with_capacity(stripped.len());
    for c in stripped.chars() {
        if c.is_alphanumeric() {
            cleaned.push(c);
        } else if c == '\'' || c == '\u{2019}' {
            // "don't" and "dont" compare equal
        } else {
            cleaned.push(' ');
        }
    }

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        lowered.trim().to_string()
    } else {
        collapsed
    }
}

fn strip_bracketed(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn strip_featuring(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let cut = words
        .iter()
        .position(|w| matches!(*w, "feat." | "feat" | "ft." | "ft" | "featuring"))
        .unwrap_or(words.len());
    words[..cut].join(" ")
}

fn strip_version_suffix(text: &str) -> String {
    if let Some(pos) = text.rfind(" - ") {
        let suffix = &text[pos + 3..];
        let is_version = suffix
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .any(|word| VERSION_KEYWORDS.contains(&word))
            || VERSION_KEYWORDS
                .iter()
                .any(|k| k.contains(' ') && suffix.contains(k));
        if is_version {
            return text[..pos].to_string();
        }
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(tracks: Vec<Track>) -> Vec<MatchCandidate> {
        tracks.into_iter().map(MatchCandidate::from).collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Bohemian Rhapsody - Remastered 2011"), "bohemian rhapsody");
        assert_eq!(normalize("Bohemian Rhapsody - Remastered"), "bohemian rhapsody");
        assert_eq!(normalize("Levels (Radio Edit)"), "levels");
        assert_eq!(normalize("Stay [Explicit]"), "stay");
        assert_eq!(normalize("Empire State of Mind feat. Alicia Keys"), "empire state of mind");
        assert_eq!(normalize("Don't Stop Me Now"), "dont stop me now");
        assert_eq!(normalize("  AC/DC  "), "ac dc");
        // Remixes are different recordings
        assert_eq!(normalize("One More Time - Remix"), "one more time remix");
        assert_eq!(normalize("!!!"), "!!!");
    }

    #[test]
    fn test_duration_score() {
        assert_eq!(duration_score(Some(355), Some(354)), 1.0);
        assert_eq!(duration_score(Some(200), Some(203)), 1.0);
        assert_eq!(duration_score(Some(200), Some(210)), 0.0);
        assert_eq!(duration_score(Some(200), Some(260)), 0.0);
        assert!((duration_score(Some(200), Some(206)) - 4.0 / 7.0).abs() < 1e-9);
        assert_eq!(duration_score(None, Some(200)), 0.5);
        assert_eq!(duration_score(Some(200), None), 0.5);
    }

    #[test]
    fn test_remastered_title_matches_with_high_score() {
        let source = Track::new("Bohemian Rhapsody", "Queen").with_duration(355);
        let candidate = Track::new("Bohemian Rhapsody - Remastered", "Queen")
            .with_duration(354)
            .with_platform_id("dest-1");

        let result = match_track(&source, candidates(vec![candidate]), DEFAULT_MATCH_THRESHOLD);
        match result {
            MatchResult::Matched { track, score } => {
                assert_eq!(track.platform_id(), Some("dest-1"));
                assert!(score >= 0.9, "score {} below 0.9", score);
            }
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_candidates_is_no_candidates() {
        let source = Track::new("Yesterday", "The Beatles");
        let result = match_track(&source, Vec::new(), DEFAULT_MATCH_THRESHOLD);
        assert_eq!(
            result,
            MatchResult::NoMatch {
                reason: NoMatchReason::NoCandidates
            }
        );
    }

    #[test]
    fn test_below_threshold_reports_best_score() {
        let source = Track::new("Yesterday", "The Beatles").with_duration(125);
        let unrelated = Track::new("Thunderstruck", "AC/DC").with_duration(292);

        match match_track(&source, candidates(vec![unrelated]), DEFAULT_MATCH_THRESHOLD) {
            MatchResult::NoMatch {
                reason: NoMatchReason::BelowThreshold { best_score },
            } => {
                assert!(best_score < DEFAULT_MATCH_THRESHOLD);
                assert!(best_score >= 0.0);
            }
            other => panic!("expected BelowThreshold, got {:?}", other),
        }
    }

    #[test]
    fn test_best_candidate_selected() {
        let source = Track::new("Yesterday", "The Beatles").with_duration(125);
        let ranked = candidates(vec![
            Track::new("Yesterday Once More", "Carpenters").with_platform_id("a"),
            Track::new("Yesterday - Remastered 2009", "The Beatles")
                .with_duration(126)
                .with_platform_id("b"),
        ]);

        let result = match_track(&source, ranked, DEFAULT_MATCH_THRESHOLD);
        match result {
            MatchResult::Matched { track, .. } => assert_eq!(track.platform_id(), Some("b")),
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[test]
    fn test_tie_prefers_earlier_candidate() {
        let source = Track::new("Hey Jude", "The Beatles");
        let ranked = candidates(vec![
            Track::new("Hey Jude", "The Beatles").with_platform_id("first"),
            Track::new("Hey Jude", "The Beatles").with_platform_id("second"),
        ]);

        match match_track(&source, ranked, DEFAULT_MATCH_THRESHOLD) {
            MatchResult::Matched { track, .. } => assert_eq!(track.platform_id(), Some("first")),
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[test]
    fn test_deterministic() {
        let source = Track::new("Wonderwall", "Oasis").with_duration(258);
        let ranked = vec![
            Track::new("Wonderwall - Remastered", "Oasis").with_duration(259),
            Track::new("Wonderwall", "Ryan Adams").with_duration(230),
        ];

        let matcher = TrackMatcher::default();
        let first = matcher.match_track(&source, candidates(ranked.clone()));
        for _ in 0..10 {
            assert_eq!(matcher.match_track(&source, candidates(ranked.clone())), first);
        }
    }

    #[test]
    fn test_score_breakdown() {
        let source = Track::new("Hello", "Adele").with_duration(295);
        let candidate = Track::new("Hello", "Adele").with_duration(295);
        let score = score_candidate(&source, &candidate);
        assert_eq!(score.title, 1.0);
        assert_eq!(score.artist, 1.0);
        assert_eq!(score.duration, 1.0);
        assert!((score.total - 1.0).abs() < 1e-9);

        let unknown = score_candidate(&Track::new("Hello", "Adele"), &candidate);
        assert!((unknown.total - (0.5 + 0.35 + 0.15 * 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_clamped() {
        assert_eq!(TrackMatcher::new(1.5).threshold(), 1.0);
        assert_eq!(TrackMatcher::new(-0.2).threshold(), 0.0);
        assert_eq!(TrackMatcher::new(f64::NAN).threshold(), DEFAULT_MATCH_THRESHOLD);
    }
}
