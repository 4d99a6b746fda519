//! Phase 2: MATCHING
//!
//! Searches the destination for every source track and runs the matcher.
//! Searches overlap up to the configured bound; outcomes are returned in
//! source order whatever order they completed in.

use super::{ConversionError, ConversionOrchestrator};
use crate::catalog::{CatalogAdapter, SearchQuery};
use crate::models::{MatchResult, Track};
use bb_common::events::ConversionPhase;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-track result of the matching phase
#[derive(Debug, Clone, PartialEq)]
pub(super) enum TrackOutcome {
    /// Destination track id and match confidence
    Resolved { platform_id: String, score: f64 },
    /// Reason code (`NoCandidates`, `BelowThreshold`) or search error message
    Unresolved { reason: String },
}

impl TrackOutcome {
    pub(super) fn platform_id(&self) -> Option<&str> {
        match self {
            TrackOutcome::Resolved { platform_id, .. } => Some(platform_id),
            TrackOutcome::Unresolved { .. } => None,
        }
    }

    fn score(&self) -> Option<f64> {
        match self {
            TrackOutcome::Resolved { score, .. } => Some(*score),
            TrackOutcome::Unresolved { .. } => None,
        }
    }
}

/// Progress after `processed` of `total` tracks: 25% plus up to 50%
pub(super) fn matching_progress(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 75;
    }
    let band = 50 * processed.min(total) / total;
    (25 + band) as u8
}

impl ConversionOrchestrator {
    /// Phase 2: MATCHING - resolve every source track on the destination
    ///
    /// Returns one outcome per source track, in source order.
    pub(super) async fn phase_matching(
        &self,
        job_id: Uuid,
        tracks: &[Track],
        destination: &dyn CatalogAdapter,
    ) -> Result<Vec<TrackOutcome>, ConversionError> {
        self.jobs
            .set_phase(job_id, ConversionPhase::Matching)
            .await?;

        let total = tracks.len();
        let mut indexed: Vec<(usize, TrackOutcome)> = Vec::with_capacity(total);

        let mut pending = stream::iter(tracks.iter().cloned().enumerate())
            .map(move |(index, track)| async move {
                (index, self.match_one(job_id, &track, destination).await)
            })
            .buffer_unordered(self.max_concurrent_searches);

        while let Some((index, outcome)) = pending.next().await {
            indexed.push((index, outcome));
            self.jobs
                .update_progress(job_id, matching_progress(indexed.len(), total))
                .await?;
        }

        indexed.sort_by_key(|(index, _)| *index);
        let outcomes: Vec<TrackOutcome> = indexed.into_iter().map(|(_, o)| o).collect();

        let scores: Vec<f64> = outcomes.iter().filter_map(TrackOutcome::score).collect();
        let mean_score = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };
        info!(
            job_id = %job_id,
            matched = scores.len(),
            total,
            mean_score,
            "Phase 2: MATCHING complete"
        );
        Ok(outcomes)
    }

    async fn match_one(
        &self,
        job_id: Uuid,
        track: &Track,
        destination: &dyn CatalogAdapter,
    ) -> TrackOutcome {
        let query = SearchQuery::from(track);

        let candidates = match self
            .within_budget(destination.search_candidates(&query))
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(job_id = %job_id, track = %track, error = %e, "Search failed");
                return TrackOutcome::Unresolved {
                    reason: e.to_string(),
                };
            }
        };

        match self.matcher.match_track(track, candidates) {
            MatchResult::Matched { track: found, score } => match found.platform_id() {
                Some(id) => TrackOutcome::Resolved {
                    platform_id: id.to_string(),
                    score,
                },
                None => {
                    warn!(job_id = %job_id, track = %track, "Matched track has no platform id");
                    TrackOutcome::Unresolved {
                        reason: "Matched track has no platform id".to_string(),
                    }
                }
            },
            MatchResult::NoMatch { reason } => {
                debug!(job_id = %job_id, track = %track, reason = %reason, "No match");
                TrackOutcome::Unresolved {
                    reason: reason.code().to_string(),
                }
            }
        }
    }
}
