//! Phase 4: FINALIZING
//!
//! Assembles the conversion result and stores it on the job.

use super::phase_matching::TrackOutcome;
use super::{ConversionError, ConversionOrchestrator, ConversionRequest};
use crate::catalog::CreatedPlaylist;
use crate::models::{ConversionResult, FailedTrack, Playlist};
use bb_common::events::ConversionPhase;
use tracing::warn;
use uuid::Uuid;

impl ConversionOrchestrator {
    /// Phase 4: FINALIZING - build the result and complete the job
    pub(super) async fn phase_finalizing(
        &self,
        job_id: Uuid,
        request: &ConversionRequest,
        playlist: &Playlist,
        outcomes: Vec<TrackOutcome>,
        created: Option<CreatedPlaylist>,
    ) -> Result<ConversionResult, ConversionError> {
        self.jobs
            .set_phase(job_id, ConversionPhase::Finalizing)
            .await?;

        let result = build_result(request, playlist, outcomes, created);
        if !result.is_consistent() {
            warn!(job_id = %job_id, "Conversion result track counts do not add up");
        }

        self.jobs.complete(job_id, result.clone()).await?;
        Ok(result)
    }
}

/// Assemble the report; `outcomes` are in source order, one per track
pub(super) fn build_result(
    request: &ConversionRequest,
    playlist: &Playlist,
    outcomes: Vec<TrackOutcome>,
    created: Option<CreatedPlaylist>,
) -> ConversionResult {
    let total_tracks = playlist.tracks.len();
    let failed_tracks: Vec<FailedTrack> = playlist
        .tracks
        .iter()
        .zip(outcomes)
        .filter_map(|(track, outcome)| match outcome {
            TrackOutcome::Resolved { .. } => None,
            TrackOutcome::Unresolved { reason } => Some(FailedTrack::new(track, reason)),
        })
        .collect();
    let matched_tracks = total_tracks - failed_tracks.len();
    let destination = request.destination_platform.display_name();

    let (success, message) = if total_tracks == 0 {
        (
            false,
            "Source playlist contains no tracks; no playlist was created.".to_string(),
        )
    } else if matched_tracks == 0 || created.is_none() {
        (
            false,
            format!(
                "None of the {} tracks could be matched on {}; no playlist was created.",
                total_tracks, destination
            ),
        )
    } else {
        (
            true,
            format!(
                "Successfully created {} playlist with {} tracks. {} tracks could not be found.",
                destination,
                matched_tracks,
                failed_tracks.len()
            ),
        )
    };

    let (playlist_id, playlist_url) = match created {
        Some(created) => (Some(created.playlist_id), Some(created.playlist_url)),
        None => (None, None),
    };

    ConversionResult {
        success,
        message,
        playlist_id,
        playlist_url,
        source_platform: request.source_platform,
        destination_platform: request.destination_platform,
        source_playlist_name: playlist.name.clone(),
        total_tracks,
        matched_tracks,
        failed_tracks,
    }
}
