//! Phase 3: CREATING
//!
//! Creates the destination playlist from the resolved tracks, in source
//! order. Skipped when nothing matched.

use super::phase_matching::TrackOutcome;
use super::{ConversionError, ConversionOrchestrator, ConversionRequest};
use crate::catalog::{CatalogAdapter, CreatedPlaylist};
use crate::models::{Platform, Playlist};
use bb_common::events::ConversionPhase;
use tracing::info;
use uuid::Uuid;

/// Description set on every created playlist
pub(super) fn playlist_description(source: Platform) -> String {
    format!("Converted from {} by BeatBridge", source.display_name())
}

impl ConversionOrchestrator {
    /// Phase 3: CREATING - create the destination playlist
    ///
    /// Returns `None` without calling the destination when no track matched.
    pub(super) async fn phase_creating(
        &self,
        job_id: Uuid,
        request: &ConversionRequest,
        playlist: &Playlist,
        outcomes: &[TrackOutcome],
        destination: &dyn CatalogAdapter,
    ) -> Result<Option<CreatedPlaylist>, ConversionError> {
        let track_ids: Vec<String> = outcomes
            .iter()
            .filter_map(TrackOutcome::platform_id)
            .map(str::to_string)
            .collect();

        if track_ids.is_empty() {
            info!(job_id = %job_id, "No tracks matched, skipping playlist creation");
            return Ok(None);
        }

        self.jobs
            .set_phase(job_id, ConversionPhase::Creating)
            .await?;

        let description = playlist_description(request.source_platform);
        let created = self
            .within_budget(destination.create_playlist(
                &playlist.name,
                Some(description.as_str()),
                &track_ids,
            ))
            .await
            .map_err(ConversionError::Creation)?;

        info!(
            job_id = %job_id,
            playlist_id = %created.playlist_id,
            tracks = track_ids.len(),
            "Phase 3: CREATING complete"
        );
        Ok(Some(created))
    }
}
