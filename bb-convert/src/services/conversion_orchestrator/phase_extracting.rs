//! Phase 1: EXTRACTING
//!
//! Fetches the source playlist. Any adapter error here ends the job.

use super::{ConversionError, ConversionOrchestrator, ConversionRequest};
use crate::catalog::CatalogAdapter;
use crate::models::Playlist;
use bb_common::events::ConversionPhase;
use tracing::info;
use uuid::Uuid;

impl ConversionOrchestrator {
    /// Phase 1: EXTRACTING - fetch the source playlist and its tracks
    pub(super) async fn phase_extracting(
        &self,
        job_id: Uuid,
        request: &ConversionRequest,
        source: &dyn CatalogAdapter,
    ) -> Result<Playlist, ConversionError> {
        self.jobs
            .set_phase(job_id, ConversionPhase::Extracting)
            .await?;

        let playlist = self
            .within_budget(source.fetch_playlist(&request.playlist_id))
            .await
            .map_err(ConversionError::Extraction)?;

        info!(
            job_id = %job_id,
            playlist = %playlist.name,
            tracks = playlist.track_count(),
            "Phase 1: EXTRACTING complete"
        );
        Ok(playlist)
    }
}
