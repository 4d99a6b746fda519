//! Conversion pipeline
//!
//! Drives one job through the phases:
//! 1. EXTRACTING: fetch the source playlist
//! 2. MATCHING: search and match every source track (bounded concurrency)
//! 3. CREATING: create the destination playlist from the matched tracks
//! 4. FINALIZING: assemble and store the conversion result
//!
//! Extraction and creation errors fail the job. Per-track problems are
//! collected into the result's failed-track list.

mod phase_creating;
mod phase_extracting;
mod phase_finalizing;
mod phase_matching;

use crate::catalog::{CatalogAdapter, CatalogError, CatalogResult};
use crate::matcher::TrackMatcher;
use crate::models::{ConversionResult, Platform};
use crate::services::job_manager::{JobError, JobManager};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

/// Upper bound on concurrent destination searches per job
pub const MAX_CONCURRENT_SEARCHES: usize = 8;

/// Errors that end a conversion
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Failed to fetch source playlist: {0}")]
    Extraction(CatalogError),

    #[error("Failed to create destination playlist: {0}")]
    Creation(CatalogError),

    #[error(transparent)]
    Job(#[from] JobError),
}

/// A validated conversion, ready to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub source_platform: Platform,
    pub destination_platform: Platform,
    /// Source platform playlist id (already extracted from any URL)
    pub playlist_id: String,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub match_threshold: f64,
    /// Concurrent searches during matching (clamped to 1..=8)
    pub max_concurrent_searches: usize,
    /// Time budget for each adapter call
    pub adapter_call_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            match_threshold: crate::matcher::DEFAULT_MATCH_THRESHOLD,
            max_concurrent_searches: 4,
            adapter_call_timeout: Duration::from_secs(120),
        }
    }
}

pub struct ConversionOrchestrator {
    jobs: JobManager,
    matcher: TrackMatcher,
    max_concurrent_searches: usize,
    adapter_call_timeout: Duration,
}

impl ConversionOrchestrator {
    pub fn new(jobs: JobManager, settings: OrchestratorSettings) -> Self {
        Self {
            jobs,
            matcher: TrackMatcher::new(settings.match_threshold),
            max_concurrent_searches: settings
                .max_concurrent_searches
                .clamp(1, MAX_CONCURRENT_SEARCHES),
            adapter_call_timeout: settings.adapter_call_timeout,
        }
    }

    /// Run the pipeline for `job_id` to a terminal state
    ///
    /// On success the stored result is returned. On an unrecoverable error
    /// the job is marked `failed` and the error is returned.
    pub async fn execute(
        &self,
        job_id: Uuid,
        request: ConversionRequest,
        source: Arc<dyn CatalogAdapter>,
        destination: Arc<dyn CatalogAdapter>,
    ) -> Result<ConversionResult, ConversionError> {
        self.jobs.set_processing(job_id).await?;

        info!(
            job_id = %job_id,
            source = %request.source_platform,
            destination = %request.destination_platform,
            playlist_id = %request.playlist_id,
            "Starting conversion"
        );

        match self
            .run_phases(job_id, &request, source.as_ref(), destination.as_ref())
            .await
        {
            Ok(result) => Ok(result),
            Err(e) => {
                if let Err(fail_err) = self.jobs.fail(job_id, e.to_string()).await {
                    error!(job_id = %job_id, error = %fail_err, "Could not mark job failed");
                }
                Err(e)
            }
        }
    }

    async fn run_phases(
        &self,
        job_id: Uuid,
        request: &ConversionRequest,
        source: &dyn CatalogAdapter,
        destination: &dyn CatalogAdapter,
    ) -> Result<ConversionResult, ConversionError> {
        // Phase 1: EXTRACTING
        let playlist = self.phase_extracting(job_id, request, source).await?;

        // Phase 2: MATCHING
        let outcomes = self
            .phase_matching(job_id, &playlist.tracks, destination)
            .await?;

        // Phase 3: CREATING
        let created = self
            .phase_creating(job_id, request, &playlist, &outcomes, destination)
            .await?;

        // Phase 4: FINALIZING
        self.phase_finalizing(job_id, request, &playlist, outcomes, created)
            .await
    }

    /// Run an adapter call within the per-call time budget
    async fn within_budget<T, F>(&self, call: F) -> CatalogResult<T>
    where
        F: Future<Output = CatalogResult<T>>,
    {
        tokio::time::timeout(self.adapter_call_timeout, call)
            .await
            .unwrap_or(Err(CatalogError::Timeout))
    }
}
