//! Conversion submission
//!
//! Validates a request, opens the two catalog adapters, creates the job and
//! hands it to a background worker. Never waits for the conversion itself.

use crate::catalog::{CatalogError, CatalogProvider};
use crate::models::{extract_playlist_id, Platform};
use crate::services::conversion_orchestrator::{
    ConversionOrchestrator, ConversionRequest, OrchestratorSettings,
};
use crate::services::job_manager::JobManager;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

/// Conversion as submitted by a caller
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub source_platform: Platform,
    pub destination_platform: Platform,
    /// Bare playlist id or share URL
    pub playlist_reference: String,
    pub source_auth_token: Option<String>,
    pub destination_auth_token: Option<String>,
}

/// Rejections at submit time (no job is created)
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Source and destination platforms must be different")]
    SamePlatform,

    #[error("Invalid {} playlist reference: {reference}", .platform.display_name())]
    InvalidReference { platform: Platform, reference: String },

    #[error("{} is not available: {source}", .platform.display_name())]
    CatalogUnavailable {
        platform: Platform,
        source: CatalogError,
    },
}

#[derive(Clone)]
pub struct ConversionService {
    jobs: JobManager,
    catalogs: Arc<dyn CatalogProvider>,
    orchestrator: Arc<ConversionOrchestrator>,
}

impl ConversionService {
    pub fn new(
        jobs: JobManager,
        catalogs: Arc<dyn CatalogProvider>,
        settings: OrchestratorSettings,
    ) -> Self {
        let orchestrator = Arc::new(ConversionOrchestrator::new(jobs.clone(), settings));
        Self {
            jobs,
            catalogs,
            orchestrator,
        }
    }

    pub fn catalogs(&self) -> &Arc<dyn CatalogProvider> {
        &self.catalogs
    }

    /// Validate and start a conversion, returning the new job id
    pub async fn submit(&self, request: SubmitRequest) -> Result<Uuid, SubmitError> {
        if request.source_platform == request.destination_platform {
            return Err(SubmitError::SamePlatform);
        }

        let playlist_id = extract_playlist_id(&request.playlist_reference, request.source_platform)
            .ok_or_else(|| SubmitError::InvalidReference {
                platform: request.source_platform,
                reference: request.playlist_reference.trim().to_string(),
            })?;

        let source = self
            .catalogs
            .open(request.source_platform, request.source_auth_token.as_deref())
            .map_err(|source| SubmitError::CatalogUnavailable {
                platform: request.source_platform,
                source,
            })?;
        let destination = self
            .catalogs
            .open(
                request.destination_platform,
                request.destination_auth_token.as_deref(),
            )
            .map_err(|source| SubmitError::CatalogUnavailable {
                platform: request.destination_platform,
                source,
            })?;

        let conversion = ConversionRequest {
            source_platform: request.source_platform,
            destination_platform: request.destination_platform,
            playlist_id,
        };

        let job_id = self.jobs.create().await;
        info!(
            job_id = %job_id,
            source = %conversion.source_platform,
            destination = %conversion.destination_platform,
            "Conversion submitted"
        );

        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::spawn(async move {
            if let Err(e) = orchestrator
                .execute(job_id, conversion, source, destination)
                .await
            {
                error!(job_id = %job_id, error = %e, "Conversion failed");
            }
        });

        Ok(job_id)
    }
}
