//! Conversion services

pub mod conversion_orchestrator;
pub mod conversion_service;
pub mod job_manager;

pub use conversion_orchestrator::{
    ConversionError, ConversionOrchestrator, ConversionRequest, OrchestratorSettings,
};
pub use conversion_service::{ConversionService, SubmitError, SubmitRequest};
pub use job_manager::{JobError, JobManager};
