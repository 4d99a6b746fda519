//! Job store
//!
//! Owns every [`Job`] record. Each operation takes the store lock once, so a
//! reader never observes a half-applied update. Every mutation publishes a
//! [`BridgeEvent`].

use crate::models::{ConversionResult, Job};
use bb_common::events::{BridgeEvent, ConversionPhase, EventBus, JobStatus};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Job store errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(Uuid),

    /// Operation not allowed in the job's current status (caller defect)
    #[error("Invalid transition for job {job_id}: cannot {operation} while {from}")]
    InvalidTransition {
        job_id: Uuid,
        from: JobStatus,
        operation: &'static str,
    },
}

pub type JobResult<T> = Result<T, JobError>;

/// In-memory, linearizable job store
#[derive(Clone)]
pub struct JobManager {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
    event_bus: EventBus,
}

impl JobManager {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            event_bus,
        }
    }

    /// Create a `pending` job and return its id
    pub async fn create(&self) -> Uuid {
        let job = Job::new();
        let job_id = job.job_id;
        let timestamp = job.created_at;

        self.jobs.write().await.insert(job_id, job);

        info!(job_id = %job_id, "Job created");
        self.event_bus
            .emit_lossy(BridgeEvent::JobCreated { job_id, timestamp });
        job_id
    }

    /// Move a `pending` job to `processing`
    ///
    /// Calling it again on a `processing` job is a no-op.
    pub async fn set_processing(&self, job_id: Uuid) -> JobResult<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(JobError::NotFound(job_id))?;

        match job.status {
            JobStatus::Pending => {
                job.status = JobStatus::Processing;
                job.updated_at = Utc::now();
                info!(job_id = %job_id, "Job processing");
                Ok(())
            }
            JobStatus::Processing => Ok(()),
            from => Err(JobError::InvalidTransition {
                job_id,
                from,
                operation: "set processing",
            }),
        }
    }

    /// Enter a pipeline phase on a `processing` job
    ///
    /// Progress is raised to the phase's floor. Terminal phases are reached
    /// only through [`complete`](Self::complete) and [`fail`](Self::fail);
    /// phases never move backwards.
    pub async fn set_phase(&self, job_id: Uuid, phase: ConversionPhase) -> JobResult<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(JobError::NotFound(job_id))?;

        let allowed = match (job.phase.ordinal(), phase.ordinal()) {
            _ if matches!(phase, ConversionPhase::Completed | ConversionPhase::Failed) => false,
            (Some(current), Some(next)) => next >= current,
            _ => false,
        };
        if job.status != JobStatus::Processing || !allowed {
            return Err(JobError::InvalidTransition {
                job_id,
                from: job.status,
                operation: "change phase",
            });
        }
        if job.phase == phase {
            return Ok(());
        }

        let previous_progress = job.progress;
        let transition = job.transition_to(phase);
        let progress = job.progress;

        info!(
            job_id = %job_id,
            from = %transition.old_phase,
            to = %transition.new_phase,
            "Job phase changed"
        );
        self.event_bus.emit_lossy(BridgeEvent::JobPhaseChanged {
            job_id,
            old_phase: transition.old_phase,
            new_phase: transition.new_phase,
            timestamp: transition.transitioned_at,
        });
        if progress > previous_progress {
            self.event_bus.emit_lossy(BridgeEvent::JobProgress {
                job_id,
                phase,
                progress,
                timestamp: transition.transitioned_at,
            });
        }
        Ok(())
    }

    /// Raise progress of a `processing` job
    ///
    /// Lower values leave progress unchanged; values above 100 are clamped.
    /// Returns the job's progress after the update.
    pub async fn update_progress(&self, job_id: Uuid, percent: u8) -> JobResult<u8> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(JobError::NotFound(job_id))?;

        if job.status != JobStatus::Processing {
            return Err(JobError::InvalidTransition {
                job_id,
                from: job.status,
                operation: "update progress",
            });
        }

        if job.advance_progress(percent) {
            debug!(job_id = %job_id, progress = job.progress, "Job progress");
            self.event_bus.emit_lossy(BridgeEvent::JobProgress {
                job_id,
                phase: job.phase,
                progress: job.progress,
                timestamp: job.updated_at,
            });
        }
        Ok(job.progress)
    }

    /// Store the result and mark the job `completed` (progress 100)
    pub async fn complete(&self, job_id: Uuid, result: ConversionResult) -> JobResult<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(JobError::NotFound(job_id))?;

        if job.is_terminal() {
            return Err(JobError::InvalidTransition {
                job_id,
                from: job.status,
                operation: "complete",
            });
        }

        let (success, total_tracks, matched_tracks) =
            (result.success, result.total_tracks, result.matched_tracks);
        let match_rate = result.match_rate();

        job.transition_to(ConversionPhase::Completed);
        job.status = JobStatus::Completed;
        job.progress = 100;
        job.result = Some(result);

        info!(
            job_id = %job_id,
            success,
            total_tracks,
            matched_tracks,
            match_rate,
            elapsed_seconds = job.elapsed_seconds(),
            "Job completed"
        );
        self.event_bus.emit_lossy(BridgeEvent::JobCompleted {
            job_id,
            success,
            total_tracks,
            matched_tracks,
            timestamp: job.updated_at,
        });
        Ok(())
    }

    /// Mark the job `failed` with `message`
    pub async fn fail(&self, job_id: Uuid, message: impl Into<String>) -> JobResult<()> {
        let message = message.into();
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(JobError::NotFound(job_id))?;

        if job.is_terminal() {
            return Err(JobError::InvalidTransition {
                job_id,
                from: job.status,
                operation: "fail",
            });
        }

        let failed_in = job.phase;
        job.transition_to(ConversionPhase::Failed);
        job.status = JobStatus::Failed;
        job.error = Some(message.clone());

        error!(job_id = %job_id, phase = %failed_in, error = %message, "Job failed");
        self.event_bus.emit_lossy(BridgeEvent::JobFailed {
            job_id,
            message,
            timestamp: job.updated_at,
        });
        Ok(())
    }

    /// Snapshot of a job
    pub async fn get(&self, job_id: Uuid) -> JobResult<Job> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .cloned()
            .ok_or(JobError::NotFound(job_id))
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Remove a job record
    pub async fn evict(&self, job_id: Uuid) -> JobResult<Job> {
        let job = self
            .jobs
            .write()
            .await
            .remove(&job_id)
            .ok_or(JobError::NotFound(job_id))?;

        debug!(job_id = %job_id, status = %job.status, "Job evicted");
        self.event_bus.emit_lossy(BridgeEvent::JobEvicted {
            job_id,
            timestamp: Utc::now(),
        });
        Ok(job)
    }

    /// Remove terminal jobs that ended before `cutoff`; returns how many
    pub async fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let evicted: Vec<Uuid> = {
            let mut jobs = self.jobs.write().await;
            let expired: Vec<Uuid> = jobs
                .values()
                .filter(|job| job.is_terminal())
                .filter(|job| job.ended_at.is_some_and(|ended| ended < cutoff))
                .map(|job| job.job_id)
                .collect();
            for job_id in &expired {
                jobs.remove(job_id);
            }
            expired
        };

        let now = Utc::now();
        for job_id in &evicted {
            self.event_bus.emit_lossy(BridgeEvent::JobEvicted {
                job_id: *job_id,
                timestamp: now,
            });
        }
        if !evicted.is_empty() {
            info!(count = evicted.len(), "Evicted finished jobs");
        }
        evicted.len()
    }

    /// Periodically evict terminal jobs older than `retention`
    pub fn spawn_eviction_task(&self, retention: Duration, interval: Duration) -> JoinHandle<()> {
        let manager = self.clone();
        let retention = chrono::Duration::from_std(retention)
            .unwrap_or_else(|_| chrono::Duration::days(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                manager.evict_finished_before(Utc::now() - retention).await;
            }
        })
    }
}
