//! Conversion job record
//!
//! Status: pending → processing → completed | failed.
//! Phase: pending → extracting → matching → creating → finalizing → completed,
//! with failed reachable from any non-terminal phase.

use crate::models::ConversionResult;
use bb_common::events::{ConversionPhase, JobStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Phase transition record
#[derive(Debug, Clone, Serialize)]
pub struct PhaseTransition {
    pub job_id: Uuid,
    pub old_phase: ConversionPhase,
    pub new_phase: ConversionPhase,
    pub transitioned_at: DateTime<Utc>,
}

/// One unit of conversion work (in-memory state)
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    /// Unique job identifier
    pub job_id: Uuid,

    pub status: JobStatus,

    /// Current pipeline phase
    pub phase: ConversionPhase,

    /// Percentage complete (0-100), non-decreasing while processing
    pub progress: u8,

    /// Present only when `completed`
    pub result: Option<ConversionResult>,

    /// Present only when `failed`
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Set when a terminal state is reached
    pub ended_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create new job in `pending`
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4(),
            status: JobStatus::Pending,
            phase: ConversionPhase::Pending,
            progress: 0,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            ended_at: None,
        }
    }

    /// Move to a new phase, raising progress to the phase floor
    pub fn transition_to(&mut self, new_phase: ConversionPhase) -> PhaseTransition {
        let now = Utc::now();
        let transition = PhaseTransition {
            job_id: self.job_id,
            old_phase: self.phase,
            new_phase,
            transitioned_at: now,
        };
        self.phase = new_phase;
        self.progress = self.progress.max(new_phase.progress_floor());
        self.updated_at = now;

        match new_phase {
            ConversionPhase::Completed | ConversionPhase::Failed => {
                self.ended_at = Some(now);
            }
            _ => {}
        }

        transition
    }

    /// Raise progress; lower values are ignored. Returns whether it changed.
    pub fn advance_progress(&mut self, percent: u8) -> bool {
        let percent = percent.min(100);
        if percent > self.progress {
            self.progress = percent;
            self.updated_at = Utc::now();
            true
        } else {
            false
        }
    }

    /// Check if job is terminal (finished)
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Seconds between creation and completion (or now, if still running)
    pub fn elapsed_seconds(&self) -> u64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.created_at).num_seconds().max(0) as u64
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::new()
    }
}
