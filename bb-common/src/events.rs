//! Job lifecycle types and the job event bus
//!
//! Every mutation made through the job store is published here so that
//! observers (SSE clients, logs, tests) can follow a conversion without
//! polling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Externally visible job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, worker not started yet
    Pending,
    /// Worker is running the pipeline
    Processing,
    /// Finished and a result is stored
    Completed,
    /// Finished with an unrecoverable error
    Failed,
}

impl JobStatus {
    /// `completed` and `failed` accept no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline phase of a job
///
/// pending → extracting → matching → creating → finalizing → completed,
/// with `failed` reachable from any non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionPhase {
    Pending,
    /// Fetching the source playlist (0-25%)
    Extracting,
    /// Searching and matching every source track (25-75%)
    Matching,
    /// Creating the destination playlist (75-95%)
    Creating,
    /// Assembling the conversion result (95-100%)
    Finalizing,
    Completed,
    Failed,
}

impl ConversionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            ConversionPhase::Pending => "pending",
            ConversionPhase::Extracting => "extracting",
            ConversionPhase::Matching => "matching",
            ConversionPhase::Creating => "creating",
            ConversionPhase::Finalizing => "finalizing",
            ConversionPhase::Completed => "completed",
            ConversionPhase::Failed => "failed",
        }
    }

    /// Lowest progress percentage reported while in this phase
    pub fn progress_floor(self) -> u8 {
        match self {
            ConversionPhase::Pending | ConversionPhase::Extracting => 0,
            ConversionPhase::Matching => 25,
            ConversionPhase::Creating => 75,
            ConversionPhase::Finalizing => 95,
            ConversionPhase::Completed => 100,
            ConversionPhase::Failed => 0,
        }
    }

    /// Position in the forward pipeline order (`failed` has none)
    pub fn ordinal(self) -> Option<u8> {
        match self {
            ConversionPhase::Pending => Some(0),
            ConversionPhase::Extracting => Some(1),
            ConversionPhase::Matching => Some(2),
            ConversionPhase::Creating => Some(3),
            ConversionPhase::Finalizing => Some(4),
            ConversionPhase::Completed => Some(5),
            ConversionPhase::Failed => None,
        }
    }
}

impl fmt::Display for ConversionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BridgeEvent {
    /// Job record created in `pending`
    JobCreated {
        job_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Job moved to another pipeline phase
    JobPhaseChanged {
        job_id: Uuid,
        old_phase: ConversionPhase,
        new_phase: ConversionPhase,
        timestamp: DateTime<Utc>,
    },

    /// Progress percentage increased
    JobProgress {
        job_id: Uuid,
        phase: ConversionPhase,
        progress: u8,
        timestamp: DateTime<Utc>,
    },

    /// Job finished with a stored result
    JobCompleted {
        job_id: Uuid,
        success: bool,
        total_tracks: usize,
        matched_tracks: usize,
        timestamp: DateTime<Utc>,
    },

    /// Job finished with an unrecoverable error
    JobFailed {
        job_id: Uuid,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Job record removed from the store
    JobEvicted {
        job_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl BridgeEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            BridgeEvent::JobCreated { .. } => "JobCreated",
            BridgeEvent::JobPhaseChanged { .. } => "JobPhaseChanged",
            BridgeEvent::JobProgress { .. } => "JobProgress",
            BridgeEvent::JobCompleted { .. } => "JobCompleted",
            BridgeEvent::JobFailed { .. } => "JobFailed",
            BridgeEvent::JobEvicted { .. } => "JobEvicted",
        }
    }

    /// Job the event refers to
    pub fn job_id(&self) -> Uuid {
        match self {
            BridgeEvent::JobCreated { job_id, .. }
            | BridgeEvent::JobPhaseChanged { job_id, .. }
            | BridgeEvent::JobProgress { job_id, .. }
            | BridgeEvent::JobCompleted { job_id, .. }
            | BridgeEvent::JobFailed { job_id, .. }
            | BridgeEvent::JobEvicted { job_id, .. } => *job_id,
        }
    }
}

/// Broadcast bus for [`BridgeEvent`]s
///
/// Slow subscribers lose the oldest events once `capacity` is exceeded.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BridgeEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: BridgeEvent,
    ) -> Result<usize, broadcast::error::SendError<BridgeEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: BridgeEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
