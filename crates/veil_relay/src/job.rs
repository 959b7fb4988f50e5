//! Delivery job state machine.
//!
//! ```text
//! Waiting ──► Active ──► Completed
//!    ▲           │
//!    └───────────┤ transient failure, attempts left
//!                └──► Failed (attempts exhausted, or permanent failure)
//! ```
//!
//! State transitions are published on a `watch` channel per job, so any
//! number of observers can follow a job without polling the queue.

use uuid::Uuid;

use veil_proto::PersistedMessage;

/// Snapshot of where a job is in its lifecycle.  Terminal states carry
/// their outcome.
#[derive(Debug, Clone)]
pub enum JobState {
    /// Queued (or re-queued after a transient failure), not yet picked up
    /// by a worker.
    Waiting { attempt: u32 },
    /// A worker is persisting the message.
    Active { attempt: u32 },
    /// Persisted; the stored row is the authoritative record.
    Completed { message: PersistedMessage },
    /// Gave up.  `attempts` counts every persistence attempt made.
    Failed { attempts: u32, reason: String },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed { .. } | JobState::Failed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            JobState::Waiting { .. } => "waiting",
            JobState::Active { .. } => "active",
            JobState::Completed { .. } => "completed",
            JobState::Failed { .. } => "failed",
        }
    }
}

/// Caller's ticket for a submitted job.  Obtained from
/// [`DeliveryQueue::submit`](crate::DeliveryQueue::submit); redeemed with
/// [`DeliveryQueue::await_completion`](crate::DeliveryQueue::await_completion).
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub id: Uuid,
    pub(crate) status: tokio::sync::watch::Receiver<JobState>,
}
