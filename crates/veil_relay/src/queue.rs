//! Asynchronous delivery queue: worker pool, retry with exponential
//! backoff, and per-job completion signaling.
//!
//! Submission is decoupled from persistence.  `submit` validates the
//! envelope, registers a job and enqueues its ID; a fixed pool of workers
//! drains the queue and drives each job through persistence and push.
//! Callers hold a [`JobHandle`] and block on `await_completion` with a
//! bounded wait — a timeout there means "not confirmed yet", never
//! "failed": the job keeps running and stays queryable via `job_status`.
//!
//! Retried jobs re-enter at the queue tail after their backoff, so one
//! flaky submission cannot stall the workers.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use veil_crypto::EncryptedEnvelope;
use veil_proto::{MessageKind, NewMessage, PersistedMessage};

use crate::config::DeliveryConfig;
use crate::error::DeliveryError;
use crate::job::{JobHandle, JobState};
use crate::persist::{MessagePersistence, PersistError};
use crate::push::PushBridge;

struct JobEntry {
    message: NewMessage,
    attempt: u32,
    status: watch::Sender<JobState>,
}

impl JobEntry {
    fn set_state(&self, state: JobState) {
        // send_replace so the state is recorded even with no live handle.
        self.status.send_replace(state);
    }
}

struct QueueInner {
    config: DeliveryConfig,
    store: Arc<dyn MessagePersistence>,
    push: PushBridge,
    jobs: RwLock<HashMap<Uuid, JobEntry>>,
    /// Terminal jobs in completion order, oldest first.  Evicted from
    /// `jobs` once past the retention window.
    terminal: Mutex<VecDeque<Uuid>>,
    /// `None` once the queue is closed.
    tx: std::sync::Mutex<Option<mpsc::UnboundedSender<Uuid>>>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Uuid>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl QueueInner {
    fn sender(&self) -> Option<mpsc::UnboundedSender<Uuid>> {
        match self.tx.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Handle to the delivery pipeline.  Clone freely; workers run until
/// [`close`](DeliveryQueue::close).
#[derive(Clone)]
pub struct DeliveryQueue {
    inner: Arc<QueueInner>,
}

impl DeliveryQueue {
    pub fn new(store: Arc<dyn MessagePersistence>, push: PushBridge, config: DeliveryConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(QueueInner {
                config,
                store,
                push,
                jobs: RwLock::new(HashMap::new()),
                terminal: Mutex::new(VecDeque::new()),
                tx: std::sync::Mutex::new(Some(tx)),
                rx: Mutex::new(Some(rx)),
                workers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Spawn the worker pool.  Jobs submitted before `start` wait in the
    /// channel; calling it twice is a no-op.
    pub async fn start(&self) {
        let Some(rx) = self.inner.rx.lock().await.take() else {
            return;
        };
        let rx = Arc::new(Mutex::new(rx));
        let mut workers = self.inner.workers.lock().await;
        for worker_id in 0..self.inner.config.workers {
            let inner = self.inner.clone();
            let rx = rx.clone();
            workers.push(tokio::spawn(worker_loop(inner, rx, worker_id)));
        }
        info!(workers = self.inner.config.workers, "delivery queue started");
    }

    /// Validate and enqueue a message for delivery.  Returns as soon as
    /// the job is registered — persistence happens on a worker.
    ///
    /// Structural validation is the fail-fast path: a malformed envelope
    /// is rejected here and no job is created.
    pub async fn submit(
        &self,
        sender_id: &str,
        receiver_id: &str,
        kind: MessageKind,
        envelope: EncryptedEnvelope,
    ) -> Result<JobHandle, DeliveryError> {
        let id = Uuid::new_v4();
        let message = NewMessage {
            client_id: id.to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            kind,
            envelope,
        };
        message.validate()?;

        let tx = self.inner.sender().ok_or(DeliveryError::QueueClosed)?;

        let (status, handle_rx) = watch::channel(JobState::Waiting { attempt: 0 });
        self.inner.jobs.write().await.insert(
            id,
            JobEntry {
                message,
                attempt: 0,
                status,
            },
        );
        if tx.send(id).is_err() {
            self.inner.jobs.write().await.remove(&id);
            return Err(DeliveryError::QueueClosed);
        }

        debug!(job_id = %id, sender_id, receiver_id, "delivery job queued");
        Ok(JobHandle {
            id,
            status: handle_rx,
        })
    }

    /// Wait for the job behind `handle` to reach a terminal state, up to
    /// `timeout` (the configured default when `None`).
    ///
    /// `Err(Timeout)` does not cancel anything: the job is still being
    /// worked and its eventual outcome is observable via [`job_status`]
    /// (or another `await_completion` call).
    ///
    /// [`job_status`]: DeliveryQueue::job_status
    pub async fn await_completion(
        &self,
        handle: &JobHandle,
        timeout: Option<std::time::Duration>,
    ) -> Result<PersistedMessage, DeliveryError> {
        let budget = timeout.unwrap_or(self.inner.config.await_timeout);
        let mut status = handle.status.clone();

        let wait = async move {
            loop {
                let state = status.borrow_and_update().clone();
                match state {
                    JobState::Completed { message } => return Ok(message),
                    JobState::Failed { attempts, reason } => {
                        return Err(DeliveryError::Failed { attempts, reason })
                    }
                    JobState::Waiting { .. } | JobState::Active { .. } => {}
                }
                if status.changed().await.is_err() {
                    return Err(DeliveryError::QueueClosed);
                }
            }
        };

        match tokio::time::timeout(budget, wait).await {
            Ok(outcome) => outcome,
            Err(_) => Err(DeliveryError::Timeout(budget)),
        }
    }

    /// Current state of a job, or `None` if the ID is unknown (never
    /// submitted, or terminal and already evicted).
    pub async fn job_status(&self, id: Uuid) -> Option<JobState> {
        let jobs = self.inner.jobs.read().await;
        jobs.get(&id).map(|entry| entry.status.borrow().clone())
    }

    /// Stop accepting submissions and wait for the workers to drain the
    /// queue, including any backoff-scheduled retries still in flight.
    pub async fn close(&self) {
        match self.inner.tx.lock() {
            Ok(mut guard) => drop(guard.take()),
            Err(poisoned) => drop(poisoned.into_inner().take()),
        }
        let mut workers = self.inner.workers.lock().await;
        for worker in workers.drain(..) {
            if let Err(e) = worker.await {
                error!(error = %e, "delivery worker panicked");
            }
        }
        info!("delivery queue closed");
    }
}

async fn worker_loop(
    inner: Arc<QueueInner>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Uuid>>>,
    worker_id: usize,
) {
    loop {
        // Hold the receiver lock only while dequeuing, so the other
        // workers can pick up jobs while this one processes.
        let next = { rx.lock().await.recv().await };
        let Some(job_id) = next else { break };
        process_job(&inner, job_id).await;
    }
    debug!(worker_id, "delivery worker stopped");
}

async fn process_job(inner: &Arc<QueueInner>, job_id: Uuid) {
    let Some((message, attempt)) = ({
        let mut jobs = inner.jobs.write().await;
        jobs.get_mut(&job_id).map(|entry| {
            let attempt = entry.attempt;
            entry.set_state(JobState::Active { attempt });
            (entry.message.clone(), attempt)
        })
    }) else {
        // Evicted between requeue and pickup.
        return;
    };

    debug!(%job_id, attempt, "persisting message");
    match inner.store.persist(&message).await {
        Ok(persisted) => {
            inner.push.notify(&persisted).await;
            info!(%job_id, message_id = %persisted.id, "delivery completed");
            finish(inner, job_id, JobState::Completed { message: persisted }).await;
        }
        Err(PersistError::Transient(reason)) => {
            let attempts_made = attempt + 1;
            if attempts_made >= inner.config.max_attempts {
                error!(%job_id, attempts = attempts_made, %reason, "delivery failed, attempts exhausted");
                finish(
                    inner,
                    job_id,
                    JobState::Failed {
                        attempts: attempts_made,
                        reason,
                    },
                )
                .await;
            } else {
                schedule_retry(inner, job_id, attempts_made, reason).await;
            }
        }
        Err(PersistError::Permanent(reason)) => {
            let attempts_made = attempt + 1;
            error!(%job_id, %reason, "delivery failed permanently");
            finish(
                inner,
                job_id,
                JobState::Failed {
                    attempts: attempts_made,
                    reason,
                },
            )
            .await;
        }
    }
}

async fn schedule_retry(inner: &Arc<QueueInner>, job_id: Uuid, next_attempt: u32, reason: String) {
    let delay = inner.config.backoff_delay(next_attempt);
    {
        let mut jobs = inner.jobs.write().await;
        let Some(entry) = jobs.get_mut(&job_id) else {
            return;
        };
        entry.attempt = next_attempt;
        entry.set_state(JobState::Waiting {
            attempt: next_attempt,
        });
    }
    warn!(%job_id, attempt = next_attempt, ?delay, %reason, "transient failure, retrying");

    // The sender clone keeps the channel open through the backoff, so
    // close() drains scheduled retries before the workers exit.
    let tx = inner.sender();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Some(tx) = tx {
            let _ = tx.send(job_id);
        }
    });
}

async fn finish(inner: &Arc<QueueInner>, job_id: Uuid, state: JobState) {
    {
        let jobs = inner.jobs.read().await;
        let Some(entry) = jobs.get(&job_id) else {
            return;
        };
        entry.set_state(state);
    }

    let evict = {
        let mut terminal = inner.terminal.lock().await;
        terminal.push_back(job_id);
        let mut evict = Vec::new();
        while terminal.len() > inner.config.retained_terminal_jobs {
            if let Some(old) = terminal.pop_front() {
                evict.push(old);
            }
        }
        evict
    };
    if !evict.is_empty() {
        let mut jobs = inner.jobs.write().await;
        for old in evict {
            jobs.remove(&old);
        }
    }
}
