//! veil_relay — Asynchronous delivery pipeline for Veil Messenger
//!
//! Accepting a message and persisting it are decoupled: `submit` validates
//! and registers a job, a worker pool persists it (retrying transient
//! store failures with exponential backoff), and the recipient — if
//! connected — gets a best-effort realtime push.  The mailbox row is the
//! durable copy; push is only ever a nudge.
//!
//! # Layout
//! - `config` — pipeline tuning, env-var overridable
//! - `job` — job state machine and caller-side handle
//! - `queue` — submission, worker pool, retry, completion signaling
//! - `persist` — persistence seam and the SQLite-backed impl
//! - `push` — per-recipient realtime event channels
//! - `error` — delivery failure taxonomy
//!
//! ```no_run
//! # use std::{path::Path, sync::Arc};
//! # use veil_relay::{DeliveryConfig, DeliveryQueue, PushBridge};
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(veil_store::Store::open(Path::new("veil.db")).await?);
//! let config = DeliveryConfig::from_env();
//! let push = PushBridge::new(config.push_buffer);
//! let queue = DeliveryQueue::new(store, push.clone(), config);
//! queue.start().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod job;
pub mod persist;
pub mod push;
pub mod queue;

pub use config::DeliveryConfig;
pub use error::DeliveryError;
pub use job::{JobHandle, JobState};
pub use persist::{MessagePersistence, PersistError};
pub use push::{PushBridge, Subscription};
pub use queue::DeliveryQueue;
