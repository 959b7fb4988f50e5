//! Real-time push bridge: per-recipient event channels.
//!
//! A recipient client that is online subscribes under its user ID and
//! receives [`ServerEvent`]s as messages for it are persisted.  Push is
//! strictly best effort — the mailbox row is the durable copy, so a
//! recipient that is offline, slow, or mid-reconnect simply misses the
//! realtime nudge and catches up from history.
//!
//! At most one live subscription per user: subscribing again replaces the
//! previous channel, whose receiver then drains and closes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use veil_proto::{PersistedMessage, ServerEvent};

struct Connection {
    epoch: u64,
    tx: mpsc::Sender<ServerEvent>,
}

/// Shared connection registry.  Clone to hand to the delivery queue and
/// to whatever surface accepts client connections.
#[derive(Clone)]
pub struct PushBridge {
    connections: Arc<RwLock<HashMap<String, Connection>>>,
    epoch: Arc<AtomicU64>,
    buffer: usize,
}

/// A live push subscription.  Dropping it (without `unsubscribe`) leaves a
/// stale registry entry that is swept on the next notify.
pub struct Subscription {
    pub user_id: String,
    pub events: mpsc::Receiver<ServerEvent>,
    epoch: u64,
}

impl PushBridge {
    pub fn new(buffer: usize) -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            epoch: Arc::new(AtomicU64::new(0)),
            buffer,
        }
    }

    /// Open a push channel for `user_id`, replacing any previous one.
    pub async fn subscribe(&self, user_id: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        let epoch = self.epoch.fetch_add(1, Ordering::Relaxed);
        let previous = self
            .connections
            .write()
            .await
            .insert(user_id.to_string(), Connection { epoch, tx });
        if previous.is_some() {
            debug!(user_id, "replaced existing push subscription");
        }
        Subscription {
            user_id: user_id.to_string(),
            events: rx,
            epoch,
        }
    }

    /// Close a subscription.  A no-op if the user has since resubscribed:
    /// only the registration this `Subscription` created is removed.
    pub async fn unsubscribe(&self, sub: &Subscription) {
        let mut connections = self.connections.write().await;
        if connections
            .get(&sub.user_id)
            .is_some_and(|c| c.epoch == sub.epoch)
        {
            connections.remove(&sub.user_id);
        }
    }

    pub async fn connected(&self, user_id: &str) -> bool {
        self.connections.read().await.contains_key(user_id)
    }

    /// Push a `newMessage` event to the recipient, if one is connected.
    /// Never fails the caller: an absent recipient is a silent no-op, a
    /// full channel drops the event, a closed channel is swept.
    pub async fn notify(&self, message: &PersistedMessage) {
        let receiver_id = &message.receiver_id;
        let target = {
            let connections = self.connections.read().await;
            connections
                .get(receiver_id)
                .map(|c| (c.epoch, c.tx.clone()))
        };
        let Some((epoch, tx)) = target else {
            debug!(%receiver_id, "recipient offline, skipping push");
            return;
        };

        match tx.try_send(ServerEvent::NewMessage(message.clone())) {
            Ok(()) => debug!(%receiver_id, message_id = %message.id, "pushed newMessage"),
            Err(TrySendError::Full(_)) => {
                warn!(%receiver_id, "push channel full, dropping realtime event");
            }
            Err(TrySendError::Closed(_)) => {
                let mut connections = self.connections.write().await;
                if connections
                    .get(receiver_id)
                    .is_some_and(|c| c.epoch == epoch)
                {
                    connections.remove(receiver_id);
                    debug!(%receiver_id, "swept dead push subscription");
                }
            }
        }
    }
}
