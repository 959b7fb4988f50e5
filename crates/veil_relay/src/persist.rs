//! Persistence seam for the delivery pipeline.
//!
//! The queue retries on [`PersistError::Transient`] and gives up at once
//! on [`PersistError::Permanent`]; the backend decides which is which.

use async_trait::async_trait;
use thiserror::Error;

use veil_proto::{NewMessage, PersistedMessage};
use veil_store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum PersistError {
    /// Worth retrying: the store was momentarily unavailable.
    #[error("transient: {0}")]
    Transient(String),
    /// Retrying cannot help.
    #[error("permanent: {0}")]
    Permanent(String),
}

#[async_trait]
pub trait MessagePersistence: Send + Sync + 'static {
    /// Persist a message and return the stored row.  Must be idempotent
    /// on `client_id`: the queue calls this again after transient errors.
    async fn persist(&self, msg: &NewMessage) -> Result<PersistedMessage, PersistError>;
}

#[async_trait]
impl MessagePersistence for Store {
    async fn persist(&self, msg: &NewMessage) -> Result<PersistedMessage, PersistError> {
        self.save_message(msg).await.map_err(classify)
    }
}

/// SQLite under load surfaces as pool timeouts, I/O errors or
/// busy/locked database errors; those clear on their own.  Everything
/// else (constraint violations, corrupt rows, migrations) will not.
fn classify(err: StoreError) -> PersistError {
    let transient = match &err {
        StoreError::Database(sqlx::Error::Io(_))
        | StoreError::Database(sqlx::Error::PoolTimedOut)
        | StoreError::Database(sqlx::Error::PoolClosed) => true,
        StoreError::Database(sqlx::Error::Database(db)) => {
            let msg = db.message();
            msg.contains("locked") || msg.contains("busy")
        }
        _ => false,
    };
    if transient {
        PersistError::Transient(err.to_string())
    } else {
        PersistError::Permanent(err.to_string())
    }
}
