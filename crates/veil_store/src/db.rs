//! Database abstraction over SQLite via sqlx.

use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use veil_crypto::{b64, EncryptedEnvelope, WrappedPrivateKey};
use veil_proto::{MessageKind, NewMessage, PersistedMessage};

use crate::error::StoreError;

/// Central store handle.  Cheap to clone (pool is Arc internally).
#[derive(Clone)]
pub struct Store {
    pub pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: String,
    client_id: String,
    sender_id: String,
    receiver_id: String,
    kind: String,
    iv: String,
    ciphertext: String,
    recipient_wrapped_key: String,
    sender_wrapped_key: String,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_message(self) -> Result<PersistedMessage, StoreError> {
        let decode = |field: &str, value: &str| {
            b64::decode(value).map_err(|e| StoreError::Corrupt(format!("{field}: {e}")))
        };
        let kind = MessageKind::parse(&self.kind)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown message kind {:?}", self.kind)))?;
        Ok(PersistedMessage {
            envelope: EncryptedEnvelope {
                iv: decode("iv", &self.iv)?,
                ciphertext: decode("ciphertext", &self.ciphertext)?,
                recipient_wrapped_key: decode(
                    "recipient_wrapped_key",
                    &self.recipient_wrapped_key,
                )?,
                sender_wrapped_key: decode("sender_wrapped_key", &self.sender_wrapped_key)?,
            },
            id: self.id,
            client_id: self.client_id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            kind,
            created_at: self.created_at,
        })
    }
}

impl Store {
    /// Open (or create) the SQLite database at `db_path` and run pending
    /// migrations.
    ///
    /// WAL journal mode and foreign-key enforcement are configured at
    /// connection time — SQLite forbids changing `journal_mode` inside a
    /// transaction and sqlx wraps every migration in one.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(opts).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        Ok(Self { pool })
    }

    // ── Messages ─────────────────────────────────────────────────────────────

    /// Persist a message.  Safe to call repeatedly with the same
    /// `client_id`: the insert is ignored on conflict and the first write
    /// is read back, so a retried delivery job never duplicates a row.
    pub async fn save_message(&self, msg: &NewMessage) -> Result<PersistedMessage, StoreError> {
        let inserted = sqlx::query(
            "INSERT INTO messages \
             (id, client_id, sender_id, receiver_id, kind, iv, ciphertext, \
              recipient_wrapped_key, sender_wrapped_key, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(client_id) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&msg.client_id)
        .bind(&msg.sender_id)
        .bind(&msg.receiver_id)
        .bind(msg.kind.as_str())
        .bind(b64::encode(&msg.envelope.iv))
        .bind(b64::encode(&msg.envelope.ciphertext))
        .bind(b64::encode(&msg.envelope.recipient_wrapped_key))
        .bind(b64::encode(&msg.envelope.sender_wrapped_key))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            debug!(client_id = %msg.client_id, "message already persisted, returning stored row");
        }

        let row = sqlx::query_as::<_, MessageRow>("SELECT * FROM messages WHERE client_id = ?")
            .bind(&msg.client_id)
            .fetch_one(&self.pool)
            .await?;
        row.into_message()
    }

    /// Conversation history between two users, oldest first.  Rows stay
    /// encrypted; decryption happens on the clients.
    pub async fn messages_between(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<PersistedMessage>, StoreError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT * FROM messages \
             WHERE (sender_id = ? AND receiver_id = ?) \
                OR (sender_id = ? AND receiver_id = ?) \
             ORDER BY created_at ASC",
        )
        .bind(user_a)
        .bind(user_b)
        .bind(user_b)
        .bind(user_a)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(MessageRow::into_message).collect()
    }

    // ── Wrapped keys ─────────────────────────────────────────────────────────

    /// Store a password-wrapped private key.  At most one per identity;
    /// a second write for the same user is rejected, never overwritten.
    pub async fn save_wrapped_key(
        &self,
        user_id: &str,
        wrapped: &WrappedPrivateKey,
    ) -> Result<(), StoreError> {
        let inserted = sqlx::query(
            "INSERT INTO wrapped_keys (user_id, salt, iv, ciphertext, created_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(b64::encode(&wrapped.salt))
        .bind(b64::encode(&wrapped.iv))
        .bind(b64::encode(&wrapped.ciphertext))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(StoreError::AlreadyExists(user_id.to_string()));
        }
        Ok(())
    }

    pub async fn get_wrapped_key(&self, user_id: &str) -> Result<WrappedPrivateKey, StoreError> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            "SELECT salt, iv, ciphertext FROM wrapped_keys WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let (salt, iv, ciphertext) =
            row.ok_or_else(|| StoreError::NotFound(format!("wrapped key for {user_id}")))?;
        let decode = |field: &str, value: &str| {
            b64::decode(value).map_err(|e| StoreError::Corrupt(format!("{field}: {e}")))
        };
        Ok(WrappedPrivateKey {
            salt: decode("salt", &salt)?,
            iv: decode("iv", &iv)?,
            ciphertext: decode("ciphertext", &ciphertext)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use veil_crypto::keys::{generate_identity, KeyPair};

    fn tmp_db() -> PathBuf {
        PathBuf::from(format!("/tmp/veil-store-test-{}.db", Uuid::new_v4()))
    }

    fn cleanup(db_path: &Path) {
        let _ = std::fs::remove_file(db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    fn sample_message(client_id: &str, sender: &str, receiver: &str) -> NewMessage {
        let s = KeyPair::generate();
        let r = KeyPair::generate();
        NewMessage {
            client_id: client_id.into(),
            sender_id: sender.into(),
            receiver_id: receiver.into(),
            kind: MessageKind::Text,
            envelope: veil_crypto::cipher::encrypt(b"body", &r.public, &s.public).unwrap(),
        }
    }

    #[tokio::test]
    async fn save_message_is_idempotent_on_client_id() {
        let db_path = tmp_db();
        let store = Store::open(&db_path).await.expect("open store");

        let msg = sample_message("c-1", "alice", "bob");
        let first = store.save_message(&msg).await.unwrap();
        let second = store.save_message(&msg).await.unwrap();

        assert_eq!(first.id, second.id, "retry must return the original row");
        assert_eq!(first.envelope, msg.envelope);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);

        cleanup(&db_path);
    }

    #[tokio::test]
    async fn history_covers_both_directions_in_order() {
        let db_path = tmp_db();
        let store = Store::open(&db_path).await.expect("open store");

        store.save_message(&sample_message("c-1", "alice", "bob")).await.unwrap();
        store.save_message(&sample_message("c-2", "bob", "alice")).await.unwrap();
        store.save_message(&sample_message("c-3", "alice", "carol")).await.unwrap();

        let history = store.messages_between("alice", "bob").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].client_id, "c-1");
        assert_eq!(history[1].client_id, "c-2");

        cleanup(&db_path);
    }

    #[tokio::test]
    async fn at_most_one_wrapped_key_per_identity() {
        let db_path = tmp_db();
        let store = Store::open(&db_path).await.expect("open store");

        let identity = generate_identity("pw").unwrap();
        store
            .save_wrapped_key("alice", &identity.wrapped_private)
            .await
            .unwrap();

        let again = generate_identity("pw2").unwrap();
        assert!(matches!(
            store.save_wrapped_key("alice", &again.wrapped_private).await,
            Err(StoreError::AlreadyExists(_))
        ));

        // The original wrap survives untouched.
        let stored = store.get_wrapped_key("alice").await.unwrap();
        assert_eq!(stored, identity.wrapped_private);

        assert!(matches!(
            store.get_wrapped_key("nobody").await,
            Err(StoreError::NotFound(_))
        ));

        cleanup(&db_path);
    }
}
