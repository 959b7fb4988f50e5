//! End-to-end pipeline: register identities, encrypt, deliver through the
//! queue into a real SQLite store, receive the realtime push, and decrypt
//! on both ends.  The store only ever holds ciphertext.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use veil_crypto::keys::{generate_identity, recover_private_key, NewIdentity};
use veil_proto::{MessageKind, ServerEvent};
use veil_relay::{DeliveryConfig, DeliveryQueue, PushBridge};
use veil_store::Store;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn tmp_db() -> PathBuf {
    PathBuf::from(format!("/tmp/veil-relay-test-{}.db", Uuid::new_v4()))
}

fn cleanup(db_path: &Path) {
    let _ = std::fs::remove_file(db_path);
    let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
    let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
}

async fn register(store: &Store, user_id: &str, password: &str) -> NewIdentity {
    let identity = generate_identity(password).expect("generate identity");
    store
        .save_wrapped_key(user_id, &identity.wrapped_private)
        .await
        .expect("store wrapped key");
    identity
}

#[tokio::test]
async fn message_flows_end_to_end() {
    init_tracing();
    let db_path = tmp_db();
    let store = Arc::new(Store::open(&db_path).await.expect("open store"));

    let config = DeliveryConfig::default();
    let push = PushBridge::new(config.push_buffer);
    let queue = DeliveryQueue::new(store.clone(), push.clone(), config);
    queue.start().await;

    let alice = register(&store, "alice", "correct horse").await;
    let bob = register(&store, "bob", "battery staple").await;

    // Bob is online and subscribed before Alice sends.
    let mut bob_events = push.subscribe("bob").await;

    let envelope = veil_crypto::cipher::encrypt(
        b"meet at the usual place",
        &bob.keypair.public,
        &alice.keypair.public,
    )
    .expect("encrypt");

    let handle = queue
        .submit("alice", "bob", MessageKind::Text, envelope)
        .await
        .expect("submit");
    let delivered = queue
        .await_completion(&handle, Some(Duration::from_secs(5)))
        .await
        .expect("delivery");

    assert_eq!(delivered.sender_id, "alice");
    assert_eq!(delivered.receiver_id, "bob");

    // The push payload is the persisted row, still encrypted.
    let ServerEvent::NewMessage(pushed) = tokio::time::timeout(
        Duration::from_secs(5),
        bob_events.events.recv(),
    )
    .await
    .expect("push within budget")
    .expect("channel open");
    assert_eq!(pushed.id, delivered.id);
    assert_ne!(pushed.envelope.ciphertext, b"meet at the usual place");

    // Bob recovers his private key from the stored wrap and decrypts.
    let bob_wrapped = store.get_wrapped_key("bob").await.expect("bob's wrap");
    let bob_private =
        recover_private_key(&bob_wrapped, "battery staple").expect("recover with password");
    let plaintext =
        veil_crypto::cipher::decrypt(&pushed.envelope, &bob_private, false).expect("decrypt");
    assert_eq!(plaintext, b"meet at the usual place");

    // Alice re-reads her own sent message from history via the sender copy.
    let history = store
        .messages_between("alice", "bob")
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
    let alice_read =
        veil_crypto::cipher::decrypt(&history[0].envelope, &alice.keypair.private, true)
            .expect("sender decrypt");
    assert_eq!(alice_read, b"meet at the usual place");

    queue.close().await;
    cleanup(&db_path);
}

#[tokio::test]
async fn offline_recipient_catches_up_from_history() {
    init_tracing();
    let db_path = tmp_db();
    let store = Arc::new(Store::open(&db_path).await.expect("open store"));

    let config = DeliveryConfig::default();
    let push = PushBridge::new(config.push_buffer);
    let queue = DeliveryQueue::new(store.clone(), push.clone(), config);
    queue.start().await;

    let alice = register(&store, "alice", "pw-a").await;
    let bob = register(&store, "bob", "pw-b").await;

    // Nobody subscribed: delivery must still complete.
    let envelope = veil_crypto::cipher::encrypt(
        b"you missed this live",
        &bob.keypair.public,
        &alice.keypair.public,
    )
    .expect("encrypt");
    let handle = queue
        .submit("alice", "bob", MessageKind::Text, envelope)
        .await
        .expect("submit");
    queue
        .await_completion(&handle, Some(Duration::from_secs(5)))
        .await
        .expect("delivery without subscriber");

    // Bob connects later and reads the mailbox.
    let history = store
        .messages_between("bob", "alice")
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
    let plaintext =
        veil_crypto::cipher::decrypt(&history[0].envelope, &bob.keypair.private, false)
            .expect("decrypt");
    assert_eq!(plaintext, b"you missed this live");

    queue.close().await;
    cleanup(&db_path);
}
