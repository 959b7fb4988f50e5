//! Local secure key store: the session's own decrypted private key
//! material, in memory only.
//!
//! The recovered private key is needed for every decrypt in a session, but
//! must not outlive it.  Entries are zeroized when replaced, when cleared
//! (logout), and on drop.  Nothing here ever touches disk — the durable
//! copy of a private key is only ever the password-wrapped blob in `db`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use zeroize::Zeroizing;

/// Thread-safe handle.  Clone to share across tasks.
#[derive(Clone, Default)]
pub struct LocalKeyStore {
    inner: Arc<RwLock<HashMap<String, Zeroizing<Vec<u8>>>>>,
}

impl LocalKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store key material under a fixed logical name, replacing (and
    /// zeroizing) any previous value.
    pub async fn save(&self, name: &str, material: Vec<u8>) {
        self.inner
            .write()
            .await
            .insert(name.to_string(), Zeroizing::new(material));
    }

    /// Load key material by name, or `None` if absent.
    pub async fn load(&self, name: &str) -> Option<Zeroizing<Vec<u8>>> {
        self.inner.read().await.get(name).cloned()
    }

    /// Drop all entries (logout).  Each value is zeroized.
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }
}
