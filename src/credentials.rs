// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential persistence seam.
//!
//! The session manager and orchestrators persist the session triple and the
//! PIN flag through this trait. Hosts plug in platform storage (keychain,
//! encrypted prefs); [`InMemoryCredentialStore`] covers tests and hosts
//! without persistence. Storage mechanics stay behind the trait.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

/// Well-known credential names.
pub mod keys {
    /// Custodian user id the rest of the triple belongs to.
    pub const USER_ID: &str = "custodian_user_id";
    /// Short-lived user token.
    pub const USER_TOKEN: &str = "custodian_user_token";
    /// Encryption key issued alongside the token.
    pub const ENCRYPTION_KEY: &str = "custodian_encryption_key";
    /// "true" once a PIN-establishing challenge succeeded.
    pub const PIN_SET: &str = "custodian_pin_set";
}

/// Async key-value store for credential material, keyed by logical name.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str);
    async fn remove(&self, key: &str);
}

/// Process-local credential store.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.values.lock().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
    }

    async fn remove(&self, key: &str) {
        self.values.lock().await.remove(key);
    }
}

/// Record that the user has a PIN on file.
pub async fn mark_pin_set(store: &dyn CredentialStore) {
    store.set(keys::PIN_SET, "true").await;
}

/// Whether a PIN-establishing challenge has ever succeeded for this install.
pub async fn pin_is_set(store: &dyn CredentialStore) -> bool {
    matches!(store.get(keys::PIN_SET).await.as_deref(), Some("true"))
}
