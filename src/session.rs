// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session lifecycle management.
//!
//! ## Invariants
//!
//! - Readers always observe a complete (user id, token, encryption key)
//!   triple or nothing; the triple is replaced and persisted under one
//!   write guard.
//! - Refreshes are serialized through a dedicated gate. A caller that
//!   queued behind a refresh adopts the token it produced instead of
//!   issuing another one, so a burst of expiries costs one issuance.
//!
//! ## Usage
//!
//! Construct one `SessionManager` per custodian user context and share it
//! (it is cheap to clone) across the onboarding, polling, transfer, and PIN
//! orchestrators. Call `restore()` once at process start to pick up a
//! persisted session.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::credentials::{keys, CredentialStore};
use crate::gateway::{CustodianApi, GatewayError};
use crate::models::Session;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no custodian session is active")]
    NoSession,

    #[error("custodian refused to issue a session token (code {0})")]
    IssuanceFailed(i64),

    #[error("custodian token endpoint unreachable: {0}")]
    Unreachable(String),
}

/// Owns the active session and its persistence.
#[derive(Clone)]
pub struct SessionManager {
    gateway: Arc<dyn CustodianApi>,
    credentials: Arc<dyn CredentialStore>,
    /// Active session; `None` until onboarding, restore, or refresh.
    session: Arc<RwLock<Option<Session>>>,
    /// Serializes refreshes so concurrent expiries coalesce.
    refresh_gate: Arc<Mutex<()>>,
}

impl SessionManager {
    pub fn new(gateway: Arc<dyn CustodianApi>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            gateway,
            credentials,
            session: Arc::new(RwLock::new(None)),
            refresh_gate: Arc::new(Mutex::new(())),
        }
    }

    /// The active session, if any.
    pub async fn current(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// The active session, or `AuthError::NoSession`.
    pub async fn require(&self) -> Result<Session, AuthError> {
        self.current().await.ok_or(AuthError::NoSession)
    }

    /// Replace the active session and persist all three fields.
    ///
    /// Runs entirely under the write guard: no reader sees the new triple
    /// before it is persisted, and none sees it half-written.
    pub async fn install(&self, session: Session) {
        let mut guard = self.session.write().await;
        self.credentials.set(keys::USER_ID, &session.user_id).await;
        self.credentials
            .set(keys::USER_TOKEN, &session.user_token)
            .await;
        self.credentials
            .set(keys::ENCRYPTION_KEY, &session.encryption_key)
            .await;
        *guard = Some(session);
    }

    /// Load a persisted session at process start.
    ///
    /// All three fields must be present; a partial record is discarded and
    /// the caller should run onboarding or a refresh instead.
    pub async fn restore(&self) -> Option<Session> {
        let user_id = self.credentials.get(keys::USER_ID).await;
        let user_token = self.credentials.get(keys::USER_TOKEN).await;
        let encryption_key = self.credentials.get(keys::ENCRYPTION_KEY).await;

        let (Some(user_id), Some(user_token), Some(encryption_key)) =
            (user_id, user_token, encryption_key)
        else {
            return None;
        };

        let session = Session {
            user_id,
            user_token,
            encryption_key,
        };
        info!(user_id = %session.user_id, "Restored custodian session from credential store");
        *self.session.write().await = Some(session.clone());
        Some(session)
    }

    /// Drop the active session and clear every persisted credential,
    /// including the PIN flag.
    pub async fn sign_out(&self) {
        let mut guard = self.session.write().await;
        self.credentials.remove(keys::USER_TOKEN).await;
        self.credentials.remove(keys::ENCRYPTION_KEY).await;
        self.credentials.remove(keys::USER_ID).await;
        self.credentials.remove(keys::PIN_SET).await;
        *guard = None;
    }

    /// Issue a fresh token for `user_id` and install the resulting session.
    ///
    /// Callers land here after observing an expired-credential error; the
    /// orchestrators retry their operation at most once afterwards.
    pub async fn refresh(&self, user_id: &str) -> Result<Session, AuthError> {
        let stale_token = {
            let session = self.session.read().await;
            session
                .as_ref()
                .filter(|s| s.user_id == user_id)
                .map(|s| s.user_token.clone())
        };

        let _gate = self.refresh_gate.lock().await;

        // A refresh that completed while this caller queued already replaced
        // the token; adopt it instead of issuing again.
        {
            let session = self.session.read().await;
            if let Some(current) = session.as_ref() {
                if current.user_id == user_id && Some(&current.user_token) != stale_token.as_ref()
                {
                    return Ok(current.clone());
                }
            }
        }

        info!(user_id = %user_id, "Refreshing custodian session token");
        let issued = self
            .gateway
            .issue_token(user_id)
            .await
            .map_err(|e| match e {
                GatewayError::Domain { code, .. } => AuthError::IssuanceFailed(code),
                other => AuthError::Unreachable(other.to_string()),
            })?;

        let session = Session {
            user_id: user_id.to_string(),
            user_token: issued.user_token,
            encryption_key: issued.encryption_key,
        };
        self.install(session.clone()).await;
        Ok(session)
    }

    /// Refresh using the user id from memory, falling back to the
    /// credential store.
    pub async fn refresh_current(&self) -> Result<Session, AuthError> {
        let user_id = match self.current().await {
            Some(session) => session.user_id,
            None => self
                .credentials
                .get(keys::USER_ID)
                .await
                .ok_or(AuthError::NoSession)?,
        };
        self.refresh(&user_id).await
    }
}
