// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # PIN Lifecycle
//!
//! The custodian owns the PIN itself; this module only starts the change
//! and restore ceremonies and tracks whether a PIN has ever been
//! established on this device. The flag flips when a challenge of a
//! PIN-setting type reports `IN_PROGRESS` or `COMPLETE`.

use std::slice;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::challenge::{ChallengeError, ChallengeExecutor};
use crate::credentials::{self, CredentialStore};
use crate::gateway::{CustodianApi, GatewayError};
use crate::models::{Challenge, ChallengeOutcome};
use crate::session::{AuthError, SessionManager};

#[derive(Debug, thiserror::Error)]
pub enum PinError {
    #[error("custodian rejected the PIN operation (code {0})")]
    Rejected(i64),

    #[error("custodian unreachable: {0}")]
    Unreachable(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Challenge(#[from] ChallengeError),
}

fn map_gateway_error(e: GatewayError) -> PinError {
    match e {
        GatewayError::Domain { code, .. } => PinError::Rejected(code),
        other => PinError::Unreachable(other.to_string()),
    }
}

/// Starts PIN change and restore ceremonies against the custodian.
#[derive(Clone)]
pub struct PinOrchestrator {
    gateway: Arc<dyn CustodianApi>,
    sessions: SessionManager,
    executor: Arc<dyn ChallengeExecutor>,
    credentials: Arc<dyn CredentialStore>,
}

impl PinOrchestrator {
    pub fn new(
        gateway: Arc<dyn CustodianApi>,
        sessions: SessionManager,
        executor: Arc<dyn ChallengeExecutor>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            gateway,
            sessions,
            executor,
            credentials,
        }
    }

    /// Whether a PIN-establishing challenge has ever completed here.
    pub async fn pin_is_set(&self) -> bool {
        credentials::pin_is_set(self.credentials.as_ref()).await
    }

    /// Request a PIN change and run the resulting challenge.
    pub async fn change_pin(&self) -> Result<ChallengeOutcome, PinError> {
        let session = self.sessions.require().await?;

        let idempotency_key = Uuid::new_v4().to_string();
        info!(idempotency_key = %idempotency_key, "Requesting PIN change");

        let first = self
            .gateway
            .change_pin(&session.user_token, &idempotency_key)
            .await;
        let challenge = match first {
            Ok(challenge) => challenge,
            Err(e) if e.is_expired_credential() => {
                let session = self.sessions.refresh(&session.user_id).await?;
                let retry_key = Uuid::new_v4().to_string();
                info!(
                    idempotency_key = %retry_key,
                    "Re-requesting PIN change after session refresh"
                );
                self.gateway
                    .change_pin(&session.user_token, &retry_key)
                    .await
                    .map_err(map_gateway_error)?
            }
            Err(e) => return Err(map_gateway_error(e)),
        };

        self.finish(challenge).await
    }

    /// Start the PIN restore ceremony for a user who forgot theirs.
    pub async fn restore_pin(&self) -> Result<ChallengeOutcome, PinError> {
        let session = self.sessions.require().await?;
        info!("Requesting PIN restore");

        let first = self.gateway.restore_pin(&session.user_token).await;
        let challenge = match first {
            Ok(challenge) => challenge,
            Err(e) if e.is_expired_credential() => {
                let session = self.sessions.refresh(&session.user_id).await?;
                self.gateway
                    .restore_pin(&session.user_token)
                    .await
                    .map_err(map_gateway_error)?
            }
            Err(e) => return Err(map_gateway_error(e)),
        };

        self.finish(challenge).await
    }

    async fn finish(&self, challenge: Challenge) -> Result<ChallengeOutcome, PinError> {
        let session = self.sessions.require().await?;
        let outcome = self
            .executor
            .execute(&session, slice::from_ref(&challenge.challenge_id))
            .await?;
        if outcome.sets_pin() {
            credentials::mark_pin_set(self.credentials.as_ref()).await;
        }
        Ok(outcome)
    }
}
