// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Onboarding Orchestrator
//!
//! Turns "create me a wallet" into the custodian's strict call sequence:
//!
//! 1. generate a fresh user id;
//! 2. `create_user`;
//! 3. `issue_token`;
//! 4. `initialize_account` (configured account type + blockchains, fresh
//!    idempotency key);
//! 5. install and persist the session;
//! 6. hand the setup challenge to the executor.
//!
//! Every step short-circuits on failure with a step-specific error and no
//! automatic retry; the session is persisted before the executor runs so a
//! crash mid-challenge still leaves a resumable session behind.

use std::slice;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::challenge::{ChallengeError, ChallengeExecutor};
use crate::config::WalletConfig;
use crate::credentials::{self, CredentialStore};
use crate::gateway::{CustodianApi, GatewayError};
use crate::models::{ChallengeOutcome, Session};
use crate::session::SessionManager;

#[derive(Debug, thiserror::Error)]
pub enum OnboardError {
    #[error("custodian refused to create the user (code {0})")]
    UserCreationFailed(i64),

    #[error("custodian refused to issue a session token (code {0})")]
    TokenIssuanceFailed(i64),

    #[error("custodian refused to initialize the account (code {0})")]
    InitializationFailed(i64),

    #[error("custodian unreachable during onboarding: {0}")]
    Unreachable(String),

    #[error(transparent)]
    Challenge(#[from] ChallengeError),
}

/// Runs the account creation sequence end to end.
#[derive(Clone)]
pub struct OnboardingOrchestrator {
    gateway: Arc<dyn CustodianApi>,
    sessions: SessionManager,
    executor: Arc<dyn ChallengeExecutor>,
    credentials: Arc<dyn CredentialStore>,
    config: WalletConfig,
}

impl OnboardingOrchestrator {
    pub fn new(
        gateway: Arc<dyn CustodianApi>,
        sessions: SessionManager,
        executor: Arc<dyn ChallengeExecutor>,
        credentials: Arc<dyn CredentialStore>,
        config: WalletConfig,
    ) -> Self {
        Self {
            gateway,
            sessions,
            executor,
            credentials,
            config,
        }
    }

    /// Create a custodian user, initialize its account, and run the setup
    /// challenge. The challenge outcome is the caller's result; a PIN-
    /// establishing outcome also records the PIN flag.
    pub async fn create_and_initialize(&self) -> Result<ChallengeOutcome, OnboardError> {
        let user_id = Uuid::new_v4().to_string();
        info!(user_id = %user_id, "Creating custodian user");

        self.gateway
            .create_user(&user_id)
            .await
            .map_err(|e| match e {
                GatewayError::Domain { code, .. } => OnboardError::UserCreationFailed(code),
                other => OnboardError::Unreachable(other.to_string()),
            })?;

        let issued = self
            .gateway
            .issue_token(&user_id)
            .await
            .map_err(|e| match e {
                GatewayError::Domain { code, .. } => OnboardError::TokenIssuanceFailed(code),
                other => OnboardError::Unreachable(other.to_string()),
            })?;

        let idempotency_key = Uuid::new_v4().to_string();
        let challenge = self
            .gateway
            .initialize_account(
                &issued.user_token,
                &idempotency_key,
                &self.config.account_type,
                &self.config.blockchains,
            )
            .await
            .map_err(|e| match e {
                GatewayError::Domain { code, .. } => OnboardError::InitializationFailed(code),
                other => OnboardError::Unreachable(other.to_string()),
            })?;

        let session = Session {
            user_id: user_id.clone(),
            user_token: issued.user_token,
            encryption_key: issued.encryption_key,
        };
        self.sessions.install(session.clone()).await;
        info!(
            user_id = %user_id,
            challenge_id = %challenge.challenge_id,
            "Account initialization accepted, session installed"
        );

        let outcome = self
            .executor
            .execute(&session, slice::from_ref(&challenge.challenge_id))
            .await?;

        if outcome.sets_pin() {
            credentials::mark_pin_set(self.credentials.as_ref()).await;
        }

        info!(
            user_id = %user_id,
            result_type = ?outcome.result_type,
            status = ?outcome.status,
            "Onboarding challenge finished"
        );
        Ok(outcome)
    }
}
