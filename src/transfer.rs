// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transfer Orchestrator
//!
//! Fee estimation and address validation are independent reads; submission
//! is the estimate → submit → challenge pipeline. Every gateway call here
//! applies the single expired-token recovery: refresh the session, retry
//! once, and treat a second expiry as final.
//!
//! Idempotency keys are generated per attempt and logged on every
//! submission, so duplicate submissions caused by a crash between attempts
//! stay traceable upstream.

use std::slice;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::challenge::{ChallengeError, ChallengeExecutor};
use crate::gateway::{CustodianApi, FeeEstimateRequest, GatewayError, TransferSubmission};
use crate::models::{ChallengeOutcome, FeeTier, TransferFeeEstimate};
use crate::session::{AuthError, SessionManager};

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("custodian rejected the transaction (code {0})")]
    Rejected(i64),

    #[error("custodian unreachable: {0}")]
    Unreachable(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Challenge(#[from] ChallengeError),
}

fn map_gateway_error(e: GatewayError) -> TransferError {
    match e {
        GatewayError::Domain { code, .. } => TransferError::Rejected(code),
        other => TransferError::Unreachable(other.to_string()),
    }
}

/// Drives fee estimation, address validation, and transfer submission.
#[derive(Clone)]
pub struct TransferOrchestrator {
    gateway: Arc<dyn CustodianApi>,
    sessions: SessionManager,
    executor: Arc<dyn ChallengeExecutor>,
}

impl TransferOrchestrator {
    pub fn new(
        gateway: Arc<dyn CustodianApi>,
        sessions: SessionManager,
        executor: Arc<dyn ChallengeExecutor>,
    ) -> Self {
        Self {
            gateway,
            sessions,
            executor,
        }
    }

    /// Estimate network fees for a prospective transfer.
    pub async fn estimate_fee(
        &self,
        amounts: &[String],
        destination_address: &str,
        token_id: &str,
        wallet_id: &str,
    ) -> Result<TransferFeeEstimate, TransferError> {
        let session = self.sessions.require().await?;
        let result = self
            .gateway
            .estimate_fee(
                &session.user_token,
                FeeEstimateRequest {
                    amounts,
                    destination_address,
                    token_id,
                    wallet_id,
                },
            )
            .await;
        match result {
            Ok(estimate) => Ok(estimate),
            Err(e) if e.is_expired_credential() => {
                let session = self.sessions.refresh(&session.user_id).await?;
                self.gateway
                    .estimate_fee(
                        &session.user_token,
                        FeeEstimateRequest {
                            amounts,
                            destination_address,
                            token_id,
                            wallet_id,
                        },
                    )
                    .await
                    .map_err(map_gateway_error)
            }
            Err(e) => Err(map_gateway_error(e)),
        }
    }

    /// Ask the custodian whether `address` is valid on `blockchain`.
    pub async fn validate_address(
        &self,
        blockchain: &str,
        address: &str,
    ) -> Result<bool, TransferError> {
        let session = self.sessions.require().await?;
        match self
            .gateway
            .validate_address(&session.user_token, blockchain, address)
            .await
        {
            Ok(valid) => Ok(valid),
            Err(e) if e.is_expired_credential() => {
                let session = self.sessions.refresh(&session.user_id).await?;
                self.gateway
                    .validate_address(&session.user_token, blockchain, address)
                    .await
                    .map_err(map_gateway_error)
            }
            Err(e) => Err(map_gateway_error(e)),
        }
    }

    /// Submit a transfer and run its approval challenge.
    ///
    /// The fee tier is advisory metadata relayed verbatim; amounts stay
    /// decimal strings.
    pub async fn transfer(
        &self,
        amounts: &[String],
        destination_address: &str,
        token_id: &str,
        wallet_id: &str,
        fee_tier: FeeTier,
    ) -> Result<ChallengeOutcome, TransferError> {
        let session = self.sessions.require().await?;

        let idempotency_key = Uuid::new_v4().to_string();
        info!(
            wallet_id = %wallet_id,
            token_id = %token_id,
            fee_tier = %fee_tier.as_str(),
            idempotency_key = %idempotency_key,
            "Submitting transfer"
        );

        let first = self
            .gateway
            .submit_transfer(
                &session.user_token,
                TransferSubmission {
                    user_id: &session.user_id,
                    idempotency_key: &idempotency_key,
                    amounts,
                    destination_address,
                    token_id,
                    wallet_id,
                    fee_tier,
                },
            )
            .await;

        let challenge = match first {
            Ok(challenge) => challenge,
            Err(e) if e.is_expired_credential() => {
                let session = self.sessions.refresh(&session.user_id).await?;
                // Keys are per attempt; the resubmission gets its own.
                let retry_key = Uuid::new_v4().to_string();
                info!(
                    wallet_id = %wallet_id,
                    idempotency_key = %retry_key,
                    "Resubmitting transfer after session refresh"
                );
                self.gateway
                    .submit_transfer(
                        &session.user_token,
                        TransferSubmission {
                            user_id: &session.user_id,
                            idempotency_key: &retry_key,
                            amounts,
                            destination_address,
                            token_id,
                            wallet_id,
                            fee_tier,
                        },
                    )
                    .await
                    .map_err(map_gateway_error)?
            }
            Err(e) => return Err(map_gateway_error(e)),
        };

        let session = self.sessions.require().await?;
        let outcome = self
            .executor
            .execute(&session, slice::from_ref(&challenge.challenge_id))
            .await?;
        Ok(outcome)
    }
}
