// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Challenge executor seam.
//!
//! Sensitive custodian actions (initialize, PIN changes, transfers) come back
//! as challenge ids that a user-facing device component must resolve out of
//! band. The orchestrators hand the ids to this trait and treat the call as
//! one opaque suspension point: a single terminal outcome or error, never
//! re-invoked automatically.

use async_trait::async_trait;

use crate::models::{ChallengeOutcome, Session};

#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    #[error("challenge execution failed: {0}")]
    Failed(String),

    #[error("challenge execution was cancelled by the user")]
    Cancelled,
}

/// Resolves pending challenges with the user.
///
/// `challenge_ids` keeps upstream order; the executor consumes each id at
/// most once and reports the run's terminal outcome.
#[async_trait]
pub trait ChallengeExecutor: Send + Sync {
    async fn execute(
        &self,
        session: &Session,
        challenge_ids: &[String],
    ) -> Result<ChallengeOutcome, ChallengeError>;
}
