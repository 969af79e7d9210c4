// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Custodian Data Models
//!
//! Wire and domain types exchanged with the custodian platform. All wire
//! types derive `Serialize`/`Deserialize` with camelCase field renames to
//! match the custodian's JSON surface.
//!
//! ## Model Categories
//!
//! - **Sessions**: the authenticated (user id, user token, encryption key) triple
//! - **Challenges**: out-of-band user verification handles and outcomes
//! - **Wallets**: wallet records with per-token balances
//! - **Fees**: transfer fee estimates and the advisory fee tier
//!
//! Monetary amounts and fee figures are decimal strings end to end; they are
//! never parsed into floating point.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Session Models
// =============================================================================

/// An authenticated custodian session.
///
/// All three fields are issued together by the token endpoint and are only
/// ever replaced together. A session with any field missing is invalid and
/// is never constructed.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// The custodian user this session belongs to.
    pub user_id: String,
    /// Short-lived bearer token for user-scoped calls.
    pub user_token: String,
    /// Key material the challenge executor needs alongside the token.
    pub encryption_key: String,
}

// The token and encryption key must never reach logs.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("user_token", &"<redacted>")
            .field("encryption_key", &"<redacted>")
            .finish()
    }
}

/// Token material returned by the custodian's token endpoint.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCredentials {
    pub user_token: String,
    pub encryption_key: String,
}

impl std::fmt::Debug for IssuedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedCredentials")
            .field("user_token", &"<redacted>")
            .field("encryption_key", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Challenge Models
// =============================================================================

/// Handle for a pending out-of-band challenge, consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub challenge_id: String,
}

/// What kind of action a challenge verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeType {
    Initialize,
    SetPin,
    ChangePin,
    RestorePin,
    SetSecurityQuestions,
    CreateTransaction,
    /// Challenge types introduced upstream after this build.
    #[serde(other)]
    Unknown,
}

/// Terminal (or last observed) state of a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeStatus {
    Pending,
    InProgress,
    Complete,
    Failed,
    Expired,
    #[serde(other)]
    Unknown,
}

/// Result reported by the challenge executor for one challenge run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeOutcome {
    pub result_type: ChallengeType,
    pub status: ChallengeStatus,
}

impl ChallengeOutcome {
    /// True when the user came out of this challenge with a PIN on file:
    /// a PIN-establishing challenge type that at least entered progress.
    pub fn sets_pin(&self) -> bool {
        matches!(
            self.result_type,
            ChallengeType::SetPin | ChallengeType::ChangePin | ChallengeType::RestorePin
        ) && matches!(
            self.status,
            ChallengeStatus::InProgress | ChallengeStatus::Complete
        )
    }
}

// =============================================================================
// Wallet Models
// =============================================================================

/// A custodian-hosted wallet.
///
/// `balances` is not part of the wallet listing payload; the poller attaches
/// it afterwards. A wallet with zero balances is a valid terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    /// Custodian-assigned wallet id.
    pub id: String,
    /// Provisioning state (e.g. "LIVE").
    pub state: String,
    /// Wallet set this wallet belongs to, when the account type has one.
    #[serde(default)]
    pub wallet_set_id: Option<String>,
    /// Custody model (e.g. "ENDUSER").
    pub custody_type: String,
    /// Owning custodian user.
    pub user_id: String,
    /// On-chain address.
    pub address: String,
    /// Chain identifier (e.g. "MATIC-MUMBAI").
    pub blockchain: String,
    /// Account abstraction flavor (e.g. "SCA").
    pub account_type: String,
    pub create_date: DateTime<Utc>,
    pub update_date: DateTime<Utc>,
    /// Per-token balances, attached after listing.
    #[serde(default)]
    pub balances: Vec<Balance>,
}

/// One token position inside a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub token: Token,
    /// Decimal string, never parsed to floating point.
    pub amount: String,
    pub update_date: DateTime<Utc>,
}

/// Token metadata as reported by the custodian.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: String,
    pub blockchain: String,
    /// Contract address; absent for native assets.
    #[serde(default)]
    pub token_address: Option<String>,
    /// Token standard (e.g. "ERC20"); absent for native assets.
    #[serde(default)]
    pub standard: Option<String>,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub is_native: bool,
    pub update_date: DateTime<Utc>,
    pub create_date: DateTime<Utc>,
}

// =============================================================================
// Fee Models
// =============================================================================

/// Fee estimate for a prospective transfer, one level per tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFeeEstimate {
    pub low: FeeLevel,
    pub medium: FeeLevel,
    pub high: FeeLevel,
}

impl TransferFeeEstimate {
    /// The level matching an advisory tier.
    pub fn tier(&self, tier: FeeTier) -> &FeeLevel {
        match tier {
            FeeTier::Low => &self.low,
            FeeTier::Medium => &self.medium,
            FeeTier::High => &self.high,
        }
    }
}

/// Gas parameters for one fee tier. All figures are decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeLevel {
    pub gas_limit: String,
    pub base_fee: String,
    pub priority_fee: String,
    pub max_fee: String,
}

/// Advisory fee tier relayed verbatim on transfer submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeTier {
    Low,
    Medium,
    High,
}

impl FeeTier {
    /// Wire spelling of the tier.
    pub fn as_str(self) -> &'static str {
        match self {
            FeeTier::Low => "LOW",
            FeeTier::Medium => "MEDIUM",
            FeeTier::High => "HIGH",
        }
    }
}
