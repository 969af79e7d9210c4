// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared test doubles and fixtures.
//!
//! `MockGateway` plays back scripted custodian responses: tests enqueue one
//! `Result` per expected call and the mock pops them in order, panicking on
//! a call it has no script for. Arguments are recorded so tests can assert
//! exactly what would have gone over the wire.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::challenge::{ChallengeError, ChallengeExecutor};
use crate::credentials::{keys, CredentialStore};
use crate::gateway::{CustodianApi, FeeEstimateRequest, GatewayError, TransferSubmission};
use crate::models::{
    Balance, Challenge, ChallengeOutcome, ChallengeStatus, ChallengeType, FeeLevel, FeeTier,
    IssuedCredentials, Session, Token, TransferFeeEstimate, Wallet,
};

fn pop<T>(queue: &Mutex<VecDeque<Result<T, GatewayError>>>, op: &str) -> Result<T, GatewayError> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| panic!("unexpected {op} call: no scripted response left"))
}

#[derive(Debug, Clone)]
pub struct RecordedInitialize {
    pub user_token: String,
    pub idempotency_key: String,
    pub account_type: String,
    pub blockchains: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RecordedEstimate {
    pub user_token: String,
    pub amounts: Vec<String>,
    pub destination_address: String,
    pub token_id: String,
    pub wallet_id: String,
}

#[derive(Debug, Clone)]
pub struct RecordedTransfer {
    pub user_token: String,
    pub user_id: String,
    pub idempotency_key: String,
    pub amounts: Vec<String>,
    pub destination_address: String,
    pub token_id: String,
    pub wallet_id: String,
    pub fee_tier: FeeTier,
}

#[derive(Debug, Clone)]
pub struct RecordedPinChange {
    pub user_token: String,
    pub idempotency_key: String,
}

/// Scripted `CustodianApi` double.
#[derive(Default)]
pub struct MockGateway {
    create_user_responses: Mutex<VecDeque<Result<(), GatewayError>>>,
    created_users: Mutex<Vec<String>>,
    issue_token_responses: Mutex<VecDeque<Result<IssuedCredentials, GatewayError>>>,
    issued_for: Mutex<Vec<String>>,
    issue_token_delay: Mutex<Option<Duration>>,
    initialize_responses: Mutex<VecDeque<Result<Challenge, GatewayError>>>,
    initializations: Mutex<Vec<RecordedInitialize>>,
    list_wallets_responses: Mutex<VecDeque<Result<Vec<Wallet>, GatewayError>>>,
    listed_with: Mutex<Vec<String>>,
    list_balances_responses: Mutex<VecDeque<Result<Vec<Balance>, GatewayError>>>,
    balance_requests: Mutex<Vec<(String, String)>>,
    estimate_fee_responses: Mutex<VecDeque<Result<TransferFeeEstimate, GatewayError>>>,
    estimates: Mutex<Vec<RecordedEstimate>>,
    validate_address_responses: Mutex<VecDeque<Result<bool, GatewayError>>>,
    submit_transfer_responses: Mutex<VecDeque<Result<Challenge, GatewayError>>>,
    transfers: Mutex<Vec<RecordedTransfer>>,
    change_pin_responses: Mutex<VecDeque<Result<Challenge, GatewayError>>>,
    pin_changes: Mutex<Vec<RecordedPinChange>>,
    restore_pin_responses: Mutex<VecDeque<Result<Challenge, GatewayError>>>,
    pin_restores: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_create_user(&self, response: Result<(), GatewayError>) {
        self.create_user_responses.lock().unwrap().push_back(response);
    }

    pub fn enqueue_issue_token(&self, response: Result<IssuedCredentials, GatewayError>) {
        self.issue_token_responses.lock().unwrap().push_back(response);
    }

    /// Make every `issue_token` call take this long, so tests can overlap
    /// concurrent refreshes under a paused clock.
    pub fn set_issue_token_delay(&self, delay: Duration) {
        *self.issue_token_delay.lock().unwrap() = Some(delay);
    }

    pub fn enqueue_initialize(&self, response: Result<Challenge, GatewayError>) {
        self.initialize_responses.lock().unwrap().push_back(response);
    }

    pub fn enqueue_list_wallets(&self, response: Result<Vec<Wallet>, GatewayError>) {
        self.list_wallets_responses.lock().unwrap().push_back(response);
    }

    pub fn enqueue_list_balances(&self, response: Result<Vec<Balance>, GatewayError>) {
        self.list_balances_responses.lock().unwrap().push_back(response);
    }

    pub fn enqueue_estimate_fee(&self, response: Result<TransferFeeEstimate, GatewayError>) {
        self.estimate_fee_responses.lock().unwrap().push_back(response);
    }

    pub fn enqueue_validate_address(&self, response: Result<bool, GatewayError>) {
        self.validate_address_responses.lock().unwrap().push_back(response);
    }

    pub fn enqueue_submit_transfer(&self, response: Result<Challenge, GatewayError>) {
        self.submit_transfer_responses.lock().unwrap().push_back(response);
    }

    pub fn enqueue_change_pin(&self, response: Result<Challenge, GatewayError>) {
        self.change_pin_responses.lock().unwrap().push_back(response);
    }

    pub fn enqueue_restore_pin(&self, response: Result<Challenge, GatewayError>) {
        self.restore_pin_responses.lock().unwrap().push_back(response);
    }

    pub fn created_users(&self) -> Vec<String> {
        self.created_users.lock().unwrap().clone()
    }

    pub fn issue_token_calls(&self) -> usize {
        self.issued_for.lock().unwrap().len()
    }

    pub fn issued_for(&self) -> Vec<String> {
        self.issued_for.lock().unwrap().clone()
    }

    pub fn recorded_initializations(&self) -> Vec<RecordedInitialize> {
        self.initializations.lock().unwrap().clone()
    }

    pub fn list_wallet_calls(&self) -> usize {
        self.listed_with.lock().unwrap().len()
    }

    pub fn listed_with(&self) -> Vec<String> {
        self.listed_with.lock().unwrap().clone()
    }

    pub fn balance_requests(&self) -> Vec<(String, String)> {
        self.balance_requests.lock().unwrap().clone()
    }

    pub fn recorded_estimates(&self) -> Vec<RecordedEstimate> {
        self.estimates.lock().unwrap().clone()
    }

    pub fn recorded_transfers(&self) -> Vec<RecordedTransfer> {
        self.transfers.lock().unwrap().clone()
    }

    pub fn recorded_pin_changes(&self) -> Vec<RecordedPinChange> {
        self.pin_changes.lock().unwrap().clone()
    }

    pub fn recorded_pin_restores(&self) -> Vec<String> {
        self.pin_restores.lock().unwrap().clone()
    }
}

#[async_trait]
impl CustodianApi for MockGateway {
    async fn create_user(&self, user_id: &str) -> Result<(), GatewayError> {
        self.created_users.lock().unwrap().push(user_id.to_string());
        pop(&self.create_user_responses, "create_user")
    }

    async fn issue_token(&self, user_id: &str) -> Result<IssuedCredentials, GatewayError> {
        self.issued_for.lock().unwrap().push(user_id.to_string());
        let delay = *self.issue_token_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        pop(&self.issue_token_responses, "issue_token")
    }

    async fn initialize_account(
        &self,
        user_token: &str,
        idempotency_key: &str,
        account_type: &str,
        blockchains: &[String],
    ) -> Result<Challenge, GatewayError> {
        self.initializations.lock().unwrap().push(RecordedInitialize {
            user_token: user_token.to_string(),
            idempotency_key: idempotency_key.to_string(),
            account_type: account_type.to_string(),
            blockchains: blockchains.to_vec(),
        });
        pop(&self.initialize_responses, "initialize_account")
    }

    async fn list_wallets(&self, user_token: &str) -> Result<Vec<Wallet>, GatewayError> {
        self.listed_with.lock().unwrap().push(user_token.to_string());
        pop(&self.list_wallets_responses, "list_wallets")
    }

    async fn list_balances(
        &self,
        user_token: &str,
        wallet_id: &str,
    ) -> Result<Vec<Balance>, GatewayError> {
        self.balance_requests
            .lock()
            .unwrap()
            .push((user_token.to_string(), wallet_id.to_string()));
        pop(&self.list_balances_responses, "list_balances")
    }

    async fn estimate_fee(
        &self,
        user_token: &str,
        request: FeeEstimateRequest<'_>,
    ) -> Result<TransferFeeEstimate, GatewayError> {
        self.estimates.lock().unwrap().push(RecordedEstimate {
            user_token: user_token.to_string(),
            amounts: request.amounts.to_vec(),
            destination_address: request.destination_address.to_string(),
            token_id: request.token_id.to_string(),
            wallet_id: request.wallet_id.to_string(),
        });
        pop(&self.estimate_fee_responses, "estimate_fee")
    }

    async fn validate_address(
        &self,
        _user_token: &str,
        _blockchain: &str,
        _address: &str,
    ) -> Result<bool, GatewayError> {
        pop(&self.validate_address_responses, "validate_address")
    }

    async fn submit_transfer(
        &self,
        user_token: &str,
        submission: TransferSubmission<'_>,
    ) -> Result<Challenge, GatewayError> {
        self.transfers.lock().unwrap().push(RecordedTransfer {
            user_token: user_token.to_string(),
            user_id: submission.user_id.to_string(),
            idempotency_key: submission.idempotency_key.to_string(),
            amounts: submission.amounts.to_vec(),
            destination_address: submission.destination_address.to_string(),
            token_id: submission.token_id.to_string(),
            wallet_id: submission.wallet_id.to_string(),
            fee_tier: submission.fee_tier,
        });
        pop(&self.submit_transfer_responses, "submit_transfer")
    }

    async fn change_pin(
        &self,
        user_token: &str,
        idempotency_key: &str,
    ) -> Result<Challenge, GatewayError> {
        self.pin_changes.lock().unwrap().push(RecordedPinChange {
            user_token: user_token.to_string(),
            idempotency_key: idempotency_key.to_string(),
        });
        pop(&self.change_pin_responses, "change_pin")
    }

    async fn restore_pin(&self, user_token: &str) -> Result<Challenge, GatewayError> {
        self.pin_restores.lock().unwrap().push(user_token.to_string());
        pop(&self.restore_pin_responses, "restore_pin")
    }
}

/// One `ChallengeExecutor::execute` call as the mock saw it.
#[derive(Debug, Clone)]
pub struct RecordedExecution {
    pub session: Session,
    pub challenge_ids: Vec<String>,
    /// User token persisted in the credential store at execution time,
    /// for asserting the session landed before the challenge ran.
    pub persisted_token: Option<String>,
}

/// Scripted `ChallengeExecutor` double.
pub struct MockExecutor {
    outcomes: Mutex<VecDeque<Result<ChallengeOutcome, ChallengeError>>>,
    executions: Mutex<Vec<RecordedExecution>>,
    store: Option<Arc<dyn CredentialStore>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            executions: Mutex::new(Vec::new()),
            store: None,
        }
    }

    /// A variant that snapshots the persisted user token on every call.
    pub fn with_store(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::new()
        }
    }

    pub fn enqueue(&self, outcome: Result<ChallengeOutcome, ChallengeError>) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn executions(&self) -> Vec<RecordedExecution> {
        self.executions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChallengeExecutor for MockExecutor {
    async fn execute(
        &self,
        session: &Session,
        challenge_ids: &[String],
    ) -> Result<ChallengeOutcome, ChallengeError> {
        let persisted_token = match &self.store {
            Some(store) => store.get(keys::USER_TOKEN).await,
            None => None,
        };
        self.executions.lock().unwrap().push(RecordedExecution {
            session: session.clone(),
            challenge_ids: challenge_ids.to_vec(),
            persisted_token,
        });
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected challenge execution: no scripted outcome left"))
    }
}

pub fn domain_error(code: i64) -> GatewayError {
    GatewayError::Domain {
        code,
        message: format!("scripted domain error {code}"),
    }
}

pub fn issued(user_token: &str, encryption_key: &str) -> IssuedCredentials {
    IssuedCredentials {
        user_token: user_token.to_string(),
        encryption_key: encryption_key.to_string(),
    }
}

pub fn session_fixture(user_id: &str, user_token: &str) -> Session {
    Session {
        user_id: user_id.to_string(),
        user_token: user_token.to_string(),
        encryption_key: format!("enc-{user_token}"),
    }
}

pub fn challenge(id: &str) -> Challenge {
    Challenge {
        challenge_id: id.to_string(),
    }
}

pub fn outcome(result_type: ChallengeType, status: ChallengeStatus) -> ChallengeOutcome {
    ChallengeOutcome {
        result_type,
        status,
    }
}

fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
}

pub fn sample_wallet(id: &str) -> Wallet {
    Wallet {
        id: id.to_string(),
        state: "LIVE".to_string(),
        wallet_set_id: None,
        custody_type: "ENDUSER".to_string(),
        user_id: "user-1".to_string(),
        address: format!("0xaddr-{id}"),
        blockchain: "MATIC-MUMBAI".to_string(),
        account_type: "SCA".to_string(),
        create_date: timestamp(),
        update_date: timestamp(),
        balances: Vec::new(),
    }
}

pub fn sample_balance(symbol: &str, amount: &str) -> Balance {
    Balance {
        token: Token {
            id: format!("{}-id", symbol.to_lowercase()),
            blockchain: "MATIC-MUMBAI".to_string(),
            token_address: Some("0x2791bca1f2de4661ed88a30c99a7a9449aa84174".to_string()),
            standard: Some("ERC20".to_string()),
            name: symbol.to_string(),
            symbol: symbol.to_string(),
            decimals: 6,
            is_native: false,
            update_date: timestamp(),
            create_date: timestamp(),
        },
        amount: amount.to_string(),
        update_date: timestamp(),
    }
}

pub fn sample_estimate() -> TransferFeeEstimate {
    TransferFeeEstimate {
        low: fee_level("1.0", "2.0"),
        medium: fee_level("2.0", "6.0"),
        high: fee_level("3.0", "9.0"),
    }
}

fn fee_level(priority_fee: &str, max_fee: &str) -> FeeLevel {
    FeeLevel {
        gas_limit: "21000".to_string(),
        base_fee: "1.5".to_string(),
        priority_fee: priority_fee.to_string(),
        max_fee: max_fee.to_string(),
    }
}
