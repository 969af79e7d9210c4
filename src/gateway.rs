// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custodian platform REST integration.
//!
//! Every custodian response lands in one of three buckets: a success
//! envelope (`{"data": …}`), a domain error (`{"code": …, "message": …}`
//! with a nonzero code, regardless of HTTP status), or a transport failure.
//! Domain code [`EXPIRED_CREDENTIAL_CODE`] marks an expired user token and
//! is the only code the orchestrators recover from.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::warn;
use url::Url;

use crate::config::{ConfigError, GatewayConfig, API_BASE_URL_ENV};
use crate::models::{Balance, Challenge, FeeTier, IssuedCredentials, TransferFeeEstimate, Wallet};

/// Domain code the custodian returns for an expired user token.
pub const EXPIRED_CREDENTIAL_CODE: i64 = 155104;

const USER_TOKEN_HEADER: &str = "X-User-Token";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("custodian rejected the request (code {code}): {message}")]
    Domain { code: i64, message: String },

    #[error("custodian request failed: {0}")]
    Transport(String),

    #[error("custodian response was invalid: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// The domain error code, when the custodian rejected the request.
    pub fn domain_code(&self) -> Option<i64> {
        match self {
            GatewayError::Domain { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether this failure means the user token expired and a refresh may
    /// recover the operation.
    pub fn is_expired_credential(&self) -> bool {
        self.domain_code() == Some(EXPIRED_CREDENTIAL_CODE)
    }
}

pub struct FeeEstimateRequest<'a> {
    pub amounts: &'a [String],
    pub destination_address: &'a str,
    pub token_id: &'a str,
    pub wallet_id: &'a str,
}

pub struct TransferSubmission<'a> {
    pub user_id: &'a str,
    pub idempotency_key: &'a str,
    pub amounts: &'a [String],
    pub destination_address: &'a str,
    pub token_id: &'a str,
    pub wallet_id: &'a str,
    pub fee_tier: FeeTier,
}

/// The custodian operations the orchestration layer depends on.
///
/// `user_token` parameters are forwarded as the `X-User-Token` header;
/// the API key rides on every call.
#[async_trait]
pub trait CustodianApi: Send + Sync {
    /// Register a new custodian user id.
    async fn create_user(&self, user_id: &str) -> Result<(), GatewayError>;

    /// Issue a fresh session token + encryption key for a user.
    async fn issue_token(&self, user_id: &str) -> Result<IssuedCredentials, GatewayError>;

    /// Provision wallets for a fresh user; returns the setup challenge.
    async fn initialize_account(
        &self,
        user_token: &str,
        idempotency_key: &str,
        account_type: &str,
        blockchains: &[String],
    ) -> Result<Challenge, GatewayError>;

    /// List the user's wallets; empty until provisioning completes.
    async fn list_wallets(&self, user_token: &str) -> Result<Vec<Wallet>, GatewayError>;

    /// Token balances held by one wallet.
    async fn list_balances(
        &self,
        user_token: &str,
        wallet_id: &str,
    ) -> Result<Vec<Balance>, GatewayError>;

    /// Fee estimate for a prospective transfer.
    async fn estimate_fee(
        &self,
        user_token: &str,
        request: FeeEstimateRequest<'_>,
    ) -> Result<TransferFeeEstimate, GatewayError>;

    /// Whether an address is well-formed for a blockchain.
    async fn validate_address(
        &self,
        user_token: &str,
        blockchain: &str,
        address: &str,
    ) -> Result<bool, GatewayError>;

    /// Submit a transfer; returns the approval challenge.
    async fn submit_transfer(
        &self,
        user_token: &str,
        submission: TransferSubmission<'_>,
    ) -> Result<Challenge, GatewayError>;

    /// Start a PIN change; returns the PIN entry challenge.
    async fn change_pin(
        &self,
        user_token: &str,
        idempotency_key: &str,
    ) -> Result<Challenge, GatewayError>;

    /// Start PIN recovery via security questions; returns the challenge.
    async fn restore_pin(&self, user_token: &str) -> Result<Challenge, GatewayError>;
}

/// Production `CustodianApi` over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    base_url: String,
    api_key: String,
    http: Client,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        Url::parse(&config.base_url).map_err(|e| {
            ConfigError::Invalid(format!("{API_BASE_URL_ENV} is not a valid URL: {e}"))
        })?;

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url,
            api_key: config.api_key,
            http,
        })
    }

    pub fn from_env() -> Result<Self, GatewayError> {
        Self::new(GatewayConfig::from_env()?)
    }

    async fn get_json(&self, path: &str, user_token: Option<&str>) -> Result<Value, GatewayError> {
        let mut request = self
            .http
            .get(format!(
                "{}{}",
                self.base_url.trim_end_matches('/'),
                path
            ))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if let Some(token) = user_token {
            request = request.header(USER_TOKEN_HEADER, token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("GET {path} failed: {e}")))?;

        decode_response(path, response).await
    }

    async fn post_json(
        &self,
        path: &str,
        user_token: Option<&str>,
        payload: &Value,
    ) -> Result<Value, GatewayError> {
        let mut request = self
            .http
            .post(format!(
                "{}{}",
                self.base_url.trim_end_matches('/'),
                path
            ))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if let Some(token) = user_token {
            request = request.header(USER_TOKEN_HEADER, token);
        }

        let response = request
            .json(payload)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("POST {path} failed: {e}")))?;

        decode_response(path, response).await
    }

    async fn put_json(
        &self,
        path: &str,
        user_token: &str,
        payload: &Value,
    ) -> Result<Value, GatewayError> {
        let response = self
            .http
            .put(format!(
                "{}{}",
                self.base_url.trim_end_matches('/'),
                path
            ))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header(USER_TOKEN_HEADER, user_token)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("PUT {path} failed: {e}")))?;

        decode_response(path, response).await
    }
}

#[async_trait]
impl CustodianApi for HttpGateway {
    async fn create_user(&self, user_id: &str) -> Result<(), GatewayError> {
        self.post_json("/users", None, &json!({ "userId": user_id }))
            .await?;
        Ok(())
    }

    async fn issue_token(&self, user_id: &str) -> Result<IssuedCredentials, GatewayError> {
        let data = self
            .post_json("/users/token", None, &json!({ "userId": user_id }))
            .await?;
        parse_data("/users/token", data)
    }

    async fn initialize_account(
        &self,
        user_token: &str,
        idempotency_key: &str,
        account_type: &str,
        blockchains: &[String],
    ) -> Result<Challenge, GatewayError> {
        let payload = json!({
            "idempotencyKey": idempotency_key,
            "accountType": account_type,
            "blockchains": blockchains,
        });
        let data = self
            .post_json("/user/initialize", Some(user_token), &payload)
            .await?;
        parse_data("/user/initialize", data)
    }

    async fn list_wallets(&self, user_token: &str) -> Result<Vec<Wallet>, GatewayError> {
        let data = self.get_json("/wallets", Some(user_token)).await?;
        parse_field("/wallets", data, "wallets")
    }

    async fn list_balances(
        &self,
        user_token: &str,
        wallet_id: &str,
    ) -> Result<Vec<Balance>, GatewayError> {
        let path = format!("/wallets/{wallet_id}/balances");
        let data = self.get_json(&path, Some(user_token)).await?;
        parse_field(&path, data, "tokenBalances")
    }

    async fn estimate_fee(
        &self,
        user_token: &str,
        request: FeeEstimateRequest<'_>,
    ) -> Result<TransferFeeEstimate, GatewayError> {
        let payload = json!({
            "amounts": request.amounts,
            "destinationAddress": request.destination_address,
            "tokenId": request.token_id,
            "walletId": request.wallet_id,
        });
        let data = self
            .post_json(
                "/transactions/transfer/estimateFee",
                Some(user_token),
                &payload,
            )
            .await?;
        parse_data("/transactions/transfer/estimateFee", data)
    }

    async fn validate_address(
        &self,
        user_token: &str,
        blockchain: &str,
        address: &str,
    ) -> Result<bool, GatewayError> {
        let payload = json!({
            "blockchain": blockchain,
            "address": address,
        });
        let data = self
            .post_json("/transactions/validateAddress", Some(user_token), &payload)
            .await?;
        data.get("isValid").and_then(Value::as_bool).ok_or_else(|| {
            GatewayError::InvalidResponse(
                "/transactions/validateAddress missing `isValid` in response".to_string(),
            )
        })
    }

    async fn submit_transfer(
        &self,
        user_token: &str,
        submission: TransferSubmission<'_>,
    ) -> Result<Challenge, GatewayError> {
        let payload = json!({
            "userId": submission.user_id,
            "idempotencyKey": submission.idempotency_key,
            "amounts": submission.amounts,
            "destinationAddress": submission.destination_address,
            "tokenId": submission.token_id,
            "walletId": submission.wallet_id,
            "feeLevel": submission.fee_tier.as_str(),
        });
        let data = self
            .post_json("/user/transactions/transfer", Some(user_token), &payload)
            .await?;
        parse_data("/user/transactions/transfer", data)
    }

    async fn change_pin(
        &self,
        user_token: &str,
        idempotency_key: &str,
    ) -> Result<Challenge, GatewayError> {
        let payload = json!({ "idempotencyKey": idempotency_key });
        let data = self.put_json("/user/pin", user_token, &payload).await?;
        parse_data("/user/pin", data)
    }

    async fn restore_pin(&self, user_token: &str) -> Result<Challenge, GatewayError> {
        let data = self
            .post_json("/user/pin/restore", Some(user_token), &json!({}))
            .await?;
        parse_data("/user/pin/restore", data)
    }
}

async fn decode_response(path: &str, response: reqwest::Response) -> Result<Value, GatewayError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| GatewayError::Transport(format!("{path} body read failed: {e}")))?;

    let value: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) => {
            // Non-2xx bodies that are not JSON never carry a domain code.
            if !status.is_success() {
                return Err(GatewayError::Transport(format!(
                    "{path} returned {status}: {body}"
                )));
            }
            return Err(GatewayError::InvalidResponse(format!(
                "{path} invalid JSON: {e}"
            )));
        }
    };

    decode_envelope(path, status, value)
}

/// Classify a parsed custodian body: nonzero `code` is a domain error on any
/// HTTP status; otherwise the `data` envelope (or the body itself) is the
/// payload.
fn decode_envelope(path: &str, status: StatusCode, mut body: Value) -> Result<Value, GatewayError> {
    if let Some(code) = body.get("code").and_then(Value::as_i64) {
        if code != 0 {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            warn!(code, message = %message, path, "Custodian returned domain error");
            return Err(GatewayError::Domain { code, message });
        }
    }

    if !status.is_success() {
        return Err(GatewayError::Transport(format!(
            "{path} returned {status}: {body}"
        )));
    }

    match body.get_mut("data") {
        Some(data) => Ok(data.take()),
        None => Ok(body),
    }
}

fn parse_data<T: DeserializeOwned>(path: &str, data: Value) -> Result<T, GatewayError> {
    serde_json::from_value(data)
        .map_err(|e| GatewayError::InvalidResponse(format!("{path} invalid payload: {e}")))
}

fn parse_field<T: DeserializeOwned>(
    path: &str,
    mut data: Value,
    field: &str,
) -> Result<T, GatewayError> {
    let value = data.get_mut(field).map(Value::take).ok_or_else(|| {
        GatewayError::InvalidResponse(format!("{path} missing `{field}` in response"))
    })?;
    serde_json::from_value(value)
        .map_err(|e| GatewayError::InvalidResponse(format!("{path} invalid `{field}` payload: {e}")))
}
