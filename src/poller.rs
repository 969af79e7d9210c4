// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Poller
//!
//! After onboarding, the custodian provisions wallets asynchronously; the
//! wallet list stays empty until setup completes upstream.
//!
//! ## Strategy
//!
//! `poll_until_ready` retries `list_wallets` at a fixed interval (default
//! 1 s, no backoff):
//! 1. An empty list sleeps one interval and retries, indefinitely.
//! 2. An expired token refreshes the session and retries the list call
//!    once; any other gateway failure ends the poll with a typed error.
//! 3. A non-empty list gets balances attached per wallet; a failed balance
//!    fetch logs a warning and leaves that wallet's balances empty without
//!    failing the poll.
//!
//! The finished set replaces the cached wallets wholesale.
//!
//! ## Cancellation
//!
//! Uses `tokio_util::sync::CancellationToken`; cancellation interrupts the
//! sleep as well as the loop entry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::gateway::{CustodianApi, GatewayError};
use crate::models::Wallet;
use crate::session::{AuthError, SessionManager};

/// Default delay between wallet list retries.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("wallet polling was cancelled")]
    Cancelled,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("custodian wallet listing failed: {0}")]
    Gateway(GatewayError),
}

/// Polls the custodian until the user's wallets are provisioned.
#[derive(Clone)]
pub struct WalletPoller {
    gateway: Arc<dyn CustodianApi>,
    sessions: SessionManager,
    poll_interval: Duration,
    /// Last successfully fetched set, replaced wholesale per poll.
    wallets: Arc<RwLock<Vec<Wallet>>>,
}

impl WalletPoller {
    pub fn new(gateway: Arc<dyn CustodianApi>, sessions: SessionManager) -> Self {
        Self {
            gateway,
            sessions,
            poll_interval: DEFAULT_POLL_INTERVAL,
            wallets: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Override the retry interval (see `WALLET_POLL_INTERVAL_SECS`).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The cached wallet set from the last successful poll.
    pub async fn current(&self) -> Vec<Wallet> {
        self.wallets.read().await.clone()
    }

    /// Poll until the wallet list is non-empty, then attach balances and
    /// replace the cached set. Runs until ready, failure, or cancellation.
    pub async fn poll_until_ready(
        &self,
        shutdown: &CancellationToken,
    ) -> Result<Vec<Wallet>, PollError> {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            "Wallet poller starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Wallet poller cancelled");
                return Err(PollError::Cancelled);
            }

            let wallets = self.list_once().await?;

            if wallets.is_empty() {
                tokio::select! {
                    _ = tokio::time::sleep(self.poll_interval) => {},
                    _ = shutdown.cancelled() => {
                        info!("Wallet poller cancelled");
                        return Err(PollError::Cancelled);
                    }
                }
                continue;
            }

            let wallets = self.attach_balances(wallets).await?;
            *self.wallets.write().await = wallets.clone();
            info!(count = wallets.len(), "Wallet poller: wallets ready");
            return Ok(wallets);
        }
    }

    /// One wallet list call with the single expired-token recovery.
    async fn list_once(&self) -> Result<Vec<Wallet>, PollError> {
        let session = self.sessions.require().await?;
        match self.gateway.list_wallets(&session.user_token).await {
            Ok(wallets) => Ok(wallets),
            Err(e) if e.is_expired_credential() => {
                let session = self.sessions.refresh(&session.user_id).await?;
                self.gateway
                    .list_wallets(&session.user_token)
                    .await
                    .map_err(PollError::Gateway)
            }
            Err(e) => Err(PollError::Gateway(e)),
        }
    }

    /// Fetch balances per wallet; failures are isolated to their wallet.
    async fn attach_balances(&self, mut wallets: Vec<Wallet>) -> Result<Vec<Wallet>, PollError> {
        let session = self.sessions.require().await?;
        for wallet in &mut wallets {
            match self
                .gateway
                .list_balances(&session.user_token, &wallet.id)
                .await
            {
                Ok(balances) => wallet.balances = balances,
                Err(e) => {
                    warn!(
                        wallet_id = %wallet.id,
                        error = %e,
                        "Failed to fetch balances for wallet"
                    );
                }
            }
        }
        Ok(wallets)
    }
}
