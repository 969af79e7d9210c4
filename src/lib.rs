// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custody Client - Custodial Wallet Orchestration
//!
//! This crate drives a custodian-hosted wallet platform from the user's side:
//! onboarding, session lifecycle, wallet provisioning, transfers, and PIN
//! ceremonies, with every sensitive step resolved through an out-of-band
//! challenge executor.
//!
//! ## Modules
//!
//! - `gateway` - Custodian REST API client (reqwest)
//! - `session` - Session cache, persistence, and coalesced refresh
//! - `onboarding` - User creation and wallet provisioning pipeline
//! - `poller` - Wallet readiness polling with balance attachment
//! - `transfer` - Fee estimation, address validation, transfer submission
//! - `pin` - PIN change and restore ceremonies
//! - `challenge` - Out-of-band challenge executor seam
//! - `credentials` - Device credential persistence seam

pub mod challenge;
pub mod config;
pub mod credentials;
pub mod gateway;
pub mod models;
pub mod onboarding;
pub mod pin;
pub mod poller;
pub mod session;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testutil;
