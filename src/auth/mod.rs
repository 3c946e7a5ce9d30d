// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Service-to-service authentication for endpoints called by Google Cloud.
//!
//! ## Auth Flow
//!
//! 1. A Google Cloud service (Cloud Scheduler, Pub/Sub push, Cloud Tasks,
//!    another Cloud Run service) mints an OpenID Connect identity token for
//!    its service account
//! 2. It sends `Authorization: Bearer <identity token>`
//! 3. The gate:
//!    - Verifies the token against Google's JWKS (signature, expiry)
//!    - Checks the issuer is Google
//!    - Checks `email_verified` and that `email` is the configured service
//!      account
//!
//! ## Security
//!
//! - Every rejection is a `403` with kind `invalid_token`
//! - JWKS is cached with TTL and refreshed on unknown key ids
//! - Clock skew tolerance is 60 seconds

pub mod chain;
pub mod claims;
pub mod docs;
pub mod error;
pub mod gate;
pub mod google;
pub mod jwks;
pub mod verifier;

#[cfg(test)]
pub(crate) mod testing;

pub use chain::{AuthChain, AuthStrategy};
pub use claims::{ClaimValue, Claims, VerifiedIdentity};
pub use error::GateError;
pub use gate::{BearerCredential, ServiceAccountGate};
pub use google::GoogleIdTokenVerifier;
pub use jwks::JwksManager;
pub use verifier::{TokenVerifier, VerifyError};
