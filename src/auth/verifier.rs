// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity-token verifier contract.
//!
//! The gate only consumes this trait. Signature checking and signing-key
//! rotation live behind it (see [`super::google::GoogleIdTokenVerifier`]).

use std::future::Future;
use std::sync::Arc;

use super::claims::VerifiedIdentity;

/// Reasons an identity token failed verification.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("token is malformed")]
    MalformedToken,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is not yet valid")]
    NotYetValid,
    #[error("token audience is invalid")]
    InvalidAudience,
    #[error("no matching key found in JWKS")]
    NoMatchingKey,
    #[error("unsupported signing key: {0}")]
    UnsupportedKey(String),
    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(String),
    #[error("token rejected: {0}")]
    Rejected(String),
}

/// Validates an identity token and returns its payload.
///
/// `expected_audience = None` performs open verification: the `aud` claim is
/// not checked. Dropping the returned future abandons the verification,
/// including any in-flight key fetch.
pub trait TokenVerifier: Send + Sync {
    fn verify(
        &self,
        token: &str,
        expected_audience: Option<&str>,
    ) -> impl Future<Output = Result<VerifiedIdentity, VerifyError>> + Send;
}

impl<V: TokenVerifier> TokenVerifier for Arc<V> {
    fn verify(
        &self,
        token: &str,
        expected_audience: Option<&str>,
    ) -> impl Future<Output = Result<VerifiedIdentity, VerifyError>> + Send {
        (**self).verify(token, expected_audience)
    }
}
