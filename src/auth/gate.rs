// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer-token gate for Google Cloud service accounts.
//!
//! Endpoints called by Google Cloud services (Cloud Scheduler, Pub/Sub push,
//! Cloud Tasks, another Cloud Run service) receive an OpenID Connect token
//! minted for a service account. The gate accepts a request only when:
//!
//! 1. `Authorization` carries `<scheme> <token>`
//! 2. the verifier accepts the token (no audience restriction)
//! 3. the issuer is Google
//! 4. the token has claims, `email_verified` is true and `email` is the
//!    configured service account
//!
//! [`ServiceAccountGate::is_eligible`] runs steps 1–3 only, so a request can be
//! eligible and still be rejected by [`ServiceAccountGate::authorize`].

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::{self, Next},
    response::Response,
    Router,
};

use super::claims::VerifiedIdentity;
use super::error::GateError;
use super::verifier::TokenVerifier;

/// Issuers Google uses for identity tokens.
pub const ACCEPTED_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// `<scheme> <token>` pair from an `Authorization` header.
///
/// The scheme is not interpreted; only the token is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BearerCredential<'a> {
    pub scheme: &'a str,
    pub token: &'a str,
}

impl<'a> BearerCredential<'a> {
    /// Split a header value on single spaces and keep the first two segments.
    ///
    /// Returns `None` when there is no space or the token segment is empty.
    pub fn parse(value: &'a str) -> Option<Self> {
        let mut parts = value.split(' ');
        let scheme = parts.next()?;
        let token = parts.next().filter(|t| !t.is_empty())?;
        Some(Self { scheme, token })
    }

    /// Read the credential from `Authorization`.
    ///
    /// Missing, empty and non-UTF-8 headers yield `None`.
    pub fn from_headers(headers: &'a HeaderMap) -> Option<Self> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
        if value.is_empty() {
            return None;
        }
        Self::parse(value)
    }
}

/// Gate accepting identity tokens of a single service account.
#[derive(Debug)]
pub struct ServiceAccountGate<V> {
    service_account: Arc<str>,
    verifier: Arc<V>,
}

impl<V> Clone for ServiceAccountGate<V> {
    fn clone(&self) -> Self {
        Self {
            service_account: self.service_account.clone(),
            verifier: self.verifier.clone(),
        }
    }
}

impl<V: TokenVerifier> ServiceAccountGate<V> {
    /// Create a gate for `service_account` (the expected `email` claim).
    pub fn new(service_account: impl Into<String>, verifier: Arc<V>) -> Self {
        Self {
            service_account: Arc::from(service_account.into()),
            verifier,
        }
    }

    /// Expected service account email.
    pub fn service_account(&self) -> &str {
        &self.service_account
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Decide whether the request carrying `headers` may proceed.
    pub async fn authorize(&self, headers: &HeaderMap) -> Result<VerifiedIdentity, GateError> {
        let credential = BearerCredential::from_headers(headers).ok_or(GateError::MissingToken)?;
        let identity = self.verify_issuer(credential.token).await?;
        self.check_identity(&identity)?;
        Ok(identity)
    }

    /// Whether this gate is the right authentication method for the request.
    ///
    /// True when a token is present, verifies, and was issued by Google.
    /// Claims are not inspected.
    pub async fn is_eligible(&self, headers: &HeaderMap) -> bool {
        match BearerCredential::from_headers(headers) {
            Some(credential) => self.verify_issuer(credential.token).await.is_ok(),
            None => false,
        }
    }

    async fn verify_issuer(&self, token: &str) -> Result<VerifiedIdentity, GateError> {
        let identity = self.verifier.verify(token, None).await.map_err(|e| {
            tracing::debug!(error = %e, "identity token verification failed");
            GateError::FailedToValidate
        })?;

        if !ACCEPTED_ISSUERS.contains(&identity.issuer.as_str()) {
            tracing::debug!(issuer = %identity.issuer, "identity token from foreign issuer");
            return Err(GateError::InvalidIssuer);
        }

        Ok(identity)
    }

    /// Claim checks applied after verification and the issuer check.
    pub fn check_identity(&self, identity: &VerifiedIdentity) -> Result<(), GateError> {
        if identity.claims.is_empty() {
            return Err(GateError::MissingClaims);
        }

        if !identity.email_verified() {
            return Err(GateError::InvalidTokenEmail);
        }

        if identity.email() != Some(&*self.service_account) {
            return Err(GateError::InvalidTokenEmail);
        }

        Ok(())
    }
}

/// Middleware function: authorize, then forward the request untouched.
pub async fn require_service_account<V>(
    State(gate): State<ServiceAccountGate<V>>,
    request: Request,
    next: Next,
) -> Result<Response, GateError>
where
    V: TokenVerifier + 'static,
{
    let (parts, body) = request.into_parts();

    if let Err(e) = gate.authorize(&parts.headers).await {
        tracing::warn!(
            reason = %e,
            method = %parts.method,
            path = %parts.uri.path(),
            "request rejected by service account gate"
        );
        return Err(e);
    }

    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Put every route of `router` behind `gate`.
///
/// # Usage
///
/// ```rust,ignore
/// let tasks = Router::new().route("/tasks/{name}", post(run_task));
/// let tasks = gate::protect(tasks, gate.clone());
/// ```
pub fn protect<S, V>(router: Router<S>, gate: ServiceAccountGate<V>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    V: TokenVerifier + 'static,
{
    router.route_layer(middleware::from_fn_with_state(
        gate,
        require_service_account::<V>,
    ))
}
