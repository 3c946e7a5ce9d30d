// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ordered dispatch across alternative authentication strategies.
//!
//! An endpoint may accept more than one kind of caller (for example a Cloud
//! Scheduler service account, or a user session). Each strategy answers
//! "does this request use my scheme?" through `is_eligible`; the first
//! eligible strategy then makes the authorization decision alone.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::{self, Next},
    response::Response,
    Router,
};

use super::error::GateError;
use super::gate::ServiceAccountGate;
use super::verifier::TokenVerifier;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An authentication method that can be tried in sequence with others.
pub trait AuthStrategy: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Whether this strategy applies to the request.
    fn is_eligible<'a>(&'a self, headers: &'a HeaderMap) -> BoxFuture<'a, bool>;

    /// Authorization decision, only asked of an eligible strategy.
    fn authorize<'a>(&'a self, headers: &'a HeaderMap) -> BoxFuture<'a, Result<(), GateError>>;
}

impl<V: TokenVerifier + 'static> AuthStrategy for ServiceAccountGate<V> {
    fn name(&self) -> &'static str {
        "gcloud_service_account"
    }

    fn is_eligible<'a>(&'a self, headers: &'a HeaderMap) -> BoxFuture<'a, bool> {
        Box::pin(ServiceAccountGate::is_eligible(self, headers))
    }

    fn authorize<'a>(&'a self, headers: &'a HeaderMap) -> BoxFuture<'a, Result<(), GateError>> {
        Box::pin(async move { ServiceAccountGate::authorize(self, headers).await.map(|_| ()) })
    }
}

/// Strategies tried in order; the first eligible one decides.
#[derive(Clone, Default)]
pub struct AuthChain {
    strategies: Vec<Arc<dyn AuthStrategy>>,
}

impl std::fmt::Debug for AuthChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("AuthChain").field("strategies", &names).finish()
    }
}

impl AuthChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a strategy.
    pub fn with(mut self, strategy: impl AuthStrategy + 'static) -> Self {
        self.strategies.push(Arc::new(strategy));
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Authorize with the first eligible strategy and return its name.
    ///
    /// With no eligible strategy the request is treated as carrying no
    /// usable token.
    pub async fn authorize(&self, headers: &HeaderMap) -> Result<&'static str, GateError> {
        for strategy in &self.strategies {
            if strategy.is_eligible(headers).await {
                strategy.authorize(headers).await?;
                return Ok(strategy.name());
            }
        }
        Err(GateError::MissingToken)
    }

    /// Put every route of `router` behind this chain.
    pub fn protect<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(middleware::from_fn_with_state(self, require_any))
    }
}

/// Middleware function for [`AuthChain`].
pub async fn require_any(
    State(chain): State<AuthChain>,
    request: Request,
    next: Next,
) -> Result<Response, GateError> {
    let (parts, body) = request.into_parts();

    match chain.authorize(&parts.headers).await {
        Ok(strategy) => {
            tracing::debug!(strategy, path = %parts.uri.path(), "request authorized");
        }
        Err(e) => {
            tracing::warn!(
                reason = %e,
                method = %parts.method,
                path = %parts.uri.path(),
                "request rejected by auth chain"
            );
            return Err(e);
        }
    }

    Ok(next.run(Request::from_parts(parts, body)).await)
}
