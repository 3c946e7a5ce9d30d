// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Probe endpoints.
//!
//! `/health` and `/health/live` never leave the process. `/health/ready`
//! reports whether the gate can verify tokens, which needs Google's signing
//! keys.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Signing key availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum KeyStatus {
    /// A fresh key set is cached.
    Cached,
    /// The key set was fetched for this probe.
    Fetched,
    Unavailable,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Liveness {
    pub status: &'static str,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Readiness {
    pub ready: bool,
    /// Service account the gate admits.
    pub service_account: String,
    pub jwks: KeyStatus,
}

async fn key_status(state: &AppState) -> KeyStatus {
    let jwks = state.jwks();
    if jwks.is_cached().await {
        return KeyStatus::Cached;
    }
    match jwks.refresh().await {
        Ok(()) => KeyStatus::Fetched,
        Err(e) => {
            tracing::warn!(error = %e, url = jwks.jwks_url(), "signing keys unavailable");
            KeyStatus::Unavailable
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Process is serving requests", body = Liveness))
)]
pub async fn health() -> Json<Liveness> {
    Json(Liveness { status: "ok" })
}

#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses((status = 200, description = "Process is alive", body = Liveness))
)]
pub async fn liveness() -> Json<Liveness> {
    Json(Liveness { status: "ok" })
}

/// 503 until the gate can verify identity tokens.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Signing keys available", body = Readiness),
        (status = 503, description = "Signing keys unavailable", body = Readiness)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let jwks = key_status(&state).await;
    let ready = jwks != KeyStatus::Unavailable;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(Readiness {
            ready,
            service_account: state.gate.service_account().to_string(),
            jwks,
        }),
    )
}
