// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gate rejection errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Machine-readable kind shared by every gate rejection.
pub const INVALID_TOKEN: &str = "invalid_token";

/// Reason a request was rejected by the gate.
///
/// Every variant has the kind [`INVALID_TOKEN`] and maps to `403 Forbidden`.
/// Lower-level verifier errors are logged where they occur and collapsed
/// into [`GateError::FailedToValidate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    /// No `Authorization` header, or one without a token segment
    MissingToken,
    /// The verifier rejected the token
    FailedToValidate,
    /// Issuer is not an accepted Google issuer
    InvalidIssuer,
    /// Verified token carries no claims
    MissingClaims,
    /// `email_verified` is not true, or `email` does not match
    InvalidTokenEmail,
}

#[derive(Serialize)]
struct GateErrorBody {
    error: String,
    error_code: String,
}

impl GateError {
    /// Get the error kind.
    pub fn kind(&self) -> &'static str {
        INVALID_TOKEN
    }

    /// Get the human-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            GateError::MissingToken => "missing token",
            GateError::FailedToValidate => "failed to validate token",
            GateError::InvalidIssuer => "invalid issuer",
            GateError::MissingClaims => "missing claims",
            GateError::InvalidTokenEmail => "invalid token email",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::FORBIDDEN
    }
}

impl std::fmt::Display for GateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason())
    }
}

impl std::error::Error for GateError {}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(GateErrorBody {
            error: self.reason().to_string(),
            error_code: self.kind().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn missing_token_returns_403_with_kind() {
        let response = GateError::MissingToken.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "invalid_token");
        assert_eq!(body["error"], "missing token");
    }

    #[test]
    fn every_variant_shares_the_kind() {
        for err in [
            GateError::MissingToken,
            GateError::FailedToValidate,
            GateError::InvalidIssuer,
            GateError::MissingClaims,
            GateError::InvalidTokenEmail,
        ] {
            assert_eq!(err.kind(), INVALID_TOKEN);
            assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
            assert_eq!(err.to_string(), err.reason());
        }
    }
}
