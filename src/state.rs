// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{GoogleIdTokenVerifier, JwksManager, ServiceAccountGate};

/// Gate used by the server: Google identity tokens verified against JWKS.
pub type GoogleGate = ServiceAccountGate<GoogleIdTokenVerifier>;

#[derive(Clone)]
pub struct AppState {
    pub gate: GoogleGate,
}

impl AppState {
    pub fn new(gate: GoogleGate) -> Self {
        Self { gate }
    }

    /// State for `service_account`, verifying tokens with keys from `jwks`.
    pub fn with_jwks(service_account: impl Into<String>, jwks: JwksManager) -> Self {
        let verifier = Arc::new(GoogleIdTokenVerifier::new(jwks));
        Self::new(ServiceAccountGate::new(service_account, verifier))
    }

    pub fn jwks(&self) -> &JwksManager {
        self.gate.verifier().jwks()
    }
}
