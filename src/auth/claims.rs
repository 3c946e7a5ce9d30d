// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verified identity and typed access to its claims.
//!
//! Identity tokens carry heterogeneous claim values. Different issuers encode
//! the same claim differently (Google sends `email_verified` as a boolean,
//! some federated issuers send the string `"true"`), so claims are kept as a
//! tagged union and read through getters that return `None` on a type
//! mismatch instead of failing.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

/// Claim name for the caller's email address.
pub const EMAIL_CLAIM: &str = "email";

/// Claim name for the issuer's assertion that `email` was verified.
pub const EMAIL_VERIFIED_CLAIM: &str = "email_verified";

/// A single claim value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClaimValue {
    Bool(bool),
    String(String),
    /// Numbers, arrays, objects and null.
    Other(Value),
}

impl From<Value> for ClaimValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(b) => ClaimValue::Bool(b),
            Value::String(s) => ClaimValue::String(s),
            other => ClaimValue::Other(other),
        }
    }
}

impl From<bool> for ClaimValue {
    fn from(value: bool) -> Self {
        ClaimValue::Bool(value)
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        ClaimValue::String(value.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        ClaimValue::String(value)
    }
}

/// Claim name → value mapping of a verified token.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Claims(HashMap<String, ClaimValue>);

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly useful for verifiers and tests.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ClaimValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ClaimValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.0.get(name)
    }

    /// String claim, `None` when absent or not a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(ClaimValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Boolean claim, `None` when absent or not a boolean.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.0.get(name) {
            Some(ClaimValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Boolean claim that also accepts the string `"true"`.
    ///
    /// Absent or mistyped claims read as `false`.
    pub fn is_true(&self, name: &str) -> bool {
        match self.0.get(name) {
            Some(ClaimValue::Bool(b)) => *b,
            Some(ClaimValue::String(s)) => s == "true",
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(String, Value)> for Claims {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name, ClaimValue::from(value)))
                .collect(),
        )
    }
}

/// Result of a successful identity-token verification.
///
/// Lives for one request; it is never stored.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifiedIdentity {
    /// `iss` claim
    pub issuer: String,
    /// `aud` claim (first entry when the token carries an array)
    pub audience: String,
    /// `sub` claim
    pub subject: String,
    /// `exp`, seconds since the epoch
    pub expires_at: i64,
    /// `iat`, seconds since the epoch
    pub issued_at: i64,
    /// Every claim of the payload, including the registered ones above.
    pub claims: Claims,
}

impl VerifiedIdentity {
    /// Build an identity from a decoded JWT payload.
    pub fn from_payload(payload: serde_json::Map<String, Value>) -> Self {
        let issuer = payload
            .get("iss")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let audience = match payload.get("aud") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(values)) => values
                .iter()
                .find_map(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        };
        let subject = payload
            .get("sub")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let expires_at = payload.get("exp").and_then(Value::as_i64).unwrap_or(0);
        let issued_at = payload.get("iat").and_then(Value::as_i64).unwrap_or(0);

        Self {
            issuer,
            audience,
            subject,
            expires_at,
            issued_at,
            claims: payload.into_iter().collect(),
        }
    }

    /// The `email` claim, if present as a string.
    pub fn email(&self) -> Option<&str> {
        self.claims.get_str(EMAIL_CLAIM)
    }

    /// Whether `email_verified` is `true` or `"true"`.
    pub fn email_verified(&self) -> bool {
        self.claims.is_true(EMAIL_VERIFIED_CLAIM)
    }
}
