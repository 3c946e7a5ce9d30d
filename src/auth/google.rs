// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verifier for Google-signed OpenID Connect identity tokens.
//!
//! Checks the signature against Google's published keys plus `exp`/`nbf`
//! (with clock skew leeway) and, when requested, `aud`. The issuer is left
//! to the caller, which owns the issuer allow-list.

use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Validation};
use serde_json::{Map, Value};

use super::claims::VerifiedIdentity;
use super::jwks::JwksManager;
use super::verifier::{TokenVerifier, VerifyError};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// [`TokenVerifier`] backed by a [`JwksManager`].
#[derive(Debug, Clone)]
pub struct GoogleIdTokenVerifier {
    jwks: JwksManager,
}

impl GoogleIdTokenVerifier {
    pub fn new(jwks: JwksManager) -> Self {
        Self { jwks }
    }

    /// Key manager, used by readiness checks.
    pub fn jwks(&self) -> &JwksManager {
        &self.jwks
    }
}

impl TokenVerifier for GoogleIdTokenVerifier {
    async fn verify(
        &self,
        token: &str,
        expected_audience: Option<&str>,
    ) -> Result<VerifiedIdentity, VerifyError> {
        let header = decode_header(token).map_err(|_| VerifyError::MalformedToken)?;

        let (decoding_key, algorithm) = match &header.kid {
            Some(kid) => self.jwks.get_decoding_key(kid).await?,
            None => self.jwks.get_any_decoding_key().await?,
        };

        let mut validation = Validation::new(algorithm);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_nbf = true;

        match expected_audience {
            Some(aud) if !aud.is_empty() => validation.set_audience(&[aud]),
            _ => validation.validate_aud = false,
        }

        let token_data = decode::<Map<String, Value>>(token, &decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => VerifyError::Expired,
                ErrorKind::ImmatureSignature => VerifyError::NotYetValid,
                ErrorKind::InvalidSignature => VerifyError::InvalidSignature,
                ErrorKind::InvalidAudience => VerifyError::InvalidAudience,
                ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) => {
                    VerifyError::MalformedToken
                }
                _ => VerifyError::Rejected(e.to_string()),
            })?;

        Ok(VerifiedIdentity::from_payload(token_data.claims))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use axum::http::StatusCode;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use serde_json::json;

    use super::*;
    use crate::auth::testing::{
        google_claims, serve_jwks, signed_token, test_jwks, SERVICE_ACCOUNT, TEST_KEY_ID,
    };

    /// Token with a well-formed header and payload and a bogus signature.
    fn unsigned_token(kid: &str) -> String {
        let header = json!({ "alg": "RS256", "typ": "JWT", "kid": kid });
        let claims = json!({
            "iss": "https://accounts.google.com",
            "aud": "https://svc.example.run.app",
            "sub": "1234567890",
            "exp": 9999999999u64,
            "iat": 1609459200,
            "email": "svc@project.iam.gserviceaccount.com",
            "email_verified": true
        });
        format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string()),
            URL_SAFE_NO_PAD.encode(b"not-a-real-signature")
        )
    }

    fn verifier_for(url: &str) -> GoogleIdTokenVerifier {
        GoogleIdTokenVerifier::new(JwksManager::new(url).unwrap())
    }

    #[tokio::test]
    async fn malformed_token_is_rejected_without_fetching_keys() {
        let (url, hits) = serve_jwks(test_jwks(), StatusCode::OK).await;
        let verifier = verifier_for(&url);

        let err = verifier.verify("not-a-jwt", None).await.unwrap_err();
        assert!(matches!(err, VerifyError::MalformedToken));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_kid_forces_one_refresh() {
        let (url, hits) = serve_jwks(test_jwks(), StatusCode::OK).await;
        let verifier = GoogleIdTokenVerifier::new(
            JwksManager::new(&url)
                .unwrap()
                .with_min_refresh_interval(Duration::ZERO),
        );

        let err = verifier
            .verify(&unsigned_token("rotated-away"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::NoMatchingKey));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_kids_do_not_refetch_a_recent_key_set() {
        let (url, hits) = serve_jwks(test_jwks(), StatusCode::OK).await;
        let verifier = verifier_for(&url);

        for i in 0..20 {
            let token = signed_token(&format!("bogus-{i}"), &google_claims(SERVICE_ACCOUNT));
            let err = verifier.verify(&token, None).await.unwrap_err();
            assert!(matches!(err, VerifyError::NoMatchingKey));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // the real key still works from the same cached set
        let token = signed_token(TEST_KEY_ID, &google_claims(SERVICE_ACCOUNT));
        assert!(verifier.verify(&token, None).await.is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_cold_cache_misses_share_one_fetch() {
        let (url, hits) = serve_jwks(test_jwks(), StatusCode::OK).await;
        let verifier = verifier_for(&url);

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..10 {
            let verifier = verifier.clone();
            tasks.spawn(async move {
                let token = signed_token(&format!("bogus-{i}"), &google_claims(SERVICE_ACCOUNT));
                verifier.verify(&token, None).await
            });
        }
        while let Some(result) = tasks.join_next().await {
            assert!(matches!(result.unwrap(), Err(VerifyError::NoMatchingKey)));
        }

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bad_signature_is_rejected() {
        let (url, hits) = serve_jwks(test_jwks(), StatusCode::OK).await;
        let verifier = verifier_for(&url);

        let result = verifier.verify(&unsigned_token("k1"), None).await;
        assert!(result.is_err());
        assert!(!matches!(result, Err(VerifyError::NoMatchingKey)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(verifier.jwks().is_cached().await);
    }

    #[tokio::test]
    async fn key_endpoint_failure_surfaces_as_key_fetch() {
        let (url, _) = serve_jwks(json!({}), StatusCode::SERVICE_UNAVAILABLE).await;
        let verifier = verifier_for(&url);

        let err = verifier
            .verify(&unsigned_token("k1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::KeyFetch(_)));
    }

    #[tokio::test]
    async fn valid_token_yields_identity() {
        let (url, _) = serve_jwks(test_jwks(), StatusCode::OK).await;
        let verifier = verifier_for(&url);
        let token = signed_token(TEST_KEY_ID, &google_claims(SERVICE_ACCOUNT));

        let identity = verifier.verify(&token, None).await.unwrap();
        assert_eq!(identity.issuer, "https://accounts.google.com");
        assert_eq!(identity.audience, "https://svc.example.run.app");
        assert_eq!(identity.email(), Some(SERVICE_ACCOUNT));
        assert!(identity.email_verified());
    }

    #[tokio::test]
    async fn audience_is_checked_only_when_given() {
        let (url, _) = serve_jwks(test_jwks(), StatusCode::OK).await;
        let verifier = verifier_for(&url);
        let token = signed_token(TEST_KEY_ID, &google_claims(SERVICE_ACCOUNT));

        assert!(verifier
            .verify(&token, Some("https://svc.example.run.app"))
            .await
            .is_ok());
        let err = verifier
            .verify(&token, Some("https://other.example.run.app"))
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::InvalidAudience));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let (url, _) = serve_jwks(test_jwks(), StatusCode::OK).await;
        let verifier = verifier_for(&url);

        let mut claims = google_claims(SERVICE_ACCOUNT);
        let past = chrono::Utc::now().timestamp() - 3600;
        claims["iat"] = json!(past - 3600);
        claims["exp"] = json!(past);

        let err = verifier
            .verify(&signed_token(TEST_KEY_ID, &claims), None)
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::Expired));
    }
}
