// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Security
//!
//! - Keys are cached for the endpoint's `Cache-Control: max-age`, or the
//!   configured TTL when the header is absent
//! - An unknown `kid` forces one refresh (signing keys rotate), at most once
//!   per [`MIN_REFRESH_INTERVAL`]
//! - Concurrent refreshes share a single fetch
//! - A stale set is served when a refresh fails and a previous set exists
//!
//! ## Usage
//!
//! Build a `JwksManager` for Google's certificate endpoint and hand it to
//! [`super::google::GoogleIdTokenVerifier`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use reqwest::header::{HeaderMap, CACHE_CONTROL};
use tokio::sync::{Mutex, RwLock};

use super::verifier::VerifyError;

/// Google's OAuth2 v3 signing certificates in JWK form.
pub const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

/// Default JWKS cache TTL (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Minimum age of the cached set before an unknown `kid` may refetch it.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Timeout for a single JWKS fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// JWKS cache entry.
struct CacheEntry {
    jwks: JwkSet,
    fetched_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < self.ttl
    }
}

/// JWKS manager with caching.
#[derive(Clone)]
pub struct JwksManager {
    /// JWKS URL
    jwks_url: String,
    /// Cache TTL used when the endpoint sends no max-age
    cache_ttl: Duration,
    /// Minimum cache age for a forced refresh
    min_refresh_interval: Duration,
    /// Cached JWKS
    cache: Arc<RwLock<Option<CacheEntry>>>,
    /// Held while fetching
    refresh_lock: Arc<Mutex<()>>,
    /// HTTP client
    client: reqwest::Client,
}

impl std::fmt::Debug for JwksManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksManager")
            .field("jwks_url", &self.jwks_url)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl JwksManager {
    /// Create a new JWKS manager.
    ///
    /// # Arguments
    /// - `jwks_url`: The JWKS endpoint URL (e.g. [`GOOGLE_CERTS_URL`])
    pub fn new(jwks_url: impl Into<String>) -> Result<Self, VerifyError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| VerifyError::KeyFetch(format!("failed to create HTTP client: {e}")))?;

        Ok(Self::with_client(jwks_url, client))
    }

    /// Create with an existing HTTP client.
    pub fn with_client(jwks_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            min_refresh_interval: MIN_REFRESH_INTERVAL,
            cache: Arc::new(RwLock::new(None)),
            refresh_lock: Arc::new(Mutex::new(())),
            client,
        }
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set how old the cached set must be before an unknown `kid` refetches it.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Get the JWKS URL.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Fetch JWKS (with caching).
    async fn get_jwks(&self) -> Result<JwkSet, VerifyError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                if entry.is_fresh() {
                    return Ok(entry.jwks.clone());
                }
            }
        }

        match self.refresh_unless(CacheEntry::is_fresh).await {
            Ok(jwks) => Ok(jwks),
            Err(e) => {
                let cache = self.cache.read().await;
                match &*cache {
                    Some(entry) => {
                        tracing::warn!(
                            error = %e,
                            url = %self.jwks_url,
                            "JWKS refresh failed, serving stale keys"
                        );
                        Ok(entry.jwks.clone())
                    }
                    None => Err(e),
                }
            }
        }
    }

    /// Fetch JWKS from the endpoint.
    async fn fetch_jwks(&self) -> Result<(JwkSet, Option<Duration>), VerifyError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| VerifyError::KeyFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VerifyError::KeyFetch(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        let max_age = cache_max_age(response.headers());

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| VerifyError::KeyFetch(e.to_string()))?;

        Ok((jwks, max_age))
    }

    /// Fetch under the refresh lock, unless the entry found once the lock is
    /// held satisfies `reuse` (another task refreshed meanwhile).
    async fn refresh_unless<F>(&self, reuse: F) -> Result<JwkSet, VerifyError>
    where
        F: Fn(&CacheEntry) -> bool,
    {
        let _guard = self.refresh_lock.lock().await;
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.as_ref().filter(|entry| reuse(*entry)) {
                return Ok(entry.jwks.clone());
            }
        }
        self.refresh_inner().await
    }

    async fn refresh_inner(&self) -> Result<JwkSet, VerifyError> {
        let (jwks, max_age) = self.fetch_jwks().await?;
        tracing::debug!(
            url = %self.jwks_url,
            keys = jwks.keys.len(),
            "fetched JWKS"
        );

        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            jwks: jwks.clone(),
            fetched_at: Instant::now(),
            ttl: max_age.unwrap_or(self.cache_ttl),
        });
        Ok(jwks)
    }

    /// Get a decoding key for the given key ID.
    ///
    /// An unknown `kid` triggers one forced refresh before giving up, unless
    /// the cached set is younger than the minimum refresh interval.
    pub async fn get_decoding_key(&self, kid: &str) -> Result<(DecodingKey, Algorithm), VerifyError> {
        let jwks = self.get_jwks().await?;
        if let Some(jwk) = find_key(&jwks, kid) {
            return jwk_to_decoding_key(jwk);
        }

        tracing::debug!(kid = %kid, "unknown kid, refreshing JWKS");
        let min_age = self.min_refresh_interval;
        let jwks = self
            .refresh_unless(|entry| entry.fetched_at.elapsed() < min_age)
            .await?;
        let jwk = find_key(&jwks, kid).ok_or(VerifyError::NoMatchingKey)?;
        jwk_to_decoding_key(jwk)
    }

    /// Get any valid decoding key (for tokens without kid).
    pub async fn get_any_decoding_key(&self) -> Result<(DecodingKey, Algorithm), VerifyError> {
        let jwks = self.get_jwks().await?;

        for jwk in &jwks.keys {
            if let Ok(result) = jwk_to_decoding_key(jwk) {
                return Ok(result);
            }
        }

        Err(VerifyError::NoMatchingKey)
    }

    /// Force refresh the JWKS cache.
    pub async fn refresh(&self) -> Result<(), VerifyError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_inner().await.map(|_| ())
    }

    /// Check if JWKS is currently cached and valid.
    pub async fn is_cached(&self) -> bool {
        let cache = self.cache.read().await;
        cache.as_ref().is_some_and(CacheEntry::is_fresh)
    }
}

fn find_key<'a>(jwks: &'a JwkSet, kid: &str) -> Option<&'a Jwk> {
    jwks.keys
        .iter()
        .find(|k| k.common.key_id.as_deref() == Some(kid))
}

/// Parse `max-age` out of a `Cache-Control` header.
fn cache_max_age(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(CACHE_CONTROL)?.to_str().ok()?;
    value
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Convert a JWK to a DecodingKey.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), VerifyError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| VerifyError::UnsupportedKey(format!("invalid RSA key: {e}")))?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                _ => Algorithm::RS256,
            };

            Ok((key, alg))
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| VerifyError::UnsupportedKey(format!("invalid EC key: {e}")))?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::ES384) => Algorithm::ES384,
                _ => Algorithm::ES256,
            };

            Ok((key, alg))
        }
        _ => Err(VerifyError::UnsupportedKey(
            "unsupported key type in JWKS".to_string(),
        )),
    }
}
