// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Service-to-service HTTP client.
//!
//! Outbound counterpart of the gate: requests carry
//! `Authorization: Bearer <identity token>` minted for a fixed audience by
//! the metadata server of the runtime (Cloud Run, GCE, GKE workload
//! identity). The audience is the receiving service's URL or the value it
//! expects in `aud`.
//!
//! Tokens are cached until [`EXPIRY_MARGIN`] before their `exp`.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{IntoUrl, Method, RequestBuilder};
use serde::Deserialize;
use tokio::sync::RwLock;
use url::Url;

/// Environment variable overriding the metadata server host.
pub const METADATA_HOST_ENV: &str = "GCE_METADATA_HOST";

/// Metadata server host inside Google Cloud.
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";

const IDENTITY_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/identity";

/// Cached tokens are refreshed this long before they expire.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Timeout for outbound requests, metadata calls included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from building the client or minting tokens.
#[derive(Debug, thiserror::Error)]
pub enum S2sError {
    #[error("invalid audience: {0:?}")]
    InvalidAudience(String),
    #[error("invalid metadata server address: {0}")]
    InvalidMetadataHost(#[from] url::ParseError),
    #[error("failed to create HTTP client: {0}")]
    Client(String),
    #[error("failed to fetch identity token: {0}")]
    TokenFetch(String),
    #[error("identity token is malformed")]
    MalformedToken,
}

impl S2sError {
    /// Machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            S2sError::InvalidAudience(_)
            | S2sError::InvalidMetadataHost(_)
            | S2sError::Client(_) => "init_client_failed",
            S2sError::TokenFetch(_) | S2sError::MalformedToken => "token_fetch_failed",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

struct CachedToken {
    token: String,
    expires_at: i64,
}

impl CachedToken {
    fn is_fresh(&self, now: i64) -> bool {
        now < self
            .expires_at
            .saturating_sub(EXPIRY_MARGIN.as_secs() as i64)
    }
}

/// Identity tokens for one audience from the metadata server.
pub struct MetadataTokenSource {
    http: reqwest::Client,
    identity_url: Url,
    cached: RwLock<Option<CachedToken>>,
}

impl std::fmt::Debug for MetadataTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print the token
        f.debug_struct("MetadataTokenSource")
            .field("identity_url", &self.identity_url.as_str())
            .finish()
    }
}

impl MetadataTokenSource {
    /// `metadata_base` is a base URL such as `http://metadata.google.internal`.
    pub fn new(
        http: reqwest::Client,
        metadata_base: &str,
        audience: &str,
    ) -> Result<Self, S2sError> {
        let mut identity_url = Url::parse(metadata_base)?.join(IDENTITY_PATH)?;
        identity_url
            .query_pairs_mut()
            .append_pair("audience", audience)
            .append_pair("format", "full");

        Ok(Self {
            http,
            identity_url,
            cached: RwLock::new(None),
        })
    }

    /// A valid identity token, fetched only when the cached one is stale.
    pub async fn token(&self) -> Result<String, S2sError> {
        let now = chrono::Utc::now().timestamp();
        {
            let cached = self.cached.read().await;
            if let Some(entry) = &*cached {
                if entry.is_fresh(now) {
                    return Ok(entry.token.clone());
                }
            }
        }

        let (token, expires_at) = self.fetch().await?;
        let mut cached = self.cached.write().await;
        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at,
        });
        Ok(token)
    }

    async fn fetch(&self) -> Result<(String, i64), S2sError> {
        let response = self
            .http
            .get(self.identity_url.clone())
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| S2sError::TokenFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(S2sError::TokenFetch(format!(
                "HTTP {} from metadata server",
                response.status()
            )));
        }

        let token = response
            .text()
            .await
            .map_err(|e| S2sError::TokenFetch(e.to_string()))?
            .trim()
            .to_string();

        // Unverified: `exp` only drives the cache
        let expires_at = jsonwebtoken::dangerous::insecure_decode::<ExpiryClaim>(&token)
            .map_err(|_| S2sError::MalformedToken)?
            .claims
            .exp;

        tracing::debug!(expires_at, "fetched identity token from metadata server");
        Ok((token, expires_at))
    }
}

/// HTTP client that authenticates every request with an identity token.
#[derive(Debug, Clone)]
pub struct S2sClient {
    http: reqwest::Client,
    audience: String,
    tokens: Arc<MetadataTokenSource>,
}

impl S2sClient {
    /// Create a client for `audience` using the runtime's metadata server.
    pub fn new(audience: &str) -> Result<Self, S2sError> {
        let host = std::env::var(METADATA_HOST_ENV)
            .ok()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string());
        Self::with_metadata_base(&format!("http://{host}"), audience)
    }

    /// Create a client against an explicit metadata server base URL.
    pub fn with_metadata_base(metadata_base: &str, audience: &str) -> Result<Self, S2sError> {
        if audience.trim().is_empty() {
            return Err(S2sError::InvalidAudience(audience.to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| S2sError::Client(e.to_string()))?;

        let tokens = MetadataTokenSource::new(http.clone(), metadata_base, audience)?;

        Ok(Self {
            http,
            audience: audience.to_string(),
            tokens: Arc::new(tokens),
        })
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Current identity token for this client's audience.
    pub async fn id_token(&self) -> Result<String, S2sError> {
        self.tokens.token().await
    }

    /// Start a request with the `Authorization` header already set.
    pub async fn request<U: IntoUrl>(
        &self,
        method: Method,
        url: U,
    ) -> Result<RequestBuilder, S2sError> {
        let token = self.id_token().await?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    pub async fn get<U: IntoUrl>(&self, url: U) -> Result<RequestBuilder, S2sError> {
        self.request(Method::GET, url).await
    }

    pub async fn post<U: IntoUrl>(&self, url: U) -> Result<RequestBuilder, S2sError> {
        self.request(Method::POST, url).await
    }
}
