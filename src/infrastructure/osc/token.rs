//! Service access tokens for services hosted on the Open Source Cloud.
//!
//! A personal access token is exchanged for a short-lived token scoped to one
//! service. Tokens are cached per service until shortly before they expire.
use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token service responded with status {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    service_id: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
    /// Unix seconds.
    #[serde(default)]
    expiry: i64,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    expiry: i64,
}

pub struct ServiceTokenProvider {
    http: reqwest::Client,
    endpoint: String,
    personal_access_token: String,
    cache: RwLock<HashMap<String, CachedToken>>,
}

impl ServiceTokenProvider {
    pub fn new(personal_access_token: String, environment: &str) -> Result<Self, TokenError> {
        let endpoint = format!("https://token.svc.{environment}.osaas.io/servicetoken");
        Self::with_endpoint(personal_access_token, endpoint)
    }

    pub fn with_endpoint(
        personal_access_token: String,
        endpoint: String,
    ) -> Result<Self, TokenError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        info!(endpoint = %endpoint, "🔑 Service token provider configured");
        Ok(Self {
            http,
            endpoint,
            personal_access_token,
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub async fn service_token(&self, service_id: &str) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        if let Some(cached) = self.cache.read().await.get(service_id) {
            if cached.expiry - EXPIRY_MARGIN_SECS > now {
                return Ok(cached.token.clone());
            }
        }

        debug!(service_id, "Requesting service access token");
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-pat-jwt", format!("Bearer {}", self.personal_access_token))
            .json(&TokenRequest { service_id })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TokenError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let issued: TokenResponse = response.json().await?;
        let cached = CachedToken {
            token: issued.token,
            expiry: issued.expiry,
        };
        self.cache
            .write()
            .await
            .insert(service_id.to_string(), cached.clone());
        Ok(cached.token)
    }
}
