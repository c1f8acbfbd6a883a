//! OAuth2 client-credentials tokens for Microsoft Graph
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::core::config::GraphCredentials;

pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Refresh this many seconds before the token actually expires
const CACHE_SKEW_SECONDS: i64 = 60;

/// Longest lifetime trusted from a token response
const MAX_TOKEN_LIFETIME_SECONDS: i64 = 24 * 60 * 60;

const REDACTED_BODY_MAX_LEN: usize = 200;

#[derive(Debug, Deserialize)]
pub struct OAuthTokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

pub async fn fetch_access_token(
    client: &Client,
    token_url: &str,
    credentials: &GraphCredentials,
) -> Result<AccessToken> {
    let res = client
        .post(token_url)
        .form(&[
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("scope", GRAPH_SCOPE),
            ("grant_type", "client_credentials"),
        ])
        .send()
        .await
        .with_context(|| format!("request graph token from {}", token_url))?;

    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if !status.is_success() {
        bail!(
            "Token request failed: {} ({})",
            status,
            redact_response_body(&text)
        );
    }

    let payload: OAuthTokenResponse =
        serde_json::from_str(&text).context("decode graph token response")?;
    Ok(AccessToken {
        access_token: payload.access_token,
        expires_at: token_expiry(Utc::now(), payload.expires_in),
    })
}

/// When a token issued at `now` should be replaced. `expires_in` is
/// capped at a day and the skew is taken off.
fn token_expiry(now: DateTime<Utc>, expires_in: u64) -> DateTime<Utc> {
    let lifetime = i64::try_from(expires_in)
        .unwrap_or(MAX_TOKEN_LIFETIME_SECONDS)
        .min(MAX_TOKEN_LIFETIME_SECONDS)
        .saturating_sub(CACHE_SKEW_SECONDS);
    now + Duration::seconds(lifetime)
}

/// Caches one access token and fetches a new one once it expires
pub struct TokenCache {
    client: Client,
    token_url: String,
    credentials: GraphCredentials,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    pub fn new(client: Client, token_url: &str, credentials: GraphCredentials) -> Self {
        Self {
            client,
            token_url: token_url.to_string(),
            credentials,
            cached: Mutex::new(None),
        }
    }

    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && !token.is_expired()
        {
            return Ok(token.access_token.clone());
        }

        tracing::debug!("Fetching new graph access token");
        let token = fetch_access_token(&self.client, &self.token_url, &self.credentials).await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }
}

/// Truncate error bodies before they end up in logs
pub fn redact_response_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= REDACTED_BODY_MAX_LEN {
        return trimmed.to_string();
    }
    let truncated: String = trimmed.chars().take(REDACTED_BODY_MAX_LEN).collect();
    format!("{}...", truncated)
}
