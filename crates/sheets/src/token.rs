//! OAuth access tokens for the Sheets API.
//!
//! Tokens expire, so callers never hold one directly: they ask a
//! [`TokenSource`] each time, and [`CachedToken`] refetches once the cached
//! value is missing or about to expire.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use khatt_core::SheetsSettings;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Refresh this long before the reported expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("HTTP error fetching token: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Connector returned {0}")]
    Status(u16),
    #[error("Google Sheets is not connected: {0}")]
    NotConnected(String),
    #[error("No token source configured (set GOOGLE_SHEETS_ACCESS_TOKEN or the connector variables)")]
    NotConfigured,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    /// `None` when the issuer gave no expiry; such tokens are never reused.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|exp| exp - Duration::seconds(EXPIRY_SKEW_SECS) > now)
    }
}

/// Fetches a brand-new token from wherever credentials live.
#[async_trait]
pub trait TokenFetcher: Send + Sync {
    async fn fetch(&self) -> Result<AccessToken, TokenError>;
}

/// Hands out a currently valid bearer token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, TokenError>;
}

#[async_trait]
impl<T: TokenSource + ?Sized> TokenSource for Arc<T> {
    async fn access_token(&self) -> Result<String, TokenError> {
        (**self).access_token().await
    }
}

/// Caches the last token and refreshes on expiry.
pub struct CachedToken<F> {
    fetcher: F,
    current: Mutex<Option<AccessToken>>,
}

impl<F: TokenFetcher> CachedToken<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher, current: Mutex::new(None) }
    }
}

#[async_trait]
impl<F: TokenFetcher> TokenSource for CachedToken<F> {
    async fn access_token(&self) -> Result<String, TokenError> {
        let mut current = self.current.lock().await;
        if let Some(token) = current.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.value.clone());
        }
        tracing::debug!("Refreshing Sheets access token");
        let token = self.fetcher.fetch().await?;
        let value = token.value.clone();
        *current = Some(token);
        Ok(value)
    }
}

// ── Fetchers ──────────────────────────────────────────────────────────────────

/// A token supplied through configuration.
pub struct StaticTokenFetcher {
    token: String,
}

impl StaticTokenFetcher {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenFetcher for StaticTokenFetcher {
    async fn fetch(&self) -> Result<AccessToken, TokenError> {
        Ok(AccessToken { value: self.token.clone(), expires_at: None })
    }
}

/// Reads the Google Sheets token from the hosting platform's connector API.
pub struct ConnectorTokenFetcher {
    http: reqwest::Client,
    host: String,
    identity: String,
}

impl ConnectorTokenFetcher {
    pub fn new(host: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            host: host.into(),
            identity: identity.into(),
        }
    }

    fn url(&self) -> String {
        format!(
            "https://{}/api/v2/connection?include_secrets=true&connector_names=google-sheet",
            self.host
        )
    }
}

#[async_trait]
impl TokenFetcher for ConnectorTokenFetcher {
    async fn fetch(&self) -> Result<AccessToken, TokenError> {
        let resp = self
            .http
            .get(self.url())
            .header("Accept", "application/json")
            .header("X_REPLIT_TOKEN", &self.identity)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(TokenError::Status(resp.status().as_u16()));
        }
        let body: Value = resp.json().await?;
        token_from_connection(&body)
    }
}

/// Pull the token out of a connector listing. The token sits either at
/// `settings.access_token` or `settings.oauth.credentials.access_token`.
pub fn token_from_connection(body: &Value) -> Result<AccessToken, TokenError> {
    let settings = body
        .get("items")
        .and_then(|items| items.get(0))
        .and_then(|item| item.get("settings"))
        .ok_or_else(|| TokenError::NotConnected("no google-sheet connection".into()))?;

    let value = settings
        .get("access_token")
        .and_then(Value::as_str)
        .or_else(|| settings.pointer("/oauth/credentials/access_token").and_then(Value::as_str))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| TokenError::NotConnected("connection has no access token".into()))?;

    let expires_at = settings
        .get("expires_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(AccessToken { value: value.to_string(), expires_at })
}

/// Choose a token source: an explicit token wins, then the connector.
pub fn token_source_from_settings(
    settings: &SheetsSettings,
) -> Result<Arc<dyn TokenSource>, TokenError> {
    if let Some(token) = settings.access_token.as_ref().filter(|t| !t.is_empty()) {
        return Ok(Arc::new(CachedToken::new(StaticTokenFetcher::new(token.clone()))));
    }
    match (&settings.connector_host, &settings.connector_identity) {
        (Some(host), Some(identity)) => Ok(Arc::new(CachedToken::new(
            ConnectorTokenFetcher::new(host.clone(), identity.clone()),
        ))),
        _ => Err(TokenError::NotConfigured),
    }
}
