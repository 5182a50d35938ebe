use std::{fs, path::Path};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_TTL_SECONDS: i64 = 3600;
/// Tokens this close to expiry are exchanged again before use.
const REFRESH_MARGIN_SECONDS: i64 = 60;

/// The subset of a Google service-account JSON key the token exchange needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read credentials file '{}'", path.display()))?;
        serde_json::from_str(&raw).with_context(|| {
            format!(
                "credentials file '{}' is not a service account key",
                path.display()
            )
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AssertionClaims {
    pub(crate) iss: String,
    pub(crate) scope: String,
    pub(crate) aud: String,
    pub(crate) iat: i64,
    pub(crate) exp: i64,
}

pub(crate) fn assertion_claims(key: &ServiceAccountKey, now: DateTime<Utc>) -> AssertionClaims {
    AssertionClaims {
        iss: key.client_email.clone(),
        scope: SHEETS_SCOPE.to_string(),
        aud: key.token_uri.clone(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ASSERTION_TTL_SECONDS)).timestamp(),
    }
}

pub fn sign_assertion(
    key: &ServiceAccountKey,
    now: DateTime<Utc>,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(Algorithm::RS256),
        &assertion_claims(key, now),
        &EncodingKey::from_rsa_pem(key.private_key.as_bytes())?,
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    #[serde(default = "default_expires_in")]
    pub(crate) expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_TTL_SECONDS
}

pub(crate) async fn exchange_assertion(
    client: &Client,
    token_uri: &str,
    assertion: &str,
) -> Result<TokenResponse> {
    client
        .post(token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)])
        .send()
        .await
        .with_context(|| format!("token endpoint '{token_uri}' unreachable"))?
        .error_for_status()
        .context("token exchange rejected; check the service account key")?
        .json()
        .await
        .context("token endpoint returned an unexpected body")
}

#[derive(Debug, Clone)]
pub(crate) struct CachedToken {
    pub(crate) access_token: String,
    pub(crate) expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub(crate) fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECONDS) < self.expires_at
    }
}

pub enum SheetsAuth {
    /// A pre-issued access token, sent as is.
    Bearer(String),
    ServiceAccount {
        key: ServiceAccountKey,
        cached: Mutex<Option<CachedToken>>,
    },
}

impl SheetsAuth {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(token.into())
    }

    pub fn service_account(key: ServiceAccountKey) -> Self {
        Self::ServiceAccount {
            key,
            cached: Mutex::new(None),
        }
    }

    pub async fn access_token(&self, client: &Client) -> Result<String> {
        let (key, cached) = match self {
            Self::Bearer(token) => return Ok(token.clone()),
            Self::ServiceAccount { key, cached } => (key, cached),
        };

        let mut guard = cached.lock().await;
        let now = Utc::now();
        if let Some(token) = guard.as_ref().filter(|token| token.is_fresh(now)) {
            debug!("reusing cached sheets access token");
            return Ok(token.access_token.clone());
        }

        let assertion =
            sign_assertion(key, now).context("failed to sign service account assertion")?;
        let response = exchange_assertion(client, &key.token_uri, &assertion).await?;
        info!(
            client_email = %key.client_email,
            expires_in = response.expires_in,
            "obtained sheets access token"
        );
        let token = CachedToken {
            access_token: response.access_token,
            expires_at: now + Duration::seconds(response.expires_in),
        };
        let access_token = token.access_token.clone();
        *guard = Some(token);
        Ok(access_token)
    }
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;
