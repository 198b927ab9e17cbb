//! Service-account token exchange and caching.
//!
//! Authenticates by POSTing a signed JWT-bearer assertion to the token
//! endpoint and caching the returned access token until shortly before it
//! expires. The cache slot is held across the exchange, so concurrent
//! callers that find the token stale produce a single in-flight exchange.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::MailError;
use crate::transport::{HttpRequest, HttpTransport};

/// Default token exchange endpoint.
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are treated as expired this long before the server says so.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Claims carried by the signed token-exchange assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionClaims {
    /// Issuer, the service account identifier.
    pub iss: String,
    /// Subject, the mailbox user being impersonated.
    pub sub: String,
    /// Audience, the token endpoint URL.
    pub aud: String,
    /// Requested OAuth scope.
    pub scope: String,
    /// Issued-at time in Unix seconds.
    pub iat: i64,
    /// Expiry time in Unix seconds.
    pub exp: i64,
}

/// Produces a compact signed assertion from claims.
///
/// Key material and signature algorithms live outside this crate; callers
/// plug in their own signer.
pub trait AssertionSigner: Send + Sync {
    fn sign(&self, claims: &AssertionClaims) -> anyhow::Result<String>;
}

#[derive(Debug, Deserialize)]
struct WireTokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Token cache for the Gmail backend.
pub struct GmailAuth {
    signer: Arc<dyn AssertionSigner>,
    issuer: String,
    subject: String,
    scope: String,
    token_endpoint: String,
    slot: Mutex<Option<CachedToken>>,
}

impl GmailAuth {
    pub fn new(
        signer: Arc<dyn AssertionSigner>,
        issuer: impl Into<String>,
        subject: impl Into<String>,
        scope: impl Into<String>,
        token_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            signer,
            issuer: issuer.into(),
            subject: subject.into(),
            scope: scope.into(),
            token_endpoint: token_endpoint.into(),
            slot: Mutex::new(None),
        }
    }

    /// Returns a valid access token, exchanging a fresh assertion when the
    /// cached one is missing or stale.
    pub async fn access_token(&self, transport: &dyn HttpTransport) -> Result<String, MailError> {
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref() {
            if cached.expires_at > Utc::now() {
                return Ok(cached.access_token.clone());
            }
        }

        let fresh = self.exchange(transport).await?;
        let token = fresh.access_token.clone();
        *slot = Some(fresh);
        Ok(token)
    }

    /// Drops the cached token; the next call exchanges a new assertion.
    pub async fn clear(&self) {
        *self.slot.lock().await = None;
    }

    async fn exchange(&self, transport: &dyn HttpTransport) -> Result<CachedToken, MailError> {
        let now = Utc::now();
        let claims = AssertionClaims {
            iss: self.issuer.clone(),
            sub: self.subject.clone(),
            aud: self.token_endpoint.clone(),
            scope: self.scope.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let assertion = self.signer.sign(&claims).map_err(|err| MailError::Auth {
            message: format!("failed to sign token assertion: {}", err),
            source: Some(err.into()),
        })?;

        let body: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", JWT_BEARER_GRANT)
            .append_pair("assertion", &assertion)
            .finish();
        let request = HttpRequest::post(&self.token_endpoint)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body);

        tracing::debug!(endpoint = %self.token_endpoint, "exchanging assertion for access token");
        let response = transport.execute(request).await?;
        if !response.is_success() {
            return Err(MailError::Auth {
                message: format!(
                    "token exchange failed with status {}: {}",
                    response.status,
                    response.text()
                ),
                source: None,
            });
        }

        let token: WireTokenResponse = response.json().map_err(|err| MailError::Auth {
            message: "token exchange returned an unreadable response".to_string(),
            source: Some(err.into()),
        })?;

        let lifetime = token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
        tracing::debug!(expires_in = lifetime, "obtained access token");

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(lifetime - EXPIRY_MARGIN_SECS),
        })
    }
}
