//! Bearer token acquisition and caching.
//!
//! QBench issues access tokens through a JWT-bearer grant: the client signs a
//! short-lived HS256 assertion with its secret and exchanges it at the token
//! endpoint. The token is cached and shared by every request; refreshes are
//! serialized so concurrent callers near expiry wait for one exchange instead
//! of each starting their own.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use psq_config::QBenchConfig;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::error::QBenchError;
use crate::http::{HttpRequest, Transport, excerpt};
use crate::retry::{Attempt, RetryPolicy};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// QBench rejects assertions whose lifetime reaches one hour.
const MAX_ASSERTION_LIFETIME_SECS: u64 = 3_300;

/// A cached access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub bearer: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Check if the token is expired or expires within `leeway`.
    ///
    /// `leeway` is capped at half the token's lifetime, so a server that
    /// grants shorter tokens than the configured leeway does not force a
    /// refresh on every request.
    #[must_use]
    pub fn is_near_expiry(&self, leeway: TimeDelta) -> bool {
        self.expires_at <= Utc::now() + self.effective_leeway(leeway)
    }

    fn effective_leeway(&self, leeway: TimeDelta) -> TimeDelta {
        let half_life = (self.expires_at - self.issued_at) / 2;
        leeway.min(half_life.max(TimeDelta::zero()))
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    sub: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Owns the client credentials and the shared token cache.
pub(crate) struct TokenManager {
    token_url: String,
    client_id: String,
    client_secret: String,
    ttl_secs: u64,
    leeway: TimeDelta,
    current: RwLock<Option<AccessToken>>,
    refresh: Mutex<()>,
}

impl TokenManager {
    pub(crate) fn new(config: &QBenchConfig) -> Self {
        let leeway_secs = config.jwt_leeway_secs.unwrap_or_default();
        Self {
            token_url: format!("{}/qbench/oauth2/v1/token", config.base()),
            client_id: config.client_id.trim().to_string(),
            client_secret: config.client_secret.clone(),
            ttl_secs: config.jwt_ttl_secs.unwrap_or(MAX_ASSERTION_LIFETIME_SECS),
            leeway: TimeDelta::seconds(i64::try_from(leeway_secs.min(86_400)).unwrap_or(0)),
            current: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// Cached token if it is still outside the leeway window.
    async fn fresh(&self) -> Option<AccessToken> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|t| !t.is_near_expiry(self.leeway))
            .cloned()
    }

    /// Current bearer token, refreshing it first if needed.
    pub(crate) async fn bearer<T: Transport>(
        &self,
        transport: &T,
        retry: &RetryPolicy,
    ) -> Result<String, QBenchError> {
        if let Some(token) = self.fresh().await {
            return Ok(token.bearer);
        }

        let _gate = self.refresh.lock().await;
        // Another caller may have refreshed while we waited for the gate.
        if let Some(token) = self.fresh().await {
            return Ok(token.bearer);
        }
        Ok(self.exchange(transport, retry).await?.bearer)
    }

    /// Unconditionally obtain a new token.
    pub(crate) async fn force_refresh<T: Transport>(
        &self,
        transport: &T,
        retry: &RetryPolicy,
    ) -> Result<AccessToken, QBenchError> {
        let _gate = self.refresh.lock().await;
        self.exchange(transport, retry).await
    }

    /// Drop the cached token if it is the one the server just rejected.
    pub(crate) async fn invalidate(&self, rejected: &str) {
        let mut current = self.current.write().await;
        if current.as_ref().is_some_and(|t| t.bearer == rejected) {
            tracing::debug!("discarding rejected QBench token");
            *current = None;
        }
    }

    /// Exchange a fresh assertion for a token. Caller holds the refresh gate.
    async fn exchange<T: Transport>(
        &self,
        transport: &T,
        retry: &RetryPolicy,
    ) -> Result<AccessToken, QBenchError> {
        let result = retry
            .run("token exchange", |_| async move {
                let (assertion, assertion_exp) = match self.sign_assertion(Utc::now()) {
                    Ok(signed) => signed,
                    Err(e) => return Attempt::Fatal(e),
                };
                let request = HttpRequest::post(&self.token_url).form(&[
                    ("grant_type", JWT_BEARER_GRANT),
                    ("assertion", &assertion),
                ]);
                match transport.send(request).await {
                    Ok(resp) => match resp.status {
                        200..=299 => match parse_token(&resp.body, assertion_exp) {
                            Ok(token) => Attempt::Done(token),
                            Err(e) => Attempt::Fatal(e),
                        },
                        400 | 401 | 403 => Attempt::Fatal(QBenchError::Authentication(format!(
                            "token endpoint returned {}: {}",
                            resp.status,
                            rejection_reason(&resp.body)
                        ))),
                        429 | 500..=599 => Attempt::Retry {
                            reason: format!("token endpoint returned {}", resp.status),
                            hint: resp.retry_after_secs.map(std::time::Duration::from_secs),
                            unauthorized: false,
                        },
                        status => Attempt::Fatal(QBenchError::Request {
                            status,
                            message: excerpt(&resp.body),
                        }),
                    },
                    Err(e) if e.is_transient() => Attempt::retry(e.to_string()),
                    Err(e) => Attempt::Fatal(QBenchError::Http(e.to_string())),
                }
            })
            .await;

        let mut current = self.current.write().await;
        match result {
            Ok(token) => {
                tracing::debug!(expires_at = %token.expires_at, "obtained QBench access token");
                *current = Some(token.clone());
                Ok(token)
            }
            Err(e) => {
                *current = None;
                Err(e)
            }
        }
    }

    /// Sign the grant assertion; returns it with its `exp` as a timestamp.
    fn sign_assertion(&self, now: DateTime<Utc>) -> Result<(String, DateTime<Utc>), QBenchError> {
        let lifetime = self.ttl_secs.min(MAX_ASSERTION_LIFETIME_SECS);
        let iat = now - self.leeway;
        let exp = iat + TimeDelta::seconds(i64::try_from(lifetime).unwrap_or(0));
        let claims = AssertionClaims {
            sub: &self.client_id,
            iat: iat.timestamp(),
            exp: exp.timestamp(),
        };
        let assertion = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.client_secret.as_bytes()),
        )
        .map_err(|e| QBenchError::Authentication(format!("could not sign assertion: {e}")))?;
        Ok((assertion, exp))
    }
}

fn parse_token(body: &str, assertion_exp: DateTime<Utc>) -> Result<AccessToken, QBenchError> {
    let payload: TokenResponse = serde_json::from_str(body).map_err(|e| QBenchError::Schema {
        context: "token response".into(),
        message: e.to_string(),
    })?;

    if let Some(error) = payload.error {
        let message = payload.error_description.unwrap_or(error);
        return Err(QBenchError::Authentication(message));
    }
    let bearer = payload
        .access_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| QBenchError::Authentication("no access_token in response".into()))?;
    let issued_at = Utc::now();
    let expires_at = payload
        .expires_in
        .filter(|s| *s > 0)
        .map_or(assertion_exp, |s| issued_at + TimeDelta::seconds(s));
    Ok(AccessToken {
        bearer,
        issued_at,
        expires_at,
    })
}

/// `error_description` from an OAuth error body, or the raw body.
fn rejection_reason(body: &str) -> String {
    serde_json::from_str::<TokenResponse>(body)
        .ok()
        .and_then(|p| p.error_description.or(p.error))
        .unwrap_or_else(|| excerpt(body))
}
