//! Upstream access token: credential exchange and in-process caching.

use crate::clock::Clock;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// How long a token is handed out after it was issued.
///
/// The upstream credential is valid for 15 minutes; caching for 14 keeps a
/// token from expiring while a request is in flight.
pub const TOKEN_CACHE_TTL_SECS: i64 = 14 * 60;

/// Safety margin kept below the lifetime the upstream reports.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A bearer credential for the upstream API.
#[derive(Clone, Debug, PartialEq)]
pub struct AccessToken {
    pub token_type: String,
    pub access_token: String,
    pub issued_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl AccessToken {
    /// Value for the `Authorization` header, e.g. `BEARER abc123`.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    /// True while the token may still be handed out.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.issued_at + self.ttl
    }
}

/// Credential exchange response.
#[derive(Deserialize, Debug)]
struct TokenResponse {
    token_type: String,
    access_token: String,
    #[serde(default, deserialize_with = "deserialize_expires_in")]
    expires_in: Option<i64>,
}

/// `expires_in` arrives either as a number or as a numeric string.
fn deserialize_expires_in<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ExpiresIn {
        Seconds(i64),
        Text(String),
    }

    Ok(match Option::<ExpiresIn>::deserialize(deserializer)? {
        Some(ExpiresIn::Seconds(secs)) => Some(secs),
        Some(ExpiresIn::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}

/// Cache lifetime for a token the upstream says lives `expires_in` seconds.
fn cache_ttl(expires_in: Option<i64>) -> Duration {
    let secs = match expires_in {
        Some(lifetime) => lifetime
            .saturating_sub(EXPIRY_MARGIN_SECS)
            .clamp(0, TOKEN_CACHE_TTL_SECS),
        None => TOKEN_CACHE_TTL_SECS,
    };
    Duration::seconds(secs)
}

/// Obtains and caches the upstream access token.
///
/// Holds at most one token. The cache lock is never held across an await, so
/// two callers racing past an expired token may both exchange; the last one
/// to finish wins the cache.
pub struct TokenManager {
    http_client: reqwest::Client,
    token_url: String,
    client_id: String,
    clock: Arc<dyn Clock>,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenManager {
    pub fn new(
        http_client: reqwest::Client,
        token_url: String,
        client_id: String,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            http_client,
            token_url,
            client_id,
            clock,
            cached: Mutex::new(None),
        }
    }

    /// Returns the cached token, exchanging for a new one once it has aged out.
    ///
    /// Returns `None` when the exchange fails; the failure is logged and the
    /// caller treats it as a failed attempt.
    pub async fn get_token(&self) -> Option<AccessToken> {
        let now = self.clock.now();
        if let Some(token) = self.cached_token(now) {
            return Some(token);
        }

        match self.exchange(now).await {
            Ok(token) => {
                *self.cache() = Some(token.clone());
                Some(token)
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Access token exchange failed");
                None
            }
        }
    }

    /// Drops the cached token so the next `get_token` exchanges again.
    pub fn invalidate(&self) {
        if self.cache().take().is_some() {
            debug!("Cached access token invalidated");
        }
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, Option<AccessToken>> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached_token(&self, now: DateTime<Utc>) -> Option<AccessToken> {
        self.cache().as_ref().filter(|t| t.is_fresh(now)).cloned()
    }

    async fn exchange(&self, issued_at: DateTime<Utc>) -> Result<AccessToken> {
        let form = [
            ("grant_type", "assertion"),
            ("assertion_type", "public"),
            ("client_id", self.client_id.as_str()),
        ];

        debug!(token_url = %self.token_url, "Requesting access token");

        let response = self
            .http_client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .context("Failed to send token request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            return Err(anyhow!("Token request failed with status {}: {}", status, body));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        let ttl = cache_ttl(token_response.expires_in);
        info!(
            expires_in = ?token_response.expires_in,
            cache_ttl_secs = ttl.num_seconds(),
            "Obtained access token"
        );

        Ok(AccessToken {
            token_type: token_response.token_type,
            access_token: token_response.access_token,
            issued_at,
            ttl,
        })
    }

    #[cfg(test)]
    pub(crate) fn seed(&self, token: AccessToken) {
        *self.cache() = Some(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::ManualClock;
    use chrono::TimeZone;
    use mockito::Matcher;

    const TOKEN_BODY: &str = r#"{
        "access_token": "0123456789abcdef0123456789abcdef",
        "expires_in": "900",
        "scope": "AUTHZ_PUBLIC-INSECURE",
        "token_type": "BEARER"
    }"#;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 1, 1, 12, 0, 0).unwrap()
    }

    fn make_manager(server: &mockito::Server, clock: Arc<ManualClock>) -> TokenManager {
        TokenManager::new(
            reqwest::Client::new(),
            format!("{}/token", server.url()),
            "WDPRO-MOBILE.MDX.WDW.ANDROID-PROD".to_string(),
            clock,
        )
    }

    #[test]
    fn test_cache_ttl() {
        assert_eq!(cache_ttl(None), Duration::minutes(14));
        assert_eq!(cache_ttl(Some(900)), Duration::minutes(14));
        assert_eq!(cache_ttl(Some(3600)), Duration::minutes(14));
        assert_eq!(cache_ttl(Some(300)), Duration::minutes(4));
        assert_eq!(cache_ttl(Some(10)), Duration::zero());
    }

    #[test]
    fn test_cache_ttl_extreme_lifetimes() {
        assert_eq!(cache_ttl(Some(i64::MIN)), Duration::zero());
        assert_eq!(cache_ttl(Some(i64::MAX)), Duration::minutes(14));
    }

    #[test]
    fn test_token_response_expires_in_formats() {
        let text: TokenResponse = serde_json::from_str(TOKEN_BODY).unwrap();
        assert_eq!(text.expires_in, Some(900));

        let number: TokenResponse = serde_json::from_str(
            r#"{"access_token": "a", "token_type": "BEARER", "expires_in": 900}"#,
        )
        .unwrap();
        assert_eq!(number.expires_in, Some(900));

        let missing: TokenResponse =
            serde_json::from_str(r#"{"access_token": "a", "token_type": "BEARER"}"#).unwrap();
        assert_eq!(missing.expires_in, None);
    }

    #[tokio::test]
    async fn test_get_token_sends_fixed_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "assertion".into()),
                Matcher::UrlEncoded("assertion_type".into(), "public".into()),
                Matcher::UrlEncoded(
                    "client_id".into(),
                    "WDPRO-MOBILE.MDX.WDW.ANDROID-PROD".into(),
                ),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(TOKEN_BODY)
            .create_async()
            .await;

        let manager = make_manager(&server, Arc::new(ManualClock::new(start())));
        let token = manager.get_token().await.unwrap();

        assert_eq!(
            token.authorization(),
            "BEARER 0123456789abcdef0123456789abcdef"
        );
        assert_eq!(token.issued_at, start());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_token_cached_until_ttl() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(TOKEN_BODY)
            .expect(2)
            .create_async()
            .await;

        let clock = Arc::new(ManualClock::new(start()));
        let manager = make_manager(&server, Arc::clone(&clock));

        manager.get_token().await.unwrap();
        clock.advance(Duration::minutes(13) + Duration::seconds(59));
        manager.get_token().await.unwrap();

        // 14 minutes after issue the cached token is no longer handed out
        clock.advance(Duration::seconds(1));
        let refreshed = manager.get_token().await.unwrap();
        assert_eq!(refreshed.issued_at, start() + Duration::minutes(14));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalidate_forces_exchange() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(TOKEN_BODY)
            .expect(2)
            .create_async()
            .await;

        let manager = make_manager(&server, Arc::new(ManualClock::new(start())));
        manager.get_token().await.unwrap();
        manager.invalidate();
        manager.get_token().await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_exchange_failure_returns_none() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .with_status(503)
            .with_body("unavailable")
            .expect(2)
            .create_async()
            .await;

        let manager = make_manager(&server, Arc::new(ManualClock::new(start())));
        assert!(manager.get_token().await.is_none());
        // Nothing was cached, so the next call tries again
        assert!(manager.get_token().await.is_none());

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unparseable_token_body_returns_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"unexpected": true}"#)
            .create_async()
            .await;

        let manager = make_manager(&server, Arc::new(ManualClock::new(start())));
        assert!(manager.get_token().await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_token_endpoint_returns_none() {
        let manager = TokenManager::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/token".to_string(),
            "client".to_string(),
            Arc::new(ManualClock::new(start())),
        );
        assert!(manager.get_token().await.is_none());
    }
}
