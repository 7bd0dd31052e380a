use crate::clock::Sleeper;
use crate::orchestrator::UpstreamSource;
use crate::token::TokenManager;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use themepark_times::ScheduleEntry;
use tracing::{debug, warn};

pub const ACCEPT: &str = "application/json;apiversion=1;charset=UTF-8";

/// Attempts per request before giving up.
pub const MAX_ATTEMPTS: u32 = 5;

/// Experience entry from the wait-times endpoint.
///
/// Also accepts the canonical `statusInfo` name, so stored experiences can be
/// fed back through the transformer unchanged.
#[derive(Debug, Clone, Deserialize)]
pub struct RawExperience {
    /// Composite id, e.g. `12345678;entityType=Attraction`.
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub experience_type: String,
    #[serde(rename = "waitTime", alias = "statusInfo", default)]
    pub wait_time: Value,
}

#[derive(Debug, Deserialize)]
struct WaitTimesResponse {
    #[serde(default)]
    entries: Vec<RawExperience>,
}

/// Payload of the schedules endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RawParkSchedule {
    pub id: String,
    pub name: String,
    #[serde(rename = "iSO8601TimeZone")]
    pub iso8601_time_zone: String,
    #[serde(default)]
    pub schedules: Vec<ScheduleEntry>,
}

/// Delay before the attempt following failed attempt `attempt` (1-based):
/// `attempt^4 / 100` seconds.
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(u64::from(attempt).pow(4) * 10)
}

/// Authenticated client for the park data API.
///
/// Every call goes through [`ApiClient::request`], which owns the single
/// retry policy: up to [`MAX_ATTEMPTS`] attempts, token invalidation on 401
/// and [`backoff_delay`] after any other failure. Exhausted retries come back
/// as `None`, never as an error.
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenManager>,
    sleeper: Arc<dyn Sleeper>,
}

impl ApiClient {
    pub fn new(
        http_client: reqwest::Client,
        base_url: String,
        tokens: Arc<TokenManager>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            http_client,
            base_url,
            tokens,
            sleeper,
        }
    }

    /// GETs `endpoint` and returns the decoded JSON body of the first 200 response.
    pub async fn request(&self, endpoint: &str, query: &[(&str, &str)]) -> Option<Value> {
        let url = format!("{}{}", self.base_url, endpoint);

        for attempt in 1..=MAX_ATTEMPTS {
            let token = match self.tokens.get_token().await {
                Some(token) => token,
                None => {
                    warn!(%endpoint, attempt, "No access token available");
                    self.back_off(attempt).await;
                    continue;
                }
            };

            let result = self
                .http_client
                .get(&url)
                .query(query)
                .header("Accept", ACCEPT)
                .header("Authorization", token.authorization())
                .send()
                .await;

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    warn!(%endpoint, attempt, error = %e, "Request failed");
                    self.back_off(attempt).await;
                    continue;
                }
            };

            match response.status() {
                StatusCode::OK => match response.json::<Value>().await {
                    Ok(body) => {
                        debug!(%endpoint, attempt, "Request succeeded");
                        return Some(body);
                    }
                    Err(e) => {
                        warn!(%endpoint, attempt, error = %e, "Failed to decode response body");
                        self.back_off(attempt).await;
                    }
                },
                StatusCode::UNAUTHORIZED => {
                    warn!(%endpoint, attempt, "Access token rejected, refreshing");
                    self.tokens.invalidate();
                }
                status => {
                    warn!(%endpoint, attempt, %status, "Unexpected response status");
                    self.back_off(attempt).await;
                }
            }
        }

        warn!(%endpoint, attempts = MAX_ATTEMPTS, "Giving up after retries");
        None
    }

    async fn back_off(&self, attempt: u32) {
        let delay = backoff_delay(attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "Backing off");
        self.sleeper.sleep(delay).await;
    }

    /// GETs `endpoint` and decodes the body into `T`.
    ///
    /// A body of the wrong shape is logged and reported as no data.
    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Option<T> {
        let body = self.request(endpoint, query).await?;
        match serde_json::from_value(body) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(%endpoint, error = %e, "Unexpected response payload");
                None
            }
        }
    }
}

#[async_trait]
impl UpstreamSource for ApiClient {
    async fn fetch_experiences(&self, park_id: &str) -> Option<Vec<RawExperience>> {
        let endpoint = format!("/facility-service/theme-parks/{}/wait-times", park_id);
        self.fetch::<WaitTimesResponse>(&endpoint, &[])
            .await
            .map(|response| response.entries)
    }

    async fn fetch_park_schedule(&self, park_id: &str) -> Option<RawParkSchedule> {
        // Zero days ahead: only the park's current local day
        let endpoint = format!("/facility-service/schedules/{}", park_id);
        self.fetch(&endpoint, &[("days", "0")]).await
    }
}
