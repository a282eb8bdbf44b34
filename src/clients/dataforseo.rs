//! DataForSEO Google Ads search-volume client.
//!
//! Endpoint: `POST /v3/keywords_data/google_ads/search_volume/live`, HTTP Basic
//! auth, one task per request. The API reports most failures inside a 200
//! response through task-level status codes (20000 is success), so both the
//! HTTP status and the task status are classified.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::credentials::Credential;
use crate::models::keyword::normalize;
use crate::models::{KeywordMetrics, Source, Topic};
use crate::services::heuristic;

const LIVE_ENDPOINT: &str = "v3/keywords_data/google_ads/search_volume/live";
const TASK_OK: u32 = 20_000;
const MAX_PROVIDER_RELATED: usize = 5;

/// Keywords accepted by a single live search-volume task.
pub const MAX_SEEDS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    /// The HTTP client could not be constructed.
    TransportUnavailable,
    Timeout,
    InvalidCredential,
    RateLimited,
    InsufficientBalance,
    Connection,
    MalformedResponse,
    Http,
}

impl ProviderErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TransportUnavailable => "transport_unavailable",
            Self::Timeout => "timeout",
            Self::InvalidCredential => "invalid_credential",
            Self::RateLimited => "rate_limited",
            Self::InsufficientBalance => "insufficient_balance",
            Self::Connection => "connection",
            Self::MalformedResponse => "malformed_response",
            Self::Http => "http",
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TransportUnavailable => "HTTP transport unavailable",
            Self::Timeout => "request timed out",
            Self::InvalidCredential => "invalid API credentials",
            Self::RateLimited => "rate limit exceeded",
            Self::InsufficientBalance => "insufficient account balance",
            Self::Connection => "network connection failed",
            Self::MalformedResponse => "malformed response",
            Self::Http => "HTTP error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::MalformedResponse, message)
    }

    /// What the user can do about it.
    #[must_use]
    pub const fn hints(&self) -> &'static [&'static str] {
        match self.kind {
            ProviderErrorKind::TransportUnavailable => {
                &["The HTTP client failed to initialise; check TLS support on this system."]
            }
            ProviderErrorKind::Timeout => &[
                "Check your internet connection.",
                "The provider may be slow right now; try again in a few moments.",
            ],
            ProviderErrorKind::InvalidCredential => &[
                "Verify the format is 'login:password' (or its Base64 encoding).",
                "Check the credentials in the DataForSEO dashboard: https://app.dataforseo.com/",
                "Make sure the account is active and the value has no stray spaces.",
            ],
            ProviderErrorKind::RateLimited => &[
                "Wait a few minutes before trying again.",
                "Repeated queries are served from the cache.",
            ],
            ProviderErrorKind::InsufficientBalance => &[
                "Add credits: https://app.dataforseo.com/billing",
                "Check the current balance in the dashboard.",
            ],
            ProviderErrorKind::Connection => &[
                "Check your internet connection.",
                "Verify https://api.dataforseo.com is reachable and not blocked by a firewall or VPN.",
            ],
            ProviderErrorKind::MalformedResponse | ProviderErrorKind::Http => {
                &["Report this if it keeps happening."]
            }
        }
    }
}

/// Remote source of keyword metrics.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    async fn fetch(
        &self,
        topic: &Topic,
        count: usize,
        credential: &Credential,
    ) -> Result<Vec<KeywordMetrics>, ProviderError>;
}

#[derive(Debug, Serialize)]
struct LiveRequest<'a> {
    keywords: &'a [String],
    location_code: u32,
    language_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct LiveResponse {
    status_code: Option<u32>,
    status_message: Option<String>,
    #[serde(default)]
    tasks: Option<Vec<Task>>,
}

#[derive(Debug, Deserialize)]
struct Task {
    status_code: Option<u32>,
    status_message: Option<String>,
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct KeywordItem {
    keyword: Option<String>,
    search_volume: Option<f64>,
    keyword_difficulty: Option<f64>,
    competition_index: Option<f64>,
    competition: Option<Competition>,
    cpc: Option<f64>,
    #[serde(default)]
    related_keywords: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Competition {
    Ratio(f64),
    Level(String),
}

#[derive(Clone)]
pub struct DataForSeoClient {
    client: Option<Client>,
    base_url: String,
    location_code: u32,
    language_code: String,
}

impl DataForSeoClient {
    #[must_use]
    pub fn new(config: &ProviderConfig) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| warn!(error = %e, "Failed to build HTTP client"))
            .ok();

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            location_code: config.location_code,
            language_code: config.language_code.clone(),
        }
    }
}

#[async_trait]
impl MetricsProvider for DataForSeoClient {
    async fn fetch(
        &self,
        topic: &Topic,
        count: usize,
        credential: &Credential,
    ) -> Result<Vec<KeywordMetrics>, ProviderError> {
        let client = self.client.as_ref().ok_or_else(|| {
            ProviderError::new(
                ProviderErrorKind::TransportUnavailable,
                "HTTP client could not be constructed",
            )
        })?;

        let wanted = seed_count(count);
        let seeds: Vec<String> = heuristic::variations(topic, wanted)
            .into_iter()
            .take(wanted)
            .collect();
        let payload = [LiveRequest {
            keywords: &seeds,
            location_code: self.location_code,
            language_code: &self.language_code,
        }];

        let url = format!("{}/{LIVE_ENDPOINT}", self.base_url);
        debug!(seeds = seeds.len(), "Requesting keyword metrics");

        let response = client
            .post(&url)
            .basic_auth(credential.login(), Some(credential.password()))
            .json(&payload)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        let body = response.text().await.map_err(classify_transport_error)?;
        parse_response(&body, count)
    }
}

/// Twice the requested count, capped at what one live task accepts.
fn seed_count(count: usize) -> usize {
    count.saturating_mul(2).min(MAX_SEEDS)
}

fn classify_transport_error(err: reqwest::Error) -> ProviderError {
    let kind = if err.is_timeout() {
        ProviderErrorKind::Timeout
    } else if err.is_connect() {
        ProviderErrorKind::Connection
    } else if err.is_decode() {
        ProviderErrorKind::MalformedResponse
    } else if err.is_builder() {
        ProviderErrorKind::TransportUnavailable
    } else {
        ProviderErrorKind::Connection
    };
    ProviderError::new(kind, err.to_string())
}

fn classify_status(status: StatusCode) -> ProviderError {
    let kind = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderErrorKind::InvalidCredential,
        StatusCode::PAYMENT_REQUIRED => ProviderErrorKind::InsufficientBalance,
        StatusCode::TOO_MANY_REQUESTS => ProviderErrorKind::RateLimited,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ProviderErrorKind::Timeout,
        _ => ProviderErrorKind::Http,
    };
    ProviderError::new(kind, format!("HTTP {status}"))
}

/// Maps a DataForSEO status code (HTTP-style or five-digit task code) onto a
/// failure kind. `None` means the code is not one of the recognised failures.
fn classify_api_status(code: u32) -> Option<ProviderErrorKind> {
    match code {
        401 | 40_100..=40_199 => Some(ProviderErrorKind::InvalidCredential),
        429 | 40_202 | 42_900..=42_999 => Some(ProviderErrorKind::RateLimited),
        402 | 40_200..=40_299 => Some(ProviderErrorKind::InsufficientBalance),
        _ => None,
    }
}

/// Normalizes a live-endpoint body into keyword metrics.
///
/// Returns at most `count * 2` entries, phrases normalized and de-duplicated.
pub fn parse_response(body: &str, count: usize) -> Result<Vec<KeywordMetrics>, ProviderError> {
    let response: LiveResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::malformed(e.to_string()))?;

    if let Some(code) = response.status_code
        && code != 200
        && code != TASK_OK
    {
        let message = response
            .status_message
            .unwrap_or_else(|| "Unknown error".to_string());
        if let Some(kind) = classify_api_status(code) {
            return Err(ProviderError::new(kind, format!("status {code}: {message}")));
        }
        warn!(code, %message, "Provider returned non-OK status, checking tasks anyway");
    }

    let tasks = response
        .tasks
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ProviderError::malformed("no tasks in response"))?;

    for task in tasks {
        let code = task.status_code.unwrap_or_default();
        if code != TASK_OK {
            let message = task
                .status_message
                .unwrap_or_else(|| "Unknown error".to_string());
            if let Some(kind) = classify_api_status(code) {
                return Err(ProviderError::new(kind, format!("task status {code}: {message}")));
            }
            warn!(code, %message, "Provider task failed");
            continue;
        }

        let items = match task.result {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Object(_) => vec![task.result],
            _ => Vec::new(),
        };

        let metrics = normalize_items(items, count.saturating_mul(2));
        if metrics.is_empty() {
            warn!("Provider task succeeded without usable results");
            continue;
        }
        return Ok(metrics);
    }

    Err(ProviderError::malformed("no usable keyword results in response"))
}

fn normalize_items(items: Vec<serde_json::Value>, limit: usize) -> Vec<KeywordMetrics> {
    let mut seen = HashSet::new();

    items
        .into_iter()
        .filter_map(|value| serde_json::from_value::<KeywordItem>(value).ok())
        .filter_map(|item| {
            let phrase = normalize(item.keyword.as_deref().unwrap_or_default());
            if phrase.is_empty() || !seen.insert(phrase.clone()) {
                return None;
            }

            let difficulty = difficulty_from(&item);
            let related = item
                .related_keywords
                .unwrap_or_default()
                .into_iter()
                .map(|r| normalize(&r))
                .filter(|r| !r.is_empty())
                .take(MAX_PROVIDER_RELATED)
                .collect();

            Some(KeywordMetrics {
                phrase,
                search_volume: non_negative(item.search_volume.unwrap_or_default()),
                difficulty,
                relevance: None,
                related,
                source: Source::Provider,
            })
        })
        .take(limit)
        .collect()
}

/// Direct difficulty first, then the 0-100 competition index, then a 0-1
/// competition ratio, then the coarse competition level blended with CPC.
fn difficulty_from(item: &KeywordItem) -> u8 {
    if let Some(direct) = item.keyword_difficulty {
        return to_percent(direct);
    }
    if let Some(index) = item.competition_index {
        return to_percent(index);
    }

    match &item.competition {
        Some(Competition::Ratio(ratio)) => to_percent(ratio * 100.0),
        Some(Competition::Level(level)) => {
            let base = match level.to_uppercase().as_str() {
                "HIGH" => 75.0,
                "LOW" => 25.0,
                _ => 50.0,
            };
            let cpc = item.cpc.unwrap_or_default().max(0.0);
            to_percent(base * 0.7 + (cpc * 5.0).min(30.0))
        }
        None => 50,
    }
}

fn to_percent(value: f64) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pct = value.round().clamp(0.0, 100.0) as u8;
    pct
}

fn non_negative(value: f64) -> u64 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let v = value.round().max(0.0) as u64;
    v
}
