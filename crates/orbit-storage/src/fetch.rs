//! Paged GET loop against the source API with rate-limit aware retries.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::{header::RETRY_AFTER, StatusCode, Url};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, error, info_span, warn, Instrument};

use crate::clock::Sleeper;

const RETRY_HINT_MARKER: &str = "Expected available in";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseDisposition {
    Success,
    RateLimited,
    HardStop,
}

pub fn classify_status(status: StatusCode) -> ResponseDisposition {
    if status.is_success() {
        ResponseDisposition::Success
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        ResponseDisposition::RateLimited
    } else {
        ResponseDisposition::HardStop
    }
}

/// Extracts the delay from a throttle body such as
/// `"Request was throttled. Expected available in 12 seconds."`.
pub fn parse_retry_hint(body: &str) -> Option<Duration> {
    let idx = body.find(RETRY_HINT_MARKER)?;
    let digits: String = body[idx + RETRY_HINT_MARKER.len()..]
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u64>().ok().map(Duration::from_secs)
}

fn parse_retry_after_header(value: Option<&reqwest::header::HeaderValue>) -> Option<Duration> {
    value?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[derive(Debug, Clone, Copy)]
pub struct FetchPolicy {
    pub transport_retry_delay: Duration,
    pub rate_limit_fallback: Duration,
    /// `None` retries transport failures forever.
    pub max_transport_retries: Option<usize>,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            transport_retry_delay: Duration::from_secs(60),
            rate_limit_fallback: Duration::from_secs(60),
            max_transport_retries: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub policy: FetchPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: None,
            policy: FetchPolicy::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed after {attempts} attempts: {source}")]
    Transport {
        url: String,
        attempts: usize,
        #[source]
        source: reqwest::Error,
    },
    #[error("http status {status} for {url}: {body}")]
    HttpStatus {
        status: u16,
        url: String,
        body: String,
    },
    #[error("malformed page from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("invalid url {url}: {message}")]
    Url { url: String, message: String },
}

/// One decoded page of a `{count, next, results}` listing.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub count: Option<u64>,
    pub results: Vec<JsonValue>,
}

#[derive(Debug)]
pub struct PageFetcher {
    client: reqwest::Client,
    policy: FetchPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl PageFetcher {
    pub fn new(config: HttpClientConfig, sleeper: Arc<dyn Sleeper>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;
        Ok(Self {
            client,
            policy: config.policy,
            sleeper,
        })
    }

    /// Lazily walks every page starting at `start_url`. A fresh call starts over.
    pub fn fetch_all(&self, start_url: &str, page_size: u32) -> PageCursor<'_> {
        PageCursor {
            fetcher: self,
            next_url: Some(start_url.to_string()),
            page_size,
            pages: 0,
        }
    }

    async fn get_json(&self, url: &str) -> Result<JsonValue, FetchError> {
        let mut transport_failures = 0usize;

        loop {
            let resp = match self.client.get(url).send().await {
                Ok(resp) => resp,
                Err(err) => {
                    transport_failures += 1;
                    self.transport_backoff(url, transport_failures, err).await?;
                    continue;
                }
            };

            let status = resp.status();
            match classify_status(status) {
                ResponseDisposition::Success => {
                    let bytes = match resp.bytes().await {
                        Ok(bytes) => bytes,
                        Err(err) => {
                            transport_failures += 1;
                            self.transport_backoff(url, transport_failures, err).await?;
                            continue;
                        }
                    };
                    return serde_json::from_slice(&bytes).map_err(|err| FetchError::Decode {
                        url: url.to_string(),
                        message: err.to_string(),
                    });
                }
                ResponseDisposition::RateLimited => {
                    let header_hint = parse_retry_after_header(resp.headers().get(RETRY_AFTER));
                    let body = resp.text().await.unwrap_or_default();
                    let delay = parse_retry_hint(&body)
                        .or(header_hint)
                        .unwrap_or(self.policy.rate_limit_fallback);
                    warn!(url, delay_secs = delay.as_secs(), "rate limited by source; retrying same page");
                    self.sleeper.sleep(delay).await;
                }
                ResponseDisposition::HardStop => {
                    let body = resp.text().await.unwrap_or_default();
                    error!(url, status = status.as_u16(), "source returned non-success status; abandoning pass");
                    return Err(FetchError::HttpStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                        body,
                    });
                }
            }
        }
    }

    async fn transport_backoff(
        &self,
        url: &str,
        attempts: usize,
        err: reqwest::Error,
    ) -> Result<(), FetchError> {
        if let Some(max) = self.policy.max_transport_retries {
            if attempts > max {
                return Err(FetchError::Transport {
                    url: url.to_string(),
                    attempts,
                    source: err,
                });
            }
        }
        warn!(
            url,
            attempts,
            delay_secs = self.policy.transport_retry_delay.as_secs(),
            error = %err,
            "transport failure; retrying same page"
        );
        self.sleeper.sleep(self.policy.transport_retry_delay).await;
        Ok(())
    }
}

/// Finite, non-restartable walk over the pages of one listing.
#[derive(Debug)]
pub struct PageCursor<'a> {
    fetcher: &'a PageFetcher,
    next_url: Option<String>,
    page_size: u32,
    pages: usize,
}

impl PageCursor<'_> {
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// `Ok(None)` once the listing is exhausted. After an error the cursor is spent.
    pub async fn next_page(&mut self) -> Result<Option<Page>, FetchError> {
        let Some(url) = self.next_url.take() else {
            return Ok(None);
        };

        let span = info_span!("http_fetch", url = %url, page = self.pages + 1);
        let body = self.fetcher.get_json(&url).instrument(span).await?;

        let results = match body.get("results") {
            Some(JsonValue::Array(items)) => items.clone(),
            _ => {
                return Err(FetchError::Decode {
                    url,
                    message: "missing `results` array".to_string(),
                })
            }
        };
        if results.is_empty() {
            debug!(url, "empty page; listing exhausted");
            return Ok(None);
        }

        self.next_url = match body.get("next") {
            Some(JsonValue::String(next)) if !next.is_empty() => Some(next.clone()),
            Some(JsonValue::Null) | Some(JsonValue::String(_)) => None,
            _ => Some(advance_offset(&url, self.page_size)?),
        };
        self.pages += 1;

        Ok(Some(Page {
            count: body.get("count").and_then(JsonValue::as_u64),
            url,
            results,
        }))
    }
}

/// First page URL for an endpoint: sets `limit`, and `offset=0` unless already present.
pub fn start_url(endpoint: &str, page_size: u32) -> Result<String, FetchError> {
    let mut url = Url::parse(endpoint).map_err(|err| FetchError::Url {
        url: endpoint.to_string(),
        message: err.to_string(),
    })?;
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "limit")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.push(("limit".to_string(), page_size.to_string()));
    if !pairs.iter().any(|(k, _)| k == "offset") {
        pairs.push(("offset".to_string(), "0".to_string()));
    }
    url.query_pairs_mut().clear().extend_pairs(pairs);
    Ok(url.to_string())
}

fn advance_offset(current: &str, page_size: u32) -> Result<String, FetchError> {
    let mut url = Url::parse(current).map_err(|err| FetchError::Url {
        url: current.to_string(),
        message: err.to_string(),
    })?;
    let offset = url
        .query_pairs()
        .find(|(k, _)| k == "offset")
        .and_then(|(_, v)| v.parse::<u64>().ok())
        .unwrap_or(0);
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "offset")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.push(("offset".to_string(), (offset + u64::from(page_size)).to_string()));
    url.query_pairs_mut().clear().extend_pairs(pairs);
    Ok(url.to_string())
}
