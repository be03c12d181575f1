//! Blocking client for the housing and labour-market stats backend.
//!
//! The backend returns flat JSON arrays of records. This module only cares
//! about that record shape, never about a fixed endpoint: paths come from
//! [`DashboardConfig`] or the caller.
//!
//! ### Notes
//! - Transient failures (5xx / network errors) are retried a few times with a
//!   short backoff; 4xx responses fail immediately.
//! - Array elements that are not JSON objects are skipped with a warning.
//!   Objects with odd field types are kept and defaulted later by the normalizer.
//!
//! Typical usage:
//! ```no_run
//! # use metro_growth::{Client, RecordSource};
//! let client = Client::new("http://localhost:8080")?;
//! let records = client.fetch_records("/api/housingStats")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::config::DashboardConfig;
use crate::models::RawStatRecord;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const HOUSING_STATS: &str = "/api/housingStats";
pub const LABOUR_MARKET: &str = "/api/labourMarket";

/// Why a fetch produced no records.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("request failed with HTTP {0}")]
    Status(StatusCode),
    #[error("malformed JSON: {0}")]
    Decode(String),
    #[error("unexpected response shape: {0}")]
    Shape(String),
}

/// Anything that can produce raw records for an endpoint.
pub trait RecordSource {
    fn fetch_records(&self, endpoint: &str) -> Result<Vec<RawStatRecord>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct Client {
    pub base_url: String,
    http: HttpClient,
}

// Census area names may contain spaces, accents and '-'; keep '-', '_', '.' readable.
const SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Sleep before each attempt; the first attempt goes out immediately.
const RETRY_BACKOFF_MS: [u64; 3] = [0, 150, 400];

impl Client {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        Self::with_timeouts(base_url, Duration::from_secs(30), Duration::from_secs(10))
    }

    pub fn with_timeouts(
        base_url: impl Into<String>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .redirect(Policy::limited(5))
            .user_agent(concat!("metro_growth/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self, FetchError> {
        Self::with_timeouts(&config.base_url, config.timeout(), config.connect_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let mut last_err: Option<FetchError> = None;
        for backoff_ms in RETRY_BACKOFF_MS {
            if backoff_ms > 0 {
                log::debug!("retrying GET {} in {}ms", url, backoff_ms);
                std::thread::sleep(Duration::from_millis(backoff_ms));
            }
            match self.http.get(url).send() {
                Ok(r) if r.status().is_success() => {
                    let body = r.text().map_err(FetchError::Network)?;
                    return serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()));
                }
                Ok(r) if r.status().is_server_error() => last_err = Some(FetchError::Status(r.status())),
                Ok(r) => return Err(FetchError::Status(r.status())),
                Err(e) => last_err = Some(FetchError::Network(e)),
            }
        }
        Err(last_err.unwrap_or_else(|| FetchError::Shape(format!("no attempt made for {}", url))))
    }

    fn get_integer(&self, path: &str) -> Result<i64, FetchError> {
        let url = self.url(path);
        match self.get_json(&url)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.round() as i64))
                .ok_or_else(|| FetchError::Shape(format!("not an integer: {}", n))),
            Value::Null => Ok(0),
            other => Err(FetchError::Shape(format!("expected a number, got {}", other))),
        }
    }

    /// All housing records (`GET /api/housingStats`).
    pub fn housing_stats(&self) -> Result<Vec<RawStatRecord>, FetchError> {
        self.fetch_records(HOUSING_STATS)
    }

    /// All labour-market records (`GET /api/labourMarket`).
    pub fn labour_market(&self) -> Result<Vec<RawStatRecord>, FetchError> {
        self.fetch_records(LABOUR_MARKET)
    }

    /// Backend-side sum of total starts for one census area.
    pub fn total_starts_by_area(&self, area: &str) -> Result<i64, FetchError> {
        self.get_integer(&format!("{}/starts/{}", HOUSING_STATS, encode_segment(area)))
    }

    /// Backend-side sum of total completions for one census area.
    pub fn total_complete_by_area(&self, area: &str) -> Result<i64, FetchError> {
        self.get_integer(&format!("{}/Complete/{}", HOUSING_STATS, encode_segment(area)))
    }

    /// Number of housing records stored by the backend.
    pub fn record_count(&self) -> Result<i64, FetchError> {
        self.get_integer(&format!("{}/count", HOUSING_STATS))
    }
}

impl RecordSource for Client {
    fn fetch_records(&self, endpoint: &str) -> Result<Vec<RawStatRecord>, FetchError> {
        let url = self.url(endpoint);
        let v = self.get_json(&url)?;
        let records = records_from_json(v)?;
        log::info!("GET {} returned {} record(s)", url, records.len());
        Ok(records)
    }
}

pub fn encode_segment(s: &str) -> String {
    percent_encoding::utf8_percent_encode(s.trim(), SAFE).to_string()
}

/// Turn a decoded response body into raw records.
///
/// The body must be a JSON array; `null` is read as an empty array.
pub fn records_from_json(v: Value) -> Result<Vec<RawStatRecord>, FetchError> {
    let items = match v {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => {
            let kind = match other {
                Value::Object(_) => "object",
                Value::String(_) => "string",
                Value::Number(_) => "number",
                _ => "boolean",
            };
            return Err(FetchError::Shape(format!("expected a top-level array, got {}", kind)));
        }
    };

    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            log::warn!("skipping element #{}: not a record object", i);
            continue;
        }
        match serde_json::from_value::<RawStatRecord>(item) {
            Ok(r) => out.push(r),
            Err(e) => log::warn!("skipping element #{}: {}", i, e),
        }
    }
    Ok(out)
}
