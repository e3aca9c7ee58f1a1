//! HTTP gateway client
//!
//! All outbound traffic goes through a single provider gateway that proxies
//! the catalog site and returns auto-parsed JSON. This module builds the
//! HTTP client, constructs gateway requests, and classifies failures into
//! the `ClientError` taxonomy.

use crate::client::payload::{parse_detail_payload, parse_search_payload};
use crate::client::{ClientError, ItemDetail, PriceTieBreak, SearchPage};
use crate::config::GatewayConfig;
use crate::SiftError;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Connect timeout for all gateway calls
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-request timeout for detail calls
const DETAIL_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-request timeout for search calls; the provider renders a whole
/// result page before answering
const SEARCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the external search/detail gateway
pub struct GatewayClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    catalog_base_url: String,
    country_code: String,
    tie_break: PriceTieBreak,
}

impl GatewayClient {
    /// Creates a gateway client from validated configuration
    pub fn new(config: &GatewayConfig, tie_break: PriceTieBreak) -> Result<Self, SiftError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("catalog-sift/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            catalog_base_url: config.catalog_base_url.clone(),
            country_code: config.country_code.clone(),
            tie_break,
        })
    }

    /// Issues one search call for a keyword page and normalizes the result
    pub async fn search(&self, keyword: &str, page: u32) -> Result<SearchPage, ClientError> {
        let target = format!(
            "{}/s?k={}&page={}",
            self.catalog_base_url,
            urlencode(keyword),
            page
        );
        debug!(keyword, page, "search call");
        let payload = self.get_json(&target, SEARCH_TIMEOUT).await?;
        Ok(parse_search_payload(&payload, self.tie_break))
    }

    /// Fetches one item's detail payload and parses its specification
    pub async fn fetch_detail(&self, external_ref: &str) -> Result<ItemDetail, ClientError> {
        let target = format!("{}/dp/{}", self.catalog_base_url, external_ref);
        debug!(external_ref, "detail call");
        let payload = self.get_json(&target, DETAIL_TIMEOUT).await?;
        parse_detail_payload(external_ref, &payload)
    }

    /// Performs one gateway GET and classifies the outcome
    async fn get_json(&self, target: &str, timeout: Duration) -> Result<Value, ClientError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("url", target),
                ("output_format", "json"),
                ("autoparse", "true"),
                ("country_code", self.country_code.as_str()),
            ])
            .timeout(timeout)
            .send()
            .await
            .map_err(|error| classify_request_error(&error, target))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            warn!(%status, target, "provider blocked the call");
            return Err(ClientError::AccessDenied {
                status: status.as_u16(),
            });
        }
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(ClientError::Transient(format!(
                "HTTP {} for {}",
                status, target
            )));
        }
        if !status.is_success() {
            return Err(ClientError::Permanent(format!(
                "HTTP {} for {}",
                status, target
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|error| ClientError::Transient(format!("body read failed: {}", error)))?;
        serde_json::from_str(&body).map_err(|error| {
            ClientError::Permanent(format!("malformed JSON for {}: {}", target, error))
        })
    }
}

/// Maps reqwest send errors onto the taxonomy
fn classify_request_error(error: &reqwest::Error, target: &str) -> ClientError {
    if error.is_timeout() {
        ClientError::Transient(format!("request timeout for {}", target))
    } else if error.is_connect() {
        ClientError::Transient(format!("connection failed for {}", target))
    } else {
        ClientError::Transient(format!("request failed for {}: {}", target, error))
    }
}

/// Minimal percent-encoding for keyword query values
fn urlencode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            b' ' => encoded.push('+'),
            other => encoded.push_str(&format!("%{:02X}", other)),
        }
    }
    encoded
}
