//! Request/response client for the authoritative remote store.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::record::{decode_remote_records, RemoteRecord};
use crate::models::{Item, ItemId, RemoteList, RemoteSnapshot};
use crate::util::{compact_text, is_http_url, normalize_text_option};

const REMOTE_HTTP_TIMEOUT_SECS: u64 = 10;
const READING_LIST_PATH: &str = "/v1/reading-list";

/// Authoritative store holding per-item progress (async)
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Fetch the full identity -> progress table
    async fn fetch_all(&self) -> Result<RemoteList>;

    /// Ask the store to persist one item's progress
    async fn set(&self, id: ItemId, item: &Item) -> Result<()>;
}

/// HTTP implementation of `RemoteStore`
#[derive(Clone)]
pub struct HttpRemoteStore {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpRemoteStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpRemoteStore")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REMOTE_HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|error| Error::remote("failed to build HTTP client", error))?;
        Ok(Self {
            base_url,
            token: normalize_text_option(token),
            client,
        })
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}{READING_LIST_PATH}{suffix}", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::remote(context, parse_api_error(status, &body)))
    }
}

impl RemoteStore for HttpRemoteStore {
    async fn fetch_all(&self) -> Result<RemoteList> {
        let response = self
            .authorize(self.client.get(self.url("")))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let response = Self::check(response, "remote fetch failed").await?;

        let records = response
            .json::<BTreeMap<String, RemoteRecord>>()
            .await
            .map_err(|error| Error::remote("invalid remote payload", error))?;
        let list = decode_remote_records(records)?;
        tracing::debug!("Fetched {} remote items", list.len());
        Ok(list)
    }

    async fn set(&self, id: ItemId, item: &Item) -> Result<()> {
        let record = RemoteSnapshot::from_item(item).to_record();
        let response = self
            .authorize(self.client.put(self.url(&format!("/{id}"))))
            .json(&record)
            .send()
            .await?;
        Self::check(response, &format!("remote set for item {id} failed")).await?;
        tracing::debug!("Pushed item {} to remote", id);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<RemoteErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let base_url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Config("remote URL must not be empty".to_string()))?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(
            "remote URL must include http:// or https://".to_string(),
        ))
    }
}
