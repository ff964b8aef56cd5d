use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Response};
use tracing::debug;

use tally_core::{time::parse_retry_after, RemoteRequest};

/// How the extraction endpoint answered
#[derive(Debug)]
pub enum RemoteReply {
    Failed {
        status: u16,
        retry_after_secs: Option<u64>,
    },
    /// Complete `application/json` body
    Json(Vec<u8>),
    /// Framed stream, still being read
    Stream(Response),
}

pub(crate) fn bearer_headers(token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).context("invalid access token")?,
    );
    Ok(headers)
}

pub(crate) fn retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| parse_retry_after(v, Utc::now()))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().starts_with("application/json"))
}

pub struct RemoteClient {
    http: Client,
    url: String,
    token: String,
}

impl RemoteClient {
    pub fn new(http: Client, url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            token: token.into(),
        }
    }

    pub async fn send(&self, request: &RemoteRequest) -> Result<RemoteReply> {
        let resp = self
            .http
            .post(&self.url)
            .headers(bearer_headers(&self.token)?)
            .json(request)
            .send()
            .await
            .context("chat request")?;

        let status = resp.status();
        debug!(%status, "chat response");
        if !status.is_success() {
            return Ok(RemoteReply::Failed {
                status: status.as_u16(),
                retry_after_secs: retry_after(resp.headers()),
            });
        }
        if is_json(resp.headers()) {
            let body = resp.bytes().await.context("read chat body")?;
            return Ok(RemoteReply::Json(body.to_vec()));
        }
        Ok(RemoteReply::Stream(resp))
    }
}
