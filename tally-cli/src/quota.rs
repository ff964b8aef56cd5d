use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

use tally_core::QuotaVerdict;

use crate::llm::{bearer_headers, retry_after};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConsumeRequest<'a> {
    request_type: &'a str,
    prompt_chars: usize,
}

pub struct QuotaClient {
    http: Client,
    url: String,
    token: String,
}

impl QuotaClient {
    pub fn new(http: Client, url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            token: token.into(),
        }
    }

    /// Consume one unit of quota. Fails open when the service is unreachable.
    pub async fn check(&self, request_type: &str, prompt_chars: usize) -> QuotaVerdict {
        match self.consume(request_type, prompt_chars).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "quota check failed, allowing");
                QuotaVerdict::Allowed
            }
        }
    }

    async fn consume(&self, request_type: &str, prompt_chars: usize) -> Result<QuotaVerdict> {
        let resp = self
            .http
            .post(&self.url)
            .headers(bearer_headers(&self.token)?)
            .json(&ConsumeRequest {
                request_type,
                prompt_chars,
            })
            .send()
            .await
            .context("quota request")?;

        let status = resp.status();
        debug!(%status, request_type, prompt_chars, "quota response");
        match status {
            s if s.is_success() => Ok(QuotaVerdict::Allowed),
            StatusCode::TOO_MANY_REQUESTS | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Ok(QuotaVerdict::Denied {
                    retry_after_secs: retry_after(resp.headers()),
                })
            }
            s => anyhow::bail!("quota service returned {}", s),
        }
    }
}
