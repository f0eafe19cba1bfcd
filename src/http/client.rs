use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderValue, USER_AGENT};
use reqwest::Client;

use crate::config::Settings;
use crate::error::{ApiStepsError, Result};

use super::request::OutgoingRequest;
use super::response::ResponseRecord;

/// Sends a fully built request. Transport failures come back as
/// `TransportError` and are never retried.
#[async_trait]
pub trait RequestDoer: Send + Sync + std::fmt::Debug {
    async fn do_request(&self, request: OutgoingRequest) -> Result<ResponseRecord>;
}

#[derive(Debug, Clone)]
pub struct ReqwestDoer {
    client: Client,
    user_agent: String,
}

impl ReqwestDoer {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| ApiStepsError::ConfigError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, user_agent: settings.user_agent.clone() })
    }

    pub fn with_client(client: Client, user_agent: impl Into<String>) -> Self {
        Self { client, user_agent: user_agent.into() }
    }
}

#[async_trait]
impl RequestDoer for ReqwestDoer {
    async fn do_request(&self, request: OutgoingRequest) -> Result<ResponseRecord> {
        let OutgoingRequest { method, url, mut headers, body } = request;
        if !headers.contains_key(USER_AGENT) {
            if let Ok(value) = HeaderValue::from_str(&self.user_agent) {
                headers.insert(USER_AGENT, value);
            }
        }

        let mut req_builder = self.client.request(method.clone(), url.clone()).headers(headers.clone());
        if !body.is_empty() {
            req_builder = req_builder.body(body.clone());
        }

        tracing::debug!("Sending {} {}", method, url);
        let started = Instant::now();
        let response = req_builder.send().await.map_err(|err| {
            if err.is_timeout() {
                ApiStepsError::TransportError(format!("Request to {url} timed out: {err}"))
            } else {
                ApiStepsError::TransportError(format!("Request to {url} failed: {err}"))
            }
        })?;

        let status = response.status().as_u16();
        let response_headers = response.headers().clone();
        let response_body = response
            .bytes()
            .await
            .map_err(|e| ApiStepsError::TransportError(format!("Failed to read response body: {e}")))?;
        let duration = started.elapsed();
        tracing::debug!("{} {} -> {} in {:?}", method, url, status, duration);

        Ok(ResponseRecord {
            method,
            url: url.to_string(),
            request_headers: headers,
            request_body: body,
            status,
            headers: response_headers,
            body: response_body,
            duration,
        })
    }
}
