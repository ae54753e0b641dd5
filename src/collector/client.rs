//! Jolokia HTTP 클라이언트
//!
//! Connection pooling과 타임아웃을 지원하는 비동기 HTTP 클라이언트입니다.

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::parser::{flatten_response, parse_response, CollectResult, RawAttribute};
use super::AttributeSource;
use crate::error::CollectorError;

/// Jolokia HTTP 클라이언트
#[derive(Clone)]
pub struct JolokiaClient {
    client: Client,
    base_url: String,
    timeout_ms: u64,
    auth: Option<(String, String)>,
}

/// Jolokia 요청 구조체
#[derive(Debug, Serialize)]
struct JolokiaRequest<'a> {
    #[serde(rename = "type")]
    request_type: &'static str,
    mbean: &'a str,
}

impl JolokiaClient {
    /// 새 클라이언트 생성
    ///
    /// # Arguments
    /// * `base_url` - Jolokia 엔드포인트 URL (예: "http://localhost:8778/jolokia")
    /// * `timeout_ms` - 기본 타임아웃 (밀리초)
    ///
    /// # Example
    /// ```ignore
    /// let client = JolokiaClient::new("http://localhost:8778/jolokia", 5000)?;
    /// ```
    pub fn new(base_url: &str, timeout_ms: u64) -> CollectResult<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_millis(timeout_ms))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(CollectorError::HttpClientInit)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_ms,
            auth: None,
        })
    }

    /// Basic Auth 설정
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.auth = Some((username.to_string(), password.to_string()));
        self
    }

    /// Read every attribute of the beans matching `pattern`
    #[instrument(skip(self), fields(pattern = %pattern))]
    pub async fn read(&self, pattern: &str) -> CollectResult<Vec<RawAttribute>> {
        let request = JolokiaRequest {
            request_type: "read",
            mbean: pattern,
        };

        debug!("Sending Jolokia read request");

        let mut req = self.client.post(&self.base_url).json(&request);

        if let Some((username, password)) = &self.auth {
            req = req.basic_auth(username, Some(password));
        }

        let response = req.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(CollectorError::AuthenticationFailed);
        }
        if !status.is_success() {
            return Err(CollectorError::HttpStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(CollectorError::HttpResponse)?;

        let parsed = parse_response(&body)?;
        let attributes = flatten_response(&parsed)?;
        debug!(count = attributes.len(), "Jolokia read completed");
        Ok(attributes)
    }

    fn map_send_error(&self, err: reqwest::Error) -> CollectorError {
        if err.is_timeout() {
            CollectorError::timeout_with_duration(self.timeout_ms)
        } else {
            CollectorError::from(err)
        }
    }
}

#[async_trait]
impl AttributeSource for JolokiaClient {
    async fn query(&self, pattern: &str) -> CollectResult<Vec<RawAttribute>> {
        self.read(pattern).await
    }
}
