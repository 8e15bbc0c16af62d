//! Clients for the external prediction agents.
//!
//! Both agents take `{question, uploads?}` JSON and answer with JSON holding
//! at least a `text` field. Calls are single-shot: failures are returned to
//! the caller as-is.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use stepcase_common::{Error, Result};

use crate::config::AgentEndpoints;

pub const SCREENSHOT_UPLOAD_NAME: &str = "screenshot.png";
pub const SCREENSHOT_UPLOAD_MIME: &str = "image/png";

/// Upstream error bodies are cut to this many characters.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// A file handed to an agent by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    pub data: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub mime: String,
}

impl Upload {
    /// A PNG screenshot the agent fetches from `image_url`.
    pub fn screenshot(image_url: &str) -> Self {
        Self {
            data: image_url.to_string(),
            kind: "url".to_string(),
            name: SCREENSHOT_UPLOAD_NAME.to_string(),
            mime: SCREENSHOT_UPLOAD_MIME.to_string(),
        }
    }
}

/// Request body understood by both agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Always serialized; `null` when there is no question.
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uploads: Vec<Upload>,
}

impl PredictionRequest {
    pub fn screenshot(context: Option<&str>, image_url: &str) -> Self {
        Self {
            question: context.map(str::to_string),
            uploads: vec![Upload::screenshot(image_url)],
        }
    }

    pub fn question(question: &str) -> Self {
        Self {
            question: Some(question.to_string()),
            uploads: Vec::new(),
        }
    }
}

/// Decoded agent response body.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply(serde_json::Value);

impl AgentReply {
    pub fn new(body: serde_json::Value) -> Self {
        Self(body)
    }

    /// The `text` field every agent reply is expected to carry.
    pub fn text(&self) -> Result<&str> {
        self.0
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or(Error::MissingField { field: "text" })
    }
}

/// The two prediction services the pipeline depends on.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Turn one screenshot (plus optional context) into structured text.
    async fn screenshot_to_structure(
        &self,
        context: Option<&str>,
        image_url: &str,
    ) -> Result<AgentReply>;

    /// Turn a serialized project into test cases.
    async fn text_to_test_cases(&self, question: &str) -> Result<AgentReply>;
}

/// [`Agent`] backed by HTTP endpoints.
#[derive(Debug, Clone)]
pub struct HttpAgent {
    client: reqwest::Client,
    endpoints: AgentEndpoints,
}

impl HttpAgent {
    pub fn new(endpoints: AgentEndpoints, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, endpoints })
    }

    async fn post(&self, url: &str, payload: &PredictionRequest) -> Result<AgentReply> {
        debug!("POST {} ({} uploads)", url, payload.uploads.len());

        let resp = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|e| {
                debug!("failed to read error body from {}: {}", url, e);
                String::new()
            });
            warn!("Agent {} returned status {}", url, status);
            return Err(Error::UpstreamStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| Error::UpstreamUnavailable {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let body = serde_json::from_slice(&bytes).map_err(|e| Error::UpstreamBody {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(AgentReply::new(body))
    }
}

#[async_trait]
impl Agent for HttpAgent {
    async fn screenshot_to_structure(
        &self,
        context: Option<&str>,
        image_url: &str,
    ) -> Result<AgentReply> {
        let payload = PredictionRequest::screenshot(context, image_url);
        self.post(&self.endpoints.screenshot_to_structure, &payload).await
    }

    async fn text_to_test_cases(&self, question: &str) -> Result<AgentReply> {
        let payload = PredictionRequest::question(question);
        self.post(&self.endpoints.structure_to_test_cases, &payload).await
    }
}
