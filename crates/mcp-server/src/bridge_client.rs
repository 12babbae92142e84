use crate::config::ProxyConfig;
use async_trait::async_trait;
use gdbridge_protocol::{
    ErrorEnvelope, ErrorsReport, LogBody, PhaseState, PhaseUpdate, RunBody, StatusReport,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

/// Failure talking to the bridge. Never retried.
#[derive(Debug, Error)]
pub enum BridgeCallError {
    #[error("Editor did not answer {path} within {timeout_ms} ms")]
    NotResponding { path: String, timeout_ms: u64 },

    #[error("Editor bridge unreachable at {url}: {message}")]
    Unreachable { url: String, message: String },

    #[error("Bridge answered {path} with HTTP {status}")]
    Status {
        path: String,
        status: u16,
        body: Value,
    },

    #[error("Bridge request {path} failed: {message}")]
    Transport { path: String, message: String },

    #[error("Unexpected bridge response for {path}: {message}")]
    InvalidResponse { path: String, message: String },
}

impl BridgeCallError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotResponding { .. } => "editor_not_responding",
            Self::Unreachable { .. } => "editor_unreachable",
            Self::Status { .. } => "bridge_error",
            Self::Transport { .. } => "bridge_transport_error",
            Self::InvalidResponse { .. } => "bridge_invalid_response",
        }
    }

    pub fn to_envelope(&self) -> ErrorEnvelope {
        let envelope = ErrorEnvelope::new(self.code(), self.to_string());
        match self {
            Self::NotResponding { path, timeout_ms } => envelope
                .with_details(json!({ "path": path, "timeout_ms": timeout_ms }))
                .with_hint(
                    "The editor may be busy (importing, compiling or paused in the debugger). \
                     The request may still complete; check godot_status before repeating it.",
                )
                .with_next_action(
                    "godot_status",
                    json!({}),
                    "see whether the editor recovered and what it finished",
                ),
            Self::Unreachable { url, .. } => envelope
                .with_details(json!({ "url": url }))
                .with_hint("Start the gdbridge bridge for this project (or the editor plugin) and retry.")
                .with_next_action(
                    "godot_evaluate_quality",
                    json!({}),
                    "quality gates are computed from the project files and work offline",
                ),
            Self::Status { status, body, .. } => {
                envelope.with_details(json!({ "status": status, "body": body }))
            }
            Self::Transport { .. } | Self::InvalidResponse { .. } => envelope,
        }
    }
}

pub type BridgeResult<T> = std::result::Result<T, BridgeCallError>;

/// Caller-side timeout class for a bridge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speed {
    Normal,
    Slow,
}

/// The bridge calls the phase-completion guard depends on.
#[async_trait]
pub trait BridgeApi: Send + Sync {
    async fn errors(&self) -> BridgeResult<ErrorsReport>;
    async fn post_phase(&self, update: &PhaseUpdate) -> BridgeResult<Value>;
}

/// HTTP client for the bridge's JSON endpoints.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    slow_timeout: Duration,
}

impl BridgeClient {
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.bridge_url.clone(),
            timeout: config.timeout,
            slow_timeout: config.slow_timeout,
        }
    }

    fn timeout_for(&self, speed: Speed) -> Duration {
        match speed {
            Speed::Normal => self.timeout,
            Speed::Slow => self.slow_timeout,
        }
    }

    pub async fn get_json(&self, path: &str, speed: Speed) -> BridgeResult<Value> {
        let request = self.http.get(format!("{}{path}", self.base_url));
        self.send(request, path, speed).await
    }

    pub async fn post_json(
        &self,
        path: &str,
        body: &impl Serialize,
        speed: Speed,
    ) -> BridgeResult<Value> {
        let request = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(body);
        self.send(request, path, speed).await
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
        speed: Speed,
    ) -> BridgeResult<Value> {
        let timeout = self.timeout_for(speed);
        log::debug!("bridge {path} (timeout {} ms)", timeout.as_millis());
        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| self.classify(err, path, timeout))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|err| self.classify(err, path, timeout))?;
        if !status.is_success() {
            return Err(BridgeCallError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    fn classify(&self, err: reqwest::Error, path: &str, timeout: Duration) -> BridgeCallError {
        if err.is_timeout() {
            BridgeCallError::NotResponding {
                path: path.to_string(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else if err.is_connect() {
            BridgeCallError::Unreachable {
                url: self.base_url.clone(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            BridgeCallError::InvalidResponse {
                path: path.to_string(),
                message: err.to_string(),
            }
        } else {
            BridgeCallError::Transport {
                path: path.to_string(),
                message: err.to_string(),
            }
        }
    }

    pub async fn status(&self) -> BridgeResult<StatusReport> {
        typed("/status", self.get_json("/status", Speed::Normal).await?)
    }

    pub async fn phase(&self) -> BridgeResult<PhaseState> {
        typed("/phase", self.get_json("/phase", Speed::Normal).await?)
    }

    pub async fn run_scene(&self, body: &RunBody) -> BridgeResult<Value> {
        self.post_json("/run", body, Speed::Normal).await
    }

    pub async fn stop_scene(&self) -> BridgeResult<Value> {
        self.post_json("/stop", &json!({}), Speed::Normal).await
    }

    pub async fn reload(&self) -> BridgeResult<Value> {
        self.post_json("/reload", &json!({}), Speed::Normal).await
    }

    pub async fn log(&self, body: &LogBody) -> BridgeResult<Value> {
        self.post_json("/log", body, Speed::Normal).await
    }
}

#[async_trait]
impl BridgeApi for BridgeClient {
    async fn errors(&self) -> BridgeResult<ErrorsReport> {
        typed("/errors", self.get_json("/errors", Speed::Slow).await?)
    }

    async fn post_phase(&self, update: &PhaseUpdate) -> BridgeResult<Value> {
        self.post_json("/phase", update, Speed::Slow).await
    }
}

fn typed<T: DeserializeOwned>(path: &str, value: Value) -> BridgeResult<T> {
    serde_json::from_value(value).map_err(|err| BridgeCallError::InvalidResponse {
        path: path.to_string(),
        message: err.to_string(),
    })
}
