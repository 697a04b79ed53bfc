//! The model-manager seam: what the chat handler needs from a local model, a
//! hosted API model, and the deferred request queue.

pub mod local;
pub mod remote;
pub mod service;


use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;

use crate::core::message::Message;

pub use local::LocalServerModel;
pub use remote::HostedApiModel;
pub use service::ModelService;

/// Lazy sequence of generated text; an `Err` item ends the stream.
pub type ChunkStream = BoxStream<'static, Result<String, GenerationError>>;

/// Sampling parameters forwarded untouched to the backends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Local,
    Api,
}

impl GenerationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationMode::Local => "local",
            GenerationMode::Api => "api",
        }
    }
}

/// Snapshot of a request made while the local model was still loading.
#[derive(Debug, Clone, Serialize)]
pub struct QueuedRequest {
    pub messages: Vec<Message>,
    pub params: GenerationParams,
    pub mode: GenerationMode,
    pub queued_at: DateTime<Utc>,
}

impl QueuedRequest {
    pub fn new(messages: Vec<Message>, params: GenerationParams, mode: GenerationMode) -> Self {
        Self {
            messages,
            params,
            mode,
            queued_at: Utc::now(),
        }
    }
}

/// Lifecycle of the local model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadState::Loading => "loading",
            LoadState::Ready => "ready",
            LoadState::Failed(_) => "failed",
        }
    }
}

#[derive(Debug)]
pub enum GenerationError {
    /// Transport failure talking to the backend.
    Request(reqwest::Error),
    /// The backend answered with an error; already formatted for display.
    Api(String),
    /// The chunk stream broke off.
    Stream(String),
    /// The local model was asked to generate before it was ready.
    NotReady(String),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Request(err) => write!(f, "request failed: {err}"),
            GenerationError::Api(message) => write!(f, "{message}"),
            GenerationError::Stream(message) => write!(f, "{message}"),
            GenerationError::NotReady(reason) => write!(f, "local model is not ready: {reason}"),
        }
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerationError::Request(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::Request(err)
    }
}

#[async_trait]
pub trait LocalModel: Send + Sync {
    fn state(&self) -> LoadState;

    /// Receiver that observes every state transition.
    fn subscribe(&self) -> watch::Receiver<LoadState>;

    fn is_loading(&self) -> bool {
        self.state().is_loading()
    }

    fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    async fn generate(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<ChunkStream, GenerationError>;
}

#[async_trait]
pub trait ApiModel: Send + Sync {
    async fn generate(
        &self,
        messages: &[Message],
        token: &str,
        params: &GenerationParams,
    ) -> Result<ChunkStream, GenerationError>;
}

pub trait ModelManager: Send + Sync {
    fn local_model(&self) -> &dyn LocalModel;

    fn api_model(&self) -> &dyn ApiModel;

    /// Hand over a request made while the local model was loading. The caller
    /// does not track it afterwards.
    fn queue_message(&self, request: QueuedRequest);

    fn deferred_len(&self) -> usize {
        0
    }
}

/// How a wait on a loading model ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Ready,
    Failed,
    TimedOut,
}

/// Wait until `state` leaves `Loading`, optionally bounded by `timeout`.
/// A dropped sender counts as a failed load.
pub async fn wait_until_settled(
    mut state: watch::Receiver<LoadState>,
    timeout: Option<Duration>,
) -> Settled {
    let settle = async move {
        let ready = state
            .wait_for(|s| !s.is_loading())
            .await
            .map(|s| s.is_ready())
            .unwrap_or(false);
        if ready {
            Settled::Ready
        } else {
            Settled::Failed
        }
    };

    match timeout {
        Some(limit) => tokio::time::timeout(limit, settle)
            .await
            .unwrap_or(Settled::TimedOut),
        None => settle.await,
    }
}
