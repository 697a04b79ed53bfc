use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::models::{fetch_models, serves_model};
use crate::core::chat_stream::{open_chat_stream, StreamParams};
use crate::core::config::data::LocalModelConfig;
use crate::core::message::Message;
use crate::core::model::{ChunkStream, GenerationError, GenerationParams, LoadState, LocalModel};

/// An OpenAI-compatible model server running next to this process
/// (llama.cpp, Ollama, vLLM). Weights are loaded by that server; this side only
/// watches for the model to show up.
pub struct LocalServerModel {
    client: reqwest::Client,
    config: LocalModelConfig,
    state: watch::Sender<LoadState>,
}

impl LocalServerModel {
    pub fn new(client: reqwest::Client, config: LocalModelConfig) -> Self {
        let initial = if config.enabled {
            LoadState::Loading
        } else {
            LoadState::Failed("local model disabled".to_string())
        };
        let (state, _) = watch::channel(initial);
        Self {
            client,
            config,
            state,
        }
    }

    pub(crate) fn set_state(&self, state: LoadState) {
        debug!(state = state.as_str(), "local model state changed");
        self.state.send_replace(state);
    }

    /// Probe the server until the configured model is listed, the attempt
    /// budget runs out, or `cancel` fires. Settles the state either way.
    pub async fn load(&self, cancel: CancellationToken) {
        if !self.state.borrow().is_loading() {
            return;
        }

        let interval = Duration::from_millis(self.config.probe_interval_ms.max(1));
        for attempt in 1..=self.config.max_load_attempts {
            match fetch_models(&self.client, &self.config.base_url, None).await {
                Ok(models) if serves_model(&models, &self.config.model) => {
                    info!(
                        model = %self.config.model,
                        base_url = %self.config.base_url,
                        attempt,
                        "local model ready"
                    );
                    self.set_state(LoadState::Ready);
                    return;
                }
                Ok(_) => debug!(attempt, "local server is up but the model is not listed yet"),
                Err(err) => debug!(attempt, error = %err, "local server not reachable yet"),
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    self.set_state(LoadState::Failed("loading cancelled".to_string()));
                    return;
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }

        let reason = format!(
            "model '{}' not available at {} after {} attempts",
            self.config.model, self.config.base_url, self.config.max_load_attempts
        );
        warn!(%reason, "local model failed to load");
        self.set_state(LoadState::Failed(reason));
    }
}

#[async_trait]
impl LocalModel for LocalServerModel {
    fn state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.state.subscribe()
    }

    async fn generate(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<ChunkStream, GenerationError> {
        match self.state() {
            LoadState::Ready => {}
            LoadState::Loading => return Err(GenerationError::NotReady("still loading".to_string())),
            LoadState::Failed(reason) => return Err(GenerationError::NotReady(reason)),
        }

        open_chat_stream(StreamParams {
            client: &self.client,
            base_url: &self.config.base_url,
            api_key: None,
            model: &self.config.model,
            messages,
            params,
        })
        .await
    }
}
