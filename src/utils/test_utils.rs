//! Scripted model backends for exercising the chat handler and HTTP layer.

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::watch;

use crate::core::message::Message;
use crate::core::model::{
    ApiModel, ChunkStream, GenerationError, GenerationParams, LoadState, LocalModel, ModelManager,
    QueuedRequest,
};

/// What a fake backend produces when asked to generate.
#[derive(Clone, Debug)]
pub enum Script {
    /// Yield these items; an `Err` ends the stream with a stream error.
    Chunks(Vec<Result<String, String>>),
    /// Fail before producing a stream.
    Fail(String),
}

impl Script {
    pub fn chunks(items: &[&str]) -> Self {
        Script::Chunks(items.iter().map(|s| Ok(s.to_string())).collect())
    }

    fn run(&self) -> Result<ChunkStream, GenerationError> {
        match self {
            Script::Chunks(items) => Ok(stream::iter(
                items
                    .clone()
                    .into_iter()
                    .map(|item| item.map_err(GenerationError::Stream)),
            )
            .boxed()),
            Script::Fail(message) => Err(GenerationError::Stream(message.clone())),
        }
    }
}

pub struct FakeLocalModel {
    state: watch::Sender<LoadState>,
    script: Script,
    pub calls: AtomicUsize,
}

#[async_trait]
impl LocalModel for FakeLocalModel {
    fn state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.state.subscribe()
    }

    async fn generate(
        &self,
        _messages: &[Message],
        _params: &GenerationParams,
    ) -> Result<ChunkStream, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script.run()
    }
}

pub struct FakeApiModel {
    script: Script,
    pub tokens: Mutex<Vec<String>>,
}

#[async_trait]
impl ApiModel for FakeApiModel {
    async fn generate(
        &self,
        _messages: &[Message],
        token: &str,
        _params: &GenerationParams,
    ) -> Result<ChunkStream, GenerationError> {
        self.tokens.lock().unwrap().push(token.to_string());
        self.script.run()
    }
}

/// A model manager whose local model can be made to change state the moment a
/// request is queued.
pub struct FakeModelManager {
    pub local: FakeLocalModel,
    pub api: FakeApiModel,
    pub queued: Mutex<Vec<QueuedRequest>>,
    on_queue: Mutex<Option<LoadState>>,
}

impl FakeModelManager {
    pub fn new(state: LoadState, local: Script, api: Script) -> Self {
        let (state, _) = watch::channel(state);
        Self {
            local: FakeLocalModel {
                state,
                script: local,
                calls: AtomicUsize::new(0),
            },
            api: FakeApiModel {
                script: api,
                tokens: Mutex::new(Vec::new()),
            },
            queued: Mutex::new(Vec::new()),
            on_queue: Mutex::new(None),
        }
    }

    /// Switch the local model to `state` once a request has been queued.
    pub fn settle_on_queue(self, state: LoadState) -> Self {
        *self.on_queue.lock().unwrap() = Some(state);
        self
    }

    pub fn set_local_state(&self, state: LoadState) {
        self.local.state.send_replace(state);
    }

    pub fn local_calls(&self) -> usize {
        self.local.calls.load(Ordering::SeqCst)
    }

    pub fn api_tokens(&self) -> Vec<String> {
        self.api.tokens.lock().unwrap().clone()
    }
}

impl ModelManager for FakeModelManager {
    fn local_model(&self) -> &dyn LocalModel {
        &self.local
    }

    fn api_model(&self) -> &dyn ApiModel {
        &self.api
    }

    fn queue_message(&self, request: QueuedRequest) {
        self.queued.lock().unwrap().push(request);
        if let Some(state) = self.on_queue.lock().unwrap().take() {
            self.set_local_state(state);
        }
    }

    fn deferred_len(&self) -> usize {
        self.queued.lock().unwrap().len()
    }
}
