//! Response dispatch: persona resolution, message assembly, and routing to the
//! local model or the hosted API with status strings interleaved.

use async_stream::stream;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::config::data::StatusMessages;
use crate::core::config::Config;
use crate::core::message::{build_messages, HistoryLimit, Message};
use crate::core::model::{
    wait_until_settled, ChunkStream, GenerationError, GenerationMode, GenerationParams,
    ModelManager, QueuedRequest, Settled,
};
use crate::core::persona::{PersonaSelection, PersonaStore};

/// Settings the handler needs from configuration.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub messages: StatusMessages,
    pub history_limit: HistoryLimit,
    /// `None` waits for a loading model indefinitely
    pub load_timeout: Option<Duration>,
}

impl ChatSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            messages: config.messages.clone(),
            history_limit: config.history_limit(),
            load_timeout: config.local_model.load_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// One submission from the UI.
#[derive(Debug, Clone)]
pub struct ChatSubmission {
    pub message: String,
    pub history: Vec<Message>,
    pub selection: Option<PersonaSelection>,
    pub params: GenerationParams,
    pub use_local_model: bool,
    pub auth_token: Option<String>,
}

/// A reply in progress, with the persona it was resolved to.
pub struct Reply {
    /// Canonical persona id, or `None` when no persona applied
    pub persona: Option<String>,
    pub chunks: BoxStream<'static, String>,
}

#[derive(Clone)]
pub struct ChatHandler {
    manager: Arc<dyn ModelManager>,
    personas: Arc<PersonaStore>,
    settings: Arc<ChatSettings>,
}

impl ChatHandler {
    pub fn new(
        manager: Arc<dyn ModelManager>,
        personas: Arc<PersonaStore>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            manager,
            personas,
            settings: Arc::new(settings),
        }
    }

    pub fn personas(&self) -> &PersonaStore {
        &self.personas
    }

    /// Produce the reply to `submission` as a stream of incremental text.
    ///
    /// Status strings (loading, ready, failures, login prompts) are emitted as
    /// ordinary items. Generation errors end the stream with a single
    /// error-prefixed item instead of failing it.
    pub fn respond(&self, submission: ChatSubmission) -> Reply {
        let ChatSubmission {
            message,
            history,
            selection,
            params,
            use_local_model,
            auth_token,
        } = submission;

        let persona = self.personas.resolve(selection.as_ref());
        let messages = build_messages(
            &message,
            &history,
            &persona.system_prompt,
            self.settings.history_limit,
        );
        let mode = if use_local_model {
            GenerationMode::Local
        } else {
            GenerationMode::Api
        };
        debug!(
            mode = mode.as_str(),
            persona = persona.id.as_deref().unwrap_or("-"),
            turns = messages.len(),
            "dispatching chat submission"
        );

        let chunks = match mode {
            GenerationMode::Local => self.local_reply(messages, params).boxed(),
            GenerationMode::Api => self.api_reply(messages, params, auth_token).boxed(),
        };
        Reply {
            persona: persona.id,
            chunks,
        }
    }

    fn local_reply(
        &self,
        messages: Vec<Message>,
        params: GenerationParams,
    ) -> impl Stream<Item = String> + Send + 'static {
        let manager = Arc::clone(&self.manager);
        let settings = Arc::clone(&self.settings);

        stream! {
            let local = manager.local_model();

            if local.is_loading() {
                manager.queue_message(QueuedRequest::new(
                    messages.clone(),
                    params,
                    GenerationMode::Local,
                ));
                yield settings.messages.loading_message.clone();

                match wait_until_settled(local.subscribe(), settings.load_timeout).await {
                    Settled::Ready => {
                        yield settings.messages.model_ready.clone();
                    }
                    Settled::Failed => {
                        yield settings.messages.model_load_failed.clone();
                        return;
                    }
                    Settled::TimedOut => {
                        warn!(timeout = ?settings.load_timeout, "gave up waiting for the local model");
                        yield settings.messages.load_timed_out.clone();
                        return;
                    }
                }
            } else if !local.is_ready() {
                yield settings.messages.model_load_failed.clone();
                return;
            }

            let generated = local.generate(&messages, &params).await;
            for await chunk in relay(generated, settings.messages.error_prefix.clone()) {
                yield chunk;
            }
        }
    }

    fn api_reply(
        &self,
        messages: Vec<Message>,
        params: GenerationParams,
        auth_token: Option<String>,
    ) -> impl Stream<Item = String> + Send + 'static {
        let manager = Arc::clone(&self.manager);
        let settings = Arc::clone(&self.settings);

        stream! {
            let Some(token) = auth_token.filter(|token| !token.trim().is_empty()) else {
                yield settings.messages.login_required.clone();
                return;
            };

            let generated = manager.api_model().generate(&messages, &token, &params).await;
            for await chunk in relay(generated, settings.messages.error_prefix.clone()) {
                yield chunk;
            }
        }
    }
}

/// Pass chunks through, turning the first error into a visible message.
fn relay(
    generated: Result<ChunkStream, GenerationError>,
    error_prefix: String,
) -> impl Stream<Item = String> + Send + 'static {
    stream! {
        let mut chunks = match generated {
            Ok(chunks) => chunks,
            Err(err) => {
                warn!(error = %err, "generation failed to start");
                yield format!("{error_prefix}{err}");
                return;
            }
        };

        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(text) => {
                    yield text;
                }
                Err(err) => {
                    warn!(error = %err, "generation failed mid-stream");
                    yield format!("{error_prefix}{err}");
                    return;
                }
            }
        }
    }
}
