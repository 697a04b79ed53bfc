use async_trait::async_trait;

use crate::core::chat_stream::{open_chat_stream, StreamParams};
use crate::core::config::data::ApiModelConfig;
use crate::core::message::Message;
use crate::core::model::{ApiModel, ChunkStream, GenerationError, GenerationParams};

/// Hosted OpenAI-compatible endpoint, authorized per request with the
/// caller's token.
pub struct HostedApiModel {
    client: reqwest::Client,
    config: ApiModelConfig,
}

impl HostedApiModel {
    pub fn new(client: reqwest::Client, config: ApiModelConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ApiModel for HostedApiModel {
    async fn generate(
        &self,
        messages: &[Message],
        token: &str,
        params: &GenerationParams,
    ) -> Result<ChunkStream, GenerationError> {
        open_chat_stream(StreamParams {
            client: &self.client,
            base_url: &self.config.base_url,
            api_key: Some(token),
            model: &self.config.model,
            messages,
            params,
        })
        .await
    }
}
