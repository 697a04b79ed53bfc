//! Wire types for OpenAI-compatible chat-completions endpoints.

use serde::{Deserialize, Serialize};

use crate::core::message::Message;
use crate::core::model::GenerationParams;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl ChatRequest {
    pub fn streaming(model: &str, messages: &[Message], params: &GenerationParams) -> Self {
        Self {
            model: model.to_string(),
            messages: messages.iter().map(ChatMessage::from).collect(),
            stream: true,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
        }
    }
}

#[derive(Deserialize)]
pub struct ChatResponseDelta {
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatResponseChoice {
    pub delta: ChatResponseDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatResponseChoice>,
}

#[derive(Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub created: Option<u64>,
    pub owned_by: Option<String>,
}

#[derive(Deserialize)]
pub struct ModelsResponse {
    pub data: Vec<ModelInfo>,
}

pub mod models;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streaming_request_carries_sampling_parameters() {
        let params = GenerationParams {
            max_tokens: 64,
            temperature: 0.5,
            top_p: 0.9,
        };
        let request = ChatRequest::streaming(
            "tiny",
            &[Message::system("be brief"), Message::user("hi")],
            &params,
        );
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "tiny");
        assert_eq!(value["stream"], true);
        assert_eq!(value["max_tokens"], 64);
        assert_eq!(value["temperature"], 0.5);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
    }
}
