use async_stream::stream;
use futures_util::StreamExt;
use memchr::memchr;
use tracing::{debug, warn};

use crate::api::{ChatRequest, ChatResponse};
use crate::core::message::Message;
use crate::core::model::{ChunkStream, GenerationError, GenerationParams};
use crate::utils::url::construct_api_url;

/// One parsed server-sent-events line.
#[derive(Debug, Clone, PartialEq)]
enum SseEvent {
    Chunk(String),
    Error(String),
    Done,
    Ignore,
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

fn handle_data_payload(payload: &str) -> SseEvent {
    if payload == "[DONE]" {
        return SseEvent::Done;
    }

    match serde_json::from_str::<ChatResponse>(payload) {
        Ok(response) => response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
            .map(SseEvent::Chunk)
            .unwrap_or(SseEvent::Ignore),
        Err(_) => {
            if payload.trim().is_empty() {
                return SseEvent::Ignore;
            }
            SseEvent::Error(format_api_error(payload))
        }
    }
}

fn process_sse_line(line: &str) -> SseEvent {
    extract_data_payload(line)
        .map(handle_data_payload)
        .unwrap_or(SseEvent::Ignore)
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.trim().to_string()
    })
}

pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "API Error:\n```\n<empty>\n```".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Ok(pretty_json) = serde_json::to_string_pretty(&json_value) {
            if let Some(summary) = extract_error_summary(&json_value) {
                if !summary.is_empty() {
                    return format!("API Error: {summary}\n```json\n{pretty_json}\n```");
                }
            }
            return format!("API Error:\n```json\n{pretty_json}\n```");
        }
    }

    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        format!("API Error:\n```xml\n{trimmed}\n```")
    } else {
        format!("API Error:\n```\n{trimmed}\n```")
    }
}

pub struct StreamParams<'a> {
    pub client: &'a reqwest::Client,
    pub base_url: &'a str,
    /// Sent as a bearer token when present
    pub api_key: Option<&'a str>,
    pub model: &'a str,
    pub messages: &'a [Message],
    pub params: &'a GenerationParams,
}

/// Start a streaming chat completion and return its content deltas.
///
/// Errors before the first byte (transport, non-2xx status) are returned
/// directly; errors after that arrive as the final `Err` item of the stream.
pub async fn open_chat_stream(params: StreamParams<'_>) -> Result<ChunkStream, GenerationError> {
    let request = ChatRequest::streaming(params.model, params.messages, params.params);
    let chat_url = construct_api_url(params.base_url, "chat/completions");
    debug!(url = %chat_url, model = params.model, turns = params.messages.len(), "opening chat stream");

    let mut http_request = params
        .client
        .post(chat_url)
        .header("Content-Type", "application/json");
    if let Some(key) = params.api_key {
        http_request = http_request.bearer_auth(key);
    }

    let response = http_request.json(&request).send().await?;
    if !response.status().is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(GenerationError::Api(format_api_error(&error_text)));
    }

    let mut body = response.bytes_stream();
    let chunks = stream! {
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = body.next().await {
            let chunk_bytes = match chunk {
                Ok(bytes) => bytes,
                Err(err) => {
                    yield Err(GenerationError::Request(err));
                    return;
                }
            };
            buffer.extend_from_slice(&chunk_bytes);

            while let Some(newline_pos) = memchr(b'\n', &buffer) {
                let line: Vec<u8> = buffer.drain(..=newline_pos).collect();
                let line = match std::str::from_utf8(&line) {
                    Ok(s) => s.trim().to_string(),
                    Err(e) => {
                        warn!("Invalid UTF-8 in stream: {e}");
                        continue;
                    }
                };

                match process_sse_line(&line) {
                    SseEvent::Chunk(text) => yield Ok(text),
                    SseEvent::Error(message) => {
                        yield Err(GenerationError::Api(message));
                        return;
                    }
                    SseEvent::Done => return,
                    SseEvent::Ignore => {}
                }
            }
        }

        // Some servers close without a trailing newline after the last event
        if let Ok(tail) = std::str::from_utf8(&buffer) {
            match process_sse_line(tail.trim()) {
                SseEvent::Chunk(text) => yield Ok(text),
                SseEvent::Error(message) => yield Err(GenerationError::Api(message)),
                SseEvent::Done | SseEvent::Ignore => {}
            }
        }
    };

    Ok(chunks.boxed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_sse_line_handles_spacing_variants() {
        let variants = [
            (
                r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#,
                "Hello",
                "data: [DONE]",
            ),
            (
                r#"data:{"choices":[{"delta":{"content":"World"}}]}"#,
                "World",
                "data:[DONE]",
            ),
        ];

        for (chunk_line, expected_chunk, done_line) in variants {
            assert_eq!(
                process_sse_line(chunk_line),
                SseEvent::Chunk(expected_chunk.to_string())
            );
            assert_eq!(process_sse_line(done_line), SseEvent::Done);
        }
    }

    #[test]
    fn process_sse_line_skips_comments_and_empty_deltas() {
        assert_eq!(process_sse_line(": keep-alive"), SseEvent::Ignore);
        assert_eq!(process_sse_line(""), SseEvent::Ignore);
        assert_eq!(process_sse_line("data: "), SseEvent::Ignore);
        assert_eq!(
            process_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            SseEvent::Ignore
        );
        assert_eq!(
            process_sse_line(r#"data: {"choices":[{"delta":{"content":""},"finish_reason":"stop"}]}"#),
            SseEvent::Ignore
        );
        assert_eq!(process_sse_line(r#"data: {"choices":[]}"#), SseEvent::Ignore);
    }

    #[test]
    fn process_sse_line_routes_stream_errors() {
        let error_line = r#"data: {"error":{"message":"internal server error"}}"#;

        let expected = r#"API Error: internal server error
```json
{
  "error": {
    "message": "internal server error"
  }
}
```"#;
        assert_eq!(
            process_sse_line(error_line),
            SseEvent::Error(expected.to_string())
        );
    }

    #[test]
    fn format_api_error_prettifies_json_with_summary() {
        let raw = r#"{"error":{"message":"model   overloaded","type":"invalid_request_error"}}"#;
        let formatted = format_api_error(raw);

        let expected = r#"API Error: model overloaded
```json
{
  "error": {
    "message": "model   overloaded",
    "type": "invalid_request_error"
  }
}
```"#;
        assert_eq!(formatted, expected);
    }

    #[test]
    fn format_api_error_reads_string_error_field() {
        let formatted = format_api_error(r#"{"error":"Authorization header is invalid"}"#);
        assert!(formatted.starts_with("API Error: Authorization header is invalid\n```json"));
    }

    #[test]
    fn format_api_error_handles_json_without_summary() {
        let raw = r#"{"status":"failed"}"#;
        let formatted = format_api_error(raw);

        let expected = r#"API Error:
```json
{
  "status": "failed"
}
```"#;
        assert_eq!(formatted, expected);
    }

    #[test]
    fn format_api_error_handles_xml_plaintext_and_empty() {
        assert_eq!(
            format_api_error("<error>bad</error>"),
            "API Error:\n```xml\n<error>bad</error>\n```"
        );
        assert_eq!(
            format_api_error("api failure"),
            "API Error:\n```\napi failure\n```"
        );
        assert_eq!(format_api_error("  "), "API Error:\n```\n<empty>\n```");
    }
}
