//! HTTP handlers for chat streaming, persona listing and status

use async_stream::stream;
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

use super::AppState;
use crate::core::chat_handler::ChatSubmission;
use crate::core::config::data::{Defaults, ParameterRanges};
use crate::core::message::Message;
use crate::core::model::{GenerationParams, LoadState};
use crate::core::persona::PersonaSelection;
use crate::utils::logging::PendingExchange;

#[derive(Debug, Deserialize)]
pub struct ChatPayload {
    pub message: String,
    #[serde(default)]
    pub history: Vec<Message>,
    /// Selected gallery item (image path or persona id)
    #[serde(default)]
    pub persona: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub use_local_model: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct PersonaSummary {
    pub id: String,
    pub display_name: String,
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub local_model: LoadState,
    pub deferred_requests: usize,
    pub personas: usize,
    pub defaults: Defaults,
    pub parameters: ParameterRanges,
}

/// Token from `Authorization: Bearer <token>`; the scheme is case-insensitive.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(char::is_whitespace)?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

/// Stream a reply as SSE: one `chunk` event per item (JSON-encoded string),
/// then a `done` event.
pub async fn chat_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ChatPayload>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<ErrorBody>)> {
    let defaults = &state.config.defaults;
    let params = GenerationParams {
        max_tokens: payload.max_tokens.unwrap_or(defaults.max_tokens),
        temperature: payload.temperature.unwrap_or(defaults.temperature),
        top_p: payload.top_p.unwrap_or(defaults.top_p),
    };
    state.config.parameters.validate(&params).map_err(|err| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: err.to_string(),
            }),
        )
    })?;

    let reply = state.handler.respond(ChatSubmission {
        message: payload.message.clone(),
        history: payload.history,
        selection: payload
            .persona
            .as_deref()
            .map(PersonaSelection::from_gallery_item),
        params,
        use_local_model: payload.use_local_model.unwrap_or(defaults.use_local_model),
        auth_token: bearer_token(&headers),
    });
    let mut pending = state
        .transcript
        .clone()
        .map(|log| PendingExchange::new(log, reply.persona.clone(), payload.message));
    let chunks = reply.chunks;

    let events = stream! {
        for await chunk in chunks {
            if let Some(exchange) = pending.as_mut() {
                exchange.push(&chunk);
            }
            let data = serde_json::to_string(&chunk).unwrap_or_default();
            yield Ok(Event::default().event("chunk").data(data));
        }

        if let Some(exchange) = pending.take() {
            exchange.finish();
        }
        yield Ok(Event::default().event("done").data("{}"));
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Personas in store order, for the selection gallery.
pub async fn personas_handler(State(state): State<AppState>) -> Json<Vec<PersonaSummary>> {
    Json(
        state
            .handler
            .personas()
            .list()
            .iter()
            .map(|p| PersonaSummary {
                id: p.id.clone(),
                display_name: p.display_name.clone(),
                image: p.image.clone(),
            })
            .collect(),
    )
}

pub async fn status_handler(State(state): State<AppState>) -> Json<StatusBody> {
    Json(StatusBody {
        local_model: state.manager.local_model().state(),
        deferred_requests: state.manager.deferred_len(),
        personas: state.handler.personas().list().len(),
        defaults: state.config.defaults.clone(),
        parameters: state.config.parameters.clone(),
    })
}
