//! Agora is a persona chat front-end that streams replies from a local model
//! server or a hosted inference API.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns configuration, the persona store, message assembly, the
//!   model backends with their loading lifecycle, and response dispatch.
//! - [`server`] exposes the chat, persona and status endpoints over HTTP.
//! - [`api`] defines the OpenAI-compatible chat/model payloads used by both
//!   backends.
//! - [`utils`] holds URL helpers and transcript logging.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which loads configuration and dispatches into
//! [`server::serve`] or a one-shot reply.

pub mod api;
pub mod cli;
pub mod core;
pub mod server;
pub mod utils;
