pub mod chat_handler;
pub mod chat_stream;
pub mod config;
pub mod message;
pub mod model;
pub mod persona;
