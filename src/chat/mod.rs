//! Lesson chat assistant
//!
//! A single request/response call to a remote language-model service. Every
//! failure degrades to a fixed fallback reply so the chat never breaks.

pub mod client;
pub mod error;
pub mod models;

pub use client::ChatClient;
pub use error::ChatError;
pub use models::{ChatRequest, ChatResponse, FALLBACK_MESSAGE};
