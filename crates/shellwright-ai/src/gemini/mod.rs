//! Google Gemini API client.
//!
//! Implements [`LanguageModel`](crate::LanguageModel) and
//! [`Embedder`](crate::Embedder) over the Generative Language REST API.

mod api;
mod client;
mod config;

pub use client::GeminiClient;
pub use config::GeminiConfig;
