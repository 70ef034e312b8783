//! Model backend adapters for braincast.
//!
//! One implementation today: an OpenAI-compatible streaming chat
//! endpoint, which covers OpenAI, OpenRouter, Ollama, vLLM, and most
//! hosted gateways.

pub mod openai;

pub use openai::OpenAiBackend;
