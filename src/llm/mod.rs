//! LLM access for prompt-driven analysis modules.
//!
//! This module provides the Ollama chat client and the parser that turns
//! model replies into insights and recommendations.

pub mod client;
pub mod parser;

pub use client::{ClientConfig, LanguageModel, OllamaClient};
pub use parser::{parse_reply, ParsedReply};
