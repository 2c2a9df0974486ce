//! LLM-backed planner and responder over an OpenAI-compatible chat API.

pub mod client;
pub mod extract;
pub mod planner;
pub mod prompt;
pub mod responder;

pub use client::{ChatClient, ChatMessage};
pub use planner::LlmPlanner;
pub use responder::LlmResponder;
