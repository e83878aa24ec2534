pub mod client;
#[cfg(test)]
pub mod mock;
pub mod types;

pub use client::{HttpLlmClient, LlmClient};
pub use types::{ChatRequest, Message};
