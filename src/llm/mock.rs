//! Scripted client for tests that must not reach a real endpoint.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;

use super::types::{ChatRequest, Message};
use super::LlmClient;

enum Reply {
    Text(String),
    Fail(String),
}

/// Answers by the first rule whose needle occurs in the last message,
/// otherwise with the default reply. Every prompt is recorded.
pub struct MockLlm {
    rules: Vec<(String, Reply)>,
    default: Reply,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    pub fn replying(default: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            default: Reply::Text(default.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            default: Reply::Fail(error.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn on(mut self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Reply::Text(reply.into())));
        self
    }

    pub fn fail_on(mut self, needle: impl Into<String>, error: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Reply::Fail(error.into())));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn chat(&self, request: ChatRequest) -> Result<String> {
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt.clone());

        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply)
            .unwrap_or(&self.default);

        match reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail(error) => Err(anyhow::anyhow!("{}", error)),
        }
    }

    async fn chat_with_history(&self, messages: Vec<Message>, model: &str) -> Result<String> {
        self.chat(ChatRequest::new(model, messages)).await
    }
}
