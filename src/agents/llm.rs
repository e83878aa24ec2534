use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use super::base::{Agent, AgentRequest, AgentResult};
use crate::llm::{LlmClient, Message};

/// Direct model access, registered as `default_llm` and `fallback_llm`.
/// The query is sent as the only user message.
pub struct LlmAgent {
    name: String,
    llm: Arc<dyn LlmClient>,
}

impl LlmAgent {
    pub const DEFAULT: &'static str = "default_llm";
    pub const FALLBACK: &'static str = "fallback_llm";

    pub fn new(name: impl Into<String>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            name: name.into(),
            llm,
        }
    }
}

#[async_trait]
impl Agent for LlmAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Raw chat completion"
    }

    async fn execute(&self, request: &AgentRequest) -> Result<AgentResult> {
        let output = self
            .llm
            .chat_with_history(vec![Message::user(&request.query)], "default")
            .await?;
        Ok(AgentResult::success(output))
    }
}
