use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::base::{Agent, AgentRequest, AgentResult};
use crate::routing::Router;

/// Keyword intent recognition. The output is a JSON array of agent names,
/// which is the contract the orchestrator parses.
pub struct IntentAgent {
    router: Router,
}

impl IntentAgent {
    pub const NAME: &'static str = "intent_agent";

    pub fn new(router: Router) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }
}

#[async_trait]
impl Agent for IntentAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Identifies the intent of the question and lists the agents to call"
    }

    async fn execute(&self, request: &AgentRequest) -> Result<AgentResult> {
        let selection = self.router.route(&request.query);
        debug!("Intent selection: {:?}", selection);

        Ok(AgentResult::success(serde_json::to_string(&selection)?)
            .with_metadata("agent_count", selection.len().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_output_is_json_array() {
        let agent = IntentAgent::new(Router::default());
        let result = agent
            .execute(&AgentRequest::new("现在几点了"))
            .await
            .unwrap();

        let names: Vec<String> = serde_json::from_str(&result.output).unwrap();
        assert_eq!(names, vec!["time_agent"]);
        assert_eq!(result.metadata["agent_count"], "1");
    }

    #[tokio::test]
    async fn test_unmatched_query_uses_fallback_agent() {
        let agent = IntentAgent::new(Router::default());
        let result = agent.execute(&AgentRequest::new("hello there")).await.unwrap();

        let names: Vec<String> = serde_json::from_str(&result.output).unwrap();
        assert_eq!(names, vec![agent.router().table().fallback_agent.clone()]);
    }
}
