use anyhow::Result;
use futures_util::future::try_join_all;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::agents::{
    standard_prompt_agents, Agent, AgentRegistry, AgentRequest, FileAgent, IntentAgent, LlmAgent,
    TimeAgent,
};
use crate::config::AppConfig;
use crate::error::ConfigError;
use crate::llm::{HttpLlmClient, LlmClient};
use crate::routing::{Router, RoutingTable};

const SUMMARY_RULES: &str = r#"
请按以下规则生成最终答案：

【答案选择优先级】
1. 首先验证答案的正确性：如果发现明显错误（数学计算错误、事实错误等），请纠正
2. 对于数学问题，请重新计算验证，不要盲目接受可能错误的结果
3. 优先选择逻辑合理、计算正确的答案
4. 如果多个答案冲突，选择最符合常识和逻辑的答案

【输出要求】
1. 严格遵守用户要求的输出格式
2. 回答中不要包含换行符，仅保留单行核心信息
3. 不要包含"数据来源"等说明性文字
4. 直接给出正确答案

【特别提醒】
请运用你的判断力，如果工具给出的答案明显错误，请基于正确知识给出答案。
例如数学计算问题，请确保计算逻辑正确。
"#;

/// Replies shorter than this (in characters) are treated as weak.
const WEAK_ANSWER_CHARS: usize = 10;

/// True when the summarising model's reply should be retried on the
/// fallback model.
pub fn is_weak_answer(output: &str) -> bool {
    let lower = output.to_lowercase();
    output.trim().chars().count() < WEAK_ANSWER_CHARS
        || lower.contains("not found")
        || lower.contains("error")
        || output.contains("无法获取")
        || output.contains("搜索失败")
}

/// `用户问题: {query}` followed by one `[agent]: output` line per agent and
/// the answer-selection rules.
pub fn summary_prompt(query: &str, outputs: &[(String, String)]) -> String {
    let mut prompt = format!("用户问题: {}\n\n", query);
    for (agent, output) in outputs {
        prompt.push_str(&format!("[{}]: {}\n", agent, output));
    }
    prompt.push_str(SUMMARY_RULES);
    prompt
}

/// Every agent the workflow can reach, wired to the given models.
pub fn standard_registry(
    routing: &RoutingTable,
    default_llm: Arc<dyn LlmClient>,
    fallback_llm: Option<Arc<dyn LlmClient>>,
) -> AgentRegistry {
    let mut registry = AgentRegistry::new();

    registry.register(Arc::new(IntentAgent::new(Router::new(routing.clone()))));
    registry.register(Arc::new(FileAgent::multi_format(default_llm.clone())));
    registry.register(Arc::new(FileAgent::pdf(default_llm.clone())));
    registry.register(Arc::new(FileAgent::video(default_llm.clone())));
    registry.register(Arc::new(FileAgent::media(default_llm.clone())));
    registry.register(Arc::new(TimeAgent::new(default_llm.clone())));
    for agent in standard_prompt_agents(default_llm.clone()) {
        registry.register(Arc::new(agent));
    }
    registry.register(Arc::new(LlmAgent::new(LlmAgent::DEFAULT, default_llm)));
    if let Some(fallback) = fallback_llm {
        registry.register(Arc::new(LlmAgent::new(LlmAgent::FALLBACK, fallback)));
    }

    registry
}

pub struct AgentSystem {
    registry: Arc<AgentRegistry>,
    fallback_agent: String,
}

impl AgentSystem {
    /// Checks that the intent agent, the default model and every agent the
    /// routing table can emit are registered.
    pub fn new(registry: AgentRegistry, routing: &RoutingTable) -> Result<Self, ConfigError> {
        let required = [IntentAgent::NAME, LlmAgent::DEFAULT];
        for name in required.iter().copied().chain(routing.agent_names()) {
            if !registry.contains(name) {
                return Err(ConfigError::UnknownAgent(name.to_string()));
            }
        }

        debug!("Registered agents: {:?}", registry.names());

        Ok(Self {
            registry: Arc::new(registry),
            fallback_agent: routing.fallback_agent.clone(),
        })
    }

    /// Builds HTTP clients from the loaded configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let default_llm: Arc<dyn LlmClient> =
            Arc::new(HttpLlmClient::new(LlmAgent::DEFAULT, config.llm.clone())?);
        let fallback_llm = match &config.fallback_llm {
            Some(settings) => Some(Arc::new(HttpLlmClient::new(
                LlmAgent::FALLBACK,
                settings.clone(),
            )?) as Arc<dyn LlmClient>),
            None => None,
        };

        let registry = standard_registry(&config.routing, default_llm, fallback_llm);
        Ok(Self::new(registry, &config.routing)?)
    }

    fn require(&self, name: &str) -> Result<Arc<dyn Agent>> {
        self.registry
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Agent '{}' not found", name))
    }

    /// Asks the intent agent which agents to call. Anything that is not a
    /// non-empty JSON array of names falls back to the fallback agent.
    pub async fn select_agents(&self, query: &str) -> Vec<String> {
        let fallback = || vec![self.fallback_agent.clone()];

        let intent = match self.require(IntentAgent::NAME) {
            Ok(agent) => agent,
            Err(_) => return fallback(),
        };

        match intent.execute(&AgentRequest::new(query)).await {
            Ok(result) => match serde_json::from_str::<Vec<String>>(&result.output) {
                Ok(names) if !names.is_empty() => names,
                _ => {
                    warn!("Unusable intent output {:?}, using fallback agent", result.output);
                    fallback()
                }
            },
            Err(e) => {
                warn!("Intent agent failed: {}, using fallback agent", e);
                fallback()
            }
        }
    }

    /// The full workflow: intent, concurrent fan-out, summary by the
    /// default model with a single retry on the fallback model.
    ///
    /// Routing sees only the user's `query`; the agents and the summary see
    /// `prompt`, which wraps the query in the task template.
    pub async fn answer(&self, query: &str, prompt: &str, files: &[PathBuf]) -> Result<String> {
        let selected = self.select_agents(query).await;
        info!("Calling agents: {:?}", selected);

        let request = AgentRequest::new(prompt).with_files(files.to_vec());
        let agents = selected
            .iter()
            .map(|name| self.require(name))
            .collect::<Result<Vec<_>>>()?;

        let results = try_join_all(agents.iter().map(|agent| agent.execute(&request))).await?;

        let outputs: Vec<(String, String)> = selected
            .into_iter()
            .zip(results)
            .map(|(name, result)| {
                if !result.is_success() {
                    warn!("{} reported: {}", name, result.error.unwrap_or_default());
                }
                (name, result.output)
            })
            .collect();

        self.summarise(&summary_prompt(prompt, &outputs)).await
    }

    async fn summarise(&self, prompt: &str) -> Result<String> {
        let request = AgentRequest::new(prompt);
        let fallback = self.registry.get(LlmAgent::FALLBACK);
        let primary = self.require(LlmAgent::DEFAULT)?.execute(&request).await;

        match (primary, fallback) {
            (Ok(result), Some(fallback)) if is_weak_answer(&result.output) => {
                info!("Default model answer is weak, switching to fallback model");
                Ok(fallback.execute(&request).await?.output)
            }
            (Ok(result), _) => Ok(result.output),
            (Err(e), Some(fallback)) => {
                warn!("Default model failed: {}, switching to fallback model", e);
                Ok(fallback.execute(&request).await?.output)
            }
            (Err(e), None) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentResult, PromptAgent};
    use crate::llm::mock::MockLlm;
    use async_trait::async_trait;

    fn system(default_llm: Arc<MockLlm>, fallback_llm: Option<Arc<MockLlm>>) -> AgentSystem {
        let routing = RoutingTable::default();
        let fallback_llm = fallback_llm.map(|f| f as Arc<dyn LlmClient>);
        let registry = standard_registry(&routing, default_llm, fallback_llm);
        AgentSystem::new(registry, &routing).unwrap()
    }

    #[test]
    fn test_weak_answers() {
        assert!(is_weak_answer("short"));
        assert!(is_weak_answer("The value was Not Found anywhere in sources"));
        assert!(is_weak_answer("网络搜索失败，请稍后重试再来一次吧"));
        assert!(is_weak_answer("An ERROR occurred while computing the answer"));
        assert!(!is_weak_answer("深圳市南山区科技园南区十二号楼"));
    }

    #[test]
    fn test_summary_prompt_layout() {
        let prompt = summary_prompt(
            "现在几点",
            &[
                ("time_agent".to_string(), "15:04".to_string()),
                ("external_search_agent".to_string(), "下午三点".to_string()),
            ],
        );
        assert!(prompt.starts_with("用户问题: 现在几点\n\n[time_agent]: 15:04\n[external_search_agent]: 下午三点\n"));
        assert!(prompt.contains("【输出要求】"));
    }

    #[tokio::test]
    async fn test_fan_out_and_summary() {
        let llm = Arc::new(
            MockLlm::replying("agent says 15:04")
                .on("用户问题", "现在是北京时间下午三点零四分"),
        );
        let system = system(llm.clone(), None);

        let answer = system.answer("现在几点", "现在几点", &[]).await.unwrap();
        assert_eq!(answer, "现在是北京时间下午三点零四分");

        let prompts = llm.prompts();
        let summary = prompts.last().unwrap();
        assert!(summary.contains("[time_agent]: agent says 15:04"));
    }

    #[tokio::test]
    async fn test_routing_ignores_prompt_template() {
        let llm = Arc::new(MockLlm::replying("计划已整理完毕，共三项补货安排"));
        let system = system(llm.clone(), None);

        let prompt = "任务信息：\n- 问题：帮我看看补货计划\n回答规则：\n1. 优先搜索获取实时数据；\n";
        system.answer("帮我看看补货计划", prompt, &[]).await.unwrap();

        let prompts = llm.prompts();
        // one agent call plus the summary
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0], prompt);
        let summary = &prompts[1];
        assert!(summary.starts_with(&format!("用户问题: {}", prompt)));
        assert!(summary.contains("[inventory_agent]: "));
        assert!(!summary.contains("[external_search_agent]"));
        assert!(!summary.contains("[github_agent]"));
    }

    #[tokio::test]
    async fn test_weak_summary_uses_fallback_model() {
        let default_llm = Arc::new(MockLlm::replying("agent output").on("用户问题", "Not found"));
        let fallback_llm = Arc::new(MockLlm::replying("深圳市南山区科技园南区十二号楼"));
        let system = system(default_llm, Some(fallback_llm.clone()));

        let answer = system.answer("公司注册地址在哪里", "公司注册地址在哪里", &[]).await.unwrap();
        assert_eq!(answer, "深圳市南山区科技园南区十二号楼");
        assert_eq!(fallback_llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_weak_summary_without_fallback_is_returned() {
        let llm = Arc::new(MockLlm::replying("agent output").on("用户问题", "Not found"));
        let system = system(llm, None);

        assert_eq!(system.answer("公司注册地址", "公司注册地址", &[]).await.unwrap(), "Not found");
    }

    #[tokio::test]
    async fn test_summary_error_uses_fallback_model() {
        let default_llm =
            Arc::new(MockLlm::replying("agent output").fail_on("用户问题", "HTTP 500"));
        let fallback_llm = Arc::new(MockLlm::replying("备用模型给出的完整答案内容"));
        let system = system(default_llm, Some(fallback_llm));

        assert_eq!(
            system.answer("随便问一个问题", "随便问一个问题", &[]).await.unwrap(),
            "备用模型给出的完整答案内容"
        );
    }

    #[tokio::test]
    async fn test_agent_error_propagates() {
        let llm = Arc::new(MockLlm::failing("connection refused"));
        let system = system(llm, None);

        let err = system.answer("现在几点", "现在几点", &[]).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    struct GarbledIntent;

    #[async_trait]
    impl Agent for GarbledIntent {
        fn name(&self) -> &str {
            IntentAgent::NAME
        }

        fn description(&self) -> &str {
            "returns prose instead of a list"
        }

        async fn execute(&self, _request: &AgentRequest) -> Result<AgentResult> {
            Ok(AgentResult::success("I think you want the time agent"))
        }
    }

    #[tokio::test]
    async fn test_unparseable_intent_uses_fallback_agent() {
        let routing = RoutingTable::default();
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlm::replying("ok"));
        let mut registry = standard_registry(&routing, llm.clone(), None);
        registry.register(Arc::new(GarbledIntent));
        let system = AgentSystem::new(registry, &routing).unwrap();

        assert_eq!(
            system.select_agents("现在几点").await,
            vec!["external_search_agent".to_string()]
        );
    }

    #[test]
    fn test_missing_routed_agent_is_rejected() {
        let routing = RoutingTable::default();
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlm::replying("ok"));
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(IntentAgent::new(Router::new(routing.clone()))));
        registry.register(Arc::new(LlmAgent::new(LlmAgent::DEFAULT, llm.clone())));
        registry.register(Arc::new(PromptAgent::new("chat_gpt", "chat", "", llm)));

        let err = AgentSystem::new(registry, &routing).err().unwrap();
        assert!(matches!(err, ConfigError::UnknownAgent(name) if name == "multi_format_agent"));
    }
}
