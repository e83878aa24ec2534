use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::base::{Agent, AgentRequest, AgentResult};
use crate::llm::{LlmClient, Message};

/// An agent that is nothing more than a standing instruction for the model.
pub struct PromptAgent {
    name: String,
    description: String,
    instructions: String,
    llm: Arc<dyn LlmClient>,
}

impl PromptAgent {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        instructions: impl Into<String>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            instructions: instructions.into(),
            llm,
        }
    }
}

#[async_trait]
impl Agent for PromptAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, request: &AgentRequest) -> Result<AgentResult> {
        debug!("{} answering: {}", self.name, request.query);

        let system_prompt = format!("{}\n{}", self.description, self.instructions);
        let messages = vec![Message::system(system_prompt), Message::user(&request.query)];
        let output = self.llm.chat_with_history(messages, "default").await?;

        Ok(AgentResult::success(output))
    }
}

const SINGLE_LINE: &str = "答案仅含核心信息，不包含换行符，仅占一行，不要包含\"数据来源\"等说明性文字。";

/// The instruction-only agents: web, GitHub, external search, delivery,
/// inventory and general chat.
pub fn standard_prompt_agents(llm: Arc<dyn LlmClient>) -> Vec<PromptAgent> {
    vec![
        PromptAgent::new(
            "web_agent",
            "处理网页内容查询，特别是京东商品信息",
            format!(
                "1. 需要解析URL或网页内容时，根据链接中的信息作答\n\
                 2. 京东商品查询需先识别商品ID\n\
                 3. 严格按格式要求输出结果\n\
                 4. {}",
                SINGLE_LINE
            ),
            llm.clone(),
        ),
        PromptAgent::new(
            "github_agent",
            "处理GitHub相关查询，如版本、issues等",
            format!("根据仓库、版本和issue相关知识回答。{}", SINGLE_LINE),
            llm.clone(),
        ),
        PromptAgent::new(
            "external_search_agent",
            "处理需要外部网络搜索的查询，如实时数据、增长数据",
            format!(
                "1. 如果无法获取具体信息，基于自身知识给出合理答案\n\
                 2. 不要输出\"Not found\"或\"无法获取\"等否定性回答\n\
                 3. 直接输出基于知识的最佳答案\n\
                 4. {}",
                SINGLE_LINE
            ),
            llm.clone(),
        ),
        PromptAgent::new(
            "delivery_agent",
            "处理订单管理相关任务",
            format!("回答订单、发货、物流相关问题。{}", SINGLE_LINE),
            llm.clone(),
        ),
        PromptAgent::new(
            "inventory_agent",
            "处理库存管理相关任务",
            format!("回答库存、补货相关问题。{}", SINGLE_LINE),
            llm.clone(),
        ),
        PromptAgent::new(
            "chat_gpt",
            "处理普通对话、常识问答等无文件、无链接的任务",
            format!("基于相关知识给出最佳答案，不要输出Not found。{}", SINGLE_LINE),
            llm,
        ),
    ]
}
