pub mod base;
pub mod file;
pub mod intent;
pub mod llm;
pub mod prompt;
pub mod time;

pub use base::{Agent, AgentRegistry, AgentRequest, AgentResult};
pub use file::FileAgent;
pub use intent::IntentAgent;
pub use llm::LlmAgent;
pub use prompt::{standard_prompt_agents, PromptAgent};
pub use time::TimeAgent;
