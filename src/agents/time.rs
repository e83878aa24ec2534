use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, FixedOffset, Offset, Utc, Weekday};
use std::sync::Arc;
use tracing::debug;

use super::base::{Agent, AgentRequest, AgentResult};
use crate::llm::{LlmClient, Message};

/// Asia/Shanghai has no daylight saving, so a fixed offset is exact.
const SHANGHAI_OFFSET_SECS: i32 = 8 * 3600;

pub struct TimeAgent {
    llm: Arc<dyn LlmClient>,
    clock: fn() -> DateTime<Utc>,
}

impl TimeAgent {
    pub const NAME: &'static str = "time_agent";

    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            clock: Utc::now,
        }
    }

    #[cfg(test)]
    fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }
}

fn weekday_zh(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "星期一",
        Weekday::Tue => "星期二",
        Weekday::Wed => "星期三",
        Weekday::Thu => "星期四",
        Weekday::Fri => "星期五",
        Weekday::Sat => "星期六",
        Weekday::Sun => "星期日",
    }
}

/// Current time in Asia/Shanghai, e.g. `2024-05-01 15:04:05 星期三 (Asia/Shanghai, UTC+8)`.
pub fn shanghai_now_text(now: DateTime<Utc>) -> String {
    let offset = FixedOffset::east_opt(SHANGHAI_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    let local = now.with_timezone(&offset);
    format!(
        "{} {} (Asia/Shanghai, UTC+8)",
        local.format("%Y-%m-%d %H:%M:%S"),
        weekday_zh(local.weekday())
    )
}

#[async_trait]
impl Agent for TimeAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "处理时间查询相关问题"
    }

    async fn execute(&self, request: &AgentRequest) -> Result<AgentResult> {
        let now = shanghai_now_text((self.clock)());
        debug!("Time agent clock: {}", now);

        let system_prompt = format!(
            "你是时间查询助手。当前时间：{}。请仅根据该时间回答用户的问题，答案不包含换行符，仅占一行。",
            now
        );
        let messages = vec![Message::system(system_prompt), Message::user(&request.query)];
        let output = self.llm.chat_with_history(messages, "default").await?;

        Ok(AgentResult::success(output).with_metadata("now", now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockLlm;
    use chrono::TimeZone;

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 7, 4, 5).unwrap()
    }

    #[test]
    fn test_shanghai_is_utc_plus_eight() {
        assert_eq!(
            shanghai_now_text(fixed_clock()),
            "2024-05-01 15:04:05 星期三 (Asia/Shanghai, UTC+8)"
        );
    }

    #[test]
    fn test_crosses_midnight() {
        let late = Utc.with_ymd_and_hms(2024, 12, 31, 20, 0, 0).unwrap();
        assert!(shanghai_now_text(late).starts_with("2025-01-01 04:00:00"));
    }

    #[tokio::test]
    async fn test_time_is_given_to_the_model() {
        let llm = Arc::new(MockLlm::replying("现在是下午3点"));
        let agent = TimeAgent::new(llm.clone()).with_clock(fixed_clock);

        let result = agent.execute(&AgentRequest::new("现在几点")).await.unwrap();
        assert_eq!(result.output, "现在是下午3点");
        assert!(result.metadata["now"].contains("15:04:05"));
        assert_eq!(llm.prompts(), vec!["现在几点".to_string()]);
    }
}
