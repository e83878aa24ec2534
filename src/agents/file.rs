use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::base::{Agent, AgentRequest, AgentResult};
use crate::files::{self, qa_prompt, FileKind};
use crate::llm::{LlmClient, Message};
use crate::normalize::detect_format_requirement;

const NO_FILE_PROMPT: &str = "没有可用的文件。请基于相关知识给出最佳答案，不要输出Not found，\
答案仅含核心信息，不包含换行符，仅占一行，不要包含数据来源等说明性文字。";

/// Answers questions from prepared file content.
///
/// Each variant accepts a subset of file kinds; files of other kinds are
/// ignored, and with nothing left the agent answers from general knowledge.
pub struct FileAgent {
    name: String,
    description: String,
    kinds: Option<Vec<FileKind>>,
    llm: Arc<dyn LlmClient>,
}

impl FileAgent {
    /// Every supported kind.
    pub fn multi_format(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            name: "multi_format_agent".to_string(),
            description: "处理所有文件相关问题，基于文件内容回答".to_string(),
            kinds: None,
            llm,
        }
    }

    pub fn pdf(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            name: "pdf_agent".to_string(),
            description: "提取PDF文本内容并回答".to_string(),
            kinds: Some(vec![FileKind::Pdf]),
            llm,
        }
    }

    pub fn video(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            name: "video_agent".to_string(),
            description: "处理视频文件，获取时长、提取帧等".to_string(),
            kinds: Some(vec![FileKind::Video]),
            llm,
        }
    }

    /// Umbrella for audio, video and images.
    pub fn media(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            name: "media_agent".to_string(),
            description: "处理音频、视频和图片文件".to_string(),
            kinds: Some(vec![FileKind::Audio, FileKind::Video, FileKind::Image]),
            llm,
        }
    }

    fn accepts(&self, path: &Path) -> bool {
        match &self.kinds {
            None => true,
            Some(kinds) => kinds.contains(&FileKind::from_extension(&files::extension(path))),
        }
    }

    /// The answer for one file, or `Err` carrying the handler error text
    /// when the file could not be prepared.
    async fn answer_file(
        &self,
        path: &Path,
        question: &str,
        format_req: &str,
    ) -> Result<std::result::Result<String, String>> {
        let record = files::prepare_file(path).await;
        if let Some(error) = &record.error {
            warn!("{}: {} could not be prepared: {}", self.name, record.file, error);
            return Ok(Err(error.clone()));
        }

        let prompt = qa_prompt(&record, question, format_req);
        let answer = self
            .llm
            .chat_with_history(vec![Message::user(prompt)], "default")
            .await?;
        Ok(Ok(answer))
    }
}

#[async_trait]
impl Agent for FileAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, request: &AgentRequest) -> Result<AgentResult> {
        let targets: Vec<&PathBuf> = request.files.iter().filter(|p| self.accepts(p)).collect();
        debug!("{} handling {} file(s)", self.name, targets.len());

        if targets.is_empty() {
            let messages = vec![Message::system(NO_FILE_PROMPT), Message::user(&request.query)];
            let output = self.llm.chat_with_history(messages, "default").await?;
            return Ok(AgentResult::success(output).with_metadata("files", "0"));
        }

        let format_req = detect_format_requirement(&request.query);
        let mut answers = Vec::with_capacity(targets.len());
        let mut unreadable = 0;
        for path in &targets {
            let answer = match self.answer_file(path, &request.query, &format_req).await? {
                Ok(answer) => answer,
                Err(error) => {
                    unreadable += 1;
                    error
                }
            };
            answers.push((path.display().to_string(), answer));
        }

        let output = if answers.len() == 1 {
            answers.remove(0).1
        } else {
            answers
                .iter()
                .map(|(file, answer)| format!("{}: {}", file, answer))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let result = if unreadable == targets.len() {
            AgentResult::failure(output, "no readable files")
        } else {
            AgentResult::success(output)
        };
        Ok(result.with_metadata("files", targets.len().to_string()))
    }
}
