use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::prompt::build_prompt;
use super::task::{read_tasks, Task, TaskLine, TaskResult};
use super::writer::ResultWriter;
use crate::files::SearchRoots;
use crate::normalize::Normalizer;
use crate::orchestrator::AgentSystem;

/// Characters of an error message kept in its answer.
const ERROR_MESSAGE_CHARS: usize = 100;

/// Turns an error message into a single-line answer that is safe to embed
/// in hand-written JSON.
pub fn sanitize_error(message: &str) -> String {
    let cleaned: String = message
        .chars()
        .take(ERROR_MESSAGE_CHARS)
        .map(|c| match c {
            '"' | '\'' | '\\' => ' ',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        "Error: Unknown error".to_string()
    } else {
        format!("Error: {}", collapsed)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub answered: usize,
    pub failed: usize,
    pub invalid: usize,
}

pub struct BatchRunner {
    system: Arc<AgentSystem>,
    normalizer: Normalizer,
    roots: SearchRoots,
}

impl BatchRunner {
    pub fn new(system: Arc<AgentSystem>, roots: SearchRoots) -> Self {
        let normalizer = Normalizer::standard();
        debug!("Normalizer steps: {:?}", normalizer.step_names());
        Self {
            system,
            normalizer,
            roots,
        }
    }

    /// Answers one question outside a batch, optionally with files.
    pub async fn ask(&self, task: &Task) -> Result<String> {
        let prompt = build_prompt(task, &self.roots);
        let raw = self
            .system
            .answer(&prompt.route_text, &prompt.text, &prompt.files)
            .await?;
        Ok(self.normalizer.normalize(&raw, &task.query))
    }

    /// Never fails: errors become the answer text.
    pub async fn run_task(&self, task: &Task) -> TaskResult {
        match self.ask(task).await {
            Ok(answer) => {
                info!(
                    "Processed task {} | Answer: {}",
                    task.task_id,
                    answer.chars().take(50).collect::<String>()
                );
                TaskResult::new(&task.task_id, answer)
            }
            Err(e) => {
                error!("Task {} failed: {}", task.task_id, e);
                TaskResult::new(&task.task_id, sanitize_error(&e.to_string()))
            }
        }
    }

    /// Runs every line of `content` in order, one task at a time, handing
    /// each result to `writer` as soon as it is known.
    pub async fn run(&self, content: &str, writer: &mut dyn ResultWriter) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();

        for line in read_tasks(content) {
            summary.total += 1;
            let result = match line {
                TaskLine::Task(task) => {
                    let result = self.run_task(&task).await;
                    if result.answer.starts_with("Error: ") {
                        summary.failed += 1;
                    } else {
                        summary.answered += 1;
                    }
                    result
                }
                TaskLine::Invalid(result) => {
                    error!("Task {} failed: invalid JSON", summary.total);
                    summary.invalid += 1;
                    result
                }
            };
            writer.write(&result).await?;
        }

        writer.finish().await?;
        info!(
            "All tasks processed: {} answered, {} failed, {} invalid",
            summary.answered, summary.failed, summary.invalid
        );
        Ok(summary)
    }
}
