use serde::{Deserialize, Serialize};

/// `file_name` as it appears in the input: a single name, an explicit list,
/// or a string that itself encodes a list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FileRef {
    One(String),
    Many(Vec<String>),
}

impl FileRef {
    pub fn is_empty(&self) -> bool {
        match self {
            FileRef::One(name) => name.trim().is_empty(),
            FileRef::Many(names) => names.iter().all(|n| n.trim().is_empty()),
        }
    }

    /// True for an explicit list and for a bracketed string.
    pub fn is_list(&self) -> bool {
        match self {
            FileRef::One(name) => {
                let name = name.trim();
                name.starts_with('[') && name.ends_with(']')
            }
            FileRef::Many(_) => true,
        }
    }

    /// The raw text handed to the path resolver.
    pub fn raw(&self) -> String {
        match self {
            FileRef::One(name) => name.clone(),
            FileRef::Many(names) => serde_json::to_string(names).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawTask {
    task_id: Option<String>,
    #[serde(default)]
    query: String,
    file_name: Option<FileRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub task_id: String,
    pub query: String,
    pub file_name: Option<FileRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub answer: String,
}

impl TaskResult {
    pub fn new(task_id: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            answer: answer.into(),
        }
    }
}

/// One input line after decoding: either a task to run or a result that
/// is already known.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskLine {
    Task(Task),
    Invalid(TaskResult),
}

pub const INVALID_JSON_ANSWER: &str = "Error: Invalid JSON format";

/// Decodes line `index` (1-based). A missing `task_id` becomes `task_{index}`.
pub fn parse_task_line(line: &str, index: usize) -> TaskLine {
    match serde_json::from_str::<RawTask>(line.trim()) {
        Ok(raw) => TaskLine::Task(Task {
            task_id: raw.task_id.unwrap_or_else(|| format!("task_{}", index)),
            query: raw.query,
            file_name: raw.file_name.filter(|f| !f.is_empty()),
        }),
        Err(_) => TaskLine::Invalid(TaskResult::new(
            format!("invalid_task_{}", index),
            INVALID_JSON_ANSWER,
        )),
    }
}

/// Every non-empty line of `content`, numbered from 1 in line order.
pub fn read_tasks(content: &str) -> Vec<TaskLine> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(idx, line)| parse_task_line(line, idx + 1))
        .collect()
}
