use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::ValueEnum;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::task::TaskResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per line, written as each task finishes.
    Jsonl,
    /// A JSON array with fixed indentation, written at the end.
    Array,
}

#[async_trait]
pub trait ResultWriter: Send {
    async fn write(&mut self, result: &TaskResult) -> Result<()>;

    async fn finish(&mut self) -> Result<()>;
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}

pub async fn open_writer(format: OutputFormat, path: &Path) -> Result<Box<dyn ResultWriter>> {
    ensure_parent(path).await?;
    Ok(match format {
        OutputFormat::Jsonl => Box::new(JsonlWriter::create(path).await?),
        OutputFormat::Array => Box::new(ArrayWriter::new(path)),
    })
}

/// Persists every result immediately, so a crash loses at most the task in
/// flight. The file is truncated when the writer is created.
pub struct JsonlWriter {
    path: PathBuf,
    file: File,
}

impl JsonlWriter {
    pub async fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }
}

#[async_trait]
impl ResultWriter for JsonlWriter {
    async fn write(&mut self, result: &TaskResult) -> Result<()> {
        let line = serde_json::to_string(result)?;
        self.file.write_all(format!("{}\n", line).as_bytes()).await?;
        self.file.flush().await?;
        debug!("Appended {} to {:?}", result.task_id, self.path);
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.file.flush().await?;
        Ok(())
    }
}

/// Buffers results and writes them as one array with two-space object
/// indentation and four-space field indentation.
pub struct ArrayWriter {
    path: PathBuf,
    results: Vec<TaskResult>,
}

impl ArrayWriter {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            results: Vec::new(),
        }
    }
}

/// Renders results in the fixed array layout. Values are JSON string
/// literals, so quotes and control characters in answers stay valid.
pub fn render_array(results: &[TaskResult]) -> String {
    let quote = |s: &str| serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string());

    let mut out = String::from("[\n");
    for (idx, result) in results.iter().enumerate() {
        out.push_str("  {\n");
        out.push_str(&format!("    \"task_id\": {},\n", quote(&result.task_id)));
        out.push_str(&format!("    \"answer\": {}\n", quote(&result.answer)));
        if idx + 1 == results.len() {
            out.push_str("  }\n");
        } else {
            out.push_str("  },\n");
        }
    }
    out.push_str("]\n");
    out
}

#[async_trait]
impl ResultWriter for ArrayWriter {
    async fn write(&mut self, result: &TaskResult) -> Result<()> {
        self.results.push(result.clone());
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        fs::write(&self.path, render_array(&self.results))
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        debug!("Wrote {} results to {:?}", self.results.len(), self.path);
        Ok(())
    }
}
