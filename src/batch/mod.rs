//! Sequential batch answering of a line-delimited task file.

pub mod prompt;
pub mod runner;
pub mod task;
pub mod writer;

pub use prompt::{build_prompt, TaskPrompt};
pub use runner::{sanitize_error, BatchRunner, BatchSummary};
pub use task::{read_tasks, FileRef, Task, TaskLine, TaskResult};
pub use writer::{open_writer, OutputFormat, ResultWriter};
