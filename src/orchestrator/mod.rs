pub mod system;

pub use system::{is_weak_answer, standard_registry, summary_prompt, AgentSystem};
