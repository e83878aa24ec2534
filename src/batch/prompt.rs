use std::path::PathBuf;
use tracing::debug;

use super::task::Task;
use crate::files::SearchRoots;

/// The text sent to the agent system for one task, the files it names,
/// and the text the intent router matches keywords against.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPrompt {
    pub text: String,
    pub files: Vec<PathBuf>,
    pub route_text: String,
}

/// The user's question followed by the bare names of its files, so file
/// extensions can steer routing while the template wording cannot.
fn route_text(query: &str, files: &[PathBuf]) -> String {
    files
        .iter()
        .filter_map(|p| p.file_name())
        .fold(query.to_string(), |mut text, name| {
            text.push(' ');
            text.push_str(&name.to_string_lossy());
            text
        })
}

fn file_list_prompt(files: &str, query: &str) -> String {
    format!(
        "任务信息：\n\
         - 文件列表：{}\n\
         - 问题：{}\n\
         回答规则：\n\
         1. 基于所有文件内容综合分析回答；\n\
         2. 严格按格式要求输出；\n\
         3. 如果无法从文件中找到确切答案，基于相关知识给出合理答案；\n\
         4. 答案仅含核心信息，无多余文字，不包含换行符，仅占一行；\n\
         5. 不要包含\"数据来源\"等说明性文字。\n",
        files, query
    )
}

fn single_file_prompt(file: &str, query: &str) -> String {
    format!(
        "任务信息：\n\
         - 文件路径：{}\n\
         - 问题：{}\n\
         回答规则：\n\
         1. 优先基于文件内容回答；\n\
         2. 严格按格式要求输出；\n\
         3. 如果无法从文件中找到确切答案，基于相关知识给出合理答案；\n\
         4. 答案仅含核心信息，无多余文字，不包含换行符，仅占一行；\n\
         5. 不要包含\"数据来源\"等说明性文字。\n",
        file, query
    )
}

fn no_file_prompt(query: &str) -> String {
    format!(
        "任务信息：\n\
         - 问题：{}\n\
         回答规则：\n\
         1. 优先搜索获取实时数据；\n\
         2. 如果搜索工具无法获取信息，基于相关知识给出合理答案；\n\
         3. 严格按格式要求输出；\n\
         4. 答案不包含换行符，仅占一行；\n\
         5. 不要包含\"数据来源\"等说明性文字。\n",
        query
    )
}

/// Resolves the task's files against `roots` and picks the template:
/// file list, single file, or no file.
pub fn build_prompt(task: &Task, roots: &SearchRoots) -> TaskPrompt {
    let Some(file_ref) = &task.file_name else {
        return TaskPrompt {
            text: no_file_prompt(&task.query),
            files: Vec::new(),
            route_text: task.query.clone(),
        };
    };

    let resolved = roots.resolve_all(&file_ref.raw());
    for missing in resolved.iter().filter(|r| !r.exists) {
        debug!("Task {}: {:?} does not exist", task.task_id, missing.path);
    }
    let files: Vec<PathBuf> = resolved.into_iter().map(|r| r.path).collect();

    let text = if file_ref.is_list() {
        let listed = files
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        file_list_prompt(&format!("[{}]", listed), &task.query)
    } else {
        let file = files
            .first()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        single_file_prompt(&file, &task.query)
    };

    TaskPrompt {
        route_text: route_text(&task.query, &files),
        text,
        files,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::task::FileRef;
    use std::fs;
    use tempfile::TempDir;

    fn task(file_name: Option<FileRef>) -> Task {
        Task {
            task_id: "t1".to_string(),
            query: "图片里椅子是什么颜色".to_string(),
            file_name,
        }
    }

    #[test]
    fn test_no_file_template() {
        let roots = SearchRoots::new("data", ".");
        let prompt = build_prompt(&task(None), &roots);

        assert!(prompt.text.starts_with("任务信息：\n- 问题：图片里椅子是什么颜色\n"));
        assert!(prompt.text.contains("优先搜索获取实时数据"));
        assert!(prompt.files.is_empty());
        assert_eq!(prompt.route_text, "图片里椅子是什么颜色");
    }

    #[test]
    fn test_single_file_resolves_secondary_root() {
        let primary = TempDir::new().unwrap();
        let secondary = TempDir::new().unwrap();
        fs::write(secondary.path().join("chair.png"), b"png").unwrap();
        let roots = SearchRoots::new(primary.path(), secondary.path());

        let prompt = build_prompt(&task(Some(FileRef::One("chair.png".to_string()))), &roots);

        let expected = secondary.path().join("chair.png");
        assert_eq!(prompt.files, vec![expected.clone()]);
        assert!(prompt
            .text
            .contains(&format!("- 文件路径：{}\n", expected.display())));
        assert_eq!(prompt.route_text, "图片里椅子是什么颜色 chair.png");
    }

    #[test]
    fn test_file_list_keeps_unresolved_paths() {
        let primary = TempDir::new().unwrap();
        let roots = SearchRoots::new(primary.path(), primary.path());

        let prompt = build_prompt(
            &task(Some(FileRef::One("['a.txt', 'b.pdf']".to_string()))),
            &roots,
        );

        assert_eq!(
            prompt.files,
            vec![primary.path().join("a.txt"), primary.path().join("b.pdf")]
        );
        assert!(prompt.text.contains("- 文件列表：["));
        assert!(prompt.text.contains("基于所有文件内容综合分析回答"));
    }
}
