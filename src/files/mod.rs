pub mod handlers;
pub mod record;
pub mod resolver;

use std::path::Path;
use tracing::{debug, warn};

use crate::error::HandlerError;

pub use record::{qa_prompt, FileKind, FilePayload, FileRecord};
pub use resolver::{decode_file_names, ResolvedPath, SearchRoots};

/// Character cap for text-like content (txt, pdf).
pub const TEXT_CHAR_LIMIT: usize = 10_000;

pub(crate) fn take_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Caps `text` at [`TEXT_CHAR_LIMIT`] characters, appending a marker when
/// the limit is reached.
pub(crate) fn cap_text(text: &str) -> String {
    if text.chars().count() >= TEXT_CHAR_LIMIT {
        format!(
            "{}\n...[Truncated: over {} characters]",
            take_chars(text, TEXT_CHAR_LIMIT),
            TEXT_CHAR_LIMIT
        )
    } else {
        text.to_string()
    }
}

pub(crate) fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// Reads `path` with the handler for its extension. Never fails: handler
/// errors land in [`FileRecord::error`].
pub async fn prepare_file(path: impl AsRef<Path>) -> FileRecord {
    let path = path.as_ref();
    let ext = extension(path);
    let kind = FileKind::from_extension(&ext);

    if kind == FileKind::Unknown {
        return FileRecord::failed(path, kind, format!("Unsupported file type: {}", ext));
    }

    debug!("Preparing {} file: {:?}", kind.as_str(), path);

    let outcome = if tokio::fs::metadata(path).await.is_err() {
        Err(HandlerError::NotFound(path.to_path_buf()))
    } else {
        match kind {
            FileKind::Excel => handlers::excel::handle(path).await,
            FileKind::Text => handlers::text::handle(path).await,
            FileKind::Pptx => handlers::pptx::handle(path).await,
            FileKind::Image => handlers::image::handle(path).await,
            FileKind::Audio => handlers::audio::handle(path).await,
            FileKind::Video => handlers::video::handle(path).await,
            FileKind::Pdf => handlers::pdf::handle(path).await,
            FileKind::Unknown => Err(HandlerError::Format(format!(
                "Unsupported file type: {}",
                ext
            ))),
        }
    };

    match outcome {
        Ok(content) => FileRecord::loaded(path, kind, content),
        Err(e) => {
            let message = format!("{} read error: {}", kind.error_label(), e);
            warn!("{}", message);
            FileRecord::failed(path, kind, message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_take_chars_respects_multibyte() {
        assert_eq!(take_chars("数据来源", 2), "数据");
        assert_eq!(take_chars("abc", 10), "abc");
    }

    #[test]
    fn test_cap_text_marks_truncation() {
        let long = "字".repeat(TEXT_CHAR_LIMIT + 5);
        let capped = cap_text(&long);

        assert!(capped.ends_with("...[Truncated: over 10000 characters]"));
        assert_eq!(capped.chars().filter(|c| *c == '字').count(), TEXT_CHAR_LIMIT);
        assert_eq!(cap_text("short"), "short");
    }

    #[test]
    fn test_unsupported_extension() {
        let record = tokio_test::block_on(prepare_file("notes.docx"));

        assert_eq!(record.kind, FileKind::Unknown);
        assert_eq!(record.error.as_deref(), Some("Unsupported file type: .docx"));
    }

    #[tokio::test]
    async fn test_missing_file_is_reported_not_raised() {
        let dir = TempDir::new().unwrap();
        let record = prepare_file(dir.path().join("report.pdf")).await;

        assert_eq!(record.kind, FileKind::Pdf);
        assert!(record.content.is_none());
        let error = record.error.unwrap();
        assert!(error.starts_with("PDF read error: file not found"), "{error}");
    }

    #[tokio::test]
    async fn test_extension_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("NOTES.TXT");
        std::fs::write(&path, "upper case extension").unwrap();

        let record = prepare_file(&path).await;
        assert_eq!(record.kind, FileKind::Text);
        assert!(record.error.is_none());
    }
}
