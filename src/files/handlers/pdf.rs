use lopdf::Document;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::HandlerError;
use crate::files::{cap_text, FilePayload};

pub async fn handle(path: &Path) -> Result<FilePayload, HandlerError> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_text(&path)).await?
}

/// Text of every page joined by newlines. A page whose text cannot be
/// extracted contributes an empty line instead of failing the document.
fn extract_text(path: &Path) -> Result<FilePayload, HandlerError> {
    let doc = Document::load(path)?;
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();

    let texts: Vec<String> = pages
        .iter()
        .map(|page| {
            doc.extract_text(&[*page]).unwrap_or_else(|e| {
                debug!("No text on page {} of {:?}: {}", page, path, e);
                String::new()
            })
        })
        .collect();

    Ok(FilePayload::Text(cap_text(&texts.join("\n"))))
}
