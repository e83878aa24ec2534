use std::path::Path;

use crate::error::HandlerError;
use crate::files::{cap_text, FilePayload};

pub async fn handle(path: &Path) -> Result<FilePayload, HandlerError> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(FilePayload::Text(cap_text(&text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_utf8_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "椅子是红色的").unwrap();

        match handle(&path).await.unwrap() {
            FilePayload::Text(text) => assert_eq!(text, "椅子是红色的"),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("binary.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        assert!(handle(&path).await.is_err());
    }
}
