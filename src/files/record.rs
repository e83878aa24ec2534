use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use super::take_chars;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Excel,
    Text,
    Pptx,
    Image,
    Audio,
    Video,
    Pdf,
    Unknown,
}

impl FileKind {
    /// `ext` is the lower-cased extension including the dot.
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            ".xls" | ".xlsx" => FileKind::Excel,
            ".txt" => FileKind::Text,
            ".pptx" => FileKind::Pptx,
            ".jpg" | ".jpeg" | ".png" | ".bmp" => FileKind::Image,
            ".mp3" | ".wav" => FileKind::Audio,
            ".mp4" | ".avi" => FileKind::Video,
            ".pdf" => FileKind::Pdf,
            _ => FileKind::Unknown,
        }
    }

    /// Prefix used in handler error messages, e.g. `"PDF read error: ..."`.
    pub fn error_label(&self) -> &'static str {
        match self {
            FileKind::Excel => "Excel",
            FileKind::Text => "TXT",
            FileKind::Pptx => "PPTX",
            FileKind::Image => "Image",
            FileKind::Audio => "Audio",
            FileKind::Video => "Video",
            FileKind::Pdf => "PDF",
            FileKind::Unknown => "File",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Excel => "excel",
            FileKind::Text => "text",
            FileKind::Pptx => "pptx",
            FileKind::Image => "image",
            FileKind::Audio => "audio",
            FileKind::Video => "video",
            FileKind::Pdf => "pdf",
            FileKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PptxInfo {
    pub file_name: String,
    pub slide_count: usize,
    pub image_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlideText {
    pub slide_index: usize,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlideDeck {
    pub pptx_info: PptxInfo,
    pub slide_content: Vec<SlideText>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    pub format: String,
    pub size: String,
    pub mode: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImagePayload {
    pub image_info: ImageInfo,
    pub image_base64: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AudioInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    pub duration_second: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AudioPayload {
    pub audio_info: AudioInfo,
    pub audio_base64: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoInfo {
    pub file_name: String,
    pub duration_second: f64,
    pub fps: f64,
    pub key_frame_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyFrame {
    pub time_second: f64,
    pub frame_base64: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoPayload {
    pub video_info: VideoInfo,
    pub key_frames: Vec<KeyFrame>,
}

/// Parsed file content, shaped for prompt construction.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FilePayload {
    Text(String),
    Table(Vec<Map<String, Value>>),
    Slides(SlideDeck),
    Image(ImagePayload),
    Audio(AudioPayload),
    Video(VideoPayload),
}

/// Uniform result of one file handler. Exactly one of `content` and
/// `error` is set.
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub file: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub content: Option<FilePayload>,
    pub error: Option<String>,
}

fn pretty(value: &impl Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

impl FileRecord {
    pub fn loaded(path: &Path, kind: FileKind, content: FilePayload) -> Self {
        Self {
            file: path.display().to_string(),
            kind,
            content: Some(content),
            error: None,
        }
    }

    pub fn failed(path: &Path, kind: FileKind, error: impl Into<String>) -> Self {
        Self {
            file: path.display().to_string(),
            kind,
            content: None,
            error: Some(error.into()),
        }
    }

    /// Short, prompt-sized description of the content. Binary payloads are
    /// described by their info block only.
    pub fn content_preview(&self) -> String {
        let Some(content) = &self.content else {
            return self.error.clone().unwrap_or_default();
        };

        match content {
            FilePayload::Text(text) if self.kind == FileKind::Pdf => {
                format!("PDF Text (first 1000 chars):\n{}...", take_chars(text, 1000))
            }
            FilePayload::Text(text) => {
                format!("TXT Content (first 500 chars):\n{}...", take_chars(text, 500))
            }
            FilePayload::Table(rows) => {
                let head: Vec<_> = rows.iter().take(5).collect();
                format!("Excel Data (first 5 rows):\n{}...", pretty(&head))
            }
            FilePayload::Slides(deck) => {
                let head: Vec<_> = deck.slide_content.iter().take(3).collect();
                format!(
                    "PPTX Info: {}\nSlide 1-3 Content: {}...",
                    pretty(&deck.pptx_info),
                    pretty(&head)
                )
            }
            FilePayload::Image(image) => format!(
                "Image Info: {}\nImage is encoded in Base64 (analyze visual content to answer the question).",
                pretty(&image.image_info)
            ),
            FilePayload::Audio(audio) => format!(
                "Audio Info: {}\nAudio is encoded in Base64 (analyze audio content to answer the question).",
                pretty(&audio.audio_info)
            ),
            FilePayload::Video(video) => format!(
                "Video Info: {}\nKey Frames (5 frames max) encoded in Base64 (analyze visual content).",
                pretty(&video.video_info)
            ),
        }
    }
}

/// Builds the file question-answering prompt for one prepared file.
pub fn qa_prompt(record: &FileRecord, question: &str, format_req: &str) -> String {
    format!(
        r#"You are a multi-format file analysis expert. Follow these rules strictly:

1. File Information:
   - File Path: {}
   - File Type: {}
   - Content Preview:
     {}

2. Task:
   - Question: {}
   - Answer Format Requirement: {}

3. Critical Rules:
   a. Only use information from the file (NO external knowledge);
   b. Answer in the required format exactly (e.g., 'red' not 'Red', '5' not 'five');
   c. If the answer is not in the file, return "Not found in file";
   d. No extra text (e.g., no explanations, only the answer itself)."#,
        record.file,
        record.kind.as_str(),
        record.content_preview(),
        question,
        format_req
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(FileKind::from_extension(".xlsx"), FileKind::Excel);
        assert_eq!(FileKind::from_extension(".jpeg"), FileKind::Image);
        assert_eq!(FileKind::from_extension(".avi"), FileKind::Video);
        assert_eq!(FileKind::from_extension(".docx"), FileKind::Unknown);
        assert_eq!(FileKind::from_extension(""), FileKind::Unknown);
    }

    #[test]
    fn test_record_serializes_uniform_shape() {
        let record = FileRecord::loaded(
            &PathBuf::from("test/a.txt"),
            FileKind::Text,
            FilePayload::Text("hello".to_string()),
        );
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["type"], "text");
        assert_eq!(value["content"], "hello");
        assert!(value["error"].is_null());
    }

    #[test]
    fn test_failed_record_preview_is_error() {
        let record = FileRecord::failed(
            &PathBuf::from("test/report.pdf"),
            FileKind::Pdf,
            "PDF read error: file not found: test/report.pdf",
        );

        assert!(record.error.is_some());
        assert!(record.content_preview().starts_with("PDF read error"));
    }

    #[test]
    fn test_qa_prompt_carries_question_and_format() {
        let record = FileRecord::loaded(
            &PathBuf::from("test/notes.pdf"),
            FileKind::Pdf,
            FilePayload::Text("The chair is red.".to_string()),
        );
        let prompt = qa_prompt(&record, "What colour is the chair?", "lowercase English");

        assert!(prompt.contains("File Type: pdf"));
        assert!(prompt.contains("PDF Text (first 1000 chars):\nThe chair is red."));
        assert!(prompt.contains("Answer Format Requirement: lowercase English"));
    }
}
