use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use crate::error::HandlerError;
use crate::files::record::{PptxInfo, SlideDeck, SlideText};
use crate::files::FilePayload;

static SLIDE_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").unwrap());
static PARAGRAPH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<a:p[ >].*?</a:p>").unwrap());
static TEXT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<a:t(?:\s[^>]*)?>([^<]*)</a:t>").unwrap());
static PICTURE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<p:pic[\s>]").unwrap());
static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|lt|gt|quot|apos|amp);").unwrap());

pub async fn handle(path: &Path) -> Result<FilePayload, HandlerError> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || read_deck(&path)).await?
}

fn read_deck(path: &Path) -> Result<FilePayload, HandlerError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;

    let mut slides: Vec<(usize, String)> = Vec::new();
    for idx in 0..archive.len() {
        let mut entry = archive.by_index(idx)?;
        let number = SLIDE_ENTRY
            .captures(entry.name())
            .and_then(|caps| caps[1].parse::<usize>().ok());
        if let Some(number) = number {
            let mut xml = String::new();
            entry.read_to_string(&mut xml)?;
            slides.push((number, xml));
        }
    }
    slides.sort_by_key(|(number, _)| *number);

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(FilePayload::Slides(build_deck(file_name, &slides)))
}

fn build_deck(file_name: String, slides: &[(usize, String)]) -> SlideDeck {
    let image_count = slides
        .iter()
        .map(|(_, xml)| PICTURE.find_iter(xml).count())
        .sum();

    let slide_content = slides
        .iter()
        .enumerate()
        .map(|(idx, (_, xml))| {
            let text = slide_text(xml);
            SlideText {
                slide_index: idx + 1,
                text: if text.is_empty() {
                    "No text".to_string()
                } else {
                    text
                },
            }
        })
        .collect();

    SlideDeck {
        pptx_info: PptxInfo {
            file_name,
            slide_count: slides.len(),
            image_count,
        },
        slide_content,
    }
}

fn slide_text(xml: &str) -> String {
    PARAGRAPH
        .find_iter(xml)
        .map(|para| {
            TEXT_RUN
                .captures_iter(para.as_str())
                .map(|caps| unescape_xml(&caps[1]))
                .collect::<String>()
        })
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decodes the predefined entities and numeric character references in a
/// single pass. References to invalid code points are left as written.
fn unescape_xml(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                _ => {
                    let code = match entity.strip_prefix("#x").or(entity.strip_prefix("#X")) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => entity[1..].parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
