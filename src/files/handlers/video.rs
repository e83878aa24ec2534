use image::{DynamicImage, ImageOutputFormat};
use serde::Deserialize;
use std::io::Cursor;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{encode_base64, round1};
use crate::error::HandlerError;
use crate::files::record::{KeyFrame, VideoInfo, VideoPayload};
use crate::files::FilePayload;

/// Seconds between sampled frames.
const SAMPLE_INTERVAL_SECS: f64 = 5.0;
const MAX_KEY_FRAMES: usize = 5;
const FRAME_WIDTH: u32 = 640;
const FRAME_HEIGHT: u32 = 480;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, PartialEq)]
struct StreamFacts {
    fps: f64,
    frame_count: u64,
}

pub async fn handle(path: &Path) -> Result<FilePayload, HandlerError> {
    let facts = probe(path).await?;
    debug!("Video {:?}: {:?}", path, facts);

    let mut key_frames = Vec::new();
    for position in key_frame_positions(facts.frame_count, facts.fps) {
        let seconds = position as f64 / facts.fps;
        match extract_frame(path, seconds).await {
            Ok(bytes) => key_frames.push(KeyFrame {
                time_second: round1(seconds),
                frame_base64: encode_base64(&bytes),
            }),
            // an unreadable frame is skipped, like a short read
            Err(e) => warn!("Skipping frame at {:.1}s of {:?}: {}", seconds, path, e),
        }
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(FilePayload::Video(VideoPayload {
        video_info: VideoInfo {
            file_name,
            duration_second: round1(facts.frame_count as f64 / facts.fps),
            fps: round1(facts.fps),
            key_frame_count: key_frames.len(),
        },
        key_frames,
    }))
}

async fn probe(path: &Path) -> Result<StreamFacts, HandlerError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=avg_frame_rate,r_frame_rate,nb_frames:format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| HandlerError::Media(format!("Failed to open video: ffprobe unavailable ({})", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(HandlerError::Media(format!(
            "Failed to open video: {}",
            stderr.trim()
        )));
    }

    let parsed: ProbeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| HandlerError::Media(format!("Failed to open video: {}", e)))?;
    stream_facts(&parsed)
}

fn stream_facts(probe: &ProbeOutput) -> Result<StreamFacts, HandlerError> {
    let stream = probe
        .streams
        .first()
        .ok_or_else(|| HandlerError::Media("Failed to open video: no video stream".to_string()))?;

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rate))
        .ok_or_else(|| HandlerError::Media("Failed to open video: unknown frame rate".to_string()))?;

    let frame_count = match stream.nb_frames.as_deref().and_then(|n| n.parse::<u64>().ok()) {
        Some(count) => count,
        None => {
            let duration = probe
                .format
                .as_ref()
                .and_then(|f| f.duration.as_deref())
                .and_then(|d| d.parse::<f64>().ok())
                .unwrap_or(0.0);
            (duration * fps).round() as u64
        }
    };

    Ok(StreamFacts { fps, frame_count })
}

/// Parses ffprobe rates such as `30000/1001` or `25`. Zero rates are None.
fn parse_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num.trim().parse::<f64>().ok()? / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Frame indexes sampled every five seconds, at most five of them.
fn key_frame_positions(frame_count: u64, fps: f64) -> Vec<u64> {
    let step = ((fps * SAMPLE_INTERVAL_SECS) as u64).max(1);
    let end = frame_count.min(step.saturating_mul(MAX_KEY_FRAMES as u64));
    (0..end).step_by(step as usize).collect()
}

async fn extract_frame(path: &Path, seconds: f64) -> Result<Vec<u8>, HandlerError> {
    let output = Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &format!("{:.3}", seconds), "-i"])
        .arg(path)
        .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-"])
        .output()
        .await
        .map_err(|e| HandlerError::Media(format!("ffmpeg unavailable: {}", e)))?;

    if !output.status.success() || output.stdout.is_empty() {
        return Err(HandlerError::Media(format!(
            "no frame at {:.1}s: {}",
            seconds,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let png = output.stdout;
    tokio::task::spawn_blocking(move || frame_to_jpeg(&png)).await?
}

/// Decodes one encoded frame and re-encodes it as a JPEG no larger than
/// 640x480.
fn frame_to_jpeg(encoded: &[u8]) -> Result<Vec<u8>, HandlerError> {
    let frame = image::load_from_memory(encoded)?;
    let thumb = if frame.width() > FRAME_WIDTH || frame.height() > FRAME_HEIGHT {
        frame.thumbnail(FRAME_WIDTH, FRAME_HEIGHT)
    } else {
        frame
    };

    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(thumb.to_rgb8()).write_to(&mut buf, ImageOutputFormat::Jpeg(75))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("25/1"), Some(25.0));
        assert_eq!(parse_rate("24"), Some(24.0));
        assert!((parse_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("abc"), None);
        assert_eq!(parse_rate("inf"), None);
        assert_eq!(parse_rate("1/0.0"), None);
        assert_eq!(parse_rate("NaN"), None);
    }

    #[test]
    fn test_key_frame_positions() {
        // 60s at 30fps: one frame every 150, capped at five
        assert_eq!(key_frame_positions(1800, 30.0), vec![0, 150, 300, 450, 600]);
        // 12s clip yields frames at 0s, 5s and 10s
        assert_eq!(key_frame_positions(300, 25.0), vec![0, 125, 250]);
        assert!(key_frame_positions(0, 25.0).is_empty());
        // sub-1/5 fps still advances
        assert_eq!(key_frame_positions(3, 0.1), vec![0, 1, 2]);
        // absurd rates clamp instead of overflowing
        assert_eq!(key_frame_positions(10, f64::INFINITY), vec![0]);
        assert_eq!(key_frame_positions(u64::MAX, 1e300), vec![0]);
    }

    #[test]
    fn test_stream_facts_from_probe_json() {
        let probe: ProbeOutput = serde_json::from_str(
            r#"{"programs":[],"streams":[{"r_frame_rate":"25/1","avg_frame_rate":"25/1","nb_frames":"250"}],"format":{"duration":"10.000000"}}"#,
        )
        .unwrap();
        assert_eq!(
            stream_facts(&probe).unwrap(),
            StreamFacts { fps: 25.0, frame_count: 250 }
        );
    }

    #[test]
    fn test_stream_facts_falls_back_to_duration() {
        let probe: ProbeOutput = serde_json::from_str(
            r#"{"streams":[{"r_frame_rate":"30/1","avg_frame_rate":"0/0"}],"format":{"duration":"4.0"}}"#,
        )
        .unwrap();
        assert_eq!(
            stream_facts(&probe).unwrap(),
            StreamFacts { fps: 30.0, frame_count: 120 }
        );
    }

    #[test]
    fn test_no_video_stream() {
        let probe: ProbeOutput = serde_json::from_str(r#"{"streams":[]}"#).unwrap();
        let err = stream_facts(&probe).unwrap_err();
        assert!(err.to_string().starts_with("Failed to open video"));
    }

    #[test]
    fn test_frame_to_jpeg_shrinks() {
        let mut png = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(1280, 720)
            .write_to(&mut png, ImageOutputFormat::Png)
            .unwrap();

        let bytes = frame_to_jpeg(png.get_ref()).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (640, 360));
    }

    #[test]
    fn test_frame_to_jpeg_rejects_garbage() {
        assert!(matches!(frame_to_jpeg(b"not a png"), Err(HandlerError::Image(_))));
    }
}
