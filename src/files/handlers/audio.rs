use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

use super::{encode_base64, round1};
use crate::error::HandlerError;
use crate::files::record::{AudioInfo, AudioPayload};
use crate::files::FilePayload;

/// Audio bytes beyond this are not embedded.
pub const MAX_AUDIO_BYTES: u64 = 5 * 1024 * 1024;

pub async fn handle(path: &Path) -> Result<FilePayload, HandlerError> {
    let owned: PathBuf = path.to_path_buf();
    let is_wav = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);

    let mut audio_info = tokio::task::spawn_blocking(move || {
        if is_wav {
            wav_info(&owned)
        } else {
            mp3_info(&owned)
        }
    })
    .await??;

    let (bytes, truncated) = read_capped(path, MAX_AUDIO_BYTES).await?;
    if truncated {
        audio_info.warning = Some("Truncated to 5MB".to_string());
    }

    Ok(FilePayload::Audio(AudioPayload {
        audio_info,
        audio_base64: encode_base64(&bytes),
    }))
}

fn wav_info(path: &Path) -> Result<AudioInfo, HandlerError> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let duration = reader.duration() as f64 / spec.sample_rate.max(1) as f64;

    Ok(AudioInfo {
        channels: Some(spec.channels),
        sample_rate: Some(spec.sample_rate),
        duration_second: round1(duration),
        ..AudioInfo::default()
    })
}

/// Bitrate is the file-average, which equals the header bitrate for CBR.
fn mp3_info(path: &Path) -> Result<AudioInfo, HandlerError> {
    let duration = mp3_duration::from_path(path)
        .map_err(|e| HandlerError::Format(e.to_string()))?
        .as_secs_f64();
    let size = std::fs::metadata(path)?.len();
    let bitrate_kbps = (duration > 0.0).then(|| ((size as f64 * 8.0) / duration / 1000.0) as u64);

    Ok(AudioInfo {
        duration_second: round1(duration),
        bitrate_kbps,
        ..AudioInfo::default()
    })
}

/// Reads at most `limit` bytes; the flag is set when the cap was reached.
async fn read_capped(path: &Path, limit: u64) -> Result<(Vec<u8>, bool), HandlerError> {
    let file = tokio::fs::File::open(path).await?;
    let mut bytes = Vec::new();
    file.take(limit).read_to_end(&mut bytes).await?;
    let truncated = bytes.len() as u64 >= limit;
    Ok((bytes, truncated))
}
