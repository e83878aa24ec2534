use image::io::Reader as ImageReader;
use image::{ColorType, DynamicImage, ImageFormat, ImageOutputFormat};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use super::encode_base64;
use crate::error::HandlerError;
use crate::files::record::{ImageInfo, ImagePayload};
use crate::files::FilePayload;

pub const MAX_WIDTH: u32 = 800;
pub const MAX_HEIGHT: u32 = 600;

pub async fn handle(path: &Path) -> Result<FilePayload, HandlerError> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || encode_image(&path)).await?
}

fn encode_image(path: &Path) -> Result<FilePayload, HandlerError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader.format();
    let img = reader.decode()?;

    let image_info = ImageInfo {
        format: format.map(format_name).unwrap_or_else(|| "UNKNOWN".to_string()),
        size: format!("{}x{}", img.width(), img.height()),
        mode: color_mode(img.color()),
    };

    let bytes = encode_thumbnail(&img, format)?;

    Ok(FilePayload::Image(ImagePayload {
        image_info,
        image_base64: encode_base64(&bytes),
    }))
}

/// Shrinks to fit 800x600 (never enlarges) and re-encodes in the source
/// format, JPEG when the source format has no encoder here.
fn encode_thumbnail(img: &DynamicImage, format: Option<ImageFormat>) -> Result<Vec<u8>, HandlerError> {
    let thumb = if img.width() > MAX_WIDTH || img.height() > MAX_HEIGHT {
        img.thumbnail(MAX_WIDTH, MAX_HEIGHT)
    } else {
        img.clone()
    };

    let mut buf = Cursor::new(Vec::new());
    match format {
        Some(ImageFormat::Png) => thumb.write_to(&mut buf, ImageOutputFormat::Png)?,
        Some(ImageFormat::Bmp) => thumb.write_to(&mut buf, ImageOutputFormat::Bmp)?,
        _ => DynamicImage::ImageRgb8(thumb.to_rgb8())
            .write_to(&mut buf, ImageOutputFormat::Jpeg(85))?,
    }
    Ok(buf.into_inner())
}

fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Png => "PNG".to_string(),
        ImageFormat::Jpeg => "JPEG".to_string(),
        ImageFormat::Bmp => "BMP".to_string(),
        other => format!("{:?}", other).to_uppercase(),
    }
}

fn color_mode(color: ColorType) -> String {
    match color {
        ColorType::L8 => "L".to_string(),
        ColorType::La8 => "LA".to_string(),
        ColorType::Rgb8 => "RGB".to_string(),
        ColorType::Rgba8 => "RGBA".to_string(),
        ColorType::L16 => "I;16".to_string(),
        other => format!("{:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_png(dir: &TempDir, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.path().join(name);
        let img = RgbImage::from_pixel(width, height, Rgb([200, 10, 10]));
        img.save_with_format(&path, ImageFormat::Png).unwrap();
        path
    }

    #[tokio::test]
    async fn test_small_png_keeps_size_and_format() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "chair.png", 40, 30);

        let FilePayload::Image(payload) = handle(&path).await.unwrap() else {
            panic!("expected image payload");
        };

        assert_eq!(payload.image_info.format, "PNG");
        assert_eq!(payload.image_info.size, "40x30");
        assert_eq!(payload.image_info.mode, "RGB");
        // base64 of the PNG signature
        assert!(payload.image_base64.starts_with("iVBORw0KGgo"));
    }

    #[test]
    fn test_large_image_is_shrunk() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(1600, 600));
        let bytes = encode_thumbnail(&img, Some(ImageFormat::Png)).unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (800, 300));
    }

    #[tokio::test]
    async fn test_misnamed_file_is_an_image_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, "definitely not jpeg").unwrap();

        assert!(handle(&path).await.is_err());
    }
}
