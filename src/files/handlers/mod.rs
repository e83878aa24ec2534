//! One handler per file family. Each returns the payload or a
//! [`HandlerError`](crate::error::HandlerError); the dispatcher in
//! [`crate::files::prepare_file`] turns errors into records.

pub mod audio;
pub mod excel;
pub mod image;
pub mod pdf;
pub mod pptx;
pub mod text;
pub mod video;

use base64::{engine::general_purpose::STANDARD, Engine};

pub(crate) fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Rounds to one decimal place.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
