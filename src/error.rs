use std::path::PathBuf;
use thiserror::Error;

/// Failures inside a single file handler. These never escape the
/// dispatcher: they are rendered into the record's `error` field.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("{0}")]
    Pdf(#[from] lopdf::Error),

    #[error("{0}")]
    Image(#[from] image::ImageError),

    #[error("{0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("{0}")]
    Wav(#[from] hound::Error),

    #[error("{0}")]
    Format(String),

    #[error("{0}")]
    Media(String),

    #[error("worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid routing table in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("routing table names unregistered agent '{0}'")]
    UnknownAgent(String),
}
