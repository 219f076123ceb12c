use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubbatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Root directory not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Could not parse subtitle file {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("Subtitle file {} contains no entries", .0.display())]
    EmptySubtitle(PathBuf),

    #[error("Could not write subtitle file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SubbatchError>;
