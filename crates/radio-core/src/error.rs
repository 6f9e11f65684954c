//! Error types for radio-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Degenerate space: {0}")]
    DegenerateSpace(String),

    #[error("Invalid selector: {selector} >= {max}")]
    InvalidSelector { selector: u64, max: u64 },

    #[error("Frame too large: {size} bytes > {max}")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Unknown content type: {0}")]
    UnknownContentType(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}
