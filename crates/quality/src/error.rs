use thiserror::Error;

/// Result type for quality evaluation and report storage
pub type Result<T> = std::result::Result<T, QualityError>;

#[derive(Error, Debug)]
pub enum QualityError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Scene error: {0}")]
    SceneError(#[from] gdbridge_scene::SceneError),

    /// Report file exists but is not a report document.
    #[error("Invalid report {file}: {message}")]
    InvalidReport { file: String, message: String },
}
