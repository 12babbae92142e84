use thiserror::Error;

pub type Result<T> = std::result::Result<T, CollectorError>;

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The host cannot validate scripts right now (no editor, binary missing, timed out).
    #[error("Script loader unavailable: {0}")]
    LoaderUnavailable(String),
}
