use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScannerError>;

#[derive(Error, Debug)]
pub enum ScannerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
