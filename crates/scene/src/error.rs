use thiserror::Error;

/// Result type for scene parsing
pub type Result<T> = std::result::Result<T, SceneError>;

/// Errors that can occur while reading Godot resource text
#[derive(Error, Debug)]
pub enum SceneError {
    /// Malformed line
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SceneError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }
}
