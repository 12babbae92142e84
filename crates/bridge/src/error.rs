use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Scene error: {0}")]
    SceneError(#[from] gdbridge_scene::SceneError),

    /// The host cannot perform the operation (e.g. no Godot executable configured).
    #[error("Editor capability unavailable: {0}")]
    Unavailable(String),

    /// A `res://` path that does not resolve inside the project.
    #[error("Invalid project path: {0}")]
    InvalidPath(String),
}
