use thiserror::Error;

#[derive(Error, Debug)]
pub enum EegError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid file format: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Montage '{montage}' references channel '{channel}' which is not in the recording")]
    MissingChannel { channel: String, montage: String },

    #[error("No recording is open")]
    NoRecordingOpen,

    #[error("Invalid window request: {0}")]
    InvalidWindow(String),

    #[error("Invalid annotation: {0}")]
    InvalidAnnotation(String),
}

pub type Result<T> = std::result::Result<T, EegError>;
