//! Error types for I/O operations

use thiserror::Error;

/// Errors that can occur during I/O operations
#[derive(Error, Debug)]
pub enum IoError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid file format: {format}")]
    InvalidFormat { format: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Write error: {message}")]
    WriteError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<IoError> for grovemesh_core::Error {
    fn from(err: IoError) -> Self {
        match err {
            IoError::Io(e) => grovemesh_core::Error::Io(e),
            IoError::InvalidFormat { format } => grovemesh_core::Error::UnsupportedFormat(format),
            other => grovemesh_core::Error::InvalidData(other.to_string()),
        }
    }
}
