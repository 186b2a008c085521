//! Error types
//!
//! Defines domain-specific error types for each module of the file store.

use http::Method;
use std::fmt;
use std::io;

/// Storage module errors
#[derive(Debug)]
pub enum StorageError {
    MissingName,
    InvalidName(String),
    NotFound(String),
    WriteFailed(String, io::Error),
    IoError(io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::MissingName => write!(f, "Filename not provided"),
            StorageError::InvalidName(n) => write!(f, "Invalid filename: {:?}", n),
            StorageError::NotFound(n) => write!(f, "File not found: {}", n),
            StorageError::WriteFailed(n, e) => write!(f, "Write failed for {}: {}", n, e),
            StorageError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::WriteFailed(_, e) | StorageError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(error: io::Error) -> Self {
        StorageError::IoError(error)
    }
}

/// HTTP protocol module errors
#[derive(Debug)]
pub enum ProtocolError {
    Malformed(String),
    HeadersTooLarge,
    PayloadTooLarge { limit: usize },
    MethodNotAllowed(Method),
    RouteNotFound(String),
    IoError(io::Error),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Malformed(msg) => write!(f, "Malformed request: {}", msg),
            ProtocolError::HeadersTooLarge => write!(f, "Request header block too large"),
            ProtocolError::PayloadTooLarge { limit } => {
                write!(f, "Request body exceeds {} bytes", limit)
            }
            ProtocolError::MethodNotAllowed(m) => write!(f, "Method not allowed: {}", m),
            ProtocolError::RouteNotFound(p) => write!(f, "Route not found: {}", p),
            ProtocolError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ProtocolError {
    fn from(error: io::Error) -> Self {
        // A peer hanging up mid-body is a framing problem, not a server fault
        if error.kind() == io::ErrorKind::UnexpectedEof {
            return ProtocolError::Malformed("unexpected end of stream".into());
        }
        ProtocolError::IoError(error)
    }
}

/// General file server error that encompasses all error types
#[derive(Debug)]
pub enum FileServerError {
    Storage(StorageError),
    Protocol(ProtocolError),
    Config(config::ConfigError),
    IoError(io::Error),
}

impl fmt::Display for FileServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileServerError::Storage(e) => write!(f, "Storage error: {}", e),
            FileServerError::Protocol(e) => write!(f, "Protocol error: {}", e),
            FileServerError::Config(e) => write!(f, "Configuration error: {}", e),
            FileServerError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for FileServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileServerError::Storage(e) => Some(e),
            FileServerError::Protocol(e) => Some(e),
            FileServerError::Config(e) => Some(e),
            FileServerError::IoError(e) => Some(e),
        }
    }
}

impl From<StorageError> for FileServerError {
    fn from(error: StorageError) -> Self {
        FileServerError::Storage(error)
    }
}

impl From<ProtocolError> for FileServerError {
    fn from(error: ProtocolError) -> Self {
        FileServerError::Protocol(error)
    }
}

impl From<config::ConfigError> for FileServerError {
    fn from(error: config::ConfigError) -> Self {
        FileServerError::Config(error)
    }
}

impl From<io::Error> for FileServerError {
    fn from(error: io::Error) -> Self {
        FileServerError::IoError(error)
    }
}
