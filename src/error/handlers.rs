//! Error handlers
//!
//! Maps the error taxonomy onto HTTP status codes and public messages.
//! This is the only place an error picks up a status code.

use crate::error::types::{FileServerError, ProtocolError, StorageError};
use http::StatusCode;
use log::{error, warn};

/// Log a file server error at a level matching who is at fault
pub fn handle_error(err: &FileServerError) {
    if error_to_status(err).is_server_error() {
        error!("File store error: {}", err);
    } else {
        warn!("Rejected request: {}", err);
    }
}

/// Convert error to HTTP status code
pub fn error_to_status(err: &FileServerError) -> StatusCode {
    match err {
        FileServerError::Storage(e) => match e {
            StorageError::MissingName | StorageError::InvalidName(_) => StatusCode::BAD_REQUEST,
            StorageError::NotFound(_) => StatusCode::NOT_FOUND,
            StorageError::WriteFailed(..) | StorageError::IoError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        },
        FileServerError::Protocol(e) => match e {
            ProtocolError::Malformed(_) => StatusCode::BAD_REQUEST,
            ProtocolError::HeadersTooLarge => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            ProtocolError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProtocolError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ProtocolError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            ProtocolError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        FileServerError::Config(_) | FileServerError::IoError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Message placed in the `error` field of the JSON response body
pub fn public_message(err: &FileServerError) -> &'static str {
    match err {
        FileServerError::Storage(e) => match e {
            StorageError::MissingName => "Filename not provided",
            StorageError::InvalidName(_) => "Invalid filename",
            StorageError::NotFound(_) => "File not found",
            StorageError::WriteFailed(..) => "Write failed",
            StorageError::IoError(_) => "Internal server error",
        },
        FileServerError::Protocol(e) => match e {
            ProtocolError::Malformed(_) => "Bad request",
            ProtocolError::HeadersTooLarge => "Request header fields too large",
            ProtocolError::PayloadTooLarge { .. } => "Payload too large",
            ProtocolError::MethodNotAllowed(_) => "Method not allowed",
            ProtocolError::RouteNotFound(_) => "Route not found",
            ProtocolError::IoError(_) => "Internal server error",
        },
        FileServerError::Config(_) | FileServerError::IoError(_) => "Internal server error",
    }
}

/// Errors that terminate the connection without any response
pub fn aborts_connection(err: &FileServerError) -> bool {
    matches!(
        err,
        FileServerError::Protocol(ProtocolError::PayloadTooLarge { .. })
            | FileServerError::Protocol(ProtocolError::IoError(_))
    )
}
