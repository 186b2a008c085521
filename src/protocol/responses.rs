//! HTTP response handling
//!
//! Builds responses and encodes them onto the wire.

use http::header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use log::error;
use serde::Serialize;

/// Interim response sent to clients waiting on `Expect: 100-continue`
pub const CONTINUE_RESPONSE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

#[derive(Serialize)]
struct MessageBody<'a> {
    message: &'a str,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// A complete, fully buffered HTTP response
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Raw entity content
    pub fn text(status: StatusCode, body: Vec<u8>) -> Self {
        Self::new(status)
            .with_header(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN))
            .with_body(body)
    }

    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status)
                .with_header(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON))
                .with_body(body),
            Err(e) => {
                error!("Failed to serialize response body: {}", e);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// `{"message": ...}` status object
    pub fn message(status: StatusCode, message: &str) -> Self {
        Self::json(status, &MessageBody { message })
    }

    /// `{"error": ...}` status object
    pub fn error(status: StatusCode, error: &str) -> Self {
        Self::json(status, &ErrorBody { error })
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Serialize as an HTTP/1.1 response.
    ///
    /// `Content-Length` and `Connection` are always set here and override
    /// anything the handler put in `headers`.
    pub fn encode(&self, keep_alive: bool) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.body.len() + 256);
        out.extend_from_slice(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason().unwrap_or("")
            )
            .as_bytes(),
        );

        for (name, value) in &self.headers {
            if *name == CONTENT_LENGTH || *name == CONNECTION {
                continue;
            }
            out.extend_from_slice(name.as_str().as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }

        out.extend_from_slice(format!("content-length: {}\r\n", self.body.len()).as_bytes());
        let connection: &[u8] = if keep_alive {
            b"connection: keep-alive\r\n\r\n"
        } else {
            b"connection: close\r\n\r\n"
        };
        out.extend_from_slice(connection);
        out.extend_from_slice(&self.body);
        out
    }
}
