//! Request handlers for the file store.
//!
//! Each request moves through routing, name resolution and execution.
//! Any failure short-circuits straight to a response (or, for oversized
//! uploads, to a connection abort) via the error module's mapping.

use http::header::ALLOW;
use http::{HeaderValue, Method, StatusCode};
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::error::handlers::{aborts_connection, error_to_status, handle_error, public_message};
use crate::error::{FileServerError, ProtocolError};
use crate::protocol::body::Body;
use crate::protocol::parser::{RequestHead, RequestLimits};
use crate::protocol::responses::Response;
use crate::protocol::router::{Route, route};
use crate::storage::FileStore;

/// Value of the `Allow` header on the entity route
pub const ALLOWED_METHODS: &str = "GET, POST, DELETE";

/// What the connection should do once a request has been handled
#[derive(Debug)]
pub enum Outcome {
    Respond(Response),
    /// Drop the connection without answering
    Abort(FileServerError),
}

/// Operation selected by the request method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Retrieve,
    Store,
    Delete,
}

impl Operation {
    fn from_method(method: &Method) -> Result<Self, ProtocolError> {
        match *method {
            Method::GET => Ok(Operation::Retrieve),
            Method::POST => Ok(Operation::Store),
            Method::DELETE => Ok(Operation::Delete),
            _ => Err(ProtocolError::MethodNotAllowed(method.clone())),
        }
    }
}

/// Builds the response for a request-level failure
pub fn error_response(err: &FileServerError) -> Response {
    let response = Response::error(error_to_status(err), public_message(err));
    match err {
        FileServerError::Protocol(ProtocolError::MethodNotAllowed(_)) => {
            response.with_header(ALLOW, HeaderValue::from_static(ALLOWED_METHODS))
        }
        _ => response,
    }
}

/// Handles one request whose head has already been parsed.
///
/// `stream` is the connection the head was read from; the body, if the
/// operation needs it, is read from the same stream.
pub async fn handle_request<S>(
    store: &FileStore,
    head: &RequestHead,
    body: &mut Body,
    stream: &mut S,
    limits: &RequestLimits,
) -> Outcome
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    match dispatch(store, head, body, stream, limits).await {
        Ok(response) => Outcome::Respond(response),
        Err(err) => {
            handle_error(&err);
            if aborts_connection(&err) {
                Outcome::Abort(err)
            } else {
                Outcome::Respond(error_response(&err))
            }
        }
    }
}

async fn dispatch<S>(
    store: &FileStore,
    head: &RequestHead,
    body: &mut Body,
    stream: &mut S,
    limits: &RequestLimits,
) -> Result<Response, FileServerError>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    let Route::Entity { filename } = route(&head.target)?;
    let entity = store.resolve(filename.as_deref())?;
    let operation = Operation::from_method(&head.method)?;

    match operation {
        Operation::Retrieve => {
            let retrieved = store.retrieve(&entity).await?;
            Ok(Response::text(StatusCode::OK, retrieved.contents))
        }
        Operation::Store => {
            // The body is fully received before anything touches the disk
            let contents = body.read_to_end(stream, limits.max_body_bytes).await?;
            store.store(&entity, &contents).await?;
            Ok(Response::message(StatusCode::CREATED, "File created/overwritten"))
        }
        Operation::Delete => {
            store.delete(&entity).await?;
            Ok(Response::message(StatusCode::OK, "File deleted"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parser::read_request_head;
    use tempfile::TempDir;
    use tokio::io::{AsyncWriteExt, BufReader, DuplexStream, duplex};

    struct Harness {
        _dir: TempDir,
        store: FileStore,
        limits: RequestLimits,
    }

    impl Harness {
        async fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let store = FileStore::open(dir.path()).await.unwrap();
            Self {
                _dir: dir,
                store,
                limits: RequestLimits {
                    max_body_bytes: 16,
                    ..RequestLimits::default()
                },
            }
        }

        async fn serve(&self, raw: &[u8]) -> (Outcome, Body, DuplexStream) {
            let (mut client, server) = duplex(64 * 1024);
            client.write_all(raw).await.unwrap();

            let mut stream = BufReader::new(server);
            let head = read_request_head(&mut stream, &self.limits)
                .await
                .unwrap()
                .unwrap();
            let mut body = Body::new(&head).unwrap();
            let outcome =
                handle_request(&self.store, &head, &mut body, &mut stream, &self.limits).await;
            (outcome, body, client)
        }

        async fn respond(&self, raw: &[u8]) -> Response {
            match self.serve(raw).await.0 {
                Outcome::Respond(response) => response,
                Outcome::Abort(err) => panic!("unexpected abort: {err}"),
            }
        }
    }

    #[tokio::test]
    async fn post_get_delete_cycle() {
        let h = Harness::new().await;

        let created = h
            .respond(b"POST /file?filename=notes.txt HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello")
            .await;
        assert_eq!(created.status, StatusCode::CREATED);
        assert_eq!(created.body, br#"{"message":"File created/overwritten"}"#);

        let read = h.respond(b"GET /file?filename=notes.txt HTTP/1.1\r\n\r\n").await;
        assert_eq!(read.status, StatusCode::OK);
        assert_eq!(read.body, b"hello");

        let deleted = h.respond(b"DELETE /file?filename=notes.txt HTTP/1.1\r\n\r\n").await;
        assert_eq!(deleted.status, StatusCode::OK);
        assert_eq!(deleted.body, br#"{"message":"File deleted"}"#);

        let gone = h.respond(b"GET /file?filename=notes.txt HTTP/1.1\r\n\r\n").await;
        assert_eq!(gone.status, StatusCode::NOT_FOUND);
        assert_eq!(gone.body, br#"{"error":"File not found"}"#);
    }

    #[tokio::test]
    async fn traversal_is_bad_request() {
        let h = Harness::new().await;
        let response = h
            .respond(b"GET /file?filename=../../etc/passwd HTTP/1.1\r\n\r\n")
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body, br#"{"error":"Invalid filename"}"#);
    }

    #[tokio::test]
    async fn missing_filename_is_bad_request() {
        let h = Harness::new().await;
        let response = h.respond(b"GET /file HTTP/1.1\r\n\r\n").await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body, br#"{"error":"Filename not provided"}"#);
    }

    #[tokio::test]
    async fn unsupported_method_lists_allowed_set() {
        let h = Harness::new().await;
        let response = h.respond(b"PUT /file?filename=a HTTP/1.1\r\n\r\n").await;
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers.get(ALLOW).unwrap(), ALLOWED_METHODS);
        assert_eq!(response.body, br#"{"error":"Method not allowed"}"#);
    }

    #[tokio::test]
    async fn name_is_checked_before_method() {
        let h = Harness::new().await;

        let missing = h.respond(b"PUT /file HTTP/1.1\r\n\r\n").await;
        assert_eq!(missing.status, StatusCode::BAD_REQUEST);
        assert_eq!(missing.body, br#"{"error":"Filename not provided"}"#);
        assert!(missing.headers.get(ALLOW).is_none());

        let escaping = h
            .respond(b"PATCH /file?filename=../../etc/passwd HTTP/1.1\r\n\r\n")
            .await;
        assert_eq!(escaping.status, StatusCode::BAD_REQUEST);
        assert_eq!(escaping.body, br#"{"error":"Invalid filename"}"#);
    }

    #[tokio::test]
    async fn unknown_route() {
        let h = Harness::new().await;
        let response = h.respond(b"GET /elsewhere HTTP/1.1\r\n\r\n").await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.body, br#"{"error":"Route not found"}"#);
    }

    #[tokio::test]
    async fn oversized_upload_aborts_without_writing() {
        let h = Harness::new().await;
        let (outcome, _, _client) = h
            .serve(b"POST /file?filename=big.txt HTTP/1.1\r\nContent-Length: 17\r\n\r\n")
            .await;
        assert!(matches!(
            outcome,
            Outcome::Abort(FileServerError::Protocol(ProtocolError::PayloadTooLarge { .. }))
        ));
        assert!(!h.store.root().join("big.txt").exists());
    }

    #[tokio::test]
    async fn rejected_post_leaves_body_unread() {
        let h = Harness::new().await;
        let (outcome, body, _client) = h
            .serve(b"POST /file?filename=../x HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc")
            .await;
        assert!(matches!(outcome, Outcome::Respond(ref r) if r.status == StatusCode::BAD_REQUEST));
        assert!(!body.is_drained());
    }

    #[tokio::test]
    async fn expect_continue_is_acknowledged() {
        let h = Harness::new().await;
        let (outcome, body, mut client) = h
            .serve(
                b"POST /file?filename=c.txt HTTP/1.1\r\nExpect: 100-continue\r\nContent-Length: 2\r\n\r\nok",
            )
            .await;
        assert!(matches!(outcome, Outcome::Respond(ref r) if r.status == StatusCode::CREATED));
        assert!(body.is_drained());

        let mut interim = vec![0; crate::protocol::responses::CONTINUE_RESPONSE.len()];
        tokio::io::AsyncReadExt::read_exact(&mut client, &mut interim)
            .await
            .unwrap();
        assert_eq!(interim, crate::protocol::responses::CONTINUE_RESPONSE);
    }
}
