//! Request body reception
//!
//! Decodes `Content-Length` and chunked bodies under a hard size cap.
//! The cap is checked before each chunk is buffered, so an oversized
//! upload is cut off without ever holding more than the cap in memory.

use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http::HeaderMap;
use log::debug;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;
use crate::protocol::parser::RequestHead;
use crate::protocol::responses::CONTINUE_RESPONSE;

const MAX_CHUNK_LINE: u64 = 1024;

/// How the body of a request is framed on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Empty,
    Length(u64),
    Chunked,
}

impl BodyKind {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ProtocolError> {
        if let Some(encoding) = headers.get(TRANSFER_ENCODING) {
            let encoding = encoding
                .to_str()
                .map_err(|_| ProtocolError::Malformed("invalid transfer-encoding".into()))?;
            let last = encoding.rsplit(',').next().unwrap_or("").trim();
            if last.eq_ignore_ascii_case("chunked") {
                return Ok(BodyKind::Chunked);
            }
            return Err(ProtocolError::Malformed(format!(
                "unsupported transfer-encoding: {}",
                encoding
            )));
        }

        let mut declared: Option<u64> = None;
        for value in headers.get_all(CONTENT_LENGTH) {
            let length = value
                .to_str()
                .ok()
                .map(str::trim)
                .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|v| v.parse::<u64>().ok())
                .ok_or_else(|| ProtocolError::Malformed("invalid content-length".into()))?;

            if declared.is_some_and(|d| d != length) {
                return Err(ProtocolError::Malformed(
                    "conflicting content-length values".into(),
                ));
            }
            declared = Some(length);
        }

        Ok(match declared {
            None | Some(0) => BodyKind::Empty,
            Some(length) => BodyKind::Length(length),
        })
    }
}

/// Body of the request currently being served on a connection
#[derive(Debug)]
pub struct Body {
    kind: BodyKind,
    expect_continue: bool,
    consumed: bool,
}

impl Body {
    pub fn new(head: &RequestHead) -> Result<Self, ProtocolError> {
        Ok(Self {
            kind: BodyKind::from_headers(&head.headers)?,
            expect_continue: head.expects_continue(),
            consumed: false,
        })
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    /// True once no body bytes remain on the wire for this request
    pub fn is_drained(&self) -> bool {
        self.consumed || self.kind == BodyKind::Empty
    }

    /// Receives the whole body, answering `Expect: 100-continue` first.
    pub async fn read_to_end<S>(&mut self, stream: &mut S, limit: usize) -> Result<Vec<u8>, ProtocolError>
    where
        S: AsyncBufRead + AsyncWrite + Unpin,
    {
        if self.is_drained() {
            return Ok(Vec::new());
        }

        if let BodyKind::Length(length) = self.kind {
            if length > limit as u64 {
                return Err(ProtocolError::PayloadTooLarge { limit });
            }
        }

        if self.expect_continue {
            stream.write_all(CONTINUE_RESPONSE).await?;
            stream.flush().await?;
            self.expect_continue = false;
        }

        let body = read_body(stream, self.kind, limit).await?;
        self.consumed = true;
        Ok(body)
    }
}

/// Reads a body of the given framing, failing once it would pass `limit`
pub async fn read_body<R>(reader: &mut R, kind: BodyKind, limit: usize) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    match kind {
        BodyKind::Empty => Ok(Vec::new()),
        BodyKind::Length(length) => {
            if length > limit as u64 {
                return Err(ProtocolError::PayloadTooLarge { limit });
            }
            let mut body = vec![0; length as usize];
            reader.read_exact(&mut body).await?;
            Ok(body)
        }
        BodyKind::Chunked => read_chunked(reader, limit).await,
    }
}

async fn read_chunk_line<R>(reader: &mut R) -> Result<String, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let mut limited = (&mut *reader).take(MAX_CHUNK_LINE);
    limited.read_until(b'\n', &mut line).await?;

    if !line.ends_with(b"\n") {
        return Err(ProtocolError::Malformed("truncated chunk framing".into()));
    }

    let line = String::from_utf8(line)
        .map_err(|_| ProtocolError::Malformed("chunk framing is not valid UTF-8".into()))?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn read_chunked<R>(reader: &mut R, limit: usize) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut body = Vec::new();

    loop {
        let size_line = read_chunk_line(reader).await?;
        let size_field = size_line.split(';').next().unwrap_or("").trim();
        if size_field.is_empty() || !size_field.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ProtocolError::Malformed(format!(
                "invalid chunk size: {:?}",
                size_field
            )));
        }
        let size = usize::from_str_radix(size_field, 16)
            .map_err(|_| ProtocolError::PayloadTooLarge { limit })?;

        if size == 0 {
            // Trailer fields are read and discarded
            loop {
                if read_chunk_line(reader).await?.is_empty() {
                    break;
                }
            }
            debug!("Received chunked body of {} bytes", body.len());
            return Ok(body);
        }

        if body.len().saturating_add(size) > limit {
            return Err(ProtocolError::PayloadTooLarge { limit });
        }

        let start = body.len();
        body.resize(start + size, 0);
        reader.read_exact(&mut body[start..]).await?;

        if !read_chunk_line(reader).await?.is_empty() {
            return Err(ProtocolError::Malformed("chunk not terminated by CRLF".into()));
        }
    }
}
