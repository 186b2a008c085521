//! HTTP request head parsing
//!
//! Reads the request line and header block from a buffered stream,
//! enforcing the configured size limits while doing so.

use http::header::{CONNECTION, EXPECT};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Version};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::ProtocolError;

/// Framing limits applied to every request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLimits {
    pub max_header_bytes: usize,
    pub max_headers: usize,
    pub max_body_bytes: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_header_bytes: 8192,
            max_headers: 64,
            max_body_bytes: 1_000_000,
        }
    }
}

/// Request line and headers of a single HTTP request
#[derive(Debug)]
pub struct RequestHead {
    pub method: Method,
    pub target: String,
    pub version: Version,
    pub headers: HeaderMap,
}

impl RequestHead {
    fn connection_has(&self, token: &str) -> bool {
        self.headers.get_all(CONNECTION).iter().any(|value| {
            value
                .to_str()
                .map(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case(token)))
                .unwrap_or(false)
        })
    }

    /// Whether the client wants the connection kept open afterwards
    pub fn keep_alive(&self) -> bool {
        if self.version == Version::HTTP_10 {
            self.connection_has("keep-alive")
        } else {
            !self.connection_has("close")
        }
    }

    /// Whether the client waits for `100 Continue` before sending the body
    pub fn expects_continue(&self) -> bool {
        self.version != Version::HTTP_10
            && self
                .headers
                .get(EXPECT)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().eq_ignore_ascii_case("100-continue"))
                .unwrap_or(false)
    }
}

/// Reads one line (including its `\n`) while charging it against `budget`.
///
/// Returns an empty buffer at end of stream.
async fn read_limited_line<R>(
    reader: &mut R,
    line: &mut Vec<u8>,
    budget: &mut usize,
) -> Result<(), ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();
    if *budget == 0 {
        return Err(ProtocolError::HeadersTooLarge);
    }

    let mut limited = (&mut *reader).take(*budget as u64);
    let n = limited.read_until(b'\n', line).await?;

    if n > 0 && !line.ends_with(b"\n") {
        if n >= *budget {
            return Err(ProtocolError::HeadersTooLarge);
        }
        return Err(ProtocolError::Malformed("connection closed mid-line".into()));
    }

    *budget -= n;
    Ok(())
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn parse_request_line(line: &[u8]) -> Result<(Method, String, Version), ProtocolError> {
    let line = std::str::from_utf8(line)
        .map_err(|_| ProtocolError::Malformed("request line is not valid UTF-8".into()))?;

    let parts: Vec<&str> = line.split(' ').collect();
    let [method, target, version] = parts.as_slice() else {
        return Err(ProtocolError::Malformed(format!(
            "bad request line: {:?}",
            line
        )));
    };

    if target.is_empty() {
        return Err(ProtocolError::Malformed("empty request target".into()));
    }

    let method = Method::from_bytes(method.as_bytes())
        .map_err(|_| ProtocolError::Malformed(format!("bad method: {:?}", method)))?;

    let version = match *version {
        "HTTP/1.1" => Version::HTTP_11,
        "HTTP/1.0" => Version::HTTP_10,
        other => {
            return Err(ProtocolError::Malformed(format!(
                "unsupported version: {:?}",
                other
            )));
        }
    };

    Ok((method, target.to_string(), version))
}

fn parse_header_line(line: &[u8]) -> Result<(HeaderName, HeaderValue), ProtocolError> {
    if line.first().is_some_and(|b| *b == b' ' || *b == b'\t') {
        return Err(ProtocolError::Malformed("folded header line".into()));
    }

    let colon = line
        .iter()
        .position(|b| *b == b':')
        .ok_or_else(|| ProtocolError::Malformed("header line without colon".into()))?;

    let name = HeaderName::from_bytes(&line[..colon])
        .map_err(|_| ProtocolError::Malformed("invalid header name".into()))?;
    let value = line[colon + 1..].trim_ascii();
    let value = HeaderValue::from_bytes(value)
        .map_err(|_| ProtocolError::Malformed(format!("invalid value for header {}", name)))?;

    Ok((name, value))
}

/// Reads the next request head from `reader`.
///
/// Returns `Ok(None)` when the stream ends cleanly before a new request
/// starts, which is how an idle keep-alive connection finishes.
pub async fn read_request_head<R>(
    reader: &mut R,
    limits: &RequestLimits,
) -> Result<Option<RequestHead>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut budget = limits.max_header_bytes;
    let mut line = Vec::new();

    // Blank lines ahead of the request line are tolerated
    loop {
        read_limited_line(reader, &mut line, &mut budget).await?;
        if line.is_empty() {
            return Ok(None);
        }
        if !trim_line_ending(&line).is_empty() {
            break;
        }
    }

    let (method, target, version) = parse_request_line(trim_line_ending(&line))?;

    let mut headers = HeaderMap::new();
    loop {
        read_limited_line(reader, &mut line, &mut budget).await?;
        if line.is_empty() {
            return Err(ProtocolError::Malformed(
                "connection closed inside header block".into(),
            ));
        }

        let content = trim_line_ending(&line);
        if content.is_empty() {
            break;
        }

        if headers.len() >= limits.max_headers {
            return Err(ProtocolError::HeadersTooLarge);
        }

        let (name, value) = parse_header_line(content)?;
        headers.append(name, value);
    }

    Ok(Some(RequestHead {
        method,
        target,
        version,
        headers,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_LENGTH;

    async fn parse(raw: &[u8]) -> Result<Option<RequestHead>, ProtocolError> {
        let mut reader = raw;
        read_request_head(&mut reader, &RequestLimits::default()).await
    }

    #[tokio::test]
    async fn parses_simple_get() {
        let head = parse(b"GET /file?filename=a.txt HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(head.method, Method::GET);
        assert_eq!(head.target, "/file?filename=a.txt");
        assert_eq!(head.version, Version::HTTP_11);
        assert_eq!(head.headers.get("host").unwrap(), "localhost");
        assert!(head.keep_alive());
    }

    #[tokio::test]
    async fn accepts_bare_newlines_and_leading_blank_lines() {
        let head = parse(b"\r\n\nPOST /file HTTP/1.0\nContent-Length:  5 \n\n")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(head.method, Method::POST);
        assert_eq!(head.headers.get(CONTENT_LENGTH).unwrap(), "5");
        assert!(!head.keep_alive());
    }

    #[tokio::test]
    async fn eof_before_request_is_none() {
        assert!(parse(b"").await.unwrap().is_none());
        assert!(parse(b"\r\n").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn eof_inside_headers_is_malformed() {
        let result = parse(b"GET /file HTTP/1.1\r\nHost: x\r\n").await;
        assert!(matches!(result, Err(ProtocolError::Malformed(_))));
    }

    #[tokio::test]
    async fn rejects_bad_request_lines() {
        let cases: [&[u8]; 6] = [
            b"GET /file\r\n\r\n",
            b"GET  /file HTTP/1.1\r\n\r\n",
            b"GET /file HTTP/2.0\r\n\r\n",
            b"G(T /file HTTP/1.1\r\n\r\n",
            b"GET /file HTTP/1.1\r\nno-colon\r\n\r\n",
            b"GET /file HTTP/1.1\r\nA: b\r\n  folded\r\n\r\n",
        ];
        for raw in cases {
            assert!(
                matches!(parse(raw).await, Err(ProtocolError::Malformed(_))),
                "{:?} should be malformed",
                String::from_utf8_lossy(raw)
            );
        }
    }

    #[tokio::test]
    async fn oversized_header_block_is_rejected() {
        let mut raw = b"GET /file HTTP/1.1\r\nX-Big: ".to_vec();
        raw.extend(std::iter::repeat_n(b'a', 10_000));
        raw.extend_from_slice(b"\r\n\r\n");
        assert!(matches!(
            parse(&raw).await,
            Err(ProtocolError::HeadersTooLarge)
        ));
    }

    #[tokio::test]
    async fn too_many_headers_is_rejected() {
        let mut raw = b"GET /file HTTP/1.1\r\n".to_vec();
        for i in 0..65 {
            raw.extend_from_slice(format!("X-H{i}: v\r\n").as_bytes());
        }
        raw.extend_from_slice(b"\r\n");
        assert!(matches!(
            parse(&raw).await,
            Err(ProtocolError::HeadersTooLarge)
        ));
    }

    #[tokio::test]
    async fn connection_tokens() {
        let head = parse(b"GET / HTTP/1.1\r\nConnection: Upgrade, Close\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert!(!head.keep_alive());

        let head = parse(b"GET / HTTP/1.0\r\nConnection: keep-alive\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert!(head.keep_alive());
    }

    #[tokio::test]
    async fn expect_continue_only_on_http11() {
        let head = parse(b"POST /file HTTP/1.1\r\nExpect: 100-continue\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert!(head.expects_continue());

        let head = parse(b"POST /file HTTP/1.0\r\nExpect: 100-continue\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert!(!head.expects_continue());
    }

    #[tokio::test]
    async fn leaves_body_bytes_unread() {
        let raw = b"POST /file HTTP/1.1\r\nContent-Length: 4\r\n\r\nbody";
        let mut reader = &raw[..];
        read_request_head(&mut reader, &RequestLimits::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reader, b"body");
    }
}
