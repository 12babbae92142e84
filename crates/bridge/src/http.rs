//! Minimal HTTP/1.1 framing: one request in, one response out, then close.
//!
//! Only what the bridge's clients send is understood: a request line, headers, and an optional
//! `Content-Length` body. No chunked encoding, no keep-alive, no pipelining.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

pub const MAX_HEADER_BYTES: usize = if cfg!(test) { 2048 } else { 64 * 1024 };
pub const MAX_BODY_BYTES: usize = if cfg!(test) { 4096 } else { 8 * 1024 * 1024 };
pub const READ_DEADLINE: Duration = Duration::from_secs(30);

const READ_CHUNK_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    /// Path with any query string removed.
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Why a connection could not produce a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Request line lacks a method or a path.
    MalformedRequestLine(String),
    HeadersTooLarge,
    BodyTooLarge(usize),
    InvalidHeaderEncoding,
}

impl FrameError {
    pub fn status(&self) -> u16 {
        match self {
            Self::MalformedRequestLine(_) | Self::InvalidHeaderEncoding => 400,
            Self::HeadersTooLarge | Self::BodyTooLarge(_) => 413,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::MalformedRequestLine(line) => format!("Malformed request line: {line:?}"),
            Self::HeadersTooLarge => format!("Request headers exceed {MAX_HEADER_BYTES} bytes"),
            Self::BodyTooLarge(len) => {
                format!("Request body of {len} bytes exceeds {MAX_BODY_BYTES} bytes")
            }
            Self::InvalidHeaderEncoding => "Request headers are not valid UTF-8".to_string(),
        }
    }
}

/// Offset just past the blank line that ends the header block.
pub fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

pub fn parse_content_length(headers: &str) -> Option<usize> {
    const PREFIX: &str = "content-length:";
    for raw_line in headers.lines() {
        let line = raw_line.trim_end_matches('\r').trim();
        if line.len() < PREFIX.len() {
            continue;
        }
        if line.as_bytes()[..PREFIX.len()].eq_ignore_ascii_case(PREFIX.as_bytes()) {
            if let Ok(n) = line[PREFIX.len()..].trim().parse::<usize>() {
                return Some(n);
            }
        }
    }
    None
}

/// Tries to frame one request out of `buf`.
///
/// `Ok(None)` means more bytes are needed: the header terminator has not arrived yet, or the
/// declared body is not fully buffered.
pub fn try_parse_request(buf: &[u8]) -> Result<Option<HttpRequest>, FrameError> {
    let Some(header_end) = find_header_end(buf) else {
        if buf.len() > MAX_HEADER_BYTES {
            return Err(FrameError::HeadersTooLarge);
        }
        return Ok(None);
    };
    if header_end > MAX_HEADER_BYTES {
        return Err(FrameError::HeadersTooLarge);
    }
    let head =
        std::str::from_utf8(&buf[..header_end]).map_err(|_| FrameError::InvalidHeaderEncoding)?;

    let body_len = parse_content_length(head).unwrap_or(0);
    if body_len > MAX_BODY_BYTES {
        return Err(FrameError::BodyTooLarge(body_len));
    }
    if buf.len() < header_end + body_len {
        return Ok(None);
    }

    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Err(FrameError::MalformedRequestLine(request_line.to_string()));
    };
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (target.to_string(), None),
    };

    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect();

    Ok(Some(HttpRequest {
        method: method.to_ascii_uppercase(),
        path,
        query,
        headers,
        body: buf[header_end..header_end + body_len].to_vec(),
    }))
}

/// Reads from `reader` until one full request is buffered.
///
/// `Ok(None)` when the peer hangs up (or the deadline passes) before a complete request: the
/// caller drops the connection without dispatching anything.
pub async fn read_request<R>(reader: &mut R, deadline: Duration) -> Result<Option<HttpRequest>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(READ_CHUNK_BYTES);
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    let read_all = async {
        loop {
            match try_parse_request(&buf) {
                Ok(Some(request)) => return Ok(Some(request)),
                Ok(None) => {}
                Err(err) => return Err(err),
            }
            let n = match reader.read(&mut chunk).await {
                Ok(0) => return Ok(None),
                Ok(n) => n,
                Err(err) => {
                    log::debug!("Connection read failed: {err}");
                    return Ok(None);
                }
            };
            buf.extend_from_slice(&chunk[..n]);
        }
    };
    match tokio::time::timeout(deadline, read_all).await {
        Ok(result) => result,
        Err(_) => {
            log::debug!("Dropping connection idle past {deadline:?}");
            Ok(None)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// `None` for bodiless responses (204).
    pub body: Option<Value>,
}

impl HttpResponse {
    pub fn json(status: u16, body: impl Serialize) -> Self {
        let body = serde_json::to_value(body).unwrap_or_else(|err| {
            serde_json::json!({ "ok": false, "error": format!("Failed to encode response: {err}") })
        });
        Self {
            status,
            body: Some(body),
        }
    }

    pub fn ok(body: impl Serialize) -> Self {
        Self::json(200, body)
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, serde_json::json!({ "error": message.into() }))
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: None,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let payload = self
            .body
            .as_ref()
            .map(|body| body.to_string().into_bytes())
            .unwrap_or_default();
        let mut head = format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Connection: close\r\n",
            self.status,
            reason_phrase(self.status),
            payload.len()
        );
        if self.status == 204 {
            head.push_str(
                "Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
                 Access-Control-Allow-Headers: Content-Type\r\n",
            );
        }
        head.push_str("\r\n");
        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&payload);
        bytes
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
