//! Minimal blocking HTTP/1.1 server plumbing over any Read + Write stream.
//!
//! httparse does the header parsing; this module only frames requests and
//! responses. Intentionally limited surface:
//! - One request per connection (no keep-alive)
//! - No chunked transfer encoding (rejected)
//! - POST requires Content-Length
//! - Header cap: 32 KiB, body cap: 1 MiB (actual bytes counted, the declared
//!   Content-Length is not trusted)

use std::fmt;
use std::io::{Read, Write};

/// Maximum header section size (32 KiB)
const MAX_HEADER_SIZE: usize = 32 * 1024;

/// Maximum request body size (1 MiB)
pub const MAX_BODY_SIZE: usize = 1_048_576;

/// Parsed HTTP request (transport-free)
#[derive(Debug)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// HTTP response to write back
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Why a request could not be framed. Everything here maps to a 400 except
/// `BodyTooLarge` (413).
#[derive(Debug)]
pub enum RequestError {
    ClosedMidRequest,
    HeadersTooLarge,
    BodyTooLarge,
    MissingContentLength,
    ChunkedNotSupported,
    Malformed(String),
    Io(std::io::Error),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::ClosedMidRequest => write!(f, "connection closed mid-request"),
            RequestError::HeadersTooLarge => write!(f, "request headers too large"),
            RequestError::BodyTooLarge => write!(f, "request body too large"),
            RequestError::MissingContentLength => write!(f, "POST requires Content-Length"),
            RequestError::ChunkedNotSupported => {
                write!(f, "chunked transfer encoding not supported")
            }
            RequestError::Malformed(msg) => write!(f, "malformed request: {msg}"),
            RequestError::Io(e) => write!(f, "read error: {e}"),
        }
    }
}

impl RequestError {
    pub fn status(&self) -> u16 {
        match self {
            RequestError::BodyTooLarge => 413,
            _ => 400,
        }
    }
}

/// Reason phrase for the status codes this daemon emits
fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Byte offset just past the `\r\n\r\n` header terminator, if present.
fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

/// Read and parse one HTTP request from a stream.
///
/// Returns None if the connection closed cleanly before any bytes arrived.
pub fn read_request(stream: &mut impl Read) -> Option<Result<HttpRequest, RequestError>> {
    let mut buf: Vec<u8> = Vec::with_capacity(4096);
    let mut chunk = [0u8; 1024];

    // Accumulate until the blank line that ends the header section
    let split_at = loop {
        if let Some(end) = header_end(&buf) {
            break end;
        }
        if buf.len() > MAX_HEADER_SIZE {
            return Some(Err(RequestError::HeadersTooLarge));
        }
        match stream.read(&mut chunk) {
            Ok(0) => {
                if buf.is_empty() {
                    return None; // clean close
                }
                return Some(Err(RequestError::ClosedMidRequest));
            }
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) => {
                if buf.is_empty() {
                    return None; // read error on a fresh connection = closed
                }
                return Some(Err(RequestError::Io(e)));
            }
        }
    };

    let mut parsed_headers = [httparse::EMPTY_HEADER; 64];
    let mut req = httparse::Request::new(&mut parsed_headers);

    match req.parse(&buf[..split_at]) {
        Ok(httparse::Status::Complete(_)) => {}
        Ok(httparse::Status::Partial) => {
            return Some(Err(RequestError::Malformed("incomplete header".to_string())));
        }
        Err(e) => return Some(Err(RequestError::Malformed(e.to_string()))),
    }

    let method = req.method.unwrap_or("").to_string();
    let path = req.path.unwrap_or("/").to_string();

    let mut headers = Vec::new();
    let mut content_length: Option<usize> = None;

    for h in req.headers.iter() {
        let name = h.name.to_string();
        let value = String::from_utf8_lossy(h.value).to_string();

        if name.eq_ignore_ascii_case("Content-Length") {
            content_length = value.trim().parse().ok();
        }
        if name.eq_ignore_ascii_case("Transfer-Encoding")
            && value.to_lowercase().contains("chunked")
        {
            return Some(Err(RequestError::ChunkedNotSupported));
        }

        headers.push((name, value));
    }

    // Bytes already read past the headers belong to the body
    let mut body = buf.split_off(split_at);

    if matches!(method.as_str(), "POST" | "PUT" | "PATCH") {
        let len = match content_length {
            Some(len) => len,
            None => return Some(Err(RequestError::MissingContentLength)),
        };
        if len > MAX_BODY_SIZE {
            return Some(Err(RequestError::BodyTooLarge));
        }

        body.truncate(len);
        while body.len() < len {
            match stream.read(&mut chunk) {
                Ok(0) => return Some(Err(RequestError::ClosedMidRequest)),
                Ok(n) => {
                    body.extend_from_slice(&chunk[..n]);
                    body.truncate(len);
                }
                Err(e) => return Some(Err(RequestError::Io(e))),
            }
        }
    } else {
        body.clear();
    }

    Some(Ok(HttpRequest {
        method,
        path,
        headers,
        body,
    }))
}

/// Write an HTTP response to a stream. Write errors are swallowed - the
/// client may already have disconnected.
pub fn write_response(stream: &mut impl Write, response: &HttpResponse) {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        response.status,
        reason(response.status),
        response.body.len()
    );
    for (name, value) in &response.headers {
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");

    let _ = stream.write_all(head.as_bytes());
    if !response.body.is_empty() {
        let _ = stream.write_all(&response.body);
    }
    let _ = stream.flush();
}
