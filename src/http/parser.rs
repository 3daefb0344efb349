use crate::http::request::{Method, Request};
use std::collections::HashMap;
use thiserror::Error;

/// Upper bound on the header block before a terminator must have been seen.
pub const MAX_HEADER_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("request line must have 3 tokens, found {tokens}")]
    InvalidRequestLine { tokens: usize },

    #[error("header block is not valid UTF-8")]
    InvalidUtf8,

    #[error("request target is not valid percent-encoded UTF-8")]
    InvalidTarget,

    #[error("header block exceeds {limit} bytes")]
    HeadersTooLarge { limit: usize },

    #[error("connection closed before the header block was complete")]
    UnexpectedEof,

    #[error("header block incomplete")]
    Incomplete,
}

/// Parses one request head out of `buf`.
///
/// Returns the request together with the number of bytes consumed (through the
/// blank line ending the header block). Anything after that is left alone; this
/// server never reads request bodies.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    let (headers_end, consumed) = match find_headers_end(buf) {
        Some(found) => found,
        None if buf.len() > MAX_HEADER_BYTES => {
            return Err(ParseError::HeadersTooLarge {
                limit: MAX_HEADER_BYTES,
            });
        }
        None => return Err(ParseError::Incomplete),
    };

    let head = std::str::from_utf8(&buf[..headers_end]).map_err(|_| ParseError::InvalidUtf8)?;

    // `lines` splits on LF and drops a trailing CR, so bare LF is tolerated
    let mut lines = head.lines();

    // Request line
    let request_line = lines.next().unwrap_or_default();
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    let [method, target, version] = parts[..] else {
        return Err(ParseError::InvalidRequestLine {
            tokens: parts.len(),
        });
    };

    // Headers
    let mut headers = HashMap::new();

    for line in lines {
        if line.is_empty() {
            break;
        }

        // Lines without a colon are skipped rather than rejected
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let request = Request {
        method: Method::from(method),
        path: decode_path(target)?,
        target: target.to_string(),
        version: version.to_string(),
        headers,
    };

    Ok((request, consumed))
}

/// Percent-decodes the target, then drops everything from the first `?`.
///
/// Decoding comes first, so an encoded `%3F` also ends the path.
pub fn decode_path(target: &str) -> Result<String, ParseError> {
    let decoded = urlencoding::decode(target).map_err(|_| ParseError::InvalidTarget)?;

    let path = decoded.split_once('?').map_or(&*decoded, |(path, _)| path);
    Ok(path.to_string())
}

/// Locates the blank line ending the header block.
///
/// Returns `(end of the last header line, total bytes through the terminator)`.
/// Accepts `CRLFCRLF` as well as bare `LFLF` and mixed `LFCRLF`.
fn find_headers_end(buf: &[u8]) -> Option<(usize, usize)> {
    buf.iter()
        .enumerate()
        .filter(|(_, byte)| **byte == b'\n')
        .find_map(|(i, _)| match &buf[i + 1..] {
            [b'\n', ..] => Some((i + 1, i + 2)),
            [b'\r', b'\n', ..] => Some((i + 1, i + 3)),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";

        let (parsed, consumed) = parse_http_request(req).unwrap();

        assert_eq!(parsed.path, "/");
        assert_eq!(parsed.headers.get("host").unwrap(), "example.com");
        assert_eq!(consumed, req.len());
    }

    #[test]
    fn headers_end_variants() {
        assert_eq!(find_headers_end(b"GET / HTTP/1.1\r\n\r\n"), Some((16, 18)));
        assert_eq!(find_headers_end(b"GET / HTTP/1.1\n\n"), Some((15, 16)));
        assert_eq!(find_headers_end(b"GET / HTTP/1.1\n\r\n"), Some((15, 17)));
        assert_eq!(find_headers_end(b"GET / HTTP/1.1\r\n"), None);
        assert_eq!(find_headers_end(b""), None);
    }
}
