//! Content-type lookup by file extension.

use std::path::Path;

/// Returned for files whose extension is missing or unknown.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Content type used for generated HTML error pages.
pub const HTML_UTF8: &str = "text/html; charset=utf-8";

const MIME_TYPES: &[(&str, &str)] = &[
    ("html", HTML_UTF8),
    ("htm", HTML_UTF8),
    ("css", "text/css; charset=utf-8"),
    ("js", "text/javascript; charset=utf-8"),
    ("mjs", "text/javascript; charset=utf-8"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("txt", "text/plain; charset=utf-8"),
    ("md", "text/markdown; charset=utf-8"),
    ("csv", "text/csv; charset=utf-8"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("webp", "image/webp"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("wasm", "application/wasm"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
];

/// Looks up the content type for an extension (without the leading dot).
///
/// Matching is ASCII case-insensitive.
///
/// # Example
///
/// ```
/// # use staticd::http::mime::from_extension;
/// assert_eq!(from_extension("PNG"), "image/png");
/// assert_eq!(from_extension("unknown"), "application/octet-stream");
/// ```
pub fn from_extension(ext: &str) -> &'static str {
    MIME_TYPES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME_TYPE)
}

/// Looks up the content type for a filesystem path.
pub fn from_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(from_extension)
        .unwrap_or(DEFAULT_MIME_TYPE)
}
