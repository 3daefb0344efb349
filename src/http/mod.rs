//! HTTP protocol implementation.
//!
//! This module implements a one-request-per-connection HTTP/1.1 server for
//! static files.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`connection`**: The per-connection state machine
//! - **`parser`**: Parses the request head out of a byte buffer
//! - **`request`**: HTTP request representation
//! - **`handler`**: Maps a request to a file or an error page
//! - **`error`**: Failure kinds of a single exchange and their status codes
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Serializes and writes HTTP responses to the client
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌──────────────────┐
//!        │  ReadingHeaders  │ ← Wait for the blank line ending the head
//!        └──────┬───────────┘
//!               │ head parsed          ├─ malformed → Responding (400)
//!               ▼                      └─ timeout / EOF → Closed
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← Method check, path resolution, file read
//!        └──────┬───────────┘
//!               │ response ready (200 / 403 / 404 / 405 / 500)
//!               ▼
//!        ┌──────────────────┐
//!        │    Responding    │ ← Send head, then body, then flush
//!        └──────┬───────────┘
//!               ▼
//!        ┌──────────────────┐
//!        │      Closed      │ ← Always reached; stream shut down
//!        └──────────────────┘
//! ```

pub mod connection;
pub mod error;
pub mod handler;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
