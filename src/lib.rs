//! staticd - minimal HTTP/1.1 static file server
//!
//! Core library: request parsing, document-root confinement, response
//! framing and the connection dispatcher.

pub mod config;
pub mod http;
pub mod server;
pub mod static_files;
