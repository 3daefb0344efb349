use std::io;

use thiserror::Error;

use crate::http::parser::ParseError;
use crate::http::request::Method;
use crate::http::response::StatusCode;
use crate::static_files::ResolveError;

/// Every way a single exchange can fail.
///
/// All kinds but `ConnectionTimeout` are answered with an error page; a timeout
/// means no request was ever established, so the socket is just closed.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("bad request: {0}")]
    BadRequest(#[from] ParseError),

    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    #[error("path escapes the document root")]
    Forbidden,

    #[error("no such file")]
    NotFound,

    #[error("failed to read file: {0}")]
    InternalServerError(#[source] io::Error),

    #[error("timed out waiting for the request head")]
    ConnectionTimeout,
}

impl RequestError {
    /// Status to answer with, or `None` when the connection is closed silently.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RequestError::BadRequest(_) => Some(StatusCode::BadRequest),
            RequestError::MethodNotAllowed(_) => Some(StatusCode::MethodNotAllowed),
            RequestError::Forbidden => Some(StatusCode::Forbidden),
            RequestError::NotFound => Some(StatusCode::NotFound),
            RequestError::InternalServerError(_) => Some(StatusCode::InternalServerError),
            RequestError::ConnectionTimeout => None,
        }
    }
}

impl From<ResolveError> for RequestError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Forbidden => RequestError::Forbidden,
            ResolveError::NotFound => RequestError::NotFound,
            ResolveError::Io(e) => RequestError::InternalServerError(e),
        }
    }
}
