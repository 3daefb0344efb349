use std::path::Path;

use crate::http::error::RequestError;
use crate::http::mime;
use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};
use crate::static_files::DocumentRoot;

/// Produces the response for a parsed request.
///
/// Never fails: every error kind with a status becomes an error page.
pub async fn handle_request(req: &Request, root: &DocumentRoot) -> Response {
    match serve_file(req, root).await {
        Ok(response) => response,
        Err(e) => {
            if let RequestError::InternalServerError(source) = &e {
                tracing::warn!(path = %req.path, error = %source, "Failed to read resolved file");
            }
            error_response(&e)
        }
    }
}

/// Serves the file named by `req.path`.
///
/// The method is checked before anything touches the filesystem.
pub async fn serve_file(req: &Request, root: &DocumentRoot) -> Result<Response, RequestError> {
    if !req.method.is_retrieval() {
        return Err(RequestError::MethodNotAllowed(req.method.clone()));
    }

    let path = root.resolve(&req.path).await?;

    read_file(&path).await
}

/// Reads an already resolved file into a 200 response.
///
/// Any failure here is a server-side fault, so it maps to 500.
pub async fn read_file(path: &Path) -> Result<Response, RequestError> {
    let body = tokio::fs::read(path)
        .await
        .map_err(RequestError::InternalServerError)?;

    Ok(Response::ok(mime::from_path(path), body))
}

/// Error page for `err`. A timeout has no page of its own; it falls back to 400.
pub fn error_response(err: &RequestError) -> Response {
    Response::error(err.status().unwrap_or(StatusCode::BadRequest))
}
