// API module entry
// File-sharing API: multipart upload and favorites bundling

mod error;
mod favorites;
mod response;
mod upload;

pub use error::ApiError;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::AppState;
use crate::http;
use crate::logger;

/// API route handler
///
/// Dispatches to handler functions based on request path and method.
/// Trailing slashes are accepted on both endpoints.
pub async fn handle_api(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().trim_end_matches('/').to_string();
    let method = req.method().clone();

    match (method, path.as_str()) {
        (Method::POST, "/api/upload-file") => upload::handle_upload(req, state).await,
        (Method::POST, "/api/download-favorites") => favorites::handle_download(req, state).await,
        (method, "/api/upload-file" | "/api/download-favorites") => {
            logger::log_api_request(method.as_str(), &path, 405);
            Ok(http::build_405_response("POST"))
        }
        (method, _) => {
            logger::log_api_request(method.as_str(), &path, 404);
            Ok(response::not_found())
        }
    }
}
