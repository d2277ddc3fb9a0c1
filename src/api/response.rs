// API response utility functions module

use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

use super::error::ApiError;

/// Build plain-text response
pub fn text_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(message.to_string())))
        .unwrap_or_else(|e| {
            logger::log_error(&format!("Failed to build response: {e}"));
            Response::new(Full::new(Bytes::from("Error")))
        })
}

/// Map an API error to its plain-text response
pub fn error_response(err: &ApiError) -> Response<Full<Bytes>> {
    text_response(err.status(), &err.to_string())
}

/// Build zip download response with attachment disposition
pub fn attachment_response(bytes: Vec<u8>, filename: &str) -> Response<Full<Bytes>> {
    let content_length = bytes.len();
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/zip")
        .header("Content-Length", content_length)
        .header(
            "Content-Disposition",
            format!("attachment; filename={filename}"),
        )
        .body(Full::new(Bytes::from(bytes)))
        .unwrap_or_else(|e| {
            logger::log_error(&format!("Failed to build attachment response: {e}"));
            Response::new(Full::new(Bytes::from("Error")))
        })
}

/// 404 for unknown API routes
pub fn not_found() -> Response<Full<Bytes>> {
    text_response(
        StatusCode::NOT_FOUND,
        "Not Found. Available endpoints: /api/upload-file/, /api/download-favorites/",
    )
}
