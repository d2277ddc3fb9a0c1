//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: access logging, method gating,
//! body size cap, and dispatch to the API, media serving, health probes, or
//! the homepage.

use crate::api;
use crate::config::AppState;
use crate::handler::media;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body as _, Bytes, Incoming};
use hyper::header::HeaderValue;
use hyper::{Method, Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Request context for the read-only (GET/HEAD) handlers
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<String>,
    pub range_header: Option<String>,
}

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<Incoming>,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();

    // Captured up front: the request moves into the API handlers
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.referer = header_value(&req, "referer");
    entry.user_agent = header_value(&req, "user-agent");

    let mut response = dispatch(req, &state).await?;

    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert("Server", server);
    }

    if state.access_log() {
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

async fn dispatch(
    req: Request<Incoming>,
    state: &Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if *req.method() == Method::OPTIONS {
        return Ok(http::build_options_response(state.config.http.enable_cors));
    }

    if let Some(resp) = check_body_size(&req, state.config.http.max_body_size) {
        return Ok(resp);
    }

    logger::log_headers_count(req.headers().len(), state.config.logging.show_headers);

    if req.uri().path().starts_with("/api/") {
        return api::handle_api(req, Arc::clone(state)).await;
    }

    // Everything outside /api is read-only
    if !matches!(*req.method(), Method::GET | Method::HEAD) {
        logger::log_warning(&format!("Method not allowed: {}", req.method()));
        return Ok(http::build_405_response("GET, HEAD, OPTIONS"));
    }

    let ctx = RequestContext {
        path: req.uri().path(),
        is_head: *req.method() == Method::HEAD,
        if_none_match: header_value(&req, "if-none-match"),
        range_header: header_value(&req, "range"),
    };

    Ok(route_request(&ctx, state).await)
}

/// Route a read-only request based on path
async fn route_request(ctx: &RequestContext<'_>, state: &Arc<AppState>) -> Response<Full<Bytes>> {
    // Health check endpoints first, always fast
    let health = &state.config.health;
    if health.enabled && (ctx.path == health.liveness_path || ctx.path == health.readiness_path) {
        return http::build_health_response("ok");
    }

    // Stored files, directly fetchable by name
    if let Some(name) = media_name(ctx.path, &state.config.storage.media_url) {
        return media::serve_media(ctx, &state.store, name).await;
    }

    if ctx.path == "/" {
        return media::serve_homepage(ctx);
    }

    http::build_404_response()
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(req: &Request<Incoming>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get("content-length")?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

/// Extract the stored-file name from a path under the media URL prefix
fn media_name<'a>(path: &'a str, media_url: &str) -> Option<&'a str> {
    let prefix = media_url.trim_end_matches('/');
    let name = path.strip_prefix(prefix)?.strip_prefix('/')?;
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn header_value(req: &Request<Incoming>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn version_label(version: Version) -> &'static str {
    if version == Version::HTTP_10 {
        "1.0"
    } else if version == Version::HTTP_2 {
        "2"
    } else {
        "1.1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_name_strips_the_prefix() {
        assert_eq!(media_name("/media/song.mp3", "/media"), Some("song.mp3"));
        assert_eq!(media_name("/media/song.mp3", "/media/"), Some("song.mp3"));
    }

    #[test]
    fn media_name_rejects_bare_prefix_and_foreign_paths() {
        assert_eq!(media_name("/media", "/media"), None);
        assert_eq!(media_name("/media/", "/media"), None);
        assert_eq!(media_name("/mediafiles/a.txt", "/media"), None);
        assert_eq!(media_name("/other/a.txt", "/media"), None);
    }
}
