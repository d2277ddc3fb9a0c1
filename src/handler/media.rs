//! Media file serving module
//!
//! Serves stored files from the media root with MIME detection, ETag, and
//! Range support, plus the minimal homepage.

use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime, range::RangeParseResult};
use crate::logger;
use crate::storage::{MediaStore, StorageError};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::Path;

/// Serve one stored file by its caller-supplied name
pub async fn serve_media(
    ctx: &RequestContext<'_>,
    store: &MediaStore,
    name: &str,
) -> Response<Full<Bytes>> {
    let content = match store.read(name).await {
        Ok(c) => c,
        // An unusable name cannot refer to anything in the flat namespace
        Err(StorageError::InvalidName(_)) => return http::build_404_response(),
        Err(StorageError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return http::build_404_response();
        }
        Err(e) => {
            logger::log_error(&format!("Failed to read stored file '{name}': {e}"));
            return http::build_500_response("failed to read stored file");
        }
    };

    let content_type = mime::get_content_type(Path::new(name).extension().and_then(|e| e.to_str()));
    build_media_response(&content, content_type, ctx)
}

/// Build the response for a stored file, honoring conditional and range
/// requests
fn build_media_response(
    data: &[u8],
    content_type: &str,
    ctx: &RequestContext<'_>,
) -> Response<Full<Bytes>> {
    let etag = cache::generate_etag(data);
    let total_size = data.len();

    // Client may already have this version
    if cache::check_etag_match(ctx.if_none_match.as_deref(), &etag) {
        return http::build_304_response(&etag);
    }

    match http::parse_range_header(ctx.range_header.as_deref(), total_size) {
        RangeParseResult::Valid(range) => {
            let start = range.start;
            let end = range.end_position(total_size);

            let body = if ctx.is_head {
                Bytes::new()
            } else {
                Bytes::from(data[start..=end].to_vec())
            };

            http::response::build_partial_response(
                body,
                content_type,
                &etag,
                start,
                end,
                total_size,
                ctx.is_head,
            )
        }
        RangeParseResult::NotSatisfiable => http::build_416_response(total_size),
        RangeParseResult::None => {
            let body = if ctx.is_head {
                Bytes::new()
            } else {
                Bytes::from(data.to_owned())
            };
            http::response::build_cached_response(body, content_type, &etag, ctx.is_head)
        }
    }
}

/// Serve the homepage
pub fn serve_homepage(ctx: &RequestContext<'_>) -> Response<Full<Bytes>> {
    http::response::build_html_response(homepage_html(), ctx.is_head)
}

/// Minimal self-describing homepage
fn homepage_html() -> String {
    String::from(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>sharebox</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Arial, sans-serif;
            max-width: 640px;
            margin: 60px auto;
            padding: 0 20px;
            line-height: 1.6;
            color: #222;
        }
        code {
            background: #f0f0f0;
            padding: 2px 6px;
            border-radius: 4px;
        }
        li { margin: 10px 0; }
    </style>
</head>
<body>
    <h1>sharebox</h1>
    <p>Self-hosted file sharing.</p>
    <ul>
        <li><code>POST /api/upload-file/</code> &mdash; multipart upload, field <code>file</code></li>
        <li><code>POST /api/download-favorites/</code> &mdash; zip of <code>{"favorites": [...]}</code></li>
        <li><code>GET /media/&lt;name&gt;</code> &mdash; fetch a stored file</li>
    </ul>
</body>
</html>"#,
    )
}
