// Favorites download handler module
// `POST /api/download-favorites/`: bundle the requested stored files into a
// zip archive and return it as an attachment

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;

use super::error::ApiError;
use super::response::{attachment_response, error_response};
use crate::config::AppState;
use crate::logger;
use crate::storage::archive::{self, Archive};

/// Favorites request body
#[derive(Debug, Deserialize)]
struct FavoritesRequest {
    favorites: Vec<String>,
}

pub async fn handle_download(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match download_favorites(req, &state).await {
        Ok(archive) => {
            logger::log_archive(archive.entries.len(), archive.bytes.len());
            logger::log_api_request("POST", "/api/download-favorites", 200);
            Ok(attachment_response(
                archive.bytes,
                &state.config.storage.archive_name,
            ))
        }
        Err(err) => {
            logger::log_api_error(&format!("favorites download failed: {err}"));
            logger::log_api_request("POST", "/api/download-favorites", err.status().as_u16());
            Ok(error_response(&err))
        }
    }
}

/// Parse the request and build the archive.
///
/// An empty list is rejected before storage is touched; a list where nothing
/// matches surfaces as [`ApiError::NoFilesFound`]. A mix of found and
/// missing names succeeds with the found subset.
async fn download_favorites(
    req: Request<Incoming>,
    state: &AppState,
) -> Result<Archive, ApiError> {
    let body = req
        .collect()
        .await
        .map_err(|e| ApiError::BadBody(format!("failed to read request body: {e}")))?
        .to_bytes();

    let request: FavoritesRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadBody(format!("invalid JSON: {e}")))?;

    if request.favorites.is_empty() {
        return Err(ApiError::EmptyFavorites);
    }

    Ok(archive::build_favorites_archive(&state.store, &request.favorites).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn favorites_body_parses() {
        let parsed: FavoritesRequest =
            serde_json::from_str(r#"{"favorites": ["a.mp3", "b.mp3"]}"#).unwrap();
        assert_eq!(parsed.favorites, vec!["a.mp3", "b.mp3"]);
    }

    #[test]
    fn missing_favorites_key_is_an_error() {
        assert!(serde_json::from_str::<FavoritesRequest>(r#"{"files": []}"#).is_err());
    }
}
