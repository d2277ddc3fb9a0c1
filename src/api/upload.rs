// Upload handler module
// `POST /api/upload-file/`: one multipart file per request, persisted under
// the media root, overwriting any same-named file

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::CONTENT_TYPE;
use hyper::{Request, Response, StatusCode};
use multer::Multipart;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use super::error::ApiError;
use super::response::{error_response, text_response};
use crate::config::AppState;
use crate::logger;
use crate::storage::{MediaStore, StorageError};

/// A completed upload
#[derive(Debug)]
pub struct StoredUpload {
    /// Name the file was stored under
    pub name: String,
    /// Bytes written
    pub size: u64,
}

pub async fn handle_upload(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let boundary = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(multer::parse_boundary);

    let boundary = match boundary {
        Some(Ok(b)) => b,
        _ => {
            logger::log_api_request("POST", "/api/upload-file", 400);
            return Ok(text_response(
                StatusCode::BAD_REQUEST,
                "Expected a multipart/form-data body",
            ));
        }
    };

    let multipart = Multipart::new(req.into_body().into_data_stream(), boundary);

    match save_upload(&state.store, multipart).await {
        Ok(upload) => {
            logger::log_upload(&upload.name, upload.size);
            logger::log_api_request("POST", "/api/upload-file", 200);
            Ok(text_response(
                StatusCode::OK,
                &format!("File '{}' uploaded successfully", upload.name),
            ))
        }
        Err(err) => {
            logger::log_api_error(&format!("upload failed: {err}"));
            logger::log_api_request("POST", "/api/upload-file", err.status().as_u16());
            Ok(error_response(&err))
        }
    }
}

/// Stream the `file` field of a multipart body into the store.
///
/// The payload is written chunk by chunk, never buffered in full. The first
/// field named `file` wins; any remaining fields are ignored. A failed write
/// can leave a truncated file behind; the next upload of that name replaces
/// it.
pub async fn save_upload(
    store: &MediaStore,
    mut multipart: Multipart<'_>,
) -> Result<StoredUpload, ApiError> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let raw_name = field
            .file_name()
            .ok_or_else(|| ApiError::BadBody("multipart field 'file' has no filename".into()))?
            .to_string();

        let (stored, mut file) = store.create(&raw_name).await?;
        let mut size: u64 = 0;
        while let Some(chunk) = field.chunk().await? {
            size += chunk.len() as u64;
            file.write_all(&chunk).await.map_err(StorageError::from)?;
        }
        file.flush().await.map_err(StorageError::from)?;

        return Ok(StoredUpload { name: stored, size });
    }

    Err(ApiError::MissingFilePart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tempfile::TempDir;

    const BOUNDARY: &str = "sharebox-test-boundary";

    fn multipart_body(field: &str, filename: &str, content: &str) -> Multipart<'static> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             \r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Multipart::new(
            stream::iter(vec![Ok::<_, Infallible>(Bytes::from(body))]),
            BOUNDARY,
        )
    }

    #[tokio::test]
    async fn stores_the_file_field() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path());

        let upload = save_upload(&store, multipart_body("file", "song.mp3", "abc"))
            .await
            .unwrap();

        assert_eq!(upload.name, "song.mp3");
        assert_eq!(upload.size, 3);
        assert_eq!(store.read("song.mp3").await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn rejects_bodies_without_a_file_field() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path());

        let err = save_upload(&store, multipart_body("attachment", "song.mp3", "abc"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::MissingFilePart));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn strips_directories_from_the_reported_filename() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path());

        let upload = save_upload(&store, multipart_body("file", "../../evil.sh", "x"))
            .await
            .unwrap();

        assert_eq!(upload.name, "evil.sh");
        assert!(store.exists("evil.sh").await);
        assert!(!dir.path().parent().unwrap().join("evil.sh").exists());
    }

    #[tokio::test]
    async fn overwrites_previous_upload_with_the_same_name() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path());

        save_upload(&store, multipart_body("file", "a.txt", "first"))
            .await
            .unwrap();
        save_upload(&store, multipart_body("file", "a.txt", "second"))
            .await
            .unwrap();

        assert_eq!(store.read("a.txt").await.unwrap(), b"second");
    }
}
