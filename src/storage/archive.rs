// Favorites archive assembly
// The zip is built entirely in memory: each request owns its own buffer and
// nothing is ever written to disk, so concurrent requests cannot collide.

use std::io::{Cursor, Write};

use thiserror::Error;
use tokio::fs;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{MediaStore, StorageError};

/// A finished favorites archive
pub struct Archive {
    /// Raw zip bytes, ready to be used as a response body
    pub bytes: Vec<u8>,
    /// Stored names that made it into the archive, in request order
    pub entries: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("none of the requested files exist")]
    NoMatches,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Bundle the requested files into a zip archive.
///
/// The input list is deduplicated up front (first occurrence wins) so a
/// repeated name can never produce a duplicate-entry error. Names that do
/// not reduce to a stored name, and names whose file is missing, are
/// skipped; a mix of found and missing names succeeds with the found
/// subset. Only when nothing at all matches does this fail.
pub async fn build_favorites_archive(
    store: &MediaStore,
    names: &[String],
) -> Result<Archive, ArchiveError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut entries = Vec::new();

    for stored in dedup_stored_names(names) {
        let content = match fs::read(store.root().join(&stored)).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(StorageError::Io(e).into()),
        };

        writer
            .start_file(stored.as_str(), options)
            .map_err(StorageError::Zip)?;
        writer.write_all(&content).map_err(StorageError::Io)?;
        entries.push(stored);
    }

    if entries.is_empty() {
        return Err(ArchiveError::NoMatches);
    }

    let cursor = writer.finish().map_err(StorageError::Zip)?;
    Ok(Archive {
        bytes: cursor.into_inner(),
        entries,
    })
}

/// Reduce the requested names to stored form and drop repeats, keeping
/// first-occurrence order. Unusable names fall out here: in a flat
/// namespace they cannot refer to anything.
fn dedup_stored_names(names: &[String]) -> Vec<String> {
    let mut stored = Vec::new();
    for name in names {
        if let Ok(clean) = MediaStore::stored_name(name) {
            if !stored.contains(&clean) {
                stored.push(clean);
            }
        }
    }
    stored
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt;

    async fn store_with(files: &[(&str, &[u8])]) -> (TempDir, MediaStore) {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path());
        for (name, content) in files {
            let (_, mut file) = store.create(name).await.unwrap();
            file.write_all(content).await.unwrap();
            file.flush().await.unwrap();
        }
        (dir, store)
    }

    fn entry_bytes(archive: &Archive, name: &str) -> Vec<u8> {
        let mut zip = zip::ZipArchive::new(Cursor::new(archive.bytes.clone())).unwrap();
        let mut entry = zip.by_name(name).unwrap();
        let mut out = Vec::new();
        entry.read_to_end(&mut out).unwrap();
        out
    }

    fn owned(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn bundles_stored_bytes_under_stored_name() {
        let (_dir, store) = store_with(&[("song.mp3", b"audio bytes")]).await;

        let archive = build_favorites_archive(&store, &owned(&["song.mp3"]))
            .await
            .unwrap();

        assert_eq!(archive.entries, vec!["song.mp3"]);
        assert_eq!(entry_bytes(&archive, "song.mp3"), b"audio bytes");
    }

    #[tokio::test]
    async fn empty_request_has_no_matches() {
        let (_dir, store) = store_with(&[("song.mp3", b"x")]).await;

        assert!(matches!(
            build_favorites_archive(&store, &[]).await,
            Err(ArchiveError::NoMatches)
        ));
    }

    #[tokio::test]
    async fn all_missing_has_no_matches() {
        let (_dir, store) = store_with(&[]).await;

        assert!(matches!(
            build_favorites_archive(&store, &owned(&["a.txt", "b.txt"])).await,
            Err(ArchiveError::NoMatches)
        ));
    }

    #[tokio::test]
    async fn mixed_request_keeps_existing_subset() {
        let (_dir, store) = store_with(&[("kept.txt", b"kept")]).await;

        let archive = build_favorites_archive(&store, &owned(&["missing.txt", "kept.txt"]))
            .await
            .unwrap();

        assert_eq!(archive.entries, vec!["kept.txt"]);
        let zip = zip::ZipArchive::new(Cursor::new(archive.bytes)).unwrap();
        assert_eq!(zip.len(), 1);
    }

    #[tokio::test]
    async fn repeated_names_collapse_to_one_entry() {
        let (_dir, store) = store_with(&[("song.mp3", b"x")]).await;

        let archive =
            build_favorites_archive(&store, &owned(&["song.mp3", "song.mp3", "song.mp3"]))
                .await
                .unwrap();

        assert_eq!(archive.entries, vec!["song.mp3"]);
    }

    #[tokio::test]
    async fn entry_order_follows_request_order() {
        let (_dir, store) = store_with(&[("b.txt", b"b"), ("a.txt", b"a")]).await;

        let archive = build_favorites_archive(&store, &owned(&["b.txt", "a.txt"]))
            .await
            .unwrap();

        assert_eq!(archive.entries, vec!["b.txt", "a.txt"]);
    }

    #[tokio::test]
    async fn traversal_names_reduce_to_base_name() {
        let (_dir, store) = store_with(&[("passwd", b"local")]).await;

        let archive = build_favorites_archive(&store, &owned(&["../../etc/passwd"]))
            .await
            .unwrap();

        assert_eq!(archive.entries, vec!["passwd"]);
        assert_eq!(entry_bytes(&archive, "passwd"), b"local");
    }

    #[tokio::test]
    async fn archiving_leaves_the_root_untouched() {
        let (dir, store) = store_with(&[("one.txt", b"1"), ("two.txt", b"2")]).await;

        build_favorites_archive(&store, &owned(&["one.txt", "two.txt"]))
            .await
            .unwrap();
        // A not-found pass must not leave anything behind either
        let _ = build_favorites_archive(&store, &owned(&["ghost.txt"])).await;

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["one.txt", "two.txt"]);
    }
}
