// Storage module entry
// The shared media root: every stored file and lookup goes through here

pub mod archive;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;

/// Storage failure kinds, so callers can tell bad input from real I/O
/// trouble without matching on message strings
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unusable file name {0:?}")]
    InvalidName(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Handle on the shared media root.
///
/// The namespace is flat: every caller-supplied name is reduced to a
/// sanitized base name before it touches the filesystem, for uploads and
/// lookups alike. A request can therefore never address anything outside
/// the root.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the media root if it does not exist yet
    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// Reduce a caller-supplied name to its flat stored form.
    ///
    /// Directory components are stripped first, then the base name is
    /// sanitized. Upload destination, lookup path, and archive entry name
    /// all use this one form, so they can never disagree.
    pub fn stored_name(name: &str) -> Result<String, StorageError> {
        let base = Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::InvalidName(name.to_string()))?;

        let clean = sanitize_filename::sanitize(base);
        if clean.is_empty() {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(clean)
    }

    /// Resolve a caller-supplied name to its path under the root
    pub fn resolve(&self, name: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(Self::stored_name(name)?))
    }

    /// Open a stored file for writing, truncating any previous version
    /// (last write wins, no versioning). The root is created on demand so a
    /// fresh deployment needs no setup step.
    ///
    /// Returns the stored name together with the open handle.
    pub async fn create(&self, name: &str) -> Result<(String, fs::File), StorageError> {
        let stored = Self::stored_name(name)?;
        self.ensure_root().await?;
        let file = fs::File::create(self.root.join(&stored)).await?;
        Ok((stored, file))
    }

    /// Read a stored file in full
    pub async fn read(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        Ok(fs::read(self.resolve(name)?).await?)
    }

    /// Whether a stored file currently exists
    pub async fn exists(&self, name: &str) -> bool {
        match self.resolve(name) {
            Ok(path) => fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn stored_name_keeps_plain_names() {
        assert_eq!(MediaStore::stored_name("song.mp3").unwrap(), "song.mp3");
        assert_eq!(MediaStore::stored_name("notes.txt").unwrap(), "notes.txt");
    }

    #[test]
    fn stored_name_strips_directories() {
        assert_eq!(
            MediaStore::stored_name("albums/2024/song.mp3").unwrap(),
            "song.mp3"
        );
        assert_eq!(
            MediaStore::stored_name("../../etc/passwd").unwrap(),
            "passwd"
        );
        assert_eq!(MediaStore::stored_name("/absolute.txt").unwrap(), "absolute.txt");
    }

    #[test]
    fn stored_name_rejects_unnameable_input() {
        assert!(matches!(
            MediaStore::stored_name(""),
            Err(StorageError::InvalidName(_))
        ));
        assert!(matches!(
            MediaStore::stored_name("/"),
            Err(StorageError::InvalidName(_))
        ));
        assert!(matches!(
            MediaStore::stored_name(".."),
            Err(StorageError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn create_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path());

        let (_, mut file) = store.create("track.mp3").await.unwrap();
        file.write_all(b"first version").await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        let (stored, mut file) = store.create("track.mp3").await.unwrap();
        file.write_all(b"second").await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        assert_eq!(stored, "track.mp3");
        assert_eq!(store.read("track.mp3").await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn create_builds_missing_root() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path().join("media"));

        let (_, mut file) = store.create("a.txt").await.unwrap();
        file.write_all(b"x").await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        assert!(store.exists("a.txt").await);
    }

    #[tokio::test]
    async fn read_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path());

        match store.read("ghost.txt").await {
            Err(StorageError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn traversal_lookup_stays_inside_root() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path());

        let (_, mut file) = store.create("passwd").await.unwrap();
        file.write_all(b"local").await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        // The traversal input collapses to the base name inside the root
        assert_eq!(store.read("../../etc/passwd").await.unwrap(), b"local");
    }
}
