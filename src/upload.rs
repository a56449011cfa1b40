//! Uploaded attachments are written to disk first and read back when the mail is built.

use std::path::{Path, PathBuf};

use tracing::debug;

const FALLBACK_NAME: &str = "upload";

#[derive(Debug, Clone)]
pub struct UploadDir {
    dir: PathBuf,
}

impl UploadDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Stores `data` under the client supplied filename. A later upload of the same name
    /// replaces it.
    pub async fn save(&self, filename: &str, data: &[u8]) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(sanitize_filename(filename));
        tokio::fs::write(&path, data).await?;
        debug!(message = "Upload stored", path = ?path, bytes = data.len());
        Ok(path)
    }

    pub async fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }
}

/// Keeps only the final path component so an upload can't escape the directory.
pub fn sanitize_filename(filename: &str) -> String {
    let normalized = filename.replace('\\', "/");
    Path::new(&normalized)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(FALLBACK_NAME)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_components_are_stripped() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\cv.docx"), "cv.docx");
        assert_eq!(sanitize_filename(".."), FALLBACK_NAME);
        assert_eq!(sanitize_filename(""), FALLBACK_NAME);
    }

    #[tokio::test]
    async fn save_then_read_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(dir.path().join("uploads"));

        let path = uploads.save("notes.txt", b"first").await.unwrap();
        assert_eq!(path, dir.path().join("uploads/notes.txt"));
        assert_eq!(uploads.read(&path).await.unwrap(), b"first");

        let again = uploads.save("notes.txt", b"second").await.unwrap();
        assert_eq!(again, path);
        assert_eq!(uploads.read(&path).await.unwrap(), b"second");
    }
}
