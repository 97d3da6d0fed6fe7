//! Server-local storage for files attached to document-like records.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Result of storing one upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredUpload {
    /// Path recorded on the document row.
    pub path: String,
    /// Original client-side file name.
    pub file_name: String,
    pub size: i64,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait UploadStore: Send + Sync {
    async fn save(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> std::io::Result<StoredUpload>;

    /// Remove a previously stored file.
    async fn remove(&self, path: &str) -> std::io::Result<()>;
}

/// Uploads written to a directory on the local filesystem.
#[derive(Clone, Debug)]
pub struct LocalUploads {
    root: PathBuf,
}

impl LocalUploads {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalUploads { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    fn is_inside_root(&self, path: &Path) -> bool {
        let no_parent_refs = !path.components().any(|c| matches!(c, std::path::Component::ParentDir));
        no_parent_refs && path.starts_with(&self.root)
    }
}

#[async_trait]
impl UploadStore for LocalUploads {
    async fn save(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> std::io::Result<StoredUpload> {
        self.ensure_root().await?;
        let path = self.root.join(unique_file_name(original_name));
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "upload stored");
        Ok(StoredUpload {
            path: path.to_string_lossy().into_owned(),
            file_name: original_name.to_string(),
            size: i64::try_from(bytes.len()).unwrap_or(i64::MAX),
            content_type: content_type.map(str::to_string),
        })
    }

    async fn remove(&self, path: &str) -> std::io::Result<()> {
        let path = Path::new(path);
        if !self.is_inside_root(path) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("{} is outside the upload directory", path.display()),
            ));
        }
        tokio::fs::remove_file(path).await
    }
}

/// `{sanitised stem}_{random id}{.ext}`; the random part keeps concurrent uploads of the
/// same name from colliding.
pub fn unique_file_name(original_name: &str) -> String {
    let base = Path::new(original_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    let (stem, ext) = match base.rsplit_once('.') {
        Some((s, e)) if !s.is_empty() && !e.is_empty() => (s, Some(e)),
        _ => (base, None),
    };
    let clean = |s: &str| -> String {
        s.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .take(80)
            .collect()
    };
    let stem = match clean(stem) {
        s if s.is_empty() => "upload".to_string(),
        s => s,
    };
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    match ext.map(clean) {
        Some(e) if !e.is_empty() => format!("{}_{}.{}", stem, suffix, e),
        _ => format!("{}_{}", stem, suffix),
    }
}
