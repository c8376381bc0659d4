use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{AppError, Result};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "txt", "csv", "doc", "docx", "xls", "xlsx", "zip"];

/// Maximum file size (10 MB)
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    /// The ticket's single image attachment.
    Image,
    /// Anything in the ticket's file list, images included.
    #[default]
    File,
}

impl AttachmentKind {
    fn allows(&self, extension: &str) -> bool {
        match self {
            AttachmentKind::Image => IMAGE_EXTENSIONS.contains(&extension),
            AttachmentKind::File => {
                IMAGE_EXTENSIONS.contains(&extension) || DOCUMENT_EXTENSIONS.contains(&extension)
            }
        }
    }

    fn subdir(&self) -> &'static str {
        match self {
            AttachmentKind::Image => "images",
            AttachmentKind::File => "files",
        }
    }
}

/// Ticket attachments on local disk. Stored paths are relative to `root`.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn save(&self, kind: AttachmentKind, filename: &str, data: &[u8]) -> Result<String> {
        if data.len() > MAX_FILE_SIZE {
            return Err(AppError::Validation("File too large (max 10 MB)".to_string()));
        }

        let extension = extension_of(filename)
            .ok_or_else(|| AppError::Validation("Invalid filename".to_string()))?;

        if !kind.allows(&extension) {
            return Err(AppError::Validation(format!(
                "File type .{} is not allowed for {:?} attachments",
                extension, kind
            )));
        }

        let dir = self.root.join(kind.subdir());
        fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::Internal(format!("Failed to create uploads directory: {}", e))
        })?;

        let stored_name = format!("{}.{}", Uuid::new_v4(), extension);
        let mut file = fs::File::create(dir.join(&stored_name)).await.map_err(|e| {
            AppError::Internal(format!("Failed to create file: {}", e))
        })?;

        file.write_all(data).await.map_err(|e| {
            AppError::Internal(format!("Failed to write file: {}", e))
        })?;

        Ok(format!("{}/{}", kind.subdir(), stored_name))
    }

    /// Checks that `stored_path` names a file saved by this store for `kind`.
    pub async fn ensure_stored(&self, kind: AttachmentKind, stored_path: &str) -> Result<()> {
        let unknown = || AppError::Validation(format!("Unknown attachment: {}", stored_path));

        let (subdir, name) = stored_path.split_once('/').ok_or_else(unknown)?;
        if subdir != kind.subdir() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(unknown());
        }
        let extension = extension_of(name).ok_or_else(unknown)?;
        if !kind.allows(&extension) {
            return Err(unknown());
        }

        match fs::metadata(self.root.join(subdir).join(name)).await {
            Ok(meta) if meta.is_file() => Ok(()),
            _ => Err(unknown()),
        }
    }

    /// Removes a stored attachment. Missing files and paths that would escape
    /// the uploads root are ignored.
    pub async fn delete(&self, stored_path: &str) -> Result<()> {
        let relative = Path::new(stored_path);
        if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
            tracing::warn!("Refusing to delete attachment outside uploads dir: {}", stored_path);
            return Ok(());
        }

        let path = self.root.join(relative);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Internal(format!("Failed to delete file: {}", e))),
        }
    }
}

fn extension_of(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}
