use std::path::Path;

use tumbleweed_common::error::{ArchiveError, Result};

/// Writes a document, creating missing parent directories on the first
/// write into a new day or month.
pub async fn write_document(path: &Path, body: &str) -> Result<()> {
    if let Err(err) = tokio::fs::write(path, body).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            return Err(write_error(path, err));
        }
        let parent = path.parent().ok_or_else(|| {
            write_error(path, std::io::Error::other("path has no parent directory"))
        })?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| write_error(path, err))?;
        tokio::fs::write(path, body)
            .await
            .map_err(|err| write_error(path, err))?;
    }
    Ok(())
}

fn write_error(path: &Path, source: std::io::Error) -> ArchiveError {
    ArchiveError::Write {
        path: path.to_path_buf(),
        source,
    }
}
