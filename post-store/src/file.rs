//! Flat-file JSON IO shared by the merge, cache and conversion paths.

use redditkeep_core::{CoreError, StoreError};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Read and parse a JSON file. `Ok(None)` means the file does not exist; a
/// file holding only whitespace parses as an empty array.
pub async fn read_json(path: &Path) -> Result<Option<Value>, StoreError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Unreadable {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if raw.trim().is_empty() {
        return Ok(Some(Value::Array(Vec::new())));
    }

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StoreError::Malformed {
            path: path.to_path_buf(),
            source,
        })
}

/// Write `value` as 2-space pretty JSON, creating parent directories.
///
/// The bytes land in a sibling temp file first and are renamed over `path`,
/// so readers never observe a half-written store.
pub async fn write_json_pretty<T>(path: &Path, value: &T) -> Result<(), CoreError>
where
    T: serde::Serialize + ?Sized,
{
    let contents = serde_json::to_string_pretty(value)?;

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|source| write_failed(path, source))?;

    let tmp = temp_path(parent, path);
    debug!("Writing {} bytes to {}", contents.len(), tmp.display());
    tokio::fs::write(&tmp, contents)
        .await
        .map_err(|source| write_failed(path, source))?;

    if let Err(source) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(write_failed(path, source).into());
    }
    Ok(())
}

fn temp_path(parent: &Path, path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "store".to_string());
    parent.join(format!(".{}.{}.tmp", name, Uuid::new_v4()))
}

fn write_failed(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::WriteFailed {
        path: path.to_path_buf(),
        source,
    }
}
