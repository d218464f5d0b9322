use crate::file::{read_json, write_json_pretty};
use redditkeep_core::{normalize_all, CoreError, StoreError};
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Normalize a JSON array of raw posts from `input` into `output`.
///
/// Returns the number of posts written. Unlike a merge, this overwrites
/// `output` and keeps posts that have no id.
pub async fn convert_file(input: &Path, output: &Path) -> Result<usize, CoreError> {
    let raw = match read_json(input).await? {
        Some(Value::Array(raw)) => raw,
        Some(_) => {
            return Err(StoreError::NotAnArray {
                path: input.to_path_buf(),
            }
            .into())
        }
        None => {
            return Err(CoreError::InvalidInput {
                message: format!("{} does not exist", input.display()),
            })
        }
    };
    info!("Loaded {} posts from {}", raw.len(), input.display());

    let posts = normalize_all(&raw);
    write_json_pretty(output, &posts).await?;

    info!("Transformation complete, output written to {}", output.display());
    Ok(posts.len())
}
