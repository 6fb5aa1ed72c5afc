//! Copy action implementation.

use std::path::Path;

use tracing::debug;

use crate::execute::types::ExecuteError;

/// Copy `source` to `dest`, replacing any existing file.
///
/// Permissions are preserved so copied tools stay executable.
pub async fn execute_copy(source: &Path, dest: &Path) -> Result<(), ExecuteError> {
  debug!(source = %source.display(), dest = %dest.display(), "copying file");
  if tokio::fs::symlink_metadata(dest).await.is_ok() {
    tokio::fs::remove_file(dest).await?;
  }
  tokio::fs::copy(source, dest).await?;
  Ok(())
}
