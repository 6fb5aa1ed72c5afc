//! WriteText action implementation.

use std::path::Path;

use tracing::debug;

use crate::execute::types::ExecuteError;

/// Write `content` to `dest`.
///
/// The file is left untouched when it already holds exactly `content`, so
/// tools that look at modification times do not see a spurious change.
pub async fn execute_write(dest: &Path, content: &str) -> Result<(), ExecuteError> {
  if let Ok(existing) = tokio::fs::read(dest).await
    && existing == content.as_bytes()
  {
    debug!(dest = %dest.display(), "content unchanged");
    return Ok(());
  }

  debug!(dest = %dest.display(), bytes = content.len(), "writing file");
  tokio::fs::write(dest, content).await?;
  Ok(())
}
