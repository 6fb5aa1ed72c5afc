//! Removal of previous build output.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::StepError;
use crate::config::PipelineConfig;

/// Delete the build directory and, when the player is installed into the
/// build folder, its source build directory. Missing directories are
/// skipped. Returns the directories removed.
pub fn clean(config: &PipelineConfig) -> Result<Vec<PathBuf>, StepError> {
  let mut targets = vec![config.paths.build_dir.clone()];
  if config.profile.install_in_build_folder {
    targets.push(
      config
        .paths
        .playback_engine_dir
        .join("SourceBuild")
        .join(&config.profile.configuration_name),
    );
  }

  let mut removed = Vec::new();
  for dir in targets {
    if remove_dir(&dir)? {
      info!(path = %dir.display(), "removed");
      removed.push(dir);
    }
  }
  Ok(removed)
}

fn remove_dir(dir: &Path) -> Result<bool, StepError> {
  match fs::remove_dir_all(dir) {
    Ok(()) => Ok(true),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
    Err(source) => Err(StepError::Io {
      path: dir.to_path_buf(),
      source,
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::write_tree;
  use tempfile::TempDir;

  fn config(root: &Path, install_in_build_folder: bool) -> PipelineConfig {
    let text = format!(
      "[profile]\ninstall_in_build_folder = {}\nconfiguration_name = \"Dev\"\n\n[paths]\nbuild_dir = \"build\"\nplayer_dir = \"player\"\nplayback_engine_dir = \"engine\"\n",
      install_in_build_folder
    );
    PipelineConfig::from_toml_str(&text, root).unwrap()
  }

  #[test]
  fn removes_build_directory() {
    let temp = TempDir::new().unwrap();
    write_tree(temp.path(), &[("build/Libraries/a.dylib", "x"), ("engine/SourceBuild/Dev/x", "x")]);

    let removed = clean(&config(temp.path(), false)).unwrap();

    assert_eq!(removed, vec![temp.path().join("build")]);
    assert!(!temp.path().join("build").exists());
    assert!(temp.path().join("engine/SourceBuild/Dev").exists());
  }

  #[test]
  fn removes_source_build_when_installed_in_build_folder() {
    let temp = TempDir::new().unwrap();
    write_tree(temp.path(), &[("build/a", "x"), ("engine/SourceBuild/Dev/x", "x"), ("engine/SourceBuild/Other/x", "x")]);

    let removed = clean(&config(temp.path(), true)).unwrap();

    assert_eq!(removed.len(), 2);
    assert!(!temp.path().join("engine/SourceBuild/Dev").exists());
    assert!(temp.path().join("engine/SourceBuild/Other").exists());
  }

  #[test]
  fn missing_directories_are_not_an_error() {
    let temp = TempDir::new().unwrap();
    let removed = clean(&config(temp.path(), true)).unwrap();
    assert!(removed.is_empty());
  }
}
