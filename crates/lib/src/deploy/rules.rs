//! Deployment rules.

use std::path::{Path, PathBuf};

/// One rule applied to a path relative to the source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployRule {
  /// Skip files whose immediate parent directory has this name.
  SkipParentDirNamed(String),
  /// Skip files with exactly this file name.
  SkipFileName(String),
  /// Skip files whose extension is in the set (without the dot).
  SkipExtensions(Vec<String>),
  /// Skip the file at exactly this relative path.
  SkipRelativePath(PathBuf),
  /// Skip files anywhere below a directory with this name.
  SkipUnderDirectory(String),
  /// Files below `prefix` land below `destination`, keeping the rest of
  /// their relative path.
  Redirect { prefix: PathBuf, destination: PathBuf },
}

impl DeployRule {
  fn excludes(&self, rel: &Path) -> bool {
    let file_name = rel.file_name().and_then(|n| n.to_str());
    match self {
      DeployRule::SkipParentDirNamed(name) => {
        rel.parent().and_then(Path::file_name).and_then(|n| n.to_str()) == Some(name.as_str())
      }
      DeployRule::SkipFileName(name) => file_name == Some(name.as_str()),
      DeployRule::SkipExtensions(exts) => rel
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| exts.iter().any(|x| x == e)),
      DeployRule::SkipRelativePath(path) => rel == path,
      DeployRule::SkipUnderDirectory(name) => rel
        .parent()
        .is_some_and(|parent| parent.components().any(|c| c.as_os_str() == name.as_str())),
      DeployRule::Redirect { .. } => false,
    }
  }

  fn redirect(&self, rel: &Path) -> Option<PathBuf> {
    let DeployRule::Redirect { prefix, destination } = self else {
      return None;
    };
    let rest = rel.strip_prefix(prefix).ok()?;
    if rest.as_os_str().is_empty() {
      return None;
    }
    Some(destination.join(rest))
  }
}

/// An ordered rule list.
///
/// Exclusions are checked first; the first matching redirect then decides
/// the destination, and unmatched paths keep their relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployRules {
  rules: Vec<DeployRule>,
}

impl DeployRules {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, rule: DeployRule) -> Self {
    self.rules.push(rule);
    self
  }

  /// Rules for copying the player variation into the build directory.
  pub fn player_files(app_name: &str) -> Self {
    Self::new()
      .with(DeployRule::SkipParentDirNamed("Managed".into()))
      .with(DeployRule::SkipFileName(".DS_Store".into()))
      .with(DeployRule::SkipExtensions(vec!["dll".into(), "pdb".into()]))
      .with(DeployRule::Redirect {
        prefix: PathBuf::from("Data"),
        destination: PathBuf::from(format!("{}.app", app_name))
          .join("Contents")
          .join("Resources")
          .join("Data"),
      })
  }

  /// Rules for copying the trampoline into the build directory. The
  /// excluded files are produced by other actions.
  pub fn trampoline(project_name: &str) -> Self {
    Self::new()
      .with(DeployRule::SkipExtensions(vec!["a".into()]))
      .with(DeployRule::SkipFileName(".DS_Store".into()))
      .with(DeployRule::SkipFileName("Preprocessor.h".into()))
      .with(DeployRule::SkipRelativePath(PathBuf::from("Info.plist")))
      .with(DeployRule::SkipUnderDirectory(format!("{}.xcodeproj", project_name)))
  }

  /// Destination of `rel` relative to the deploy root, or `None` if excluded.
  pub fn destination(&self, rel: &Path) -> Option<PathBuf> {
    if self.rules.iter().any(|r| r.excludes(rel)) {
      return None;
    }
    Some(
      self
        .rules
        .iter()
        .find_map(|r| r.redirect(rel))
        .unwrap_or_else(|| rel.to_path_buf()),
    )
  }
}
