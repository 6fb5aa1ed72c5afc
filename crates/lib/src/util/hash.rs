//! Hashes behind action identity and incremental re-execution.
//!
//! An action is identified by an [`ObjectHash`] of its declaration and is
//! considered up to date while the [`ContentHash`] of its inputs matches the
//! one recorded after its last successful run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use walkdir::WalkDir;

use crate::consts::OBJ_HASH_PREFIX_LEN;

pub type HashError = serde_json::Error;

/// Finder metadata never counts as an input change.
const IGNORED_NAMES: &[&str] = &[".DS_Store"];

/// Truncated SHA-256 of a value's JSON form, e.g. `"a1b2c3d4e5f6789012ab"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHash(pub String);

impl std::fmt::Display for ObjectHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

pub trait Hashable: Serialize {
  fn compute_hash(&self) -> Result<ObjectHash, HashError> {
    let json = serde_json::to_vec(self)?;
    let mut full = hash_bytes(&json).0;
    full.truncate(OBJ_HASH_PREFIX_LEN);
    Ok(ObjectHash(full))
  }
}

/// Full lowercase hex SHA-256.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
  fn finish(hasher: Sha256) -> Self {
    ContentHash(hex::encode(hasher.finalize()))
  }
}

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Debug, Error)]
pub enum InputHashError {
  #[error("failed to read input {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to walk input directory {path}: {message}")]
  Walk { path: PathBuf, message: String },
}

fn read_error(path: &Path) -> impl FnOnce(io::Error) -> InputHashError + '_ {
  move |source| InputHashError::Read {
    path: path.to_path_buf(),
    source,
  }
}

/// Hash an action input: the bytes of a file, or for a directory every
/// entry's relative path, kind and content. Timestamps and permissions are
/// not part of the hash.
pub fn hash_path(path: &Path) -> Result<ContentHash, InputHashError> {
  if path.is_dir() {
    hash_tree(path)
  } else {
    hash_file(path)
  }
}

fn hash_file(path: &Path) -> Result<ContentHash, InputHashError> {
  let mut file = fs::File::open(path).map_err(read_error(path))?;
  let mut hasher = Sha256::new();
  io::copy(&mut file, &mut hasher).map_err(read_error(path))?;
  Ok(ContentHash::finish(hasher))
}

fn hash_tree(root: &Path) -> Result<ContentHash, InputHashError> {
  let mut hasher = Sha256::new();

  let walker = WalkDir::new(root)
    .min_depth(1)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|e| !e.file_name().to_str().is_some_and(|n| IGNORED_NAMES.contains(&n)));

  for entry in walker {
    let entry = entry.map_err(|e| InputHashError::Walk {
      path: root.to_path_buf(),
      message: e.to_string(),
    })?;
    let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
    let rel = rel.to_string_lossy();
    let kind = entry.file_type();

    let line = if kind.is_symlink() {
      let target = fs::read_link(entry.path()).map_err(read_error(entry.path()))?;
      format!("link {} {}\n", rel, target.display())
    } else if kind.is_dir() {
      format!("dir {}\n", rel)
    } else if kind.is_file() {
      format!("file {} {}\n", rel, hash_file(entry.path())?)
    } else {
      continue;
    };
    hasher.update(line.as_bytes());
  }

  Ok(ContentHash::finish(hasher))
}

pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash::finish(hasher)
}
