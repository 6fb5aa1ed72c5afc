//! Persisted action signatures.
//!
//! The executor remembers, per action identity, the signature of the inputs
//! it last ran with. An action is up to date when its current signature
//! matches and all of its outputs still exist.
//!
//! # Storage Layout
//!
//! ```text
//! {build_dir}/.iospack/
//! └── actions.json        # ActionState: action id -> input signature
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::action::ActionSpec;
use crate::consts::ACTION_STATE_FILENAME;
use crate::util::hash::{ContentHash, Hashable, ObjectHash, hash_path};

use super::types::ExecuteError;

/// Current version of the state file format.
pub const ACTION_STATE_VERSION: u32 = 1;

/// Signatures recorded by previous runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionState {
  pub version: u32,
  pub signatures: BTreeMap<String, String>,
}

impl Default for ActionState {
  fn default() -> Self {
    Self {
      version: ACTION_STATE_VERSION,
      signatures: BTreeMap::new(),
    }
  }
}

/// Reads and writes [`ActionState`] under a state directory.
#[derive(Debug, Clone)]
pub struct ActionStateStore {
  base_path: PathBuf,
}

impl ActionStateStore {
  pub fn new(base_path: impl Into<PathBuf>) -> Self {
    Self {
      base_path: base_path.into(),
    }
  }

  fn state_path(&self) -> PathBuf {
    self.base_path.join(ACTION_STATE_FILENAME)
  }

  /// Load the state, returning an empty one if none was saved yet.
  ///
  /// A file with an unknown version is discarded, which forces a full rebuild.
  pub fn load(&self) -> Result<ActionState, ExecuteError> {
    let content = match fs::read_to_string(self.state_path()) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ActionState::default()),
      Err(e) => return Err(ExecuteError::State(e.to_string())),
    };

    let state: ActionState = serde_json::from_str(&content).map_err(|e| ExecuteError::State(e.to_string()))?;
    if state.version != ACTION_STATE_VERSION {
      return Ok(ActionState::default());
    }
    Ok(state)
  }

  /// Save the state atomically (write to a temp file, then rename).
  pub fn save(&self, state: &ActionState) -> Result<(), ExecuteError> {
    fs::create_dir_all(&self.base_path)?;
    let content = serde_json::to_string_pretty(state).map_err(|e| ExecuteError::State(e.to_string()))?;

    let mut temp = tempfile::NamedTempFile::new_in(&self.base_path)?;
    temp.write_all(content.as_bytes())?;
    temp
      .persist(self.state_path())
      .map_err(|e| ExecuteError::State(e.to_string()))?;
    Ok(())
  }
}

/// Stable identity of an action, independent of its inputs' contents.
pub fn action_id(spec: &ActionSpec) -> Result<ObjectHash, ExecuteError> {
  Ok(spec.compute_hash()?)
}

/// Signature of an action's current inputs.
///
/// Fails with `MissingInputArtifact` when a declared input does not exist.
pub fn input_signature(spec: &ActionSpec) -> Result<ContentHash, ExecuteError> {
  let mut hasher = Sha256::new();
  hasher.update(serde_json::to_string(&spec.command)?.as_bytes());

  for input in &spec.inputs {
    if !input.exists() {
      return Err(ExecuteError::MissingInputArtifact {
        action: spec.label.clone(),
        path: input.clone(),
      });
    }
    let hash = hash_path(input)?;
    hasher.update(format!("\n{}:{}", input.display(), hash.0).as_bytes());
  }

  Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

/// Returns true if every declared output exists.
pub fn outputs_present(spec: &ActionSpec) -> bool {
  spec.outputs.iter().all(|p| Path::new(p).exists())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn load_missing_state_is_empty() {
    let temp = TempDir::new().unwrap();
    let store = ActionStateStore::new(temp.path().join("state"));
    let state = store.load().unwrap();
    assert!(state.signatures.is_empty());
  }

  #[test]
  fn save_then_load() {
    let temp = TempDir::new().unwrap();
    let store = ActionStateStore::new(temp.path().join("state"));

    let mut state = ActionState::default();
    state.signatures.insert("abc".to_string(), "def".to_string());
    store.save(&state).unwrap();

    let loaded = store.load().unwrap();
    assert_eq!(loaded.signatures.get("abc").map(String::as_str), Some("def"));
  }

  #[test]
  fn unknown_version_is_discarded() {
    let temp = TempDir::new().unwrap();
    fs::write(
      temp.path().join(ACTION_STATE_FILENAME),
      r#"{"version": 99, "signatures": {"a": "b"}}"#,
    )
    .unwrap();

    let state = ActionStateStore::new(temp.path()).load().unwrap();
    assert!(state.signatures.is_empty());
  }

  #[test]
  fn signature_tracks_input_content() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in.txt");
    fs::write(&input, "one").unwrap();
    let spec = ActionSpec::copy(&temp.path().join("out.txt"), &input);

    let first = input_signature(&spec).unwrap();
    assert_eq!(first, input_signature(&spec).unwrap());

    fs::write(&input, "two").unwrap();
    assert_ne!(first, input_signature(&spec).unwrap());
  }

  #[test]
  fn signature_requires_inputs() {
    let temp = TempDir::new().unwrap();
    let spec = ActionSpec::copy(&temp.path().join("out"), &temp.path().join("missing"));

    let err = input_signature(&spec).unwrap_err();
    assert!(matches!(err, ExecuteError::MissingInputArtifact { .. }));
  }
}
