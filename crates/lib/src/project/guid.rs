//! Deterministic object identifiers.

use std::fmt;

use sha2::{Digest, Sha256};

/// A 24 hex digit object identifier, as used for every object in a project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Guid(pub String);

impl Guid {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for Guid {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<&str> for Guid {
  fn from(s: &str) -> Self {
    Guid(s.to_string())
  }
}

/// Generates identifiers from a seed, a running counter and the identity of
/// the object being created. The same mutation sequence on the same input
/// always yields the same identifiers.
#[derive(Debug, Clone)]
pub struct GuidGenerator {
  seed: String,
  counter: u64,
}

impl GuidGenerator {
  pub fn new(seed: impl Into<String>) -> Self {
    Self {
      seed: seed.into(),
      counter: 0,
    }
  }

  pub fn next(&mut self, identity: &str) -> Guid {
    self.counter += 1;
    let mut hasher = Sha256::new();
    hasher.update(self.seed.as_bytes());
    hasher.update(self.counter.to_le_bytes());
    hasher.update(identity.as_bytes());
    let digest = hasher.finalize();
    Guid(hex::encode_upper(&digest[..12]))
  }
}
