//! Content hashing for action signatures, plus test helpers.

pub mod hash;

#[cfg(test)]
pub mod testutil;
