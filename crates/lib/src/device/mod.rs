//! Device discovery and app deployment.
//!
//! A [`DeviceProvider`] discovers connected devices for a set of provider
//! ids. Each [`Device`] can install an app bundle, stop a running app and
//! launch it. All operations block until the underlying tool returns; there
//! is no timeout.

mod devicectl;

use std::path::Path;

use thiserror::Error;

pub use devicectl::{DevicectlDevice, DevicectlProvider, parse_device_list};

#[derive(Debug, Error)]
pub enum DeviceError {
  #[error("failed to run {tool}: {source}")]
  Spawn {
    tool: String,
    #[source]
    source: std::io::Error,
  },

  #[error("{command} failed with exit code {code:?}: {stderr}")]
  CommandFailed {
    command: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("failed to parse device list: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

/// A connected device that can receive an app bundle.
pub trait Device {
  fn id(&self) -> &str;

  fn display_name(&self) -> &str;

  /// Install the bundle at `bundle_path` as `app_id`.
  fn deploy(&mut self, app_id: &str, bundle_path: &Path) -> Result<(), DeviceError>;

  /// Stop `app_id` if it is running.
  fn force_stop(&mut self, app_id: &str) -> Result<(), DeviceError>;

  fn start(&mut self, app_id: &str) -> Result<(), DeviceError>;
}

pub trait DeviceProvider {
  /// Devices currently reachable through any of `provider_ids`.
  fn discover(&self, provider_ids: &[&str]) -> Result<Vec<Box<dyn Device>>, DeviceError>;
}
