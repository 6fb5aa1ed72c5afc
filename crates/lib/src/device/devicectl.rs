//! Devices reached through `xcrun devicectl`.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use tempfile::Builder;
use tracing::{debug, info};

use super::{Device, DeviceError, DeviceProvider};
use crate::consts::APP_NAME;

/// Provider id served by [`DevicectlProvider`].
pub const APPLE_DEVICE_PROVIDER: &str = "appledevice";

#[derive(Debug, Deserialize)]
struct DeviceListOutput {
  result: DeviceListResult,
}

#[derive(Debug, Deserialize)]
struct DeviceListResult {
  #[serde(default)]
  devices: Vec<DeviceEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceEntry {
  identifier: String,
  #[serde(default)]
  device_properties: Option<DeviceProperties>,
}

#[derive(Debug, Deserialize)]
struct DeviceProperties {
  name: Option<String>,
}

/// Parse the JSON written by `devicectl list devices --json-output`.
///
/// Returns `(identifier, display name)` pairs; a device without a name is
/// shown by its identifier.
pub fn parse_device_list(json: &str) -> Result<Vec<(String, String)>, DeviceError> {
  let output: DeviceListOutput = serde_json::from_str(json)?;
  Ok(
    output
      .result
      .devices
      .into_iter()
      .map(|entry| {
        let name = entry
          .device_properties
          .and_then(|p| p.name)
          .unwrap_or_else(|| entry.identifier.clone());
        (entry.identifier, name)
      })
      .collect(),
  )
}

fn run_xcrun(args: &[String]) -> Result<String, DeviceError> {
  let shown = format!("xcrun {}", args.join(" "));
  debug!(cmd = %shown, "running device command");

  let output = Command::new("xcrun")
    .args(args)
    .output()
    .map_err(|source| DeviceError::Spawn {
      tool: "xcrun".to_string(),
      source,
    })?;

  if !output.status.success() {
    return Err(DeviceError::CommandFailed {
      command: shown,
      code: output.status.code(),
      stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    });
  }
  Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DevicectlProvider;

impl DevicectlProvider {
  pub fn new() -> Self {
    Self
  }
}

impl DeviceProvider for DevicectlProvider {
  fn discover(&self, provider_ids: &[&str]) -> Result<Vec<Box<dyn Device>>, DeviceError> {
    if !provider_ids.contains(&APPLE_DEVICE_PROVIDER) {
      return Ok(Vec::new());
    }

    let json_file = Builder::new().prefix(APP_NAME).suffix(".json").tempfile()?;
    run_xcrun(&[
      "devicectl".to_string(),
      "list".to_string(),
      "devices".to_string(),
      "--json-output".to_string(),
      json_file.path().to_string_lossy().into_owned(),
    ])?;
    let json = std::fs::read_to_string(json_file.path())?;

    let devices = parse_device_list(&json)?;
    info!(count = devices.len(), "discovered devices");
    Ok(
      devices
        .into_iter()
        .map(|(id, display_name)| Box::new(DevicectlDevice::new(id, display_name)) as Box<dyn Device>)
        .collect(),
    )
  }
}

/// A device driven by `devicectl`.
///
/// `devicectl` cannot stop an app by bundle id, so [`Device::force_stop`]
/// marks the next launch to terminate any running instance.
#[derive(Debug, Clone)]
pub struct DevicectlDevice {
  id: String,
  display_name: String,
  terminate_existing: bool,
}

impl DevicectlDevice {
  pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      display_name: display_name.into(),
      terminate_existing: false,
    }
  }

  fn install_args(&self, bundle_path: &Path) -> Vec<String> {
    vec![
      "devicectl".to_string(),
      "device".to_string(),
      "install".to_string(),
      "app".to_string(),
      "--device".to_string(),
      self.id.clone(),
      bundle_path.to_string_lossy().into_owned(),
    ]
  }

  fn launch_args(&self, app_id: &str) -> Vec<String> {
    let mut args = vec![
      "devicectl".to_string(),
      "device".to_string(),
      "process".to_string(),
      "launch".to_string(),
      "--device".to_string(),
      self.id.clone(),
    ];
    if self.terminate_existing {
      args.push("--terminate-existing".to_string());
    }
    args.push(app_id.to_string());
    args
  }
}

impl Device for DevicectlDevice {
  fn id(&self) -> &str {
    &self.id
  }

  fn display_name(&self) -> &str {
    &self.display_name
  }

  fn deploy(&mut self, app_id: &str, bundle_path: &Path) -> Result<(), DeviceError> {
    debug!(app = app_id, device = %self.display_name, "devicectl install");
    run_xcrun(&self.install_args(bundle_path)).map(|_| ())
  }

  fn force_stop(&mut self, app_id: &str) -> Result<(), DeviceError> {
    debug!(app = app_id, device = %self.display_name, "next launch terminates running instance");
    self.terminate_existing = true;
    Ok(())
  }

  fn start(&mut self, app_id: &str) -> Result<(), DeviceError> {
    debug!(app = app_id, device = %self.display_name, "devicectl launch");
    run_xcrun(&self.launch_args(app_id))?;
    self.terminate_existing = false;
    Ok(())
  }
}
