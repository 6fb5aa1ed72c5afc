//! Implementation of the `iospack run` command.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use iospack_lib::device::DevicectlProvider;
use iospack_lib::pipeline::{can_run, run_on_device};

use super::load_config;
use crate::output::{OutputFormat, print_json, print_stat, print_success};

#[derive(Debug, Serialize)]
struct RunSummary {
  app_id: String,
  device_id: String,
  device_name: String,
  bundle: String,
}

pub fn cmd_run(config_path: &Path, output: OutputFormat) -> Result<()> {
  let config = load_config(config_path)?;
  can_run(&config).context("Nothing to run")?;

  let report = run_on_device(&config, &DevicectlProvider::new()).context("Failed to run on device")?;
  let summary = RunSummary {
    app_id: report.app_id,
    device_id: report.device_id,
    device_name: report.device_name,
    bundle: report.bundle_path.display().to_string(),
  };

  if output.is_json() {
    return print_json(&summary);
  }

  print_success(&format!("Launched {} on {}", summary.app_id, summary.device_name));
  print_stat("Device", &summary.device_id);
  print_stat("Bundle", &summary.bundle);

  Ok(())
}
