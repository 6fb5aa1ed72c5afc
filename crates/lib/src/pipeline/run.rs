//! Installing and launching the built app.

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::config::{ComponentKind, PipelineConfig};
use crate::consts::DEVICE_PROVIDERS;
use crate::device::{DeviceError, DeviceProvider};

#[derive(Debug, Error)]
pub enum RunError {
  #[error("configuration component '{0}' is required to run")]
  ConfigurationInvalid(ComponentKind),

  #[error("No iOS devices available")]
  NoDeviceFound,

  #[error("app bundle not found at {0}; build first")]
  ArtifactMissing(PathBuf),

  #[error(transparent)]
  Device(#[from] DeviceError),
}

/// What was launched where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
  pub app_id: String,
  pub device_id: String,
  pub device_name: String,
  pub bundle_path: PathBuf,
}

/// Path of the built app, if it exists.
pub fn can_run(config: &PipelineConfig) -> Result<PathBuf, RunError> {
  let general = config
    .general
    .as_ref()
    .ok_or(RunError::ConfigurationInvalid(ComponentKind::General))?;
  let bundle = config.app_bundle_path(&general.product_name);
  if !bundle.is_dir() {
    return Err(RunError::ArtifactMissing(bundle));
  }
  Ok(bundle)
}

/// Install the built app on the first discovered device and launch it,
/// stopping any running instance first.
pub fn run_on_device(config: &PipelineConfig, provider: &dyn DeviceProvider) -> Result<RunReport, RunError> {
  let general = config
    .general
    .as_ref()
    .ok_or(RunError::ConfigurationInvalid(ComponentKind::General))?;

  let mut devices = provider.discover(DEVICE_PROVIDERS)?;
  if devices.is_empty() {
    return Err(RunError::NoDeviceFound);
  }
  let mut device = devices.swap_remove(0);

  let app_id = general.application_id();
  let bundle_path = config.app_bundle_path(&general.product_name);

  info!(app = %app_id, device = device.display_name(), "installing application");
  device.deploy(&app_id, &bundle_path)?;
  info!(app = %app_id, device = device.display_name(), "starting application");
  device.force_stop(&app_id)?;
  device.start(&app_id)?;

  Ok(RunReport {
    app_id,
    device_id: device.id().to_string(),
    device_name: device.display_name().to_string(),
    bundle_path,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::device::Device;
  use std::cell::RefCell;
  use std::path::Path;
  use std::rc::Rc;

  type Calls = Rc<RefCell<Vec<String>>>;

  struct FakeDevice {
    id: String,
    calls: Calls,
  }

  impl Device for FakeDevice {
    fn id(&self) -> &str {
      &self.id
    }

    fn display_name(&self) -> &str {
      "Fake"
    }

    fn deploy(&mut self, app_id: &str, bundle_path: &Path) -> Result<(), DeviceError> {
      self
        .calls
        .borrow_mut()
        .push(format!("{} deploy {} {}", self.id, app_id, bundle_path.display()));
      Ok(())
    }

    fn force_stop(&mut self, app_id: &str) -> Result<(), DeviceError> {
      self.calls.borrow_mut().push(format!("{} stop {}", self.id, app_id));
      Ok(())
    }

    fn start(&mut self, app_id: &str) -> Result<(), DeviceError> {
      self.calls.borrow_mut().push(format!("{} start {}", self.id, app_id));
      Ok(())
    }
  }

  struct FakeProvider {
    ids: Vec<&'static str>,
    calls: Calls,
    queried: RefCell<Vec<String>>,
  }

  impl DeviceProvider for FakeProvider {
    fn discover(&self, provider_ids: &[&str]) -> Result<Vec<Box<dyn Device>>, DeviceError> {
      self
        .queried
        .borrow_mut()
        .extend(provider_ids.iter().map(|s| s.to_string()));
      Ok(
        self
          .ids
          .iter()
          .map(|id| {
            Box::new(FakeDevice {
              id: id.to_string(),
              calls: self.calls.clone(),
            }) as Box<dyn Device>
          })
          .collect(),
      )
    }
  }

  fn config() -> PipelineConfig {
    PipelineConfig::from_toml_str(
      "[general]\nproduct_name = \"Game\"\ncompany_name = \"com.example\"\n\n[paths]\nbuild_dir = \"/b\"\nplayer_dir = \"/p\"\n",
      Path::new("/"),
    )
    .unwrap()
  }

  #[test]
  fn no_device_found_attempts_no_deploy() {
    let calls = Calls::default();
    let provider = FakeProvider {
      ids: vec![],
      calls: calls.clone(),
      queried: RefCell::new(Vec::new()),
    };

    let err = run_on_device(&config(), &provider).unwrap_err();

    assert!(matches!(err, RunError::NoDeviceFound));
    assert!(calls.borrow().is_empty());
    assert_eq!(*provider.queried.borrow(), vec!["appledevice".to_string()]);
  }

  #[test]
  fn deploys_to_first_device_only() {
    let calls = Calls::default();
    let provider = FakeProvider {
      ids: vec!["first", "second"],
      calls: calls.clone(),
      queried: RefCell::new(Vec::new()),
    };

    let report = run_on_device(&config(), &provider).unwrap();

    assert_eq!(report.app_id, "com.example.Game");
    assert_eq!(report.device_id, "first");
    assert_eq!(
      *calls.borrow(),
      vec![
        "first deploy com.example.Game /b/xcode_DerivedData/Build/Products/ReleaseForRunning-iphoneos/Game.app"
          .to_string(),
        "first stop com.example.Game".to_string(),
        "first start com.example.Game".to_string(),
      ]
    );
  }

  #[test]
  fn can_run_requires_bundle() {
    let err = can_run(&config()).unwrap_err();
    assert!(matches!(err, RunError::ArtifactMissing(_)));
  }

  #[test]
  fn can_run_finds_built_bundle() {
    let temp = tempfile::TempDir::new().unwrap();
    let text = format!(
      "[general]\nproduct_name = \"Game\"\ncompany_name = \"co\"\n\n[paths]\nbuild_dir = \"{}\"\nplayer_dir = \"/p\"\n",
      temp.path().display()
    );
    let config = PipelineConfig::from_toml_str(&text, Path::new("/")).unwrap();
    let bundle = config.app_bundle_path("Game");
    std::fs::create_dir_all(&bundle).unwrap();

    assert_eq!(can_run(&config).unwrap(), bundle);
  }
}
