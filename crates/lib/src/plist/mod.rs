//! `Info.plist` patching.
//!
//! The trampoline ships a template `Info.plist`; the pipeline rewrites the
//! entries derived from player settings and leaves every other key alone.

mod xml;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use xml::{PlistDict, PlistValue, parse_xml, to_xml};

#[derive(Debug, Error)]
pub enum PlistError {
  #[error("invalid xml: {0}")]
  Xml(#[from] roxmltree::Error),

  #[error("root element is <{0}>, expected <plist>")]
  NotAPlist(String),

  #[error("top-level value is not a dictionary")]
  RootNotDict,

  #[error("invalid plist: {0}")]
  Invalid(String),
}

/// An interface orientation the app may present in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceOrientation {
  Portrait,
  PortraitUpsideDown,
  LandscapeLeft,
  LandscapeRight,
}

impl InterfaceOrientation {
  pub fn as_plist_str(self) -> &'static str {
    match self {
      InterfaceOrientation::Portrait => "UIInterfaceOrientationPortrait",
      InterfaceOrientation::PortraitUpsideDown => "UIInterfaceOrientationPortraitUpsideDown",
      InterfaceOrientation::LandscapeLeft => "UIInterfaceOrientationLandscapeLeft",
      InterfaceOrientation::LandscapeRight => "UIInterfaceOrientationLandscapeRight",
    }
  }
}

/// Status bar appearance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusBarStyle {
  #[default]
  Default,
  LightContent,
}

impl StatusBarStyle {
  fn as_plist_str(self) -> &'static str {
    match self {
      StatusBarStyle::Default => "UIStatusBarStyleDefault",
      StatusBarStyle::LightContent => "UIStatusBarStyleLightContent",
    }
  }
}

/// Values written into `Info.plist`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoPlistData {
  pub bundle_version: String,
  pub build_number: String,
  /// `None` keeps Xcode's `${PRODUCT_NAME}`.
  pub display_name: Option<String>,
  pub orientations: Vec<InterfaceOrientation>,
  pub iphone_launch_storyboard: String,
  pub ipad_launch_storyboard: String,
  pub prerendered_icon: bool,
  pub requires_persistent_wifi: bool,
  pub requires_full_screen: bool,
  pub status_bar_hidden: bool,
  pub status_bar_style: StatusBarStyle,
  pub camera_usage: Option<String>,
  pub location_usage: Option<String>,
  pub microphone_usage: Option<String>,
  pub allow_http: bool,
  pub url_schemes: Vec<String>,
  pub require_metal: bool,
}

impl Default for InfoPlistData {
  fn default() -> Self {
    Self {
      bundle_version: "1.0".to_string(),
      build_number: "0".to_string(),
      display_name: None,
      orientations: vec![InterfaceOrientation::Portrait],
      iphone_launch_storyboard: "LaunchScreen-iPhone".to_string(),
      ipad_launch_storyboard: "LaunchScreen-iPad".to_string(),
      prerendered_icon: false,
      requires_persistent_wifi: false,
      requires_full_screen: false,
      status_bar_hidden: true,
      status_bar_style: StatusBarStyle::Default,
      camera_usage: None,
      location_usage: None,
      microphone_usage: None,
      allow_http: false,
      url_schemes: Vec::new(),
      require_metal: true,
    }
  }
}

fn set_optional(dict: &mut PlistDict, key: &str, value: Option<&str>) {
  match value.filter(|v| !v.is_empty()) {
    Some(v) => dict.set(key, v),
    None => {
      dict.remove(key);
    }
  }
}

/// Apply `data` to the `Info.plist` document in `text` and return the new document.
pub fn update_info_plist(text: &str, data: &InfoPlistData) -> Result<String, PlistError> {
  let mut dict = parse_xml(text)?;

  dict.set("CFBundleShortVersionString", data.bundle_version.as_str());
  dict.set("CFBundleVersion", data.build_number.as_str());
  dict.set(
    "CFBundleDisplayName",
    data.display_name.as_deref().unwrap_or("${PRODUCT_NAME}"),
  );
  dict.set("CFBundleAllowMixedLocalizations", true);

  let orientations: Vec<PlistValue> = data
    .orientations
    .iter()
    .map(|o| PlistValue::from(o.as_plist_str()))
    .collect();
  dict.set("UISupportedInterfaceOrientations", PlistValue::Array(orientations));

  dict.set("UILaunchStoryboardName~iphone", data.iphone_launch_storyboard.as_str());
  dict.set("UILaunchStoryboardName~ipad", data.ipad_launch_storyboard.as_str());
  dict.set("UIPrerenderedIcon", data.prerendered_icon);
  dict.set("UIRequiresPersistentWiFi", data.requires_persistent_wifi);
  dict.set("UIRequiresFullScreen", data.requires_full_screen);
  dict.set("UIStatusBarHidden", data.status_bar_hidden);
  dict.set("UIViewControllerBasedStatusBarAppearance", false);
  dict.set("UIStatusBarStyle", data.status_bar_style.as_plist_str());

  set_optional(&mut dict, "NSCameraUsageDescription", data.camera_usage.as_deref());
  set_optional(&mut dict, "NSLocationWhenInUseUsageDescription", data.location_usage.as_deref());
  set_optional(&mut dict, "NSMicrophoneUsageDescription", data.microphone_usage.as_deref());

  if data.allow_http {
    let mut ats = PlistDict::new();
    ats.set("NSAllowsArbitraryLoads", true);
    dict.set("NSAppTransportSecurity", ats);
  } else {
    dict.remove("NSAppTransportSecurity");
  }

  if data.url_schemes.is_empty() {
    dict.remove("CFBundleURLTypes");
  } else {
    let mut url_type = PlistDict::new();
    url_type.set("CFBundleURLName", "${PRODUCT_BUNDLE_IDENTIFIER}");
    url_type.set(
      "CFBundleURLSchemes",
      PlistValue::Array(data.url_schemes.iter().map(|s| PlistValue::from(s.as_str())).collect()),
    );
    dict.set("CFBundleURLTypes", PlistValue::Array(vec![url_type.into()]));
  }

  let mut capabilities = match dict.remove("UIRequiredDeviceCapabilities") {
    Some(PlistValue::Array(items)) => items,
    Some(_) => return Err(PlistError::Invalid("UIRequiredDeviceCapabilities is not an array".into())),
    None => Vec::new(),
  };
  let metal = PlistValue::from("metal");
  if data.require_metal {
    if !capabilities.contains(&metal) {
      capabilities.push(metal);
    }
  } else {
    capabilities.retain(|c| c != &metal);
  }
  dict.set("UIRequiredDeviceCapabilities", PlistValue::Array(capabilities));

  Ok(to_xml(&dict))
}

#[cfg(test)]
mod tests {
  use super::*;

  const TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>CFBundleExecutable</key>
	<string>${EXECUTABLE_NAME}</string>
	<key>CFBundleVersion</key>
	<string>0</string>
	<key>UIRequiredDeviceCapabilities</key>
	<array>
		<string>arm64</string>
	</array>
	<key>NSCameraUsageDescription</key>
	<string>old</string>
</dict>
</plist>
"#;

  #[test]
  fn updates_versions_and_orientations() {
    let data = InfoPlistData {
      bundle_version: "2.1".into(),
      build_number: "42".into(),
      orientations: vec![InterfaceOrientation::LandscapeLeft, InterfaceOrientation::LandscapeRight],
      ..Default::default()
    };

    let out = parse_xml(&update_info_plist(TEMPLATE, &data).unwrap()).unwrap();

    assert_eq!(out.get("CFBundleShortVersionString"), Some(&PlistValue::from("2.1")));
    assert_eq!(out.get("CFBundleVersion"), Some(&PlistValue::from("42")));
    assert_eq!(
      out.get("UISupportedInterfaceOrientations"),
      Some(&PlistValue::Array(vec![
        "UIInterfaceOrientationLandscapeLeft".into(),
        "UIInterfaceOrientationLandscapeRight".into(),
      ]))
    );
    assert_eq!(out.get("CFBundleDisplayName"), Some(&PlistValue::from("${PRODUCT_NAME}")));
  }

  #[test]
  fn keeps_unrelated_keys_first() {
    let out = parse_xml(&update_info_plist(TEMPLATE, &InfoPlistData::default()).unwrap()).unwrap();
    assert_eq!(out.keys().next(), Some("CFBundleExecutable"));
  }

  #[test]
  fn metal_capability_is_added_once() {
    let data = InfoPlistData::default();
    let once = update_info_plist(TEMPLATE, &data).unwrap();
    let twice = update_info_plist(&once, &data).unwrap();

    assert_eq!(once, twice);
    let out = parse_xml(&twice).unwrap();
    assert_eq!(
      out.get("UIRequiredDeviceCapabilities"),
      Some(&PlistValue::Array(vec!["arm64".into(), "metal".into()]))
    );
  }

  #[test]
  fn empty_usage_description_is_removed() {
    let out = parse_xml(&update_info_plist(TEMPLATE, &InfoPlistData::default()).unwrap()).unwrap();
    assert!(out.get("NSCameraUsageDescription").is_none());
  }

  #[test]
  fn url_schemes_and_http() {
    let data = InfoPlistData {
      url_schemes: vec!["mygame".into()],
      allow_http: true,
      ..Default::default()
    };
    let text = update_info_plist(TEMPLATE, &data).unwrap();
    assert!(text.contains("<string>mygame</string>"));
    assert!(text.contains("<key>NSAllowsArbitraryLoads</key>\n\t\t<true/>"));
  }

  #[test]
  fn invalid_template_is_an_error() {
    assert!(update_info_plist("not xml", &InfoPlistData::default()).is_err());
  }
}
