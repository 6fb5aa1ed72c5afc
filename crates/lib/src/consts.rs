//! Crate-wide constants.

/// Application name, used for state directories and environment variable prefixes.
pub const APP_NAME: &str = "iospack";

/// Length of truncated object hashes used to identify declared actions.
pub const OBJ_HASH_PREFIX_LEN: usize = 20;

/// Directory (relative to the build directory) holding executor state.
pub const STATE_DIR: &str = ".iospack";

/// File name of the persisted action signature cache.
pub const ACTION_STATE_FILENAME: &str = "actions.json";

/// Name of the Xcode project shipped in the player trampoline.
pub const XCODE_PROJECT_NAME: &str = "Unity-iPhone";

/// Name of the app target inside the trampoline project.
pub const MAIN_TARGET_NAME: &str = "Unity-iPhone";

/// Name of the framework target inside the trampoline project.
pub const FRAMEWORK_TARGET_NAME: &str = "UnityFramework";

/// Derived data directory passed to `xcodebuild`.
pub const DERIVED_DATA_DIR: &str = "xcode_DerivedData";

/// Device provider identifiers queried by the run command.
pub const DEVICE_PROVIDERS: &[&str] = &["appledevice"];

/// Fixed value for `SOURCE_DATE_EPOCH` (January 1, 1980 00:00:00 UTC).
pub const SOURCE_DATE_EPOCH: &str = "315532800";
