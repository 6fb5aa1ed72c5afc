//! Exec action implementation.
//!
//! External tools (the native toolchain, `xcodebuild`, helper binaries) run
//! directly, without a shell, so arguments holding spaces or quotes reach
//! the program unchanged.

use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info};

use crate::action::ExecOpts;
use crate::consts::SOURCE_DATE_EPOCH;
use crate::execute::types::ExecuteError;

/// Execute an exec action.
///
/// The child inherits the caller's environment with these adjustments:
/// - `LANG`/`LC_ALL` are pinned to `C` so tool output does not vary by locale
/// - `SOURCE_DATE_EPOCH` is set for reproducible timestamps
/// - user-specified variables are merged last and win
///
/// # Arguments
///
/// * `opts` - Program, arguments, environment and working directory
/// * `working_dir` - Working directory used when `opts.cwd` is unset
///
/// # Returns
///
/// The stdout of the command on success (trimmed).
pub async fn execute_cmd(opts: &ExecOpts, working_dir: &Path) -> Result<String, ExecuteError> {
  let shown = opts.display();
  info!(cmd = %shown, "executing command");

  let cwd = opts.cwd.as_deref().map(Path::new).unwrap_or(working_dir);

  let mut command = Command::new(&opts.bin);
  command
    .args(opts.args.iter().flatten())
    .current_dir(cwd)
    .env("LANG", "C")
    .env("LC_ALL", "C")
    // 315532800 = January 1, 1980 00:00:00 UTC (ZIP epoch)
    .env("SOURCE_DATE_EPOCH", SOURCE_DATE_EPOCH);

  if let Some(user_env) = &opts.env {
    for (key, value) in user_env {
      command.env(key, value);
    }
  }

  debug!(bin = %opts.bin, working_dir = ?cwd, "spawning process");

  let output = command.output().await?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }
    if !stdout.is_empty() {
      debug!(stdout = %stdout, "command stdout");
    }

    return Err(ExecuteError::CmdFailed {
      cmd: shown,
      code: output.status.code(),
    });
  }

  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

  if !stdout.is_empty() {
    debug!(stdout = %stdout, "command output");
  }

  Ok(stdout)
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use super::*;
  use crate::util::testutil::{echo_msg, shell_cmd};
  use tempfile::TempDir;

  #[cfg(unix)]
  fn echo_env(var: &str) -> String {
    format!("echo ${}", var)
  }

  #[cfg(windows)]
  fn echo_env(var: &str) -> String {
    format!("echo %{}%", var)
  }

  fn script(body: &str) -> ExecOpts {
    let (bin, args) = shell_cmd(body);
    ExecOpts::new(bin).with_args(args)
  }

  #[tokio::test]
  async fn execute_simple_command() {
    let temp_dir = TempDir::new().unwrap();
    let (bin, args) = echo_msg("hello");

    let result = execute_cmd(&ExecOpts::new(bin).with_args(args), temp_dir.path())
      .await
      .unwrap();

    assert_eq!(result, "hello");
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn arguments_are_not_word_split() {
    let temp_dir = TempDir::new().unwrap();
    let opts = ExecOpts::new("/bin/echo").with_args(["Unity iPhone"]);

    let result = execute_cmd(&opts, temp_dir.path()).await.unwrap();

    assert_eq!(result, "Unity iPhone");
  }

  #[tokio::test]
  async fn execute_command_with_env() {
    let temp_dir = TempDir::new().unwrap();
    let mut env = BTreeMap::new();
    env.insert("MY_VAR".to_string(), "my_value".to_string());

    let result = execute_cmd(&script(&echo_env("MY_VAR")).with_env(env), temp_dir.path())
      .await
      .unwrap();

    assert_eq!(result, "my_value");
  }

  #[tokio::test]
  async fn execute_command_has_source_date_epoch() {
    let temp_dir = TempDir::new().unwrap();

    let result = execute_cmd(&script(&echo_env("SOURCE_DATE_EPOCH")), temp_dir.path())
      .await
      .unwrap();

    assert_eq!(result, "315532800");
  }

  #[tokio::test]
  async fn execute_command_failure() {
    let temp_dir = TempDir::new().unwrap();

    let result = execute_cmd(&script("exit 1"), temp_dir.path()).await;

    assert!(matches!(result, Err(ExecuteError::CmdFailed { code: Some(1), .. })));
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn execute_command_with_cwd() {
    let temp_dir = TempDir::new().unwrap();
    let sub_dir = temp_dir.path().join("subdir");
    tokio::fs::create_dir(&sub_dir).await.unwrap();

    let opts = script("/usr/bin/touch cwd_marker").with_cwd(sub_dir.to_string_lossy());
    execute_cmd(&opts, temp_dir.path()).await.unwrap();

    assert!(sub_dir.join("cwd_marker").exists());
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn default_cwd_is_working_dir() {
    let temp_dir = TempDir::new().unwrap();

    execute_cmd(&script("/usr/bin/touch cwd_marker"), temp_dir.path())
      .await
      .unwrap();

    assert!(temp_dir.path().join("cwd_marker").exists());
  }

  #[tokio::test]
  async fn missing_binary_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let opts = ExecOpts::new("definitely-not-a-real-tool-iospack");

    let result = execute_cmd(&opts, temp_dir.path()).await;

    assert!(matches!(result, Err(ExecuteError::Io(_))));
  }
}
