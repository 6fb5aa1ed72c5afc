//! Relinking of static libraries into loadable dynamic libraries.
//!
//! The burst compiler emits a static archive. iOS loads it as a bundle
//! embedded in the app, so the archive is relinked with `-all_load` into a
//! dynamic library, deployed next to the other native libraries, and copied
//! once more under a `.dylib` name for tools that expect one.
//!
//! Relinking only declares actions. The static library may not exist yet;
//! a missing input is reported by the executor.

mod toolchain;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::action::{ActionGraph, ActionSpec, ExecOpts, GraphError};
use crate::consts::SOURCE_DATE_EPOCH;
use crate::platform::{Architecture, Platform, SdkKind};

pub use toolchain::{
  ConfiguredProbe, DEFAULT_MIN_OS_VERSION, DYNAMIC_LIBRARY_EXTENSION, Toolchain, ToolchainProbe, ToolchainRegistry,
  XcrunProbe,
};

#[derive(Debug, Error)]
pub enum RelinkError {
  #[error("no toolchain for {platform}: {message}")]
  Probe { platform: Platform, message: String },

  #[error("invalid library name '{0}'")]
  InvalidName(String),

  #[error(transparent)]
  Graph(#[from] GraphError),
}

/// Paths produced by one relink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelinkOutput {
  /// Linker output under the artifacts directory.
  pub linked: PathBuf,
  /// Copy in the deploy directory, with the toolchain's extension.
  pub deployed: PathBuf,
  /// Copy in the deploy directory with a `.dylib` extension.
  pub renamed: PathBuf,
}

/// Declares relink actions for one SDK.
pub struct Relinker<'r> {
  toolchains: &'r mut ToolchainRegistry,
  sdk: SdkKind,
  artifacts_dir: PathBuf,
  deploy_dir: PathBuf,
}

impl<'r> Relinker<'r> {
  pub fn new(
    toolchains: &'r mut ToolchainRegistry,
    sdk: SdkKind,
    artifacts_dir: impl Into<PathBuf>,
    deploy_dir: impl Into<PathBuf>,
  ) -> Self {
    Self {
      toolchains,
      sdk,
      artifacts_dir: artifacts_dir.into(),
      deploy_dir: deploy_dir.into(),
    }
  }

  /// Declare the link, deploy and rename actions for `static_library`.
  pub fn relink(
    &mut self,
    graph: &mut dyn ActionGraph,
    static_library: &Path,
    arch: Architecture,
    output_name: &str,
  ) -> Result<RelinkOutput, RelinkError> {
    if output_name.is_empty() || output_name.contains(['/', '\\']) {
      return Err(RelinkError::InvalidName(output_name.to_string()));
    }

    let toolchain = self.toolchains.get(arch, self.sdk)?;
    let file_name = format!("{}.{}", output_name, toolchain.dynamic_library_extension);
    let linked = self
      .artifacts_dir
      .join("relink")
      .join(arch.as_str())
      .join(&file_name);

    graph.declare_action(link_action(toolchain, static_library, &linked))?;

    let deployed = graph.declare_copy(&self.deploy_dir.join(&file_name), &linked)?;
    let renamed = graph.declare_copy(&self.deploy_dir.join(format!("{}.dylib", output_name)), &deployed)?;

    debug!(
      library = %static_library.display(),
      %arch,
      output = %linked.display(),
      "declared relink"
    );

    Ok(RelinkOutput {
      linked,
      deployed,
      renamed,
    })
  }
}

fn link_action(toolchain: &Toolchain, static_library: &Path, output: &Path) -> ActionSpec {
  let env = BTreeMap::from([
    ("ZERO_AR_DATE".to_string(), "1".to_string()),
    ("SOURCE_DATE_EPOCH".to_string(), SOURCE_DATE_EPOCH.to_string()),
  ]);

  let opts = ExecOpts::new(toolchain.linker.to_string_lossy())
    .with_args([
      "-dynamiclib".to_string(),
      "-target".to_string(),
      toolchain.target_triple(),
      "-isysroot".to_string(),
      toolchain.sdk_path.to_string_lossy().into_owned(),
      "-Wl,-all_load".to_string(),
      static_library.to_string_lossy().into_owned(),
      "-o".to_string(),
      output.to_string_lossy().into_owned(),
    ])
    .with_env(env);

  ActionSpec::exec(
    format!("Relink {}", output.display()),
    [output.to_path_buf()],
    [static_library.to_path_buf()],
    opts,
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::action::{ActionCommand, RecordingGraph};
  use crate::util::hash::Hashable;
  use std::cell::Cell;
  use std::rc::Rc;
  use toolchain::tests::CountingProbe;

  fn registry() -> ToolchainRegistry {
    ToolchainRegistry::new(Box::new(CountingProbe {
      calls: Rc::new(Cell::new(0)),
    }))
  }

  fn relink_into(graph: &mut RecordingGraph) -> RelinkOutput {
    let mut toolchains = registry();
    let mut relinker = Relinker::new(&mut toolchains, SdkKind::IphoneOs, "/build/artifacts", "/build/Libraries");
    relinker
      .relink(
        graph,
        Path::new("/build/artifacts/bcl/wholeprogram/wholeprogram.a"),
        Architecture::Arm64,
        "lib_burst_generated",
      )
      .unwrap()
  }

  #[test]
  fn declares_link_deploy_and_rename() {
    let mut graph = RecordingGraph::new();
    let output = relink_into(&mut graph);

    assert_eq!(
      output.linked,
      PathBuf::from("/build/artifacts/relink/arm64/lib_burst_generated.bundle")
    );
    assert_eq!(output.deployed, PathBuf::from("/build/Libraries/lib_burst_generated.bundle"));
    assert_eq!(output.renamed, PathBuf::from("/build/Libraries/lib_burst_generated.dylib"));
    assert_eq!(graph.len(), 3);

    let link = graph.producer_of(&output.linked).unwrap();
    assert_eq!(
      link.inputs.iter().collect::<Vec<_>>(),
      vec![Path::new("/build/artifacts/bcl/wholeprogram/wholeprogram.a")]
    );
    let ActionCommand::Exec(opts) = &link.command else {
      panic!("link must be an exec action");
    };
    let args = opts.args.clone().unwrap();
    assert!(args.contains(&"-dynamiclib".to_string()));
    assert!(args.contains(&"-Wl,-all_load".to_string()));
    assert!(args.contains(&"arm64-apple-ios12.0".to_string()));
    let env = opts.env.clone().unwrap();
    assert_eq!(env.get("ZERO_AR_DATE").map(String::as_str), Some("1"));
    assert_eq!(env.get("SOURCE_DATE_EPOCH").map(String::as_str), Some(SOURCE_DATE_EPOCH));

    let rename = graph.producer_of(&output.renamed).unwrap();
    assert!(rename.inputs.contains(&output.deployed));
  }

  #[test]
  fn relink_is_deterministic() {
    let mut first = RecordingGraph::new();
    let mut second = RecordingGraph::new();
    relink_into(&mut first);
    relink_into(&mut second);

    assert_eq!(first.actions(), second.actions());
    let hashes = |g: &RecordingGraph| -> Vec<String> { g.actions().iter().map(|a| a.compute_hash().unwrap().0).collect() };
    assert_eq!(hashes(&first), hashes(&second));
  }

  #[test]
  fn static_library_is_not_an_output() {
    let mut graph = RecordingGraph::new();
    relink_into(&mut graph);
    assert!(graph
      .producer_of(Path::new("/build/artifacts/bcl/wholeprogram/wholeprogram.a"))
      .is_none());
  }

  #[test]
  fn rejects_path_like_names() {
    let mut toolchains = registry();
    let mut relinker = Relinker::new(&mut toolchains, SdkKind::IphoneOs, "/a", "/d");
    let mut graph = RecordingGraph::new();
    let err = relinker
      .relink(&mut graph, Path::new("/lib.a"), Architecture::Arm64, "../evil")
      .unwrap_err();
    assert!(matches!(err, RelinkError::InvalidName(_)));
    assert!(graph.is_empty());
  }
}
