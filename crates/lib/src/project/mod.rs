//! Xcode project model.
//!
//! A reader and writer for `project.pbxproj`, plus the mutations the
//! pipeline performs on the trampoline project: adding and removing files,
//! editing build phases and build settings, and managing system frameworks.
//!
//! # Object Graph
//!
//! The file is a single dictionary whose `objects` entry maps guids to
//! objects. Each object names its class in `isa`:
//!
//! ```text
//! PBXProject ─┬─ mainGroup ──────────── PBXGroup ── children ── PBXGroup | PBXFileReference
//!             ├─ buildConfigurationList ─ XCConfigurationList ── XCBuildConfiguration
//!             └─ targets ── PBXNativeTarget ─┬─ buildConfigurationList
//!                                            └─ buildPhases ── files ── PBXBuildFile ── fileRef
//! ```
//!
//! # Determinism
//!
//! Serialization sorts objects by isa and guid, and dictionary keys
//! alphabetically with `isa` first. New guids come from a [`GuidGenerator`]
//! seeded with a hash of the parsed text, so replaying the same mutations on
//! the same input produces byte-identical output.

mod guid;
mod parse;
mod value;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::consts::{FRAMEWORK_TARGET_NAME, MAIN_TARGET_NAME};
use crate::util::hash::hash_bytes;

pub use guid::{Guid, GuidGenerator};
pub use parse::ParseError;
pub use value::{Dict, Value};

/// Errors raised while loading or editing a project.
#[derive(Debug, Error)]
pub enum ProjectError {
  #[error("failed to read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  ParseFile {
    path: PathBuf,
    #[source]
    source: ParseError,
  },

  #[error(transparent)]
  Parse(#[from] ParseError),

  /// The text parsed but does not have the shape of a project.
  #[error("malformed project: {0}")]
  Malformed(String),

  #[error("unknown target: {0}")]
  UnknownTarget(Guid),

  #[error("no target named '{0}'")]
  TargetNotFound(String),

  #[error("unknown file reference: {0}")]
  UnknownFile(Guid),
}

/// What a target builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
  App,
  Framework,
  /// The project object itself, which carries project-level build settings.
  Project,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
  pub guid: Guid,
  pub name: String,
  pub kind: TargetKind,
}

/// A file known to the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
  pub guid: Guid,
  /// Path on disk, relative to the project's source root unless absolute.
  pub path: String,
  /// Path through the group hierarchy, as shown in the project navigator.
  pub group_path: String,
  /// Effective source tree after resolving `<group>` against parents.
  pub source_tree: String,
}

/// Build phase categories the pipeline edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhaseKind {
  Sources,
  Frameworks,
  /// An unnamed copy-files phase into the frameworks folder.
  CopyFiles,
  /// The `Embed Frameworks` copy-files phase.
  EmbedFrameworks,
}

impl BuildPhaseKind {
  fn isa(self) -> &'static str {
    match self {
      BuildPhaseKind::Sources => "PBXSourcesBuildPhase",
      BuildPhaseKind::Frameworks => "PBXFrameworksBuildPhase",
      BuildPhaseKind::CopyFiles | BuildPhaseKind::EmbedFrameworks => "PBXCopyFilesBuildPhase",
    }
  }
}

/// A build phase and the file references it contains, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPhase {
  pub guid: Guid,
  pub kind: BuildPhaseKind,
  pub target: Guid,
  pub members: Vec<Guid>,
}

/// `dstSubfolderSpec` of the frameworks destination.
pub const SUBFOLDER_FRAMEWORKS: &str = "10";
/// `dstSubfolderSpec` of the executables destination.
pub const SUBFOLDER_EXECUTABLES: &str = "6";

const EMBED_FRAMEWORKS_PHASE: &str = "Embed Frameworks";
const CODE_SIGN_ON_COPY: &str = "CodeSignOnCopy";

/// An in-memory `project.pbxproj`.
#[derive(Debug, Clone)]
pub struct PbxProject {
  /// Top-level entries other than `objects`.
  root: Dict,
  objects: BTreeMap<String, Dict>,
  guids: GuidGenerator,
}

impl PartialEq for PbxProject {
  fn eq(&self, other: &Self) -> bool {
    self.root == other.root && self.objects == other.objects
  }
}

impl PbxProject {
  /// Read and parse a project file.
  pub fn load(path: &Path) -> Result<Self, ProjectError> {
    let text = std::fs::read_to_string(path).map_err(|source| ProjectError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    Self::parse(&text).map_err(|e| match e {
      ProjectError::Parse(source) => ProjectError::ParseFile {
        path: path.to_path_buf(),
        source,
      },
      other => other,
    })
  }

  /// Parse project text.
  pub fn parse(text: &str) -> Result<Self, ProjectError> {
    let mut root = parse::parse_document(text)?;

    let objects = match root.remove("objects") {
      Some(Value::Dict(objects)) => objects,
      Some(_) => return Err(ProjectError::Malformed("'objects' is not a dictionary".into())),
      None => return Err(ProjectError::Malformed("missing 'objects'".into())),
    };

    let mut parsed = BTreeMap::new();
    for (guid, object) in objects {
      match object {
        Value::Dict(dict) => {
          parsed.insert(guid, dict);
        }
        _ => return Err(ProjectError::Malformed(format!("object {} is not a dictionary", guid))),
      }
    }

    let root_object = root
      .get("rootObject")
      .and_then(Value::as_str)
      .ok_or_else(|| ProjectError::Malformed("missing 'rootObject'".into()))?;
    if parsed.get(root_object).and_then(|o| o.get("isa")).and_then(Value::as_str) != Some("PBXProject") {
      return Err(ProjectError::Malformed(format!(
        "rootObject {} is not a PBXProject",
        root_object
      )));
    }

    Ok(Self {
      root,
      objects: parsed,
      guids: GuidGenerator::new(hash_bytes(text.as_bytes()).0),
    })
  }

  /// Render the project as text.
  pub fn serialize(&self) -> String {
    value::serialize_project(&self.root, &self.objects)
  }

  // --- object helpers ---------------------------------------------------

  fn object(&self, guid: &str) -> Option<&Dict> {
    self.objects.get(guid)
  }

  fn isa(&self, guid: &str) -> Option<&str> {
    self.object(guid)?.get("isa")?.as_str()
  }

  fn field(&self, guid: &str, key: &str) -> Option<&str> {
    self.object(guid)?.get(key)?.as_str()
  }

  fn guid_list(&self, guid: &str, key: &str) -> Vec<String> {
    self
      .object(guid)
      .and_then(|o| o.get(key))
      .and_then(Value::as_array)
      .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
      .unwrap_or_default()
  }

  fn push_guid(&mut self, owner: &str, key: &str, guid: &Guid) {
    if let Some(object) = self.objects.get_mut(owner) {
      let list = object.entry(key.to_string()).or_insert_with(|| Value::Array(Vec::new()));
      if let Some(items) = list.as_array_mut() {
        items.push(Value::String(guid.0.clone()));
      }
    }
  }

  fn new_object(&mut self, isa: &str, identity: &str, mut fields: Dict) -> Guid {
    let guid = loop {
      let candidate = self.guids.next(&format!("{} {}", isa, identity));
      if !self.objects.contains_key(&candidate.0) {
        break candidate;
      }
    };
    fields.insert("isa".into(), isa.into());
    self.objects.insert(guid.0.clone(), fields);
    guid
  }

  // --- lookups ----------------------------------------------------------

  /// Guid of the project object.
  pub fn project_guid(&self) -> Guid {
    Guid(
      self
        .root
        .get("rootObject")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string(),
    )
  }

  /// Native targets in declaration order.
  pub fn targets(&self) -> Vec<Target> {
    self
      .guid_list(self.project_guid().as_str(), "targets")
      .into_iter()
      .map(|guid| {
        let name = self.field(&guid, "name").unwrap_or_default().to_string();
        let kind = match self.field(&guid, "productType") {
          Some(t) if t.ends_with(".framework") => TargetKind::Framework,
          _ => TargetKind::App,
        };
        Target {
          guid: Guid(guid),
          name,
          kind,
        }
      })
      .collect()
  }

  /// The project object as a target, for project-level build settings.
  pub fn project_target(&self) -> Target {
    Target {
      guid: self.project_guid(),
      name: "Project".to_string(),
      kind: TargetKind::Project,
    }
  }

  pub fn target_by_name(&self, name: &str) -> Result<Guid, ProjectError> {
    self
      .targets()
      .into_iter()
      .find(|t| t.name == name)
      .map(|t| t.guid)
      .ok_or_else(|| ProjectError::TargetNotFound(name.to_string()))
  }

  /// The app target (`Unity-iPhone`).
  pub fn main_target_guid(&self) -> Result<Guid, ProjectError> {
    self.target_by_name(MAIN_TARGET_NAME)
  }

  /// The framework target (`UnityFramework`).
  pub fn framework_target_guid(&self) -> Result<Guid, ProjectError> {
    self.target_by_name(FRAMEWORK_TARGET_NAME)
  }

  fn main_group(&self) -> Result<String, ProjectError> {
    self
      .field(self.project_guid().as_str(), "mainGroup")
      .map(str::to_string)
      .ok_or_else(|| ProjectError::Malformed("project has no mainGroup".into()))
  }

  fn require_target(&self, target: &Guid) -> Result<(), ProjectError> {
    match self.isa(target.as_str()) {
      Some("PBXNativeTarget") | Some("PBXAggregateTarget") | Some("PBXProject") => Ok(()),
      _ => Err(ProjectError::UnknownTarget(target.clone())),
    }
  }

  fn require_native_target(&self, target: &Guid) -> Result<(), ProjectError> {
    match self.isa(target.as_str()) {
      Some("PBXNativeTarget") | Some("PBXAggregateTarget") => Ok(()),
      _ => Err(ProjectError::UnknownTarget(target.clone())),
    }
  }

  fn require_file(&self, file: &Guid) -> Result<(), ProjectError> {
    match self.isa(file.as_str()) {
      Some("PBXFileReference") => Ok(()),
      _ => Err(ProjectError::UnknownFile(file.clone())),
    }
  }

  /// Every file reference, with paths resolved through the group hierarchy.
  ///
  /// Files reachable from the main group come first, in navigator order.
  pub fn files(&self) -> Vec<FileReference> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    if let Ok(main) = self.main_group() {
      self.collect_files(&main, "", "", "SOURCE_ROOT", true, &mut out, &mut seen);
    }
    for (guid, object) in &self.objects {
      if object.get("isa").and_then(Value::as_str) == Some("PBXFileReference") && !seen.contains(guid) {
        let path = self.field(guid, "path").unwrap_or_default().to_string();
        let name = self.field(guid, "name").map(str::to_string).unwrap_or_else(|| path.clone());
        out.push(FileReference {
          guid: Guid(guid.clone()),
          path,
          group_path: name,
          source_tree: self.field(guid, "sourceTree").unwrap_or("<group>").to_string(),
        });
      }
    }
    out
  }

  #[allow(clippy::too_many_arguments)]
  fn collect_files(
    &self,
    guid: &str,
    real_base: &str,
    project_base: &str,
    tree_base: &str,
    is_root: bool,
    out: &mut Vec<FileReference>,
    seen: &mut HashSet<String>,
  ) {
    if !seen.insert(guid.to_string()) {
      return;
    }

    let path = self.field(guid, "path").unwrap_or_default();
    let name = self.field(guid, "name").unwrap_or(path);
    let (real, tree) = match self.field(guid, "sourceTree").unwrap_or("<group>") {
      "<group>" => (join(real_base, path), tree_base.to_string()),
      other => (path.to_string(), other.to_string()),
    };
    let project = if is_root {
      String::new()
    } else {
      join(project_base, name)
    };

    match self.isa(guid) {
      Some("PBXFileReference") => out.push(FileReference {
        guid: Guid(guid.to_string()),
        path: real,
        group_path: project,
        source_tree: tree,
      }),
      Some("PBXGroup") | Some("PBXVariantGroup") => {
        for child in self.guid_list(guid, "children") {
          self.collect_files(&child, &real, &project, &tree, false, out, seen);
        }
      }
      _ => {}
    }
  }

  pub fn file(&self, guid: &Guid) -> Option<FileReference> {
    self.files().into_iter().find(|f| &f.guid == guid)
  }

  /// Find a source-rooted file by its path on disk.
  pub fn find_file_by_real_path(&self, path: &str) -> Option<Guid> {
    self
      .files()
      .into_iter()
      .find(|f| f.path == path && matches!(f.source_tree.as_str(), "SOURCE_ROOT" | "<absolute>"))
      .map(|f| f.guid)
  }

  /// Find a file by its path through the group hierarchy.
  pub fn find_file_by_project_path(&self, group_path: &str) -> Option<Guid> {
    self
      .files()
      .into_iter()
      .find(|f| f.group_path == group_path)
      .map(|f| f.guid)
  }

  /// Build phases of a target, in order, with their file members.
  pub fn build_phases(&self, target: &Guid) -> Result<Vec<BuildPhase>, ProjectError> {
    self.require_native_target(target)?;
    let mut phases = Vec::new();
    for phase in self.guid_list(target.as_str(), "buildPhases") {
      let kind = match self.isa(&phase) {
        Some("PBXSourcesBuildPhase") => BuildPhaseKind::Sources,
        Some("PBXFrameworksBuildPhase") => BuildPhaseKind::Frameworks,
        Some("PBXCopyFilesBuildPhase") if self.field(&phase, "name") == Some(EMBED_FRAMEWORKS_PHASE) => {
          BuildPhaseKind::EmbedFrameworks
        }
        Some("PBXCopyFilesBuildPhase") => BuildPhaseKind::CopyFiles,
        _ => continue,
      };
      let members = self
        .guid_list(&phase, "files")
        .iter()
        .filter_map(|build_file| self.field(build_file, "fileRef"))
        .map(Guid::from)
        .collect();
      phases.push(BuildPhase {
        guid: Guid(phase),
        kind,
        target: target.clone(),
        members,
      });
    }
    Ok(phases)
  }

  // --- files and groups -------------------------------------------------

  /// Add a file reference and the group chain leading to it.
  ///
  /// `path` is the file on disk (relative to the source root, or absolute);
  /// `group_path` is where it appears in the navigator, file name included.
  /// Adding the same path twice creates two references.
  pub fn add_file(&mut self, path: &str, group_path: &str) -> Result<Guid, ProjectError> {
    let components: Vec<&str> = group_path.split('/').filter(|c| !c.is_empty()).collect();
    let (file_name, groups) = match components.split_last() {
      Some((last, rest)) => (*last, rest),
      None => (path, &[][..]),
    };
    let parent = self.ensure_group_chain(groups)?;

    let mut fields = Dict::new();
    fields.insert("lastKnownFileType".into(), file_type(path).into());
    if file_name != path {
      fields.insert("name".into(), file_name.into());
    }
    fields.insert("path".into(), path.into());
    let tree = if Path::new(path).is_absolute() {
      "<absolute>"
    } else {
      "SOURCE_ROOT"
    };
    fields.insert("sourceTree".into(), tree.into());

    let guid = self.new_object("PBXFileReference", path, fields);
    self.push_guid(&parent, "children", &guid);
    debug!(path, group_path, guid = %guid, "added file reference");
    Ok(guid)
  }

  fn ensure_group_chain(&mut self, components: &[&str]) -> Result<String, ProjectError> {
    let mut current = self.main_group()?;
    for component in components {
      let existing = self.guid_list(&current, "children").into_iter().find(|child| {
        self.isa(child) == Some("PBXGroup")
          && self.field(child, "name").or_else(|| self.field(child, "path")) == Some(*component)
      });
      current = match existing {
        Some(group) => group,
        None => {
          let mut fields = Dict::new();
          fields.insert("children".into(), Value::Array(Vec::new()));
          fields.insert("name".into(), (*component).into());
          fields.insert("sourceTree".into(), "<group>".into());
          let group = self.new_object("PBXGroup", component, fields);
          self.push_guid(&current, "children", &group);
          group.0
        }
      };
    }
    Ok(current)
  }

  /// Remove a file reference together with its build files, every build
  /// phase membership and every group entry. Unknown guids are ignored.
  pub fn remove_file(&mut self, file: &Guid) {
    if self.isa(file.as_str()) != Some("PBXFileReference") {
      return;
    }

    let build_files: HashSet<String> = self
      .objects
      .iter()
      .filter(|(_, o)| {
        o.get("isa").and_then(Value::as_str) == Some("PBXBuildFile")
          && o.get("fileRef").and_then(Value::as_str) == Some(file.as_str())
      })
      .map(|(guid, _)| guid.clone())
      .collect();

    for guid in &build_files {
      self.objects.remove(guid);
    }
    self.objects.remove(file.as_str());

    for object in self.objects.values_mut() {
      for key in ["files", "children"] {
        if let Some(items) = object.get_mut(key).and_then(Value::as_array_mut) {
          items.retain(|item| {
            item
              .as_str()
              .is_none_or(|guid| guid != file.as_str() && !build_files.contains(guid))
          });
        }
      }
    }
    debug!(guid = %file, build_files = build_files.len(), "removed file reference");
  }

  // --- build phases -----------------------------------------------------

  fn find_phase(&self, target: &Guid, isa: &str, copy: Option<(&str, &str)>) -> Option<String> {
    self.guid_list(target.as_str(), "buildPhases").into_iter().find(|phase| {
      if self.isa(phase) != Some(isa) {
        return false;
      }
      match copy {
        Some((name, subfolder)) => {
          self.field(phase, "name").unwrap_or_default() == name
            && self.field(phase, "dstSubfolderSpec") == Some(subfolder)
            && self.field(phase, "dstPath").unwrap_or_default().is_empty()
        }
        None => true,
      }
    })
  }

  fn find_or_create_phase(&mut self, target: &Guid, isa: &str, copy: Option<(&str, &str)>) -> String {
    if let Some(phase) = self.find_phase(target, isa, copy) {
      return phase;
    }

    let mut fields = Dict::new();
    fields.insert("buildActionMask".into(), "2147483647".into());
    fields.insert("files".into(), Value::Array(Vec::new()));
    fields.insert("runOnlyForDeploymentPostprocessing".into(), "0".into());
    if let Some((name, subfolder)) = copy {
      fields.insert("dstPath".into(), "".into());
      fields.insert("dstSubfolderSpec".into(), subfolder.into());
      if !name.is_empty() {
        fields.insert("name".into(), name.into());
      }
    }
    let phase = self.new_object(isa, target.as_str(), fields);
    self.push_guid(target.as_str(), "buildPhases", &phase);
    debug!(target = %target, isa, "created build phase");
    phase.0
  }

  fn add_build_file(&mut self, phase: &str, file: &Guid, attributes: &[&str]) -> Guid {
    let mut fields = Dict::new();
    fields.insert("fileRef".into(), file.0.clone().into());
    if !attributes.is_empty() {
      let mut settings = Dict::new();
      settings.insert(
        "ATTRIBUTES".into(),
        Value::Array(attributes.iter().map(|a| Value::from(*a)).collect()),
      );
      fields.insert("settings".into(), Value::Dict(settings));
    }
    let build_file = self.new_object("PBXBuildFile", &format!("{} {}", file, phase), fields);
    self.push_guid(phase, "files", &build_file);
    build_file
  }

  /// Add a file to a build phase of `target`, creating the phase if absent.
  ///
  /// Returns the guid of the new build file.
  pub fn add_file_to_build_phase(
    &mut self,
    target: &Guid,
    kind: BuildPhaseKind,
    file: &Guid,
  ) -> Result<Guid, ProjectError> {
    self.require_native_target(target)?;
    self.require_file(file)?;

    let (copy, attributes): (Option<(&str, &str)>, &[&str]) = match kind {
      BuildPhaseKind::Sources | BuildPhaseKind::Frameworks => (None, &[]),
      BuildPhaseKind::CopyFiles => (Some(("", SUBFOLDER_FRAMEWORKS)), &[]),
      BuildPhaseKind::EmbedFrameworks => (
        Some((EMBED_FRAMEWORKS_PHASE, SUBFOLDER_FRAMEWORKS)),
        &[CODE_SIGN_ON_COPY, "RemoveHeadersOnCopy"],
      ),
    };
    let phase = self.find_or_create_phase(target, kind.isa(), copy);
    Ok(self.add_build_file(&phase, file, attributes))
  }

  /// Add a file to a copy-files phase with the given name and destination
  /// subfolder spec, creating the phase if absent.
  pub fn add_file_to_copy_files(
    &mut self,
    target: &Guid,
    file: &Guid,
    name: Option<&str>,
    subfolder_spec: &str,
  ) -> Result<Guid, ProjectError> {
    self.require_native_target(target)?;
    self.require_file(file)?;
    let phase = self.find_or_create_phase(
      target,
      "PBXCopyFilesBuildPhase",
      Some((name.unwrap_or_default(), subfolder_spec)),
    );
    Ok(self.add_build_file(&phase, file, &[CODE_SIGN_ON_COPY]))
  }

  /// Toggle `CodeSignOnCopy` on the build files of `file` inside the copy
  /// phase called `phase_name`. Returns false when no such entry exists.
  pub fn set_code_sign_on_copy(
    &mut self,
    target: &Guid,
    phase_name: &str,
    file: &Guid,
    enabled: bool,
  ) -> Result<bool, ProjectError> {
    self.require_native_target(target)?;

    let Some(phase) = self
      .guid_list(target.as_str(), "buildPhases")
      .into_iter()
      .find(|p| self.isa(p) == Some("PBXCopyFilesBuildPhase") && self.field(p, "name") == Some(phase_name))
    else {
      return Ok(false);
    };

    let entries: Vec<String> = self
      .guid_list(&phase, "files")
      .into_iter()
      .filter(|bf| self.field(bf, "fileRef") == Some(file.as_str()))
      .collect();

    for entry in &entries {
      let Some(object) = self.objects.get_mut(entry) else {
        continue;
      };
      let settings = object
        .entry("settings".to_string())
        .or_insert_with(|| Value::Dict(Dict::new()));
      let Some(settings) = settings.as_dict_mut() else {
        continue;
      };
      let attributes = settings
        .entry("ATTRIBUTES".to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
      if let Some(items) = attributes.as_array_mut() {
        items.retain(|a| a.as_str() != Some(CODE_SIGN_ON_COPY));
        if enabled {
          items.push(CODE_SIGN_ON_COPY.into());
        }
      }
    }

    Ok(!entries.is_empty())
  }

  // --- frameworks -------------------------------------------------------

  fn system_framework(&self, name: &str) -> Option<String> {
    self
      .objects
      .iter()
      .find(|(_, o)| {
        o.get("isa").and_then(Value::as_str) == Some("PBXFileReference")
          && o.get("sourceTree").and_then(Value::as_str) == Some("SDKROOT")
          && (o.get("name").and_then(Value::as_str) == Some(name)
            || o
              .get("path")
              .and_then(Value::as_str)
              .is_some_and(|p| p.rsplit('/').next() == Some(name)))
      })
      .map(|(guid, _)| guid.clone())
  }

  /// Link a system framework into `target`. `weak` marks it optional.
  pub fn add_framework(&mut self, target: &Guid, name: &str, weak: bool) -> Result<Guid, ProjectError> {
    self.require_native_target(target)?;

    let file = match self.system_framework(name) {
      Some(existing) => Guid(existing),
      None => {
        let group = self.ensure_group_chain(&["Frameworks"])?;
        let mut fields = Dict::new();
        fields.insert("lastKnownFileType".into(), "wrapper.framework".into());
        fields.insert("name".into(), name.into());
        fields.insert("path".into(), format!("System/Library/Frameworks/{}", name).into());
        fields.insert("sourceTree".into(), "SDKROOT".into());
        let guid = self.new_object("PBXFileReference", name, fields);
        self.push_guid(&group, "children", &guid);
        guid
      }
    };

    let phase = self.find_or_create_phase(target, "PBXFrameworksBuildPhase", None);
    let already_linked = self
      .guid_list(&phase, "files")
      .iter()
      .any(|bf| self.field(bf, "fileRef") == Some(file.as_str()));
    if !already_linked {
      let attributes: &[&str] = if weak { &["Weak"] } else { &[] };
      self.add_build_file(&phase, &file, attributes);
    }
    Ok(file)
  }

  /// Unlink a system framework from `target`. The file reference stays.
  pub fn remove_framework(&mut self, target: &Guid, name: &str) -> Result<(), ProjectError> {
    self.require_native_target(target)?;
    let Some(file) = self.system_framework(name) else {
      return Ok(());
    };
    let Some(phase) = self.find_phase(target, "PBXFrameworksBuildPhase", None) else {
      return Ok(());
    };

    let removed: HashSet<String> = self
      .guid_list(&phase, "files")
      .into_iter()
      .filter(|bf| self.field(bf, "fileRef") == Some(file.as_str()))
      .collect();
    for guid in &removed {
      self.objects.remove(guid);
    }
    if let Some(items) = self
      .objects
      .get_mut(&phase)
      .and_then(|p| p.get_mut("files"))
      .and_then(Value::as_array_mut)
    {
      items.retain(|item| item.as_str().is_none_or(|guid| !removed.contains(guid)));
    }
    Ok(())
  }

  // --- build settings ---------------------------------------------------

  fn configurations(&self, target: &Guid) -> Result<Vec<String>, ProjectError> {
    self.require_target(target)?;
    let list = self
      .field(target.as_str(), "buildConfigurationList")
      .ok_or_else(|| ProjectError::Malformed(format!("{} has no buildConfigurationList", target)))?
      .to_string();
    Ok(self.guid_list(&list, "buildConfigurations"))
  }

  fn settings_mut(&mut self, configuration: &str) -> Option<&mut Dict> {
    self
      .objects
      .get_mut(configuration)?
      .entry("buildSettings".to_string())
      .or_insert_with(|| Value::Dict(Dict::new()))
      .as_dict_mut()
  }

  /// Set `key = value` in every build configuration of every target given.
  pub fn set_build_setting(&mut self, targets: &[Guid], key: &str, value: &str) -> Result<(), ProjectError> {
    for target in targets {
      for configuration in self.configurations(target)? {
        if let Some(settings) = self.settings_mut(&configuration) {
          settings.insert(key.to_string(), value.into());
        }
      }
    }
    Ok(())
  }

  /// Edit a space separated setting as a token set: drop every token in
  /// `remove`, then append each token in `add` not already present.
  pub fn update_build_setting(
    &mut self,
    target: &Guid,
    key: &str,
    add: &[&str],
    remove: &[&str],
  ) -> Result<(), ProjectError> {
    for configuration in self.configurations(target)? {
      let Some(settings) = self.settings_mut(&configuration) else {
        continue;
      };

      let (mut tokens, as_array): (Vec<String>, bool) = match settings.get(key) {
        Some(Value::String(s)) => (s.split_whitespace().map(str::to_string).collect(), false),
        Some(Value::Array(items)) => (items.iter().filter_map(Value::as_str).map(str::to_string).collect(), true),
        Some(Value::Dict(_)) => continue,
        None if add.is_empty() => continue,
        None => (Vec::new(), false),
      };

      tokens.retain(|t| !remove.contains(&t.as_str()));
      for token in add {
        if !tokens.iter().any(|t| t == token) {
          tokens.push(token.to_string());
        }
      }

      let value = if as_array {
        Value::Array(tokens.into_iter().map(Value::String).collect())
      } else {
        Value::String(tokens.join(" "))
      };
      settings.insert(key.to_string(), value);
    }
    Ok(())
  }

  /// Read a setting from the target's first build configuration. Array
  /// values are joined with spaces.
  pub fn build_setting(&self, target: &Guid, key: &str) -> Result<Option<String>, ProjectError> {
    let Some(first) = self.configurations(target)?.into_iter().next() else {
      return Ok(None);
    };
    let value = self
      .object(&first)
      .and_then(|c| c.get("buildSettings"))
      .and_then(Value::as_dict)
      .and_then(|s| s.get(key));
    Ok(match value {
      Some(Value::String(s)) => Some(s.clone()),
      Some(Value::Array(items)) => Some(
        items
          .iter()
          .filter_map(Value::as_str)
          .collect::<Vec<_>>()
          .join(" "),
      ),
      _ => None,
    })
  }

  /// Set a `TargetAttributes` entry for every native target.
  pub fn set_target_attribute(&mut self, key: &str, value: &str) {
    let targets: Vec<Guid> = self.targets().into_iter().map(|t| t.guid).collect();
    let project = self.project_guid();
    let Some(object) = self.objects.get_mut(project.as_str()) else {
      return;
    };
    let attributes = object
      .entry("attributes".to_string())
      .or_insert_with(|| Value::Dict(Dict::new()));
    let Some(target_attributes) = attributes.as_dict_mut().map(|a| {
      a.entry("TargetAttributes".to_string())
        .or_insert_with(|| Value::Dict(Dict::new()))
    }) else {
      return;
    };
    let Some(target_attributes) = target_attributes.as_dict_mut() else {
      return;
    };
    for target in targets {
      if let Some(entry) = target_attributes
        .entry(target.0)
        .or_insert_with(|| Value::Dict(Dict::new()))
        .as_dict_mut()
      {
        entry.insert(key.to_string(), value.into());
      }
    }
  }
}

fn join(base: &str, rest: &str) -> String {
  match (base.is_empty(), rest.is_empty()) {
    (true, _) => rest.to_string(),
    (_, true) => base.to_string(),
    _ => format!("{}/{}", base, rest),
  }
}

/// `lastKnownFileType` for a path, by extension.
fn file_type(path: &str) -> &'static str {
  let ext = Path::new(path).extension().and_then(|e| e.to_str()).unwrap_or_default();
  match ext {
    "c" => "sourcecode.c.c",
    "cpp" | "cc" => "sourcecode.cpp.cpp",
    "h" => "sourcecode.c.h",
    "hpp" => "sourcecode.cpp.h",
    "m" => "sourcecode.c.objc",
    "mm" => "sourcecode.cpp.objcpp",
    "swift" => "sourcecode.swift",
    "a" => "archive.ar",
    "dylib" => "compiled.mach-o.dylib",
    "framework" => "wrapper.framework",
    "bundle" => "wrapper.plug-in",
    "plist" => "text.plist.xml",
    "storyboard" => "file.storyboard",
    "xcassets" => "folder.assetcatalog",
    "json" => "text.json",
    _ => "file",
  }
}
