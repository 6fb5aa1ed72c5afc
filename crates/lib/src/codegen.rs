//! Generated native sources.
//!
//! Two small text generators used while assembling the Xcode project: the
//! class registration unit that calls into every engine module linked into
//! the player, and in-place rewriting of `#define` values in headers.

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegenError {
  #[error("invalid pattern: {0}")]
  Pattern(#[from] regex::Error),
}

/// Engine module names found in assembly file names, in sorted order.
///
/// `UnityEngine.PhysicsModule.dll` yields `Physics`. Other files are ignored.
pub fn module_names<I, S>(file_names: I) -> Result<Vec<String>, CodegenError>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let pattern = Regex::new(r"^UnityEngine\.(\S+)Module\.dll$")?;
  let mut names: Vec<String> = file_names
    .into_iter()
    .filter_map(|f| pattern.captures(f.as_ref()).map(|c| c[1].to_string()))
    .collect();
  names.sort();
  names.dedup();
  Ok(names)
}

/// Source of `UnityClassRegistration.cpp` registering the given modules.
pub fn class_registration_source(modules: &[String]) -> String {
  let registrations: Vec<String> = modules
    .iter()
    .map(|name| format!("    void RegisterModule_{name}(); RegisterModule_{name}();"))
    .collect();

  format!(
    r#"extern "C" void RegisterStaticallyLinkedModulesGranular()
{{
{}
}}

template <typename T> void RegisterUnityClass(const char*);
template <typename T> void RegisterStrippedType(int, const char*, const char*);

void InvokeRegisterStaticallyLinkedModuleClasses()
{{
    void RegisterStaticallyLinkedModuleClasses();
    RegisterStaticallyLinkedModuleClasses();
}}

void RegisterAllClasses()
{{
    void RegisterAllClassesGranular();
    RegisterAllClassesGranular();
}}
"#,
    registrations.join("\n")
  )
}

/// Rewrite `#define NAME ...` lines to `#define NAME 1` or `0`.
///
/// Only single-line definitions change; a definition continued with a
/// trailing backslash is left as it is. Names must be valid identifiers.
pub fn replace_defines(text: &str, values: &[(&str, bool)]) -> Result<String, CodegenError> {
  let mut lines: Vec<String> = text.lines().map(str::to_string).collect();

  for (name, enabled) in values {
    let name = regex::escape(name);
    let declared = Regex::new(&format!(r"^.*#\s*define\s+{}", name))?;
    let single_line = Regex::new(&format!(r"^.*#\s*define\s+{}(|\s|\s.*[^\\])$", name))?;
    let replacement = format!("#define {} {}", name, if *enabled { 1 } else { 0 });

    for line in lines.iter_mut() {
      if declared.is_match(line) && single_line.is_match(line) {
        *line = replacement.clone();
      }
    }
  }

  let mut out = lines.join("\n");
  if text.ends_with('\n') {
    out.push('\n');
  }
  Ok(out)
}
