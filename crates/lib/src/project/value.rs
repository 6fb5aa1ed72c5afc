//! Property-list values and the text serializer.
//!
//! `project.pbxproj` uses the OpenStep ASCII plist syntax: dictionaries in
//! braces, arrays in parentheses, and strings that are quoted only when they
//! contain characters outside a small safe set.

use std::collections::BTreeMap;
use std::fmt::Write;

/// A dictionary. Keys serialize in sorted order, except `isa` which always
/// comes first.
pub type Dict = BTreeMap<String, Value>;

/// A single plist value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
  String(String),
  Array(Vec<Value>),
  Dict(Dict),
}

impl Value {
  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_array(&self) -> Option<&[Value]> {
    match self {
      Value::Array(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
    match self {
      Value::Array(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_dict(&self) -> Option<&Dict> {
    match self {
      Value::Dict(dict) => Some(dict),
      _ => None,
    }
  }

  pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
    match self {
      Value::Dict(dict) => Some(dict),
      _ => None,
    }
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::String(s.to_string())
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Value::String(s)
  }
}

/// Objects written on one line, the way Xcode writes them.
const INLINE_ISAS: &[&str] = &["PBXBuildFile", "PBXFileReference"];

/// Characters allowed in an unquoted string.
fn is_unquoted_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | ':' | '.' | '-')
}

/// `//` and `/*` would read back as comments.
pub(crate) fn needs_quotes(s: &str) -> bool {
  s.is_empty() || !s.chars().all(is_unquoted_char) || s.contains("//") || s.contains("/*")
}

fn write_string(out: &mut String, s: &str) {
  if !needs_quotes(s) {
    out.push_str(s);
    return;
  }
  out.push('"');
  for c in s.chars() {
    match c {
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\t' => out.push_str("\\t"),
      '\r' => out.push_str("\\r"),
      c => out.push(c),
    }
  }
  out.push('"');
}

/// Keys of `dict` in serialization order.
fn ordered_keys(dict: &Dict) -> impl Iterator<Item = &String> {
  let isa = dict.get_key_value("isa").map(|(k, _)| k);
  isa.into_iter().chain(dict.keys().filter(|k| k.as_str() != "isa"))
}

fn indent(out: &mut String, depth: usize) {
  for _ in 0..depth {
    out.push('\t');
  }
}

fn write_inline(out: &mut String, value: &Value) {
  match value {
    Value::String(s) => write_string(out, s),
    Value::Array(items) => {
      out.push('(');
      for item in items {
        write_inline(out, item);
        out.push_str(", ");
      }
      out.push(')');
    }
    Value::Dict(dict) => {
      out.push('{');
      for key in ordered_keys(dict) {
        write_string(out, key);
        out.push_str(" = ");
        write_inline(out, &dict[key]);
        out.push_str("; ");
      }
      out.push('}');
    }
  }
}

fn write_block(out: &mut String, value: &Value, depth: usize) {
  match value {
    Value::String(s) => write_string(out, s),
    Value::Array(items) => {
      out.push_str("(\n");
      for item in items {
        indent(out, depth + 1);
        write_block(out, item, depth + 1);
        out.push_str(",\n");
      }
      indent(out, depth);
      out.push(')');
    }
    Value::Dict(dict) => {
      out.push_str("{\n");
      for key in ordered_keys(dict) {
        indent(out, depth + 1);
        write_string(out, key);
        out.push_str(" = ");
        write_block(out, &dict[key], depth + 1);
        out.push_str(";\n");
      }
      indent(out, depth);
      out.push('}');
    }
  }
}

/// Serialize a project: the top-level dictionary with `objects` grouped into
/// per-isa sections, sorted by isa and then by guid.
pub(crate) fn serialize_project(root: &Dict, objects: &BTreeMap<String, Dict>) -> String {
  let mut out = String::from("// !$*UTF8*$!\n{\n");

  let mut keys: Vec<&str> = root.keys().map(String::as_str).collect();
  keys.push("objects");
  keys.sort_unstable();

  for key in keys {
    indent(&mut out, 1);
    write_string(&mut out, key);
    out.push_str(" = ");
    if key == "objects" {
      write_objects(&mut out, objects);
    } else {
      write_block(&mut out, &root[key], 1);
    }
    out.push_str(";\n");
  }

  out.push_str("}\n");
  out
}

fn write_objects(out: &mut String, objects: &BTreeMap<String, Dict>) {
  let mut sections: BTreeMap<&str, Vec<(&String, &Dict)>> = BTreeMap::new();
  for (guid, object) in objects {
    let isa = object.get("isa").and_then(Value::as_str).unwrap_or("");
    sections.entry(isa).or_default().push((guid, object));
  }

  out.push_str("{\n");
  for (isa, entries) in sections {
    let _ = write!(out, "\n/* Begin {} section */\n", isa);
    for (guid, object) in entries {
      indent(out, 2);
      write_string(out, guid);
      out.push_str(" = ");
      let value = Value::Dict(object.clone());
      if INLINE_ISAS.contains(&isa) {
        write_inline(out, &value);
      } else {
        write_block(out, &value, 2);
      }
      out.push_str(";\n");
    }
    let _ = writeln!(out, "/* End {} section */", isa);
  }
  indent(out, 1);
  out.push('}');
}
