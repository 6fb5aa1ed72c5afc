//! XML property-list values.
//!
//! Reads the document with `roxmltree` and writes it back in the layout
//! Xcode uses, preserving dictionary key order.

use std::fmt::Write;

use roxmltree::{Document, Node, ParsingOptions};

use super::PlistError;

const HEADER: &str = concat!(
  "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
  "<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n",
  "<plist version=\"1.0\">\n",
);

/// A property-list value. Dictionaries keep their keys in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum PlistValue {
  String(String),
  Integer(i64),
  /// Reals and dates are carried as their text.
  Real(String),
  Date(String),
  Data(String),
  Bool(bool),
  Array(Vec<PlistValue>),
  Dict(PlistDict),
}

impl From<&str> for PlistValue {
  fn from(s: &str) -> Self {
    PlistValue::String(s.to_string())
  }
}

impl From<String> for PlistValue {
  fn from(s: String) -> Self {
    PlistValue::String(s)
  }
}

impl From<bool> for PlistValue {
  fn from(b: bool) -> Self {
    PlistValue::Bool(b)
  }
}

/// An ordered dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlistDict {
  entries: Vec<(String, PlistValue)>,
}

impl PlistDict {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<&PlistValue> {
    self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
  }

  pub fn get_mut(&mut self, key: &str) -> Option<&mut PlistValue> {
    self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
  }

  /// Replace the value in place, or append a new entry.
  pub fn set(&mut self, key: &str, value: impl Into<PlistValue>) {
    let value = value.into();
    match self.get_mut(key) {
      Some(existing) => *existing = value,
      None => self.entries.push((key.to_string(), value)),
    }
  }

  pub fn remove(&mut self, key: &str) -> Option<PlistValue> {
    let idx = self.entries.iter().position(|(k, _)| k == key)?;
    Some(self.entries.remove(idx).1)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(k, _)| k.as_str())
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl From<PlistDict> for PlistValue {
  fn from(d: PlistDict) -> Self {
    PlistValue::Dict(d)
  }
}

/// Parse an XML plist whose top-level value is a dictionary.
pub fn parse_xml(text: &str) -> Result<PlistDict, PlistError> {
  let options = ParsingOptions {
    allow_dtd: true,
    ..ParsingOptions::default()
  };
  let doc = Document::parse_with_options(text, options)?;
  let root = doc.root_element();
  if !root.has_tag_name("plist") {
    return Err(PlistError::NotAPlist(root.tag_name().name().to_string()));
  }

  let mut values = root.children().filter(Node::is_element);
  match (values.next(), values.next()) {
    (Some(node), None) => match parse_node(node)? {
      PlistValue::Dict(dict) => Ok(dict),
      _ => Err(PlistError::RootNotDict),
    },
    _ => Err(PlistError::RootNotDict),
  }
}

fn parse_node(node: Node) -> Result<PlistValue, PlistError> {
  let text = || node.text().unwrap_or_default().to_string();
  match node.tag_name().name() {
    "dict" => {
      let mut dict = PlistDict::new();
      let mut children = node.children().filter(Node::is_element);
      while let Some(key) = children.next() {
        if !key.has_tag_name("key") {
          return Err(PlistError::Invalid(format!(
            "expected <key>, found <{}>",
            key.tag_name().name()
          )));
        }
        let value = children
          .next()
          .ok_or_else(|| PlistError::Invalid(format!("key '{}' has no value", key.text().unwrap_or_default())))?;
        dict
          .entries
          .push((key.text().unwrap_or_default().to_string(), parse_node(value)?));
      }
      Ok(PlistValue::Dict(dict))
    }
    "array" => node
      .children()
      .filter(Node::is_element)
      .map(parse_node)
      .collect::<Result<Vec<_>, _>>()
      .map(PlistValue::Array),
    "string" => Ok(PlistValue::String(text())),
    "integer" => text()
      .trim()
      .parse()
      .map(PlistValue::Integer)
      .map_err(|_| PlistError::Invalid(format!("bad integer '{}'", text()))),
    "real" => Ok(PlistValue::Real(text().trim().to_string())),
    "date" => Ok(PlistValue::Date(text().trim().to_string())),
    "data" => Ok(PlistValue::Data(text())),
    "true" => Ok(PlistValue::Bool(true)),
    "false" => Ok(PlistValue::Bool(false)),
    other => Err(PlistError::Invalid(format!("unsupported element <{}>", other))),
  }
}

/// Render a dictionary as a complete XML plist document.
pub fn to_xml(dict: &PlistDict) -> String {
  let mut out = String::from(HEADER);
  write_dict(&mut out, dict, 0);
  out.push_str("</plist>\n");
  out
}

fn escape(s: &str) -> String {
  s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn indent(out: &mut String, depth: usize) {
  for _ in 0..depth {
    out.push('\t');
  }
}

fn write_dict(out: &mut String, dict: &PlistDict, depth: usize) {
  if dict.is_empty() {
    out.push_str("<dict/>\n");
    return;
  }
  out.push_str("<dict>\n");
  for (key, value) in &dict.entries {
    indent(out, depth + 1);
    let _ = writeln!(out, "<key>{}</key>", escape(key));
    indent(out, depth + 1);
    write_value(out, value, depth + 1);
  }
  indent(out, depth);
  out.push_str("</dict>\n");
}

fn write_value(out: &mut String, value: &PlistValue, depth: usize) {
  let _ = match value {
    PlistValue::String(s) => writeln!(out, "<string>{}</string>", escape(s)),
    PlistValue::Integer(i) => writeln!(out, "<integer>{}</integer>", i),
    PlistValue::Real(r) => writeln!(out, "<real>{}</real>", r),
    PlistValue::Date(d) => writeln!(out, "<date>{}</date>", d),
    PlistValue::Data(d) => writeln!(out, "<data>{}</data>", d),
    PlistValue::Bool(true) => writeln!(out, "<true/>"),
    PlistValue::Bool(false) => writeln!(out, "<false/>"),
    PlistValue::Array(items) if items.is_empty() => writeln!(out, "<array/>"),
    PlistValue::Array(items) => {
      out.push_str("<array>\n");
      for item in items {
        indent(out, depth + 1);
        write_value(out, item, depth + 1);
      }
      indent(out, depth);
      writeln!(out, "</array>")
    }
    PlistValue::Dict(dict) => {
      write_dict(out, dict, depth);
      Ok(())
    }
  };
}
