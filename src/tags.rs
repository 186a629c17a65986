//! Structural tag validation
//!
//! Each schema version declares a static table of [`FieldTag`]s. After a
//! document is parsed, the populated config is serialized into a JSON view
//! and every tag is evaluated against it. All violations are collected; the
//! validator never stops at the first one.
//!
//! Paths are dotted keys. A `[]` suffix visits every element of a sequence:
//!
//! ```text
//! build.artifacts[].image      -> build.artifacts[0].image, build.artifacts[1].image, ...
//! deploy                       -> the deploy mapping itself
//! ```
//!
//! A tag only fires where its parent exists, so `Required("deploy.helm.releases[].name")`
//! says nothing about documents without a helm deployer.

use std::fmt;

use serde_json::Value;

use crate::error::{Result, SchemaError};
use crate::versioned::ConfigDocument;

/// A per-field structural constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTag {
    /// The field must be set to a non-empty value
    Required(&'static str),
    /// At most one of `fields` may be set on the mapping at `path`
    OneOf {
        path: &'static str,
        fields: &'static [&'static str],
    },
    /// When set, the string at `path` must be one of `values`
    Enum {
        path: &'static str,
        values: &'static [&'static str],
    },
}

/// Types that carry a static tag table
pub trait Tagged {
    /// Structural constraints for this type
    fn tags(&self) -> &'static [FieldTag];
}

/// A single violated constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagViolation {
    /// Concrete path of the offending field (e.g. `build.artifacts[1].image`)
    pub path: String,
    pub message: String,
}

impl fmt::Display for TagViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every violation found in one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagViolations(Vec<TagViolation>);

impl TagViolations {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagViolation> {
        self.0.iter()
    }

    /// Find the violation reported for a concrete path
    pub fn at(&self, path: &str) -> Option<&TagViolation> {
        self.0.iter().find(|v| v.path == path)
    }

    fn push(&mut self, path: String, message: String) {
        self.0.push(TagViolation { path, message });
    }
}

impl fmt::Display for TagViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{}", joined)
    }
}

/// Validate a populated config against its own tag table
pub fn validate<T>(cfg: &T) -> Result<()>
where
    T: Tagged + ConfigDocument + ?Sized,
{
    let view = cfg.to_value()?;
    let violations = check_tags(&view, cfg.tags());
    if violations.is_empty() {
        Ok(())
    } else {
        tracing::debug!(count = violations.len(), "structural tag violations");
        Err(SchemaError::Validation(violations))
    }
}

/// Evaluate a tag table against a JSON view of a config
pub fn check_tags(view: &Value, tags: &[FieldTag]) -> TagViolations {
    let mut violations = TagViolations::default();

    for tag in tags {
        match *tag {
            FieldTag::Required(path) => {
                for (at, value) in leaves(view, path) {
                    if !is_set(value) {
                        violations.push(at, "required field is not set".to_string());
                    }
                }
            }
            FieldTag::OneOf { path, fields } => {
                for (at, node) in locate(view, path) {
                    let set: Vec<&str> = fields
                        .iter()
                        .copied()
                        .filter(|field| is_set(node.get(*field)))
                        .collect();
                    if set.len() > 1 {
                        let at = if at.is_empty() { "<root>".to_string() } else { at };
                        violations.push(
                            at,
                            format!("only one of [{}] may be set, found [{}]", fields.join(", "), set.join(", ")),
                        );
                    }
                }
            }
            FieldTag::Enum { path, values } => {
                for (at, value) in leaves(view, path) {
                    if let Some(Value::String(s)) = value {
                        if !s.is_empty() && !values.contains(&s.as_str()) {
                            violations.push(
                                at,
                                format!("must be one of [{}], got '{}'", values.join(", "), s),
                            );
                        }
                    }
                }
            }
        }
    }

    violations
}

struct Segment<'p> {
    key: &'p str,
    each: bool,
}

impl<'p> Segment<'p> {
    fn parse(raw: &'p str) -> Self {
        match raw.strip_suffix("[]") {
            Some(key) => Segment { key, each: true },
            None => Segment { key: raw, each: false },
        }
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn descend<'v>(nodes: Vec<(String, &'v Value)>, segment: &Segment<'_>) -> Vec<(String, &'v Value)> {
    let mut out = Vec::new();
    for (prefix, node) in nodes {
        let at = join(&prefix, segment.key);
        match node.get(segment.key) {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) if segment.each => {
                out.extend(
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| (format!("{}[{}]", at, i), item)),
                );
            }
            Some(child) if !segment.each => out.push((at, child)),
            Some(_) => {}
        }
    }
    out
}

/// Every existing node matching `path`
fn locate<'v>(root: &'v Value, path: &str) -> Vec<(String, &'v Value)> {
    path.split('.')
        .filter(|s| !s.is_empty())
        .map(Segment::parse)
        .fold(vec![(String::new(), root)], |nodes, segment| descend(nodes, &segment))
}

/// Every leaf slot matching `path` whose parent exists, set or not
fn leaves<'v>(root: &'v Value, path: &str) -> Vec<(String, Option<&'v Value>)> {
    let (parent, leaf) = match path.rsplit_once('.') {
        Some((parent, leaf)) => (parent, leaf),
        None => ("", path),
    };
    let leaf = Segment::parse(leaf);

    let mut out = Vec::new();
    for (prefix, node) in locate(root, parent) {
        let at = join(&prefix, leaf.key);
        if leaf.each {
            if let Some(Value::Array(items)) = node.get(leaf.key) {
                out.extend(
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| (format!("{}[{}]", at, i), Some(item))),
                );
            }
        } else {
            out.push((at, node.get(leaf.key)));
        }
    }
    out
}

fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}
