//! Device tags and tag-string helpers.
//!
//! A tag is written `[namespace/][annotation:]label`. The gateway indexes
//! devices by the string form, so parsing and formatting must round-trip
//! exactly. No component may contain `/` or `:`, which keeps the grammar
//! unambiguous.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Namespace reported for tags written without one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Prefix of the identity tag every device carries
pub const ID_TAG_PREFIX: &str = "system/id:";

/// Errors building or parsing a tag
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TagError {
    #[error("tag label must not be empty")]
    EmptyLabel,

    #[error("tag {part} must not be empty")]
    EmptyPart { part: &'static str },

    #[error("tag {part} '{value}' contains a reserved character")]
    ReservedChar { part: &'static str, value: String },
}

/// A structured device tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    namespace: Option<String>,
    annotation: Option<String>,
    label: String,
}

fn check_part(part: &'static str, value: &str) -> Result<(), TagError> {
    if value.is_empty() {
        return Err(TagError::EmptyPart { part });
    }
    if value.contains('/') || value.contains(':') {
        return Err(TagError::ReservedChar {
            part,
            value: value.to_string(),
        });
    }
    Ok(())
}

impl Tag {
    /// Create a tag from its parts
    pub fn new(
        namespace: Option<&str>,
        annotation: Option<&str>,
        label: &str,
    ) -> Result<Self, TagError> {
        if label.is_empty() {
            return Err(TagError::EmptyLabel);
        }
        check_part("label", label)?;
        if let Some(ns) = namespace {
            check_part("namespace", ns)?;
        }
        if let Some(ann) = annotation {
            check_part("annotation", ann)?;
        }
        Ok(Self {
            namespace: namespace.map(str::to_string),
            annotation: annotation.map(str::to_string),
            label: label.to_string(),
        })
    }

    /// The identity tag `system/id:<device_id>`
    pub fn id_tag(device_id: &str) -> String {
        format!("{}{}", ID_TAG_PREFIX, device_id)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ns) = &self.namespace {
            write!(f, "{}/", ns)?;
        }
        if let Some(ann) = &self.annotation {
            write!(f, "{}:", ann)?;
        }
        f.write_str(&self.label)
    }
}

impl FromStr for Tag {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, rest) = match s.split_once('/') {
            Some((ns, rest)) => (Some(ns), rest),
            None => (None, s),
        };
        let (annotation, label) = match rest.split_once(':') {
            Some((ann, label)) => (Some(ann), label),
            None => (None, rest),
        };
        Tag::new(namespace, annotation, label)
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Namespace of a tag string: the text before `/`, or `default`.
///
/// ```
/// # use devmon_core::tag::namespace_of;
/// assert_eq!(namespace_of("vapor/rack:1"), "vapor");
/// assert_eq!(namespace_of("rack:1"), "default");
/// ```
pub fn namespace_of(tag: &str) -> &str {
    match tag.split_once('/') {
        Some((ns, _)) => ns,
        None => DEFAULT_NAMESPACE,
    }
}

/// Prepend `"ns/"` to a tag string that has no namespace of its own.
///
/// ```
/// # use devmon_core::tag::with_namespace;
/// assert_eq!(with_namespace("foo", "default"), "default/foo");
/// assert_eq!(with_namespace("vapor/foo", "default"), "vapor/foo");
/// ```
pub fn with_namespace(tag: &str, ns: &str) -> String {
    if tag.contains('/') {
        tag.to_string()
    } else {
        format!("{}/{}", ns, tag)
    }
}

/// Whether the tag string is a device identity tag
pub fn is_id_tag(tag: &str) -> bool {
    tag.starts_with(ID_TAG_PREFIX)
}
