//! Decoded document values and their semantic type tags.
//!
//! Every resolver in this crate hands back a [`Node`], a closed set of
//! shapes that a JSON, YAML, XML or HTML document can decode into. The
//! mappers in the submodules classify a node into the type system of one
//! target format.
//!
//! Floats whose fractional part is exactly zero classify as integers:
//! `2.0` is an integer, `2.1` is a float.

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{ApiStepsError, Result};
use crate::format::DataFormat;

mod json;
mod native;
mod yaml;

pub use json::{is_valid_json_data_type, JsonType, JsonTypeMapper};
pub use native::{is_valid_native_data_type, NativeType, NativeTypeMapper};
pub use yaml::{is_valid_yaml_data_type, YamlType, YamlTypeMapper};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Seq(Vec<Node>),
    Map(IndexMap<String, Node>),
    /// Decoded value outside the closed set above (e.g. a YAML custom tag).
    Opaque(String),
}

/// Maps a node onto the tag enumeration of one format.
pub trait TypeMapper {
    type Tag;

    fn map(&self, node: &Node) -> Self::Tag;
}

pub(crate) fn is_whole(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0
}

impl Node {
    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Node]> {
        match self {
            Node::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Integer view of the node. Whole floats and numeric strings convert.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Node::Int(i) => Some(*i),
            Node::UInt(u) => i64::try_from(*u).ok(),
            Node::Float(f) if is_whole(*f) && *f >= i64::MIN as f64 && *f < i64::MAX as f64 => Some(*f as i64),
            Node::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Node::Int(i) => Some(*i as f64),
            Node::UInt(u) => Some(*u as f64),
            Node::Float(f) => Some(*f),
            Node::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(b) => Some(*b),
            Node::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text used for substring and regex checks. Scalars render bare,
    /// containers render as compact JSON.
    pub fn to_plain_string(&self) -> String {
        match self {
            Node::Null => "null".to_string(),
            Node::Bool(b) => b.to_string(),
            Node::Int(i) => i.to_string(),
            Node::UInt(u) => u.to_string(),
            Node::Float(f) => f.to_string(),
            Node::String(s) => s.clone(),
            Node::Opaque(s) => s.clone(),
            Node::Seq(_) | Node::Map(_) => self.to_json().to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(*b),
            Node::Int(i) => Value::from(*i),
            Node::UInt(u) => Value::from(*u),
            Node::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Node::String(s) => Value::String(s.clone()),
            Node::Opaque(s) => Value::String(s.clone()),
            Node::Seq(items) => Value::Array(items.iter().map(Node::to_json).collect()),
            Node::Map(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Node::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Node::UInt(u)
                } else {
                    Node::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Node::String(s),
            Value::Array(items) => Node::Seq(items.into_iter().map(Node::from).collect()),
            Value::Object(map) => Node::Map(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect()),
        }
    }
}

impl From<&Value> for Node {
    fn from(value: &Value) -> Self {
        Node::from(value.clone())
    }
}

impl From<serde_yaml::Value> for Node {
    fn from(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value as Yaml;
        match value {
            Yaml::Null => Node::Null,
            Yaml::Bool(b) => Node::Bool(b),
            Yaml::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Node::UInt(u)
                } else if let Some(i) = n.as_i64() {
                    Node::Int(i)
                } else {
                    Node::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Yaml::String(s) => Node::String(s),
            Yaml::Sequence(items) => Node::Seq(items.into_iter().map(Node::from).collect()),
            Yaml::Mapping(map) => Node::Map(
                map.into_iter()
                    .map(|(k, v)| (yaml_key_to_string(k), Node::from(v)))
                    .collect(),
            ),
            Yaml::Tagged(tagged) => Node::Opaque(format!("{} {:?}", tagged.tag, tagged.value)),
        }
    }
}

fn yaml_key_to_string(key: serde_yaml::Value) -> String {
    match Node::from(key) {
        Node::String(s) => s,
        other => other.to_plain_string(),
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::String(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::String(value)
    }
}

/// A tag from any of the supported type systems, chosen by [`DataFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Json(JsonType),
    Yaml(YamlType),
    Native(NativeType),
}

impl TypeTag {
    /// Classifies `node` in the type system that belongs to `format`.
    /// XML, HTML and plain text nodes use the native mapping.
    pub fn of(format: DataFormat, node: &Node) -> Self {
        match format {
            DataFormat::Json => TypeTag::Json(JsonTypeMapper.map(node)),
            DataFormat::Yaml => TypeTag::Yaml(YamlTypeMapper.map(node)),
            DataFormat::Xml | DataFormat::Html | DataFormat::PlainText => {
                TypeTag::Native(NativeTypeMapper.map(node))
            }
        }
    }

    /// Parses a user-declared type name for `format`; rejects names outside
    /// that format's valid set.
    pub fn parse(format: DataFormat, name: &str) -> Result<Self> {
        let invalid = || {
            ApiStepsError::InvalidArgument(format!(
                "'{}' is not a valid {} data type",
                name, format
            ))
        };
        let tag = match format {
            DataFormat::Json => TypeTag::Json(JsonType::from_str(name.trim()).map_err(|_| invalid())?),
            DataFormat::Yaml => TypeTag::Yaml(YamlType::from_str(name.trim()).map_err(|_| invalid())?),
            DataFormat::Xml | DataFormat::Html | DataFormat::PlainText => {
                TypeTag::Native(NativeType::from_str(name.trim()).map_err(|_| invalid())?)
            }
        };
        if tag.is_valid() { Ok(tag) } else { Err(invalid()) }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            TypeTag::Json(t) => t.is_valid(),
            TypeTag::Yaml(t) => t.is_valid(),
            TypeTag::Native(t) => t.is_valid(),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Json(t) => write!(f, "{}", t),
            TypeTag::Yaml(t) => write!(f, "{}", t),
            TypeTag::Native(t) => write!(f, "{}", t),
        }
    }
}
