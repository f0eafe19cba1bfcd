use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use super::{Node, TypeMapper};

/// Type tags of the JSON data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum JsonType {
    Null,
    String,
    Number,
    Boolean,
    Object,
    Array,
    Unknown,
}

impl JsonType {
    /// Every tag except `Unknown`.
    pub fn all_valid() -> Vec<JsonType> {
        JsonType::iter().filter(JsonType::is_valid).collect()
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, JsonType::Unknown)
    }
}

pub fn is_valid_json_data_type(name: &str) -> bool {
    name.parse::<JsonType>().map(|t| t.is_valid()).unwrap_or(false)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTypeMapper;

impl TypeMapper for JsonTypeMapper {
    type Tag = JsonType;

    fn map(&self, node: &Node) -> JsonType {
        match node {
            Node::Null => JsonType::Null,
            Node::String(_) => JsonType::String,
            Node::Int(_) | Node::UInt(_) | Node::Float(_) => JsonType::Number,
            Node::Bool(_) => JsonType::Boolean,
            Node::Map(_) => JsonType::Object,
            Node::Seq(_) => JsonType::Array,
            Node::Opaque(_) => JsonType::Unknown,
        }
    }
}
