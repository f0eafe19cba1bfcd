use strum::{AsRefStr, Display, EnumString, EnumIter, IntoEnumIterator};

use super::{is_whole, Node, TypeMapper};

/// Type tags of the YAML core schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum YamlType {
    Null,
    String,
    Integer,
    Float,
    Boolean,
    Mapping,
    Sequence,
    Unknown,
}

impl YamlType {
    pub fn all_valid() -> Vec<YamlType> {
        YamlType::iter().filter(YamlType::is_valid).collect()
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, YamlType::Unknown)
    }
}

pub fn is_valid_yaml_data_type(name: &str) -> bool {
    name.parse::<YamlType>().map(|t| t.is_valid()).unwrap_or(false)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlTypeMapper;

impl TypeMapper for YamlTypeMapper {
    type Tag = YamlType;

    fn map(&self, node: &Node) -> YamlType {
        match node {
            Node::Null => YamlType::Null,
            Node::String(_) => YamlType::String,
            Node::Int(_) | Node::UInt(_) => YamlType::Integer,
            Node::Float(f) if is_whole(*f) => YamlType::Integer,
            Node::Float(_) => YamlType::Float,
            Node::Bool(_) => YamlType::Boolean,
            Node::Map(_) => YamlType::Mapping,
            Node::Seq(_) => YamlType::Sequence,
            Node::Opaque(_) => YamlType::Unknown,
        }
    }
}
