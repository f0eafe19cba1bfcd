use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use super::{is_whole, Node, TypeMapper};

/// Language-neutral view used for XML, HTML and plain text nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum NativeType {
    Nil,
    String,
    Int,
    Float,
    Bool,
    Map,
    Slice,
    Unknown,
}

impl NativeType {
    pub fn all_valid() -> Vec<NativeType> {
        NativeType::iter().filter(NativeType::is_valid).collect()
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, NativeType::Unknown)
    }
}

pub fn is_valid_native_data_type(name: &str) -> bool {
    name.parse::<NativeType>().map(|t| t.is_valid()).unwrap_or(false)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeTypeMapper;

impl TypeMapper for NativeTypeMapper {
    type Tag = NativeType;

    fn map(&self, node: &Node) -> NativeType {
        match node {
            Node::Null => NativeType::Nil,
            Node::String(_) => NativeType::String,
            Node::Int(_) | Node::UInt(_) => NativeType::Int,
            Node::Float(f) if is_whole(*f) => NativeType::Int,
            Node::Float(_) => NativeType::Float,
            Node::Bool(_) => NativeType::Bool,
            Node::Map(_) => NativeType::Map,
            Node::Seq(_) => NativeType::Slice,
            Node::Opaque(_) => NativeType::Unknown,
        }
    }
}
