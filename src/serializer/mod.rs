use crate::error::Result;
use crate::types::Node;

/// Converts nodes to and from the wire text of one format.
pub trait Serializer: Send + Sync + std::fmt::Debug {
    fn serialize(&self, node: &Node) -> Result<Vec<u8>>;

    fn deserialize(&self, bytes: &[u8]) -> Result<Node>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, node: &Node) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&node.to_json())?)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Node> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        Ok(Node::from(value))
    }
}

/// YAML keeps non-negative integers unsigned when decoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlSerializer;

impl Serializer for YamlSerializer {
    fn serialize(&self, node: &Node) -> Result<Vec<u8>> {
        Ok(serde_yaml::to_string(&node.to_json())?.into_bytes())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Node> {
        let value: serde_yaml::Value = serde_yaml::from_slice(bytes)?;
        Ok(Node::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn json_keeps_key_order() {
        let node = JsonSerializer.deserialize(br#"{"z": 1, "a": [true, null]}"#).unwrap();
        let mut expected = IndexMap::new();
        expected.insert("z".to_string(), Node::Int(1));
        expected.insert("a".to_string(), Node::Seq(vec![Node::Bool(true), Node::Null]));
        assert_eq!(node, Node::Map(expected));
        assert_eq!(JsonSerializer.serialize(&node).unwrap(), br#"{"z":1,"a":[true,null]}"#.to_vec());
    }

    #[test]
    fn yaml_decodes_unsigned_and_reports_errors() {
        let node = YamlSerializer.deserialize(b"count: 3\nratio: 0.5\n").unwrap();
        let Node::Map(map) = node else { panic!("expected a mapping") };
        assert_eq!(map["count"], Node::UInt(3));
        assert_eq!(map["ratio"], Node::Float(0.5));

        let err = YamlSerializer.deserialize(b"a: [1, 2").unwrap_err();
        assert_eq!(err.error_type(), "yaml_error");
        let err = JsonSerializer.deserialize(b"{").unwrap_err();
        assert_eq!(err.error_type(), "json_error");
    }

    #[test]
    fn yaml_serializes_readable_text() {
        let node = JsonSerializer.deserialize(br#"{"name": "Ada"}"#).unwrap();
        let text = String::from_utf8(YamlSerializer.serialize(&node).unwrap()).unwrap();
        assert_eq!(text.trim(), "name: Ada");
    }
}
