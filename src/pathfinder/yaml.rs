use crate::error::{ApiStepsError, Result};
use crate::types::Node;

use super::json::JsonPathFinder;
use super::{Dialect, PathExpr, PathFinder};

/// JSONPath over a YAML document. Only the `$` dialect is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlPathFinder;

/// Non-negative integers in YAML decode as unsigned.
fn prefer_unsigned(node: Node) -> Node {
    match node {
        Node::Int(i) if i >= 0 => Node::UInt(i as u64),
        Node::Seq(items) => Node::Seq(items.into_iter().map(prefer_unsigned).collect()),
        Node::Map(map) => Node::Map(map.into_iter().map(|(k, v)| (k, prefer_unsigned(v))).collect()),
        other => other,
    }
}

impl PathFinder for YamlPathFinder {
    fn find(&self, expression: &str, document: &[u8]) -> Result<Node> {
        let expr = PathExpr::parse(expression)?;
        if expr.dialect != Dialect::Dollar {
            return Err(ApiStepsError::MalformedExpression(format!(
                "YAML paths must start with '$', got '{}'",
                expression.trim()
            )));
        }
        let doc: serde_yaml::Value = serde_yaml::from_slice(document)
            .map_err(|e| ApiStepsError::MalformedDocument(format!("invalid YAML: {}", e)))?;
        let root = Node::from(doc).to_json();
        JsonPathFinder::select(&expr, &root).map(prefer_unsigned)
    }
}
