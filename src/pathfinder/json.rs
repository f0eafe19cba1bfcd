use serde_json::Value;

use crate::error::{ApiStepsError, Result};
use crate::types::Node;

use super::{Dialect, PathExpr, PathFinder};

/// Splits a dot path into keys and indexes.
///
/// Supports:
/// - `data.rows` (no leading dot)
/// - `.data.rows` (jq-style with leading dot)
/// - `data.users.0` (array index access)
/// - `store.book[0].price` (bracket index access)
pub fn parse_path(path: &str) -> Result<Vec<String>> {
    let clean = path.trim_start_matches('.');
    let mut segments = Vec::new();

    for raw in clean.split('.').filter(|s| !s.is_empty()) {
        let (name, mut rest) = match raw.find('[') {
            Some(pos) => (&raw[..pos], &raw[pos..]),
            None => (raw, ""),
        };
        if name.contains(']') {
            return Err(ApiStepsError::MalformedExpression(format!("unbalanced ']' in '{}'", path)));
        }
        if !name.is_empty() {
            segments.push(name.to_string());
        }
        while !rest.is_empty() {
            let close = match (rest.starts_with('['), rest.find(']')) {
                (true, Some(close)) => close,
                _ => return Err(ApiStepsError::MalformedExpression(format!("unbalanced '[' in '{}'", path))),
            };
            let index = rest[1..close].trim();
            if index.parse::<usize>().is_err() {
                return Err(ApiStepsError::MalformedExpression(format!(
                    "'{}' is not an array index in '{}'",
                    index, path
                )));
            }
            segments.push(index.to_string());
            rest = &rest[close + 1..];
        }
    }
    Ok(segments)
}

fn walk<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut current = root;
    for part in segments {
        current = match current {
            Value::Object(map) => map.get(part.as_str())?,
            Value::Array(arr) => {
                let idx = part.parse::<usize>().ok()?;
                arr.get(idx)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Immutable access to a nested value.
///
/// `Ok(None)` when the path is well formed but leads nowhere.
pub fn get_value<'a>(root: &'a Value, path: &str) -> Result<Option<&'a Value>> {
    let segments = parse_path(path)?;
    Ok(walk(root, &segments))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPathFinder;

impl JsonPathFinder {
    pub(crate) fn select(expr: &PathExpr, root: &Value) -> Result<Node> {
        match expr.dialect {
            Dialect::Dot => match get_value(root, &expr.body)? {
                Some(value) => Ok(Node::from(value)),
                None => Err(ApiStepsError::NotFound(expr.body.clone())),
            },
            Dialect::Dollar => {
                let mut matches = jsonpath_lib::select(root, &expr.body)
                    .map_err(|e| ApiStepsError::MalformedExpression(format!("{}: {:?}", expr.body, e)))?;
                match matches.len() {
                    0 => Err(ApiStepsError::NotFound(expr.body.clone())),
                    1 => Ok(Node::from(matches.remove(0))),
                    _ => Ok(Node::Seq(matches.into_iter().map(Node::from).collect())),
                }
            }
        }
    }
}

impl PathFinder for JsonPathFinder {
    fn find(&self, expression: &str, document: &[u8]) -> Result<Node> {
        let expr = PathExpr::parse(expression)?;
        let root: Value = serde_json::from_slice(document)
            .map_err(|e| ApiStepsError::MalformedDocument(format!("invalid JSON: {}", e)))?;
        Self::select(&expr, &root)
    }
}
