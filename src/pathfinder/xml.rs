use sxd_document::Package;
use sxd_xpath::{evaluate_xpath, Value};

use crate::error::{ApiStepsError, Result};
use crate::types::Node;

use super::PathFinder;

/// What to return when an XPath selects more than one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MultiMatch {
    All,
    First,
}

fn evaluate(package: &Package, expression: &str, multi: MultiMatch) -> Result<Node> {
    let expression = expression.trim();
    let document = package.as_document();
    let value = evaluate_xpath(&document, expression)
        .map_err(|e| ApiStepsError::MalformedExpression(format!("{}: {:?}", expression, e)))?;

    match value {
        Value::Nodeset(nodes) => {
            let mut texts: Vec<String> = nodes
                .document_order()
                .iter()
                .map(|node| node.string_value().trim().to_string())
                .collect();
            match (texts.len(), multi) {
                (0, _) => Err(ApiStepsError::NotFound(expression.to_string())),
                (1, _) | (_, MultiMatch::First) => Ok(Node::String(texts.remove(0))),
                (_, MultiMatch::All) => Ok(Node::Seq(texts.into_iter().map(Node::String).collect())),
            }
        }
        Value::String(s) => Ok(Node::String(s)),
        Value::Number(n) => Ok(Node::Float(n)),
        Value::Boolean(b) => Ok(Node::Bool(b)),
    }
}

fn utf8(document: &[u8]) -> Result<&str> {
    std::str::from_utf8(document)
        .map_err(|e| ApiStepsError::MalformedDocument(format!("document is not UTF-8: {}", e)))
}

/// XPath over XML. Several matches come back as a sequence of their
/// trimmed text in document order.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlPathFinder;

impl PathFinder for XmlPathFinder {
    fn find(&self, expression: &str, document: &[u8]) -> Result<Node> {
        if expression.trim().is_empty() {
            return Err(ApiStepsError::EmptyExpression);
        }
        let package = sxd_document::parser::parse(utf8(document)?)
            .map_err(|e| ApiStepsError::MalformedDocument(format!("invalid XML: {:?}", e)))?;
        evaluate(&package, expression, MultiMatch::All)
    }
}

/// XPath over HTML. Unlike XML, only the first of several matches is
/// returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlPathFinder;

impl PathFinder for HtmlPathFinder {
    fn find(&self, expression: &str, document: &[u8]) -> Result<Node> {
        if expression.trim().is_empty() {
            return Err(ApiStepsError::EmptyExpression);
        }
        let package = sxd_html::parse_html(utf8(document)?);
        evaluate(&package, expression, MultiMatch::First)
    }
}
