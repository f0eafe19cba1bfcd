//! Path expressions evaluated against raw document bytes.
//!
//! JSON understands two dialects. An expression starting with `$` is a
//! JSONPath (`$.store.book[?(@.price > 10)]`); anything else is a dot path
//! (`store.book[0].price`). The dialect is decided once by
//! [`PathExpr::parse`] and carried as a tag from there on.

use crate::error::{ApiStepsError, Result};
use crate::types::Node;

mod json;
mod xml;
mod yaml;

pub use json::{get_value, parse_path, JsonPathFinder};
pub use xml::{HtmlPathFinder, XmlPathFinder};
pub use yaml::YamlPathFinder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `$`-prefixed JSONPath with bracket notation and filters.
    Dollar,
    /// Dot separated keys with optional `[n]` indexes.
    Dot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    pub dialect: Dialect,
    /// For `Dollar` the full expression including `$`; for `Dot` the path
    /// with any leading dot removed.
    pub body: String,
}

impl PathExpr {
    pub fn parse(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Err(ApiStepsError::EmptyExpression);
        }
        if trimmed.starts_with('$') {
            Ok(Self { dialect: Dialect::Dollar, body: trimmed.to_string() })
        } else {
            let body = trimmed.trim_start_matches('.');
            if body.is_empty() {
                return Err(ApiStepsError::MalformedExpression(format!("'{}' selects nothing", expression)));
            }
            Ok(Self { dialect: Dialect::Dot, body: body.to_string() })
        }
    }
}

/// Finds the node an expression selects within a document.
pub trait PathFinder: Send + Sync + std::fmt::Debug {
    fn find(&self, expression: &str, document: &[u8]) -> Result<Node>;
}
