use std::str::FromStr;
use std::time::Duration;

use regex::Regex;
use strum::{Display, EnumString};

use crate::cache::Cached;
use crate::debug::pretty_body;
use crate::error::{ApiStepsError, Result};
use crate::format::DataFormat;
use crate::types::{Node, TypeTag};

use super::ApiContext;

/// How an expected value written in a step is compared with a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ValueKind {
    #[strum(to_string = "string", serialize = "str")]
    String,
    #[strum(to_string = "int", serialize = "integer")]
    Int,
    #[strum(to_string = "float", serialize = "number")]
    Float,
    #[strum(to_string = "bool", serialize = "boolean")]
    Bool,
    #[strum(to_string = "nil", serialize = "null")]
    Null,
}

fn kind_mismatch(kind: ValueKind, node: &Node) -> ApiStepsError {
    ApiStepsError::TypeMismatch(format!("node {} cannot be read as {}", node.to_plain_string(), kind))
}

fn parse_expected<T: FromStr>(kind: ValueKind, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| ApiStepsError::InvalidArgument(format!("expected value '{}' is not a valid {}", raw, kind)))
}

impl ApiContext {
    /// Prints the last response when debugging, then hands `result` back
    /// unchanged.
    fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if self.debugger.is_on() {
                if let Some(record) = &self.last_response {
                    self.debugger.print(&format!(
                        "step failed: {}\nlast response ({}):\n{}",
                        err,
                        record.status,
                        pretty_body(&record.body_text())
                    ));
                }
            }
        }
        result
    }

    pub fn assert_status_code(&self, code: u16) -> Result<()> {
        let result = self.last_response().and_then(|record| {
            if record.status == code {
                Ok(())
            } else {
                Err(ApiStepsError::AssertionFailed(format!(
                    "expected status code {}, got {}",
                    code, record.status
                )))
            }
        });
        self.report(result)
    }

    fn detected_format(&self) -> Result<DataFormat> {
        Ok(DataFormat::detect(&self.last_response()?.body))
    }

    pub fn assert_response_format_is(&self, format: DataFormat) -> Result<()> {
        let result = self.detected_format().and_then(|detected| {
            if detected == format {
                Ok(())
            } else {
                Err(ApiStepsError::AssertionFailed(format!("expected a {} body, got {}", format, detected)))
            }
        });
        self.report(result)
    }

    pub fn assert_response_format_is_not(&self, format: DataFormat) -> Result<()> {
        let result = self.detected_format().and_then(|detected| {
            if detected != format {
                Ok(())
            } else {
                Err(ApiStepsError::AssertionFailed(format!("expected a body that is not {}", format)))
            }
        });
        self.report(result)
    }

    pub fn assert_header_exists(&self, name: &str) -> Result<()> {
        let result = self.last_response().and_then(|record| match record.header(name) {
            Some(_) => Ok(()),
            None => Err(ApiStepsError::NotFound(format!("header '{}'", name))),
        });
        self.report(result)
    }

    pub fn assert_header_not_exists(&self, name: &str) -> Result<()> {
        let result = self.last_response().and_then(|record| match record.header(name) {
            Some(value) => Err(ApiStepsError::AssertionFailed(format!(
                "header '{}' is present with value '{}'",
                name, value
            ))),
            None => Ok(()),
        });
        self.report(result)
    }

    pub fn assert_header_value(&self, name: &str, value_template: &str) -> Result<()> {
        let result = self.render(value_template).and_then(|expected| {
            let record = self.last_response()?;
            match record.header(name) {
                Some(actual) if actual == expected => Ok(()),
                Some(actual) => Err(ApiStepsError::AssertionFailed(format!(
                    "header '{}' is '{}', expected '{}'",
                    name, actual, expected
                ))),
                None => Err(ApiStepsError::NotFound(format!("header '{}'", name))),
            }
        });
        self.report(result)
    }

    pub fn assert_time_between_request_and_response_is_less_than(&self, limit: Duration) -> Result<()> {
        let result = self.last_response().and_then(|record| {
            if record.duration < limit {
                Ok(())
            } else {
                Err(ApiStepsError::AssertionFailed(format!(
                    "response took {:?}, limit was {:?}",
                    record.duration, limit
                )))
            }
        });
        self.report(result)
    }

    /// Evaluates `expression` against the last response body.
    pub fn find_node(&self, format: DataFormat, expression: &str) -> Result<Node> {
        let record = self.last_response()?;
        self.formats.finder(format)?.find(expression, &record.body)
    }

    pub fn assert_node_exists(&self, format: DataFormat, expression: &str) -> Result<()> {
        let result = self.find_node(format, expression).map(|_| ());
        self.report(result)
    }

    /// Succeeds when the expression matches nothing; any other failure still
    /// fails.
    pub fn assert_node_not_exists(&self, format: DataFormat, expression: &str) -> Result<()> {
        let result = match self.find_node(format, expression) {
            Ok(node) => Err(ApiStepsError::AssertionFailed(format!(
                "node '{}' exists with value {}",
                expression,
                node.to_plain_string()
            ))),
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err),
        };
        self.report(result)
    }

    /// Checks a comma separated list of expressions, reporting every missing
    /// one at once.
    pub fn assert_nodes_exist(&self, format: DataFormat, expressions: &str) -> Result<()> {
        let mut missing = Vec::new();
        for expression in expressions.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match self.find_node(format, expression) {
                Ok(_) => {}
                Err(err) if err.is_not_found() => missing.push(expression),
                Err(err) => return self.report(Err(err)),
            }
        }
        let result = if missing.is_empty() {
            Ok(())
        } else {
            Err(ApiStepsError::NotFound(missing.join(", ")))
        };
        self.report(result)
    }

    fn node_type(&self, format: DataFormat, expression: &str, type_name: &str) -> Result<(TypeTag, TypeTag)> {
        let expected = TypeTag::parse(format, type_name)?;
        let node = self.find_node(format, expression)?;
        Ok((expected, TypeTag::of(format, &node)))
    }

    pub fn assert_node_is_type(&self, format: DataFormat, expression: &str, type_name: &str) -> Result<()> {
        let result = self.node_type(format, expression, type_name).and_then(|(expected, actual)| {
            if expected == actual {
                Ok(())
            } else {
                Err(ApiStepsError::TypeMismatch(format!(
                    "node '{}' is {}, expected {}",
                    expression, actual, expected
                )))
            }
        });
        self.report(result)
    }

    /// A classification mismatch is the success case here.
    pub fn assert_node_is_not_type(&self, format: DataFormat, expression: &str, type_name: &str) -> Result<()> {
        let result = self.node_type(format, expression, type_name).and_then(|(unexpected, actual)| {
            if unexpected != actual {
                Ok(())
            } else {
                Err(ApiStepsError::TypeMismatch(format!("node '{}' is {}", expression, actual)))
            }
        });
        self.report(result)
    }

    /// Compares the node with `value_template`, read as `data_type`
    /// (`string`, `int`, `float`, `bool` or `nil`).
    pub fn assert_node_is_value(
        &self,
        format: DataFormat,
        expression: &str,
        data_type: &str,
        value_template: &str,
    ) -> Result<()> {
        let result = self.node_is_value(format, expression, data_type, value_template);
        self.report(result)
    }

    fn node_is_value(&self, format: DataFormat, expression: &str, data_type: &str, value_template: &str) -> Result<()> {
        let kind = ValueKind::from_str(data_type.trim())
            .map_err(|_| ApiStepsError::InvalidArgument(format!("'{}' is not a value type", data_type)))?;
        let expected = self.render(value_template)?;
        let node = self.find_node(format, expression)?;

        let equal = match kind {
            ValueKind::String => node.as_str().ok_or_else(|| kind_mismatch(kind, &node))? == expected,
            ValueKind::Int => {
                node.as_i64().ok_or_else(|| kind_mismatch(kind, &node))? == parse_expected::<i64>(kind, &expected)?
            }
            ValueKind::Float => {
                node.as_f64().ok_or_else(|| kind_mismatch(kind, &node))? == parse_expected::<f64>(kind, &expected)?
            }
            ValueKind::Bool => {
                node.as_bool().ok_or_else(|| kind_mismatch(kind, &node))? == parse_expected::<bool>(kind, &expected)?
            }
            ValueKind::Null => node.is_null(),
        };
        if equal {
            Ok(())
        } else {
            Err(ApiStepsError::AssertionFailed(format!(
                "node '{}' is {}, expected {} {}",
                expression,
                node.to_plain_string(),
                kind,
                expected
            )))
        }
    }

    pub fn assert_node_contains_substring(&self, format: DataFormat, expression: &str, substring_template: &str) -> Result<()> {
        let result = self.render(substring_template).and_then(|needle| {
            let text = self.find_node(format, expression)?.to_plain_string();
            if text.contains(&needle) {
                Ok(())
            } else {
                Err(ApiStepsError::AssertionFailed(format!(
                    "node '{}' ({}) does not contain '{}'",
                    expression, text, needle
                )))
            }
        });
        self.report(result)
    }

    pub fn assert_node_matches_regex(&self, format: DataFormat, expression: &str, pattern: &str) -> Result<()> {
        let result = Regex::new(pattern)
            .map_err(|e| ApiStepsError::InvalidArgument(format!("invalid regex '{}': {}", pattern, e)))
            .and_then(|re| {
                let text = self.find_node(format, expression)?.to_plain_string();
                if re.is_match(&text) {
                    Ok(())
                } else {
                    Err(ApiStepsError::AssertionFailed(format!(
                        "node '{}' ({}) does not match /{}/",
                        expression, text, pattern
                    )))
                }
            });
        self.report(result)
    }

    /// A single XML or HTML match counts as a slice of one.
    pub fn assert_node_slice_length(&self, format: DataFormat, expression: &str, length: usize) -> Result<()> {
        let result = self.find_node(format, expression).and_then(|node| {
            let actual = match (&node, format) {
                (Node::Seq(items), _) => items.len(),
                (Node::String(_), DataFormat::Xml | DataFormat::Html) => 1,
                _ => {
                    return Err(ApiStepsError::TypeMismatch(format!(
                        "node '{}' is not a slice: {}",
                        expression,
                        node.to_plain_string()
                    )))
                }
            };
            if actual == length {
                Ok(())
            } else {
                Err(ApiStepsError::AssertionFailed(format!(
                    "node '{}' has length {}, expected {}",
                    expression, actual, length
                )))
            }
        });
        self.report(result)
    }

    /// Validates the selected node, as JSON, against a referenced schema.
    pub async fn assert_node_matches_schema(&self, format: DataFormat, expression: &str, source: &str) -> Result<()> {
        let result = match self.find_node(format, expression) {
            Ok(node) => self.reference_schemas.validate(&node.to_json().to_string(), source).await,
            Err(err) => Err(err),
        };
        self.report(result)
    }

    pub async fn assert_response_matches_schema(&self, source: &str) -> Result<()> {
        let result = match self.last_response() {
            Ok(record) => self.reference_schemas.validate(&record.body_text(), source).await,
            Err(err) => Err(err),
        };
        self.report(result)
    }

    /// `schema_template` is rendered first, then used as the schema itself.
    pub async fn assert_response_matches_raw_schema(&self, schema_template: &str) -> Result<()> {
        let result = match (self.render(schema_template), self.last_response()) {
            (Ok(schema), Ok(record)) => self.raw_schemas.validate(&record.body_text(), &schema).await,
            (Err(err), _) | (_, Err(err)) => Err(err),
        };
        self.report(result)
    }

    pub fn assert_body_contains(&self, template: &str) -> Result<()> {
        let result = self.render(template).and_then(|needle| {
            let body = self.last_response()?.body_text();
            if body.contains(&needle) {
                Ok(())
            } else {
                Err(ApiStepsError::AssertionFailed(format!("response body does not contain '{}'", needle)))
            }
        });
        self.report(result)
    }

    /// Stores the node `expression` selects under `key`.
    pub fn save_node(&mut self, format: DataFormat, expression: &str, key: &str) -> Result<()> {
        let node = self.report(self.find_node(format, expression))?;
        self.cache.save(key, Cached::Value(node));
        Ok(())
    }

    pub fn save_header(&mut self, name: &str, key: &str) -> Result<()> {
        let value = self.last_response().and_then(|record| {
            record
                .header(name)
                .map(str::to_string)
                .ok_or_else(|| ApiStepsError::NotFound(format!("header '{}'", name)))
        });
        let value = self.report(value)?;
        self.cache.save(key, Cached::Value(Node::String(value)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::tests::{context_with, CannedDoer};

    const USER: &str = r#"{
        "user": {"id": 17, "name": "Ada", "score": 2.0, "ratio": 2.5, "active": true, "email": "ada@example.com"},
        "names": ["a", "b"],
        "deleted": null
    }"#;

    async fn sent(body: &'static str) -> ApiContext {
        let mut ctx = context_with(CannedDoer::json(body));
        ctx.send_request_with_body_and_headers("GET", "http://api.test/", "").await.unwrap();
        ctx
    }

    #[tokio::test]
    async fn status_format_and_headers() {
        let ctx = sent(USER).await;
        ctx.assert_status_code(200).unwrap();
        assert_eq!(ctx.assert_status_code(404).unwrap_err().error_type(), "assertion_failed");
        ctx.assert_response_format_is(DataFormat::Json).unwrap();
        ctx.assert_response_format_is_not(DataFormat::Xml).unwrap();
        assert!(ctx.assert_response_format_is(DataFormat::Yaml).is_err());
        ctx.assert_header_exists("content-type").unwrap();
        ctx.assert_header_exists("Content-Type").unwrap();
        ctx.assert_header_not_exists("X-Missing").unwrap();
        ctx.assert_header_value("Content-Type", "application/json").unwrap();
        assert!(ctx.assert_header_value("Content-Type", "text/html").is_err());
        ctx.assert_time_between_request_and_response_is_less_than(Duration::from_secs(1)).unwrap();
        assert!(ctx.assert_time_between_request_and_response_is_less_than(Duration::from_millis(1)).is_err());
    }

    #[tokio::test]
    async fn assertions_before_any_request_fail() {
        let ctx = context_with(CannedDoer::json("{}"));
        assert!(ctx.assert_status_code(200).is_err());
        assert!(ctx.assert_node_exists(DataFormat::Json, "a").is_err());
    }

    #[tokio::test]
    async fn node_existence() {
        let ctx = sent(USER).await;
        ctx.assert_node_exists(DataFormat::Json, "user.id").unwrap();
        ctx.assert_node_exists(DataFormat::Json, "deleted").unwrap();
        ctx.assert_node_not_exists(DataFormat::Json, "user.age").unwrap();
        assert!(ctx.assert_node_not_exists(DataFormat::Json, "$.user.name").is_err());
        assert_eq!(ctx.assert_node_not_exists(DataFormat::Json, "").unwrap_err().error_type(), "empty_expression");
        ctx.assert_nodes_exist(DataFormat::Json, "user.id, $.user.name, names").unwrap();
        match ctx.assert_nodes_exist(DataFormat::Json, "user.id, user.age, user.nick") {
            Err(ApiStepsError::NotFound(msg)) => assert_eq!(msg, "user.age, user.nick"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn node_types_follow_the_integer_rule() {
        let ctx = sent(USER).await;
        ctx.assert_node_is_type(DataFormat::Json, "user.id", "number").unwrap();
        ctx.assert_node_is_type(DataFormat::Json, "user.name", "String").unwrap();
        ctx.assert_node_is_type(DataFormat::Json, "names", "array").unwrap();
        ctx.assert_node_is_type(DataFormat::Json, "deleted", "null").unwrap();
        ctx.assert_node_is_not_type(DataFormat::Json, "user", "array").unwrap();
        let err = ctx.assert_node_is_not_type(DataFormat::Json, "user", "object").unwrap_err();
        assert_eq!(err.error_type(), "type_mismatch");
        assert_eq!(
            ctx.assert_node_is_type(DataFormat::Json, "user.id", "integer").unwrap_err().error_type(),
            "invalid_argument"
        );
    }

    #[tokio::test]
    async fn yaml_types() {
        let doer = CannedDoer {
            content_type: "application/yaml",
            ..CannedDoer::json("user:\n  score: 2.0\n  ratio: 2.5\n  id: 3\n")
        };
        let mut ctx = context_with(doer);
        ctx.send_request_with_body_and_headers("GET", "http://api.test/", "").await.unwrap();
        ctx.assert_response_format_is(DataFormat::Yaml).unwrap();
        ctx.assert_node_is_type(DataFormat::Yaml, "$.user.score", "integer").unwrap();
        ctx.assert_node_is_type(DataFormat::Yaml, "$.user.ratio", "float").unwrap();
        ctx.assert_node_is_type(DataFormat::Yaml, "$.user.id", "integer").unwrap();
        ctx.assert_node_is_type(DataFormat::Yaml, "$.user", "mapping").unwrap();
    }

    #[tokio::test]
    async fn node_values() {
        let mut ctx = sent(USER).await;
        ctx.save_value("Ada", "NAME").unwrap();
        ctx.assert_node_is_value(DataFormat::Json, "user.name", "string", "{{.NAME}}").unwrap();
        ctx.assert_node_is_value(DataFormat::Json, "user.id", "int", "17").unwrap();
        ctx.assert_node_is_value(DataFormat::Json, "user.score", "integer", "2").unwrap();
        ctx.assert_node_is_value(DataFormat::Json, "user.ratio", "float", "2.5").unwrap();
        ctx.assert_node_is_value(DataFormat::Json, "user.active", "bool", "true").unwrap();
        ctx.assert_node_is_value(DataFormat::Json, "deleted", "nil", "").unwrap();

        let err = ctx.assert_node_is_value(DataFormat::Json, "user.id", "int", "18").unwrap_err();
        assert_eq!(err.error_type(), "assertion_failed");
        let err = ctx.assert_node_is_value(DataFormat::Json, "user.name", "int", "1").unwrap_err();
        assert_eq!(err.error_type(), "type_mismatch");
        let err = ctx.assert_node_is_value(DataFormat::Json, "user.id", "int", "seventeen").unwrap_err();
        assert_eq!(err.error_type(), "invalid_argument");
        let err = ctx.assert_node_is_value(DataFormat::Json, "user.id", "decimal", "17").unwrap_err();
        assert_eq!(err.error_type(), "invalid_argument");
    }

    #[tokio::test]
    async fn whole_floats_beyond_i64_do_not_compare_as_int() {
        let ctx = sent(r#"{"a": 1e19}"#).await;
        let err = ctx.assert_node_is_value(DataFormat::Json, "a", "int", "9223372036854775807").unwrap_err();
        assert_eq!(err.error_type(), "type_mismatch");
        ctx.assert_node_is_value(DataFormat::Json, "a", "float", "1e19").unwrap();
    }

    #[tokio::test]
    async fn substrings_and_patterns() {
        let ctx = sent(USER).await;
        ctx.assert_node_contains_substring(DataFormat::Json, "user.email", "@example").unwrap();
        assert!(ctx.assert_node_contains_substring(DataFormat::Json, "user.email", "@other").is_err());
        ctx.assert_node_matches_regex(DataFormat::Json, "user.email", r"^[a-z]+@[a-z]+\.com$").unwrap();
        assert!(ctx.assert_node_matches_regex(DataFormat::Json, "user.name", r"^\d+$").is_err());
        assert_eq!(
            ctx.assert_node_matches_regex(DataFormat::Json, "user.name", "(").unwrap_err().error_type(),
            "invalid_argument"
        );
        ctx.assert_body_contains("\"name\": \"Ada\"").unwrap();
        assert!(ctx.assert_body_contains("Grace").is_err());
    }

    #[tokio::test]
    async fn slice_length() {
        let ctx = sent(USER).await;
        ctx.assert_node_slice_length(DataFormat::Json, "names", 2).unwrap();
        let err = ctx.assert_node_slice_length(DataFormat::Json, "names", 3).unwrap_err();
        assert_eq!(err.error_type(), "assertion_failed");
        let err = ctx.assert_node_slice_length(DataFormat::Json, "user.name", 1).unwrap_err();
        assert_eq!(err.error_type(), "type_mismatch");
    }

    #[tokio::test]
    async fn xml_bodies() {
        let doer = CannedDoer {
            content_type: "application/xml",
            ..CannedDoer::json("<users><user><name>Ada</name></user><user><name>Grace</name></user></users>")
        };
        let mut ctx = context_with(doer);
        ctx.send_request_with_body_and_headers("GET", "http://api.test/", "").await.unwrap();
        ctx.assert_response_format_is(DataFormat::Xml).unwrap();
        ctx.assert_node_slice_length(DataFormat::Xml, "//name", 2).unwrap();
        ctx.assert_node_slice_length(DataFormat::Xml, "//user[1]/name", 1).unwrap();
        ctx.assert_node_is_type(DataFormat::Xml, "//user[2]/name", "string").unwrap();
        ctx.save_node(DataFormat::Xml, "//user[2]/name", "SECOND").unwrap();
        assert_eq!(ctx.cache().get_saved("SECOND").unwrap(), Cached::Value(Node::from("Grace")));
    }

    #[tokio::test]
    async fn schemas() {
        let ctx = sent(USER).await;
        let schema = r#"{"type": "object", "required": ["user", "names"]}"#;
        ctx.assert_response_matches_raw_schema(schema).await.unwrap();
        let err = ctx
            .assert_response_matches_raw_schema(r#"{"type": "object", "required": ["missing"]}"#)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "schema_violation");

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("names.json"), r#"{"type": "array", "items": {"type": "string"}}"#).unwrap();
        let ctx = {
            let mut ctx = ApiContext::builder()
                .doer(Box::new(CannedDoer::json(USER)))
                .reference_schemas(Box::new(crate::schema::ReferenceSchemaValidator::new(dir.path())))
                .build()
                .unwrap();
            ctx.send_request_with_body_and_headers("GET", "http://api.test/", "").await.unwrap();
            ctx
        };
        ctx.assert_node_matches_schema(DataFormat::Json, "names", "names.json").await.unwrap();
        let err = ctx.assert_node_matches_schema(DataFormat::Json, "user", "names.json").await.unwrap_err();
        assert_eq!(err.error_type(), "schema_violation");
        let err = ctx.assert_response_matches_schema("absent.json").await.unwrap_err();
        assert_eq!(err.error_type(), "schema_source_unresolved");
    }

    #[tokio::test]
    async fn extraction() {
        let mut ctx = sent(USER).await;
        ctx.save_node(DataFormat::Json, "user.id", "ID").unwrap();
        ctx.save_node(DataFormat::Json, "$.names", "NAMES").unwrap();
        ctx.save_header("Content-Type", "CT").unwrap();
        assert_eq!(ctx.cache().get_saved("ID").unwrap(), Cached::Value(Node::Int(17)));
        assert_eq!(ctx.cache().get_json("NAMES").unwrap(), serde_json::json!(["a", "b"]));
        assert_eq!(ctx.render("{{.CT}} #{{.ID}}").unwrap(), "application/json #17");
        assert_eq!(ctx.render("{{.LAST_HTTP_RESPONSE.body.user.name}}").unwrap(), "Ada");
        assert!(ctx.save_header("X-Missing", "X").is_err());
        assert!(ctx.save_node(DataFormat::Json, "user.age", "AGE").is_err());
        assert!(ctx.cache().get_saved("AGE").is_err());
    }

    #[tokio::test]
    async fn debug_output_does_not_change_errors() {
        let mut ctx = sent(USER).await;
        let quiet = ctx.assert_status_code(500).unwrap_err().to_string();
        ctx.start_debug();
        let loud = ctx.assert_status_code(500).unwrap_err().to_string();
        assert_eq!(quiet, loud);
    }
}
