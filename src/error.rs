use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiStepsError {
    #[error("Missing cache key: {0}")]
    MissingKey(String),

    #[error("Cache type mismatch: {0}")]
    CacheTypeMismatch(String),

    #[error("Empty path expression")]
    EmptyExpression,

    #[error("Malformed expression: {0}")]
    MalformedExpression(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Node not found: {0}")]
    NotFound(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Schema source could not be resolved: {0}")]
    SchemaSourceUnresolved(String),

    #[error("Schema validation failed: {0}")]
    SchemaViolation(String),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Template error: {0}")]
    TemplateError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl ApiStepsError {
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiStepsError::MissingKey(_) => "missing_key",
            ApiStepsError::CacheTypeMismatch(_) => "cache_type_mismatch",
            ApiStepsError::EmptyExpression => "empty_expression",
            ApiStepsError::MalformedExpression(_) => "malformed_expression",
            ApiStepsError::MalformedDocument(_) => "malformed_document",
            ApiStepsError::NotFound(_) => "not_found",
            ApiStepsError::TypeMismatch(_) => "type_mismatch",
            ApiStepsError::AssertionFailed(_) => "assertion_failed",
            ApiStepsError::SchemaSourceUnresolved(_) => "schema_source_unresolved",
            ApiStepsError::SchemaViolation(_) => "schema_violation",
            ApiStepsError::SchemaError(_) => "schema_error",
            ApiStepsError::TransportError(_) => "transport_error",
            ApiStepsError::TemplateError(_) => "template_error",
            ApiStepsError::InvalidArgument(_) => "invalid_argument",
            ApiStepsError::ConfigError(_) => "config_error",
            ApiStepsError::IoError(_) => "io_error",
            ApiStepsError::JsonError(_) => "json_error",
            ApiStepsError::YamlError(_) => "yaml_error",
        }
    }

    /// True for failures that mean "the expression was fine but nothing matched".
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiStepsError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ApiStepsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_type_mapping_basic() {
        assert_eq!(ApiStepsError::MissingKey("x".into()).error_type(), "missing_key");
        assert_eq!(ApiStepsError::EmptyExpression.error_type(), "empty_expression");
        assert_eq!(ApiStepsError::SchemaViolation("x".into()).error_type(), "schema_violation");
    }

    #[test]
    fn not_found_is_distinguishable() {
        assert!(ApiStepsError::NotFound("a.b".into()).is_not_found());
        assert!(!ApiStepsError::MalformedDocument("eof".into()).is_not_found());
    }

    #[test]
    fn messages_name_the_cause() {
        let err = ApiStepsError::MissingKey("USER_ID".into());
        assert_eq!(err.to_string(), "Missing cache key: USER_ID");
    }
}
