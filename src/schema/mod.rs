//! JSON Schema validation of documents, with the schema given inline or by
//! reference.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;

use crate::error::{ApiStepsError, Result};

mod checker;

pub use checker::{Checker, FileChecker, UrlChecker};

#[async_trait]
pub trait SchemaValidator: Send + Sync + std::fmt::Debug {
    /// Validates the JSON `document` against the schema named by `source`.
    async fn validate(&self, document: &str, source: &str) -> Result<()>;
}

/// Runs `schema` against `document`, collecting every violation into one
/// error.
pub fn validate_against(schema: &Value, document: &str) -> Result<()> {
    let instance: Value = serde_json::from_str(document)
        .map_err(|e| ApiStepsError::MalformedDocument(format!("document is not JSON: {}", e)))?;
    let validator =
        jsonschema::validator_for(schema).map_err(|e| ApiStepsError::SchemaError(format!("invalid schema: {}", e)))?;

    let violations: Vec<String> = validator
        .iter_errors(&instance)
        .map(|e| {
            let at = e.instance_path.to_string();
            if at.is_empty() { e.to_string() } else { format!("{}: {}", at, e) }
        })
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ApiStepsError::SchemaViolation(violations.join("; ")))
    }
}

fn parse_schema(text: &str, origin: &str) -> Result<Value> {
    serde_json::from_str::<Value>(text)
        .or_else(|_| serde_yaml::from_str::<Value>(text))
        .map_err(|e| ApiStepsError::SchemaError(format!("schema from {} is neither JSON nor YAML: {}", origin, e)))
}

/// The schema is the `source` text itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawSchemaValidator;

#[async_trait]
impl SchemaValidator for RawSchemaValidator {
    async fn validate(&self, document: &str, source: &str) -> Result<()> {
        let schema = parse_schema(source, "inline source")?;
        validate_against(&schema, document)
    }
}

/// The schema lives behind a URL or a file path, relative paths being
/// looked up under `schemas_dir`.
#[derive(Debug)]
pub struct ReferenceSchemaValidator {
    schemas_dir: PathBuf,
    url_checker: Box<dyn Checker>,
    file_checker: Box<dyn Checker>,
    client: Client,
}

impl ReferenceSchemaValidator {
    pub fn new(schemas_dir: impl Into<PathBuf>) -> Self {
        Self::with_checkers(schemas_dir, Box::new(UrlChecker), Box::new(FileChecker))
    }

    pub fn with_checkers(
        schemas_dir: impl Into<PathBuf>,
        url_checker: Box<dyn Checker>,
        file_checker: Box<dyn Checker>,
    ) -> Self {
        Self { schemas_dir: schemas_dir.into(), url_checker, file_checker, client: Client::new() }
    }

    /// Turns `source` into a URL: a valid URL is kept as is, an existing
    /// absolute path or a path under `schemas_dir` becomes `file://`.
    pub fn resolve(&self, source: &str) -> Result<String> {
        let source = source.trim();
        if source.is_empty() {
            return Err(ApiStepsError::SchemaSourceUnresolved("schema source is empty".to_string()));
        }
        if self.url_checker.validate(source).is_ok() {
            return Ok(source.to_string());
        }

        let path = Path::new(source);
        if path.is_absolute() && self.file_checker.validate(source).is_ok() {
            return file_url(path);
        }

        let joined = self.schemas_dir.join(source);
        if self.file_checker.validate(&joined.to_string_lossy()).is_ok() {
            return file_url(&joined);
        }

        Err(ApiStepsError::SchemaSourceUnresolved(format!(
            "'{}' is neither a valid URL nor an existing file (schemas dir: {})",
            source,
            self.schemas_dir.display()
        )))
    }

    async fn load(&self, resolved: &str) -> Result<Value> {
        let url = Url::parse(resolved)
            .map_err(|e| ApiStepsError::SchemaSourceUnresolved(format!("'{}': {}", resolved, e)))?;
        let text = if url.scheme() == "file" {
            let path = url
                .to_file_path()
                .map_err(|_| ApiStepsError::SchemaSourceUnresolved(format!("'{}' is not a local file", resolved)))?;
            tokio::fs::read_to_string(&path).await?
        } else {
            self.client
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| ApiStepsError::TransportError(format!("Failed to fetch schema {}: {}", resolved, e)))?
                .text()
                .await
                .map_err(|e| ApiStepsError::TransportError(format!("Failed to read schema {}: {}", resolved, e)))?
        };
        parse_schema(&text, resolved)
    }
}

fn file_url(path: &Path) -> Result<String> {
    let absolute = if path.is_absolute() { path.to_path_buf() } else { std::env::current_dir()?.join(path) };
    Url::from_file_path(&absolute)
        .map(|u| u.to_string())
        .map_err(|_| ApiStepsError::SchemaSourceUnresolved(format!("'{}' cannot be expressed as a URL", path.display())))
}

#[async_trait]
impl SchemaValidator for ReferenceSchemaValidator {
    async fn validate(&self, document: &str, source: &str) -> Result<()> {
        let resolved = self.resolve(source)?;
        tracing::debug!("Validating against schema {}", resolved);
        let schema = self.load(&resolved).await?;
        validate_against(&schema, document)
    }
}
