use std::path::Path;

use reqwest::Url;

use crate::error::{ApiStepsError, Result};

/// Accepts or rejects a candidate schema location.
pub trait Checker: Send + Sync + std::fmt::Debug {
    fn validate(&self, candidate: &str) -> Result<()>;
}

/// Succeeds when the candidate names an existing regular file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileChecker;

impl Checker for FileChecker {
    fn validate(&self, candidate: &str) -> Result<()> {
        if Path::new(candidate).is_file() {
            Ok(())
        } else {
            Err(ApiStepsError::InvalidArgument(format!("'{}' is not an existing file", candidate)))
        }
    }
}

/// Succeeds on absolute `http` and `https` URLs, and on `file` URLs
/// naming an existing file.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlChecker;

impl Checker for UrlChecker {
    fn validate(&self, candidate: &str) -> Result<()> {
        let url = Url::parse(candidate)
            .map_err(|e| ApiStepsError::InvalidArgument(format!("'{}' is not a URL: {}", candidate, e)))?;
        match url.scheme() {
            "http" | "https" if url.host_str().is_some() => Ok(()),
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| ApiStepsError::InvalidArgument(format!("'{}' is not a local file", candidate)))?;
                FileChecker.validate(&path.to_string_lossy())
            }
            scheme => Err(ApiStepsError::InvalidArgument(format!(
                "'{}' has unsupported scheme '{}'",
                candidate, scheme
            ))),
        }
    }
}
