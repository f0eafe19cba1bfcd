use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Document formats a response body can be inspected as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
#[strum(ascii_case_insensitive)]
pub enum DataFormat {
    #[strum(to_string = "JSON")]
    Json,
    #[strum(to_string = "YAML", serialize = "yml")]
    Yaml,
    #[strum(to_string = "XML")]
    Xml,
    #[strum(to_string = "HTML")]
    Html,
    #[strum(to_string = "plain text", serialize = "plaintext", serialize = "text")]
    PlainText,
}

impl DataFormat {
    /// Sniffs the format of a response body.
    ///
    /// Order matters: every JSON document is also YAML and every string is a
    /// YAML scalar, so JSON is tried first and YAML only counts when it
    /// decodes into a mapping or sequence.
    pub fn detect(body: &[u8]) -> DataFormat {
        let text = String::from_utf8_lossy(body);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return DataFormat::PlainText;
        }
        if serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
            return DataFormat::Json;
        }
        if trimmed.starts_with('<') {
            let head: String = trimmed.chars().take(256).collect::<String>().to_ascii_lowercase();
            if head.contains("<!doctype html") || head.contains("<html") {
                return DataFormat::Html;
            }
            if sxd_document::parser::parse(trimmed).is_ok() {
                return DataFormat::Xml;
            }
        }
        match serde_yaml::from_str::<serde_yaml::Value>(trimmed) {
            Ok(serde_yaml::Value::Mapping(_)) | Ok(serde_yaml::Value::Sequence(_)) => DataFormat::Yaml,
            _ => DataFormat::PlainText,
        }
    }
}
