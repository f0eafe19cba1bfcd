use std::time::Duration;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value;

/// The last request/response pair.
///
/// The body is read into memory once when the response arrives, so any
/// number of assertion steps can inspect the same bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRecord {
    pub method: Method,
    pub url: String,
    pub request_headers: HeaderMap,
    pub request_body: Bytes,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub duration: Duration,
}

pub fn headers_to_json(headers: &HeaderMap) -> Value {
    let mut map = serde_json::Map::new();
    for (name, value) in headers {
        map.insert(name.as_str().to_string(), Value::String(value.to_str().unwrap_or("<binary>").to_string()));
    }
    Value::Object(map)
}

impl ResponseRecord {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn to_json(&self) -> Value {
        let body_text = self.body_text();
        let body = serde_json::from_str(&body_text).unwrap_or(Value::String(body_text));
        serde_json::json!({
            "status": self.status,
            "headers": headers_to_json(&self.headers),
            "body": body,
        })
    }
}
