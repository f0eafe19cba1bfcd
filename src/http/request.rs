use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, COOKIE};
use reqwest::{Method, Url};
use serde_json::Value;

use crate::error::{ApiStepsError, Result};

use super::response::headers_to_json;

/// A request whose parts are still being filled in by steps.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

/// A fully built request, ready for a [`super::RequestDoer`].
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub fn parse_method(method: &str) -> Result<Method> {
    let upper = method.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return Err(ApiStepsError::InvalidArgument("HTTP method cannot be empty".to_string()));
    }
    Method::from_bytes(upper.as_bytes())
        .map_err(|e| ApiStepsError::InvalidArgument(format!("Invalid HTTP method `{method}`: {e}")))
}

fn header_entry(key: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let key = key.trim();
    if key.is_empty() {
        return Err(ApiStepsError::InvalidArgument("Header key is empty".to_string()));
    }
    let name = HeaderName::from_bytes(key.as_bytes())
        .map_err(|e| ApiStepsError::InvalidArgument(format!("Invalid header key `{key}`: {e}")))?;
    let value = HeaderValue::from_str(value.trim())
        .map_err(|e| ApiStepsError::InvalidArgument(format!("Invalid header value `{value}`: {e}")))?;
    Ok((name, value))
}

impl PreparedRequest {
    pub fn new(method: &str, url: &str) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ApiStepsError::InvalidArgument("Request URL cannot be empty".to_string()));
        }
        Ok(Self {
            method: parse_method(method)?,
            url: url.to_string(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            form: Vec::new(),
            cookies: Vec::new(),
            body: None,
        })
    }

    /// Adds or replaces headers. Existing headers with other names stay.
    pub fn set_headers(&mut self, pairs: &[(String, String)]) -> Result<()> {
        for (key, value) in pairs {
            let (name, value) = header_entry(key, value)?;
            self.headers.insert(name, value);
        }
        Ok(())
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = Some(body.into());
    }

    pub fn set_form(&mut self, pairs: Vec<(String, String)>) {
        self.form = pairs;
    }

    pub fn set_cookies(&mut self, pairs: Vec<(String, String)>) {
        self.cookies = pairs;
    }

    pub fn set_query(&mut self, pairs: Vec<(String, String)>) {
        self.query = pairs;
    }

    pub fn build(&self) -> Result<OutgoingRequest> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| ApiStepsError::InvalidArgument(format!("Invalid URL `{}`: {e}", self.url)))?;
        if !self.query.is_empty() {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                query_pairs.append_pair(key, value);
            }
        }

        let mut headers = self.headers.clone();
        if !self.cookies.is_empty() {
            let cookie_line = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            let (name, value) = header_entry(COOKIE.as_str(), &cookie_line)?;
            headers.insert(name, value);
        }

        let body = match (&self.body, self.form.is_empty()) {
            (Some(body), _) => body.clone(),
            (None, false) => {
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"));
                }
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(self.form.iter())
                    .finish();
                Bytes::from(encoded)
            }
            (None, true) => Bytes::new(),
        };

        Ok(OutgoingRequest { method: self.method.clone(), url, headers, body })
    }

    pub fn to_json(&self) -> Value {
        let body = self
            .body
            .as_ref()
            .map(|b| Value::String(String::from_utf8_lossy(b).into_owned()))
            .unwrap_or(Value::Null);
        serde_json::json!({
            "method": self.method.as_str(),
            "url": self.url,
            "headers": headers_to_json(&self.headers),
            "body": body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn method_is_normalised() {
        assert_eq!(parse_method(" get ").unwrap(), Method::GET);
        assert!(parse_method("").is_err());
        assert!(parse_method("GE T").is_err());
    }

    #[test]
    fn build_appends_query_and_cookies() {
        let mut req = PreparedRequest::new("GET", "http://localhost:8080/users?page=1").unwrap();
        req.set_query(pairs(&[("limit", "10")]));
        req.set_cookies(pairs(&[("sid", "abc"), ("theme", "dark")]));
        let out = req.build().unwrap();
        assert_eq!(out.url.as_str(), "http://localhost:8080/users?page=1&limit=10");
        assert_eq!(out.headers.get(COOKIE).unwrap(), "sid=abc; theme=dark");
        assert!(out.body.is_empty());
    }

    #[test]
    fn form_becomes_urlencoded_body_unless_body_is_set() {
        let mut req = PreparedRequest::new("POST", "http://localhost/login").unwrap();
        req.set_form(pairs(&[("user", "ada lovelace"), ("pass", "x&y")]));
        let out = req.build().unwrap();
        assert_eq!(out.body, Bytes::from("user=ada+lovelace&pass=x%26y"));
        assert_eq!(out.headers.get(CONTENT_TYPE).unwrap(), "application/x-www-form-urlencoded");

        req.set_body(r#"{"raw":true}"#);
        let out = req.build().unwrap();
        assert_eq!(out.body, Bytes::from(r#"{"raw":true}"#));
    }

    #[test]
    fn headers_overwrite_by_name() {
        let mut req = PreparedRequest::new("GET", "http://localhost/").unwrap();
        req.set_headers(&pairs(&[("Content-Type", "text/plain"), ("X-Trace", "1")])).unwrap();
        req.set_headers(&pairs(&[("content-type", "application/json")])).unwrap();
        assert_eq!(req.headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(req.headers.len(), 2);
        assert!(req.set_headers(&pairs(&[("", "x")])).is_err());
    }

    #[test]
    fn invalid_url_is_reported_at_build_time() {
        let req = PreparedRequest::new("GET", "not a url").unwrap();
        assert!(matches!(req.build(), Err(ApiStepsError::InvalidArgument(_))));
    }
}
