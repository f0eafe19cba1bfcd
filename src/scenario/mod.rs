//! The shared context step implementations run against.
//!
//! An [`ApiContext`] lives for one scenario. It owns the scenario cache,
//! the last response and every pluggable capability (HTTP transport, path
//! finders, serializers, schema validators, template engine, debug sink and
//! random source), all swappable through [`ApiContextBuilder`].
//!
//! A scenario moves through these states:
//!
//! 1. fresh after [`ApiContext::reset_state`]: empty cache, no response;
//! 2. optionally one or more requests prepared under cache keys;
//! 3. a request sent, its response buffered as the last response;
//! 4. any number of assertions and extractions against that response.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Cache, Cached, LocalCache};
use crate::config::{self, Settings};
use crate::datagen::Generator;
use crate::debug::{pretty_body, ConsoleDebugger, Debugger};
use crate::error::{ApiStepsError, Result};
use crate::format::DataFormat;
use crate::http::{OutgoingRequest, PreparedRequest, RequestDoer, ReqwestDoer, ResponseRecord};
use crate::schema::{RawSchemaValidator, ReferenceSchemaValidator, SchemaValidator};
use crate::template::{HandlebarsTemplateEngine, TemplateEngine};
use crate::types::Node;

mod assertions;
mod generate;
mod registry;

pub use assertions::ValueKind;
pub use registry::FormatRegistry;

/// Cache key the last response is stored under, so templates can reach
/// it as `{{.LAST_HTTP_RESPONSE.body.id}}`.
pub const LAST_RESPONSE_KEY: &str = "LAST_HTTP_RESPONSE";

#[derive(Debug)]
pub struct ApiContext {
    settings: Settings,
    cache: Box<dyn Cache>,
    doer: Box<dyn RequestDoer>,
    debugger: Box<dyn Debugger>,
    templates: Box<dyn TemplateEngine>,
    formats: FormatRegistry,
    reference_schemas: Box<dyn SchemaValidator>,
    raw_schemas: Box<dyn SchemaValidator>,
    generator: Generator,
    last_response: Option<Arc<ResponseRecord>>,
}

#[derive(Debug, Default)]
pub struct ApiContextBuilder {
    settings: Settings,
    cache: Option<Box<dyn Cache>>,
    doer: Option<Box<dyn RequestDoer>>,
    debugger: Option<Box<dyn Debugger>>,
    templates: Option<Box<dyn TemplateEngine>>,
    formats: Option<FormatRegistry>,
    reference_schemas: Option<Box<dyn SchemaValidator>>,
    raw_schemas: Option<Box<dyn SchemaValidator>>,
    generator: Option<Generator>,
}

impl ApiContextBuilder {
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn cache(mut self, cache: Box<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn doer(mut self, doer: Box<dyn RequestDoer>) -> Self {
        self.doer = Some(doer);
        self
    }

    pub fn debugger(mut self, debugger: Box<dyn Debugger>) -> Self {
        self.debugger = Some(debugger);
        self
    }

    pub fn templates(mut self, templates: Box<dyn TemplateEngine>) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = Some(formats);
        self
    }

    pub fn reference_schemas(mut self, validator: Box<dyn SchemaValidator>) -> Self {
        self.reference_schemas = Some(validator);
        self
    }

    pub fn raw_schemas(mut self, validator: Box<dyn SchemaValidator>) -> Self {
        self.raw_schemas = Some(validator);
        self
    }

    pub fn generator(mut self, generator: Generator) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Fills every capability left unset with the default built from the
    /// settings.
    pub fn build(self) -> Result<ApiContext> {
        let settings = self.settings;
        let doer = match self.doer {
            Some(doer) => doer,
            None => Box::new(ReqwestDoer::new(&settings)?),
        };
        Ok(ApiContext {
            cache: self.cache.unwrap_or_else(|| Box::new(LocalCache::new())),
            doer,
            debugger: self.debugger.unwrap_or_else(|| Box::new(ConsoleDebugger::new(settings.debug))),
            templates: self.templates.unwrap_or_else(|| Box::new(HandlebarsTemplateEngine::new())),
            formats: self.formats.unwrap_or_default(),
            reference_schemas: self
                .reference_schemas
                .unwrap_or_else(|| Box::new(ReferenceSchemaValidator::new(settings.schemas_dir.clone()))),
            raw_schemas: self.raw_schemas.unwrap_or_else(|| Box::new(RawSchemaValidator)),
            generator: self.generator.unwrap_or_else(|| Generator::from_settings(settings.seed)),
            last_response: None,
            settings,
        })
    }
}

impl ApiContext {
    pub fn builder() -> ApiContextBuilder {
        ApiContextBuilder::default()
    }

    pub fn new(settings: Settings) -> Result<Self> {
        Self::builder().settings(settings).build()
    }

    /// Loads `.env` files from the working directory, then builds a context
    /// from `APISTEPS_*` variables.
    pub fn from_env() -> Result<Self> {
        config::load_env_files(Path::new("."), false);
        Self::new(Settings::from_env()?)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> &dyn Cache {
        self.cache.as_ref()
    }

    pub fn cache_mut(&mut self) -> &mut dyn Cache {
        self.cache.as_mut()
    }

    pub fn debugger(&self) -> &dyn Debugger {
        self.debugger.as_ref()
    }

    /// Fails until a request has been sent in this scenario.
    pub fn last_response(&self) -> Result<&ResponseRecord> {
        self.last_response
            .as_deref()
            .ok_or_else(|| ApiStepsError::AssertionFailed("no request has been sent in this scenario".to_string()))
    }

    /// Back to a fresh scenario: empty cache, no response, debug as given.
    pub fn reset_state(&mut self, initially_on: bool) {
        self.cache.reset();
        self.debugger.reset(initially_on);
        self.last_response = None;
        tracing::debug!("Scenario state reset (debug: {})", initially_on);
    }

    pub fn start_debug(&mut self) {
        self.debugger.turn_on();
    }

    pub fn stop_debug(&mut self) {
        self.debugger.turn_off();
    }

    /// Sleeps for `duration`. Not cancellable.
    pub async fn wait(&self, duration: Duration) {
        self.debugger.print(&format!("waiting {:?}", duration));
        tokio::time::sleep(duration).await;
    }

    /// Renders `template` against the current cache contents.
    pub fn render(&self, template: &str) -> Result<String> {
        self.templates.replace(template, &self.cache.all())
    }

    /// Renders `value_template` and stores the result under `key`.
    pub fn save_value(&mut self, value_template: &str, key: &str) -> Result<()> {
        let value = self.render(value_template)?;
        self.cache.save(key, Cached::Value(Node::String(value)));
        Ok(())
    }

    /// Decodes a JSON or YAML document, whichever `text` is.
    fn decode(&self, text: &str) -> Result<Node> {
        let bytes = text.trim().as_bytes();
        match DataFormat::detect(bytes) {
            format @ (DataFormat::Json | DataFormat::Yaml) => self.formats.serializer(format)?.deserialize(bytes),
            other => Err(ApiStepsError::MalformedDocument(format!(
                "expected a JSON or YAML document, got {}: {}",
                other, text
            ))),
        }
    }

    /// Decodes a flat mapping into name/value pairs. Blank text is no pairs.
    fn decode_pairs(&self, text: &str) -> Result<Vec<(String, String)>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        match self.decode(text)? {
            Node::Map(map) => Ok(map.into_iter().map(|(k, v)| (k, v.to_plain_string())).collect()),
            Node::Null => Ok(Vec::new()),
            other => Err(ApiStepsError::InvalidArgument(format!(
                "expected a mapping of names to values, got {}",
                other.to_plain_string()
            ))),
        }
    }

    /// Sends a one-off request. `spec_template` renders to a JSON or YAML
    /// mapping with optional `body` and `headers` entries; a string body is
    /// sent verbatim, anything else as JSON.
    pub async fn send_request_with_body_and_headers(
        &mut self,
        method: &str,
        url_template: &str,
        spec_template: &str,
    ) -> Result<()> {
        let url = self.render(url_template)?;
        let mut request = PreparedRequest::new(method, &url)?;

        let rendered = self.render(spec_template)?;
        if !rendered.trim().is_empty() {
            let spec = match self.decode(&rendered)? {
                Node::Map(map) => map,
                _ => {
                    return Err(ApiStepsError::InvalidArgument(
                        "request spec must be a mapping with `body` and `headers`".to_string(),
                    ))
                }
            };
            match spec.get("headers") {
                Some(Node::Map(headers)) => {
                    let pairs: Vec<(String, String)> =
                        headers.iter().map(|(k, v)| (k.clone(), v.to_plain_string())).collect();
                    request.set_headers(&pairs)?;
                }
                None | Some(Node::Null) => {}
                Some(_) => {
                    return Err(ApiStepsError::InvalidArgument("request `headers` must be a mapping".to_string()))
                }
            }
            match spec.get("body") {
                None | Some(Node::Null) => {}
                Some(Node::String(text)) => request.set_body(text.clone()),
                Some(other) => request.set_body(self.formats.serializer(DataFormat::Json)?.serialize(other)?),
            }
        }

        let outgoing = request.build()?;
        self.send(outgoing).await
    }

    /// Stores a new request under `key` for later steps to fill in.
    pub fn prepare_request(&mut self, method: &str, url_template: &str, key: &str) -> Result<()> {
        let url = self.render(url_template)?;
        let request = PreparedRequest::new(method, &url)?;
        self.cache.save(key, Cached::Request(request));
        Ok(())
    }

    /// The request stored under `key`.
    pub fn prepared(&self, key: &str) -> Result<PreparedRequest> {
        match self.cache.get_saved(key)? {
            Cached::Request(request) => Ok(request),
            _ => Err(ApiStepsError::CacheTypeMismatch(format!("'{}' does not hold a prepared request", key))),
        }
    }

    fn update_prepared(&mut self, key: &str, update: impl FnOnce(&mut PreparedRequest) -> Result<()>) -> Result<()> {
        let mut request = self.prepared(key)?;
        update(&mut request)?;
        self.cache.save(key, Cached::Request(request));
        Ok(())
    }

    pub fn set_request_headers(&mut self, key: &str, headers_template: &str) -> Result<()> {
        let pairs = self.decode_pairs(&self.render(headers_template)?)?;
        self.update_prepared(key, |request| request.set_headers(&pairs))
    }

    pub fn set_request_body(&mut self, key: &str, body_template: &str) -> Result<()> {
        let body = self.render(body_template)?;
        self.update_prepared(key, |request| {
            request.set_body(body);
            Ok(())
        })
    }

    pub fn set_request_form(&mut self, key: &str, form_template: &str) -> Result<()> {
        let pairs = self.decode_pairs(&self.render(form_template)?)?;
        self.update_prepared(key, |request| {
            request.set_form(pairs);
            Ok(())
        })
    }

    pub fn set_request_cookies(&mut self, key: &str, cookies_template: &str) -> Result<()> {
        let pairs = self.decode_pairs(&self.render(cookies_template)?)?;
        self.update_prepared(key, |request| {
            request.set_cookies(pairs);
            Ok(())
        })
    }

    pub fn set_request_query(&mut self, key: &str, query_template: &str) -> Result<()> {
        let pairs = self.decode_pairs(&self.render(query_template)?)?;
        self.update_prepared(key, |request| {
            request.set_query(pairs);
            Ok(())
        })
    }

    /// Sends the request stored under `key`. The request stays cached.
    pub async fn send_prepared(&mut self, key: &str) -> Result<()> {
        let outgoing = self.prepared(key)?.build()?;
        self.send(outgoing).await
    }

    async fn send(&mut self, request: OutgoingRequest) -> Result<()> {
        self.debugger.print(&format!("{} {}", request.method, request.url));
        let record = Arc::new(self.doer.do_request(request).await?);
        self.debugger.print(&format!(
            "status {} after {:?}\n{}",
            record.status,
            record.duration,
            pretty_body(&record.body_text())
        ));
        self.cache.save(LAST_RESPONSE_KEY, Cached::Response(Arc::clone(&record)));
        self.last_response = Some(record);
        Ok(())
    }
}
