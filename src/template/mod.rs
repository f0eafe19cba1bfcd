//! Placeholder substitution for request templates and expected values.
//!
//! Templates are written Go-style (`{{.USER_ID}}`, `{{.USER.name}}`) and
//! rendered by `handlebars` in strict mode against a snapshot of the
//! scenario cache.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};

use handlebars::{
    handlebars_helper, Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderErrorReason,
};
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::cache::Cached;
use crate::error::{ApiStepsError, Result};

pub trait TemplateEngine: Send + Sync + std::fmt::Debug {
    /// Renders `template` with every cache entry in scope. A placeholder that
    /// names a missing key fails the whole render.
    fn replace(&self, template: &str, storage: &HashMap<String, Cached>) -> Result<String>;
}

/// Compiled templates kept before the registry is flushed.
const MAX_COMPILED: usize = 256;

#[derive(Debug)]
struct Registry {
    handlebars: Handlebars<'static>,
    compiled: HashSet<String>,
}

#[derive(Debug)]
pub struct HandlebarsTemplateEngine {
    registry: Mutex<Registry>,
}

impl Default for HandlebarsTemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

handlebars_helper!(upper: |s: str| s.to_uppercase());
handlebars_helper!(lower: |s: str| s.to_lowercase());
handlebars_helper!(json: |v: Json| serde_json::to_string(v).unwrap_or_default());

/// `{{format_time .CREATED "%Y-%m-%d"}}`: reformats a stored RFC 3339
/// timestamp with a chrono format string.
fn format_time(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let raw = h
        .param(0)
        .and_then(|p| p.value().as_str())
        .ok_or(RenderErrorReason::ParamNotFoundForIndex("format_time", 0))?;
    let pattern = h
        .param(1)
        .and_then(|p| p.value().as_str())
        .ok_or(RenderErrorReason::ParamNotFoundForIndex("format_time", 1))?;
    let parsed = chrono::DateTime::parse_from_rfc3339(raw)
        .map_err(|e| RenderErrorReason::Other(format!("format_time: '{}' is not RFC 3339: {}", raw, e)))?;
    let mut formatted = String::new();
    write!(formatted, "{}", parsed.format(pattern))
        .map_err(|_| RenderErrorReason::Other(format!("format_time: invalid format '{}'", pattern)))?;
    out.write(&formatted)?;
    Ok(())
}

impl HandlebarsTemplateEngine {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.register_helper("upper", Box::new(upper));
        handlebars.register_helper("lower", Box::new(lower));
        handlebars.register_helper("json", Box::new(json));
        handlebars.register_helper("format_time", Box::new(format_time));
        Self { registry: Mutex::new(Registry { handlebars, compiled: HashSet::new() }) }
    }

    fn render(&self, template: &str, data: &Value) -> Result<String> {
        let tpl = rewrite_go_paths(template);
        let mut hasher = DefaultHasher::new();
        tpl.hash(&mut hasher);
        let id = format!("tpl_{:x}", hasher.finish());

        let mut registry = self.registry.lock();
        if !registry.compiled.contains(&id) {
            if registry.compiled.len() >= MAX_COMPILED {
                registry.handlebars.clear_templates();
                registry.compiled.clear();
            }
            registry
                .handlebars
                .register_template_string(&id, &tpl)
                .map_err(|e| ApiStepsError::TemplateError(format!("compile error in '{}': {}", template, e)))?;
            registry.compiled.insert(id.clone());
        }

        registry
            .handlebars
            .render(&id, data)
            .map_err(|e| ApiStepsError::TemplateError(format!("render error in '{}': {}", template, e)))
    }
}

impl TemplateEngine for HandlebarsTemplateEngine {
    fn replace(&self, template: &str, storage: &HashMap<String, Cached>) -> Result<String> {
        if !template.contains("{{") {
            return Ok(template.to_string());
        }
        let data: Map<String, Value> = storage.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
        self.render(template, &Value::Object(data))
    }
}

/// Drops the leading dot of Go-style path arguments inside every `{{ }}`
/// block; `{{.}}` becomes `{{this}}`. Quoted literals are left alone.
fn rewrite_go_paths(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };
        out.push_str("{{");
        out.push_str(&rewrite_mustache(&after[..close]));
        out.push_str("}}");
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    out
}

fn rewrite_mustache(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            out.push(c);
            prev = Some(c);
            continue;
        }
        let at_token_start = prev.map_or(true, |p| p.is_whitespace() || matches!(p, '(' | '{' | '~' | '#' | '^' | '&'));
        match c {
            '"' | '\'' => {
                quote = Some(c);
                out.push(c);
            }
            '.' if at_token_start => match chars.peek() {
                Some(n) if n.is_alphanumeric() || *n == '_' => {}
                None => out.push_str("this"),
                Some(n) if n.is_whitespace() || matches!(n, ')' | '}' | '~') => out.push_str("this"),
                _ => out.push(c),
            },
            _ => out.push(c),
        }
        prev = Some(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Node;

    fn storage(pairs: &[(&str, Node)]) -> HashMap<String, Cached> {
        pairs.iter().map(|(k, v)| (k.to_string(), Cached::Value(v.clone()))).collect()
    }

    #[test]
    fn substitutes_go_style_placeholders() {
        let engine = HandlebarsTemplateEngine::new();
        let out = engine.replace("abc {{.NAME}}", &storage(&[("NAME", Node::from("xyz"))])).unwrap();
        assert_eq!(out, "abc xyz");
    }

    #[test]
    fn compiled_templates_are_bounded() {
        let engine = HandlebarsTemplateEngine::new();
        let data = storage(&[("NAME", Node::from("xyz"))]);
        for i in 0..MAX_COMPILED + 10 {
            let out = engine.replace(&format!("{} {{{{.NAME}}}}", i), &data).unwrap();
            assert_eq!(out, format!("{} xyz", i));
        }
        let registry = engine.registry.lock();
        assert!(registry.compiled.len() <= MAX_COMPILED);
        assert_eq!(registry.handlebars.get_templates().len(), registry.compiled.len());
    }

    #[test]
    fn missing_key_is_an_error() {
        let engine = HandlebarsTemplateEngine::new();
        let err = engine.replace("abc {{.NAME}}", &HashMap::new()).unwrap_err();
        assert_eq!(err.error_type(), "template_error");
    }

    #[test]
    fn nested_keys_and_plain_handlebars() {
        let engine = HandlebarsTemplateEngine::new();
        let user: Node = serde_json::json!({"name": "Ada", "tags": ["a", "b"]}).into();
        let data = storage(&[("USER", user)]);
        assert_eq!(engine.replace("{{.USER.name}}", &data).unwrap(), "Ada");
        assert_eq!(engine.replace("{{USER.name}}", &data).unwrap(), "Ada");
        assert_eq!(engine.replace("{{#each .USER.tags}}[{{.}}]{{/each}}", &data).unwrap(), "[a][b]");
    }

    #[test]
    fn output_is_not_html_escaped() {
        let engine = HandlebarsTemplateEngine::new();
        let data = storage(&[("Q", Node::from("a<b & \"c\""))]);
        assert_eq!(engine.replace("{{.Q}}", &data).unwrap(), "a<b & \"c\"");
    }

    #[test]
    fn helpers() {
        let engine = HandlebarsTemplateEngine::new();
        let user: Node = serde_json::json!({"id": 7}).into();
        let data = storage(&[
            ("NAME", Node::from("Ada")),
            ("AT", Node::from("2024-03-01T10:20:30+00:00")),
            ("USER", user),
        ]);
        assert_eq!(engine.replace("{{upper .NAME}}-{{lower .NAME}}", &data).unwrap(), "ADA-ada");
        assert_eq!(engine.replace("{{format_time .AT \"%Y/%m/%d\"}}", &data).unwrap(), "2024/03/01");
        assert_eq!(engine.replace("{{json .USER}}", &data).unwrap(), r#"{"id":7}"#);
        assert!(engine.replace("{{format_time .NAME \"%Y\"}}", &data).is_err());
    }

    #[test]
    fn rewrite_leaves_literals_and_parents_alone() {
        assert_eq!(rewrite_go_paths("{{.A}} {{ .B.c }}"), "{{A}} {{ B.c }}");
        assert_eq!(rewrite_go_paths("{{lower \".X\"}}"), "{{lower \".X\"}}");
        assert_eq!(rewrite_go_paths("{{../up}}"), "{{../up}}");
        assert_eq!(rewrite_go_paths("{{.}}"), "{{this}}");
        assert_eq!(rewrite_go_paths("no braces {{ here"), "no braces {{ here");
    }

    #[test]
    fn text_without_placeholders_passes_through() {
        let engine = HandlebarsTemplateEngine::new();
        assert_eq!(engine.replace("{\"a\": 1}", &HashMap::new()).unwrap(), "{\"a\": 1}");
    }
}
