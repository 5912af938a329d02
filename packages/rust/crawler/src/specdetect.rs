//! Opportunistic spec-format detection for non-HTML fetch results.
//!
//! A small closed registry of formats, probed in fixed priority order via a
//! `can_parse` capability check. The shipped format is OpenAPI; the set is
//! not meant to grow without a recompile, so composition over a Vec of
//! trait objects is all that is needed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;
use url::Url;

use docharvest_shared::{HarvestError, Result};

/// URL suffixes worth probing at all.
const SPEC_SUFFIXES: &[&str] = &[".json", ".yaml", ".yml"];

// ---------------------------------------------------------------------------
// Operations document
// ---------------------------------------------------------------------------

/// One operation derived from a parsed spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecOperation {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub method: String,
    pub path: String,
    /// JSON Schema object describing the operation's parameters.
    pub parameters: Value,
}

/// Derived artifact emitted for a recognized spec document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationsDoc {
    /// Format tag, e.g. "openapi".
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub version: String,
    pub operations: Vec<SpecOperation>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// A pluggable spec format: probe with `can_parse`, then `parse`.
pub trait SpecFormat: Send + Sync {
    fn name(&self) -> &'static str;
    fn can_parse(&self, bytes: &[u8], url: &Url) -> bool;
    fn parse(&self, bytes: &[u8], url: &Url) -> Result<OperationsDoc>;
}

/// Registered formats, probed in fixed priority order.
pub struct SpecRegistry {
    formats: Vec<Box<dyn SpecFormat>>,
}

impl Default for SpecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecRegistry {
    pub fn new() -> Self {
        Self {
            formats: vec![Box::new(OpenApiFormat)],
        }
    }

    /// Quick suffix check before any body inspection.
    pub fn url_is_candidate(url: &Url) -> bool {
        let path = url.path().to_lowercase();
        SPEC_SUFFIXES.iter().any(|s| path.ends_with(s))
    }

    /// First registered format that claims the document, if any.
    pub fn detect(&self, bytes: &[u8], url: &Url) -> Option<&dyn SpecFormat> {
        if !Self::url_is_candidate(url) {
            return None;
        }
        self.formats
            .iter()
            .map(|f| f.as_ref())
            .find(|f| f.can_parse(bytes, url))
    }
}

// ---------------------------------------------------------------------------
// OpenAPI
// ---------------------------------------------------------------------------

/// OpenAPI/Swagger JSON documents. YAML bodies are suffix candidates but do
/// not parse here; `can_parse` simply answers no for them.
pub struct OpenApiFormat;

const HTTP_METHODS: &[&str] = &["get", "post", "put", "delete", "patch"];

impl SpecFormat for OpenApiFormat {
    fn name(&self) -> &'static str {
        "openapi"
    }

    fn can_parse(&self, bytes: &[u8], _url: &Url) -> bool {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => map.contains_key("openapi") || map.contains_key("swagger"),
            _ => false,
        }
    }

    fn parse(&self, bytes: &[u8], url: &Url) -> Result<OperationsDoc> {
        let spec: Value = serde_json::from_slice(bytes)
            .map_err(|e| HarvestError::parse(format!("{url}: invalid spec JSON: {e}")))?;

        let mut operations = Vec::new();

        if let Some(paths) = spec.get("paths").and_then(Value::as_object) {
            for (path, methods) in paths {
                let Some(methods) = methods.as_object() else {
                    continue;
                };
                for (method, op) in methods {
                    if !HTTP_METHODS.contains(&method.to_lowercase().as_str()) {
                        continue;
                    }

                    let name = op
                        .get("operationId")
                        .and_then(Value::as_str)
                        .map(String::from)
                        .unwrap_or_else(|| format!("{method}_{path}"));
                    let description = op
                        .get("summary")
                        .or_else(|| op.get("description"))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();

                    operations.push(SpecOperation {
                        name,
                        description,
                        method: method.to_uppercase(),
                        path: path.clone(),
                        parameters: parameters_schema(op),
                    });
                }
            }
        }

        debug!(%url, operations = operations.len(), "parsed OpenAPI spec");

        Ok(OperationsDoc {
            kind: "openapi".into(),
            title: spec
                .pointer("/info/title")
                .and_then(Value::as_str)
                .unwrap_or("API")
                .to_string(),
            version: spec
                .pointer("/info/version")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            operations,
        })
    }
}

/// Assemble a JSON Schema object from path/query parameters and the JSON
/// request body properties.
fn parameters_schema(op: &Value) -> Value {
    let mut properties = Map::new();
    let mut required: Vec<Value> = Vec::new();

    if let Some(params) = op.get("parameters").and_then(Value::as_array) {
        for param in params {
            let Some(name) = param.get("name").and_then(Value::as_str) else {
                continue;
            };
            if param.get("required").and_then(Value::as_bool).unwrap_or(false) {
                required.push(json!(name));
            }

            let schema = param.get("schema").cloned().unwrap_or_default();
            properties.insert(
                name.to_string(),
                json!({
                    "type": schema.get("type").and_then(Value::as_str).unwrap_or("string"),
                    "description": param.get("description").and_then(Value::as_str).unwrap_or(""),
                }),
            );
        }
    }

    if let Some(schema) = op.pointer("/requestBody/content/application~1json/schema") {
        let body_required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        if let Some(body_props) = schema.get("properties").and_then(Value::as_object) {
            for (prop_name, prop_def) in body_props {
                properties.insert(prop_name.clone(), prop_def.clone());
                if body_required.contains(&prop_name.as_str()) {
                    required.push(json!(prop_name));
                }
            }
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
