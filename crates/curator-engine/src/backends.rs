use std::collections::BTreeMap;
use std::time::Duration;

use curator_contracts::critique::RawReply;
use curator_contracts::error::CritiqueError;
use curator_contracts::models::{BackendId, BackendKind, LOCAL_PROVIDER};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::fetch::InlineImage;
use crate::prompt::OutputSchema;

pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(3);
const LOCAL_DISCOVERY_PATHS: &[&str] = &["/models", "/api/ai/models", "/api/tags"];

#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    /// Model name without provider prefix.
    pub model: String,
    pub prompt: String,
    pub images: Vec<InlineImage>,
    pub output: OutputSchema,
}

pub trait CritiqueBackend: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, request: &BackendRequest) -> Result<RawReply, CritiqueError>;
}

#[derive(Default)]
pub struct BackendRegistry {
    backends: BTreeMap<String, Box<dyn CritiqueBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hosted and local backends built from `config`.
    pub fn from_config(config: &EngineConfig) -> anyhow::Result<Self> {
        let mut registry = Self::new();
        registry.register(HostedBackend::new(config)?);
        registry.register(LocalBackend::new(config)?);
        Ok(registry)
    }

    pub fn register<B: CritiqueBackend + 'static>(&mut self, backend: B) {
        self.backends
            .insert(backend.name().to_string(), Box::new(backend));
    }

    pub fn get(&self, name: &str) -> Option<&dyn CritiqueBackend> {
        self.backends.get(name).map(|backend| backend.as_ref())
    }

    pub fn for_kind(&self, kind: BackendKind) -> Result<&dyn CritiqueBackend, CritiqueError> {
        self.get(kind.provider_name()).ok_or_else(|| {
            CritiqueError::configuration(format!(
                "Backend '{}' is not registered.",
                kind.provider_name()
            ))
        })
    }

    pub fn names(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }
}

/// Gemini `generateContent` with inline image parts and a JSON response schema.
pub struct HostedBackend {
    api_key: Option<String>,
    api_base: String,
    http: HttpClient,
}

impl HostedBackend {
    pub fn new(config: &EngineConfig) -> anyhow::Result<Self> {
        Ok(Self {
            api_key: config.hosted_api_key.clone(),
            api_base: config.hosted_api_base.trim_end_matches('/').to_string(),
            http: HttpClient::builder()
                .timeout(config.request_timeout)
                .build()?,
        })
    }

    fn payload(request: &BackendRequest) -> Value {
        let mut parts = request
            .images
            .iter()
            .map(|image| {
                json!({
                    "inlineData": {
                        "mimeType": image.mime_type,
                        "data": image.data,
                    }
                })
            })
            .collect::<Vec<Value>>();
        parts.push(json!({"text": request.prompt}));
        json!({
            "contents": [{"role": "user", "parts": parts}],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.output.json_schema(),
            }
        })
    }
}

impl CritiqueBackend for HostedBackend {
    fn name(&self) -> &str {
        BackendKind::Hosted.provider_name()
    }

    fn generate(&self, request: &BackendRequest) -> Result<RawReply, CritiqueError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(CritiqueError::configuration(
                "GEMINI_API_KEY or GOOGLE_API_KEY not set",
            ));
        };
        let endpoint = format!("{}/models/{}:generateContent", self.api_base, request.model);
        debug!(model = %request.model, images = request.images.len(), "calling hosted backend");
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", api_key)])
            .json(&Self::payload(request))
            .send()
            .map_err(|err| CritiqueError::network("hosted backend call", err.to_string()))?;
        let body = response_text_or_error("hosted backend call", response)?;
        let parsed: Value = serde_json::from_str(&body).map_err(|_| {
            CritiqueError::normalization("hosted backend returned invalid JSON payload")
        })?;
        hosted_reply(&parsed)
    }
}

/// Joins the text parts of the first candidate into a reply.
pub fn hosted_reply(response: &Value) -> Result<RawReply, CritiqueError> {
    let text = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<Vec<&str>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = response
            .get("promptFeedback")
            .and_then(|feedback| feedback.get("blockReason"))
            .and_then(Value::as_str)
            .map(|reason| format!("hosted backend returned no text (blocked: {reason})"))
            .unwrap_or_else(|| "hosted backend returned no text".to_string());
        return Err(CritiqueError::normalization(reason));
    }

    match serde_json::from_str::<Value>(text.trim()) {
        Ok(value @ Value::Object(_)) => Ok(RawReply::Structured(value)),
        _ => Ok(RawReply::Text(text)),
    }
}

/// Ollama-compatible `/api/generate` completion.
pub struct LocalBackend {
    host: String,
    http: HttpClient,
}

impl LocalBackend {
    pub fn new(config: &EngineConfig) -> anyhow::Result<Self> {
        Ok(Self {
            host: config.local_host.clone(),
            http: HttpClient::builder()
                .timeout(config.request_timeout)
                .build()?,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn payload(request: &BackendRequest) -> Value {
        let mut payload = Map::new();
        payload.insert("model".to_string(), Value::String(request.model.clone()));
        payload.insert("prompt".to_string(), Value::String(request.prompt.clone()));
        payload.insert("stream".to_string(), Value::Bool(false));
        if !request.images.is_empty() {
            payload.insert(
                "images".to_string(),
                Value::Array(
                    request
                        .images
                        .iter()
                        .map(|image| Value::String(image.data.clone()))
                        .collect(),
                ),
            );
        }
        Value::Object(payload)
    }
}

impl CritiqueBackend for LocalBackend {
    fn name(&self) -> &str {
        LOCAL_PROVIDER
    }

    fn generate(&self, request: &BackendRequest) -> Result<RawReply, CritiqueError> {
        let endpoint = format!("{}/api/generate", self.host);
        debug!(model = %request.model, host = %self.host, "calling local backend");
        let response = self
            .http
            .post(&endpoint)
            .json(&Self::payload(request))
            .send()
            .map_err(|err| CritiqueError::network("local backend call", err.to_string()))?;
        let body = response_text_or_error("local backend call", response)?;
        local_reply(&body)
    }
}

/// Interprets a local completion body.
///
/// Accepted shapes: `{"output": [{"content": ...}]}`, `{"result": ...}`,
/// `{"response": "..."}`, `{"message": {"content": "..."}}`, a bare JSON
/// string, or a plain-text body. Any other object is taken as the payload
/// itself.
pub fn local_reply(body: &str) -> Result<RawReply, CritiqueError> {
    let parsed = match serde_json::from_str::<Value>(body) {
        Ok(parsed) => parsed,
        Err(_) => return Ok(RawReply::Text(body.to_string())),
    };
    let object = match parsed {
        Value::Object(object) => object,
        Value::String(text) => return Ok(RawReply::Text(text)),
        other => return Ok(RawReply::Structured(other)),
    };

    if let Some(message) = object.get("error").and_then(Value::as_str) {
        return Err(CritiqueError::network("local backend call", message));
    }
    if let Some(output) = object.get("output").and_then(Value::as_array) {
        let text = output
            .iter()
            .filter_map(|row| match row {
                Value::String(text) => Some(text.clone()),
                Value::Object(map) => match map.get("content") {
                    Some(Value::String(text)) => Some(text.clone()),
                    Some(value @ Value::Object(_)) => Some(value.to_string()),
                    _ => None,
                },
                _ => None,
            })
            .collect::<Vec<String>>()
            .join("\n");
        return Ok(RawReply::Text(text));
    }
    match object.get("result") {
        Some(Value::String(text)) => return Ok(RawReply::Text(text.clone())),
        Some(value @ Value::Object(_)) => return Ok(RawReply::Structured(value.clone())),
        _ => {}
    }
    if let Some(text) = object.get("response").and_then(Value::as_str) {
        return Ok(RawReply::Text(text.to_string()));
    }
    if let Some(text) = object
        .get("message")
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
    {
        return Ok(RawReply::Text(text.to_string()));
    }
    Ok(RawReply::Structured(Value::Object(object)))
}

/// Lists models on a local host as `ollama:<name>`. Names that already
/// carry a hosted provider are skipped. Any failure yields an empty list.
pub fn discover_local_models(host: &str) -> Vec<String> {
    let http = match HttpClient::builder().timeout(DISCOVERY_TIMEOUT).build() {
        Ok(http) => http,
        Err(err) => {
            warn!(error = %err, "could not build discovery client");
            return Vec::new();
        }
    };
    for path in LOCAL_DISCOVERY_PATHS {
        let url = format!("{host}{path}");
        let response = match http.get(&url).send() {
            Ok(response) => response,
            Err(err) => {
                debug!(url = %url, error = %err, "local model discovery unreachable");
                return Vec::new();
            }
        };
        if !response.status().is_success() {
            continue;
        }
        let Ok(payload) = response.json::<Value>() else {
            continue;
        };
        if let Some(models) = model_names(&payload) {
            return models;
        }
    }
    Vec::new()
}

fn model_names(payload: &Value) -> Option<Vec<String>> {
    let rows = match payload {
        Value::Array(rows) => rows,
        Value::Object(map) => map.get("models").and_then(Value::as_array)?,
        _ => return None,
    };
    let prefix = format!("{LOCAL_PROVIDER}:");
    let names = rows
        .iter()
        .filter_map(|row| match row {
            Value::String(name) => Some(name.trim().to_string()),
            Value::Object(map) => map
                .get("name")
                .or_else(|| map.get("model"))
                .and_then(Value::as_str)
                .map(|name| name.trim().to_string()),
            _ => None,
        })
        .filter(|name| !name.is_empty())
        .filter(|name| {
            !BackendId::parse(name)
                .map(|id| id.is_hosted())
                .unwrap_or(false)
        })
        .map(|name| {
            if name.starts_with(&prefix) {
                name
            } else {
                format!("{prefix}{name}")
            }
        })
        .collect();
    Some(names)
}

fn response_text_or_error(operation: &str, response: HttpResponse) -> Result<String, CritiqueError> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|err| CritiqueError::network(operation, format!("body read failed: {err}")))?;
    if !status.is_success() {
        return Err(CritiqueError::http_status(operation, status.as_u16(), &body));
    }
    Ok(body)
}
