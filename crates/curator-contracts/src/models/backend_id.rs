use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_HOSTED_MODEL: &str = "googleai/gemini-2.5-flash";
pub const LOCAL_PROVIDER: &str = "ollama";

const LOCAL_PROVIDER_ALIASES: &[&str] = &["ollama", "local"];
const HOSTED_PROVIDER_ALIASES: &[&str] = &["googleai", "vertexai"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Hosted,
    Local,
}

impl BackendKind {
    /// Name the backend is registered under in the engine.
    pub fn provider_name(self) -> &'static str {
        match self {
            BackendKind::Hosted => "googleai",
            BackendKind::Local => LOCAL_PROVIDER,
        }
    }
}

/// A backend identifier of the form `<provider>:<model>`.
///
/// Hosted ids conventionally use `/` (`googleai/gemini-2.5-flash`); both
/// separators are accepted and the first one present splits the provider
/// from the model, so `ollama/llava:7b` names model `llava:7b`. An id with no separator is a bare model name
/// with no provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendId {
    pub provider: Option<String>,
    pub model: String,
}

impl BackendId {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let split = trimmed
            .find([':', '/'])
            .map(|idx| (&trimmed[..idx], &trimmed[idx + 1..]));
        match split {
            Some((provider, model)) => {
                let provider = provider.trim().to_ascii_lowercase();
                let model = model.trim();
                if model.is_empty() {
                    return None;
                }
                Some(Self {
                    provider: (!provider.is_empty()).then_some(provider),
                    model: model.to_string(),
                })
            }
            None => Some(Self {
                provider: None,
                model: trimmed.to_string(),
            }),
        }
    }

    pub fn local(model: &str) -> Self {
        Self {
            provider: Some(LOCAL_PROVIDER.to_string()),
            model: model.trim().to_string(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.provider
            .as_deref()
            .map(|provider| LOCAL_PROVIDER_ALIASES.contains(&provider))
            .unwrap_or(false)
    }
}

impl BackendId {
    pub fn is_hosted(&self) -> bool {
        self.provider
            .as_deref()
            .map(|provider| HOSTED_PROVIDER_ALIASES.contains(&provider))
            .unwrap_or(false)
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.provider, self.is_local()) {
            (Some(provider), true) => write!(f, "{provider}:{}", self.model),
            (Some(provider), false) => write!(f, "{provider}/{}", self.model),
            (None, _) => f.write_str(&self.model),
        }
    }
}
