use thiserror::Error;

/// Failure of a single critique, gallery-critique or theme-suggestion request.
///
/// The variants are the only failure kinds a request can end in. Degraded
/// backend output (missing or mistyped fields) is not an error; only the
/// absence of any parseable JSON object is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CritiqueError {
    #[error("{message}")]
    Validation { field: String, message: String },
    #[error("{0}")]
    Configuration(String),
    #[error("{operation} failed: {message}")]
    Network {
        operation: String,
        status: Option<u16>,
        message: String,
    },
    #[error("could not parse structured output from backend: {0}")]
    Normalization(String),
}

impl CritiqueError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn network(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            operation: operation.into(),
            status: None,
            message: message.into(),
        }
    }

    pub fn http_status(operation: impl Into<String>, status: u16, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("status {status}")
        } else {
            format!("status {status}: {}", truncate_text(body, 240))
        };
        Self::Network {
            operation: operation.into(),
            status: Some(status),
            message,
        }
    }

    pub fn normalization(message: impl Into<String>) -> Self {
        Self::Normalization(message.into())
    }

    /// Stable label used in event payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Configuration(_) => "configuration",
            Self::Network { .. } => "network",
            Self::Normalization(_) => "normalization",
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field.as_str()),
            _ => None,
        }
    }
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
