use super::{BackendId, BackendKind, DEFAULT_HOSTED_MODEL};
use crate::error::CritiqueError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSelection {
    pub kind: BackendKind,
    /// Model name sent to the backend, without the provider prefix.
    pub model: String,
    pub requested: Option<String>,
    pub fallback_reason: Option<String>,
}

impl BackendSelection {
    pub fn backend_id(&self) -> String {
        match self.kind {
            BackendKind::Local => BackendId::local(&self.model).to_string(),
            BackendKind::Hosted => format!("{}/{}", self.kind.provider_name(), self.model),
        }
    }
}

/// Picks the backend for one request.
///
/// An explicit local override always wins. Otherwise the hosted backend
/// serves the request with its default model, provided a credential is
/// configured; without one the request fails with a configuration error.
#[derive(Debug, Clone)]
pub struct BackendSelector {
    hosted_available: bool,
    hosted_model: String,
}

impl BackendSelector {
    pub fn new(hosted_available: bool, hosted_model: Option<&str>) -> Self {
        let hosted_model = hosted_model
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_HOSTED_MODEL);
        Self {
            hosted_available,
            hosted_model: strip_hosted_prefix(hosted_model),
        }
    }

    pub fn hosted_available(&self) -> bool {
        self.hosted_available
    }

    /// Identifier advertised for the hosted backend, e.g. `googleai/gemini-2.5-flash`.
    pub fn hosted_backend_id(&self) -> String {
        format!("{}/{}", BackendKind::Hosted.provider_name(), self.hosted_model)
    }

    pub fn select(&self, requested: Option<&str>) -> Result<BackendSelection, CritiqueError> {
        let requested_value = requested.map(str::trim).filter(|value| !value.is_empty());

        if let Some(raw) = requested_value {
            if let Some(id) = BackendId::parse(raw).filter(BackendId::is_local) {
                return Ok(BackendSelection {
                    kind: BackendKind::Local,
                    model: id.model,
                    requested: Some(raw.to_string()),
                    fallback_reason: None,
                });
            }
        }

        if !self.hosted_available {
            let message = match requested_value {
                Some(raw) => format!(
                    "Backend '{raw}' is not a local backend and no hosted-model credential is configured."
                ),
                None => "No AI backend is configured. Set GEMINI_API_KEY or choose a local backend."
                    .to_string(),
            };
            return Err(CritiqueError::configuration(message));
        }

        let fallback_reason = requested_value.and_then(|raw| {
            let hosted_default = self.hosted_backend_id();
            if raw == hosted_default || strip_hosted_prefix(raw) == self.hosted_model {
                None
            } else {
                Some(format!(
                    "Requested backend '{raw}' is not a local backend; using hosted default '{hosted_default}'."
                ))
            }
        });

        Ok(BackendSelection {
            kind: BackendKind::Hosted,
            model: self.hosted_model.clone(),
            requested: requested_value.map(str::to_string),
            fallback_reason,
        })
    }
}

fn strip_hosted_prefix(raw: &str) -> String {
    let trimmed = raw.trim();
    let provider = BackendKind::Hosted.provider_name();
    trimmed
        .strip_prefix(provider)
        .and_then(|rest| rest.strip_prefix('/').or_else(|| rest.strip_prefix(':')))
        .unwrap_or(trimmed)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::BackendSelector;
    use crate::error::CritiqueError;
    use crate::models::BackendKind;

    #[test]
    fn explicit_local_override_wins_over_hosted() -> anyhow::Result<()> {
        let selection = BackendSelector::new(true, None).select(Some("ollama:llava"))?;
        assert_eq!(selection.kind, BackendKind::Local);
        assert_eq!(selection.model, "llava");
        assert_eq!(selection.fallback_reason, None);
        assert_eq!(selection.backend_id(), "ollama:llava");
        Ok(())
    }

    #[test]
    fn no_override_uses_hosted_default() -> anyhow::Result<()> {
        let selection = BackendSelector::new(true, None).select(None)?;
        assert_eq!(selection.kind, BackendKind::Hosted);
        assert_eq!(selection.model, "gemini-2.5-flash");
        assert_eq!(selection.backend_id(), "googleai/gemini-2.5-flash");
        Ok(())
    }

    #[test]
    fn hosted_override_is_explained_when_not_default() -> anyhow::Result<()> {
        let selector = BackendSelector::new(true, Some("googleai/gemini-2.5-flash"));
        let same = selector.select(Some("googleai/gemini-2.5-flash"))?;
        assert_eq!(same.fallback_reason, None);

        let other = selector.select(Some("openai:gpt-4o"))?;
        assert_eq!(other.kind, BackendKind::Hosted);
        assert_eq!(
            other.fallback_reason.as_deref(),
            Some(
                "Requested backend 'openai:gpt-4o' is not a local backend; using hosted default 'googleai/gemini-2.5-flash'."
            )
        );
        Ok(())
    }

    #[test]
    fn nothing_configured_is_a_configuration_error() {
        let err = BackendSelector::new(false, None).select(None).err();
        assert!(matches!(err, Some(CritiqueError::Configuration(_))));

        let err = BackendSelector::new(false, None)
            .select(Some("googleai/gemini-2.5-flash"))
            .err();
        assert!(matches!(err, Some(CritiqueError::Configuration(_))));
    }

    #[test]
    fn local_override_works_without_credential() -> anyhow::Result<()> {
        let selection = BackendSelector::new(false, None).select(Some("local:llama3"))?;
        assert_eq!(selection.kind, BackendKind::Local);
        assert_eq!(selection.model, "llama3");
        Ok(())
    }
}
