pub mod backends;
pub mod config;
pub mod fetch;
pub mod prompt;

#[cfg(test)]
mod test_support;

use std::time::Instant;

use curator_contracts::agents::Critic;
use curator_contracts::critique::{
    normalize_critique, normalize_gallery_critique, normalize_theme_suggestions, Critique,
    GalleryCritiqueResult,
};
use curator_contracts::error::CritiqueError;
use curator_contracts::events::{payload, EventPayload, EventWriter};
use curator_contracts::gallery::{Image, Theme};
use curator_contracts::models::{BackendSelection, BackendSelector};
use reqwest::Url;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::backends::{discover_local_models, BackendRegistry, BackendRequest};
use crate::fetch::{HttpImageFetcher, ImageFetcher, InlineImage};
use crate::prompt::{
    critique_prompt, gallery_critique_prompt, theme_suggestions_prompt, OutputSchema,
};

pub use backends::{CritiqueBackend, HostedBackend, LocalBackend};
pub use config::EngineConfig;

pub const DEFAULT_THEME_SUGGESTIONS: usize = 5;
const MAX_THEME_SUGGESTIONS: usize = 10;

/// One single-image critique request, as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CritiqueRequest {
    pub image_id: String,
    pub image_url: String,
    pub artistic_intention: String,
    pub theme: String,
    pub critic: String,
    /// Backend override, e.g. `ollama:llava`. `None` uses the hosted default.
    pub backend: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryCritiqueRequest {
    pub theme: String,
    pub images: Vec<Image>,
    pub council: Vec<Critic>,
    pub backend: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeSuggestionRequest {
    pub posting_history: String,
    pub count: Option<usize>,
    pub backend: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ValidatedCritique {
    image_id: String,
    image_url: String,
    artistic_intention: String,
    theme: String,
    critic: Critic,
}

/// Checks a critique request before any network call is made.
fn validate_critique(request: &CritiqueRequest) -> Result<ValidatedCritique, CritiqueError> {
    let image_url = validate_image_url(&request.image_url)?;
    let image_id = request.image_id.trim();
    if image_id.is_empty() {
        return Err(CritiqueError::validation("imageId", "Image id is required."));
    }
    let artistic_intention = request.artistic_intention.trim();
    if artistic_intention.is_empty() {
        return Err(CritiqueError::validation(
            "artisticIntention",
            "Please describe your artistic intention.",
        ));
    }
    let critic = request.critic.parse::<Critic>()?;
    Ok(ValidatedCritique {
        image_id: image_id.to_string(),
        image_url,
        artistic_intention: artistic_intention.to_string(),
        theme: request.theme.trim().to_string(),
        critic,
    })
}

fn validate_image_url(raw: &str) -> Result<String, CritiqueError> {
    let invalid = || CritiqueError::validation("imageUrl", "Image URL must be a valid http(s) URL.");
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }
    Ok(url.to_string())
}

/// Turns requests into normalized critiques.
///
/// Each call is independent: validate, pick a backend, fetch and inline the
/// images, render the prompt, invoke the backend and normalize its reply.
/// The engine holds no per-gallery state, so one instance can serve
/// concurrent requests from several threads.
pub struct CuratorEngine {
    config: EngineConfig,
    events: EventWriter,
    selector: BackendSelector,
    backends: BackendRegistry,
    fetcher: Box<dyn ImageFetcher>,
}

impl CuratorEngine {
    pub fn new(config: EngineConfig, events: EventWriter) -> anyhow::Result<Self> {
        let backends = BackendRegistry::from_config(&config)?;
        let fetcher = HttpImageFetcher::new(config.request_timeout)?;
        Ok(Self::with_parts(config, events, backends, Box::new(fetcher)))
    }

    pub fn with_parts(
        config: EngineConfig,
        events: EventWriter,
        backends: BackendRegistry,
        fetcher: Box<dyn ImageFetcher>,
    ) -> Self {
        let selector = BackendSelector::new(config.hosted_available(), Some(&config.hosted_model));
        Self {
            config,
            events,
            selector,
            backends,
            fetcher,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn events(&self) -> &EventWriter {
        &self.events
    }

    pub fn selector(&self) -> &BackendSelector {
        &self.selector
    }

    pub fn critique_image(&self, request: &CritiqueRequest) -> Result<Critique, CritiqueError> {
        self.emit(
            "critique_requested",
            payload(json!({
                "image_id": request.image_id,
                "critic": request.critic,
                "requested_backend": request.backend,
            })),
        );
        let started = Instant::now();
        match self.run_critique(request) {
            Ok((critique, selection)) => {
                info!(
                    image_id = %critique.image_id,
                    backend = %selection.backend_id(),
                    "critique finished"
                );
                self.emit(
                    "critique_finished",
                    payload(json!({
                        "image_id": critique.image_id,
                        "backend": selection.backend_id(),
                        "is_ai_used": critique.is_ai_used,
                        "art_type": critique.art_type,
                        "latency_s": started.elapsed().as_secs_f64(),
                    })),
                );
                Ok(critique)
            }
            Err(err) => {
                self.emit_failure("critique_failed", Some(&request.image_id), &err);
                Err(err)
            }
        }
    }

    fn run_critique(
        &self,
        request: &CritiqueRequest,
    ) -> Result<(Critique, BackendSelection), CritiqueError> {
        let validated = validate_critique(request)?;
        let selection = self.select(request.backend.as_deref())?;
        let backend = self.backends.for_kind(selection.kind)?;

        let image = self.inline_image(&validated.image_url)?;
        let prompt = critique_prompt(
            validated.critic,
            &validated.theme,
            &validated.artistic_intention,
            selection.kind,
        );
        let reply = backend.generate(&BackendRequest {
            model: selection.model.clone(),
            prompt,
            images: vec![image],
            output: OutputSchema::Critique,
        })?;
        let fields = normalize_critique(&reply)?;
        Ok((
            Critique::from_fields(validated.image_id, validated.artistic_intention, fields),
            selection,
        ))
    }

    /// Council critique of a whole gallery.
    pub fn critique_gallery(
        &self,
        request: &GalleryCritiqueRequest,
    ) -> Result<GalleryCritiqueResult, CritiqueError> {
        self.emit(
            "gallery_critique_requested",
            payload(json!({
                "theme": request.theme,
                "image_count": request.images.len(),
                "council": request.council.iter().map(|critic| critic.name()).collect::<Vec<&str>>(),
                "requested_backend": request.backend,
            })),
        );
        let started = Instant::now();
        match self.run_gallery_critique(request) {
            Ok((result, selection)) => {
                self.emit(
                    "gallery_critique_finished",
                    payload(json!({
                        "backend": selection.backend_id(),
                        "statements": result.sections().iter().map(|(_, rows)| rows.len()).sum::<usize>(),
                        "latency_s": started.elapsed().as_secs_f64(),
                    })),
                );
                Ok(result)
            }
            Err(err) => {
                self.emit_failure("gallery_critique_failed", None, &err);
                Err(err)
            }
        }
    }

    fn run_gallery_critique(
        &self,
        request: &GalleryCritiqueRequest,
    ) -> Result<(GalleryCritiqueResult, BackendSelection), CritiqueError> {
        let theme = request.theme.trim();
        if theme.is_empty() {
            return Err(CritiqueError::validation("theme", "Please choose a gallery theme."));
        }
        if request.images.is_empty() {
            return Err(CritiqueError::validation(
                "images",
                "Add at least one image to the gallery.",
            ));
        }
        if request.council.is_empty() {
            return Err(CritiqueError::validation(
                "council",
                "Select at least one critic for the council.",
            ));
        }
        let urls = request
            .images
            .iter()
            .map(|image| validate_image_url(&image.image_url))
            .collect::<Result<Vec<String>, CritiqueError>>()?;

        let selection = self.select(request.backend.as_deref())?;
        let backend = self.backends.for_kind(selection.kind)?;

        let images = urls
            .iter()
            .map(|url| self.inline_image(url))
            .collect::<Result<Vec<InlineImage>, CritiqueError>>()?;
        let ids = request
            .images
            .iter()
            .map(|image| image.id.as_str())
            .collect::<Vec<&str>>();
        let prompt = gallery_critique_prompt(&request.council, theme, &ids, selection.kind);
        let reply = backend.generate(&BackendRequest {
            model: selection.model.clone(),
            prompt,
            images,
            output: OutputSchema::GalleryCritique,
        })?;
        Ok((normalize_gallery_critique(&reply)?, selection))
    }

    /// Gallery themes derived from a posting history.
    pub fn suggest_themes(
        &self,
        request: &ThemeSuggestionRequest,
    ) -> Result<Vec<Theme>, CritiqueError> {
        let history = request.posting_history.trim();
        if history.is_empty() {
            return Err(CritiqueError::validation(
                "postingHistory",
                "Posting history is required.",
            ));
        }
        let count = request
            .count
            .unwrap_or(DEFAULT_THEME_SUGGESTIONS)
            .clamp(1, MAX_THEME_SUGGESTIONS);
        let selection = self.select(request.backend.as_deref())?;
        let backend = self.backends.for_kind(selection.kind)?;
        let reply = backend.generate(&BackendRequest {
            model: selection.model.clone(),
            prompt: theme_suggestions_prompt(history, count),
            images: Vec::new(),
            output: OutputSchema::ThemeSuggestions,
        })?;
        let themes = normalize_theme_suggestions(&reply, count)?
            .into_iter()
            .map(Theme::ai)
            .collect::<Vec<Theme>>();
        self.emit(
            "themes_suggested",
            payload(json!({
                "backend": selection.backend_id(),
                "themes": themes.iter().map(|theme| theme.name.as_str()).collect::<Vec<&str>>(),
            })),
        );
        Ok(themes)
    }

    /// Backend ids a caller may choose from: the hosted default when a
    /// credential is configured, followed by discovered local models.
    pub fn available_backends(&self) -> Vec<String> {
        let mut backends = Vec::new();
        if self.selector.hosted_available() {
            backends.push(self.selector.hosted_backend_id());
        }
        let local = discover_local_models(&self.config.local_host);
        debug!(host = %self.config.local_host, count = local.len(), "local models discovered");
        backends.extend(local);
        self.emit(
            "backends_discovered",
            payload(json!({"backends": backends})),
        );
        backends
    }

    fn select(&self, requested: Option<&str>) -> Result<BackendSelection, CritiqueError> {
        let selection = self.selector.select(requested)?;
        if let Some(reason) = selection.fallback_reason.as_deref() {
            warn!(reason, "backend override ignored");
        }
        self.emit(
            "backend_selected",
            payload(json!({
                "backend": selection.backend_id(),
                "requested": selection.requested,
                "fallback_reason": selection.fallback_reason,
            })),
        );
        Ok(selection)
    }

    fn inline_image(&self, url: &str) -> Result<InlineImage, CritiqueError> {
        let fetched = self.fetcher.fetch(url)?;
        debug!(url, bytes = fetched.bytes.len(), "image fetched");
        Ok(InlineImage::encode(&fetched))
    }

    fn emit_failure(&self, event_type: &str, image_id: Option<&str>, err: &CritiqueError) {
        warn!(kind = err.kind(), error = %err, "{event_type}");
        let mut fields = EventPayload::new();
        if let Some(image_id) = image_id {
            fields.insert("image_id".to_string(), Value::String(image_id.to_string()));
        }
        fields.insert("error_kind".to_string(), Value::String(err.kind().to_string()));
        fields.insert("error".to_string(), Value::String(err.to_string()));
        if let Some(field) = err.field() {
            fields.insert("field".to_string(), Value::String(field.to_string()));
        }
        self.emit(event_type, fields);
    }

    fn emit(&self, event_type: &str, fields: EventPayload) {
        if let Err(err) = self.events.emit(event_type, fields) {
            warn!(error = %err, event_type, "could not write event");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use curator_contracts::agents::Critic;
    use curator_contracts::critique::RawReply;
    use curator_contracts::error::CritiqueError;
    use curator_contracts::events::EventWriter;
    use curator_contracts::gallery::{Image, ThemeSource};
    use serde_json::{json, Value};

    use super::{
        CritiqueRequest, CuratorEngine, GalleryCritiqueRequest, ThemeSuggestionRequest,
    };
    use crate::backends::{BackendRegistry, BackendRequest, CritiqueBackend};
    use crate::config::EngineConfig;
    use crate::fetch::{FetchedImage, ImageFetcher};
    use crate::test_support::closed_port_url;

    struct FakeFetcher {
        calls: Arc<AtomicUsize>,
        fail_with: Option<CritiqueError>,
    }

    impl ImageFetcher for FakeFetcher {
        fn fetch(&self, _url: &str) -> Result<FetchedImage, CritiqueError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(FetchedImage {
                    bytes: b"jpeg-bytes".to_vec(),
                    content_type: Some("image/png".to_string()),
                }),
            }
        }
    }

    struct FakeBackend {
        name: &'static str,
        reply: Result<RawReply, CritiqueError>,
        seen: Arc<Mutex<Vec<BackendRequest>>>,
    }

    impl CritiqueBackend for FakeBackend {
        fn name(&self) -> &str {
            self.name
        }

        fn generate(&self, request: &BackendRequest) -> Result<RawReply, CritiqueError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(request.clone());
            }
            self.reply.clone()
        }
    }

    struct Harness {
        engine: CuratorEngine,
        fetches: Arc<AtomicUsize>,
        hosted_seen: Arc<Mutex<Vec<BackendRequest>>>,
        local_seen: Arc<Mutex<Vec<BackendRequest>>>,
    }

    fn harness(
        hosted_key: bool,
        reply: Result<RawReply, CritiqueError>,
        fetch_error: Option<CritiqueError>,
        events: EventWriter,
    ) -> Harness {
        let fetches = Arc::new(AtomicUsize::new(0));
        let hosted_seen = Arc::new(Mutex::new(Vec::new()));
        let local_seen = Arc::new(Mutex::new(Vec::new()));
        let mut backends = BackendRegistry::new();
        backends.register(FakeBackend {
            name: "googleai",
            reply: reply.clone(),
            seen: Arc::clone(&hosted_seen),
        });
        backends.register(FakeBackend {
            name: "ollama",
            reply,
            seen: Arc::clone(&local_seen),
        });
        let config = EngineConfig {
            hosted_api_key: hosted_key.then(|| "key".to_string()),
            local_host: closed_port_url(),
            ..EngineConfig::default()
        };
        let engine = CuratorEngine::with_parts(
            config,
            events,
            backends,
            Box::new(FakeFetcher {
                calls: Arc::clone(&fetches),
                fail_with: fetch_error,
            }),
        );
        Harness {
            engine,
            fetches,
            hosted_seen,
            local_seen,
        }
    }

    fn critique_reply() -> Result<RawReply, CritiqueError> {
        Ok(RawReply::Structured(json!({
            "critique": "The puddles carry the frame.",
            "isAiUsed": false,
            "aiUsageFeedback": "No AI detected.",
            "artType": "Photography",
            "themeRelevance": "Strong",
            "intentionRespectFeedback": "Honored."
        })))
    }

    fn request() -> CritiqueRequest {
        CritiqueRequest {
            image_id: "img1".to_string(),
            image_url: "https://picsum.photos/seed/1/600/400".to_string(),
            artistic_intention: "isolation after rain".to_string(),
            theme: "Urban Noir".to_string(),
            critic: "Pretentious Art Critic".to_string(),
            backend: None,
        }
    }

    fn image(id: &str) -> Image {
        Image {
            id: id.to_string(),
            description: format!("image {id}"),
            image_url: format!("https://example.com/{id}.jpg"),
            image_hint: None,
        }
    }

    #[test]
    fn critique_uses_hosted_backend_with_inline_image() -> anyhow::Result<()> {
        let h = harness(true, critique_reply(), None, EventWriter::disabled("s"));
        let critique = h.engine.critique_image(&request())?;

        assert_eq!(critique.image_id, "img1");
        assert_eq!(critique.artistic_intention, "isolation after rain");
        assert_eq!(critique.art_type, "Photography");
        assert_eq!(h.fetches.load(Ordering::SeqCst), 1);

        let seen = h.hosted_seen.lock().map(|rows| rows.clone()).unwrap_or_default();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "gemini-2.5-flash");
        assert_eq!(seen[0].images[0].mime_type, "image/png");
        assert!(seen[0].prompt.contains("Urban Noir"));
        assert!(h.local_seen.lock().map(|rows| rows.is_empty()).unwrap_or(false));
        Ok(())
    }

    #[test]
    fn empty_intention_fails_before_any_network_call() {
        let h = harness(true, critique_reply(), None, EventWriter::disabled("s"));
        let mut req = request();
        req.artistic_intention = "   ".to_string();

        let err = h.engine.critique_image(&req).err();
        assert_eq!(
            err.as_ref().map(ToString::to_string).as_deref(),
            Some("Please describe your artistic intention.")
        );
        assert_eq!(err.as_ref().and_then(CritiqueError::field), Some("artisticIntention"));
        assert_eq!(h.fetches.load(Ordering::SeqCst), 0);
        assert!(h.hosted_seen.lock().map(|rows| rows.is_empty()).unwrap_or(false));
    }

    #[test]
    fn bad_url_and_unknown_critic_are_validation_errors() {
        let h = harness(true, critique_reply(), None, EventWriter::disabled("s"));

        let mut req = request();
        req.image_url = "ftp://example.com/a.jpg".to_string();
        assert_eq!(
            h.engine.critique_image(&req).err().as_ref().and_then(CritiqueError::field),
            Some("imageUrl")
        );

        let mut req = request();
        req.critic = "Andy Warhol".to_string();
        assert_eq!(
            h.engine.critique_image(&req).err().as_ref().and_then(CritiqueError::field),
            Some("critic")
        );
        assert_eq!(h.fetches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn local_override_routes_to_local_backend_without_credential() -> anyhow::Result<()> {
        let h = harness(
            false,
            Ok(RawReply::Text(
                "Here you go: {\"critique\": \"quiet\", \"is_ai_used\": \"true\"}".to_string(),
            )),
            None,
            EventWriter::disabled("s"),
        );
        let mut req = request();
        req.backend = Some("ollama:llava".to_string());
        let critique = h.engine.critique_image(&req)?;

        assert_eq!(critique.critique, "quiet");
        assert!(critique.is_ai_used);
        assert_eq!(critique.art_type, "");
        let seen = h.local_seen.lock().map(|rows| rows.clone()).unwrap_or_default();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "llava");
        assert!(seen[0].prompt.contains("no markdown"));
        Ok(())
    }

    #[test]
    fn missing_credential_without_override_is_configuration_error() {
        let h = harness(false, critique_reply(), None, EventWriter::disabled("s"));
        let err = h.engine.critique_image(&request()).err();
        assert!(matches!(err, Some(CritiqueError::Configuration(_))));
        assert_eq!(h.fetches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn fetch_failure_surfaces_as_network_error() {
        let h = harness(
            true,
            critique_reply(),
            Some(CritiqueError::http_status("image fetch", 404, "")),
            EventWriter::disabled("s"),
        );
        let err = h.engine.critique_image(&request()).err();
        assert_eq!(
            err.map(|err| err.to_string()).as_deref(),
            Some("image fetch failed: status 404")
        );
        assert!(h.hosted_seen.lock().map(|rows| rows.is_empty()).unwrap_or(false));
    }

    #[test]
    fn unparseable_reply_is_normalization_error() {
        let h = harness(
            true,
            Ok(RawReply::Text("I cannot critique this image.".to_string())),
            None,
            EventWriter::disabled("s"),
        );
        let err = h.engine.critique_image(&request()).err();
        assert!(matches!(err, Some(CritiqueError::Normalization(_))));
    }

    #[test]
    fn events_record_request_selection_and_outcome() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let h = harness(true, critique_reply(), None, EventWriter::new(&path, "s1"));
        let mut req = request();
        req.backend = Some("openai/gpt-4o".to_string());
        h.engine.critique_image(&req)?;
        let mut failing = request();
        failing.artistic_intention = String::new();
        let _ = h.engine.critique_image(&failing);

        let rows = fs::read_to_string(&path)?
            .lines()
            .map(serde_json::from_str::<Value>)
            .collect::<Result<Vec<Value>, _>>()?;
        let types = rows
            .iter()
            .filter_map(|row| row["type"].as_str())
            .collect::<Vec<&str>>();
        assert_eq!(
            types,
            vec![
                "critique_requested",
                "backend_selected",
                "critique_finished",
                "critique_requested",
                "critique_failed",
            ]
        );
        assert!(rows[1]["fallback_reason"].as_str().is_some());
        assert_eq!(rows[2]["backend"], json!("googleai/gemini-2.5-flash"));
        assert_eq!(rows[4]["error_kind"], json!("validation"));
        Ok(())
    }

    #[test]
    fn gallery_critique_sends_every_image_and_council_member() -> anyhow::Result<()> {
        let h = harness(
            true,
            Ok(RawReply::Structured(json!({
                "overallAssessment": [{"critic": "Pretentious Art Critic", "statement": "Bold."}],
                "curationAndCoherence": [],
                "emergingThreads": [{"critic": "Supportive Photographer", "statement": "Light."}],
                "futureDevelopment": []
            }))),
            None,
            EventWriter::disabled("s"),
        );
        let result = h.engine.critique_gallery(&GalleryCritiqueRequest {
            theme: "Urban Noir".to_string(),
            images: vec![image("a"), image("b")],
            council: vec![Critic::PretentiousArtCritic, Critic::SupportivePhotographer],
            backend: None,
        })?;

        assert_eq!(result.overall_assessment[0].statement, "Bold.");
        assert_eq!(result.emerging_threads[0].critic, "Supportive Photographer");
        assert_eq!(h.fetches.load(Ordering::SeqCst), 2);
        let seen = h.hosted_seen.lock().map(|rows| rows.clone()).unwrap_or_default();
        assert_eq!(seen[0].images.len(), 2);
        assert!(seen[0].prompt.contains("Supportive Photographer"));
        Ok(())
    }

    #[test]
    fn gallery_critique_requires_images_and_council() {
        let h = harness(true, critique_reply(), None, EventWriter::disabled("s"));
        let mut req = GalleryCritiqueRequest {
            theme: "Urban Noir".to_string(),
            images: Vec::new(),
            council: vec![Critic::DefaultAi],
            backend: None,
        };
        assert_eq!(
            h.engine.critique_gallery(&req).err().as_ref().and_then(CritiqueError::field),
            Some("images")
        );
        req.images = vec![image("a")];
        req.council.clear();
        assert_eq!(
            h.engine.critique_gallery(&req).err().as_ref().and_then(CritiqueError::field),
            Some("council")
        );
        assert_eq!(h.fetches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn theme_suggestions_are_ai_sourced_and_bounded() -> anyhow::Result<()> {
        let h = harness(
            true,
            Ok(RawReply::Structured(json!({
                "themes": ["Urban Noir", " urban noir ", "Coastlines", "Harbor Light"]
            }))),
            None,
            EventWriter::disabled("s"),
        );
        let themes = h.engine.suggest_themes(&ThemeSuggestionRequest {
            posting_history: "rainy streets, neon signs, the harbor at dawn".to_string(),
            count: Some(2),
            backend: None,
        })?;
        assert_eq!(themes.len(), 2);
        assert_eq!(themes[0].name, "Urban Noir");
        assert!(themes.iter().all(|theme| theme.source == ThemeSource::Ai));
        assert_eq!(h.fetches.load(Ordering::SeqCst), 0);

        let err = h
            .engine
            .suggest_themes(&ThemeSuggestionRequest {
                posting_history: " ".to_string(),
                count: None,
                backend: None,
            })
            .err();
        assert_eq!(err.as_ref().and_then(CritiqueError::field), Some("postingHistory"));
        Ok(())
    }

    #[test]
    fn available_backends_lists_hosted_default_when_local_is_down() {
        let h = harness(true, critique_reply(), None, EventWriter::disabled("s"));
        assert_eq!(
            h.engine.available_backends(),
            vec!["googleai/gemini-2.5-flash".to_string()]
        );
        let h = harness(false, critique_reply(), None, EventWriter::disabled("s"));
        assert!(h.engine.available_backends().is_empty());
    }
}
