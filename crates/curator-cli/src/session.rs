use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use curator_contracts::agents::{AgentRegistry, Critic};
use curator_contracts::chat::{parse_intent, Intent, SESSION_HELP_COMMANDS};
use curator_contracts::critique::{Critique, GalleryCritiqueResult};
use curator_contracts::error::CritiqueError;
use curator_contracts::events::payload;
use curator_contracts::gallery::{
    images_from_feed, GalleryStore, Image, RecordOutcome, SaveOutcome, SessionSnapshot,
    SnapshotFile, Theme,
};
use curator_contracts::requests::{RequestSlot, RequestState, Ticket};
use curator_engine::{
    CritiqueRequest, CuratorEngine, GalleryCritiqueRequest, ThemeSuggestionRequest,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

pub const MAX_IMAGES_PER_ADD: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

enum Outcome {
    Critique {
        image_id: String,
        ticket: Ticket,
        result: Result<Critique, CritiqueError>,
    },
    Gallery {
        ticket: Ticket,
        result: Result<GalleryCritiqueResult, CritiqueError>,
    },
}

/// Interactive gallery session. Requests run on worker threads; their
/// outcomes come back over a channel and only this type writes to the store.
pub struct Session {
    engine: Arc<CuratorEngine>,
    store: GalleryStore,
    agents: AgentRegistry,
    snapshot: Option<SnapshotFile>,
    pool: Vec<Image>,
    suggestions: Vec<Theme>,
    critic: Option<Critic>,
    backend: Option<String>,
    critique_slots: HashMap<String, RequestSlot<Critique>>,
    gallery_slot: RequestSlot<GalleryCritiqueResult>,
    outcomes_tx: Sender<Outcome>,
    outcomes_rx: Receiver<Outcome>,
    in_flight: usize,
}

impl Session {
    pub fn new(engine: Arc<CuratorEngine>, snapshot: Option<SnapshotFile>) -> Self {
        let mut store = GalleryStore::new();
        let mut agents = AgentRegistry::new(engine.config().pro_agents_enabled);
        if let Some(file) = snapshot.as_ref() {
            let restored = file.load();
            store.restore_saved(restored.saved_galleries);
            if let Some(active) = restored.active_agents.as_deref() {
                agents.restore_active(active);
            }
        }
        let critic = agents.default_selection();
        let (outcomes_tx, outcomes_rx) = mpsc::channel();
        Self {
            engine,
            store,
            agents,
            snapshot,
            pool: Vec::new(),
            suggestions: Vec::new(),
            critic,
            backend: None,
            critique_slots: HashMap::new(),
            gallery_slot: RequestSlot::new(),
            outcomes_tx,
            outcomes_rx,
            in_flight: 0,
        }
    }

    pub fn store(&self) -> &GalleryStore {
        &self.store
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn load_feed(&mut self, path: &Path) -> Result<usize> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        let parsed: Value = serde_json::from_str(&raw)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;
        self.pool = images_from_feed(&parsed);
        Ok(self.pool.len())
    }

    pub fn handle_line(&mut self, line: &str, out: &mut dyn Write) -> Result<Flow> {
        let intent = parse_intent(line);
        self.handle(&intent, out)
    }

    pub fn handle(&mut self, intent: &Intent, out: &mut dyn Write) -> Result<Flow> {
        match intent.action.as_str() {
            "noop" => {}
            "help" => writeln!(out, "Commands: {}", SESSION_HELP_COMMANDS.join(" "))?,
            "start_gallery" => self.start_gallery(intent.arg_str("value"), out)?,
            "suggest_themes" => self.suggest_themes(intent.arg_str("value"), out)?,
            "load_feed" => match intent.arg_str("path") {
                Some(path) => match self.load_feed(Path::new(path)) {
                    Ok(count) => writeln!(out, "Loaded {count} images from {path}")?,
                    Err(err) => writeln!(out, "Load failed: {err:#}")?,
                },
                None => writeln!(out, "/load requires a path")?,
            },
            "add_images" => {
                let count = intent
                    .command_args
                    .get("count")
                    .and_then(Value::as_u64)
                    .unwrap_or(MAX_IMAGES_PER_ADD as u64);
                self.add_images(count as usize, out)?;
            }
            "list_images" => self.list_images(out)?,
            "remove_image" => match intent.arg_str("image_id") {
                Some(image_id) => {
                    if self.store.remove_image(image_id) {
                        if let Some(slot) = self.critique_slots.get_mut(image_id) {
                            slot.reset();
                        }
                        writeln!(out, "Removed {image_id}")?;
                    } else {
                        writeln!(out, "No image {image_id} in the gallery")?;
                    }
                }
                None => writeln!(out, "/remove requires an image id")?,
            },
            "select_image" => match intent.arg_str("image_id") {
                Some(image_id) => {
                    if self.store.select_image(image_id) {
                        self.render_selected(out)?;
                    } else {
                        writeln!(out, "No image {image_id} in the gallery")?;
                    }
                }
                None => writeln!(out, "/select requires an image id")?,
            },
            "set_critic" => self.set_critic(intent.arg_str("value"), out)?,
            "set_backend" => {
                self.backend = intent
                    .arg_str("value")
                    .filter(|value| !value.eq_ignore_ascii_case("default"))
                    .map(str::to_string);
                match self.backend.as_deref() {
                    Some(backend) => writeln!(out, "Backend override set to {backend}")?,
                    None => writeln!(out, "Using the default backend")?,
                }
            }
            "critique_image" => match intent.arg_str("image_id") {
                Some(image_id) => {
                    let intention = intent.text.clone().unwrap_or_default();
                    self.start_critique(image_id, &intention, out)?;
                }
                None => writeln!(out, "/critique requires an image id and an intention")?,
            },
            "critique_selected" => {
                let selected = self.store.selected_image().map(|image| image.id.clone());
                match selected {
                    Some(image_id) => {
                        let intention = intent.text.clone().unwrap_or_default();
                        self.start_critique(&image_id, &intention, out)?;
                    }
                    None => writeln!(
                        out,
                        "Select an image with /select before describing your intention"
                    )?,
                }
            }
            "delete_critique" => match intent.arg_str("image_id") {
                Some(image_id) => {
                    if let Some(slot) = self.critique_slots.get_mut(image_id) {
                        slot.reset();
                    }
                    if self.store.delete_critique(image_id) {
                        writeln!(out, "Deleted critique for {image_id}")?;
                    } else {
                        writeln!(out, "No critique for {image_id}")?;
                    }
                }
                None => writeln!(out, "/uncritique requires an image id")?,
            },
            "wait" => self.wait(out)?,
            "gallery_critique" => self.start_gallery_critique(out)?,
            "gallery_critique_delete" => {
                self.gallery_slot.reset();
                if self.store.clear_gallery_critique() {
                    writeln!(out, "Gallery critique deleted")?;
                } else {
                    writeln!(out, "No gallery critique to delete")?;
                }
            }
            "report" => self.report(out)?,
            "save_gallery" => self.save_gallery(out)?,
            "list_galleries" => {
                if self.store.saved_galleries().is_empty() {
                    writeln!(out, "No saved galleries")?;
                }
                for gallery in self.store.saved_galleries() {
                    writeln!(
                        out,
                        "{}  ({} images, {} critiques)  id={}",
                        gallery.theme.name,
                        gallery.images.len(),
                        gallery.critiques.len(),
                        gallery.id
                    )?;
                }
            }
            "open_gallery" => match intent.arg_str("value") {
                Some(key) => self.open_gallery(key, out)?,
                None => writeln!(out, "/open requires a theme name or gallery id")?,
            },
            "list_agents" => self.list_agents(out)?,
            "toggle_agent" => self.toggle_agent(intent.arg_str("value"), out)?,
            "list_models" => {
                let backends = self.engine.available_backends();
                if backends.is_empty() {
                    writeln!(out, "No backends available")?;
                }
                for backend in backends {
                    writeln!(out, "{backend}")?;
                }
            }
            "reset" => {
                let selected = self.store.selected_image().map(|image| image.id.clone());
                match selected {
                    Some(image_id) => {
                        if let Some(slot) = self.critique_slots.get_mut(&image_id) {
                            slot.reset();
                        }
                        writeln!(out, "Critique request for {image_id} reset")?;
                    }
                    None => writeln!(out, "No image selected")?,
                }
            }
            "quit" => return Ok(Flow::Quit),
            _ => {
                let command = intent.arg_str("command").unwrap_or_default();
                writeln!(out, "Unknown command: /{command}. Type /help for commands.")?;
            }
        }
        Ok(Flow::Continue)
    }

    /// Applies every outcome that has already arrived.
    pub fn drain(&mut self, out: &mut dyn Write) -> Result<()> {
        while let Ok(outcome) = self.outcomes_rx.try_recv() {
            self.apply(outcome, out)?;
        }
        Ok(())
    }

    /// Blocks until every in-flight request has reported back.
    pub fn wait(&mut self, out: &mut dyn Write) -> Result<()> {
        while self.in_flight > 0 {
            let outcome = self
                .outcomes_rx
                .recv()
                .context("request worker channel closed")?;
            self.apply(outcome, out)?;
        }
        Ok(())
    }

    pub fn persist(&self) -> Result<()> {
        let Some(file) = self.snapshot.as_ref() else {
            return Ok(());
        };
        file.save(&SessionSnapshot {
            saved_galleries: self.store.saved_galleries().to_vec(),
            active_agents: Some(self.agents.active()),
            ..SessionSnapshot::default()
        })
    }

    fn start_gallery(&mut self, value: Option<&str>, out: &mut dyn Write) -> Result<()> {
        let Some(value) = value else {
            writeln!(out, "/theme requires a theme name")?;
            return Ok(());
        };
        let theme = value
            .parse::<usize>()
            .ok()
            .and_then(|idx| idx.checked_sub(1))
            .and_then(|idx| self.suggestions.get(idx).cloned())
            .unwrap_or_else(|| Theme::user(value));
        let images = self
            .pool
            .iter()
            .take(MAX_IMAGES_PER_ADD)
            .cloned()
            .collect::<Vec<Image>>();
        let count = self.store.start_gallery(theme.clone(), images);
        self.reset_critique_slots();
        self.gallery_slot.reset();
        writeln!(out, "Gallery '{}' started with {count} images", theme.name)?;
        Ok(())
    }

    fn suggest_themes(&mut self, value: Option<&str>, out: &mut dyn Write) -> Result<()> {
        let request = ThemeSuggestionRequest {
            posting_history: value.unwrap_or_default().to_string(),
            count: None,
            backend: self.backend.clone(),
        };
        match self.engine.suggest_themes(&request) {
            Ok(themes) => {
                if themes.is_empty() {
                    writeln!(out, "No themes suggested")?;
                }
                for (idx, theme) in themes.iter().enumerate() {
                    writeln!(out, "{}. {}", idx + 1, theme.name)?;
                }
                if !themes.is_empty() {
                    writeln!(out, "Use /theme <number> to start one")?;
                }
                self.suggestions = themes;
            }
            Err(err) => writeln!(out, "Failed to suggest themes: {err}")?,
        }
        Ok(())
    }

    fn add_images(&mut self, requested: usize, out: &mut dyn Write) -> Result<()> {
        if self.store.theme().is_none() {
            writeln!(out, "Start a gallery with /theme first")?;
            return Ok(());
        }
        let count = requested.clamp(1, MAX_IMAGES_PER_ADD);
        let candidates = self
            .pool
            .iter()
            .filter(|image| !self.store.contains_image(&image.id))
            .take(count)
            .cloned()
            .collect::<Vec<Image>>();
        let added = self.store.add_images(candidates);
        if added.is_empty() {
            writeln!(out, "No more images to add")?;
        } else {
            writeln!(out, "Added {}", added.join(", "))?;
        }
        Ok(())
    }

    fn list_images(&self, out: &mut dyn Write) -> Result<()> {
        if self.store.images().is_empty() {
            writeln!(out, "The gallery is empty")?;
            return Ok(());
        }
        let selected = self.store.selected_image().map(|image| image.id.as_str());
        for image in self.store.images() {
            let marker = if selected == Some(image.id.as_str()) { "*" } else { " " };
            let status = match self.critique_slots.get(&image.id).map(RequestSlot::state) {
                Some(RequestState::Pending { .. }) => "pending",
                _ if self.store.critique_for(&image.id).is_some() => "critiqued",
                Some(RequestState::Error { .. }) => "failed",
                _ => "",
            };
            writeln!(
                out,
                "{marker} {}  {}  {}",
                image.id, image.description, status
            )?;
        }
        Ok(())
    }

    fn set_critic(&mut self, value: Option<&str>, out: &mut dyn Write) -> Result<()> {
        let Some(value) = value else {
            writeln!(out, "/critic requires a persona name")?;
            return Ok(());
        };
        match value.parse::<Critic>() {
            Ok(critic) if self.agents.is_active(critic) => {
                self.critic = Some(critic);
                writeln!(out, "Critic set to {critic}")?;
            }
            Ok(critic) => writeln!(out, "{critic} is not active. Use /toggle to enable it.")?,
            Err(err) => writeln!(out, "{err}")?,
        }
        Ok(())
    }

    fn start_critique(
        &mut self,
        image_id: &str,
        intention: &str,
        out: &mut dyn Write,
    ) -> Result<()> {
        let Some(image) = self.store.image(image_id).cloned() else {
            writeln!(out, "No image {image_id} in the gallery")?;
            return Ok(());
        };
        let Some(critic) = self.critic.filter(|critic| self.agents.is_active(*critic)) else {
            writeln!(out, "No active critic selected. Enable one with /toggle.")?;
            return Ok(());
        };
        let request = CritiqueRequest {
            image_id: image.id.clone(),
            image_url: image.image_url.clone(),
            artistic_intention: intention.to_string(),
            theme: self
                .store
                .theme()
                .map(|theme| theme.name.clone())
                .unwrap_or_default(),
            critic: critic.name().to_string(),
            backend: self.backend.clone(),
        };
        let ticket = self
            .critique_slots
            .entry(image.id.clone())
            .or_default()
            .begin(image.id.clone());

        let engine = Arc::clone(&self.engine);
        let tx = self.outcomes_tx.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            let result = guarded("critique", || engine.critique_image(&request));
            let _ = tx.send(Outcome::Critique {
                image_id: request.image_id,
                ticket,
                result,
            });
        });
        writeln!(out, "Critique requested for {} from {critic}", image.id)?;
        Ok(())
    }

    fn start_gallery_critique(&mut self, out: &mut dyn Write) -> Result<()> {
        let Some(theme) = self.store.theme().map(|theme| theme.name.clone()) else {
            writeln!(out, "Start a gallery with /theme first")?;
            return Ok(());
        };
        let request = GalleryCritiqueRequest {
            theme: theme.clone(),
            images: self.store.images().to_vec(),
            council: self.agents.active(),
            backend: self.backend.clone(),
        };
        let council = request.council.len();
        let ticket = self.gallery_slot.begin(theme);

        let engine = Arc::clone(&self.engine);
        let tx = self.outcomes_tx.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            let result = guarded("gallery critique", || engine.critique_gallery(&request));
            let _ = tx.send(Outcome::Gallery { ticket, result });
        });
        writeln!(out, "Gallery critique requested from {council} critics")?;
        Ok(())
    }

    fn apply(&mut self, outcome: Outcome, out: &mut dyn Write) -> Result<()> {
        self.in_flight = self.in_flight.saturating_sub(1);
        match outcome {
            Outcome::Critique {
                image_id,
                ticket,
                result,
            } => self.apply_critique(image_id, ticket, result, out),
            Outcome::Gallery { ticket, result } => {
                if !self.gallery_slot.resolve(ticket, result) {
                    debug!(ticket, "stale gallery critique outcome discarded");
                    return Ok(());
                }
                match self.gallery_slot.state().clone() {
                    RequestState::Success { value, .. } => {
                        self.store.set_gallery_critique(value);
                        self.render_gallery_critique(out)?;
                    }
                    RequestState::Error { error, .. } => {
                        writeln!(out, "Failed to generate gallery critique: {error}")?;
                    }
                    _ => {}
                }
                Ok(())
            }
        }
    }

    fn apply_critique(
        &mut self,
        image_id: String,
        ticket: Ticket,
        result: Result<Critique, CritiqueError>,
        out: &mut dyn Write,
    ) -> Result<()> {
        let accepted = self
            .critique_slots
            .get_mut(&image_id)
            .map(|slot| slot.resolve(ticket, result))
            .unwrap_or(false);
        if !accepted {
            debug!(image_id = %image_id, ticket, "stale critique outcome discarded");
            if !self.store.contains_image(&image_id) {
                self.report_discarded(&image_id, out)?;
            }
            return Ok(());
        }
        let success = self
            .critique_slots
            .get(&image_id)
            .and_then(|slot| slot.success_for(&image_id))
            .cloned();
        if let Some(critique) = success {
            if self.store.record_critique(critique) == RecordOutcome::ImageMissing {
                if let Some(slot) = self.critique_slots.get_mut(&image_id) {
                    slot.reset();
                }
                return self.report_discarded(&image_id, out);
            }
        }

        let showing = self
            .store
            .selected_image()
            .map(|image| image.id == image_id)
            .unwrap_or(false);
        if showing {
            return self.render_selected(out);
        }
        match self
            .critique_slots
            .get(&image_id)
            .and_then(|slot| slot.error_for(&image_id))
        {
            Some(error) => writeln!(out, "Critique for {image_id} failed: {error}")?,
            None => writeln!(out, "Critique for {image_id} is ready. /select {image_id} to view it.")?,
        }
        Ok(())
    }

    fn report_discarded(&self, image_id: &str, out: &mut dyn Write) -> Result<()> {
        self.emit(
            "critique_discarded",
            json!({"image_id": image_id, "reason": "image_removed"}),
        );
        writeln!(out, "Discarded critique for removed image {image_id}")?;
        Ok(())
    }

    /// Slots are reset rather than dropped so their ticket counters keep
    /// outcomes from an earlier request from matching a new one.
    fn reset_critique_slots(&mut self) {
        for slot in self.critique_slots.values_mut() {
            slot.reset();
        }
    }

    /// Detail view of the selected image. Only state carrying the selected
    /// image id is shown.
    fn render_selected(&self, out: &mut dyn Write) -> Result<()> {
        let Some(image) = self.store.selected_image() else {
            writeln!(out, "No image selected")?;
            return Ok(());
        };
        writeln!(out, "Selected {}: {}", image.id, image.description)?;
        let slot = self.critique_slots.get(&image.id);
        if let Some(RequestState::Pending { subject, .. }) = slot.map(RequestSlot::state) {
            if *subject == image.id {
                writeln!(out, "Critique pending...")?;
                return Ok(());
            }
        }
        if let Some(error) = slot.and_then(|slot| slot.error_for(&image.id)) {
            writeln!(out, "Failed to generate critique: {error}")?;
            return Ok(());
        }
        match self.store.critique_for(&image.id) {
            Some(critique) => write_critique(out, critique),
            None => {
                writeln!(
                    out,
                    "No critique yet. Type your artistic intention to request one."
                )?;
                Ok(())
            }
        }
    }

    fn render_gallery_critique(&self, out: &mut dyn Write) -> Result<()> {
        let Some(result) = self.store.gallery_critique() else {
            return Ok(());
        };
        for (title, statements) in result.sections() {
            writeln!(out, "== {title}")?;
            for statement in statements {
                writeln!(out, "  {}: {}", statement.critic, statement.statement)?;
            }
        }
        Ok(())
    }

    fn report(&self, out: &mut dyn Write) -> Result<()> {
        let entries = self.store.report();
        if entries.is_empty() {
            writeln!(out, "No critiques yet")?;
        }
        for entry in entries {
            let description = entry
                .image
                .map(|image| image.description.as_str())
                .unwrap_or_default();
            writeln!(out, "# {}  {}", entry.critique.image_id, description)?;
            write_critique(out, entry.critique)?;
        }
        Ok(())
    }

    fn save_gallery(&mut self, out: &mut dyn Write) -> Result<()> {
        match self.store.save_gallery() {
            Ok(outcome) => {
                let verb = match outcome {
                    SaveOutcome::Created(_) => "Saved",
                    SaveOutcome::Updated(_) => "Updated",
                };
                writeln!(out, "{verb} gallery {}", outcome.id())?;
                self.persist()?;
            }
            Err(err) => writeln!(out, "{err}")?,
        }
        Ok(())
    }

    fn open_gallery(&mut self, key: &str, out: &mut dyn Write) -> Result<()> {
        match self.store.select_saved_gallery(key) {
            Ok(theme) => {
                let name = theme.name.clone();
                self.reset_critique_slots();
                self.gallery_slot.reset();
                writeln!(
                    out,
                    "Opened '{name}' with {} images and {} critiques",
                    self.store.images().len(),
                    self.store.critiques().len()
                )?;
            }
            Err(err) => writeln!(out, "{err}")?,
        }
        Ok(())
    }

    fn list_agents(&self, out: &mut dyn Write) -> Result<()> {
        for agent in self.agents.list() {
            let active = if self.agents.is_active(agent.id) { "x" } else { " " };
            let pro = if agent.pro { " (pro)" } else { "" };
            let current = if self.critic == Some(agent.id) { " <" } else { "" };
            writeln!(out, "[{active}] {}{pro}{current}", agent.name)?;
        }
        Ok(())
    }

    fn toggle_agent(&mut self, value: Option<&str>, out: &mut dyn Write) -> Result<()> {
        let Some(value) = value else {
            writeln!(out, "/toggle requires a persona name")?;
            return Ok(());
        };
        let toggled = value
            .parse::<Critic>()
            .and_then(|critic| self.agents.toggle(critic).map(|active| (critic, active)));
        match toggled {
            Ok((critic, active)) => {
                let state = if active { "active" } else { "inactive" };
                writeln!(out, "{critic} is now {state}")?;
                if !self
                    .critic
                    .map(|current| self.agents.is_active(current))
                    .unwrap_or(false)
                {
                    self.critic = self.agents.default_selection();
                    match self.critic {
                        Some(current) => writeln!(out, "Critic set to {current}")?,
                        None => writeln!(out, "No critics are active")?,
                    }
                }
                if let Err(err) = self.persist() {
                    warn!(error = %err, "could not persist session snapshot");
                }
            }
            Err(err) => writeln!(out, "{err}")?,
        }
        Ok(())
    }

    fn emit(&self, event_type: &str, fields: Value) {
        if let Err(err) = self.engine.events().emit(event_type, payload(fields)) {
            warn!(error = %err, event_type, "could not write event");
        }
    }
}

/// Runs a worker request, turning a panic into a request error so the
/// outcome is still reported.
fn guarded<T>(
    operation: &str,
    work: impl FnOnce() -> Result<T, CritiqueError>,
) -> Result<T, CritiqueError> {
    panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|_| {
        warn!(operation, "request worker panicked");
        Err(CritiqueError::network(operation, "request worker panicked"))
    })
}

fn write_critique(out: &mut dyn Write, critique: &Critique) -> Result<()> {
    writeln!(out, "Intention: {}", critique.artistic_intention)?;
    writeln!(out, "Critique: {}", critique.critique)?;
    writeln!(out, "Art type: {}", critique.art_type)?;
    writeln!(out, "Theme relevance: {}", critique.theme_relevance)?;
    writeln!(
        out,
        "AI used: {}{}",
        if critique.is_ai_used { "yes" } else { "no" },
        if critique.ai_usage_feedback.is_empty() {
            String::new()
        } else {
            format!(" ({})", critique.ai_usage_feedback)
        }
    )?;
    writeln!(out, "Intention respected: {}", critique.intention_respect_feedback)?;
    Ok(())
}
