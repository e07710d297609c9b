use std::collections::HashSet;

use uuid::Uuid;

use super::{Image, SavedGallery, Theme};
use crate::critique::{Critique, GalleryCritiqueResult};
use crate::error::CritiqueError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Inserted,
    /// A previous critique for the same image was evicted.
    Replaced,
    /// The image left the gallery while its request was in flight; nothing was stored.
    ImageMissing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Created(String),
    Updated(String),
}

impl SaveOutcome {
    pub fn id(&self) -> &str {
        match self {
            SaveOutcome::Created(id) | SaveOutcome::Updated(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportEntry<'a> {
    pub critique: &'a Critique,
    pub image: Option<&'a Image>,
}

/// Session state for the active gallery and the saved-gallery collection.
///
/// Invariants held after every operation:
/// - each image id appears at most once in `images`
/// - each image id has at most one critique, and only while the image is present
#[derive(Debug, Clone, Default)]
pub struct GalleryStore {
    theme: Option<Theme>,
    images: Vec<Image>,
    critiques: Vec<Critique>,
    selected_image: Option<String>,
    gallery_critique: Option<GalleryCritiqueResult>,
    saved: Vec<SavedGallery>,
}

impl GalleryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn theme(&self) -> Option<&Theme> {
        self.theme.as_ref()
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn image(&self, image_id: &str) -> Option<&Image> {
        self.images.iter().find(|image| image.id == image_id)
    }

    pub fn contains_image(&self, image_id: &str) -> bool {
        self.image(image_id).is_some()
    }

    pub fn critiques(&self) -> &[Critique] {
        &self.critiques
    }

    pub fn critique_for(&self, image_id: &str) -> Option<&Critique> {
        self.critiques
            .iter()
            .find(|critique| critique.image_id == image_id)
    }

    pub fn selected_image(&self) -> Option<&Image> {
        self.selected_image
            .as_deref()
            .and_then(|image_id| self.image(image_id))
    }

    pub fn gallery_critique(&self) -> Option<&GalleryCritiqueResult> {
        self.gallery_critique.as_ref()
    }

    pub fn saved_galleries(&self) -> &[SavedGallery] {
        &self.saved
    }

    /// Starts a fresh gallery: replaces the images and drops every critique,
    /// the detail view and the gallery critique.
    pub fn start_gallery(&mut self, theme: Theme, images: Vec<Image>) -> usize {
        self.theme = Some(theme);
        self.images.clear();
        self.critiques.clear();
        self.selected_image = None;
        self.gallery_critique = None;
        self.add_images(images).len()
    }

    /// Appends images whose ids are not yet present and returns the ids added.
    pub fn add_images(&mut self, images: impl IntoIterator<Item = Image>) -> Vec<String> {
        let mut seen: HashSet<String> = self.images.iter().map(|image| image.id.clone()).collect();
        let mut added = Vec::new();
        for image in images {
            if !seen.insert(image.id.clone()) {
                continue;
            }
            added.push(image.id.clone());
            self.images.push(image);
        }
        added
    }

    /// Removes the image, its critique and any detail view pointing at it.
    pub fn remove_image(&mut self, image_id: &str) -> bool {
        let before = self.images.len();
        self.images.retain(|image| image.id != image_id);
        if self.images.len() == before {
            return false;
        }
        self.critiques
            .retain(|critique| critique.image_id != image_id);
        if self.selected_image.as_deref() == Some(image_id) {
            self.selected_image = None;
        }
        true
    }

    pub fn select_image(&mut self, image_id: &str) -> bool {
        if !self.contains_image(image_id) {
            return false;
        }
        self.selected_image = Some(image_id.to_string());
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected_image = None;
    }

    /// Upserts the critique for its image, provided the image is still in the gallery.
    pub fn record_critique(&mut self, critique: Critique) -> RecordOutcome {
        if !self.contains_image(&critique.image_id) {
            return RecordOutcome::ImageMissing;
        }
        let before = self.critiques.len();
        self.critiques
            .retain(|existing| existing.image_id != critique.image_id);
        let outcome = if self.critiques.len() == before {
            RecordOutcome::Inserted
        } else {
            RecordOutcome::Replaced
        };
        self.critiques.push(critique);
        outcome
    }

    pub fn delete_critique(&mut self, image_id: &str) -> bool {
        let before = self.critiques.len();
        self.critiques
            .retain(|critique| critique.image_id != image_id);
        self.critiques.len() != before
    }

    pub fn set_gallery_critique(&mut self, result: GalleryCritiqueResult) {
        self.gallery_critique = Some(result);
    }

    pub fn clear_gallery_critique(&mut self) -> bool {
        self.gallery_critique.take().is_some()
    }

    /// Saves the active gallery under its theme name.
    pub fn save_gallery(&mut self) -> Result<SaveOutcome, CritiqueError> {
        let Some(theme) = self.theme.clone() else {
            return Err(CritiqueError::validation(
                "theme",
                "Create a themed gallery before saving.",
            ));
        };
        let images = self.images.clone();
        let critiques = self.critiques.clone();
        Ok(self.save_gallery_as(theme, images, critiques))
    }

    /// Saves under `theme.name`: an existing entry with that name is updated
    /// in place, otherwise a new entry with a fresh id is appended.
    pub fn save_gallery_as(
        &mut self,
        theme: Theme,
        images: Vec<Image>,
        critiques: Vec<Critique>,
    ) -> SaveOutcome {
        if let Some(existing) = self
            .saved
            .iter_mut()
            .find(|gallery| gallery.theme.name == theme.name)
        {
            existing.images = images;
            existing.critiques = critiques;
            return SaveOutcome::Updated(existing.id.clone());
        }
        let id = format!("{}-{}", theme.name, Uuid::new_v4().simple());
        self.saved.push(SavedGallery {
            id: id.clone(),
            theme,
            images,
            critiques,
        });
        SaveOutcome::Created(id)
    }

    /// Loads a saved gallery (by id or theme name) as the active gallery,
    /// replacing the current state wholesale.
    pub fn select_saved_gallery(&mut self, key: &str) -> Result<&Theme, CritiqueError> {
        let Some(gallery) = self
            .saved
            .iter()
            .find(|gallery| gallery.id == key)
            .or_else(|| self.saved.iter().find(|gallery| gallery.theme.name == key))
            .cloned()
        else {
            return Err(CritiqueError::validation(
                "gallery",
                format!("No saved gallery named '{key}'."),
            ));
        };

        self.start_gallery(gallery.theme, gallery.images);
        for critique in gallery.critiques {
            self.record_critique(critique);
        }
        self.theme.as_ref().ok_or_else(|| {
            CritiqueError::validation("gallery", "Saved gallery has no theme.")
        })
    }

    pub fn restore_saved(&mut self, saved: Vec<SavedGallery>) {
        self.saved = saved;
    }

    /// Every critique joined to its image, in critique order.
    pub fn report(&self) -> Vec<ReportEntry<'_>> {
        self.critiques
            .iter()
            .map(|critique| ReportEntry {
                critique,
                image: self.image(&critique.image_id),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{GalleryStore, RecordOutcome, SaveOutcome};
    use crate::critique::{Critique, GalleryCritiqueResult};
    use crate::gallery::{Image, Theme};

    fn image(id: &str) -> Image {
        Image {
            id: id.to_string(),
            description: format!("image {id}"),
            image_url: format!("https://picsum.photos/seed/{id}/600/400"),
            image_hint: None,
        }
    }

    fn critique(image_id: &str, text: &str) -> Critique {
        Critique {
            image_id: image_id.to_string(),
            artistic_intention: "mood".to_string(),
            critique: text.to_string(),
            ..Critique::default()
        }
    }

    fn gallery(ids: &[&str]) -> GalleryStore {
        let mut store = GalleryStore::new();
        store.start_gallery(
            Theme::user("Urban Noir"),
            ids.iter().map(|id| image(id)).collect(),
        );
        store
    }

    #[test]
    fn record_keeps_only_latest_critique_per_image() {
        let mut store = gallery(&["img1"]);
        assert_eq!(
            store.record_critique(critique("img1", "A")),
            RecordOutcome::Inserted
        );
        assert_eq!(
            store.record_critique(critique("img1", "B")),
            RecordOutcome::Replaced
        );
        assert_eq!(store.critiques().len(), 1);
        assert_eq!(
            store.critique_for("img1").map(|c| c.critique.as_str()),
            Some("B")
        );
    }

    #[test]
    fn remove_image_cascades_to_critique_and_selection() {
        let mut store = gallery(&["img1", "img2"]);
        store.record_critique(critique("img1", "A"));
        assert!(store.select_image("img1"));

        assert!(store.remove_image("img1"));
        let ids: Vec<&str> = store.images().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["img2"]);
        assert!(store.critiques().is_empty());
        assert!(store.selected_image().is_none());
    }

    #[test]
    fn add_is_idempotent_by_id() {
        let mut store = gallery(&["img1"]);
        let added = store.add_images(vec![image("img1"), image("img2"), image("img2")]);
        assert_eq!(added, vec!["img2".to_string()]);
        let count = store.images().iter().filter(|i| i.id == "img1").count();
        assert_eq!(count, 1);
        assert_eq!(store.images().len(), 2);
    }

    #[test]
    fn late_critique_for_removed_image_is_dropped() {
        let mut store = gallery(&["img1"]);
        assert!(store.remove_image("img1"));
        assert_eq!(
            store.record_critique(critique("img1", "late")),
            RecordOutcome::ImageMissing
        );
        assert!(store.critiques().is_empty());
        assert!(store.images().is_empty());
    }

    #[test]
    fn delete_critique_is_noop_when_absent() {
        let mut store = gallery(&["img1"]);
        assert!(!store.delete_critique("img1"));
        store.record_critique(critique("img1", "A"));
        assert!(store.delete_critique("img1"));
        assert!(store.critique_for("img1").is_none());
    }

    #[test]
    fn saving_same_theme_twice_updates_in_place() -> anyhow::Result<()> {
        let mut store = gallery(&["img1"]);
        let first = store.save_gallery()?;
        assert!(matches!(first, SaveOutcome::Created(_)));

        store.start_gallery(Theme::user("Urban Noir"), vec![image("img2"), image("img3")]);
        let second = store.save_gallery()?;
        assert_eq!(second, SaveOutcome::Updated(first.id().to_string()));

        let saved: Vec<_> = store
            .saved_galleries()
            .iter()
            .filter(|g| g.theme.name == "Urban Noir")
            .collect();
        assert_eq!(saved.len(), 1);
        let ids: Vec<&str> = saved[0].images.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["img2", "img3"]);
        Ok(())
    }

    #[test]
    fn save_requires_theme() {
        let mut store = GalleryStore::new();
        assert!(store.save_gallery().is_err());
    }

    #[test]
    fn select_saved_gallery_replaces_state_wholesale() -> anyhow::Result<()> {
        let mut store = gallery(&["img1"]);
        store.record_critique(critique("img1", "kept"));
        store.save_gallery()?;

        store.start_gallery(Theme::user("Golden Hour"), vec![image("img9")]);
        store.select_image("img9");
        store.set_gallery_critique(GalleryCritiqueResult::default());

        let theme = store.select_saved_gallery("Urban Noir")?.name.clone();
        assert_eq!(theme, "Urban Noir");
        let ids: Vec<&str> = store.images().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["img1"]);
        assert_eq!(
            store.critique_for("img1").map(|c| c.critique.as_str()),
            Some("kept")
        );
        assert!(store.selected_image().is_none());
        assert!(store.gallery_critique().is_none());
        assert!(store.select_saved_gallery("Missing").is_err());
        Ok(())
    }

    #[test]
    fn report_joins_critiques_to_images() {
        let mut store = gallery(&["img1", "img2"]);
        store.record_critique(critique("img2", "two"));
        store.record_critique(critique("img1", "one"));
        let report = store.report();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].critique.image_id, "img2");
        assert_eq!(report[0].image.map(|i| i.id.as_str()), Some("img2"));
    }
}
