mod media;
mod snapshot;
mod store;

pub use media::{images_from_feed, MediaItem};
pub use snapshot::{SessionSnapshot, SnapshotFile};
pub use store::{GalleryStore, RecordOutcome, ReportEntry, SaveOutcome};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: String,
    pub description: String,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeSource {
    User,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub source: ThemeSource,
}

impl Theme {
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: ThemeSource::User,
        }
    }

    pub fn ai(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: ThemeSource::Ai,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedGallery {
    pub id: String,
    pub theme: Theme,
    pub images: Vec<Image>,
    pub critiques: Vec<crate::critique::Critique>,
}
