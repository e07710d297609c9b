use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::SavedGallery;
use crate::agents::Critic;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSnapshot {
    pub schema_version: u64,
    pub updated_at: Option<String>,
    pub saved_galleries: Vec<SavedGallery>,
    pub active_agents: Option<Vec<Critic>>,
}

/// JSON file holding what a session keeps between runs.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files load as an empty snapshot.
    pub fn load(&self) -> SessionSnapshot {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str::<SessionSnapshot>(&raw).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, snapshot: &SessionSnapshot) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut stamped = snapshot.clone();
        stamped.schema_version = 1;
        stamped.updated_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false));
        let raw = serde_json::to_string_pretty(&stamped)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("failed writing {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionSnapshot, SnapshotFile};
    use crate::agents::Critic;
    use crate::gallery::{GalleryStore, Image, Theme};

    #[test]
    fn missing_file_loads_empty() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let file = SnapshotFile::new(temp.path().join("state.json"));
        assert_eq!(file.load(), SessionSnapshot::default());
        Ok(())
    }

    #[test]
    fn saved_galleries_survive_reload() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested").join("state.json");
        let mut store = GalleryStore::new();
        store.start_gallery(
            Theme::ai("Golden Hour"),
            vec![Image {
                id: "img1".to_string(),
                description: "dusk".to_string(),
                image_url: "https://picsum.photos/seed/img1/600/400".to_string(),
                image_hint: None,
            }],
        );
        store.save_gallery()?;

        let file = SnapshotFile::new(&path);
        file.save(&SessionSnapshot {
            saved_galleries: store.saved_galleries().to_vec(),
            active_agents: Some(vec![Critic::DefaultAi]),
            ..SessionSnapshot::default()
        })?;

        let loaded = SnapshotFile::new(&path).load();
        assert_eq!(loaded.schema_version, 1);
        assert!(loaded.updated_at.is_some());
        assert_eq!(loaded.saved_galleries, store.saved_galleries().to_vec());
        assert_eq!(loaded.active_agents, Some(vec![Critic::DefaultAi]));
        Ok(())
    }

    #[test]
    fn corrupt_file_loads_empty() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("state.json");
        std::fs::write(&path, "{not json")?;
        assert_eq!(SnapshotFile::new(path).load(), SessionSnapshot::default());
        Ok(())
    }
}
