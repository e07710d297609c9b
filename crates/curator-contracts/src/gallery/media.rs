use serde::Deserialize;
use serde_json::Value;

use super::Image;

/// One media record as returned by the Instagram Graph `me/media` edge.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MediaItem {
    pub id: String,
    pub caption: Option<String>,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub permalink: Option<String>,
    pub timestamp: Option<String>,
    pub media_type: Option<String>,
}

impl MediaItem {
    /// Converts the record into a gallery image; `None` when it has no usable locator.
    pub fn into_image(self) -> Option<Image> {
        let id = self.id.trim().to_string();
        if id.is_empty() {
            return None;
        }
        let is_video = self
            .media_type
            .as_deref()
            .map(|kind| kind.eq_ignore_ascii_case("VIDEO"))
            .unwrap_or(false);
        let locator = if is_video {
            self.thumbnail_url.clone().or(self.media_url.clone())
        } else {
            self.media_url.clone().or(self.thumbnail_url.clone())
        };
        let image_url = locator
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())?;
        let caption = self
            .caption
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());
        let image_hint = caption.and_then(|text| {
            let words: Vec<&str> = text.split_whitespace().take(2).collect();
            (!words.is_empty()).then(|| words.join(" ").to_lowercase())
        });
        Some(Image {
            id,
            description: caption.unwrap_or("Instagram post").to_string(),
            image_url,
            image_hint,
        })
    }
}

/// Reads images out of a feed document.
///
/// Accepted shapes: the media route payload `{"posts": [...]}`, a raw Graph
/// response `{"data": [...]}`, a seed file `{"placeholderImages": [...]}`,
/// or a bare array of either record kind.
pub fn images_from_feed(payload: &Value) -> Vec<Image> {
    let rows = match payload {
        Value::Array(rows) => rows.clone(),
        Value::Object(object) => ["posts", "data", "placeholderImages", "images"]
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_array))
            .cloned()
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    rows.into_iter()
        .filter_map(|row| {
            if row.get("imageUrl").is_some() {
                serde_json::from_value::<Image>(row).ok()
            } else {
                serde_json::from_value::<MediaItem>(row)
                    .ok()
                    .and_then(MediaItem::into_image)
            }
        })
        .collect()
}
