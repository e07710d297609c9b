use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use curator_contracts::error::CritiqueError;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;

pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Self-describing inline image payload (base64 data plus MIME type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    pub fn encode(fetched: &FetchedImage) -> Self {
        let mime_type = fetched
            .content_type
            .as_deref()
            .and_then(|raw| raw.split(';').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_IMAGE_MIME)
            .to_ascii_lowercase();
        Self {
            mime_type,
            data: BASE64.encode(&fetched.bytes),
        }
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchedImage, CritiqueError>;
}

pub struct HttpImageFetcher {
    http: HttpClient,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: HttpClient::builder().timeout(timeout).build()?,
        })
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedImage, CritiqueError> {
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|err| CritiqueError::network("image fetch", err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CritiqueError::http_status("image fetch", status.as_u16(), ""));
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .map_err(|err| CritiqueError::network("image fetch", err.to_string()))?;
        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{FetchedImage, InlineImage};

    #[test]
    fn encode_defaults_to_jpeg() {
        let inline = InlineImage::encode(&FetchedImage {
            bytes: b"abc".to_vec(),
            content_type: None,
        });
        assert_eq!(inline.mime_type, "image/jpeg");
        assert_eq!(inline.data_uri(), "data:image/jpeg;base64,YWJj");
    }

    #[test]
    fn encode_strips_content_type_parameters() {
        let inline = InlineImage::encode(&FetchedImage {
            bytes: vec![0x89, 0x50],
            content_type: Some("Image/PNG; charset=binary".to_string()),
        });
        assert_eq!(inline.mime_type, "image/png");
    }
}
