//! File validation, upload, and the markup inserted for uploaded media.

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::UploadConfig;
use crate::error::{ByteSize, UploadError, ValidationError};
use crate::markup::{escape_attr, escape_text, escape_url};

/// Which uploader control a file came through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaKind {
    Image,
    Attachment,
}

impl MediaKind {
    pub fn folder(self, config: &UploadConfig) -> &str {
        match self {
            MediaKind::Image => &config.image_folder,
            MediaKind::Attachment => &config.attachment_folder,
        }
    }

    pub fn max_bytes(self, config: &UploadConfig) -> u64 {
        match self {
            MediaKind::Image => config.max_image_bytes,
            MediaKind::Attachment => config.max_attachment_bytes,
        }
    }
}

/// A file picked by the user, fully read into memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaFile {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl MediaFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// A successfully uploaded file. The engine keeps no hold on it once inserted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    pub url: String,
    pub name: String,
    pub size: u64,
}

impl MediaAsset {
    pub fn markup(&self, kind: MediaKind) -> String {
        match kind {
            MediaKind::Image => image_markup(&self.url, &self.name),
            MediaKind::Attachment => attachment_markup(&self.url, &self.name, self.size),
        }
    }
}

/// Check a file against its control's rules. Runs before any network call.
pub fn validate(file: &MediaFile, kind: MediaKind, config: &UploadConfig) -> Result<(), ValidationError> {
    validate_meta(&file.name, &file.mime_type, file.size(), kind, config)
}

/// Same rules as [`validate`], from metadata alone, so a host can reject a
/// file before reading its bytes.
pub fn validate_meta(
    name: &str,
    mime_type: &str,
    size: u64,
    kind: MediaKind,
    config: &UploadConfig,
) -> Result<(), ValidationError> {
    if kind == MediaKind::Image && !mime_type.trim().to_ascii_lowercase().starts_with("image/") {
        return Err(ValidationError::NotAnImage {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
        });
    }
    let limit = kind.max_bytes(config);
    if size > limit {
        return Err(ValidationError::TooLarge {
            name: name.to_string(),
            size: ByteSize(size),
            limit: ByteSize(limit),
        });
    }
    Ok(())
}

/// Image fragment. The data attribute marks it for the resize controls.
pub fn image_markup(url: &str, alt: &str) -> String {
    format!(
        "<img src=\"{}\" alt=\"{}\" draggable=\"false\" data-resizable=\"true\" style=\"max-width: 100%; height: auto;\">",
        escape_url(url),
        escape_attr(alt)
    )
}

/// Download link fragment for a non-image file.
pub fn attachment_markup(url: &str, name: &str, size: u64) -> String {
    format!(
        "<a href=\"{}\" download=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">📎 {} ({})</a>",
        escape_url(url),
        escape_attr(name),
        escape_text(name),
        ByteSize(size)
    )
}

/// Sends a file to storage and yields its public URL.
pub trait Uploader {
    fn upload(&self, file: &MediaFile, folder: &str) -> impl Future<Output = Result<String, UploadError>>;
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(alias = "publicUrl")]
    url: Option<String>,
}

/// Pull the asset URL out of a success body.
pub fn parse_upload_response(body: &str) -> Result<String, UploadError> {
    let response: UploadResponse =
        serde_json::from_str(body).map_err(|e| UploadError::Response(e.to_string()))?;
    match response.url.map(|u| u.trim().to_string()) {
        Some(url) if !url.is_empty() => Ok(url),
        _ => Err(UploadError::Response("response has no url".to_string())),
    }
}

/// Multipart POST of `file` and `folder` to a fixed endpoint.
#[derive(Clone, Debug)]
pub struct HttpUploader {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpUploader {
    /// `endpoint` must be absolute; hosts resolve relative paths first.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn form(file: &MediaFile, folder: &str) -> reqwest::multipart::Form {
        use reqwest::multipart::{Form, Part};

        let data = file.data.to_vec();
        let part = match Part::bytes(data.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
        {
            Ok(part) => part,
            Err(_) => Part::bytes(data).file_name(file.name.clone()),
        };
        Form::new().part("file", part).text("folder", folder.to_string())
    }
}

impl Uploader for HttpUploader {
    fn upload(&self, file: &MediaFile, folder: &str) -> impl Future<Output = Result<String, UploadError>> {
        let request = self
            .client
            .post(&self.endpoint)
            .multipart(Self::form(file, folder));
        let name = file.name.clone();
        async move {
            debug!(target: "atelier::upload", %name, "sending upload");
            let response = request
                .send()
                .await
                .map_err(|e| UploadError::Transport(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(UploadError::Status(status.as_u16()));
            }
            let body = response
                .text()
                .await
                .map_err(|e| UploadError::Response(e.to_string()))?;
            parse_upload_response(&body)
        }
    }
}

/// Busy flag for one uploader control.
#[derive(Clone, Debug, Default)]
pub struct UploadSlot {
    busy: Rc<Cell<bool>>,
}

impl UploadSlot {
    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// Mark the slot busy, or `None` if an upload is already in flight.
    pub fn try_acquire(&self) -> Option<UploadPermit> {
        if self.busy.replace(true) {
            return None;
        }
        Some(UploadPermit {
            busy: Rc::clone(&self.busy),
        })
    }
}

/// Held for the lifetime of one upload; dropping it frees the slot.
#[derive(Debug)]
pub struct UploadPermit {
    busy: Rc<Cell<bool>>,
}

impl Drop for UploadPermit {
    fn drop(&mut self) {
        self.busy.set(false);
    }
}

/// An accepted upload waiting for the network, with the caret it returns to.
#[derive(Debug)]
pub struct UploadTicket<R> {
    pub kind: MediaKind,
    pub folder: String,
    pub(crate) snapshot: Option<R>,
    pub(crate) _permit: UploadPermit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    Inserted(MediaAsset),
    /// The control was busy; the submission was dropped.
    Ignored,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: usize = 1024 * 1024;

    fn file(name: &str, mime: &str, len: usize) -> MediaFile {
        MediaFile::new(name, mime, vec![0u8; len])
    }

    #[test]
    fn test_image_rules() {
        let config = UploadConfig::default();
        assert!(matches!(
            validate(&file("notes.txt", "text/plain", 10), MediaKind::Image, &config),
            Err(ValidationError::NotAnImage { .. })
        ));
        assert!(matches!(
            validate(&file("big.jpg", "image/jpeg", 6 * MB), MediaKind::Image, &config),
            Err(ValidationError::TooLarge { .. })
        ));
        assert!(validate(&file("ok.png", "image/png", 5 * MB), MediaKind::Image, &config).is_ok());
    }

    #[test]
    fn test_attachment_rules() {
        let config = UploadConfig::default();
        assert!(validate(&file("big.jpg", "image/jpeg", 6 * MB), MediaKind::Attachment, &config).is_ok());
        assert!(validate(&file("notes.txt", "text/plain", 10), MediaKind::Attachment, &config).is_ok());
        assert!(matches!(
            validate(&file("huge.zip", "application/zip", 11 * MB), MediaKind::Attachment, &config),
            Err(ValidationError::TooLarge { .. })
        ));
        assert!(validate(&file("empty.txt", "text/plain", 0), MediaKind::Attachment, &config).is_ok());
    }

    #[test]
    fn test_metadata_checks_match_file_checks() {
        let config = UploadConfig::default();
        assert!(matches!(
            validate_meta("huge.zip", "application/zip", (11 * MB) as u64, MediaKind::Attachment, &config),
            Err(ValidationError::TooLarge { .. })
        ));
        assert!(matches!(
            validate_meta("notes.txt", "text/plain", 10, MediaKind::Image, &config),
            Err(ValidationError::NotAnImage { .. })
        ));
        assert!(validate_meta("cat.png", "image/png", (5 * MB) as u64, MediaKind::Image, &config).is_ok());
    }

    #[test]
    fn test_response_parsing() {
        assert_eq!(
            parse_upload_response(r#"{"url":"https://cdn.example/a.png"}"#).unwrap(),
            "https://cdn.example/a.png"
        );
        assert_eq!(
            parse_upload_response(r#"{"publicUrl":"https://cdn.example/b.png","path":"x"}"#)
                .unwrap(),
            "https://cdn.example/b.png"
        );
        assert!(matches!(
            parse_upload_response(r#"{"url":""}"#),
            Err(UploadError::Response(_))
        ));
        assert!(matches!(
            parse_upload_response("<html>oops</html>"),
            Err(UploadError::Response(_))
        ));
    }

    #[test]
    fn test_markup_fragments() {
        insta::assert_snapshot!(
            image_markup("https://cdn.example/cat.png", "cat \"1\".png"),
            @r#"<img src="https://cdn.example/cat.png" alt="cat &quot;1&quot;.png" draggable="false" data-resizable="true" style="max-width: 100%; height: auto;">"#
        );
        insta::assert_snapshot!(
            attachment_markup("https://cdn.example/r.pdf", "report.pdf", 2 * 1024 * 1024),
            @r#"<a href="https://cdn.example/r.pdf" download="report.pdf" target="_blank" rel="noopener noreferrer">📎 report.pdf (2 MB)</a>"#
        );
    }

    #[test]
    fn test_slot_is_exclusive_until_permit_drops() {
        let slot = UploadSlot::default();
        let permit = slot.try_acquire().unwrap();
        assert!(slot.is_busy());
        assert!(slot.try_acquire().is_none());
        drop(permit);
        assert!(!slot.is_busy());
        assert!(slot.try_acquire().is_some());
    }
}
