use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

pub const PROCESSING_MESSAGE: &str = "Processing image...";
pub const SUCCESS_MESSAGE: &str = "Image processed! Paste another image to process it.";
pub const RETRY_PROMPT: &str = "Paste another image to process it.";
pub const NO_IMAGE_MESSAGE: &str =
    "Bad request: No image found in clipboard. Paste another image to process it.";

/// Appends the fixed "paste another image" instruction to an error description.
pub fn with_retry_prompt(message: &str) -> String {
    format!("{}. {}", message, RETRY_PROMPT)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    File,
    String,
}

/// One entry of a paste payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipboardItem {
    pub kind: ItemKind,
    /// May be empty when the source did not declare a type.
    pub mime: String,
    pub data: Vec<u8>,
}

impl ClipboardItem {
    pub fn file(mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            kind: ItemKind::File,
            mime: mime.into(),
            data,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::String,
            mime: "text/plain".to_string(),
            data: text.into().into_bytes(),
        }
    }
}

/// A paste event: the items in the order the platform reported them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClipboardEvent {
    pub items: Vec<ClipboardItem>,
}

impl ClipboardEvent {
    pub fn new(items: Vec<ClipboardItem>) -> Self {
        Self { items }
    }
}

/// The most recently pasted image as a `data:<mime>;base64,<payload>` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    data_url: String,
    content_id: String,
    captured_at: DateTime<Utc>,
}

impl CapturedImage {
    pub(crate) fn new(data_url: String, content_id: String) -> Self {
        Self {
            data_url,
            content_id,
            captured_at: Utc::now(),
        }
    }

    /// Accepts only self-describing data URLs; the id is derived from the string itself.
    pub fn parse(data_url: &str) -> Result<Self, WorkflowError> {
        if !data_url.starts_with("data:") || !data_url.contains(',') {
            return Err(WorkflowError::Encoding(format!(
                "not a data URL: {}",
                data_url.chars().take(32).collect::<String>()
            )));
        }
        let content_id = crate::encoder::content_hash(data_url.as_bytes());
        Ok(Self::new(data_url.to_string(), content_id))
    }

    pub fn as_str(&self) -> &str {
        &self.data_url
    }

    pub fn mime_type(&self) -> &str {
        let header = self.header();
        let header = header.strip_prefix("data:").unwrap_or(header);
        header.split(';').next().unwrap_or("")
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    fn header(&self) -> &str {
        self.data_url.split_once(',').map(|(h, _)| h).unwrap_or("")
    }
}

/// Recognition language code; the empty string means the endpoint default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageHint(String);

impl LanguageHint {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LanguageHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "(default)")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub image: CapturedImage,
    pub language: LanguageHint,
}

/// What the recognition endpoint answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    /// Success body, displayed verbatim.
    Recognized(String),
    /// Non-success body, assumed to be a readable message.
    Rejected(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum WorkflowStatus {
    #[default]
    Idle,
    Processing,
    Success,
    Failure(String),
}

impl WorkflowStatus {
    pub fn message(&self) -> &str {
        match self {
            WorkflowStatus::Idle => "",
            WorkflowStatus::Processing => PROCESSING_MESSAGE,
            WorkflowStatus::Success => SUCCESS_MESSAGE,
            WorkflowStatus::Failure(message) => message,
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Everything the page shows, minus the copy button label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub status: WorkflowStatus,
    pub result_text: String,
    pub result_visible: bool,
    pub copy_visible: bool,
    /// Can be megabytes; sent to the page only when it changes.
    #[serde(skip_serializing)]
    pub image_src: Option<String>,
    pub image_visible: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_strings_without_data_scheme_or_separator() {
        assert!(CapturedImage::parse("image/png;base64,AAAA").is_err());
        assert!(CapturedImage::parse("data:image/png;base64").is_err());
        assert!(CapturedImage::parse("data:image/png;base64,AAAA").is_ok());
    }

    #[test]
    fn capture_time_is_taken_when_the_image_is_built() {
        let before = Utc::now();
        let image = CapturedImage::parse("data:image/png;base64,AAAA").unwrap();
        assert!(image.captured_at() >= before);
        assert!(image.captured_at() <= Utc::now());
    }

    #[test]
    fn captured_image_exposes_mime() {
        let image = CapturedImage::parse("data:image/jpeg;base64,aGVsbG8=").unwrap();
        assert_eq!(image.mime_type(), "image/jpeg");
        assert_eq!(image.content_id().len(), 64);
    }

    #[test]
    fn status_messages() {
        assert_eq!(WorkflowStatus::Idle.message(), "");
        assert_eq!(WorkflowStatus::Processing.to_string(), "Processing image...");
        assert_eq!(
            WorkflowStatus::Success.to_string(),
            "Image processed! Paste another image to process it."
        );
        assert_eq!(
            with_retry_prompt("Bad request: too large"),
            "Bad request: too large. Paste another image to process it."
        );
    }

    #[test]
    fn view_state_serializes_status_with_tag() {
        let view = ViewState {
            status: WorkflowStatus::Failure("boom".into()),
            ..ViewState::default()
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"]["state"], "failure");
        assert_eq!(json["status"]["message"], "boom");
    }

    #[test]
    fn serialized_view_leaves_out_the_image_data() {
        let view = ViewState {
            image_src: Some(format!("data:image/png;base64,{}", "A".repeat(4096))),
            image_visible: true,
            ..ViewState::default()
        };
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("image_src").is_none());
        assert_eq!(json["image_visible"], true);
        assert!(json.to_string().len() < 256);
    }

    #[test]
    fn default_language_displays_placeholder() {
        assert!(LanguageHint::default().is_default());
        assert_eq!(LanguageHint::default().to_string(), "(default)");
        assert_eq!(LanguageHint::new("rus+eng").to_string(), "rus+eng");
    }
}
