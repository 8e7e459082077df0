use std::io::Cursor;

use base64::prelude::*;
use image::{ImageFormat, RgbaImage};

use crate::error::WorkflowError;
use crate::types::{CapturedImage, ClipboardItem};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Turns a pasted file item into a `CapturedImage`.
///
/// The declared MIME type wins; otherwise it is sniffed from the bytes, and
/// unknown content falls back to `application/octet-stream`.
pub fn encode_item(item: &ClipboardItem) -> Result<CapturedImage, WorkflowError> {
    if item.data.is_empty() {
        return Err(WorkflowError::Read("clipboard item is empty".to_string()));
    }

    let mime = if item.mime.trim().is_empty() {
        sniff_mime(&item.data).unwrap_or(FALLBACK_MIME)
    } else {
        item.mime.trim()
    };

    let hash = content_hash(&item.data);
    log::debug!(
        "[Encoder] encoding {} bytes as {} (hash: {})",
        item.data.len(),
        mime,
        hash
    );

    Ok(CapturedImage::new(to_data_url(mime, &item.data), hash))
}

pub fn to_data_url(mime: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64_STANDARD.encode(data))
}

pub fn sniff_mime(data: &[u8]) -> Option<&'static str> {
    image::guess_format(data)
        .ok()
        .map(|format| format.to_mime_type())
}

/// PNG-encodes raw RGBA pixels, as handed out by the system clipboard.
pub fn rgba_to_png(width: u32, height: u32, rgba: Vec<u8>) -> Result<Vec<u8>, WorkflowError> {
    let image = RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
        WorkflowError::Read(format!(
            "pixel buffer does not match {}x{} RGBA",
            width, height
        ))
    })?;

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| {
            log::error!("Failed to encode clipboard image as PNG: {}", e);
            WorkflowError::Encoding(e.to_string())
        })?;
    Ok(png)
}

pub fn content_hash(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
