use std::path::Path;

use log::info;

use crate::encoder;
use crate::error::WorkflowError;
use crate::types::{ClipboardEvent, ClipboardItem, ItemKind};

/// Returns the first file-kind item; anything after it is ignored.
pub fn first_file_item(event: &ClipboardEvent) -> Option<&ClipboardItem> {
    event.items.iter().find(|item| item.kind == ItemKind::File)
}

/// Destination for the copy button; the host supplies the system clipboard.
pub trait ClipboardWriter: Send + Sync {
    fn write_text(&self, text: &str) -> anyhow::Result<()>;
}

/// Builds a paste event carrying one image file read from disk.
pub async fn event_from_file(path: &Path) -> Result<ClipboardEvent, WorkflowError> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| WorkflowError::Read(format!("{}: {}", path.display(), e)))?;
    let mime = encoder::sniff_mime(&data).unwrap_or_default();
    info!(
        "Read {} ({} bytes, mime: {})",
        path.display(),
        data.len(),
        if mime.is_empty() { "unknown" } else { mime }
    );
    Ok(ClipboardEvent::new(vec![ClipboardItem::file(mime, data)]))
}
