use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::clipboard::ClipboardWriter;
use crate::config::CopyConfig;
use crate::error::WorkflowError;

/// A closure run once after a delay unless cancelled first. Dropping it cancels it.
pub struct ScheduledAction {
    handle: JoinHandle<()>,
}

impl ScheduledAction {
    /// Must be called from within a tokio runtime.
    pub fn after<F>(delay: Duration, action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });
        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for ScheduledAction {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// The "copy text" button: writes the result to the clipboard and flashes a
/// confirmation label.
pub struct CopyAffordance {
    writer: Arc<dyn ClipboardWriter>,
    label: String,
    confirmation: String,
    revert_after: Duration,
    label_tx: watch::Sender<String>,
    revert: Mutex<Option<ScheduledAction>>,
}

impl CopyAffordance {
    pub fn new(writer: Arc<dyn ClipboardWriter>, config: &CopyConfig) -> Self {
        let (label_tx, _) = watch::channel(config.label.clone());
        Self {
            writer,
            label: config.label.clone(),
            confirmation: config.confirmation.clone(),
            revert_after: config.revert_after(),
            label_tx,
            revert: Mutex::new(None),
        }
    }

    /// Re-activating while the confirmation shows replaces the pending revert,
    /// so the label returns `revert_after` past the latest activation.
    pub fn activate(&self, text: &str) -> Result<(), WorkflowError> {
        self.label_tx.send_replace(self.label.clone());

        self.writer
            .write_text(text)
            .map_err(|e| WorkflowError::Clipboard(e.to_string()))?;

        self.label_tx.send_replace(self.confirmation.clone());

        let label_tx = self.label_tx.clone();
        let original = self.label.clone();
        let action = ScheduledAction::after(self.revert_after, move || {
            label_tx.send_replace(original);
        });

        let previous = self
            .revert
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(action);
        if let Some(previous) = previous {
            previous.cancel();
        }

        log::info!("Copied {} chars of result text", text.chars().count());
        Ok(())
    }

    pub fn label(&self) -> String {
        self.label_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.label_tx.subscribe()
    }
}
