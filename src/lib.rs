pub mod clipboard;
pub mod config;
pub mod copy;
pub mod encoder;
pub mod error;
pub mod recognition;
pub mod types;
pub mod workflow;

pub use clipboard::ClipboardWriter;
pub use config::Config;
pub use error::WorkflowError;
pub use recognition::{HttpRecognitionClient, RecognitionEndpoint};
pub use types::{ClipboardEvent, ClipboardItem, ViewState};
pub use workflow::PasteWorkflow;
