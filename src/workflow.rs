//! Paste → encode → recognize → reconcile.
//!
//! `PasteWorkflow` owns the only mutable state of the page: the captured image,
//! the selected language and the projected [`ViewState`]. All writes go through
//! the transitions on [`WorkflowState`]; every change is published on a `watch`
//! channel for whatever renders the page.
//!
//! Requests are never cancelled or serialized. Which response ends up on
//! screen when several overlap is decided by [`RacePolicy`].

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::clipboard::{self, ClipboardWriter};
use crate::config::{Config, LanguageConfig, RacePolicy};
use crate::copy::CopyAffordance;
use crate::encoder;
use crate::error::WorkflowError;
use crate::recognition::RecognitionEndpoint;
use crate::types::{
    with_retry_prompt, CapturedImage, ClipboardEvent, ExtractionRequest, ExtractionResult,
    LanguageHint, ViewState, WorkflowStatus, NO_IMAGE_MESSAGE,
};

#[derive(Debug, Clone)]
pub struct WorkflowState {
    captured: Option<CapturedImage>,
    language: LanguageHint,
    view: ViewState,
    next_seq: u64,
    captured_seq: u64,
    displayed_seq: u64,
}

impl WorkflowState {
    pub fn new(language: LanguageHint) -> Self {
        Self {
            captured: None,
            language,
            view: ViewState::default(),
            next_seq: 0,
            captured_seq: 0,
            displayed_seq: 0,
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn captured(&self) -> Option<&CapturedImage> {
        self.captured.as_ref()
    }

    pub fn language(&self) -> &LanguageHint {
        &self.language
    }

    /// A paste arrived: show progress and hide the copy button and preview.
    /// The result region stays as it is until a file item is accepted.
    pub fn begin_paste(&mut self) {
        self.view.status = WorkflowStatus::Processing;
        self.view.copy_visible = false;
        self.view.image_visible = false;
    }

    pub fn no_image(&mut self) {
        self.view.status = WorkflowStatus::Failure(NO_IMAGE_MESSAGE.to_string());
    }

    /// A file item was selected; returns the sequence number its capture and
    /// request will carry.
    pub fn accept_file(&mut self) -> u64 {
        self.view.result_visible = false;
        self.next_seq += 1;
        self.next_seq
    }

    /// Stores the image encoded for paste `seq` and builds its request.
    /// Under `LatestRequestWins` an encoding that finishes after a newer
    /// paste's is dropped and `None` is returned.
    pub fn capture(
        &mut self,
        seq: u64,
        image: CapturedImage,
        policy: RacePolicy,
    ) -> Option<ExtractionRequest> {
        if policy == RacePolicy::LatestRequestWins && seq < self.captured_seq {
            return None;
        }
        self.captured_seq = seq;
        self.captured = Some(image.clone());
        Some(ExtractionRequest {
            image,
            language: self.language.clone(),
        })
    }

    /// Encoding for paste `seq` failed. Under `LatestRequestWins` the failure
    /// is dropped once a newer paste has been captured or answered.
    pub fn capture_failed(&mut self, seq: u64, error: WorkflowError, policy: RacePolicy) -> bool {
        if policy == RacePolicy::LatestRequestWins && seq < self.captured_seq {
            return false;
        }
        self.reconcile(seq, Err(error), policy)
    }

    /// Issues a request against the live image, tagged with the next sequence number.
    pub fn issue_request(&mut self) -> Option<(u64, ExtractionRequest)> {
        let image = self.captured.clone()?;
        self.next_seq += 1;
        self.view.status = WorkflowStatus::Processing;
        Some((
            self.next_seq,
            ExtractionRequest {
                image,
                language: self.language.clone(),
            },
        ))
    }

    pub fn select_language(&mut self, language: LanguageHint) {
        self.language = language;
    }

    /// Applies the outcome of request `seq`. Returns `false` when the policy
    /// discarded it.
    pub fn reconcile(
        &mut self,
        seq: u64,
        outcome: Result<ExtractionResult, WorkflowError>,
        policy: RacePolicy,
    ) -> bool {
        if policy == RacePolicy::LatestRequestWins && seq < self.displayed_seq {
            return false;
        }
        self.displayed_seq = seq;

        match outcome {
            Ok(ExtractionResult::Recognized(text)) => self.succeed(text),
            Ok(ExtractionResult::Rejected(body)) => {
                self.view.status = WorkflowStatus::Failure(with_retry_prompt(&body));
            }
            Err(e) => self.fail_client(&e),
        }
        true
    }

    pub fn fail_client(&mut self, error: &WorkflowError) {
        self.view.status =
            WorkflowStatus::Failure(with_retry_prompt(&format!("Client error: {}", error)));
    }

    fn succeed(&mut self, text: String) {
        self.view.status = WorkflowStatus::Success;
        self.view.result_text = text;
        self.view.result_visible = true;
        self.view.copy_visible = true;
        self.view.image_src = self.captured.as_ref().map(|c| c.as_str().to_string());
        self.view.image_visible = self.view.image_src.is_some();
    }
}

struct Inner {
    state: Mutex<WorkflowState>,
    view_tx: watch::Sender<ViewState>,
    endpoint: Arc<dyn RecognitionEndpoint>,
    languages: LanguageConfig,
    race_policy: RacePolicy,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, WorkflowState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Runs `f` on the state and publishes the resulting view.
    fn update<R>(&self, f: impl FnOnce(&mut WorkflowState) -> R) -> R {
        let mut state = self.state();
        let out = f(&mut state);
        self.view_tx.send_replace(state.view.clone());
        out
    }

    async fn extract(&self, seq: u64, request: ExtractionRequest) {
        info!(
            "[Workflow] request #{} submitted (image: {}, language: {})",
            seq,
            request.image.content_id(),
            request.language
        );

        let outcome = self.endpoint.recognize(&request).await;
        match &outcome {
            Ok(ExtractionResult::Recognized(text)) => {
                info!("[Workflow] request #{} recognized {} chars", seq, text.len())
            }
            Ok(ExtractionResult::Rejected(body)) => {
                warn!("[Workflow] request #{} rejected: {}", seq, body)
            }
            Err(e) => error!("[Workflow] request #{} failed: {}", seq, e),
        }

        let policy = self.race_policy;
        let applied = self.update(|state| state.reconcile(seq, outcome, policy));
        if !applied {
            debug!("[Workflow] discarded stale response for request #{}", seq);
        }
    }
}

/// Controller bound to a single page.
#[derive(Clone)]
pub struct PasteWorkflow {
    inner: Arc<Inner>,
    copy: Arc<CopyAffordance>,
}

impl PasteWorkflow {
    pub fn new(
        config: &Config,
        endpoint: Arc<dyn RecognitionEndpoint>,
        clipboard: Arc<dyn ClipboardWriter>,
    ) -> Self {
        let state = WorkflowState::new(config.default_language());
        let (view_tx, _) = watch::channel(state.view.clone());

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                view_tx,
                endpoint,
                languages: config.languages.clone(),
                race_policy: config.workflow.race_policy,
            }),
            copy: Arc::new(CopyAffordance::new(clipboard, &config.copy)),
        }
    }

    /// Handles a paste event.
    ///
    /// UI effects happen before this returns; encoding and the request run on a
    /// spawned task whose handle is returned. `None` means the payload had no
    /// file item and nothing was submitted.
    pub fn handle_paste(&self, event: ClipboardEvent) -> Option<JoinHandle<()>> {
        self.inner.update(WorkflowState::begin_paste);

        let Some(item) = clipboard::first_file_item(&event).cloned() else {
            info!("[Workflow] paste without a file item ({} items)", event.items.len());
            self.inner.update(WorkflowState::no_image);
            return None;
        };

        let seq = self.inner.update(WorkflowState::accept_file);
        let inner = self.inner.clone();
        Some(tokio::spawn(async move {
            let encoded = tokio::task::spawn_blocking(move || encoder::encode_item(&item))
                .await
                .map_err(WorkflowError::from)
                .and_then(|r| r);

            let policy = inner.race_policy;
            let image = match encoded {
                Ok(image) => image,
                Err(e) => {
                    error!("[Workflow] failed to capture pasted image #{}: {}", seq, e);
                    if !inner.update(|state| state.capture_failed(seq, e, policy)) {
                        debug!("[Workflow] discarded stale capture failure #{}", seq);
                    }
                    return;
                }
            };

            info!(
                "[Workflow] captured image {} ({}) at {}",
                image.content_id(),
                image.mime_type(),
                image.captured_at().to_rfc3339()
            );
            match inner.update(|state| state.capture(seq, image, policy)) {
                Some(request) => inner.extract(seq, request).await,
                None => debug!("[Workflow] discarded stale capture #{}", seq),
            }
        }))
    }

    /// Reports a failure that happened before a paste event could be built.
    pub fn fail_capture(&self, error: WorkflowError) {
        error!("[Workflow] capture failed: {}", error);
        self.inner.update(|state| {
            state.begin_paste();
            state.fail_client(&error);
        });
    }

    /// Language selector change. Re-submits the live image, if any, with the
    /// new language; without an image it only records the selection.
    pub fn select_language(&self, code: &str) -> Result<Option<JoinHandle<()>>, WorkflowError> {
        let language = self
            .inner
            .languages
            .resolve(code)
            .ok_or_else(|| WorkflowError::UnknownLanguage(code.trim().to_string()))?;

        info!("[Workflow] language set to {}", language);
        let issued = {
            let mut state = self.inner.state();
            state.select_language(language);
            let issued = state.issue_request();
            if issued.is_some() {
                self.inner.view_tx.send_replace(state.view.clone());
            }
            issued
        };

        Ok(issued.map(|(seq, request)| {
            let inner = self.inner.clone();
            tokio::spawn(async move { inner.extract(seq, request).await })
        }))
    }

    /// Copies the displayed result text and flashes the confirmation label.
    pub fn copy_result(&self) -> Result<(), WorkflowError> {
        let text = self.inner.state().view.result_text.clone();
        self.copy.activate(&text)
    }

    pub fn view(&self) -> ViewState {
        self.inner.state().view.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.inner.view_tx.subscribe()
    }

    pub fn copy_label(&self) -> String {
        self.copy.label()
    }

    pub fn subscribe_copy_label(&self) -> watch::Receiver<String> {
        self.copy.subscribe()
    }

    pub fn captured_image(&self) -> Option<CapturedImage> {
        self.inner.state().captured.clone()
    }

    pub fn language(&self) -> LanguageHint {
        self.inner.state().language.clone()
    }

    pub fn languages(&self) -> &[String] {
        &self.inner.languages.options
    }
}
