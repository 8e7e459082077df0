//! Recognition endpoint transport.
//!
//! One form-encoded `POST` per request carrying `data` and `language`. The
//! response body is never parsed: 2xx bodies are the recognized text, anything
//! else is an error message meant for the user.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::EndpointConfig;
use crate::error::WorkflowError;
use crate::types::{ExtractionRequest, ExtractionResult};

#[async_trait]
pub trait RecognitionEndpoint: Send + Sync {
    async fn recognize(&self, request: &ExtractionRequest)
        -> Result<ExtractionResult, WorkflowError>;
}

pub struct HttpRecognitionClient {
    client: reqwest::Client,
    url: String,
}

impl HttpRecognitionClient {
    pub fn new(config: &EndpointConfig) -> Result<Self, WorkflowError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            url: config.url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RecognitionEndpoint for HttpRecognitionClient {
    async fn recognize(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionResult, WorkflowError> {
        let params = [
            ("data", request.image.as_str()),
            ("language", request.language.as_str()),
        ];

        let resp = self.client.post(&self.url).form(&params).send().await?;

        let status = resp.status();
        let body = resp.text().await?;
        log::debug!("Recognition endpoint answered {} ({} bytes)", status, body.len());

        if status.is_success() {
            Ok(ExtractionResult::Recognized(body))
        } else {
            log::warn!("Recognition endpoint rejected request: {} {}", status, body);
            Ok(ExtractionResult::Rejected(body))
        }
    }
}
