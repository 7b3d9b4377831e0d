use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CapabilityError, TextRecognizer};

/// Text recognizer backed by an OCR sidecar service.
///
/// The sidecar owns the engine and its models; this client only posts the
/// image locator and reads back plain text.
pub struct HttpTextRecognizer {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpTextRecognizer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[derive(Serialize)]
struct OcrRequest<'a> {
    image_reference: &'a str,
}

#[derive(Deserialize)]
struct OcrPayload {
    text: String,
}

#[async_trait]
impl TextRecognizer for HttpTextRecognizer {
    async fn extract_text(&self, image_reference: &str) -> Result<String, CapabilityError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&OcrRequest { image_reference })
            .send()
            .await
            .map_err(|err| CapabilityError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CapabilityError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: OcrPayload = response
            .json()
            .await
            .map_err(|err| CapabilityError::MalformedPayload(err.to_string()))?;

        Ok(payload.text)
    }
}
