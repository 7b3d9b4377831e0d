use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::{CapabilityError, ClassifierCapability, ExtractionCapability};
use crate::pipeline::classify::ClassifierCatalog;
use crate::pipeline::registry::DocumentKind;

/// Async client for an Ollama-compatible `/api/generate` endpoint.
///
/// When a fallback model is configured, a failed primary call is retried
/// once against the fallback before the error surfaces.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    fallback_model: Option<String>,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            fallback_model: None,
        }
    }

    pub fn with_fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = Some(model.into());
        self
    }

    pub async fn generate(&self, system: &str, prompt: &str) -> Result<String, CapabilityError> {
        match self.generate_with(&self.model, system, prompt).await {
            Ok(response) => Ok(response),
            Err(primary_err) => match &self.fallback_model {
                Some(fallback) => {
                    warn!(
                        model = %self.model,
                        fallback = %fallback,
                        error = %primary_err,
                        "primary model failed, retrying with fallback"
                    );
                    self.generate_with(fallback, system, prompt).await
                }
                None => Err(primary_err),
            },
        }
    }

    async fn generate_with(
        &self,
        model: &str,
        system: &str,
        prompt: &str,
    ) -> Result<String, CapabilityError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model,
            prompt,
            system,
            stream: false,
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
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

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|err| CapabilityError::MalformedPayload(err.to_string()))?;

        Ok(parsed.response)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Strip reasoning sections and Markdown fences from model output, leaving
/// the JSON body.
pub fn clean_model_response(raw: &str) -> String {
    static THINK: OnceLock<Regex> = OnceLock::new();
    static FENCE: OnceLock<Regex> = OnceLock::new();

    let think = THINK.get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid pattern"));
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("valid pattern")
    });

    let without_think = think.replace_all(raw, "");
    let trimmed = without_think.trim();

    let body = match fence.captures(trimmed) {
        Some(captures) => captures
            .get(1)
            .map(|inner| inner.as_str())
            .unwrap_or(trimmed),
        None => trimmed,
    };

    body.replace('\n', " ").replace("\\n", " ").trim().to_string()
}

/// Model-backed extraction for one document type, with a per-type preamble
/// steering the normalizer.
pub struct OllamaExtractor {
    client: Arc<OllamaClient>,
    kind: DocumentKind,
}

impl OllamaExtractor {
    pub fn new(client: Arc<OllamaClient>, kind: DocumentKind) -> Self {
        Self { client, kind }
    }

    fn preamble(&self) -> &'static str {
        match self.kind {
            DocumentKind::Passport => {
                "You analyze text extracted from an image of a passport issued by the Government of India."
            }
            DocumentKind::Pan => {
                "You analyze text extracted from an image of a PAN card issued by the Government of India."
            }
            DocumentKind::DrivingLicense => {
                "You analyze text extracted from an image of an Indian driving licence."
            }
            DocumentKind::Aadhaar => {
                "You analyze text extracted from an image of an Aadhaar card."
            }
            DocumentKind::VoterId => {
                "You analyze text extracted from an image of an Indian voter identity card."
            }
            DocumentKind::Visa => {
                "You are an OCR document normalizer. Convert messy OCR text from visas into structured JSON."
            }
            DocumentKind::FlightTicket => {
                "You are an OCR document normalizer. Convert messy OCR text from airline flight tickets into structured JSON. \
                 If multiple segments are present, choose the primary itinerary segment; prefer the international leg, otherwise the earliest departing segment."
            }
            DocumentKind::TravelInsurance => {
                "You are an OCR document normalizer. Convert messy OCR text from travel insurance certificates into structured JSON."
            }
            DocumentKind::AccommodationBooking => {
                "You are an OCR document normalizer. Convert messy OCR text from accommodation booking confirmations into structured JSON."
            }
        }
    }

    fn prompt(&self, text: &str) -> String {
        format!(
            "The OCR text of a single document follows. Extract the relevant information \
             based on the {kind} schema:\n\n\"{text}\"\n\n\
             Make sure dates are in YYYY-MM-DD format; ignore any additional data around the dates. \
             If a pin_code is found it must be a 6-digit number only, with no dashes, letters, or spaces. \
             If a letter like 'S' appears in it due to OCR noise, replace it with the likely digit. \
             If a field is missing, return null for it.\n\n\
             The schema:\n{schema}\n\n\
             Return the extracted data strictly as a JSON object matching the schema.",
            kind = self.kind,
            schema = self.kind.schema().catalog_entry(),
        )
    }
}

#[async_trait]
impl ExtractionCapability for OllamaExtractor {
    async fn extract(&self, text: &str) -> Result<Value, CapabilityError> {
        let raw = self.client.generate(self.preamble(), &self.prompt(text)).await?;
        let cleaned = clean_model_response(&raw);
        serde_json::from_str(&cleaned).map_err(|err| {
            CapabilityError::MalformedPayload(format!("response is not valid JSON: {err}"))
        })
    }
}

/// Single-token document classifier backed by the shared client.
pub struct OllamaClassifier {
    client: Arc<OllamaClient>,
}

impl OllamaClassifier {
    pub fn new(client: Arc<OllamaClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClassifierCapability for OllamaClassifier {
    async fn classify(
        &self,
        text: &str,
        catalog: &ClassifierCatalog,
    ) -> Result<String, CapabilityError> {
        let system = "You classify documents based on their extracted text.";
        let prompt = format!(
            "The possible document types and their schemas:\n{schemas}\n\n\
             Given this extracted text:\n\n\"{text}\"\n\n\
             Match it with one of the available types and return only one word, the type name. \
             If an exact match is not found, return the closest match. \
             No explanation, just a single word among {candidates:?}.",
            schemas = catalog.schemas,
            candidates = catalog.candidate_tokens(),
        );

        let raw = self.client.generate(system, &prompt).await?;
        Ok(clean_model_response(&raw))
    }
}
