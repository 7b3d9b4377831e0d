use serde_json::Value;

use super::capabilities::ClassifierCapability;
use super::context::PipelineFailure;
use super::registry::{DocumentKind, DocumentTypeRegistry};

/// Strategy wiring for the type-resolution stage. Selection is a deployment
/// choice, not a runtime negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassificationMode {
    /// Deterministic pattern matching only.
    Pattern,
    /// Model classifier only.
    Model,
    /// Pattern matching first, model classifier when no pattern matches.
    #[default]
    PatternThenModel,
}

impl ClassificationMode {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "pattern" => Some(ClassificationMode::Pattern),
            "model" => Some(ClassificationMode::Model),
            "pattern+model" | "hybrid" => Some(ClassificationMode::PatternThenModel),
            _ => None,
        }
    }
}

/// Deterministic strategy: walk the registry in registration order and
/// return the first entry whose patterns all match. Not the best match and
/// not all matches — the ordering is the tie-break, so a term like "voter"
/// appearing incidentally in a passport's free text cannot shadow an earlier
/// entry.
pub fn detect_by_patterns(registry: &DocumentTypeRegistry, text: &str) -> Option<DocumentKind> {
    registry
        .entries()
        .iter()
        .find(|entry| entry.matches(text))
        .map(|entry| entry.kind)
}

/// Candidate set handed to the model classifier: the registered type tokens
/// plus a structured description of each schema.
#[derive(Debug, Clone)]
pub struct ClassifierCatalog {
    pub candidates: Vec<DocumentKind>,
    pub schemas: Value,
}

impl ClassifierCatalog {
    pub fn from_registry(registry: &DocumentTypeRegistry) -> Self {
        let candidates: Vec<DocumentKind> = registry.kinds().collect();
        let schemas = Value::Object(
            candidates
                .iter()
                .map(|kind| (kind.as_str().to_string(), kind.schema().catalog_entry()))
                .collect(),
        );
        Self {
            candidates,
            schemas,
        }
    }

    pub fn candidate_tokens(&self) -> Vec<&'static str> {
        self.candidates.iter().map(DocumentKind::as_str).collect()
    }
}

/// Alternate strategy: ask the classifier capability for exactly one token
/// and accept it only if it names a registered type. The backing model is
/// nondeterministic; identical text may classify differently across calls,
/// which is an accepted boundary of this path.
pub(crate) async fn classify_by_model(
    classifier: &dyn ClassifierCapability,
    registry: &DocumentTypeRegistry,
    text: &str,
) -> Result<DocumentKind, PipelineFailure> {
    let catalog = ClassifierCatalog::from_registry(registry);
    let token = classifier
        .classify(text, &catalog)
        .await
        .map_err(|err| PipelineFailure::classification(err.to_string()))?;

    let token = token.trim().to_ascii_lowercase();
    match DocumentKind::parse(&token) {
        Some(kind) if registry.contains(kind) => Ok(kind),
        _ => Err(PipelineFailure::classification(
            "could not detect document type",
        )),
    }
}
