use std::fmt;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::capabilities::ExtractionCapability;
use super::schema::{schema_for, TypeSchema};

/// Identifier for a supported credential type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Passport,
    DrivingLicense,
    Pan,
    Aadhaar,
    VoterId,
    Visa,
    FlightTicket,
    TravelInsurance,
    AccommodationBooking,
}

impl DocumentKind {
    pub const ALL: &'static [DocumentKind] = &[
        DocumentKind::Passport,
        DocumentKind::DrivingLicense,
        DocumentKind::Pan,
        DocumentKind::Aadhaar,
        DocumentKind::VoterId,
        DocumentKind::Visa,
        DocumentKind::FlightTicket,
        DocumentKind::TravelInsurance,
        DocumentKind::AccommodationBooking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Passport => "passport",
            DocumentKind::DrivingLicense => "driving_license",
            DocumentKind::Pan => "pan",
            DocumentKind::Aadhaar => "aadhaar",
            DocumentKind::VoterId => "voter_id",
            DocumentKind::Visa => "visa",
            DocumentKind::FlightTicket => "flight_ticket",
            DocumentKind::TravelInsurance => "travel_insurance",
            DocumentKind::AccommodationBooking => "accommodation_booking",
        }
    }

    /// Parse a caller or classifier token, case-insensitively.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "passport" => Some(DocumentKind::Passport),
            "driving_license" => Some(DocumentKind::DrivingLicense),
            "pan" => Some(DocumentKind::Pan),
            "aadhaar" => Some(DocumentKind::Aadhaar),
            "voter_id" => Some(DocumentKind::VoterId),
            "visa" => Some(DocumentKind::Visa),
            "flight_ticket" => Some(DocumentKind::FlightTicket),
            "travel_insurance" => Some(DocumentKind::TravelInsurance),
            // The misspelled token circulated in older client integrations
            // and is still accepted.
            "accommodation_booking" | "accomodation_booking" => {
                Some(DocumentKind::AccommodationBooking)
            }
            _ => None,
        }
    }

    pub fn schema(&self) -> &'static TypeSchema {
        schema_for(*self)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry construction error.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("document kind {0} registered twice")]
    DuplicateKind(DocumentKind),
    #[error("invalid detection pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Immutable registry entry tying a kind to its detection patterns, schema,
/// and extraction capability.
pub struct TypeDescriptor {
    pub kind: DocumentKind,
    patterns: Vec<Regex>,
    pub schema: &'static TypeSchema,
    extractor: Option<Arc<dyn ExtractionCapability>>,
}

impl TypeDescriptor {
    pub fn new(kind: DocumentKind) -> Self {
        Self {
            kind,
            patterns: Vec::new(),
            schema: schema_for(kind),
            extractor: None,
        }
    }

    /// Attach detection patterns. Patterns are compiled case-insensitively;
    /// an entry matches only when every one of its patterns matches.
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let compiled = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| RegistryError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
            self.patterns.push(compiled);
        }
        Ok(self)
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ExtractionCapability>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Replace the standard schema, for deployments that tune field
    /// requirements per tenant.
    pub fn with_schema(mut self, schema: &'static TypeSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn extractor(&self) -> Option<&Arc<dyn ExtractionCapability>> {
        self.extractor.as_ref()
    }

    pub fn has_patterns(&self) -> bool {
        !self.patterns.is_empty()
    }

    /// Whether every detection pattern matches the text. Entries without
    /// patterns never match; they are reachable only through the model
    /// classifier or known-type mode.
    pub fn matches(&self, text: &str) -> bool {
        self.has_patterns() && self.patterns.iter().all(|pattern| pattern.is_match(text))
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("kind", &self.kind)
            .field("patterns", &self.patterns.len())
            .field("extractor", &self.extractor.is_some())
            .finish()
    }
}

/// Ordered, read-only table of supported document types.
///
/// Registration order is load-bearing: the pattern strategy resolves ties in
/// favour of the entry registered first, so more specific types must come
/// before types whose keywords can appear incidentally in other documents.
#[derive(Debug, Default)]
pub struct DocumentTypeRegistry {
    entries: Vec<TypeDescriptor>,
}

impl DocumentTypeRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            entries: Vec::new(),
        }
    }

    /// The standard registry: detection patterns and ordering recovered from
    /// the production configuration, extraction capabilities supplied by the
    /// caller per kind.
    pub fn standard_with<F>(mut extractor_for: F) -> Result<Self, RegistryError>
    where
        F: FnMut(DocumentKind) -> Option<Arc<dyn ExtractionCapability>>,
    {
        let mut builder = Self::builder();
        for (kind, patterns) in STANDARD_PATTERNS {
            let mut descriptor = TypeDescriptor::new(*kind).with_patterns(*patterns)?;
            if let Some(extractor) = extractor_for(*kind) {
                descriptor = descriptor.with_extractor(extractor);
            }
            builder = builder.register(descriptor);
        }
        builder.build()
    }

    /// Standard registry without extraction capabilities wired.
    pub fn standard() -> Result<Self, RegistryError> {
        Self::standard_with(|_| None)
    }

    pub fn descriptor(&self, kind: DocumentKind) -> Option<&TypeDescriptor> {
        self.entries.iter().find(|entry| entry.kind == kind)
    }

    pub fn contains(&self, kind: DocumentKind) -> bool {
        self.descriptor(kind).is_some()
    }

    pub fn entries(&self) -> &[TypeDescriptor] {
        &self.entries
    }

    pub fn kinds(&self) -> impl Iterator<Item = DocumentKind> + '_ {
        self.entries.iter().map(|entry| entry.kind)
    }
}

/// Detection patterns in registration order. Each entry folds its keyword
/// alternatives into a single pattern so the all-patterns-must-match rule
/// holds; `pan` stays ahead of the types whose keywords show up in free text
/// on other credentials.
const STANDARD_PATTERNS: &[(DocumentKind, &[&str])] = &[
    (
        DocumentKind::Pan,
        &[r"INCOME\s*TAX\s*DEPARTMENT|PERMANENT\s*ACCOUNT\s*NUMBER"],
    ),
    (
        DocumentKind::DrivingLicense,
        &[r"DL\s*NO|FORM[-\s]*7|DRIVING\s*LICEN[CS]E"],
    ),
    (
        DocumentKind::VoterId,
        &[r"ELECTION\s*COMMISSION|ELECTION|VOTER|CONSTITUENCY"],
    ),
    (
        DocumentKind::Aadhaar,
        &[r"AADHAAR|ADHAAR|\bUID\b|IDENTIFICATION\s*AUTHORITY"],
    ),
    (
        DocumentKind::Passport,
        &[r"PASSPORT|REPUBLIC\s*OF\s*INDIA|MINISTRY\s*OF\s*EXTERNAL\s*AFFAIRS"],
    ),
    (DocumentKind::Visa, &[]),
    (DocumentKind::FlightTicket, &[]),
    (DocumentKind::TravelInsurance, &[]),
    (DocumentKind::AccommodationBooking, &[]),
];

/// Builder preserving registration order.
pub struct RegistryBuilder {
    entries: Vec<TypeDescriptor>,
}

impl RegistryBuilder {
    pub fn register(mut self, descriptor: TypeDescriptor) -> Self {
        self.entries.push(descriptor);
        self
    }

    pub fn build(self) -> Result<DocumentTypeRegistry, RegistryError> {
        for (index, entry) in self.entries.iter().enumerate() {
            if self.entries[..index]
                .iter()
                .any(|earlier| earlier.kind == entry.kind)
            {
                return Err(RegistryError::DuplicateKind(entry.kind));
            }
        }
        Ok(DocumentTypeRegistry {
            entries: self.entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_known_tokens_case_insensitively() {
        assert_eq!(DocumentKind::parse(" PAN "), Some(DocumentKind::Pan));
        assert_eq!(
            DocumentKind::parse("Driving_License"),
            Some(DocumentKind::DrivingLicense)
        );
        assert_eq!(
            DocumentKind::parse("accomodation_booking"),
            Some(DocumentKind::AccommodationBooking)
        );
        assert_eq!(DocumentKind::parse("unknown_xyz"), None);
    }

    #[test]
    fn standard_registry_keeps_registration_order() {
        let registry = DocumentTypeRegistry::standard().expect("standard registry");
        let order: Vec<DocumentKind> = registry.kinds().collect();
        assert_eq!(order[0], DocumentKind::Pan);
        assert_eq!(order[1], DocumentKind::DrivingLicense);
        assert_eq!(order[2], DocumentKind::VoterId);
        assert_eq!(order[3], DocumentKind::Aadhaar);
        assert_eq!(order[4], DocumentKind::Passport);
        assert_eq!(order.len(), DocumentKind::ALL.len());
    }

    #[test]
    fn patterns_tolerate_case_and_whitespace() {
        let registry = DocumentTypeRegistry::standard().expect("standard registry");
        let pan = registry
            .descriptor(DocumentKind::Pan)
            .expect("pan registered");
        assert!(pan.matches("permanent  account number ABCDE1234F"));
        assert!(pan.matches("INCOME TAX DEPARTMENT GOVT OF INDIA"));
        assert!(!pan.matches("republic of india passport"));
    }

    #[test]
    fn entries_without_patterns_never_match() {
        let registry = DocumentTypeRegistry::standard().expect("standard registry");
        let visa = registry
            .descriptor(DocumentKind::Visa)
            .expect("visa registered");
        assert!(!visa.matches("visa grant number 1234"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let result = DocumentTypeRegistry::builder()
            .register(TypeDescriptor::new(DocumentKind::Pan))
            .register(TypeDescriptor::new(DocumentKind::Pan))
            .build();
        assert!(matches!(result, Err(RegistryError::DuplicateKind(_))));
    }
}
