use serde_json::{json, Value};

use super::registry::DocumentKind;

/// Declared shape of a single extracted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// JSON string.
    Text,
    /// Lenient date field, canonicalized to `YYYY-MM-DD` when a known
    /// notation matches and left untouched otherwise.
    Date,
    /// Array of strings, optionally restricted to a closed vocabulary.
    TextList { allowed: Option<&'static [&'static str]> },
}

impl FieldKind {
    fn describe(&self) -> String {
        match self {
            FieldKind::Text => "string".to_string(),
            FieldKind::Date => "date (YYYY-MM-DD)".to_string(),
            FieldKind::TextList { allowed: None } => "list of strings".to_string(),
            FieldKind::TextList {
                allowed: Some(values),
            } => format!("list of values from {{{}}}", values.join(", ")),
        }
    }
}

/// One field of a document type schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn nullable(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// Field table for one document type. Unknown extra fields are retained
/// during validation, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSchema {
    pub fields: &'static [FieldSpec],
}

impl TypeSchema {
    /// Structured description used in classifier and extraction prompts.
    pub fn catalog_entry(&self) -> Value {
        let fields: serde_json::Map<String, Value> = self
            .fields
            .iter()
            .map(|field| {
                let mut description = field.kind.describe();
                if !field.required {
                    description.push_str(", nullable");
                }
                (field.name.to_string(), Value::String(description))
            })
            .collect();
        json!({ "fields": fields })
    }
}

/// Licence class codes accepted on driving licences.
pub const LICENSE_CLASSES: &[&str] = &[
    "LMV", "MCWG", "MCWOG", "HGMV", "HPMV", "FVG", "MC EX50CC", "LMV-NT",
];

static PASSPORT: TypeSchema = TypeSchema {
    fields: &[
        FieldSpec::required("passport_number", FieldKind::Text),
        FieldSpec::required("full_name", FieldKind::Text),
        FieldSpec::required("nationality", FieldKind::Text),
        FieldSpec::required("date_of_birth", FieldKind::Date),
        FieldSpec::required("expiry_date", FieldKind::Date),
    ],
};

static PAN: TypeSchema = TypeSchema {
    fields: &[
        FieldSpec::required("permanent_account_number", FieldKind::Text),
        FieldSpec::required("name", FieldKind::Text),
        FieldSpec::required("fathers_name", FieldKind::Text),
        FieldSpec::required("date_of_birth", FieldKind::Date),
    ],
};

// Licence scans are the noisiest inputs we see, so every field tolerates
// absence.
static DRIVING_LICENSE: TypeSchema = TypeSchema {
    fields: &[
        FieldSpec::nullable("license_number", FieldKind::Text),
        FieldSpec::nullable("full_name", FieldKind::Text),
        FieldSpec::nullable("issue_date", FieldKind::Date),
        FieldSpec::nullable("expiry_date", FieldKind::Date),
        FieldSpec::nullable(
            "category",
            FieldKind::TextList {
                allowed: Some(LICENSE_CLASSES),
            },
        ),
        FieldSpec::nullable("address", FieldKind::Text),
        FieldSpec::nullable("bloodgroup", FieldKind::Text),
        FieldSpec::nullable("son_of", FieldKind::Text),
    ],
};

static AADHAAR: TypeSchema = TypeSchema {
    fields: &[
        FieldSpec::required("aadhaar_number", FieldKind::Text),
        FieldSpec::required("full_name", FieldKind::Text),
        FieldSpec::required("dob", FieldKind::Date),
        FieldSpec::required("gender", FieldKind::Text),
    ],
};

static VOTER_ID: TypeSchema = TypeSchema {
    fields: &[
        FieldSpec::required("epic_number", FieldKind::Text),
        FieldSpec::required("full_name", FieldKind::Text),
        FieldSpec::nullable("fathers_name", FieldKind::Text),
        FieldSpec::nullable("date_of_birth", FieldKind::Date),
        FieldSpec::nullable("gender", FieldKind::Text),
        FieldSpec::nullable("address", FieldKind::Text),
    ],
};

static VISA: TypeSchema = TypeSchema {
    fields: &[
        FieldSpec::nullable("visa_number", FieldKind::Text),
        FieldSpec::nullable("visa_type", FieldKind::Text),
        FieldSpec::nullable("full_name", FieldKind::Text),
        FieldSpec::nullable("passport_number", FieldKind::Text),
        FieldSpec::nullable("issuing_country", FieldKind::Text),
        FieldSpec::nullable("issue_date", FieldKind::Date),
        FieldSpec::nullable("expiry_date", FieldKind::Date),
    ],
};

static FLIGHT_TICKET: TypeSchema = TypeSchema {
    fields: &[
        FieldSpec::nullable("passenger_name", FieldKind::Text),
        FieldSpec::nullable("other_travellers", FieldKind::TextList { allowed: None }),
        FieldSpec::nullable("airline", FieldKind::Text),
        FieldSpec::nullable("flight_number", FieldKind::Text),
        FieldSpec::nullable("departure_airport", FieldKind::Text),
        FieldSpec::nullable("arrival_airport", FieldKind::Text),
        FieldSpec::nullable("departure_date", FieldKind::Date),
        FieldSpec::nullable("booking_reference", FieldKind::Text),
        FieldSpec::nullable("travel_class", FieldKind::Text),
    ],
};

static TRAVEL_INSURANCE: TypeSchema = TypeSchema {
    fields: &[
        FieldSpec::nullable("policy_number", FieldKind::Text),
        FieldSpec::nullable("insured_name", FieldKind::Text),
        FieldSpec::nullable("provider", FieldKind::Text),
        FieldSpec::nullable("start_date", FieldKind::Date),
        FieldSpec::nullable("end_date", FieldKind::Date),
        FieldSpec::nullable("coverage_amount", FieldKind::Text),
    ],
};

static ACCOMMODATION_BOOKING: TypeSchema = TypeSchema {
    fields: &[
        FieldSpec::nullable("guest_name", FieldKind::Text),
        FieldSpec::nullable("property_name", FieldKind::Text),
        FieldSpec::nullable("address", FieldKind::Text),
        FieldSpec::nullable("check_in_date", FieldKind::Date),
        FieldSpec::nullable("check_out_date", FieldKind::Date),
        FieldSpec::nullable("booking_reference", FieldKind::Text),
    ],
};

/// Schema registered for the given document kind.
pub fn schema_for(kind: DocumentKind) -> &'static TypeSchema {
    match kind {
        DocumentKind::Passport => &PASSPORT,
        DocumentKind::Pan => &PAN,
        DocumentKind::DrivingLicense => &DRIVING_LICENSE,
        DocumentKind::Aadhaar => &AADHAAR,
        DocumentKind::VoterId => &VOTER_ID,
        DocumentKind::Visa => &VISA,
        DocumentKind::FlightTicket => &FLIGHT_TICKET,
        DocumentKind::TravelInsurance => &TRAVEL_INSURANCE,
        DocumentKind::AccommodationBooking => &ACCOMMODATION_BOOKING,
    }
}
