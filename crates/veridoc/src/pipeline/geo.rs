use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Postal reference record used to enrich validated documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoRecord {
    pub postal_code: u32,
    pub circle: String,
    pub region: String,
    pub division: String,
    pub state: String,
    pub district: String,
}

/// Read-only postal directory. Implementations must be safe for
/// unsynchronized concurrent reads; the pipeline only ever queries.
pub trait GeoDirectory: Send + Sync {
    fn lookup(&self, postal_code: u32) -> Option<GeoRecord>;
}

/// Error loading the postal directory at startup.
#[derive(Debug, thiserror::Error)]
pub enum GeoDirectoryError {
    #[error("failed to read postal directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid postal directory data: {0}")]
    Csv(#[from] csv::Error),
}

/// Directory backed by the national postal CSV export, loaded once at
/// process start.
#[derive(Debug, Default)]
pub struct CsvGeoDirectory {
    records: HashMap<u32, GeoRecord>,
}

impl CsvGeoDirectory {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, GeoDirectoryError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, GeoDirectoryError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = HashMap::new();

        for row in csv_reader.deserialize::<GeoRow>() {
            let row = row?;
            // Several offices can share a postal code; the first row wins.
            records
                .entry(row.pincode)
                .or_insert_with(|| GeoRecord {
                    postal_code: row.pincode,
                    circle: row.circlename,
                    region: row.regionname,
                    division: row.divisionname,
                    state: row.statename,
                    district: row.district,
                });
        }

        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl GeoDirectory for CsvGeoDirectory {
    fn lookup(&self, postal_code: u32) -> Option<GeoRecord> {
        self.records.get(&postal_code).cloned()
    }
}

#[derive(Debug, Deserialize)]
struct GeoRow {
    pincode: u32,
    circlename: String,
    regionname: String,
    divisionname: String,
    statename: String,
    district: String,
}
