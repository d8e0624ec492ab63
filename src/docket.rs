use crate::flight::FlightMetadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The durable unit of provenance: one record per successful pipeline run,
/// never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocketRecord {
    /// `DOCKET-YYYYMMDD-HHMMSS-XXXXXX`, immutable once assigned.
    pub id: String,
    /// ISO-8601, assigned at creation.
    pub created_at: String,
    pub flight: FlightMetadata,
    /// Slot key to resolved local path, or null for absent slots.
    pub files: BTreeMap<String, Option<PathBuf>>,
    pub generated_pdf: PathBuf,
    pub hashes: DocketHashes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocketHashes {
    /// Hex sha256 of the composite's bytes at the moment of persistence.
    pub generated_pdf_sha256: String,
}
