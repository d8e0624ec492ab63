use anyhow::{bail, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const MAX_ALTERNATES: usize = 5;

fn icao_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]{4}$").expect("icao regex"))
}

fn registration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z0-9-]{2,10}$").expect("registration regex"))
}

/// Flight metadata echoed into the manifest and the summary page. Opaque to
/// the pipeline beyond that; validation happens at the boundary via
/// [`FlightMetadata::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightMetadata {
    pub aircraft_type: String,
    pub registration: String,
    pub callsign: String,
    pub departure: String,
    pub destination: String,
    pub alternates: Vec<String>,
    pub etd_local: String,
}

impl FlightMetadata {
    /// Normalize and validate raw field values. ICAO codes, registration and
    /// callsign are upper-cased; alternates accepts a comma-separated list.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        aircraft_type: &str,
        registration: &str,
        callsign: &str,
        departure: &str,
        destination: &str,
        alternates: &str,
        etd_local: &str,
    ) -> Result<FlightMetadata> {
        let aircraft_type = aircraft_type.trim().to_string();
        if aircraft_type.is_empty() || aircraft_type.len() > 20 {
            bail!("invalid aircraft type (1-20 characters)");
        }

        let registration = registration.trim().to_uppercase();
        if !registration_re().is_match(&registration) {
            bail!("invalid registration format: {registration}");
        }

        let callsign = callsign.trim().to_uppercase();
        if !callsign.is_empty()
            && (callsign.len() > 10 || !callsign.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            bail!("invalid callsign format: {callsign}");
        }

        let departure = departure.trim().to_uppercase();
        if !icao_re().is_match(&departure) {
            bail!("invalid departure ICAO code: {departure}");
        }

        let destination = destination.trim().to_uppercase();
        if !icao_re().is_match(&destination) {
            bail!("invalid destination ICAO code: {destination}");
        }

        let alternates: Vec<String> = alternates
            .split(',')
            .map(|code| code.trim().to_uppercase())
            .filter(|code| !code.is_empty())
            .collect();
        for alt in &alternates {
            if !icao_re().is_match(alt) {
                bail!("invalid alternate ICAO code: {alt}");
            }
        }
        if alternates.len() > MAX_ALTERNATES {
            bail!("too many alternates (max {MAX_ALTERNATES})");
        }

        Ok(FlightMetadata {
            aircraft_type,
            registration,
            callsign,
            departure,
            destination,
            alternates,
            etd_local: etd_local.trim().to_string(),
        })
    }
}
