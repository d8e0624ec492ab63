//! Flight docket assembly and provenance pipeline.
//!
//! Assembles one canonical flight-docket PDF from independently produced
//! constituent documents (pilot uploads, staged external-fetch results,
//! locally cached aerodrome chart packs) and records an auditable,
//! content-hashed manifest in a date-sharded store.

pub mod aircraft;
pub mod charts;
pub mod compose;
pub mod config;
pub mod docket;
pub mod error;
pub mod flight;
pub mod pipeline;
pub mod repo;
pub mod resolver;
pub mod slots;
pub mod staged;
pub mod util;

pub use docket::{DocketHashes, DocketRecord};
pub use error::DocketError;
pub use flight::FlightMetadata;
pub use slots::{Slot, CANONICAL_ORDER};
