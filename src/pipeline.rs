//! The assembly pipeline: resolve -> merge -> compose -> hash -> persist.
//!
//! Strictly sequential within one run. Any failure aborts before the
//! manifest is written, so a failed run never leaves a docket record behind
//! (partial working-directory artifacts are left for retention tooling).

use crate::charts::ChartMerger;
use crate::compose;
use crate::config::Config;
use crate::docket::{DocketHashes, DocketRecord};
use crate::error::DocketError;
use crate::flight::FlightMetadata;
use crate::repo::{self, DocketRepository};
use crate::resolver::{self, ResolveContext, SlotSources};
use crate::staged::StagedStore;
use crate::util;
use chrono::{Local, SecondsFormat};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug)]
pub struct AssembleOutcome {
    pub record: DocketRecord,
}

/// Run the full pipeline for one flight and return the persisted record.
pub fn assemble(
    config: &Config,
    staged_store: &StagedStore,
    flight: FlightMetadata,
    sources: &SlotSources,
) -> Result<AssembleOutcome, DocketError> {
    let id = repo::new_docket_id();
    tracing::info!(%id, departure = %flight.departure, destination = %flight.destination, "assembling docket");

    let workdir = config.paths.uploads.join(&id);
    let merger = ChartMerger::from_override(config.merge_tool.as_deref());
    let ctx = ResolveContext {
        workdir: &workdir,
        aip_base: &config.paths.aip,
        staged_store,
        merger: &merger,
        max_upload_bytes: config.max_upload_bytes,
    };
    let resolved = resolver::resolve_all(&ctx, &flight, sources)?;
    tracing::info!(
        %id,
        present = resolved.iter().filter(|(_, path)| path.is_some()).count(),
        "slots resolved"
    );

    let generated = config.paths.generated.join(format!("{id}.pdf"));
    compose::compose(
        &generated,
        &config.operator,
        config.logo.as_deref(),
        &flight,
        &resolved,
    )?;
    tracing::info!(%id, output = %generated.display(), "composite written");

    let sha256 = util::sha256_file(&generated)
        .map_err(|err| DocketError::Storage(err.to_string()))?;

    let files: BTreeMap<String, Option<PathBuf>> = resolved
        .into_iter()
        .map(|(slot, path)| (slot.key().to_string(), path))
        .collect();

    let record = DocketRecord {
        id,
        created_at: Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
        flight,
        files,
        generated_pdf: generated,
        hashes: DocketHashes {
            generated_pdf_sha256: sha256,
        },
    };

    let repository = DocketRepository::new(config.paths.dockets.clone());
    repository.save(&record)?;
    Ok(AssembleOutcome { record })
}
